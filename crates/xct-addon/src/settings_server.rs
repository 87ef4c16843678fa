//! Local JSON API for editing bindings and Telegram settings.

use crate::{AppCommand, AppError, AppResult};

use xct_addon_core::{
    ActionKind, ActionRunner, Binding, BotInfo, ChatDirectory, CoreError, DispatchOutcome,
    Dispatcher, EventCategory, FlightEvent, KNOWN_EVENTS, MessageStore, MessageTemplate,
    NewBinding, NewTask, PlaybackSlot, SavedTask, TaskStore, TelegramChat, is_known_event,
};

use std::{net::SocketAddr, panic::Location};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use error_location::ErrorLocation;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::{
    net::TcpListener,
    sync::{mpsc, watch},
};
use tower_http::cors::CorsLayer;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Shared handles used by the API handlers.
#[derive(Clone)]
pub struct SettingsState {
    pub(crate) dispatcher: Dispatcher<ActionRunner>,
    pub(crate) messages: MessageStore,
    pub(crate) tasks: TaskStore,
    pub(crate) chats: Option<ChatDirectory>,
    pub(crate) command_tx: mpsc::Sender<AppCommand>,
}

/// Handler error rendered as `{ "error": ... }`.
#[derive(Debug)]
pub enum ApiError {
    /// Failure reported by the core library.
    Core(CoreError),
    /// Resource or feature not available.
    NotFound(String),
    /// Request could not be forwarded.
    Unavailable(String),
}

impl From<CoreError> for ApiError {
    fn from(e: CoreError) -> Self {
        ApiError::Core(e)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Core(e) => match e {
                CoreError::InvalidBinding { .. } => StatusCode::BAD_REQUEST,
                CoreError::BindingNotFound { .. }
                | CoreError::TaskNotFound { .. }
                | CoreError::SoundNotFound { .. } => StatusCode::NOT_FOUND,
                CoreError::DuplicateEvent { .. } => StatusCode::CONFLICT,
                CoreError::Telegram { .. } | CoreError::Http { .. } => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Core(e) => e.to_string(),
            ApiError::NotFound(m) | ApiError::Unavailable(m) => m.clone(),
        };

        if status.is_server_error() {
            error!(status = status.as_u16(), error = %message, "Settings request failed");
        } else {
            warn!(status = status.as_u16(), error = %message, "Settings request rejected");
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Catalog entry for the event picker.
#[derive(Debug, Serialize)]
pub struct EventEntry {
    /// Event identifier.
    pub name: &'static str,
    /// Display group.
    pub category: EventCategory,
}

/// Body of `POST /api/bindings/reorder`.
#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    /// Current index.
    pub from: usize,
    /// Target index.
    pub to: usize,
}

/// Pilot name payload.
#[derive(Debug, Serialize, Deserialize)]
pub struct PilotName {
    /// Name prefixed to Telegram messages, if any.
    pub pilot_name: Option<String>,
}

/// Reply of `POST /api/telegram/user`.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserId {
    /// Telegram user id of the pilot.
    pub user_id: String,
}

/// Body of `POST /api/messages`.
#[derive(Debug, Deserialize)]
pub struct NewMessage {
    /// Short label.
    pub title: String,
    /// Message text.
    pub body: String,
}

/// Body of `POST /api/tasks/{id}/bind`.
#[derive(Debug, Deserialize)]
pub struct BindTask {
    /// Event the saved task should react to.
    pub event: String,
}

/// Build the API router.
pub fn router(state: SettingsState) -> Router {
    Router::new()
        .route("/api/bindings", get(list_bindings).post(create_binding))
        .route("/api/bindings/reorder", post(reorder_bindings))
        .route(
            "/api/bindings/{id}",
            put(update_binding).delete(delete_binding),
        )
        .route("/api/bindings/{id}/run", post(run_binding))
        .route("/api/bindings/{id}/stop", post(stop_binding))
        .route("/api/events", get(list_events))
        .route("/api/events/available", get(available_events))
        .route("/api/events/{name}", post(inject_event))
        .route("/api/sounds", get(list_sounds))
        .route("/api/preferences/pilot", get(get_pilot).put(put_pilot))
        .route("/api/telegram/bot", get(telegram_bot))
        .route("/api/telegram/chats", get(list_chats))
        .route("/api/telegram/chats/refresh", post(refresh_chats))
        .route("/api/telegram/user", post(fetch_user_id))
        .route("/api/messages", get(list_messages).post(create_message))
        .route("/api/messages/{id}", axum::routing::delete(delete_message))
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route("/api/tasks/{id}", axum::routing::delete(delete_task))
        .route("/api/tasks/{id}/bind", post(bind_task))
        .route("/api/tasks/kind/{kind}", axum::routing::delete(delete_task_kind))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the API on localhost until shutdown is signalled.
#[instrument(skip(state, shutdown_rx))]
pub async fn serve(
    state: SettingsState,
    port: u16,
    mut shutdown_rx: watch::Receiver<bool>,
) -> AppResult<()> {
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = TcpListener::bind(addr).await.map_err(|e| AppError::Server {
        reason: format!("Failed to bind settings server on {}: {}", addr, e),
        location: ErrorLocation::from(Location::caller()),
    })?;

    info!(%addr, "Settings server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.changed().await;
            info!("Settings server shutting down");
        })
        .await
        .map_err(|e| AppError::Server {
            reason: format!("Settings server failed: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })
}

async fn list_bindings(State(state): State<SettingsState>) -> ApiResult<Json<Vec<Binding>>> {
    Ok(Json(state.dispatcher.store().list().await?))
}

async fn create_binding(
    State(state): State<SettingsState>,
    Json(binding): Json<NewBinding>,
) -> ApiResult<(StatusCode, Json<Binding>)> {
    let stored = state.dispatcher.store().add(binding).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

async fn update_binding(
    State(state): State<SettingsState>,
    Path(id): Path<i64>,
    Json(changes): Json<NewBinding>,
) -> ApiResult<Json<Binding>> {
    let store = state.dispatcher.store();
    let mut binding = store.get(id).await?;
    binding.event = changes.event;
    binding.action = changes.action;
    store.update(&binding).await?;
    Ok(Json(binding))
}

async fn delete_binding(
    State(state): State<SettingsState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    state.dispatcher.store().delete(id).await?;
    state.dispatcher.reactor().player().stop(PlaybackSlot::Row(id));
    Ok(StatusCode::NO_CONTENT)
}

async fn reorder_bindings(
    State(state): State<SettingsState>,
    Json(request): Json<ReorderRequest>,
) -> ApiResult<Json<Vec<Binding>>> {
    let list = state
        .dispatcher
        .store()
        .reorder(request.from, request.to)
        .await?;
    Ok(Json(list))
}

async fn run_binding(
    State(state): State<SettingsState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<DispatchOutcome>> {
    let outcome = state
        .dispatcher
        .run_binding(id, PlaybackSlot::Row(id))
        .await?;
    Ok(Json(outcome))
}

async fn stop_binding(
    State(state): State<SettingsState>,
    Path(id): Path<i64>,
) -> Json<serde_json::Value> {
    let stopped = state.dispatcher.reactor().player().stop(PlaybackSlot::Row(id));
    Json(json!({ "stopped": stopped }))
}

async fn list_events() -> Json<Vec<EventEntry>> {
    Json(
        KNOWN_EVENTS
            .iter()
            .map(|&name| EventEntry {
                name,
                category: EventCategory::of(name),
            })
            .collect(),
    )
}

async fn available_events(State(state): State<SettingsState>) -> ApiResult<Json<Vec<&'static str>>> {
    Ok(Json(state.dispatcher.store().available_events().await?))
}

async fn inject_event(
    State(state): State<SettingsState>,
    Path(name): Path<String>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    if !is_known_event(&name) {
        return Err(ApiError::NotFound(format!("Unknown event: {}", name)));
    }

    let session_id = Uuid::new_v4();
    state
        .command_tx
        .send(AppCommand::HandleEvent {
            event: FlightEvent::new(name.clone()),
            session_id,
        })
        .await
        .map_err(|e| ApiError::Unavailable(format!("Application loop is not running: {}", e)))?;

    info!(event = %name, session_id = %session_id, "Test event injected");
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "session_id": session_id })),
    ))
}

async fn list_sounds(State(state): State<SettingsState>) -> ApiResult<Json<Vec<String>>> {
    Ok(Json(state.dispatcher.reactor().player().library().list()?))
}

async fn get_pilot(State(state): State<SettingsState>) -> Json<PilotName> {
    Json(PilotName {
        pilot_name: state.dispatcher.reactor().preferences().pilot_name(),
    })
}

async fn put_pilot(
    State(state): State<SettingsState>,
    Json(body): Json<PilotName>,
) -> ApiResult<Json<PilotName>> {
    let preferences = state.dispatcher.reactor().preferences();
    preferences.set_pilot_name(body.pilot_name.as_deref())?;
    Ok(Json(PilotName {
        pilot_name: preferences.pilot_name(),
    }))
}

async fn telegram_bot(State(state): State<SettingsState>) -> ApiResult<Json<BotInfo>> {
    let reactor = state.dispatcher.reactor();
    let client = reactor
        .telegram()
        .ok_or_else(|| ApiError::NotFound("No Telegram bot token configured".to_string()))?;

    let result = client.get_me().await;
    reactor.preferences().set_telegram_validated(result.is_ok())?;
    Ok(Json(result?))
}

async fn list_chats(State(state): State<SettingsState>) -> Json<Vec<TelegramChat>> {
    match &state.chats {
        Some(chats) => Json(chats.cached()),
        None => Json(state.dispatcher.reactor().preferences().cached_chats()),
    }
}

async fn refresh_chats(State(state): State<SettingsState>) -> ApiResult<Json<Vec<TelegramChat>>> {
    let chats = state
        .chats
        .as_ref()
        .ok_or_else(|| ApiError::NotFound("No Telegram bot token configured".to_string()))?;
    Ok(Json(chats.fetch_chats().await?))
}

async fn fetch_user_id(State(state): State<SettingsState>) -> ApiResult<Json<UserId>> {
    let chats = state
        .chats
        .as_ref()
        .ok_or_else(|| ApiError::NotFound("No Telegram bot token configured".to_string()))?;
    let user_id = chats.fetch_user_id().await?;
    Ok(Json(UserId { user_id }))
}

async fn list_messages(State(state): State<SettingsState>) -> ApiResult<Json<Vec<MessageTemplate>>> {
    Ok(Json(state.messages.list().await?))
}

async fn create_message(
    State(state): State<SettingsState>,
    Json(message): Json<NewMessage>,
) -> ApiResult<(StatusCode, Json<MessageTemplate>)> {
    let stored = state.messages.add(&message.title, &message.body).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

async fn delete_message(
    State(state): State<SettingsState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    if state.messages.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Message not found: {}", id)))
    }
}

async fn list_tasks(State(state): State<SettingsState>) -> ApiResult<Json<Vec<SavedTask>>> {
    Ok(Json(state.tasks.list().await?))
}

async fn create_task(
    State(state): State<SettingsState>,
    Json(task): Json<NewTask>,
) -> ApiResult<(StatusCode, Json<SavedTask>)> {
    let stored = state.tasks.add(task).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

async fn delete_task(
    State(state): State<SettingsState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    if state.tasks.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Task not found: {}", id)))
    }
}

async fn delete_task_kind(
    State(state): State<SettingsState>,
    Path(kind): Path<ActionKind>,
) -> ApiResult<Json<serde_json::Value>> {
    let removed = state.tasks.delete_kind(kind).await?;
    Ok(Json(json!({ "removed": removed })))
}

/// Create a binding for `event` that performs the saved task's action.
async fn bind_task(
    State(state): State<SettingsState>,
    Path(id): Path<i64>,
    Json(request): Json<BindTask>,
) -> ApiResult<(StatusCode, Json<Binding>)> {
    let task = state.tasks.get(id).await?;
    let stored = state
        .dispatcher
        .store()
        .add(NewBinding {
            event: request.event,
            action: task.action,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(stored)))
}
