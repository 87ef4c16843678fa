use crate::{
    CoreError, Preferences,
    telegram::{
        ChatDirectory, RetryPolicy, TelegramChat, TelegramClient, format, is_valid_token,
        merge_chats,
    },
};

use std::{
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use serde_json::{Value, json};
use tokio::net::TcpListener;

const TOKEN: &str = "123456:ABC-def_ghi";

#[allow(clippy::unwrap_used)]
async fn spawn_fake(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router).await });
    format!("http://{addr}")
}

#[allow(clippy::unwrap_used)]
fn client(base_url: &str) -> TelegramClient {
    TelegramClient::new(base_url, TOKEN, Duration::from_secs(5)).unwrap()
}

fn route(method: &str) -> String {
    format!("/bot{TOKEN}/{method}")
}

fn chat(id: &str, title: &str, is_group: bool, is_user_member: bool) -> TelegramChat {
    TelegramChat {
        chat_id: id.to_string(),
        title: title.to_string(),
        is_group,
        is_bot_member: true,
        is_bot_active: true,
        is_user_member,
    }
}

async fn get_me() -> Json<Value> {
    Json(json!({
        "ok": true,
        "result": { "id": 777, "is_bot": true, "first_name": "Vario Bot", "username": "vario_bot" }
    }))
}

async fn updates() -> Json<Value> {
    Json(json!({
        "ok": true,
        "result": [
            { "update_id": 10, "message": { "chat": { "id": 42, "type": "private", "first_name": "Anna", "last_name": "Pilot" } } },
            { "update_id": 11, "message": { "chat": { "id": -100, "type": "supergroup", "title": "Zulu Club" } } },
            { "update_id": 12, "message": { "chat": { "id": 42, "type": "private", "first_name": "Anna", "last_name": "Pilot" } } },
            { "update_id": 13, "message": { "chat": { "id": -200, "type": "group", "title": "Alpha Team" } } },
            { "update_id": 14 }
        ]
    }))
}

async fn get_chat() -> Json<Value> {
    Json(json!({ "ok": true, "result": { "id": -100, "type": "supergroup", "title": "Zulu Club" } }))
}

async fn member() -> Json<Value> {
    Json(json!({ "ok": true, "result": { "status": "administrator" } }))
}

async fn not_member() -> (StatusCode, Json<Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "ok": false, "error_code": 400, "description": "Bad Request: user not found" })),
    )
}

async fn chat_not_found() -> (StatusCode, Json<Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "ok": false, "error_code": 400, "description": "Bad Request: chat not found" })),
    )
}

#[allow(clippy::unwrap_used)]
fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

fn start_update(update_id: i64, chat_type: &str, text: &str, date: i64) -> Value {
    json!({
        "update_id": update_id,
        "message": {
            "date": date,
            "text": text,
            "from": { "id": 4242, "is_bot": false, "first_name": "Anna" },
            "chat": { "id": 4242, "type": chat_type, "first_name": "Anna" }
        }
    })
}

fn quick_retry(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        step: Duration::from_millis(1),
    }
}

/// WHAT: Token format is checked locally
/// WHY: Obviously malformed tokens should not hit the network
#[test]
fn given_tokens_when_checking_format_then_only_digits_colon_secret_accepted() {
    assert!(is_valid_token(TOKEN));
    assert!(!is_valid_token("abc:def"));
    assert!(!is_valid_token("123456:"));
    assert!(!is_valid_token("123456:has space"));
    assert!(!is_valid_token("123456"));
}

/// WHAT: getMe returns the bot identity
/// WHY: Validating the bot is the first Telegram setup step
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_valid_token_when_getting_me_then_bot_info() {
    // Given: A fake API answering getMe
    let base = spawn_fake(Router::new().route(&route("getMe"), post(get_me))).await;

    // When: Validating the token
    let bot = client(&base).get_me().await.unwrap();

    // Then: Identity is mapped
    assert_eq!(bot.id, "777");
    assert_eq!(bot.username, "vario_bot");
    assert_eq!(bot.first_name, "Vario Bot");
}

/// WHAT: A malformed token fails without a request
/// WHY: The error is local and immediate
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_malformed_token_when_getting_me_then_telegram_error() {
    let client = TelegramClient::new("http://127.0.0.1:9", "nope", Duration::from_secs(1)).unwrap();

    let result = client.get_me().await;

    assert!(matches!(result, Err(CoreError::Telegram { .. })));
}

/// WHAT: ok=false replies carry the API description into the error
/// WHY: The pilot needs to see why a message was rejected
#[tokio::test]
async fn given_api_rejection_when_sending_then_description_in_error() {
    let base = spawn_fake(Router::new().route(&route("sendMessage"), post(chat_not_found))).await;

    let result = client(&base).send_message("-1", "hello").await;

    assert!(matches!(
        &result,
        Err(CoreError::Telegram { reason, .. }) if reason.contains("chat not found")
    ));
}

/// WHAT: The position message is posted as text with a maps link
/// WHY: Receivers open the link to find the pilot
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_position_when_sending_then_text_contains_maps_link() {
    // Given: A fake sendMessage that records the body
    let seen = Arc::new(std::sync::Mutex::new(Value::Null));
    let router = Router::new()
        .route(
            &route("sendMessage"),
            post(
                |State(seen): State<Arc<std::sync::Mutex<Value>>>, Json(body): Json<Value>| async move {
                    *seen.lock().unwrap_or_else(|e| e.into_inner()) = body;
                    Json(json!({ "ok": true, "result": { "message_id": 1 } }))
                },
            ),
        )
        .with_state(seen.clone());
    let base = spawn_fake(router).await;

    // When: Sending a position
    client(&base)
        .send_position("42", 46.5, 7.25, Some("Anna"), Some("LANDING"))
        .await
        .unwrap();

    // Then: The text names pilot, event and the link
    let body = seen.lock().unwrap().clone();
    assert_eq!(body["chat_id"], "42");
    assert_eq!(
        body["text"],
        "Position from Anna (LANDING): https://maps.google.com/?q=46.500000,7.250000"
    );
}

/// WHAT: 400 from getChatMember means not a member
/// WHY: Users who left a group are reported as absent, not as errors
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_bad_request_when_getting_member_then_none() {
    let base = spawn_fake(Router::new().route(&route("getChatMember"), post(not_member))).await;

    let status = client(&base).get_chat_member("-100", "5").await.unwrap();

    assert!(status.is_none());
}

/// WHAT: Private chats are accessible without API calls
/// WHY: A private chat with the bot always accepts messages
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_private_chat_when_checking_access_then_full_access() {
    let access = client("http://127.0.0.1:9")
        .check_bot_access("42", false, None)
        .await
        .unwrap();

    assert!(access.bot_member && access.bot_active && access.user_member);
}

/// WHAT: Discovery lists each chat once, groups first
/// WHY: Group chats are the usual target for flight updates
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_updates_with_repeats_when_discovering_then_distinct_groups_first() {
    let base = spawn_fake(Router::new().route(&route("getUpdates"), post(updates))).await;

    let chats = client(&base).discover_chats().await.unwrap();

    let ids: Vec<_> = chats.iter().map(|c| c.chat_id.as_str()).collect();
    assert_eq!(ids, ["-100", "-200", "42"]);
    assert_eq!(chats[2].title, "Anna Pilot");
    assert!(chats[0].is_group && !chats[2].is_group);
}

/// WHAT: Fetch retries transient failures, then caches the sorted result
/// WHY: Telegram is reached over flaky mobile links
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_two_failures_when_fetching_chats_then_third_attempt_succeeds_and_caches() {
    // Given: getUpdates fails twice before answering
    let attempts = Arc::new(AtomicU32::new(0));
    let router = Router::new()
        .route(
            &route("getUpdates"),
            post(|State(attempts): State<Arc<AtomicU32>>| async move {
                let response: Response = if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                    (StatusCode::BAD_GATEWAY, "upstream down").into_response()
                } else {
                    updates().await.into_response()
                };
                response
            }),
        )
        .route(&route("getChat"), post(get_chat))
        .route(&route("getMe"), post(get_me))
        .route(&route("getChatMember"), post(member))
        .with_state(attempts.clone());
    let base = spawn_fake(router).await;
    let preferences = Arc::new(Preferences::in_memory());
    let directory = ChatDirectory::new(
        client(&base),
        preferences.clone(),
        RetryPolicy {
            max_retries: 3,
            step: Duration::from_millis(1),
        },
    );

    // When: Fetching chats
    let chats = directory.fetch_chats().await.unwrap();

    // Then: Three attempts, sorted by title, cached
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    let titles: Vec<_> = chats.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(titles, ["Alpha Team", "Anna Pilot", "Zulu Club"]);
    assert_eq!(preferences.cached_chats(), chats);
}

/// WHAT: Persistent failure gives up after the configured retries
/// WHY: The caller surfaces the error instead of waiting forever
#[tokio::test]
async fn given_permanent_failure_when_fetching_chats_then_error_after_retries() {
    let attempts = Arc::new(AtomicU32::new(0));
    let router = Router::new()
        .route(
            &route("getUpdates"),
            post(|State(attempts): State<Arc<AtomicU32>>| async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                (StatusCode::BAD_GATEWAY, "upstream down")
            }),
        )
        .with_state(attempts.clone());
    let base = spawn_fake(router).await;
    let directory = ChatDirectory::new(
        client(&base),
        Arc::new(Preferences::in_memory()),
        RetryPolicy {
            max_retries: 2,
            step: Duration::from_millis(1),
        },
    );

    let result = directory.fetch_chats().await;

    assert!(matches!(result, Err(CoreError::Telegram { .. })));
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

/// WHAT: A chat that fails its access check is left out of the refresh
/// WHY: One stale group must not hide every other chat
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_one_unreachable_group_when_fetching_chats_then_others_returned() {
    // Given: getChat rejects -300 but answers for -100
    let router = Router::new()
        .route(
            &route("getUpdates"),
            post(|| async {
                Json(json!({
                    "ok": true,
                    "result": [
                        { "update_id": 1, "message": { "chat": { "id": 42, "type": "private", "first_name": "Anna", "last_name": "Pilot" } } },
                        { "update_id": 2, "message": { "chat": { "id": -100, "type": "supergroup", "title": "Zulu Club" } } },
                        { "update_id": 3, "message": { "chat": { "id": -300, "type": "group", "title": "Gone Group" } } }
                    ]
                }))
            }),
        )
        .route(
            &route("getChat"),
            post(|Json(body): Json<Value>| async move {
                let response: Response = if body["chat_id"] == "-300" {
                    chat_not_found().await.into_response()
                } else {
                    get_chat().await.into_response()
                };
                response
            }),
        )
        .route(&route("getMe"), post(get_me))
        .route(&route("getChatMember"), post(member));
    let base = spawn_fake(router).await;
    let preferences = Arc::new(Preferences::in_memory());
    let directory = ChatDirectory::new(client(&base), preferences.clone(), quick_retry(0));

    // When: Refreshing chats
    let chats = directory.fetch_chats().await.unwrap();

    // Then: The reachable chats are listed and cached, the broken one is not
    let ids: Vec<_> = chats.iter().map(|c| c.chat_id.as_str()).collect();
    assert_eq!(ids, ["42", "-100"]);
    assert_eq!(preferences.cached_chats(), chats);
}

/// WHAT: A recent private /start reveals and stores the pilot's user id
/// WHY: Group membership checks need the pilot's id
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_recent_start_when_fetching_user_id_then_stored_and_validated() {
    // Given: An old /start, a group /start and a fresh private /start
    let now = now_secs();
    let router = Router::new().route(
        &route("getUpdates"),
        post(move || async move {
            Json(json!({
                "ok": true,
                "result": [
                    start_update(1, "private", "/start", now - 3600),
                    start_update(2, "group", "/start", now),
                    start_update(3, "private", "hello", now),
                    start_update(4, "private", " /start ", now)
                ]
            }))
        }),
    );
    let base = spawn_fake(router).await;
    let preferences = Arc::new(Preferences::in_memory());
    preferences.set_user_id(Some("1")).unwrap();
    let directory = ChatDirectory::new(client(&base), preferences.clone(), quick_retry(0))
        .with_user_id_retry(quick_retry(0));

    // When: Fetching the user id
    let user_id = directory.fetch_user_id().await.unwrap();

    // Then: Sender of the fresh private /start is saved
    assert_eq!(user_id, "4242");
    assert_eq!(preferences.user_id().as_deref(), Some("4242"));
    assert!(preferences.telegram_validated());
}

/// WHAT: Polling resumes after the last update already seen
/// WHY: Stale updates should not be fetched again on every retry
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_start_arrives_later_when_fetching_user_id_then_found_on_retry() {
    // Given: First poll has nothing, the second (from offset 8) has /start
    let offsets = Arc::new(std::sync::Mutex::new(Vec::new()));
    let router = Router::new()
        .route(
            &route("getUpdates"),
            post(
                |State(offsets): State<Arc<std::sync::Mutex<Vec<Value>>>>,
                 Json(body): Json<Value>| async move {
                    let offset = body["offset"].clone();
                    offsets.lock().unwrap().push(offset.clone());
                    let result = if offset.is_null() {
                        json!([{ "update_id": 7 }])
                    } else {
                        json!([start_update(8, "private", "/start", now_secs())])
                    };
                    Json(json!({ "ok": true, "result": result }))
                },
            ),
        )
        .with_state(offsets.clone());
    let base = spawn_fake(router).await;
    let preferences = Arc::new(Preferences::in_memory());
    let directory = ChatDirectory::new(client(&base), preferences.clone(), quick_retry(0))
        .with_user_id_retry(quick_retry(2));

    // When: Fetching the user id
    let user_id = directory.fetch_user_id().await.unwrap();

    // Then: Second poll started after update 7
    assert_eq!(user_id, "4242");
    assert_eq!(*offsets.lock().unwrap(), [Value::Null, json!(8)]);
}

/// WHAT: Without a fresh /start the lookup fails and leaves no identity
/// WHY: A previous pilot's id must not survive a failed re-link
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_only_stale_start_when_fetching_user_id_then_error_and_cleared() {
    // Given: The only /start is ten minutes old
    let attempts = Arc::new(AtomicU32::new(0));
    let router = Router::new()
        .route(
            &route("getUpdates"),
            post(|State(attempts): State<Arc<AtomicU32>>| async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Json(json!({
                    "ok": true,
                    "result": [start_update(1, "private", "/start", now_secs() - 600)]
                }))
            }),
        )
        .with_state(attempts.clone());
    let base = spawn_fake(router).await;
    let preferences = Arc::new(Preferences::in_memory());
    preferences.set_user_id(Some("1")).unwrap();
    preferences.set_telegram_validated(true).unwrap();
    let directory = ChatDirectory::new(client(&base), preferences.clone(), quick_retry(0))
        .with_user_id_retry(quick_retry(2));

    // When: Fetching the user id
    let result = directory.fetch_user_id().await;

    // Then: Error after every retry, identity cleared
    assert!(matches!(result, Err(CoreError::Telegram { .. })));
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    assert!(preferences.user_id().is_none());
    assert!(!preferences.telegram_validated());
}

/// WHAT: Backoff grows linearly with the attempt number
/// WHY: Matches the fixed retry schedule of chat discovery
#[test]
fn given_step_when_computing_delays_then_linear() {
    let policy = RetryPolicy {
        max_retries: 3,
        step: Duration::from_millis(1000),
    };
    assert_eq!(policy.delay(0), Duration::from_millis(1000));
    assert_eq!(policy.delay(2), Duration::from_millis(3000));
}

/// WHAT: Merge keeps fresh entries, drops duplicates and left groups
/// WHY: The cache must not resurrect groups the pilot has left
#[test]
fn given_fresh_and_cached_chats_when_merging_then_distinct_and_member_only() {
    let fresh = vec![chat("-1", "Club", true, true), chat("42", "Anna", false, false)];
    let cached = vec![
        chat("-1", "Old club title", true, true),
        chat("-2", "Left group", true, false),
        chat("-3", "Kept group", true, true),
    ];

    let merged = merge_chats(fresh, cached);

    let titles: Vec<_> = merged.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(titles, ["Club", "Anna", "Kept group"]);
}

/// WHAT: Message text gets the pilot prefix only when a name is set
/// WHY: Recipients need to know who sent the alert
#[test]
fn given_pilot_name_when_formatting_message_then_prefixed() {
    assert_eq!(format::message_text(Some("Anna"), "Landed"), "Anna: Landed");
    assert_eq!(format::message_text(Some("  "), "Landed"), "Landed");
    assert_eq!(format::message_text(None, "Landed"), "Landed");
}

/// WHAT: Position wording covers all four pilot/event combinations
/// WHY: Missing context must still produce a readable message
#[test]
fn given_pilot_and_event_combinations_when_formatting_position_then_four_wordings() {
    let link = "https://maps.google.com/?q=1.000000,2.000000";
    assert_eq!(
        format::position_text(Some("Anna"), Some("TAKEOFF"), 1.0, 2.0),
        format!("Position from Anna (TAKEOFF): {link}")
    );
    assert_eq!(
        format::position_text(Some("Anna"), None, 1.0, 2.0),
        format!("Position from Anna: {link}")
    );
    assert_eq!(
        format::position_text(None, Some("TAKEOFF"), 1.0, 2.0),
        format!("Position (TAKEOFF): {link}")
    );
    assert_eq!(format::position_text(None, None, 1.0, 2.0), format!("Position: {link}"));
}
