//! XCT-Addon: reacts to XCTrack flight events with sounds, app launches,
//! push-to-talk and Telegram messages.

mod app;
mod app_command;
mod config;
mod error;
mod event_receiver;
mod settings_server;

pub(crate) use {
    app::App,
    app_command::AppCommand,
    error::{AppError, Result as AppResult},
    event_receiver::EventReceiver,
    settings_server::SettingsState,
};

use crate::config::Config;

use xct_addon_core::{
    ActionRunner, BindingStore, ChatDirectory, Dispatcher, LastKnownPosition, MessageStore,
    OpenLauncher, Player, Preferences, RodioOutput, SoundLibrary, TaskStore, TelegramClient,
    UdpBroadcastEmitter, init_database,
};

use std::{net::SocketAddr, panic::Location, sync::Arc};

use error_location::ErrorLocation;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "xct_addon=debug,xct_addon_core=debug";
const LOG_FILE_PREFIX: &str = "xct-addon.log";
const COMMAND_CHANNEL_CAPACITY: usize = 32;

/// Application entry point.
fn main() {
    let _log_guard = init_logging();

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load config: {:?}", e);
            std::process::exit(1);
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to create tokio runtime: {:?}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = rt.block_on(run(config)) {
        error!(error = ?e, "XCT-Addon failed");
        std::process::exit(1);
    }
}

/// Console plus daily rolling file output. The returned guard flushes the
/// file writer when dropped.
fn init_logging() -> WorkerGuard {
    let file_appender = tracing_appender::rolling::daily(Config::log_dir(), LOG_FILE_PREFIX);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .init();

    guard
}

async fn run(config: Config) -> AppResult<()> {
    let db = init_database(
        &config.storage.database_path.to_string_lossy(),
        config.storage.max_connections,
    )
    .await?;
    let store = BindingStore::new(&db);
    if let Some(seeded) = store.ensure_default().await? {
        info!(binding_id = seeded.id, event = %seeded.event, "Seeded default binding");
    }

    let library = SoundLibrary::new(
        config.audio.sounds_dir.clone(),
        config.audio.bundled_sounds_dir.clone(),
    );
    let player = Arc::new(Player::new(
        Arc::new(RodioOutput),
        library,
        config.audio.system_volume.into(),
    ));

    let ptt_target: SocketAddr =
        config
            .ptt
            .target_address
            .parse()
            .map_err(|e| AppError::ConfigError {
                reason: format!(
                    "Invalid PTT target address {}: {}",
                    config.ptt.target_address, e
                ),
                location: ErrorLocation::from(Location::caller()),
            })?;
    let ptt = UdpBroadcastEmitter::new(ptt_target, config.ptt.action.clone(), config.ptt.stay_hidden);

    let preferences = Arc::new(Preferences::load(Config::preferences_path()?));

    let mut runner = ActionRunner::new(
        player,
        Arc::new(OpenLauncher),
        Arc::new(ptt),
        Arc::new(LastKnownPosition::new()),
        preferences.clone(),
    );

    let chats = match config.telegram.token() {
        Some(token) => {
            let client = TelegramClient::new(
                config.telegram.api_base_url.clone(),
                token,
                config.telegram.timeout(),
            )?;
            runner = runner.with_telegram(client.clone());
            Some(
                ChatDirectory::new(client, preferences, config.telegram.retry_policy())
                    .with_user_id_retry(config.telegram.user_id_retry_policy()),
            )
        }
        None => {
            warn!("No Telegram bot token configured, Telegram actions are disabled");
            None
        }
    };

    let dispatcher = Dispatcher::new(store, Arc::new(runner));

    let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let receiver = EventReceiver::bind(&config.receiver.bind_address, command_tx.clone()).await?;

    let settings = SettingsState {
        dispatcher: dispatcher.clone(),
        messages: MessageStore::new(&db),
        tasks: TaskStore::new(&db),
        chats,
        command_tx: command_tx.clone(),
    };

    let app = App {
        dispatcher,
        command_rx,
        shutdown_tx,
    };

    info!(settings_url = %config.server_url(), "Settings API available");

    let ctrl_c_tx = command_tx;
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = ?e, "Failed to listen for Ctrl-C");
            return;
        }
        info!("Ctrl-C received");
        if let Err(e) = ctrl_c_tx.send(AppCommand::Shutdown).await {
            warn!(error = ?e, "Application loop already stopped");
        }
    });

    let server_shutdown = shutdown_rx.clone();
    tokio::join!(
        async {
            if let Err(e) = receiver.run(shutdown_rx).await {
                error!(error = ?e, "Event receiver error");
            }
        },
        async {
            if let Err(e) =
                settings_server::serve(settings, config.server.port, server_shutdown).await
            {
                error!(error = ?e, "Settings server error");
            }
        },
        async {
            if let Err(e) = app.run().await {
                error!(error = ?e, "App error");
            }
        }
    );

    Ok(())
}
