mod audio_config;
#[allow(clippy::module_inception)]
mod config;
mod ptt_config;
mod receiver_config;
mod server_config;
mod storage_config;
mod telegram_config;

pub(crate) use {
    audio_config::{AudioConfig, SystemVolumeConfig},
    config::Config,
    ptt_config::PttConfig,
    receiver_config::ReceiverConfig,
    server_config::ServerConfig,
    storage_config::StorageConfig,
    telegram_config::TelegramConfig,
};

use xct_addon_core::{DEFAULT_PTT_ACTION, telegram};

use std::path::PathBuf;

use directories::ProjectDirs;

pub(crate) const QUALIFIER: &str = "com";
pub(crate) const ORGANIZATION: &str = "xct-addon";
pub(crate) const APPLICATION: &str = "XCT-Addon";

pub(crate) const DEFAULT_MAX_CONNECTIONS: u32 = 4;
pub(crate) const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:47810";
pub(crate) const DEFAULT_PTT_TARGET: &str = "127.0.0.1:47811";
pub(crate) const DEFAULT_STAY_HIDDEN: bool = true;
pub(crate) const DEFAULT_SYSTEM_VOLUME_CURRENT: u32 = 10;
pub(crate) const DEFAULT_SYSTEM_VOLUME_MAX: u32 = 15;
pub(crate) const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
pub(crate) const DEFAULT_PORT: u16 = 7878;

/// Per-user data directory; the working directory when none is known.
pub(crate) fn data_dir() -> PathBuf {
    ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION)
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

pub(crate) fn default_database_path() -> PathBuf {
    data_dir().join("xct_addon.sqlite")
}

pub(crate) fn default_max_connections() -> u32 {
    DEFAULT_MAX_CONNECTIONS
}

pub(crate) fn default_bind_address() -> String {
    DEFAULT_BIND_ADDRESS.to_string()
}

pub(crate) fn default_sounds_dir() -> PathBuf {
    data_dir().join("Sounds")
}

pub(crate) fn default_system_volume() -> SystemVolumeConfig {
    SystemVolumeConfig {
        current: DEFAULT_SYSTEM_VOLUME_CURRENT,
        max: DEFAULT_SYSTEM_VOLUME_MAX,
    }
}

pub(crate) fn default_ptt_target() -> String {
    DEFAULT_PTT_TARGET.to_string()
}

pub(crate) fn default_ptt_action() -> String {
    DEFAULT_PTT_ACTION.to_string()
}

pub(crate) fn default_stay_hidden() -> bool {
    DEFAULT_STAY_HIDDEN
}

pub(crate) fn default_api_base_url() -> String {
    telegram::DEFAULT_API_BASE_URL.to_string()
}

pub(crate) fn default_max_retries() -> u32 {
    telegram::DEFAULT_MAX_RETRIES
}

pub(crate) fn default_retry_step_ms() -> u64 {
    telegram::DEFAULT_RETRY_STEP.as_millis() as u64
}

pub(crate) fn default_user_id_retry_step_ms() -> u64 {
    telegram::DEFAULT_USER_ID_RETRY_STEP.as_millis() as u64
}

pub(crate) fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

pub(crate) fn default_port() -> u16 {
    DEFAULT_PORT
}
