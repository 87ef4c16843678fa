use crate::config::{
    default_api_base_url, default_max_retries, default_request_timeout_secs, default_retry_step_ms,
    default_user_id_retry_step_ms,
};

use xct_addon_core::telegram::RetryPolicy;

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Telegram bot configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot token; Telegram actions are skipped without one.
    #[serde(default)]
    pub bot_token: Option<String>,
    /// Bot API endpoint.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Retries after a failed chat refresh.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Linear backoff step in milliseconds.
    #[serde(default = "default_retry_step_ms")]
    pub retry_step_ms: u64,
    /// Backoff step in milliseconds while waiting for the pilot's `/start`.
    #[serde(default = "default_user_id_retry_step_ms")]
    pub user_id_retry_step_ms: u64,
    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            api_base_url: default_api_base_url(),
            max_retries: default_max_retries(),
            retry_step_ms: default_retry_step_ms(),
            user_id_retry_step_ms: default_user_id_retry_step_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl TelegramConfig {
    /// Configured token, ignoring blanks.
    pub fn token(&self) -> Option<&str> {
        self.bot_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// Retry schedule for chat discovery.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            step: Duration::from_millis(self.retry_step_ms),
        }
    }

    /// Retry schedule for learning the pilot's user id.
    pub fn user_id_retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            step: Duration::from_millis(self.user_id_retry_step_ms),
        }
    }

    /// Request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
