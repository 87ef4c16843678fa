//! Chat discovery with retry and a persisted cache.

use crate::{
    CoreError, CoreResult, Preferences,
    telegram::{TelegramChat, TelegramClient},
};

use std::{
    collections::HashSet,
    panic::Location,
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use error_location::ErrorLocation;
use tracing::{debug, info, instrument, warn};

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default delay step between attempts.
pub const DEFAULT_RETRY_STEP: Duration = Duration::from_millis(1000);

/// Default delay step while waiting for the pilot's `/start`.
pub const DEFAULT_USER_ID_RETRY_STEP: Duration = Duration::from_millis(2000);

/// How far back a `/start` message may have been sent.
pub const START_WINDOW: Duration = Duration::from_secs(60);

/// Linear backoff: attempt `n` (0-based) waits `step * (n + 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay multiplied by the attempt number.
    pub step: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            step: DEFAULT_RETRY_STEP,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt`.
    pub fn delay(&self, attempt: u32) -> Duration {
        self.step.saturating_mul(attempt.saturating_add(1))
    }
}

/// Chats the bot can post to, merged with the cached list.
#[derive(Debug, Clone)]
pub struct ChatDirectory {
    client: TelegramClient,
    preferences: Arc<Preferences>,
    retry: RetryPolicy,
    user_id_retry: RetryPolicy,
}

impl ChatDirectory {
    /// Directory using `client` and caching into `preferences`.
    pub fn new(client: TelegramClient, preferences: Arc<Preferences>, retry: RetryPolicy) -> Self {
        Self {
            client,
            preferences,
            retry,
            user_id_retry: RetryPolicy {
                max_retries: DEFAULT_MAX_RETRIES,
                step: DEFAULT_USER_ID_RETRY_STEP,
            },
        }
    }

    /// Use `retry` while waiting for the pilot's `/start`.
    pub fn with_user_id_retry(mut self, retry: RetryPolicy) -> Self {
        self.user_id_retry = retry;
        self
    }

    /// Cached chats, sorted by title.
    pub fn cached(&self) -> Vec<TelegramChat> {
        let mut chats = self.preferences.cached_chats();
        sort_by_title(&mut chats);
        chats
    }

    /// Refresh from the API, retrying on failure, and update the cache.
    #[instrument(skip(self))]
    pub async fn fetch_chats(&self) -> CoreResult<Vec<TelegramChat>> {
        let mut attempt = 0;
        loop {
            match self.try_fetch().await {
                Ok(chats) => return Ok(chats),
                Err(e) if attempt < self.retry.max_retries => {
                    let delay = self.retry.delay(attempt);
                    warn!(attempt, delay_ms = delay.as_millis() as u64, error = %e, "Chat fetch failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(CoreError::Telegram {
                        reason: format!(
                            "Failed to fetch chats after {} retries: {}",
                            self.retry.max_retries, e
                        ),
                        location: ErrorLocation::from(Location::caller()),
                    });
                }
            }
        }
    }

    /// Learn the pilot's Telegram user id from a private `/start` sent to
    /// the bot within [`START_WINDOW`].
    ///
    /// Clears the stored id and validation flag first. On success both are
    /// saved; otherwise the updates are polled again on the user-id retry
    /// schedule, skipping updates already seen.
    #[instrument(skip(self))]
    pub async fn fetch_user_id(&self) -> CoreResult<String> {
        self.preferences.set_user_id(None)?;
        self.preferences.set_telegram_validated(false)?;

        let mut offset = None;
        let mut attempt = 0;
        loop {
            match self.client.scan_for_start(offset, start_cutoff()).await {
                Ok(scan) => {
                    if let Some(user_id) = scan.user_id {
                        self.preferences.set_user_id(Some(user_id.as_str()))?;
                        self.preferences.set_telegram_validated(true)?;
                        info!(user_id = %user_id, "Pilot user id stored");
                        return Ok(user_id);
                    }
                    offset = scan.next_offset;
                    debug!(attempt, "No recent /start message yet");
                }
                Err(e) => warn!(attempt, error = %e, "Polling for /start failed"),
            }

            if attempt >= self.user_id_retry.max_retries {
                return Err(CoreError::Telegram {
                    reason: format!(
                        "No /start message received after {} retries; send /start to the bot and try again",
                        self.user_id_retry.max_retries
                    ),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
            tokio::time::sleep(self.user_id_retry.delay(attempt)).await;
            attempt += 1;
        }
    }

    async fn try_fetch(&self) -> CoreResult<Vec<TelegramChat>> {
        let user_id = self.preferences.user_id();
        let cached = self.preferences.cached_chats();

        let discovered = self.client.discover_chats().await?;
        let validated = if discovered.is_empty() {
            debug!(cached = cached.len(), "No new chats, revalidating cached groups");
            self.revalidate_cached(&cached, user_id.as_deref()).await
        } else {
            self.validate(discovered, user_id.as_deref()).await
        };

        let mut merged = merge_chats(validated, cached);
        sort_by_title(&mut merged);
        self.preferences.set_cached_chats(merged.clone())?;

        info!(count = merged.len(), "Chat list refreshed");
        Ok(merged)
    }

    /// Access-check each chat on its own; unreachable chats are dropped.
    async fn validate(&self, chats: Vec<TelegramChat>, user_id: Option<&str>) -> Vec<TelegramChat> {
        let mut validated = Vec::with_capacity(chats.len());
        for mut chat in chats {
            let access = match self
                .client
                .check_bot_access(&chat.chat_id, chat.is_group, user_id)
                .await
            {
                Ok(access) => access,
                Err(e) => {
                    warn!(chat_id = %chat.chat_id, title = %chat.title, error = %e, "Chat not reachable, skipping");
                    continue;
                }
            };
            chat.is_bot_member = access.bot_member;
            chat.is_bot_active = access.bot_active;
            chat.is_user_member = access.user_member;
            validated.push(chat);
        }
        validated
    }

    async fn revalidate_cached(
        &self,
        cached: &[TelegramChat],
        user_id: Option<&str>,
    ) -> Vec<TelegramChat> {
        let mut still_valid = Vec::new();
        for chat in cached.iter().filter(|c| c.is_group) {
            let refreshed = match self.client.get_chat(&chat.chat_id).await {
                Ok(refreshed) => refreshed,
                Err(e) => {
                    debug!(chat_id = %chat.chat_id, error = %e, "Cached group no longer reachable");
                    continue;
                }
            };
            match self
                .client
                .check_bot_access(&chat.chat_id, true, user_id)
                .await
            {
                Ok(access) if access.bot_member && access.user_member => {
                    still_valid.push(TelegramChat {
                        is_bot_member: access.bot_member,
                        is_bot_active: access.bot_active,
                        is_user_member: access.user_member,
                        ..refreshed
                    });
                }
                Ok(_) => debug!(chat_id = %chat.chat_id, "Cached group lost membership"),
                Err(e) => debug!(chat_id = %chat.chat_id, error = %e, "Access check failed"),
            }
        }
        still_valid
    }
}

/// Fresh chats first, then cached ones not seen again; groups the pilot left
/// are dropped.
pub fn merge_chats(fresh: Vec<TelegramChat>, cached: Vec<TelegramChat>) -> Vec<TelegramChat> {
    let mut seen = HashSet::new();
    fresh
        .into_iter()
        .chain(cached)
        .filter(|chat| seen.insert(chat.chat_id.clone()))
        .filter(|chat| chat.is_user_member || !chat.is_group)
        .collect()
}

fn start_cutoff() -> i64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    now.saturating_sub(START_WINDOW.as_secs()) as i64
}

fn sort_by_title(chats: &mut [TelegramChat]) {
    chats.sort_by(|a, b| a.title.to_lowercase().cmp(&b.title.to_lowercase()));
}
