//! Telegram Bot API client.

use crate::{
    CoreError, CoreResult,
    telegram::format,
    telegram::models::{
        ApiChat, ApiChatMember, ApiResponse, ApiUpdate, ApiUser, BotInfo, ChatAccess, StartScan,
        TelegramChat,
    },
};

use std::{collections::HashSet, panic::Location, time::Duration};

use error_location::ErrorLocation;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, info, instrument, warn};

/// Default Bot API endpoint.
pub const DEFAULT_API_BASE_URL: &str = "https://api.telegram.org";

/// Page size for `getUpdates`.
pub const UPDATES_PAGE_LIMIT: usize = 1000;

const MEMBER_STATUSES: [&str; 3] = ["member", "administrator", "creator"];

/// True when `token` looks like `<digits>:<[A-Za-z0-9_-]+>`.
pub fn is_valid_token(token: &str) -> bool {
    let Some((id, secret)) = token.split_once(':') else {
        return false;
    };
    !id.is_empty()
        && id.chars().all(|c| c.is_ascii_digit())
        && !secret.is_empty()
        && secret
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// HTTP client for one bot token.
#[derive(Debug, Clone)]
pub struct TelegramClient {
    client: Client,
    base_url: String,
    token: String,
}

impl TelegramClient {
    /// Client for `token` against `base_url`.
    #[track_caller]
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> CoreResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }

    async fn call_envelope<T: DeserializeOwned>(
        &self,
        method: &str,
        body: &Value,
    ) -> CoreResult<ApiResponse<T>> {
        let response = self
            .client
            .post(self.method_url(method))
            .json(body)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;

        serde_json::from_str::<ApiResponse<T>>(&text).map_err(|e| CoreError::Telegram {
            reason: format!("{} returned unreadable reply (HTTP {}): {}", method, status, e),
            location: ErrorLocation::from(Location::caller()),
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, body: &Value) -> CoreResult<T> {
        let envelope = self.call_envelope::<T>(method, body).await?;
        match (envelope.ok, envelope.result) {
            (true, Some(result)) => Ok(result),
            (true, None) => Err(CoreError::Telegram {
                reason: format!("{} returned no result", method),
                location: ErrorLocation::from(Location::caller()),
            }),
            (false, _) => Err(CoreError::Telegram {
                reason: format!(
                    "{} failed ({}): {}",
                    method,
                    envelope.error_code.unwrap_or_default(),
                    envelope
                        .description
                        .unwrap_or_else(|| "unknown error".to_string())
                ),
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }

    /// Validate the token and fetch the bot's identity.
    #[instrument(skip(self))]
    pub async fn get_me(&self) -> CoreResult<BotInfo> {
        if !is_valid_token(&self.token) {
            return Err(CoreError::Telegram {
                reason: "Bot token has an invalid format".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let user: ApiUser = self.call("getMe", &json!({})).await?;
        let info = BotInfo {
            id: user.id.to_string(),
            username: user.username.unwrap_or_default(),
            first_name: user.first_name,
        };
        info!(bot = %info.username, "Bot token validated");
        Ok(info)
    }

    /// Post `text` to `chat_id`.
    #[instrument(skip(self, text))]
    pub async fn send_message(&self, chat_id: &str, text: &str) -> CoreResult<()> {
        let _: Value = self
            .call("sendMessage", &json!({ "chat_id": chat_id, "text": text }))
            .await?;
        info!(chat_id, "Telegram message sent");
        Ok(())
    }

    /// Post a maps link for a position, worded after pilot and event.
    #[instrument(skip(self, pilot))]
    pub async fn send_position(
        &self,
        chat_id: &str,
        latitude: f64,
        longitude: f64,
        pilot: Option<&str>,
        event: Option<&str>,
    ) -> CoreResult<()> {
        let text = format::position_text(pilot, event, latitude, longitude);
        self.send_message(chat_id, &text).await
    }

    /// Look up a single chat.
    #[instrument(skip(self))]
    pub async fn get_chat(&self, chat_id: &str) -> CoreResult<TelegramChat> {
        let chat: ApiChat = self.call("getChat", &json!({ "chat_id": chat_id })).await?;
        Ok(chat.into_chat())
    }

    /// Membership status of `user_id` in `chat_id`, or `None` when the API
    /// answers 400/403 (not in the chat, or chat hidden from the bot).
    #[instrument(skip(self))]
    pub async fn get_chat_member(&self, chat_id: &str, user_id: &str) -> CoreResult<Option<String>> {
        let envelope = self
            .call_envelope::<ApiChatMember>(
                "getChatMember",
                &json!({ "chat_id": chat_id, "user_id": user_id }),
            )
            .await?;

        match (envelope.ok, envelope.result, envelope.error_code) {
            (true, Some(member), _) => Ok(Some(member.status)),
            (false, _, Some(400 | 403)) => Ok(None),
            (_, _, code) => Err(CoreError::Telegram {
                reason: format!(
                    "getChatMember failed ({}): {}",
                    code.unwrap_or_default(),
                    envelope
                        .description
                        .unwrap_or_else(|| "unknown error".to_string())
                ),
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }

    /// Whether the bot, and optionally the pilot, are members of a chat.
    ///
    /// Private chats are always reachable. For groups the pilot is assumed a
    /// member when no `user_id` is known.
    #[instrument(skip(self))]
    pub async fn check_bot_access(
        &self,
        chat_id: &str,
        is_group: bool,
        user_id: Option<&str>,
    ) -> CoreResult<ChatAccess> {
        if !is_group {
            return Ok(ChatAccess::FULL);
        }

        self.get_chat(chat_id).await?;
        let bot = self.get_me().await?;
        let bot_status = self.get_chat_member(chat_id, &bot.id).await?;
        let bot_member = bot_status
            .as_deref()
            .is_some_and(|s| MEMBER_STATUSES.contains(&s));

        let user_member = match user_id {
            Some(user_id) => self
                .get_chat_member(chat_id, user_id)
                .await?
                .as_deref()
                .is_some_and(|s| MEMBER_STATUSES.contains(&s)),
            None => true,
        };

        debug!(chat_id, bot_member, user_member, "Chat access checked");
        Ok(ChatAccess {
            bot_member,
            bot_active: bot_member,
            user_member,
        })
    }

    /// One page of updates starting at `offset`.
    pub(crate) async fn get_updates(&self, offset: Option<i64>) -> CoreResult<Vec<ApiUpdate>> {
        let mut body = json!({ "limit": UPDATES_PAGE_LIMIT });
        if let Some(offset) = offset {
            body["offset"] = json!(offset);
        }
        self.call("getUpdates", &body).await
    }

    /// Scan pending updates from `offset` for a private `/start` sent at or
    /// after `not_before` (unix seconds). The returned offset skips every
    /// update seen.
    #[instrument(skip(self))]
    pub(crate) async fn scan_for_start(
        &self,
        offset: Option<i64>,
        not_before: i64,
    ) -> CoreResult<StartScan> {
        let mut next_offset = offset;
        loop {
            let updates = self.get_updates(next_offset).await?;
            let page_len = updates.len();

            for update in updates {
                next_offset = Some(update.update_id + 1);
                let sender = update
                    .message
                    .as_ref()
                    .and_then(|m| m.start_sender(not_before));
                if let Some(user_id) = sender {
                    debug!(user_id, update_id = update.update_id, "Found /start from pilot");
                    return Ok(StartScan {
                        user_id: Some(user_id.to_string()),
                        next_offset,
                    });
                }
            }

            if page_len < UPDATES_PAGE_LIMIT {
                return Ok(StartScan {
                    user_id: None,
                    next_offset,
                });
            }
        }
    }

    /// Chats seen in pending updates, groups first, each listed once.
    #[instrument(skip(self))]
    pub async fn discover_chats(&self) -> CoreResult<Vec<TelegramChat>> {
        let mut offset = None;
        let mut seen = HashSet::new();
        let mut groups = Vec::new();
        let mut private = Vec::new();

        loop {
            let updates = self.get_updates(offset).await?;
            let page_len = updates.len();

            for update in updates {
                offset = Some(update.update_id + 1);
                let Some(chat) = update.message.and_then(|m| m.chat) else {
                    continue;
                };
                if !seen.insert(chat.id) {
                    continue;
                }
                let chat = chat.into_chat();
                if chat.is_group {
                    groups.push(chat);
                } else {
                    private.push(chat);
                }
            }

            if page_len < UPDATES_PAGE_LIMIT {
                break;
            }
        }

        if groups.is_empty() && private.is_empty() {
            warn!("No chats found in pending updates");
        }

        groups.extend(private);
        Ok(groups)
    }
}
