use serde::{Deserialize, Serialize};

/// A chat the bot can post to, as presented in chat pickers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelegramChat {
    /// Numeric chat id, as text.
    pub chat_id: String,
    /// Group title or the private user's full name.
    pub title: String,
    /// Group or supergroup.
    pub is_group: bool,
    /// Bot is a member of the chat.
    #[serde(default)]
    pub is_bot_member: bool,
    /// Bot can post in the chat.
    #[serde(default)]
    pub is_bot_active: bool,
    /// Pilot is a member of the chat.
    #[serde(default)]
    pub is_user_member: bool,
}

/// Identity of the configured bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotInfo {
    /// Bot user id.
    pub id: String,
    /// `@username` without the `@`.
    pub username: String,
    /// Display name.
    pub first_name: String,
}

/// Membership of the bot and the pilot in a chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatAccess {
    /// Bot is in the chat.
    pub bot_member: bool,
    /// Bot may post.
    pub bot_active: bool,
    /// Pilot is in the chat.
    pub user_member: bool,
}

impl ChatAccess {
    pub(crate) const FULL: ChatAccess = ChatAccess {
        bot_member: true,
        bot_active: true,
        user_member: true,
    };
}

/// Bot API reply envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiResponse<T> {
    pub(crate) ok: bool,
    pub(crate) result: Option<T>,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default)]
    pub(crate) error_code: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiUser {
    pub(crate) id: i64,
    #[serde(default)]
    pub(crate) username: Option<String>,
    pub(crate) first_name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiChat {
    pub(crate) id: i64,
    #[serde(rename = "type")]
    pub(crate) kind: String,
    #[serde(default)]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) first_name: Option<String>,
    #[serde(default)]
    pub(crate) last_name: Option<String>,
}

impl ApiChat {
    pub(crate) fn is_group(&self) -> bool {
        matches!(self.kind.as_str(), "group" | "supergroup")
    }

    pub(crate) fn into_chat(self) -> TelegramChat {
        let is_group = self.is_group();
        let title = if is_group {
            self.title.unwrap_or_else(|| "Unknown group".to_string())
        } else {
            let full = format!(
                "{} {}",
                self.first_name.unwrap_or_default(),
                self.last_name.unwrap_or_default()
            );
            let full = full.trim();
            if full.is_empty() {
                "Unknown user".to_string()
            } else {
                full.to_string()
            }
        };

        TelegramChat {
            chat_id: self.id.to_string(),
            title,
            is_group,
            is_bot_member: false,
            is_bot_active: false,
            is_user_member: false,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiMessage {
    #[serde(default)]
    pub(crate) chat: Option<ApiChat>,
    #[serde(default)]
    pub(crate) from: Option<ApiUser>,
    #[serde(default)]
    pub(crate) date: i64,
    #[serde(default)]
    pub(crate) text: Option<String>,
}

impl ApiMessage {
    /// Sender of a private `/start` sent at or after `not_before` (unix secs).
    pub(crate) fn start_sender(&self, not_before: i64) -> Option<i64> {
        let private = self.chat.as_ref().is_some_and(|c| c.kind == "private");
        let is_start = self.text.as_deref().map(str::trim) == Some(START_COMMAND);
        if private && is_start && self.date >= not_before {
            self.from.as_ref().map(|user| user.id)
        } else {
            None
        }
    }
}

/// Command the pilot sends to the bot to reveal their user id.
pub(crate) const START_COMMAND: &str = "/start";

/// Outcome of one scan of pending updates for a `/start` message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StartScan {
    pub(crate) user_id: Option<String>,
    pub(crate) next_offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiUpdate {
    pub(crate) update_id: i64,
    #[serde(default)]
    pub(crate) message: Option<ApiMessage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiChatMember {
    pub(crate) status: String,
}
