//! Telegram Bot API integration.

mod chats;
mod client;
pub mod format;
pub(crate) mod models;

pub use {
    chats::{
        ChatDirectory, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_STEP, DEFAULT_USER_ID_RETRY_STEP,
        RetryPolicy, START_WINDOW, merge_chats,
    },
    client::{DEFAULT_API_BASE_URL, TelegramClient, UPDATES_PAGE_LIMIT, is_valid_token},
    models::{BotInfo, ChatAccess, TelegramChat},
};
