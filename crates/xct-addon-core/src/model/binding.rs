use crate::{CoreError, CoreResult, model::VolumePolicy};

use std::panic::Location;

use error_location::ErrorLocation;
use serde::{Deserialize, Serialize};

/// Separator between chat id and text in a stored Telegram message task.
const MESSAGE_TASK_SEPARATOR: char = '|';

/// Reaction performed when a bound event fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Play a sound file.
    Sound {
        /// File name inside the sounds directory.
        file: String,
        /// Loudness rule.
        volume: VolumePolicy,
        /// Number of sequential plays, at least 1.
        play_count: u32,
    },
    /// Launch another application.
    LaunchApp {
        /// Application identifier handed to the launcher.
        package: String,
    },
    /// Send the current position to a Telegram chat.
    SendTelegramPosition {
        /// Target chat id.
        chat_id: String,
        /// Display name of the chat.
        #[serde(default)]
        chat_name: Option<String>,
    },
    /// Send a fixed message to a Telegram chat.
    SendTelegramMessage {
        /// Target chat id.
        chat_id: String,
        /// Display name of the chat.
        #[serde(default)]
        chat_name: Option<String>,
        /// Message body.
        message: String,
    },
    /// Emit a push-to-talk broadcast.
    Ptt,
}

/// Discriminant of [`Action`], used in logs and dispatch results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// [`Action::Sound`]
    Sound,
    /// [`Action::LaunchApp`]
    LaunchApp,
    /// [`Action::SendTelegramPosition`]
    SendTelegramPosition,
    /// [`Action::SendTelegramMessage`]
    SendTelegramMessage,
    /// [`Action::Ptt`]
    Ptt,
}

impl ActionKind {
    /// Name stored in the `task_type` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Sound => "Sound",
            ActionKind::LaunchApp => "LaunchApp",
            ActionKind::SendTelegramPosition => "SendTelegramPosition",
            ActionKind::SendTelegramMessage => "SendTelegramMessage",
            ActionKind::Ptt => "ZELLO_PTT",
        }
    }
}

impl Action {
    /// Discriminant of this action.
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Sound { .. } => ActionKind::Sound,
            Action::LaunchApp { .. } => ActionKind::LaunchApp,
            Action::SendTelegramPosition { .. } => ActionKind::SendTelegramPosition,
            Action::SendTelegramMessage { .. } => ActionKind::SendTelegramMessage,
            Action::Ptt => ActionKind::Ptt,
        }
    }

    /// Reject parameters that can never execute.
    #[track_caller]
    pub fn validate(&self) -> CoreResult<()> {
        let reason = match self {
            Action::Sound { file, .. } if file.trim().is_empty() => Some("sound file is empty"),
            Action::Sound { play_count: 0, .. } => Some("play count must be at least 1"),
            Action::Sound {
                volume: VolumePolicy::Percentage(p),
                ..
            } if *p > 100 => Some("volume percentage must be within 0..=100"),
            Action::LaunchApp { package } if package.trim().is_empty() => {
                Some("package identifier is empty")
            }
            Action::SendTelegramPosition { chat_id, .. } if chat_id.trim().is_empty() => {
                Some("telegram chat id is empty")
            }
            Action::SendTelegramMessage { chat_id, .. } if chat_id.trim().is_empty() => {
                Some("telegram chat id is empty")
            }
            Action::SendTelegramMessage { message, .. } if message.trim().is_empty() => {
                Some("telegram message is empty")
            }
            _ => None,
        };

        match reason {
            Some(reason) => Err(CoreError::InvalidBinding {
                reason: reason.to_string(),
                location: ErrorLocation::from(Location::caller()),
            }),
            None => Ok(()),
        }
    }
}

/// Association of one flight-computer event with one reaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    /// Store-assigned id.
    pub id: i64,
    /// Event identifier, matched case-sensitively.
    pub event: String,
    /// What to do when the event fires.
    pub action: Action,
    /// Display order, unique within the list.
    pub position: i64,
}

/// A binding that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBinding {
    /// Event identifier.
    pub event: String,
    /// Reaction to perform.
    pub action: Action,
}

/// Column values of the `event_configs` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ActionColumns {
    pub(crate) task_type: String,
    pub(crate) task_data: String,
    pub(crate) volume_type: String,
    pub(crate) volume_percentage: i64,
    pub(crate) play_count: i64,
    pub(crate) telegram_chat_id: Option<String>,
    pub(crate) telegram_group_name: Option<String>,
}

impl ActionColumns {
    pub(crate) fn from_action(action: &Action) -> Self {
        let mut columns = ActionColumns {
            task_type: action.kind().as_str().to_string(),
            task_data: String::new(),
            volume_type: VolumePolicy::System.column_name().to_string(),
            volume_percentage: 100,
            play_count: 1,
            telegram_chat_id: None,
            telegram_group_name: None,
        };

        match action {
            Action::Sound {
                file,
                volume,
                play_count,
            } => {
                columns.task_data = file.clone();
                columns.volume_type = volume.column_name().to_string();
                columns.volume_percentage = volume.column_percentage();
                columns.play_count = i64::from(*play_count);
            }
            Action::LaunchApp { package } => columns.task_data = package.clone(),
            Action::SendTelegramPosition { chat_id, chat_name } => {
                columns.task_data = chat_id.clone();
                columns.telegram_chat_id = Some(chat_id.clone());
                columns.telegram_group_name = chat_name.clone();
            }
            Action::SendTelegramMessage {
                chat_id,
                chat_name,
                message,
            } => {
                columns.task_data = format!("{chat_id}{MESSAGE_TASK_SEPARATOR}{message}");
                columns.telegram_chat_id = Some(chat_id.clone());
                columns.telegram_group_name = chat_name.clone();
            }
            Action::Ptt => {}
        }

        columns
    }

    #[track_caller]
    pub(crate) fn into_action(self) -> CoreResult<Action> {
        let action = match self.task_type.as_str() {
            "Sound" => Action::Sound {
                file: self.task_data,
                volume: VolumePolicy::from_columns(&self.volume_type, self.volume_percentage),
                play_count: u32::try_from(self.play_count.max(1)).unwrap_or(u32::MAX),
            },
            "LaunchApp" => Action::LaunchApp {
                package: self.task_data,
            },
            "SendTelegramPosition" => Action::SendTelegramPosition {
                chat_id: self.telegram_chat_id.unwrap_or(self.task_data),
                chat_name: self.telegram_group_name,
            },
            "SendTelegramMessage" => {
                let (chat_id, message) = self
                    .task_data
                    .split_once(MESSAGE_TASK_SEPARATOR)
                    .ok_or_else(|| CoreError::InvalidBinding {
                        reason: format!("malformed telegram message task: {}", self.task_data),
                        location: ErrorLocation::from(Location::caller()),
                    })?;
                Action::SendTelegramMessage {
                    chat_id: chat_id.to_string(),
                    chat_name: self.telegram_group_name,
                    message: message.to_string(),
                }
            }
            "ZELLO_PTT" => Action::Ptt,
            other => {
                return Err(CoreError::InvalidBinding {
                    reason: format!("unknown task type: {other}"),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        };

        Ok(action)
    }
}
