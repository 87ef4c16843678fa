use crate::{
    CoreResult, Preferences,
    actions::{AppLauncher, LocationProvider, Position, PttEmitter},
    audio::{PlaybackRequest, PlaybackSlot, Player},
    dispatcher::Reactor,
    model::{Action, Binding, FlightEvent},
    telegram::{TelegramClient, format},
};

use std::sync::Arc;

use tracing::{debug, warn};

/// [`Reactor`] that performs actions on this machine.
pub struct ActionRunner {
    player: Arc<Player>,
    launcher: Arc<dyn AppLauncher>,
    ptt: Arc<dyn PttEmitter>,
    location: Arc<dyn LocationProvider>,
    preferences: Arc<Preferences>,
    telegram: Option<TelegramClient>,
}

impl ActionRunner {
    /// Runner without Telegram; Telegram actions are skipped until
    /// [`ActionRunner::with_telegram`] is used.
    pub fn new(
        player: Arc<Player>,
        launcher: Arc<dyn AppLauncher>,
        ptt: Arc<dyn PttEmitter>,
        location: Arc<dyn LocationProvider>,
        preferences: Arc<Preferences>,
    ) -> Self {
        Self {
            player,
            launcher,
            ptt,
            location,
            preferences,
            telegram: None,
        }
    }

    /// Enable Telegram actions through `client`.
    pub fn with_telegram(mut self, client: TelegramClient) -> Self {
        self.telegram = Some(client);
        self
    }

    /// Player used for sound actions.
    pub fn player(&self) -> &Arc<Player> {
        &self.player
    }

    /// Telegram client, if a bot token is configured.
    pub fn telegram(&self) -> Option<&TelegramClient> {
        self.telegram.as_ref()
    }

    /// Shared preferences.
    pub fn preferences(&self) -> &Arc<Preferences> {
        &self.preferences
    }

    fn telegram_or_skip(&self, binding: &Binding) -> Option<&TelegramClient> {
        if self.telegram.is_none() {
            warn!(
                binding_id = binding.id,
                "Telegram action skipped: no bot token configured"
            );
        }
        self.telegram.as_ref()
    }
}

impl Reactor for ActionRunner {
    async fn react(
        &self,
        binding: &Binding,
        event: Option<&FlightEvent>,
        slot: PlaybackSlot,
    ) -> CoreResult<()> {
        match &binding.action {
            Action::Sound {
                file,
                volume,
                play_count,
            } => {
                let request = PlaybackRequest {
                    file: file.clone(),
                    volume: *volume,
                    play_count: *play_count,
                };
                self.player.play(slot, request)?;
            }
            Action::LaunchApp { package } => self.launcher.launch(package)?,
            Action::Ptt => self.ptt.emit()?,
            Action::SendTelegramMessage {
                chat_id, message, ..
            } => {
                if let Some(client) = self.telegram_or_skip(binding) {
                    let pilot = self.preferences.pilot_name();
                    let text = format::message_text(pilot.as_deref(), message);
                    client.send_message(chat_id, &text).await?;
                }
            }
            Action::SendTelegramPosition { chat_id, .. } => {
                if let Some(client) = self.telegram_or_skip(binding) {
                    let position = self.location.current()?;
                    let pilot = self.preferences.pilot_name();
                    let event_name = event.map(|e| e.name.as_str());
                    client
                        .send_position(
                            chat_id,
                            position.latitude,
                            position.longitude,
                            pilot.as_deref(),
                            event_name,
                        )
                        .await?;
                }
            }
        }
        Ok(())
    }

    fn observe(&self, event: &FlightEvent) {
        if let Some((latitude, longitude)) = event.position() {
            debug!(latitude, longitude, "Position updated from event");
            self.location.record(Position {
                latitude,
                longitude,
            });
        }
    }
}
