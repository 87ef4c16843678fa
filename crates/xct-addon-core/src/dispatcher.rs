//! Event-to-action dispatch.

use crate::{
    CoreResult,
    audio::PlaybackSlot,
    model::{ActionKind, Binding, FlightEvent},
    store::BindingStore,
};

use std::{future::Future, sync::Arc};

use serde::Serialize;
use tracing::{debug, error, info, instrument};

/// Performs the action of a matched binding.
pub trait Reactor: Send + Sync + 'static {
    /// Run `binding`'s action. `event` is absent for manual triggers.
    fn react(
        &self,
        binding: &Binding,
        event: Option<&FlightEvent>,
        slot: PlaybackSlot,
    ) -> impl Future<Output = CoreResult<()>> + Send;

    /// Called for every inbound event before the binding lookup.
    fn observe(&self, _event: &FlightEvent) {}
}

/// Result of one dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// No binding for the event.
    Unbound,
    /// The action ran.
    Executed {
        /// Binding that matched.
        binding_id: i64,
        /// Kind of action performed.
        kind: ActionKind,
    },
    /// The action failed; the failure was logged.
    Failed {
        /// Binding that matched.
        binding_id: i64,
        /// Kind of action attempted.
        kind: ActionKind,
        /// Error text.
        reason: String,
    },
}

/// Looks up the binding for each event and hands it to a [`Reactor`].
pub struct Dispatcher<R> {
    store: BindingStore,
    reactor: Arc<R>,
}

impl<R> Clone for Dispatcher<R> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            reactor: Arc::clone(&self.reactor),
        }
    }
}

impl<R: Reactor> Dispatcher<R> {
    /// Dispatcher reading bindings from `store`.
    pub fn new(store: BindingStore, reactor: Arc<R>) -> Self {
        Self { store, reactor }
    }

    /// The reactor actions are routed to.
    pub fn reactor(&self) -> &Arc<R> {
        &self.reactor
    }

    /// Binding store used for lookups.
    pub fn store(&self) -> &BindingStore {
        &self.store
    }

    /// React to an inbound event with the first binding whose event matches.
    #[instrument(skip(self, event), fields(event = %event.name))]
    pub async fn dispatch(&self, event: &FlightEvent) -> CoreResult<DispatchOutcome> {
        self.reactor.observe(event);

        let bindings = self.store.list().await?;
        let Some(binding) = bindings.into_iter().find(|b| b.event == event.name) else {
            debug!("No binding for event");
            return Ok(DispatchOutcome::Unbound);
        };

        Ok(self
            .execute(&binding, Some(event), PlaybackSlot::Detached)
            .await)
    }

    /// Run one binding's action on demand.
    #[instrument(skip(self))]
    pub async fn run_binding(&self, id: i64, slot: PlaybackSlot) -> CoreResult<DispatchOutcome> {
        let binding = self.store.get(id).await?;
        Ok(self.execute(&binding, None, slot).await)
    }

    async fn execute(
        &self,
        binding: &Binding,
        event: Option<&FlightEvent>,
        slot: PlaybackSlot,
    ) -> DispatchOutcome {
        let kind = binding.action.kind();
        match self.reactor.react(binding, event, slot).await {
            Ok(()) => {
                info!(binding_id = binding.id, kind = kind.as_str(), "Action executed");
                DispatchOutcome::Executed {
                    binding_id: binding.id,
                    kind,
                }
            }
            Err(e) => {
                error!(binding_id = binding.id, kind = kind.as_str(), error = %e, "Action failed");
                DispatchOutcome::Failed {
                    binding_id: binding.id,
                    kind,
                    reason: e.to_string(),
                }
            }
        }
    }
}
