use std::sync::Arc;

use crate::{
    broadcast::{Subscriber, SubscriberId},
    protocol::{ControlError, ControlMessage, ServerEvent},
    race_state::{RaceSessionState, RaceStateManager},
};

/// One viewer's session with the hub.
///
/// Created when the socket is upgraded: the viewer is subscribed right away
/// and its first outgoing event is the current race state. A viewer whose
/// queue overflowed is sent the current race state again before the rest of
/// its queue. Dropping the connection unsubscribes it.
pub struct ClientConnection {
    race_state: Arc<RaceStateManager>,
    subscriber: Subscriber,
    /// Event received alongside a lag, held back behind the resync.
    pending: Option<ServerEvent>,
    privileged: bool,
}

impl ClientConnection {
    /// Subscribe a new viewer. `privileged` decides whether its control
    /// messages are applied.
    #[must_use]
    pub fn connect(race_state: Arc<RaceStateManager>, privileged: bool) -> Self {
        let subscriber = race_state.subscribe();
        tracing::info!(
            connection = subscriber.id(),
            privileged,
            viewers = race_state.broadcaster().subscriber_count(),
            "viewer connected"
        );
        Self {
            race_state,
            subscriber,
            pending: None,
            privileged,
        }
    }

    #[must_use]
    pub const fn id(&self) -> SubscriberId {
        self.subscriber.id()
    }

    #[must_use]
    pub const fn is_privileged(&self) -> bool {
        self.privileged
    }

    /// Next event to send to this viewer. `None` once the hub shuts down.
    pub async fn next_event(&mut self) -> Option<ServerEvent> {
        if let Some(event) = self.pending.take() {
            return Some(event);
        }
        let event = self.subscriber.recv().await?;
        Some(self.resync_if_lagged(event))
    }

    /// Next already-queued event, if any.
    pub fn try_next_event(&mut self) -> Option<ServerEvent> {
        if let Some(event) = self.pending.take() {
            return Some(event);
        }
        let event = self.subscriber.try_recv()?;
        Some(self.resync_if_lagged(event))
    }

    /// A dropped message may have been a `sync_race_state`, so after a lag
    /// the current state goes out first. A queued sync is older than that
    /// snapshot and is discarded.
    fn resync_if_lagged(&mut self, event: ServerEvent) -> ServerEvent {
        if !self.subscriber.take_lagged() {
            return event;
        }
        tracing::debug!(connection = self.id(), "resyncing lagged viewer");
        if !matches!(event, ServerEvent::SyncRaceState(_)) {
            self.pending = Some(event);
        }
        ServerEvent::SyncRaceState(self.race_state.get())
    }

    /// Handle one text frame from the viewer.
    ///
    /// Accepted changes reach this viewer through the broadcast like
    /// everyone else. Returns a `control_error` addressed to this viewer
    /// only when the frame was rejected; unknown events get no reply.
    pub fn handle_text(&self, text: &str) -> Option<ServerEvent> {
        match self.handle_control_text(text) {
            Ok(state) => {
                tracing::debug!(connection = self.id(), ?state, "control message applied");
                None
            }
            Err(err) if err.is_ignorable() => {
                tracing::debug!(connection = self.id(), "ignoring message: {err}");
                None
            }
            Err(err) => {
                tracing::warn!(connection = self.id(), "rejected control message: {err}");
                Some(ServerEvent::ControlError {
                    message: err.to_string(),
                })
            }
        }
    }

    /// Parse, authorize and apply a control message.
    ///
    /// # Errors
    ///
    /// Returns the parse or validation error, or `ControlError::NotPermitted`
    /// if this connection may not change race state.
    pub fn handle_control_text(&self, text: &str) -> Result<RaceSessionState, ControlError> {
        let message = ControlMessage::parse(text)?;
        if !self.privileged {
            return Err(ControlError::NotPermitted);
        }
        self.race_state.apply(message)
    }
}

impl Drop for ClientConnection {
    fn drop(&mut self) {
        tracing::info!(connection = self.id(), "viewer disconnected");
    }
}
