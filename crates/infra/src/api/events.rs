//! Session notifications
//!
//! The pipeline reports three conditions to whoever owns the UI session:
//! logout (unrecoverable session), forbidden (403) and server error (500).
//! Sinks are injected when the session is built; emission never blocks and
//! never fails.

use fms_domain::{AuthEvent, ServerErrorEvent};
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Observer for the pipeline's session signals.
pub trait NotificationSink: Send + Sync {
    /// The session is unrecoverable; tokens have already been cleared.
    fn on_logout(&self);

    /// A request was rejected with 403.
    fn on_forbidden(&self);

    /// A request failed with 500.
    fn on_server_error(&self, event: &ServerErrorEvent);
}

/// Discards every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl NotificationSink for NoopSink {
    fn on_logout(&self) {}

    fn on_forbidden(&self) {}

    fn on_server_error(&self, _event: &ServerErrorEvent) {}
}

/// Logs every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn on_logout(&self) {
        info!(event = AuthEvent::Logout.name(), "session ended");
    }

    fn on_forbidden(&self) {
        warn!(event = AuthEvent::Forbidden.name(), "request forbidden");
    }

    fn on_server_error(&self, event: &ServerErrorEvent) {
        warn!(status = event.status, message = %event.message, "server error");
    }
}

/// Broadcast bus: every subscriber receives every [`AuthEvent`].
///
/// Publishing with no subscribers drops the event. Slow subscribers that fall
/// more than `capacity` events behind observe `RecvError::Lagged`.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<AuthEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: AuthEvent) {
        // Err only means nobody is listening.
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

impl NotificationSink for EventBus {
    fn on_logout(&self) {
        self.publish(AuthEvent::Logout);
    }

    fn on_forbidden(&self) {
        self.publish(AuthEvent::Forbidden);
    }

    fn on_server_error(&self, event: &ServerErrorEvent) {
        self.publish(AuthEvent::ServerError(event.clone()));
    }
}
