//! Session event bus.
//!
//! Publishes session transitions so UI and API clients can react without
//! polling the gateway. Uses tokio broadcast channels for fan-out to
//! multiple receivers.

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

// =============================================================================
// Event Types
// =============================================================================

/// Session transitions published by a gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// `SignedOut → SignedIn`, or an interactive sign-in over a session
    SignedIn {
        /// Object id of the signed-in user
        object_id: String,
        /// Whether sign-in UI was shown
        interactive: bool,
        /// When the session was established
        timestamp: DateTime<Utc>,
    },

    /// `SignedIn → SignedIn` through silent re-acquisition
    Refreshed {
        /// Object id of the signed-in user
        object_id: String,
        /// When the session was refreshed
        timestamp: DateTime<Utc>,
    },

    /// Account cache drained and session cleared
    SignedOut {
        /// Accounts removed from the provider cache
        removed: usize,
        /// When the session was cleared
        timestamp: DateTime<Utc>,
    },

    /// Interactive sign-in failed; session unchanged
    SignInFailed {
        /// Failure description
        message: String,
        /// When the failure was observed
        timestamp: DateTime<Utc>,
    },
}

// =============================================================================
// Event Bus
// =============================================================================

/// Broadcast bus for session events.
pub struct SessionEventBus {
    sender: broadcast::Sender<SessionEvent>,
}

impl SessionEventBus {
    /// Create a new event bus with specified capacity.
    ///
    /// Capacity determines how many events can be buffered before
    /// slow receivers start missing events (lagging).
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Send an event to all subscribers.
    ///
    /// Returns the number of receivers that received the event.
    pub fn send(&self, event: SessionEvent) -> usize {
        // Err only means nobody is subscribed
        self.sender.send(event).unwrap_or(0)
    }

    /// Subscribe to events sent after this call.
    pub fn subscribe(&self) -> SessionEventReceiver {
        SessionEventReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    /// Get the number of active receivers.
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for SessionEventBus {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_EVENT_CAPACITY)
    }
}

/// Receiver for session events.
pub struct SessionEventReceiver {
    receiver: broadcast::Receiver<SessionEvent>,
}

impl SessionEventReceiver {
    /// Receive the next event.
    ///
    /// Returns `None` if the bus has been dropped.
    /// Returns error description if the receiver lagged (missed events).
    pub async fn recv(&mut self) -> Option<Result<SessionEvent, String>> {
        match self.receiver.recv().await {
            Ok(event) => Some(Ok(event)),
            Err(broadcast::error::RecvError::Closed) => None,
            Err(broadcast::error::RecvError::Lagged(count)) => {
                Some(Err(format!("Receiver lagged, missed {} events", count)))
            }
        }
    }

    /// Receive without waiting.
    ///
    /// Returns `None` when no event is queued or the bus is gone.
    /// Returns error description if the receiver lagged (missed events).
    pub fn try_recv(&mut self) -> Option<Result<SessionEvent, String>> {
        match self.receiver.try_recv() {
            Ok(event) => Some(Ok(event)),
            Err(broadcast::error::TryRecvError::Empty) => None,
            Err(broadcast::error::TryRecvError::Closed) => None,
            Err(broadcast::error::TryRecvError::Lagged(count)) => {
                Some(Err(format!("Receiver lagged, missed {} events", count)))
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn signed_out(removed: usize) -> SessionEvent {
        SessionEvent::SignedOut {
            removed,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_send_without_subscribers() {
        let bus = SessionEventBus::new(8);

        assert_eq!(bus.send(signed_out(0)), 0);
        assert_eq!(bus.receiver_count(), 0);
    }

    #[tokio::test]
    async fn test_fan_out_to_all_subscribers() {
        let bus = SessionEventBus::new(8);
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        assert_eq!(bus.send(signed_out(2)), 2);

        assert!(matches!(
            first.recv().await,
            Some(Ok(SessionEvent::SignedOut { removed: 2, .. }))
        ));
        assert!(matches!(
            second.recv().await,
            Some(Ok(SessionEvent::SignedOut { removed: 2, .. }))
        ));
    }

    #[tokio::test]
    async fn test_lagged_receiver_reports_missed_events() {
        let bus = SessionEventBus::new(1);
        let mut receiver = bus.subscribe();

        bus.send(signed_out(1));
        bus.send(signed_out(2));

        assert!(matches!(receiver.recv().await, Some(Err(_))));
        assert!(matches!(
            receiver.recv().await,
            Some(Ok(SessionEvent::SignedOut { removed: 2, .. }))
        ));
    }

    #[test]
    fn test_try_recv_on_empty_bus() {
        let bus = SessionEventBus::new(4);
        let mut receiver = bus.subscribe();

        assert!(receiver.try_recv().is_none());

        bus.send(signed_out(3));
        assert!(matches!(
            receiver.try_recv(),
            Some(Ok(SessionEvent::SignedOut { removed: 3, .. }))
        ));
    }

    #[test]
    fn test_try_recv_reports_lag() {
        let bus = SessionEventBus::new(1);
        let mut receiver = bus.subscribe();

        bus.send(signed_out(1));
        bus.send(signed_out(2));

        assert!(matches!(receiver.try_recv(), Some(Err(_))));
        assert!(matches!(
            receiver.try_recv(),
            Some(Ok(SessionEvent::SignedOut { removed: 2, .. }))
        ));
        assert!(receiver.try_recv().is_none());
    }
}
