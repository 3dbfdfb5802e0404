//! Broadcast bus for `SessionEvent`.
//!
//! Built on `tokio::sync::broadcast`. Publishing with no active subscribers
//! is a no-op, so stores can publish unconditionally.

use freelance_types::event::SessionEvent;
use tokio::sync::broadcast;

/// Default channel capacity; session events are rare.
pub const DEFAULT_CAPACITY: usize = 64;

/// Multi-consumer bus for session lifecycle events.
///
/// Cloning the bus clones the sender, so the API client and the auth store
/// share one channel.
pub struct SessionEventBus {
    sender: broadcast::Sender<SessionEvent>,
}

impl SessionEventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Create a new subscriber that will receive all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all current subscribers.
    pub fn publish(&self, event: SessionEvent) {
        let _ = self.sender.send(event);
    }

    /// Convenience for the forced-logout navigation side effect.
    pub fn login_required(&self, route: &str) {
        self.publish(SessionEvent::LoginRequired {
            route: route.to_string(),
        });
    }
}

impl Default for SessionEventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl Clone for SessionEventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl std::fmt::Debug for SessionEventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionEventBus")
            .field("receiver_count", &self.sender.receiver_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_and_subscribe_delivers_event() {
        let bus = SessionEventBus::default();
        let mut rx = bus.subscribe();

        bus.login_required("/login");

        let received = rx.recv().await.unwrap();
        assert_eq!(
            received,
            SessionEvent::LoginRequired {
                route: "/login".to_string()
            }
        );
    }

    #[test]
    fn test_publish_with_no_subscribers_does_not_panic() {
        let bus = SessionEventBus::new(4);
        bus.publish(SessionEvent::LoggedOut);
        bus.publish(SessionEvent::TokenRefreshed);
    }

    #[test]
    fn test_clone_shares_channel() {
        let bus = SessionEventBus::new(16);
        let bus2 = bus.clone();
        let mut rx = bus.subscribe();

        bus2.publish(SessionEvent::LoggedOut);

        assert_eq!(rx.try_recv().unwrap(), SessionEvent::LoggedOut);
    }

    #[test]
    fn test_debug_impl() {
        let bus = SessionEventBus::new(16);
        let _rx = bus.subscribe();
        let debug = format!("{bus:?}");
        assert!(debug.contains("SessionEventBus"));
        assert!(debug.contains("receiver_count"));
    }
}
