//! Event types for the session event bus.
//!
//! `SessionEvent` is broadcast by the API client and the auth session store.
//! All variants are Clone + Send + Sync for use with tokio broadcast channels.

use serde::{Deserialize, Serialize};

use crate::auth::SocialProvider;
use crate::user::UserId;

/// Session lifecycle notifications.
///
/// Front ends subscribe to react to `LoginRequired` by navigating to the
/// login route; everything else is informational.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A login, registration or social login succeeded.
    LoggedIn {
        user_id: UserId,
        /// Set when the session came from a social provider.
        provider: Option<SocialProvider>,
    },

    /// The access token was exchanged for a new one.
    TokenRefreshed,

    /// The session was cleared (explicit logout or forced).
    LoggedOut,

    /// The user must authenticate again; carries the route to navigate to.
    LoginRequired { route: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_event_tagged_serialization() {
        let event = SessionEvent::LoginRequired {
            route: "/login".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "login_required");
        assert_eq!(json["route"], "/login");

        let back: SessionEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }
}
