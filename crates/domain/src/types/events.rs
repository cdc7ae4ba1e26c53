//! Session events emitted by the authenticated transport

use serde::{Deserialize, Serialize};

use super::response::ErrorBody;
use crate::constants::{
    DEFAULT_SERVER_ERROR_MESSAGE, EVENT_FORBIDDEN, EVENT_LOGOUT, EVENT_SERVER_ERROR,
};

/// Payload of `api:error`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerErrorEvent {
    pub message: String,
    pub status: u16,
}

impl ServerErrorEvent {
    /// Build the event from a raw error body, using the body's `message`
    /// when present.
    pub fn from_body(status: u16, body: &str) -> Self {
        let message = ErrorBody::parse(body)
            .and_then(|parsed| parsed.message)
            .filter(|message| !message.is_empty())
            .unwrap_or_else(|| DEFAULT_SERVER_ERROR_MESSAGE.to_string());

        Self { message, status }
    }
}

/// Fire-and-forget signals for whoever owns the UI session state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", content = "detail")]
pub enum AuthEvent {
    /// The session is unrecoverable; drop user state and cached queries.
    #[serde(rename = "auth:logout")]
    Logout,
    /// A request was rejected with 403. Tokens are untouched.
    #[serde(rename = "auth:forbidden")]
    Forbidden,
    #[serde(rename = "api:error")]
    ServerError(ServerErrorEvent),
}

impl AuthEvent {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Logout => EVENT_LOGOUT,
            Self::Forbidden => EVENT_FORBIDDEN,
            Self::ServerError(_) => EVENT_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn server_error_message_comes_from_body() {
        let event = ServerErrorEvent::from_body(500, r#"{"message":"bucket unavailable"}"#);
        assert_eq!(event, ServerErrorEvent { message: "bucket unavailable".into(), status: 500 });
    }

    #[test]
    fn server_error_message_falls_back_to_generic_text() {
        assert_eq!(ServerErrorEvent::from_body(500, "").message, DEFAULT_SERVER_ERROR_MESSAGE);
        assert_eq!(
            ServerErrorEvent::from_body(500, r#"{"message":""}"#).message,
            DEFAULT_SERVER_ERROR_MESSAGE
        );
    }

    #[test]
    fn event_names_follow_the_dashboard_contract() {
        assert_eq!(AuthEvent::Logout.name(), "auth:logout");
        assert_eq!(AuthEvent::Forbidden.name(), "auth:forbidden");
        let event = AuthEvent::ServerError(ServerErrorEvent { message: "m".into(), status: 500 });
        assert_eq!(event.name(), "api:error");
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({ "name": "api:error", "detail": { "message": "m", "status": 500 } })
        );
    }
}
