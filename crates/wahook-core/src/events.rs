//! Gateway webhook events
//!
//! The WhatsApp gateway posts one JSON document per event:
//!
//! ```json
//! {
//!   "id": "evt_01",
//!   "event": "session.status",
//!   "session": "default",
//!   "payload": { "status": "SCAN_QR_CODE" },
//!   "timestamp": 1767600000000
//! }
//! ```
//!
//! Only `session.status` events carrying `SCAN_QR_CODE` count as a QR event.
//! Every other event (including other statuses and message events) resets
//! the session's scan counter.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event name for session status changes
pub const SESSION_STATUS_EVENT: &str = "session.status";

/// Gateway session status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    /// Session is booting
    Starting,
    /// Session process is running
    Running,
    /// Session was stopped
    Stopped,
    /// Session failed
    Failed,
    /// Waiting for the device to scan a pairing QR code
    ScanQrCode,
    /// Authenticated and working
    Working,
    /// Status this service does not know about
    #[serde(other)]
    Unknown,
}

/// How the tracker should treat an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// The gateway generated a new pairing QR code
    QrPresented,
    /// Anything else
    Other,
}

/// A webhook delivery from the gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    /// Gateway-assigned event id
    #[serde(default)]
    pub id: Option<String>,
    /// Event name (e.g. `session.status`, `message`)
    pub event: String,
    /// Session name the event belongs to
    #[serde(default)]
    pub session: String,
    /// Event-specific body
    #[serde(default)]
    pub payload: Value,
    /// Milliseconds since epoch, as sent by the gateway
    #[serde(default)]
    pub timestamp: Option<i64>,
}

impl WebhookEvent {
    /// Build a `session.status` event (used by tests and tooling)
    #[must_use]
    pub fn session_status(session: impl Into<String>, status: SessionStatus) -> Self {
        Self {
            id: None,
            event: SESSION_STATUS_EVENT.to_string(),
            session: session.into(),
            payload: serde_json::json!({ "status": status }),
            timestamp: None,
        }
    }

    /// Session status carried by a `session.status` event
    #[must_use]
    pub fn status(&self) -> Option<SessionStatus> {
        if self.event != SESSION_STATUS_EVENT {
            return None;
        }
        self.payload
            .get("status")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
    }

    /// Classify the event for the QR-scan tracker
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self.status() {
            Some(SessionStatus::ScanQrCode) => EventKind::QrPresented,
            _ => EventKind::Other,
        }
    }
}
