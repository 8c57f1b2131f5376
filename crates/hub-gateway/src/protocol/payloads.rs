//! Event payload structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Payload of `send_message`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendMessageEvent {
    pub message: String,
    pub from: String,
}

/// Payload of `new_message`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessageEvent {
    #[serde(flatten)]
    pub inner: SendMessageEvent,
    /// Time the server accepted the message
    pub sent: DateTime<Utc>,
}

impl NewMessageEvent {
    /// Stamp an incoming message with the current time
    #[must_use]
    pub fn now(inner: SendMessageEvent) -> Self {
        Self {
            inner,
            sent: Utc::now(),
        }
    }
}
