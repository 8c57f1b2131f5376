//! Canned wire messages

use serde_json::json;

/// A `send_message` envelope
pub fn send_message(message: &str, from: &str) -> String {
    json!({
        "type": "send_message",
        "payload": { "message": message, "from": from }
    })
    .to_string()
}

/// An envelope whose type has no handler
pub fn unknown_event() -> String {
    json!({ "type": "nonexistent", "payload": {} }).to_string()
}

/// Bytes that are not a JSON envelope
pub const MALFORMED_FRAME: &str = "this is not json";
