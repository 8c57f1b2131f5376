//! Event envelope
//!
//! Every message on the wire, in either direction, is a `{type, payload}`
//! envelope. The payload stays raw JSON until a handler asks for it.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

/// Wire envelope shared by inbound and outbound traffic
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Event type discriminator used for handler lookup
    #[serde(rename = "type")]
    pub kind: String,

    /// Undecoded payload
    #[serde(default = "null_payload")]
    pub payload: Box<RawValue>,
}

fn null_payload() -> Box<RawValue> {
    RawValue::NULL.to_owned()
}

impl Event {
    /// Create an event from a type name and any serializable payload
    pub fn new<T: Serialize + ?Sized>(
        kind: impl Into<String>,
        payload: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            kind: kind.into(),
            payload: serde_json::value::to_raw_value(payload)?,
        })
    }

    /// Get the event type
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Get the raw payload text
    pub fn raw_payload(&self) -> &str {
        self.payload.get()
    }

    /// Decode the payload into a concrete type
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(self.payload.get())
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize the envelope from a JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Deserialize the envelope from raw bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Event(type={}, payload_len={})", self.kind, self.payload.get().len())
    }
}
