//! Gateway protocol definitions
//!
//! Defines the event envelope, built-in event types and payloads, and the
//! WebSocket close codes the gateway understands.

mod close_codes;
mod event;
mod event_types;
mod payloads;

pub use close_codes::CloseCode;
pub use event::Event;
pub use event_types::{EventType, UnknownEventType};
pub use payloads::{NewMessageEvent, SendMessageEvent};
