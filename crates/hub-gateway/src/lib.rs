//! # hub-gateway
//!
//! WebSocket connection hub: a live registry of client connections, typed
//! event routing for inbound messages and per-connection outbound queues.

pub mod connection;
pub mod handlers;
pub mod protocol;
pub mod server;

pub use connection::{Client, ClientId, ClientState, Connection, Manager, ManagerBuilder};
pub use handlers::{EventHandler, HandlerError, HandlerResult, RouteError};
pub use protocol::{Event, EventType, NewMessageEvent, SendMessageEvent};
pub use server::{create_app, run, GatewayState};
