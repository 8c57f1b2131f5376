//! Connection management
//!
//! Client actors, the registry that owns them, and the transport they run on.

mod client;
mod manager;
pub(crate) mod transport;

pub use client::{Client, ClientError, ClientId, ClientState};
pub use manager::{Manager, ManagerBuilder};
pub use transport::{CloseFrame, Connection, Frame, FrameSink, FrameStream, TransportError};
