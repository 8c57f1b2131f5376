//! Handler and routing error types

use thiserror::Error;

/// Error returned by an event handler
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Payload did not match the shape the event type implies
    #[error("Invalid payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    /// Outbound payload could not be encoded
    #[error("Failed to encode event: {0}")]
    Encode(#[source] serde_json::Error),

    /// The target client no longer accepts events
    #[error("Client connection is closed")]
    ClientClosed,

    /// The manager was dropped while the handler ran
    #[error("Connection manager is no longer available")]
    ManagerUnavailable,

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<crate::connection::ClientError> for HandlerError {
    fn from(_: crate::connection::ClientError) -> Self {
        Self::ClientClosed
    }
}

/// Handler result type
pub type HandlerResult<T> = Result<T, HandlerError>;

/// Error returned by `Manager::route_event`
#[derive(Debug, Error)]
pub enum RouteError {
    /// No handler is registered for the event type
    #[error("No matching handler for event type: {0}")]
    UnknownEvent(String),

    /// The handler ran and failed
    #[error(transparent)]
    Handler(#[from] HandlerError),
}
