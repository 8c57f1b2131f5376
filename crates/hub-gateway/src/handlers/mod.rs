//! Event handlers
//!
//! A handler receives an event together with the client that sent it. It is
//! the only place a payload gets decoded.

mod error;
mod send_message;

pub use error::{HandlerError, HandlerResult, RouteError};
pub use send_message::SendMessageHandler;

use crate::connection::Client;
use crate::protocol::Event;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

/// Handles one event type
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handle an event sent by `client`
    async fn handle(&self, event: Event, client: &Arc<Client>) -> HandlerResult<()>;
}

#[async_trait]
impl<F, Fut> EventHandler for F
where
    F: Fn(Event, Arc<Client>) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult<()>> + Send + 'static,
{
    async fn handle(&self, event: Event, client: &Arc<Client>) -> HandlerResult<()> {
        (self)(event, Arc::clone(client)).await
    }
}
