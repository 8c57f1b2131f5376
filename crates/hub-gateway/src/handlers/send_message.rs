//! `send_message` handler

use super::{EventHandler, HandlerError, HandlerResult};
use crate::connection::Client;
use crate::protocol::{Event, EventType, NewMessageEvent, SendMessageEvent};
use async_trait::async_trait;
use std::sync::Arc;

/// Relays a chat message to every connected client as `new_message`
pub struct SendMessageHandler;

#[async_trait]
impl EventHandler for SendMessageHandler {
    async fn handle(&self, event: Event, client: &Arc<Client>) -> HandlerResult<()> {
        let message: SendMessageEvent = event.decode()?;

        tracing::debug!(
            client_id = %client.id(),
            from = %message.from,
            "Chat message received"
        );

        let outgoing = Event::new(EventType::NewMessage, &NewMessageEvent::now(message))
            .map_err(HandlerError::Encode)?;

        let manager = client.manager().ok_or(HandlerError::ManagerUnavailable)?;
        manager.broadcast(&outgoing);

        Ok(())
    }
}
