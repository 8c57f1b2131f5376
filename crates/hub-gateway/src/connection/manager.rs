//! Connection manager
//!
//! Owns the registry of live clients and the event handler table. All
//! registry mutation goes through `add_client` / `remove_client` under a
//! single reader/writer lock.

use super::{Client, ClientError, ClientId, Connection};
use crate::handlers::{EventHandler, RouteError, SendMessageHandler};
use crate::protocol::{Event, EventType};
use hub_common::HeartbeatConfig;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

/// Builds a `Manager` with its handler table
///
/// Handlers can only be registered here; once built, the table is read-only.
pub struct ManagerBuilder {
    handlers: HashMap<String, Arc<dyn EventHandler>>,
    heartbeat: HeartbeatConfig,
}

impl ManagerBuilder {
    /// Start with an empty handler table and default heartbeat settings
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            heartbeat: HeartbeatConfig::default(),
        }
    }

    /// Set heartbeat and queue settings applied to every client
    #[must_use]
    pub fn heartbeat(mut self, heartbeat: HeartbeatConfig) -> Self {
        self.heartbeat = heartbeat;
        self
    }

    /// Register a handler for an event type, replacing any previous one
    #[must_use]
    pub fn handler<H>(mut self, event_type: impl Into<String>, handler: H) -> Self
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(event_type.into(), Arc::new(handler));
        self
    }

    /// Register the built-in handlers
    #[must_use]
    pub fn with_default_handlers(self) -> Self {
        self.handler(EventType::SendMessage, SendMessageHandler)
    }

    /// Finish construction
    #[must_use]
    pub fn build(self) -> Arc<Manager> {
        Arc::new_cyclic(|this| Manager {
            clients: RwLock::new(HashMap::new()),
            handlers: self.handlers,
            heartbeat: self.heartbeat,
            this: this.clone(),
        })
    }
}

impl Default for ManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry of live clients and event dispatcher
pub struct Manager {
    /// Registered clients by ID
    clients: RwLock<HashMap<ClientId, Arc<Client>>>,

    /// Event type to handler; never mutated after construction
    handlers: HashMap<String, Arc<dyn EventHandler>>,

    heartbeat: HeartbeatConfig,

    /// Handed to clients as their back-reference
    this: Weak<Manager>,
}

impl Manager {
    /// Create a manager with the built-in handlers
    #[must_use]
    pub fn new(heartbeat: HeartbeatConfig) -> Arc<Self> {
        ManagerBuilder::new()
            .heartbeat(heartbeat)
            .with_default_handlers()
            .build()
    }

    /// Get a builder for a custom handler table
    #[must_use]
    pub fn builder() -> ManagerBuilder {
        ManagerBuilder::new()
    }

    /// Get the heartbeat settings
    pub fn heartbeat(&self) -> HeartbeatConfig {
        self.heartbeat
    }

    /// Admit a freshly upgraded connection: wrap it, register it, start it
    pub fn accept(&self, connection: Connection) -> Arc<Client> {
        let client = Client::new(connection, self.this.clone(), self.heartbeat);
        self.add_client(&client);
        client
    }

    /// Register a client and start its read and write loops
    pub fn add_client(&self, client: &Arc<Client>) {
        let mut clients = self.clients.write();
        clients.insert(client.id(), Arc::clone(client));
        client.start();

        tracing::info!(
            client_id = %client.id(),
            connections = clients.len(),
            "Client added"
        );
    }

    /// Evict a client and close its transport
    ///
    /// Safe to call any number of times; returns `false` if the client was
    /// not registered.
    pub fn remove_client(&self, client: &Client) -> bool {
        let mut clients = self.clients.write();
        if clients.remove(&client.id()).is_none() {
            return false;
        }

        client.close();
        client.mark_removed();

        tracing::info!(
            client_id = %client.id(),
            connections = clients.len(),
            "Client removed"
        );

        true
    }

    /// Hand an event to the handler registered for its type
    ///
    /// The payload is not looked at here; decoding is up to the handler.
    pub async fn route_event(&self, event: Event, client: &Arc<Client>) -> Result<(), RouteError> {
        let handler = self
            .handlers
            .get(event.kind())
            .cloned()
            .ok_or_else(|| RouteError::UnknownEvent(event.kind.clone()))?;

        tracing::trace!(client_id = %client.id(), event = %event, "Routing event");

        handler.handle(event, client).await?;
        Ok(())
    }

    /// Get a client by ID
    pub fn get_client(&self, id: ClientId) -> Option<Arc<Client>> {
        self.clients.read().get(&id).cloned()
    }

    /// Check if a client is registered
    pub fn contains(&self, id: ClientId) -> bool {
        self.clients.read().contains_key(&id)
    }

    /// Snapshot of all registered clients
    pub fn clients(&self) -> Vec<Arc<Client>> {
        self.clients.read().values().cloned().collect()
    }

    /// Get the number of registered clients
    pub fn client_count(&self) -> usize {
        self.clients.read().len()
    }

    /// Queue an event for every registered client without waiting
    ///
    /// A client whose queue is full misses this event; one slow reader never
    /// holds up the caller. Returns how many clients accepted it.
    pub fn broadcast(&self, event: &Event) -> usize {
        let mut sent = 0;

        for client in self.clients() {
            match client.try_send(event.clone()) {
                Ok(()) => sent += 1,
                Err(ClientError::QueueFull) => {
                    tracing::warn!(
                        client_id = %client.id(),
                        event_type = %event.kind,
                        "Outbound queue full, event dropped for client"
                    );
                }
                Err(ClientError::Closed) => {}
            }
        }

        tracing::debug!(event_type = %event.kind, sent = sent, "Event broadcast to all clients");

        sent
    }

    /// Evict every client. Returns how many were removed.
    pub fn shutdown(&self) -> usize {
        let drained: Vec<Arc<Client>> = self.clients.write().drain().map(|(_, c)| c).collect();

        for client in &drained {
            client.close();
            client.mark_removed();
        }

        tracing::info!(count = drained.len(), "All clients removed");

        drained.len()
    }
}

impl std::fmt::Debug for Manager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut handlers: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        handlers.sort_unstable();

        f.debug_struct("Manager")
            .field("clients", &self.client_count())
            .field("handlers", &handlers)
            .field("heartbeat", &self.heartbeat)
            .finish()
    }
}
