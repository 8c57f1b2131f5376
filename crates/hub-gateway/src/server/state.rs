//! Gateway state
//!
//! Application state shared by every request.

use crate::connection::Manager;
use hub_common::AppConfig;
use std::sync::Arc;

/// Gateway application state
#[derive(Debug, Clone)]
pub struct GatewayState {
    /// Registry and dispatcher for WebSocket clients
    manager: Arc<Manager>,
}

impl GatewayState {
    /// Create state with a manager carrying the built-in handlers, tuned by
    /// the heartbeat section of `config`
    pub fn new(config: &AppConfig) -> Self {
        Self {
            manager: Manager::new(config.heartbeat),
        }
    }

    /// Get the connection manager
    pub fn manager(&self) -> &Arc<Manager> {
        &self.manager
    }
}
