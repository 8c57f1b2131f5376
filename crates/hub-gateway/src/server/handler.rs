//! WebSocket upgrade handler
//!
//! Completes the HTTP upgrade and hands the socket to the manager.

use crate::connection::Connection;
use crate::server::GatewayState;
use axum::{
    extract::{State, WebSocketUpgrade},
    response::IntoResponse,
};

/// WebSocket gateway handler
pub async fn gateway_handler(
    State(state): State<GatewayState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_failed_upgrade(|e| {
        tracing::warn!(error = %e, "WebSocket upgrade failed");
    })
    .on_upgrade(move |socket| async move {
        let client = state.manager().accept(Connection::from_websocket(socket));
        tracing::info!(client_id = %client.id(), "WebSocket connection established");
    })
}
