//! Test helpers for integration tests
//!
//! Provides a gateway server bound to an ephemeral port and a thin WebSocket
//! client wrapper.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use futures_util::{SinkExt, StreamExt};
use hub_common::{AppConfig, HeartbeatConfig};
use hub_gateway::server::serve;
use hub_gateway::{Event, GatewayState, Manager};
use reqwest::{Client, Response};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// How long a test waits for anything before failing
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Test server instance that manages lifecycle
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: Client,
    manager: Arc<Manager>,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl TestServer {
    /// Start a new test server with default settings
    pub async fn start() -> Result<Self> {
        Self::start_with_config(test_config()).await
    }

    /// Start a test server with custom config
    pub async fn start_with_config(config: AppConfig) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let state = GatewayState::new(&config);
        let manager = state.manager().clone();

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let signal = async move {
                let _ = shutdown_rx.await;
            };
            serve(listener, state, signal).await.ok();
        });

        let client = Client::builder().timeout(TEST_TIMEOUT).build()?;

        Ok(Self {
            addr,
            client,
            manager,
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Get base URL for the server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the WebSocket URL
    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    /// Get the server's connection manager
    pub fn manager(&self) -> &Arc<Manager> {
        &self.manager
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.get(&url).send().await?)
    }

    /// Open a WebSocket connection and wait until the server registered it
    pub async fn connect(&self) -> Result<WsClient> {
        let before = self.manager.client_count();
        let (stream, _) = connect_async(self.ws_url()).await?;
        self.wait_for_clients(before + 1).await?;
        Ok(WsClient { stream })
    }

    /// Wait until the registry holds exactly `expected` clients
    pub async fn wait_for_clients(&self, expected: usize) -> Result<()> {
        tokio::time::timeout(TEST_TIMEOUT, async {
            while self.manager.client_count() != expected {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .with_context(|| {
            format!(
                "expected {expected} clients, registry has {}",
                self.manager.client_count()
            )
        })
    }

    /// Stop accepting connections and evict every client
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            tokio::time::timeout(TEST_TIMEOUT, handle).await??;
        }
        Ok(())
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// A WebSocket client connected to the test server
pub struct WsClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsClient {
    /// Send a text frame
    pub async fn send_text(&mut self, text: impl Into<String>) -> Result<()> {
        self.stream.send(Message::Text(text.into())).await?;
        Ok(())
    }

    /// Wait for the next event envelope, skipping control frames
    pub async fn next_event(&mut self) -> Result<Event> {
        let next = tokio::time::timeout(TEST_TIMEOUT, async {
            while let Some(message) = self.stream.next().await {
                match message? {
                    Message::Text(text) => return Ok(Some(Event::from_json(&text)?)),
                    Message::Binary(bytes) => return Ok(Some(Event::from_slice(&bytes)?)),
                    Message::Close(_) => return Ok(None),
                    _ => {}
                }
            }
            Ok::<_, anyhow::Error>(None)
        })
        .await
        .context("timed out waiting for an event")??;

        match next {
            Some(event) => Ok(event),
            None => bail!("connection closed while waiting for an event"),
        }
    }

    /// Wait for the server to close the connection
    pub async fn wait_closed(&mut self) -> Result<()> {
        tokio::time::timeout(TEST_TIMEOUT, async {
            while let Some(message) = self.stream.next().await {
                match message {
                    Ok(Message::Close(_)) | Err(_) => return,
                    Ok(_) => {}
                }
            }
        })
        .await
        .context("server never closed the connection")
    }

    /// Close from the client side
    pub async fn close(mut self) -> Result<()> {
        self.stream.close(None).await?;
        Ok(())
    }
}

/// Create a test configuration
pub fn test_config() -> AppConfig {
    AppConfig {
        heartbeat: HeartbeatConfig::new(Duration::from_secs(10)),
        ..AppConfig::default()
    }
}
