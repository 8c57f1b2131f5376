//! Client connection actor
//!
//! Owns one live connection. A read task pulls frames off the wire and routes
//! events through the manager; a write task is the only writer to the wire,
//! draining the outbound queue and sending heartbeat pings.

use super::transport::{CloseFrame, Connection, Frame, FrameSink, FrameStream, TransportError};
use super::Manager;
use crate::protocol::{CloseCode, Event};
use futures::{SinkExt, StreamExt};
use hub_common::HeartbeatConfig;
use parking_lot::{Mutex, RwLock};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant, MissedTickBehavior};

/// Unique identity of a client within the registry
pub type ClientId = uuid::Uuid;

/// Lifecycle of a client. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ClientState {
    /// Wrapped, loops not started yet
    Created,
    /// Registered, read and write loops running
    Running,
    /// A loop has stopped or the manager asked it to stop
    Closing,
    /// Evicted from the registry
    Removed,
}

/// Errors returned when queueing an outbound event
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// The outbound queue is closed, the client is going away
    #[error("Client connection is closed")]
    Closed,

    /// The outbound queue is at capacity
    #[error("Client outbound queue is full")]
    QueueFull,
}

/// How long a closing client may spend flushing its queue and close frame
pub(crate) const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Outcome of pushing a single frame to the transport
enum Delivery {
    Sent,
    Failed(TransportError),
    /// The close deadline passed before the transport took the frame
    Stalled,
}

/// Halves of the connection, held until the loops take them over
struct ClientIo {
    connection: Connection,
    egress: mpsc::Receiver<Event>,
}

/// A single connected client
pub struct Client {
    /// Unique client ID
    id: ClientId,

    /// Back-reference used only to ask the manager for routing and removal
    manager: Weak<Manager>,

    /// Outbound queue; the write loop is the single consumer
    egress: mpsc::Sender<Event>,

    io: Mutex<Option<ClientIo>>,

    /// Flipped to `true` by the manager when the client is evicted
    shutdown: watch::Sender<bool>,

    state: RwLock<ClientState>,

    heartbeat: HeartbeatConfig,
}

impl Client {
    /// Wrap an established connection
    pub fn new(
        connection: Connection,
        manager: Weak<Manager>,
        heartbeat: HeartbeatConfig,
    ) -> Arc<Self> {
        let (egress, egress_rx) = mpsc::channel(heartbeat.egress_buffer.max(1));
        let (shutdown, _) = watch::channel(false);

        Arc::new(Self {
            id: ClientId::new_v4(),
            manager,
            egress,
            io: Mutex::new(Some(ClientIo {
                connection,
                egress: egress_rx,
            })),
            shutdown,
            state: RwLock::new(ClientState::Created),
            heartbeat,
        })
    }

    /// Get the client ID
    pub fn id(&self) -> ClientId {
        self.id
    }

    /// Get the current lifecycle state
    pub fn state(&self) -> ClientState {
        *self.state.read()
    }

    /// Get the manager this client belongs to, if it is still alive
    pub fn manager(&self) -> Option<Arc<Manager>> {
        self.manager.upgrade()
    }

    /// Queue an event for this client, waiting for room in the queue
    pub async fn send(&self, event: Event) -> Result<(), ClientError> {
        self.egress.send(event).await.map_err(|_| ClientError::Closed)
    }

    /// Queue an event without waiting
    pub fn try_send(&self, event: Event) -> Result<(), ClientError> {
        self.egress.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => ClientError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => ClientError::Closed,
        })
    }

    /// Check if the outbound queue no longer accepts events
    pub fn is_closed(&self) -> bool {
        self.egress.is_closed()
    }

    /// Launch the read and write loops. Returns `false` if they were already
    /// started or the client is past the point of running.
    pub fn start(self: &Arc<Self>) -> bool {
        if self.state() >= ClientState::Closing {
            return false;
        }

        let Some(io) = self.io.lock().take() else {
            tracing::warn!(client_id = %self.id, "Client loops already started");
            return false;
        };

        self.advance(ClientState::Running);

        let (sink, stream) = io.connection.split();
        tokio::spawn(Arc::clone(self).read_messages(stream));
        tokio::spawn(Arc::clone(self).write_messages(sink, io.egress));

        true
    }

    /// Tell both loops to stop. The write loop flushes what is queued, sends a
    /// close frame and releases the sink, giving up on the flush after
    /// `CLOSE_GRACE` if the transport stops accepting frames.
    pub(crate) fn close(&self) {
        self.advance(ClientState::Closing);
        self.shutdown.send_replace(true);
    }

    pub(crate) fn mark_removed(&self) {
        self.advance(ClientState::Removed);
    }

    fn advance(&self, next: ClientState) {
        let mut state = self.state.write();
        if next > *state {
            *state = next;
        }
    }

    fn is_shutting_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    fn request_removal(self: &Arc<Self>) {
        self.advance(ClientState::Closing);

        match self.manager.upgrade() {
            Some(manager) => {
                manager.remove_client(self);
            }
            // Nobody left to evict us; stop the sibling loop directly
            None => self.close(),
        }
    }

    async fn read_messages(self: Arc<Self>, mut stream: FrameStream) {
        let mut shutdown = self.shutdown.subscribe();
        let pong_wait = self.heartbeat.pong_wait;
        let mut deadline = Instant::now() + pong_wait;

        while !self.is_shutting_down() {
            let next = tokio::select! {
                _ = shutdown.changed() => break,
                next = time::timeout_at(deadline, stream.next()) => next,
            };

            let frame = match next {
                Err(_) => {
                    tracing::error!(
                        client_id = %self.id,
                        pong_wait_ms = pong_wait.as_millis() as u64,
                        "Heartbeat timed out, no pong received"
                    );
                    break;
                }
                Ok(None) => {
                    tracing::debug!(client_id = %self.id, "Connection closed by peer");
                    break;
                }
                Ok(Some(Err(e))) => {
                    if e.is_expected() {
                        tracing::debug!(client_id = %self.id, error = %e, "Connection closed");
                    } else {
                        tracing::error!(client_id = %self.id, error = %e, "Error reading message");
                    }
                    break;
                }
                Ok(Some(Ok(frame))) => frame,
            };

            match frame {
                Frame::Pong(_) => {
                    tracing::trace!(client_id = %self.id, "Pong received");
                    deadline = Instant::now() + pong_wait;
                }
                Frame::Ping(_) => {
                    // Answered by the transport
                    tracing::trace!(client_id = %self.id, "Ping received");
                }
                Frame::Close(close) => {
                    match close {
                        Some(close) if !CloseCode::is_expected_code(close.code) => {
                            tracing::error!(
                                client_id = %self.id,
                                code = close.code,
                                reason = %close.reason,
                                "Unexpected close from peer"
                            );
                        }
                        _ => tracing::debug!(client_id = %self.id, "Peer closed connection"),
                    }
                    break;
                }
                Frame::Text(text) => {
                    if !self.dispatch(Event::from_json(&text)).await {
                        break;
                    }
                }
                Frame::Binary(bytes) => {
                    if !self.dispatch(Event::from_slice(&bytes)).await {
                        break;
                    }
                }
            }
        }

        self.request_removal();
    }

    /// Route one decoded frame. Returns `false` when the read loop must stop.
    async fn dispatch(self: &Arc<Self>, decoded: Result<Event, serde_json::Error>) -> bool {
        let event = match decoded {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(
                    client_id = %self.id,
                    error = %e,
                    "Malformed event envelope, dropping connection"
                );
                return false;
            }
        };

        let Some(manager) = self.manager.upgrade() else {
            tracing::debug!(client_id = %self.id, "Manager dropped, stopping read loop");
            return false;
        };

        let event_type = event.kind.clone();
        if let Err(e) = manager.route_event(event, self).await {
            tracing::warn!(
                client_id = %self.id,
                event_type = %event_type,
                error = %e,
                "Error handling event"
            );
        }

        true
    }

    async fn write_messages(self: Arc<Self>, mut sink: FrameSink, mut egress: mpsc::Receiver<Event>) {
        let mut shutdown = self.shutdown.subscribe();
        let mut close_by = self.is_shutting_down().then(|| Instant::now() + CLOSE_GRACE);

        let ping_interval = self.heartbeat.ping_interval();
        let mut ticker = time::interval_at(Instant::now() + ping_interval, ping_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if close_by.is_some() {
                // Refuse new events; buffered ones still go out before the close frame
                egress.close();
            }

            tokio::select! {
                _ = shutdown.changed(), if close_by.is_none() => {
                    close_by = Some(Instant::now() + CLOSE_GRACE);
                }
                message = egress.recv() => {
                    let Some(event) = message else {
                        let close = Frame::Close(Some(CloseFrame {
                            code: CloseCode::GoingAway.as_u16(),
                            reason: String::new(),
                        }));
                        match self.deliver(&mut sink, close, &mut shutdown, &mut close_by).await {
                            Delivery::Sent => {}
                            Delivery::Failed(e) => {
                                tracing::debug!(client_id = %self.id, error = %e, "Failed to send close frame");
                            }
                            Delivery::Stalled => {
                                tracing::debug!(client_id = %self.id, "Transport stalled, close frame not sent");
                            }
                        }
                        break;
                    };

                    let json = match event.to_json() {
                        Ok(json) => json,
                        Err(e) => {
                            tracing::error!(client_id = %self.id, error = %e, "Failed to encode event");
                            continue;
                        }
                    };

                    match self.deliver(&mut sink, Frame::Text(json), &mut shutdown, &mut close_by).await {
                        Delivery::Sent => {
                            tracing::trace!(client_id = %self.id, event_type = %event.kind, "Message sent");
                        }
                        Delivery::Failed(e) => {
                            tracing::warn!(
                                client_id = %self.id,
                                event_type = %event.kind,
                                error = %e,
                                "Failed to send message"
                            );
                        }
                        Delivery::Stalled => {
                            tracing::warn!(client_id = %self.id, "Transport stalled while closing, dropping it");
                            break;
                        }
                    }
                }
                _ = ticker.tick(), if close_by.is_none() => {
                    tracing::trace!(client_id = %self.id, "Ping");
                    match self.deliver(&mut sink, Frame::Ping(Vec::new()), &mut shutdown, &mut close_by).await {
                        Delivery::Sent => {}
                        Delivery::Failed(e) => {
                            tracing::debug!(client_id = %self.id, error = %e, "Failed to send ping");
                            break;
                        }
                        Delivery::Stalled => break,
                    }
                }
            }
        }

        drop(sink);
        self.request_removal();
    }

    /// Push one frame to the transport. A send that is still pending when the
    /// client is told to close gets until `close_by` to finish.
    async fn deliver(
        &self,
        sink: &mut FrameSink,
        frame: Frame,
        shutdown: &mut watch::Receiver<bool>,
        close_by: &mut Option<Instant>,
    ) -> Delivery {
        let send = sink.send(frame);
        tokio::pin!(send);

        loop {
            let deadline = *close_by;

            tokio::select! {
                biased;
                result = &mut send => {
                    return match result {
                        Ok(()) => Delivery::Sent,
                        Err(e) => Delivery::Failed(e),
                    };
                }
                _ = shutdown.changed(), if deadline.is_none() => {
                    *close_by = Some(Instant::now() + CLOSE_GRACE);
                }
                () = time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    return Delivery::Stalled;
                }
            }
        }
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
