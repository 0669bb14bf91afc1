//! `DuelboardServer` builder and server loop.
//!
//! This is the entry point for running a Duelboard server. It ties
//! together all the layers: transport → protocol → registry → room.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use duelboard_protocol::{Codec, JsonCodec, ServerEvent};
use duelboard_room::{Outbound, RoomConfig, RoomManager};
use duelboard_transport::{ConnectionId, Transport, WebSocketTransport};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::handler::handle_connection;
use crate::{DuelboardError, ServerConfig};

/// Events a connection may have queued before it is dropped as too slow.
pub(crate) const OUTBOX_CAPACITY: usize = 256;

/// Sending half of a connection's outbound queue.
pub(crate) type EventSender = mpsc::Sender<ServerEvent>;

/// Shared server state passed to each connection handler task.
///
/// Lock order is `rooms` then `outbox`. Events produced under the rooms
/// lock are queued before it is released, so every connection sees
/// events in the order the room produced them.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) rooms: Mutex<RoomManager>,
    pub(crate) outbox: Mutex<HashMap<ConnectionId, EventSender>>,
    pub(crate) codec: C,
}

impl<C: Codec> ServerState<C> {
    fn new(config: RoomConfig, codec: C) -> Self {
        Self {
            rooms: Mutex::new(RoomManager::new(config)),
            outbox: Mutex::new(HashMap::new()),
            codec,
        }
    }

    /// Queues each event on its recipient's outbound channel.
    ///
    /// Events for connections that are already gone are dropped. A
    /// connection whose queue is full loses its queue: the writer drains
    /// what is left and the connection is closed.
    pub(crate) async fn deliver(&self, out: Vec<Outbound>) {
        if out.is_empty() {
            return;
        }
        let mut outbox = self.outbox.lock().await;
        for Outbound { to, event } in out {
            let name = event.name();
            let Some(tx) = outbox.get(&to) else {
                tracing::warn!(conn_id = %to, event = name, "no outbound queue, event dropped");
                continue;
            };
            match tx.try_send(event) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(
                        conn_id = %to,
                        event = name,
                        capacity = OUTBOX_CAPACITY,
                        "outbound queue full, dropping connection"
                    );
                    outbox.remove(&to);
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!(conn_id = %to, event = name, "writer gone, event dropped");
                }
            }
        }
    }
}

/// Builder for configuring and starting a Duelboard server.
///
/// # Example
///
/// ```rust,ignore
/// use duelboard::prelude::*;
///
/// let server = DuelboardServer::builder()
///     .bind("0.0.0.0:6789")
///     .build()
///     .await?;
/// server.run().await
/// ```
pub struct DuelboardServerBuilder {
    config: ServerConfig,
}

impl DuelboardServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Sets the settings applied to every room.
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.config.room = config;
        self
    }

    /// Sets how often idle rooms are swept. Must be non-zero.
    pub fn reap_interval(mut self, every: Duration) -> Self {
        self.config.reap_interval = every;
        self
    }

    /// Replaces the whole configuration, e.g. one read by
    /// [`ServerConfig::from_env`].
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Binds the listener and builds the server.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    ///
    /// # Errors
    /// Returns `DuelboardError::Config` for a zero reap interval and
    /// `DuelboardError::Transport` if the address cannot be bound.
    pub async fn build(self) -> Result<DuelboardServer<JsonCodec>, DuelboardError> {
        if self.config.reap_interval.is_zero() {
            return Err(DuelboardError::Config {
                key: "reap_interval",
                value: format!("{:?}", self.config.reap_interval),
            });
        }

        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;
        let state = Arc::new(ServerState::new(self.config.room.clone(), JsonCodec));

        Ok(DuelboardServer {
            transport,
            state,
            reap_interval: self.config.reap_interval,
        })
    }
}

impl Default for DuelboardServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Duelboard server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct DuelboardServer<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
    reap_interval: Duration,
}

impl DuelboardServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> DuelboardServerBuilder {
        DuelboardServerBuilder::new()
    }
}

impl<C: Codec> DuelboardServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> Result<std::net::SocketAddr, DuelboardError> {
        Ok(self.transport.local_addr()?)
    }

    /// Runs the accept loop.
    ///
    /// Spawns a handler task per connection and, when rooms have an idle
    /// timeout, a task that reaps idle rooms. Runs until the future is
    /// dropped.
    pub async fn run(mut self) -> Result<(), DuelboardError> {
        let _reaper = self.spawn_reaper().await.map(AbortOnDrop);
        tracing::info!(addr = ?self.transport.local_addr().ok(), "duelboard server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(handle_connection(conn, state));
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }

    async fn spawn_reaper(&self) -> Option<JoinHandle<()>> {
        let timeout = self.state.rooms.lock().await.config().idle_timeout?;
        let every = self.reap_interval;
        tracing::info!(?timeout, ?every, "idle room reaping enabled");
        Some(tokio::spawn(reap_loop(Arc::clone(&self.state), every)))
    }
}

async fn reap_loop<C: Codec>(state: Arc<ServerState<C>>, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let mut rooms = state.rooms.lock().await;
        let out = rooms.reap_idle(std::time::Instant::now());
        state.deliver(out).await;
    }
}

/// Aborts the wrapped task when dropped.
struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}
