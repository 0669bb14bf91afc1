//! Per-connection handler: outbound queue, inbound dispatch, cleanup.
//!
//! Each accepted connection gets its own Tokio task running this handler
//! plus a writer task draining its outbound queue. The flow is:
//!   1. Register the connection and its outbound queue
//!   2. Loop: receive frames → decode → dispatch to the room manager
//!   3. On exit, the guard runs disconnect for the connection

use std::sync::Arc;

use duelboard_protocol::{ClientEvent, Codec, InboundFrame, ServerEvent};
use duelboard_room::Outbound;
use duelboard_transport::{Connection, ConnectionId, WebSocketConnection};
use tokio::sync::mpsc;

use crate::server::{OUTBOX_CAPACITY, ServerState};

/// Drop guard that disconnects a connection when the handler exits.
///
/// This ensures cleanup happens even if the handler panics. Since `Drop`
/// is synchronous, we spawn a fire-and-forget task for the async locks.
struct ConnectionGuard<C: Codec> {
    conn_id: ConnectionId,
    state: Arc<ServerState<C>>,
}

impl<C: Codec> Drop for ConnectionGuard<C> {
    fn drop(&mut self) {
        let conn_id = self.conn_id;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            let mut rooms = state.rooms.lock().await;
            let out = rooms.disconnect(conn_id);
            state.deliver(out).await;
            drop(rooms);

            // Dropping the sender ends the writer task.
            state.outbox.lock().await.remove(&conn_id);
            tracing::debug!(%conn_id, "connection cleaned up");
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) {
    let conn_id = conn.id();
    let conn = Arc::new(conn);
    tracing::info!(%conn_id, "connection opened");

    let (tx, rx) = mpsc::channel(OUTBOX_CAPACITY);
    {
        let mut rooms = state.rooms.lock().await;
        rooms.connect(conn_id);
        state.outbox.lock().await.insert(conn_id, tx);
    }
    let _guard = ConnectionGuard {
        conn_id,
        state: Arc::clone(&state),
    };

    let mut writer = tokio::spawn(write_loop(Arc::clone(&conn), rx, Arc::clone(&state)));

    loop {
        let data = tokio::select! {
            received = conn.recv() => match received {
                Ok(Some(data)) => data,
                Ok(None) => {
                    tracing::info!(%conn_id, "connection closed");
                    break;
                }
                Err(e) => {
                    tracing::debug!(%conn_id, error = %e, "recv error");
                    break;
                }
            },
            // The writer only stops early when its queue was dropped or
            // the socket refused a send.
            _ = &mut writer => {
                tracing::info!(%conn_id, "writer stopped, closing connection");
                break;
            }
        };

        let frame: InboundFrame = match state.codec.decode(&data) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "failed to decode frame");
                reply(&state, conn_id, ServerEvent::Error { message: e.to_string() }).await;
                continue;
            }
        };

        dispatch(&state, conn_id, frame).await;
    }

    // _guard drops here → disconnect fires.
}

/// Parses one frame and hands it to the room manager.
///
/// A payload that does not parse is answered with `join_error` for joins
/// and `error` for everything else.
async fn dispatch<C: Codec>(state: &ServerState<C>, conn_id: ConnectionId, frame: InboundFrame) {
    let event = match ClientEvent::parse(frame) {
        Ok(event) => event,
        Err(e) => {
            tracing::debug!(%conn_id, error = %e, "rejected client event");
            let message = e.to_string();
            let event = match e.event() {
                Some("join") => ServerEvent::JoinError { message },
                _ => ServerEvent::Error { message },
            };
            reply(state, conn_id, event).await;
            return;
        }
    };

    tracing::trace!(%conn_id, event = event.name(), "client event");

    let mut rooms = state.rooms.lock().await;
    let out = match &event {
        ClientEvent::Join(req) => rooms.join(conn_id, &req.room, req.name.as_deref()),
        ClientEvent::Move(req) => rooms.make_move(conn_id, req),
        ClientEvent::Win(req) => rooms.win(conn_id, req),
    };
    state.deliver(out).await;
}

async fn reply<C: Codec>(state: &ServerState<C>, to: ConnectionId, event: ServerEvent) {
    state.deliver(vec![Outbound { to, event }]).await;
}

/// Drains a connection's outbound queue onto the socket, then closes it.
async fn write_loop<C: Codec>(
    conn: Arc<WebSocketConnection>,
    mut rx: mpsc::Receiver<ServerEvent>,
    state: Arc<ServerState<C>>,
) {
    let conn_id = conn.id();
    while let Some(event) = rx.recv().await {
        let bytes = match state.codec.encode(&event) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(%conn_id, event = event.name(), error = %e, "failed to encode event");
                continue;
            }
        };
        if let Err(e) = conn.send(&bytes).await {
            tracing::debug!(%conn_id, error = %e, "send failed, stopping writer");
            break;
        }
    }
    if let Err(e) = conn.close().await {
        tracing::trace!(%conn_id, error = %e, "close after writer exit");
    }
}
