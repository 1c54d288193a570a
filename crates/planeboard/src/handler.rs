//! Per-connection adapter: attach to a room, then pump frames both ways.
//!
//! Each accepted connection gets its own Tokio task running
//! [`handle_connection`], plus one spawned writer task. The flow is:
//!   1. Look up (or start) the room named by the `room` query parameter
//!      and register an outbound queue with it.
//!   2. Writer: drain the queue onto the socket, pinging on a timer.
//!   3. Reader: decode frames into room commands until the peer goes
//!      away, stays silent past the read deadline, or is evicted.
//!
//! Whichever side stops first fires the connection's [`CloseGuard`],
//! which tells the room and stops the other side.

use std::sync::Arc;

use planeboard_protocol::{ClientMessage, Codec, RoomId};
use planeboard_room::{
    ClientHandle, CloseGuard, DeckResolver, Outbound, RoomError, RoomHandle,
};
use planeboard_transport::{
    Connection, Frame, TransportError, WebSocketConnection,
};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::server::ServerState;
use crate::PlaneboardError;

/// A room can retire between lookup and registration; this many fresh
/// lookups are tried before giving up.
const ATTACH_ATTEMPTS: usize = 3;

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<R, C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<R, C>>,
) -> Result<(), PlaneboardError>
where
    R: DeckResolver,
    C: Codec,
{
    let conn_id = conn.id();
    let conn = Arc::new(conn);

    // The transport refuses upgrades without it; checked again so a
    // differently configured transport cannot produce a nameless room.
    let Some(room_id) = conn.query().non_empty("room").map(RoomId::from) else {
        let _ = conn.close().await;
        return Err(TransportError::MissingParam("room").into());
    };
    tracing::debug!(%conn_id, %room_id, "handling new connection");

    let (tx, rx) = mpsc::channel(state.rooms.config().outbound_queue_size);
    let (room, guard) = match attach(&state, &room_id, &conn, tx).await {
        Ok(attached) => attached,
        Err(e) => {
            let _ = conn.close().await;
            return Err(e);
        }
    };

    let writer = tokio::spawn(write_pump(
        Arc::clone(&conn),
        rx,
        Arc::clone(&guard),
        Arc::clone(&state),
    ));

    read_pump(&conn, &room, &guard, &state).await;

    guard.close();
    let _ = writer.await;
    tracing::debug!(%conn_id, %room_id, "connection finished");
    Ok(())
}

/// Registers the connection's outbound queue with the room.
///
/// `tx` is consumed so that, once attached, the room holds the only
/// sender and dropping it ends the writer.
async fn attach<R, C>(
    state: &ServerState<R, C>,
    room_id: &RoomId,
    conn: &WebSocketConnection,
    tx: mpsc::Sender<Outbound>,
) -> Result<(RoomHandle, Arc<CloseGuard>), PlaneboardError>
where
    R: DeckResolver,
    C: Codec,
{
    let conn_id = conn.id();
    for attempt in 1..=ATTACH_ATTEMPTS {
        let room = state.rooms.get_or_create(room_id).await;
        let guard = CloseGuard::new(conn_id, room.clone());
        let client = ClientHandle::new(conn_id, tx.clone(), Arc::clone(&guard));
        match room.register(client).await {
            Ok(()) => return Ok((room, guard)),
            Err(e) => {
                tracing::debug!(%conn_id, %room_id, attempt, error = %e, "room retired during attach");
            }
        }
    }
    Err(RoomError::Unavailable(room_id.clone()).into())
}

/// Reads frames and turns them into room commands.
async fn read_pump<R, C>(
    conn: &WebSocketConnection,
    room: &RoomHandle,
    guard: &CloseGuard,
    state: &ServerState<R, C>,
) where
    R: DeckResolver,
    C: Codec,
{
    let conn_id = conn.id();
    let mut shutdown = guard.subscribe();

    while !guard.is_closed() {
        let read = tokio::select! {
            _ = shutdown.changed() => break,
            read = tokio::time::timeout(state.read_timeout, conn.recv()) => read,
        };

        let data = match read {
            Ok(Ok(Some(Frame::Data(data)))) => data,
            Ok(Ok(Some(Frame::Pong))) => continue,
            Ok(Ok(None)) => {
                tracing::debug!(%conn_id, "connection closed by peer");
                break;
            }
            Ok(Err(e)) => {
                tracing::debug!(%conn_id, error = %e, "read failed");
                break;
            }
            Err(_) => {
                tracing::info!(%conn_id, "read deadline passed");
                break;
            }
        };

        let msg: ClientMessage = match state.codec.decode(&data) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "dropping malformed frame");
                continue;
            }
        };

        let routed = match msg {
            ClientMessage::Join { username, deck_url } => {
                let query = conn.query();
                let username = username
                    .filter(|u| !u.is_empty())
                    .or_else(|| query.non_empty("username").map(str::to_string))
                    .unwrap_or_default();
                let deck_url = deck_url
                    .filter(|d| !d.is_empty())
                    .or_else(|| query.non_empty("deckUrl").map(str::to_string))
                    .unwrap_or_default();
                room.join(conn_id, username, deck_url, query.flag("spectator"))
                    .await
            }
            ClientMessage::Unknown => {
                tracing::debug!(%conn_id, "dropping unknown command");
                continue;
            }
            msg => room.send_message(conn_id, msg).await,
        };

        if let Err(e) = routed {
            tracing::debug!(%conn_id, error = %e, "room gone");
            break;
        }
    }
}

/// Writes queued events and heartbeats until the queue ends, a write
/// fails, or the guard fires.
async fn write_pump<R, C>(
    conn: Arc<WebSocketConnection>,
    mut rx: mpsc::Receiver<Outbound>,
    guard: Arc<CloseGuard>,
    state: Arc<ServerState<R, C>>,
) where
    R: DeckResolver,
    C: Codec,
{
    let conn_id = conn.id();
    let mut shutdown = guard.subscribe();
    let mut heartbeat = tokio::time::interval(state.heartbeat_interval);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    heartbeat.tick().await;

    while !guard.is_closed() {
        tokio::select! {
            _ = shutdown.changed() => break,
            queued = rx.recv() => {
                let Some(event) = queued else {
                    tracing::debug!(%conn_id, "outbound queue closed");
                    break;
                };
                let bytes = match state.codec.encode(event.as_ref()) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        tracing::debug!(%conn_id, error = %e, "dropping unencodable event");
                        continue;
                    }
                };
                match tokio::time::timeout(state.read_timeout, conn.send(&bytes)).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        tracing::debug!(%conn_id, error = %e, "write failed");
                        break;
                    }
                    Err(_) => {
                        tracing::debug!(%conn_id, "write timed out");
                        break;
                    }
                }
            }
            _ = heartbeat.tick() => {
                if let Err(e) = conn.ping().await {
                    tracing::debug!(%conn_id, error = %e, "ping failed");
                    break;
                }
            }
        }
    }

    guard.close();
    rx.close();
    let _ = conn.close().await;
}
