//! Connection handles as seen from inside a room.
//!
//! A [`ClientHandle`] is what the room actor keeps per connection: a
//! bounded outbound queue plus a shared [`CloseGuard`]. Delivery never
//! waits; a full or closed queue marks the client as unresponsive.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use planeboard_protocol::ServerMessage;
use planeboard_transport::ConnectionId;
use tokio::sync::{mpsc, watch};

use crate::RoomHandle;

/// An event queued for one connection. Shared, since a broadcast hands
/// the same event to every recipient.
pub type Outbound = Arc<ServerMessage>;

/// One-shot close for a connection.
///
/// The first [`close`](Self::close) wins: it tells the room the
/// connection left and wakes both pumps through the shutdown signal.
/// Every later call, from any task, is a no-op.
pub struct CloseGuard {
    conn_id: ConnectionId,
    room: RoomHandle,
    closed: AtomicBool,
    shutdown: watch::Sender<bool>,
}

impl CloseGuard {
    /// Creates a guard for `conn_id` that reports departures to `room`.
    pub fn new(conn_id: ConnectionId, room: RoomHandle) -> Arc<Self> {
        let (shutdown, _) = watch::channel(false);
        Arc::new(Self {
            conn_id,
            room,
            closed: AtomicBool::new(false),
            shutdown,
        })
    }

    /// Closes the connection. Returns `true` only for the call that
    /// actually performed the close.
    pub fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        tracing::debug!(conn_id = %self.conn_id, room_id = %self.room.room_id(), "closing connection");
        self.shutdown.send_replace(true);

        // The room may be the caller (forced eviction), so the departure
        // is queued from a separate task instead of awaited here.
        let room = self.room.clone();
        let conn_id = self.conn_id;
        tokio::spawn(async move {
            let _ = room.leave(conn_id).await;
        });
        true
    }

    /// Whether [`close`](Self::close) has run.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// A receiver that observes the switch to `true` when the guard fires.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }
}

/// The room's view of one connection.
#[derive(Clone)]
pub struct ClientHandle {
    id: ConnectionId,
    sender: mpsc::Sender<Outbound>,
    guard: Arc<CloseGuard>,
}

impl ClientHandle {
    /// Wraps the sending half of a connection's outbound queue.
    pub fn new(
        id: ConnectionId,
        sender: mpsc::Sender<Outbound>,
        guard: Arc<CloseGuard>,
    ) -> Self {
        Self { id, sender, guard }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queues `msg` without waiting. Returns `false` if the queue is full
    /// or already closed.
    pub fn try_deliver(&self, msg: Outbound) -> bool {
        self.sender.try_send(msg).is_ok()
    }

    /// Fires this connection's [`CloseGuard`].
    pub fn close(&self) -> bool {
        self.guard.close()
    }
}

impl std::fmt::Debug for ClientHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientHandle")
            .field("id", &self.id)
            .field("closed", &self.guard.is_closed())
            .finish()
    }
}
