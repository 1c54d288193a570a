//! Room actor: an isolated Tokio task that owns one table.
//!
//! Everything that touches a room's state goes through its command
//! queue and is handled one command at a time, so the [`Board`] never
//! needs a lock. Deck lookups are the only slow step of a join; they run
//! on their own task and come back through the same queue.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use planeboard_protocol::{BoardCard, ClientMessage, RoomId, ServerMessage};
use planeboard_transport::ConnectionId;
use tokio::sync::{mpsc, oneshot};

use crate::board::{Board, Scope};
use crate::directory::Registry;
use crate::{ClientHandle, DeckError, DeckResolver, ResolvedDeck, RoomConfig, RoomError};

/// Distinguishes successive actors that served the same room name.
static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

/// Commands sent to a room actor through its channel.
pub(crate) enum RoomCommand {
    /// A connection attached to the room. It receives nothing until it
    /// joins.
    Register {
        client: ClientHandle,
        reply: oneshot::Sender<()>,
    },

    /// A connection asked to take a seat or watch.
    Join {
        conn_id: ConnectionId,
        username: String,
        deck_url: String,
        spectator: bool,
    },

    /// A table command from a connection.
    Command {
        conn_id: ConnectionId,
        msg: ClientMessage,
    },

    /// A deck lookup started by a join finished.
    DeckResolved {
        conn_id: ConnectionId,
        result: Result<ResolvedDeck, DeckError>,
    },

    /// A connection went away.
    Leave { conn_id: ConnectionId },

    /// Request a summary of the room.
    GetInfo { reply: oneshot::Sender<RoomInfo> },
}

/// A summary of who is in a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomInfo {
    pub room_id: RoomId,
    /// Seated players in join order.
    pub players: Vec<String>,
    /// Spectators in join order.
    pub spectators: Vec<String>,
    /// Connections that have not finished joining.
    pub pending: usize,
    /// The active player.
    pub turn: String,
}

/// Handle to a running room actor.
///
/// Cheap to clone. Every method fails with [`RoomError::Unavailable`]
/// once the actor has retired.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    room_id: RoomId,
    instance: u64,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    pub(crate) fn instance(&self) -> u64 {
        self.instance
    }

    /// `true` once the actor has stopped taking commands.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Attaches a connection. Resolves once the room has accepted it, so
    /// commands sent afterwards are ordered behind the registration.
    pub async fn register(&self, client: ClientHandle) -> Result<(), RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::Register {
            client,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| self.unavailable())
    }

    /// Asks the room to seat `conn_id` as `username`, or to add it as a
    /// spectator.
    pub async fn join(
        &self,
        conn_id: ConnectionId,
        username: String,
        deck_url: String,
        spectator: bool,
    ) -> Result<(), RoomError> {
        self.send(RoomCommand::Join {
            conn_id,
            username,
            deck_url,
            spectator,
        })
        .await
    }

    /// Forwards a table command (fire-and-forget).
    pub async fn send_message(
        &self,
        conn_id: ConnectionId,
        msg: ClientMessage,
    ) -> Result<(), RoomError> {
        self.send(RoomCommand::Command { conn_id, msg }).await
    }

    /// Tells the room `conn_id` is gone.
    pub async fn leave(&self, conn_id: ConnectionId) -> Result<(), RoomError> {
        self.send(RoomCommand::Leave { conn_id }).await
    }

    /// Requests the current room info.
    pub async fn info(&self) -> Result<RoomInfo, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::GetInfo { reply: reply_tx }).await?;
        reply_rx.await.map_err(|_| self.unavailable())
    }

    async fn send(&self, cmd: RoomCommand) -> Result<(), RoomError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| self.unavailable())
    }

    fn unavailable(&self) -> RoomError {
        RoomError::Unavailable(self.room_id.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    /// Registered, no JOIN yet.
    Connected,
    /// Waiting for its deck.
    Resolving,
    Player,
    Spectator,
}

struct Member {
    client: ClientHandle,
    username: String,
    deck_url: String,
    role: Role,
    joined: u64,
}

impl Member {
    /// Whether this connection receives table events.
    fn is_present(&self) -> bool {
        matches!(self.role, Role::Player | Role::Spectator)
    }

    fn holds_seat(&self) -> bool {
        matches!(self.role, Role::Player | Role::Resolving)
    }
}

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor<R: DeckResolver> {
    room_id: RoomId,
    instance: u64,
    config: RoomConfig,
    board: Board,
    members: HashMap<ConnectionId, Member>,
    next_join: u64,
    /// Set when a connection leaves or is refused; checked after each
    /// command to decide whether the room is done.
    departed: bool,
    resolver: Arc<R>,
    rooms: Registry,
    receiver: mpsc::Receiver<RoomCommand>,
    commands: mpsc::WeakSender<RoomCommand>,
}

impl<R: DeckResolver> RoomActor<R> {
    /// Runs the actor loop until the room has no one left to serve.
    async fn run(mut self) {
        tracing::info!(room_id = %self.room_id, instance = self.instance, "room actor started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                RoomCommand::Register { client, reply } => {
                    self.handle_register(client);
                    let _ = reply.send(());
                }
                RoomCommand::Join {
                    conn_id,
                    username,
                    deck_url,
                    spectator,
                } => self.handle_join(conn_id, username, deck_url, spectator),
                RoomCommand::Command { conn_id, msg } => {
                    self.handle_command(conn_id, msg);
                }
                RoomCommand::DeckResolved { conn_id, result } => {
                    self.handle_deck_resolved(conn_id, result);
                }
                RoomCommand::Leave { conn_id } => self.depart(conn_id),
                RoomCommand::GetInfo { reply } => {
                    let _ = reply.send(self.info());
                }
            }

            if std::mem::take(&mut self.departed) && self.is_abandoned() {
                break;
            }
        }

        self.retire().await;
    }

    fn handle_register(&mut self, client: ClientHandle) {
        let conn_id = client.id();
        tracing::debug!(room_id = %self.room_id, %conn_id, "connection registered");
        self.members.insert(
            conn_id,
            Member {
                client,
                username: String::new(),
                deck_url: String::new(),
                role: Role::Connected,
                joined: 0,
            },
        );
    }

    fn handle_join(
        &mut self,
        conn_id: ConnectionId,
        username: String,
        deck_url: String,
        spectator: bool,
    ) {
        match self.members.get(&conn_id) {
            None => {
                tracing::debug!(room_id = %self.room_id, %conn_id, "join from unregistered connection");
                return;
            }
            Some(member) if member.role != Role::Connected => {
                tracing::debug!(room_id = %self.room_id, %conn_id, "repeated join ignored");
                return;
            }
            Some(_) => {}
        }

        let seats = self.config.max_players.min(planeboard_protocol::Seat::ASSIGNMENT_ORDER.len());
        let seats_taken = self.members.values().filter(|m| m.holds_seat()).count();
        if spectator || seats_taken >= seats {
            self.admit_spectator(conn_id, username);
            return;
        }

        if username.is_empty() {
            self.refuse_join(conn_id, "Missing username");
            return;
        }
        if self
            .members
            .values()
            .any(|m| m.holds_seat() && m.username == username)
        {
            self.refuse_join(conn_id, "Username already taken");
            return;
        }

        if let Some(member) = self.members.get_mut(&conn_id) {
            member.role = Role::Resolving;
            member.username = username;
            member.deck_url = deck_url.clone();
        }
        tracing::debug!(room_id = %self.room_id, %conn_id, %deck_url, "resolving deck");

        let resolver = Arc::clone(&self.resolver);
        let commands = self.commands.clone();
        tokio::spawn(async move {
            let result = resolver.resolve(&deck_url).await;
            if let Some(commands) = commands.upgrade() {
                let _ = commands
                    .send(RoomCommand::DeckResolved { conn_id, result })
                    .await;
            }
        });
    }

    fn handle_deck_resolved(
        &mut self,
        conn_id: ConnectionId,
        result: Result<ResolvedDeck, DeckError>,
    ) {
        let Some(member) = self
            .members
            .get(&conn_id)
            .filter(|m| m.role == Role::Resolving)
        else {
            tracing::debug!(room_id = %self.room_id, %conn_id, "deck arrived after connection left");
            return;
        };
        let username = member.username.clone();
        let deck_url = member.deck_url.clone();

        let deck = match result {
            Ok(deck) => deck,
            Err(e) => {
                tracing::warn!(
                    room_id = %self.room_id,
                    %conn_id,
                    %username,
                    %deck_url,
                    error = %e,
                    "deck resolution failed"
                );
                self.refuse_join(conn_id, "Error fetching deck");
                return;
            }
        };

        let Some(commanders) = self.board.seat_player(&username, &deck_url, deck) else {
            self.refuse_join(conn_id, "Room is full");
            return;
        };
        self.admit(conn_id, Role::Player);
        tracing::info!(
            room_id = %self.room_id,
            %conn_id,
            %username,
            seat = ?self.board.positions().get(&username),
            players = self.board.player_count(),
            "player joined"
        );

        self.send_snapshot(conn_id);
        let joined = self.user_joined(&username, commanders);
        self.broadcast(Some(conn_id), joined);
    }

    fn admit_spectator(&mut self, conn_id: ConnectionId, username: String) {
        if let Some(member) = self.members.get_mut(&conn_id) {
            member.username = username.clone();
        }
        self.admit(conn_id, Role::Spectator);
        tracing::info!(room_id = %self.room_id, %conn_id, %username, "spectator joined");

        self.send_snapshot(conn_id);
        let joined = self.user_joined(&username, Vec::new());
        self.broadcast(Some(conn_id), joined);
    }

    fn admit(&mut self, conn_id: ConnectionId, role: Role) {
        self.next_join += 1;
        if let Some(member) = self.members.get_mut(&conn_id) {
            member.role = role;
            member.joined = self.next_join;
        }
    }

    /// Sends `ERROR{reason}` to a joining connection and drops it. Its
    /// outbound queue closes once the error has been written.
    fn refuse_join(&mut self, conn_id: ConnectionId, reason: &str) {
        let Some(member) = self.members.remove(&conn_id) else {
            return;
        };
        tracing::debug!(room_id = %self.room_id, %conn_id, reason, "join refused");
        self.departed = true;
        member.client.try_deliver(Arc::new(ServerMessage::Error {
            reason: reason.to_string(),
        }));
    }

    fn handle_command(&mut self, conn_id: ConnectionId, msg: ClientMessage) {
        let kind = msg.kind();
        let username = match self.members.get(&conn_id) {
            Some(member) if member.role == Role::Player => member.username.clone(),
            _ => {
                tracing::debug!(room_id = %self.room_id, %conn_id, kind, "command from non-player ignored");
                return;
            }
        };

        match self.board.apply(&username, msg) {
            Some((Scope::All, event)) => self.broadcast(None, event),
            Some((Scope::Others, event)) => self.broadcast(Some(conn_id), event),
            None => {
                tracing::debug!(room_id = %self.room_id, %username, kind, "command changed nothing");
            }
        }
    }

    /// Removes a connection. Seated players take their board state with
    /// them and everyone left is told.
    fn depart(&mut self, conn_id: ConnectionId) {
        let Some(member) = self.members.remove(&conn_id) else {
            return;
        };
        self.departed = true;

        match member.role {
            Role::Player => {
                self.board.remove_player(&member.username);
                tracing::info!(
                    room_id = %self.room_id,
                    %conn_id,
                    username = %member.username,
                    players = self.board.player_count(),
                    "player left"
                );
                let left = ServerMessage::UserLeft {
                    user: member.username,
                    users: self.users(),
                    spectators: self.spectators(),
                    positions: self.board.positions().clone(),
                    turn: self.board.turn().to_string(),
                };
                self.broadcast(None, left);
            }
            Role::Spectator => {
                tracing::info!(room_id = %self.room_id, %conn_id, username = %member.username, "spectator left");
            }
            Role::Connected | Role::Resolving => {
                tracing::debug!(room_id = %self.room_id, %conn_id, "connection left before joining");
            }
        }
    }

    fn send_snapshot(&mut self, conn_id: ConnectionId) {
        let snapshot = self.board.snapshot(self.users(), self.spectators());
        let delivered = self.members.get(&conn_id).is_some_and(|m| {
            m.client
                .try_deliver(Arc::new(ServerMessage::BoardState(Box::new(snapshot))))
        });
        if !delivered {
            self.evict(conn_id);
        }
    }

    /// Delivers `event` to every present connection except `except`.
    /// Anyone whose queue is full is disconnected.
    fn broadcast(&mut self, except: Option<ConnectionId>, event: ServerMessage) {
        let event = Arc::new(event);
        let unresponsive: Vec<ConnectionId> = self
            .members
            .iter()
            .filter(|(id, m)| m.is_present() && Some(**id) != except)
            .filter(|(_, m)| !m.client.try_deliver(Arc::clone(&event)))
            .map(|(id, _)| *id)
            .collect();

        for conn_id in unresponsive {
            self.evict(conn_id);
        }
    }

    fn evict(&mut self, conn_id: ConnectionId) {
        if let Some(member) = self.members.get(&conn_id) {
            tracing::warn!(
                room_id = %self.room_id,
                %conn_id,
                username = %member.username,
                "evicting unresponsive connection"
            );
            member.client.close();
        }
        self.depart(conn_id);
    }

    fn user_joined(&self, user: &str, commanders: Vec<BoardCard>) -> ServerMessage {
        ServerMessage::UserJoined {
            user: user.to_string(),
            users: self.users(),
            spectators: self.spectators(),
            positions: self.board.positions().clone(),
            decks: self.board.decks(),
            commanders,
            life_totals: self.board.life_totals().clone(),
            turn: self.board.turn().to_string(),
        }
    }

    fn roster(&self, role: Role) -> Vec<String> {
        let mut members: Vec<&Member> =
            self.members.values().filter(|m| m.role == role).collect();
        members.sort_by_key(|m| m.joined);
        members.into_iter().map(|m| m.username.clone()).collect()
    }

    fn users(&self) -> Vec<String> {
        self.roster(Role::Player)
    }

    fn spectators(&self) -> Vec<String> {
        self.roster(Role::Spectator)
    }

    /// No players, nobody mid-join and nobody who might still join.
    fn is_abandoned(&self) -> bool {
        self.members.values().all(|m| m.role == Role::Spectator)
    }

    fn info(&self) -> RoomInfo {
        RoomInfo {
            room_id: self.room_id.clone(),
            players: self.users(),
            spectators: self.spectators(),
            pending: self
                .members
                .values()
                .filter(|m| matches!(m.role, Role::Connected | Role::Resolving))
                .count(),
            turn: self.board.turn().to_string(),
        }
    }

    /// Takes the room out of the directory, refuses whatever is still
    /// queued and disconnects remaining spectators.
    async fn retire(mut self) {
        {
            let mut rooms = self.rooms.lock().await;
            if rooms
                .get(&self.room_id)
                .is_some_and(|handle| handle.instance() == self.instance)
            {
                rooms.remove(&self.room_id);
            }
        }

        // Dropping a queued Register's reply makes the caller see
        // `Unavailable` and look the room up again.
        self.receiver.close();
        while self.receiver.recv().await.is_some() {}

        for member in self.members.values() {
            member.client.close();
        }
        tracing::info!(
            room_id = %self.room_id,
            instance = self.instance,
            spectators = self.members.len(),
            "room retired"
        );
    }
}

/// Spawns a new room actor task and returns a handle to communicate with it.
pub(crate) fn spawn_room<R: DeckResolver>(
    room_id: RoomId,
    config: RoomConfig,
    resolver: Arc<R>,
    rooms: Registry,
) -> RoomHandle {
    let (sender, receiver) = mpsc::channel(config.command_queue_size.max(1));
    let instance = NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed);
    let actor = RoomActor {
        room_id: room_id.clone(),
        instance,
        board: Board::new(config.starting_life),
        config,
        members: HashMap::new(),
        next_join: 0,
        departed: false,
        resolver,
        rooms,
        receiver,
        commands: sender.downgrade(),
    };
    tokio::spawn(actor.run());

    RoomHandle {
        room_id,
        instance,
        sender,
    }
}
