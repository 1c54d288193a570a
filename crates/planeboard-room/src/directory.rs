//! Room directory: one live actor per room name.

use std::collections::HashMap;
use std::sync::Arc;

use planeboard_protocol::RoomId;
use tokio::sync::Mutex;

use crate::room::spawn_room;
use crate::{DeckResolver, RoomConfig, RoomHandle};

/// Live rooms by name. Actors remove their own entry when they retire.
pub(crate) type Registry = Arc<Mutex<HashMap<RoomId, RoomHandle>>>;

/// Creates and tracks room actors.
///
/// Every actor it starts shares the same [`DeckResolver`] and
/// [`RoomConfig`].
pub struct RoomDirectory<R: DeckResolver> {
    rooms: Registry,
    resolver: Arc<R>,
    config: RoomConfig,
}

impl<R: DeckResolver> RoomDirectory<R> {
    pub fn new(resolver: R, config: RoomConfig) -> Self {
        Self {
            rooms: Arc::new(Mutex::new(HashMap::new())),
            resolver: Arc::new(resolver),
            config,
        }
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// Returns the actor serving `room_id`, starting one if none is live.
    ///
    /// The lookup and the start happen under one lock, so two callers
    /// asking for the same new room get the same actor.
    pub async fn get_or_create(&self, room_id: &RoomId) -> RoomHandle {
        let mut rooms = self.rooms.lock().await;
        if let Some(handle) = rooms.get(room_id) {
            if !handle.is_closed() {
                return handle.clone();
            }
        }

        let handle = spawn_room(
            room_id.clone(),
            self.config.clone(),
            Arc::clone(&self.resolver),
            Arc::clone(&self.rooms),
        );
        rooms.insert(room_id.clone(), handle.clone());
        tracing::info!(%room_id, rooms = rooms.len(), "room created");
        handle
    }

    /// The actor serving `room_id`, if one is live.
    pub async fn get(&self, room_id: &RoomId) -> Option<RoomHandle> {
        self.rooms
            .lock()
            .await
            .get(room_id)
            .filter(|handle| !handle.is_closed())
            .cloned()
    }

    /// Number of rooms currently registered.
    pub async fn room_count(&self) -> usize {
        self.rooms.lock().await.len()
    }
}
