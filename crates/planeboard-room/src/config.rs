//! Room configuration.

use serde::{Deserialize, Serialize};

/// Settings shared by every room a directory creates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomConfig {
    /// Seats at the table. Joiners past this become spectators.
    pub max_players: usize,

    /// Life total a player starts with.
    pub starting_life: i32,

    /// Capacity of the room's command queue.
    pub command_queue_size: usize,

    /// Capacity of each connection's outbound queue. A connection whose
    /// queue is full when the room delivers to it is evicted.
    pub outbound_queue_size: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            max_players: 4,
            starting_life: 40,
            command_queue_size: 256,
            outbound_queue_size: 256,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_config_default() {
        let config = RoomConfig::default();
        assert_eq!(config.max_players, 4);
        assert_eq!(config.starting_life, 40);
        assert_eq!(config.outbound_queue_size, 256);
    }

    #[test]
    fn test_room_config_fills_missing_fields() {
        let config: RoomConfig =
            serde_json::from_str(r#"{"starting_life":20}"#).unwrap();
        assert_eq!(config.starting_life, 20);
        assert_eq!(config.max_players, 4);
    }
}
