//! Rooms for Planeboard.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns one
//! shared table and the connections watching it.
//!
//! # Key types
//!
//! - [`RoomDirectory`]: finds or starts the actor for a room name
//! - [`RoomHandle`]: send commands to a running room actor
//! - [`Board`]: the table state and its rules
//! - [`ClientHandle`] / [`CloseGuard`]: a connection as the room sees it
//! - [`DeckResolver`]: where players' decks come from

mod board;
mod client;
mod config;
mod deck;
mod directory;
mod error;
mod room;
pub mod seat;

pub use board::{Board, Scope};
pub use client::{ClientHandle, CloseGuard, Outbound};
pub use config::RoomConfig;
pub use deck::{DeckResolver, ResolvedDeck};
pub use directory::RoomDirectory;
pub use error::{DeckError, RoomError};
pub use room::{RoomHandle, RoomInfo};
