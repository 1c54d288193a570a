//! # Planeboard
//!
//! A shared card table for web clients. Players connect over WebSocket
//! with a room name, join with an Archidekt deck, and every move they make
//! on the table is mirrored to everyone else in the room.
//!
//! Each room is a single actor task owning the board; connections talk
//! to it through a channel and receive events through their own bounded
//! queue.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use clap::Parser;
//! use planeboard::prelude::*;
//!
//! # async fn start() -> Result<(), PlaneboardError> {
//! let config = ServerConfig::from(Cli::parse());
//! let resolver = ArchidektResolver::new(config.deck_fetch_timeout)?;
//! let server = PlaneboardServer::builder()
//!     .config(config)
//!     .build(resolver)
//!     .await?;
//! server.run().await
//! # }
//! ```

mod archidekt;
mod config;
mod error;
mod handler;
mod server;

pub use archidekt::ArchidektResolver;
pub use config::{Cli, ServerConfig};
pub use error::PlaneboardError;
pub use server::{PlaneboardServer, PlaneboardServerBuilder};

/// Convenient re-exports for running a server or writing a resolver.
pub mod prelude {
    pub use crate::{
        ArchidektResolver, Cli, PlaneboardError, PlaneboardServer,
        PlaneboardServerBuilder, ServerConfig,
    };
    pub use planeboard_protocol::{
        BoardCard, Card, ClientMessage, Codec, JsonCodec, RoomId, Seat,
        ServerMessage,
    };
    pub use planeboard_room::{
        DeckError, DeckResolver, ResolvedDeck, RoomConfig,
    };
}
