//! Wire protocol for Planeboard.
//!
//! - **Types** ([`BoardCard`], [`Deck`], [`Seat`], ...) — the board data
//!   shared between server and table clients.
//! - **Messages** ([`ClientMessage`], [`ServerMessage`]) — one closed enum
//!   per direction, tagged by the frame's `type` field.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how messages become
//!   frame bytes.
//!
//! ```text
//! Transport (frames) → Protocol (ClientMessage) → Room (board rules)
//! ```

mod codec;
mod error;
mod message;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use message::{
    BoardSnapshot, CardTransfer, ClientMessage, DeckInsertion, ServerMessage,
};
pub use types::{
    BoardCard, Card, CardSource, Counter, Deck, DiceRoller, RoomId, Seat,
};
