//! Error types for the room layer.

use planeboard_protocol::RoomId;

/// Errors that can occur when talking to a room.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room's actor has retired or its command queue is closed.
    /// Callers holding a stale handle should ask the directory again.
    #[error("room {0} is unavailable")]
    Unavailable(RoomId),
}

/// Why a deck URL could not be turned into cards.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeckError {
    /// The URL does not point at a deck this resolver understands.
    #[error("invalid deck url: {0}")]
    InvalidUrl(String),

    /// The deck service could not be reached.
    #[error("deck fetch failed: {0}")]
    Fetch(String),

    /// The deck service answered with a non-success status.
    #[error("deck service returned status {0}")]
    Status(u16),

    /// The deck service answered with something that is not a deck.
    #[error("malformed deck response: {0}")]
    Parse(String),
}
