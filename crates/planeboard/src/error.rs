//! Unified error type for the Planeboard server.

use planeboard_protocol::ProtocolError;
use planeboard_room::RoomError;
use planeboard_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum PlaneboardError {
    /// A transport-level error (accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room-level error (the room retired underneath us).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// The HTTP client for deck lookups could not be built.
    #[error("http client: {0}")]
    Http(#[from] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let planeboard_err: PlaneboardError = err.into();
        assert!(matches!(planeboard_err, PlaneboardError::Transport(_)));
        assert!(planeboard_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = serde_json::from_str::<u8>("x").unwrap_err();
        let planeboard_err: PlaneboardError = ProtocolError::Decode(err).into();
        assert!(matches!(planeboard_err, PlaneboardError::Protocol(_)));
    }

    #[test]
    fn test_from_room_error() {
        let err = RoomError::Unavailable("R1".into());
        let planeboard_err: PlaneboardError = err.into();
        assert!(matches!(planeboard_err, PlaneboardError::Room(_)));
        assert_eq!(planeboard_err.to_string(), "room R1 is unavailable");
    }
}
