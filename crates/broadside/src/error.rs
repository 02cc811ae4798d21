//! Unified error type for Broadside.

use broadside_board::BoardError;
use broadside_match::{MatchError, StoreError};
use broadside_protocol::ProtocolError;
use broadside_session::SessionError;
use broadside_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates the `From` impls,
/// so `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum BroadsideError {
    /// A transport-level error (bind, accept, send).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A frame could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session lookup or reconnection check failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A match could not be set up.
    #[error(transparent)]
    Match(#[from] MatchError),

    /// The snapshot store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Board(#[from] BoardError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use broadside_protocol::PlayerId;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let broadside_err: BroadsideError = err.into();
        assert!(matches!(broadside_err, BroadsideError::Transport(_)));
        assert!(broadside_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::Malformed("short".into());
        let broadside_err: BroadsideError = err.into();
        assert!(matches!(broadside_err, BroadsideError::Protocol(_)));
    }

    #[test]
    fn test_from_session_error() {
        let err = SessionError::WrongToken(PlayerId(3));
        let broadside_err: BroadsideError = err.into();
        assert!(matches!(broadside_err, BroadsideError::Session(_)));
        assert_eq!(broadside_err.to_string(), "wrong session token for player P-3");
    }

    #[test]
    fn test_from_match_error() {
        let err = MatchError::InvalidConfig("fleet is empty".into());
        let broadside_err: BroadsideError = err.into();
        assert!(matches!(broadside_err, BroadsideError::Match(_)));
    }

    #[test]
    fn test_from_store_error() {
        let err = StoreError::Io(std::io::Error::other("disk full"));
        let broadside_err: BroadsideError = err.into();
        assert!(matches!(broadside_err, BroadsideError::Store(_)));
        assert!(broadside_err.to_string().contains("disk full"));
    }
}
