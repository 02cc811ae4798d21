//! Error types for the session layer.

use broadside_protocol::PlayerId;

/// Errors that can occur during session management.
///
/// The first three are the reasons a reconnection attempt is denied. In
/// every case the existing session is left exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The token doesn't match the one issued for this player's match.
    #[error("wrong session token for player {0}")]
    WrongToken(PlayerId),

    /// The player has no session, or has one whose connection is still
    /// live. Either way there is nothing to resume.
    #[error("no disconnected session for player {0}")]
    NoSuchSession(PlayerId),

    /// The player is disconnected, but their match is not (or no longer)
    /// waiting for a replacement connection.
    #[error("match for player {0} is not waiting for a reconnection")]
    PeerStillDisconnected(PlayerId),

    /// The player already has a live session.
    /// A player can only be bound to one connection at a time.
    #[error("player {0} already has an active session")]
    AlreadyConnected(PlayerId),

    /// No session exists for the given player.
    #[error("session not found for player {0}")]
    NotFound(PlayerId),
}
