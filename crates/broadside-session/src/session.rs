//! Session types: the server's record of a player in a match.
//!
//! A session tracks:
//! - WHO the player is (`PlayerId`)
//! - WHICH match they are playing (`MatchId`)
//! - WHAT state their connection is in (live or lost)
//! - HOW they prove who they are when they come back (a secret token)

use std::time::Instant;

use broadside_protocol::{MatchId, PlayerId};

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// The current state of a player's connection.
///
/// ```text
///   Connected ──(disconnect)──→ Disconnected
///       ↑                            │
///       └────────(reconnect)─────────┘
/// ```
///
/// A session that is never resumed is removed outright when its match
/// ends, so there is no separate "expired" state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// The player's connection is live.
    Connected,

    /// The connection was lost at the given instant.
    Disconnected { since: Instant },
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A single player's session, from pairing until their match ends.
#[derive(Debug, Clone)]
pub struct Session {
    /// Which player this session belongs to.
    pub player_id: PlayerId,

    /// The match the player is bound to.
    pub match_id: MatchId,

    /// Current connection state.
    pub state: SessionState,

    /// The secret the player must present to resume after a disconnect.
    ///
    /// Generated fresh for every match and sent to the player when the
    /// match starts. A 32-character hex string (128 bits of randomness).
    pub token: String,
}

impl Session {
    /// `true` while the connection is lost.
    pub fn is_disconnected(&self) -> bool {
        matches!(self.state, SessionState::Disconnected { .. })
    }
}
