//! The session manager: tracks every player bound to a match.
//!
//! This is the central piece of the session layer. It's responsible for:
//! - Handing out player ids to new players
//! - Issuing a fresh token per player when a match starts
//! - Tracking which players have lost their connection
//! - Validating reconnection tokens and handing the new connection to the
//!   match waiting for it
//!
//! # Concurrency note
//!
//! `SessionManager` is NOT thread-safe by itself: it uses a plain
//! `HashMap`. The server wraps it in a `tokio::sync::Mutex` shared by the
//! lobby tasks and the match tasks. No method awaits, so the lock is only
//! ever held for a few map operations.

use std::collections::HashMap;
use std::time::Instant;

use broadside_protocol::{MatchId, PlayerId};
use rand::Rng;
use tokio::sync::oneshot;

use crate::{Session, SessionError, SessionState};

/// Manages all player sessions.
///
/// `C` is whatever the lobby hands to a waiting match on a successful
/// reconnection; the server uses its connection type.
///
/// ## Lifecycle
///
/// ```text
/// register_player() ──→ open() ──→ expect_reconnect() ──→ reconnect()
///                         │               │                    │
///                         ▼               ▼                    ▼
///                    [Connected]    [Disconnected]        [Connected]
///                         │          + waiting slot
///                         ▼
///                     release()  (match over)
/// ```
pub struct SessionManager<C> {
    /// The last player id handed out.
    last_player_id: u64,

    /// Sessions of players currently bound to a match.
    sessions: HashMap<PlayerId, Session>,

    /// One-shot hand-off channels for matches waiting on a reconnection.
    ///
    /// An entry exists only while a match is blocked in its reconnection
    /// wait for that player.
    waiting: HashMap<PlayerId, oneshot::Sender<C>>,
}

impl<C> SessionManager<C> {
    /// Creates a new, empty session manager.
    pub fn new() -> Self {
        Self {
            last_player_id: 0,
            sessions: HashMap::new(),
            waiting: HashMap::new(),
        }
    }

    /// Assigns the next player id. Ids start at 1 and never repeat.
    pub fn register_player(&mut self) -> PlayerId {
        self.last_player_id += 1;
        PlayerId(self.last_player_id)
    }

    /// Binds a player to a match and issues a fresh reconnection token.
    ///
    /// # Errors
    /// Returns [`SessionError::AlreadyConnected`] if the player already has
    /// a live session.
    pub fn open(
        &mut self,
        player_id: PlayerId,
        match_id: MatchId,
    ) -> Result<&Session, SessionError> {
        if let Some(existing) = self.sessions.get(&player_id) {
            if matches!(existing.state, SessionState::Connected) {
                return Err(SessionError::AlreadyConnected(player_id));
            }
        }
        self.waiting.remove(&player_id);

        let session = Session {
            player_id,
            match_id,
            state: SessionState::Connected,
            token: generate_token(),
        };
        tracing::info!(%player_id, %match_id, "session opened");

        Ok(self.sessions.entry(player_id).insert_entry(session).into_mut())
    }

    /// Marks a player as disconnected.
    ///
    /// # Errors
    /// Returns [`SessionError::NotFound`] if no session exists.
    pub fn disconnect(
        &mut self,
        player_id: PlayerId,
    ) -> Result<(), SessionError> {
        let session = self
            .sessions
            .get_mut(&player_id)
            .ok_or(SessionError::NotFound(player_id))?;

        session.state = SessionState::Disconnected {
            since: Instant::now(),
        };
        tracing::info!(%player_id, "player disconnected");
        Ok(())
    }

    /// Marks a player as disconnected and opens a slot through which a
    /// successful [`reconnect`](Self::reconnect) delivers the new
    /// connection.
    ///
    /// Any slot opened earlier for the same player is replaced.
    ///
    /// # Errors
    /// Returns [`SessionError::NotFound`] if no session exists.
    pub fn expect_reconnect(
        &mut self,
        player_id: PlayerId,
    ) -> Result<oneshot::Receiver<C>, SessionError> {
        self.disconnect(player_id)?;
        let (tx, rx) = oneshot::channel();
        self.waiting.insert(player_id, tx);
        Ok(rx)
    }

    /// Verifies a reconnection attempt.
    ///
    /// On success the session is live again and the caller gets the
    /// sender half of the waiting match's slot; sending the new connection
    /// through it resumes the match. If the send fails, the match gave up
    /// in the meantime and the connection should be turned away.
    ///
    /// # Errors
    /// - [`SessionError::NoSuchSession`]: unknown player, or still live
    /// - [`SessionError::WrongToken`]: token does not match
    /// - [`SessionError::PeerStillDisconnected`]: no match is waiting
    ///
    /// A failed attempt leaves the session untouched.
    pub fn reconnect(
        &mut self,
        player_id: PlayerId,
        token: &str,
    ) -> Result<oneshot::Sender<C>, SessionError> {
        let session = self
            .sessions
            .get_mut(&player_id)
            .ok_or(SessionError::NoSuchSession(player_id))?;

        if !session.is_disconnected() {
            return Err(SessionError::NoSuchSession(player_id));
        }
        if session.token != token {
            tracing::warn!(%player_id, "reconnection with wrong token");
            return Err(SessionError::WrongToken(player_id));
        }

        let slot = match self.waiting.remove(&player_id) {
            Some(slot) if !slot.is_closed() => slot,
            _ => return Err(SessionError::PeerStillDisconnected(player_id)),
        };

        session.state = SessionState::Connected;
        tracing::info!(%player_id, "player reconnected");
        Ok(slot)
    }

    /// Closes a player's reconnection slot after the match stopped
    /// waiting. The session stays disconnected.
    pub fn abandon(&mut self, player_id: PlayerId) {
        self.waiting.remove(&player_id);
        if let Some(session) = self.sessions.get_mut(&player_id) {
            if !session.is_disconnected() {
                session.state = SessionState::Disconnected {
                    since: Instant::now(),
                };
            }
        }
    }

    /// Removes a player's session when their match ends.
    pub fn release(&mut self, player_id: PlayerId) -> Option<Session> {
        self.waiting.remove(&player_id);
        let session = self.sessions.remove(&player_id);
        if session.is_some() {
            tracing::debug!(%player_id, "session released");
        }
        session
    }

    /// `true` if the player has a session whose connection is lost.
    pub fn is_disconnected(&self, player_id: PlayerId) -> bool {
        self.sessions
            .get(&player_id)
            .is_some_and(Session::is_disconnected)
    }

    /// Looks up a session by player ID.
    pub fn get(&self, player_id: &PlayerId) -> Option<&Session> {
        self.sessions.get(player_id)
    }

    /// Returns the number of sessions (any state).
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if there are no sessions.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl<C> Default for SessionManager<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Generates a random 32-character hex string (128 bits of entropy).
///
/// 128 bits is enough that guessing another player's token is
/// computationally infeasible.
fn generate_token() -> String {
    let mut rng = rand::rng();
    // `{:02x}` is lowercase hex, zero-padded to two digits.
    let bytes: [u8; 16] = rng.random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! Unit tests for `SessionManager`.
    //!
    //! Naming convention: `test_{function}_{scenario}_{expected}`.
    //!
    //! The hand-off type is a plain `&'static str` here; the server uses
    //! real connections, which the integration tests cover.

    use super::*;

    type Manager = SessionManager<&'static str>;

    fn pid(id: u64) -> PlayerId {
        PlayerId(id)
    }

    fn mid(id: u64) -> MatchId {
        MatchId(id)
    }

    /// A manager with players 1 and 2 registered into match 1.
    fn manager_with_match() -> (Manager, String, String) {
        let mut mgr = Manager::new();
        let p1 = mgr.register_player();
        let p2 = mgr.register_player();
        let t1 = mgr.open(p1, mid(1)).unwrap().token.clone();
        let t2 = mgr.open(p2, mid(1)).unwrap().token.clone();
        (mgr, t1, t2)
    }

    // =====================================================================
    // register_player()
    // =====================================================================

    #[test]
    fn test_register_player_ids_are_monotonic_from_one() {
        let mut mgr = Manager::new();
        assert_eq!(mgr.register_player(), pid(1));
        assert_eq!(mgr.register_player(), pid(2));
        assert_eq!(mgr.register_player(), pid(3));
        // Registering alone creates no session.
        assert!(mgr.is_empty());
    }

    // =====================================================================
    // open()
    // =====================================================================

    #[test]
    fn test_open_new_player_returns_connected_session() {
        let mut mgr = Manager::new();

        let session = mgr.open(pid(1), mid(4)).expect("should succeed");

        assert!(matches!(session.state, SessionState::Connected));
        assert_eq!(session.player_id, pid(1));
        assert_eq!(session.match_id, mid(4));
        assert_eq!(session.token.len(), 32);
        assert!(session.token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_open_each_player_gets_unique_token() {
        let (_, t1, t2) = manager_with_match();
        assert_ne!(t1, t2, "tokens must be unique per player");
    }

    #[test]
    fn test_open_already_connected_returns_error() {
        let mut mgr = Manager::new();
        mgr.open(pid(1), mid(1)).unwrap();

        let result = mgr.open(pid(1), mid(2));

        assert!(
            matches!(result, Err(SessionError::AlreadyConnected(p)) if p == pid(1))
        );
    }

    #[test]
    fn test_open_after_release_issues_fresh_token() {
        let mut mgr = Manager::new();
        let first = mgr.open(pid(1), mid(1)).unwrap().token.clone();
        mgr.release(pid(1));

        let second = mgr.open(pid(1), mid(2)).unwrap().token.clone();

        assert_ne!(first, second, "tokens are per match");
    }

    // =====================================================================
    // disconnect() / expect_reconnect()
    // =====================================================================

    #[test]
    fn test_disconnect_unknown_player_returns_not_found() {
        let mut mgr = Manager::new();

        let result = mgr.disconnect(pid(99));

        assert!(matches!(result, Err(SessionError::NotFound(p)) if p == pid(99)));
    }

    #[test]
    fn test_disconnect_preserves_token() {
        let (mut mgr, t1, _) = manager_with_match();

        mgr.disconnect(pid(1)).unwrap();

        let session = mgr.get(&pid(1)).unwrap();
        assert!(session.is_disconnected());
        assert_eq!(session.token, t1, "token survives a disconnect");
    }

    #[test]
    fn test_expect_reconnect_unknown_player_returns_not_found() {
        let mut mgr = Manager::new();
        assert!(matches!(
            mgr.expect_reconnect(pid(5)),
            Err(SessionError::NotFound(_))
        ));
    }

    #[test]
    fn test_expect_reconnect_marks_player_disconnected() {
        let (mut mgr, _, _) = manager_with_match();

        let _rx = mgr.expect_reconnect(pid(2)).unwrap();

        assert!(mgr.is_disconnected(pid(2)));
        assert!(!mgr.is_disconnected(pid(1)));
    }

    // =====================================================================
    // reconnect()
    // =====================================================================

    #[tokio::test]
    async fn test_reconnect_right_token_hands_off_to_waiting_match() {
        let (mut mgr, t1, _) = manager_with_match();
        let rx = mgr.expect_reconnect(pid(1)).unwrap();

        let slot = mgr.reconnect(pid(1), &t1).expect("should succeed");
        slot.send("new connection").unwrap();

        assert_eq!(rx.await.unwrap(), "new connection");
        assert!(!mgr.is_disconnected(pid(1)));
    }

    #[test]
    fn test_reconnect_wrong_token_leaves_session_untouched() {
        let (mut mgr, t1, t2) = manager_with_match();
        let _rx = mgr.expect_reconnect(pid(1)).unwrap();

        // Player 2's token is a real token, just not player 1's.
        let result = mgr.reconnect(pid(1), &t2);

        assert!(matches!(result, Err(SessionError::WrongToken(p)) if p == pid(1)));
        assert!(mgr.is_disconnected(pid(1)));
        // The right token still works afterwards.
        assert!(mgr.reconnect(pid(1), &t1).is_ok());
    }

    #[test]
    fn test_reconnect_unknown_player_returns_no_such_session() {
        let mut mgr = Manager::new();
        assert!(matches!(
            mgr.reconnect(pid(3), "whatever"),
            Err(SessionError::NoSuchSession(_))
        ));
    }

    #[test]
    fn test_reconnect_live_player_returns_no_such_session() {
        let (mut mgr, t1, _) = manager_with_match();

        let result = mgr.reconnect(pid(1), &t1);

        assert!(matches!(result, Err(SessionError::NoSuchSession(_))));
    }

    #[test]
    fn test_reconnect_without_waiting_match_returns_peer_still_disconnected() {
        let (mut mgr, t1, _) = manager_with_match();
        mgr.disconnect(pid(1)).unwrap();

        let result = mgr.reconnect(pid(1), &t1);

        assert!(matches!(
            result,
            Err(SessionError::PeerStillDisconnected(_))
        ));
        assert!(mgr.is_disconnected(pid(1)));
    }

    #[test]
    fn test_reconnect_after_match_stopped_waiting_is_denied() {
        let (mut mgr, t1, _) = manager_with_match();
        let rx = mgr.expect_reconnect(pid(1)).unwrap();
        // The match's wait future was dropped (timed out).
        drop(rx);

        let result = mgr.reconnect(pid(1), &t1);

        assert!(matches!(
            result,
            Err(SessionError::PeerStillDisconnected(_))
        ));
    }

    #[test]
    fn test_reconnect_only_one_of_two_attempts_gets_the_slot() {
        let (mut mgr, t1, _) = manager_with_match();
        let _rx = mgr.expect_reconnect(pid(1)).unwrap();

        assert!(mgr.reconnect(pid(1), &t1).is_ok());
        assert!(matches!(
            mgr.reconnect(pid(1), &t1),
            Err(SessionError::NoSuchSession(_))
        ));
    }

    // =====================================================================
    // abandon() / release()
    // =====================================================================

    #[test]
    fn test_abandon_closes_slot_and_keeps_disconnected() {
        let (mut mgr, t1, _) = manager_with_match();
        let _rx = mgr.expect_reconnect(pid(1)).unwrap();

        mgr.abandon(pid(1));

        assert!(mgr.is_disconnected(pid(1)));
        assert!(matches!(
            mgr.reconnect(pid(1), &t1),
            Err(SessionError::PeerStillDisconnected(_))
        ));
    }

    #[test]
    fn test_release_removes_session() {
        let (mut mgr, _, _) = manager_with_match();

        let released = mgr.release(pid(1)).expect("had a session");

        assert_eq!(released.player_id, pid(1));
        assert!(mgr.get(&pid(1)).is_none());
        assert_eq!(mgr.len(), 1);
        assert!(mgr.release(pid(1)).is_none());
    }
}
