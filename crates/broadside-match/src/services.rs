//! Capabilities a match needs from the server around it.
//!
//! The engine never touches the lobby, the spectator set or the session
//! index directly; the server implements these traits and passes them in
//! as [`MatchServices`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use broadside_protocol::PlayerId;
use broadside_transport::Connection;

use crate::SnapshotStore;

/// Fan-out to everyone watching.
#[async_trait]
pub trait Broadcaster: Send + Sync + 'static {
    /// Sends `message` to every spectator, followed by the two boards'
    /// renderings when given. Never blocks longer than one bounded send per
    /// spectator.
    async fn notify(&self, message: &str, boards: Option<(String, String)>);
}

/// Hand-over of replacement connections for dropped players.
#[async_trait]
pub trait Reconnector: Send + Sync + 'static {
    /// Marks `player` disconnected and waits up to `wait` for the lobby to
    /// deliver a connection that presented the right token.
    async fn await_reconnect(
        &self,
        player: PlayerId,
        wait: Duration,
    ) -> Option<Connection>;

    /// Removes the players from the active-session index.
    async fn release(&self, players: &[PlayerId]);
}

/// The capabilities bundled for [`Match::new`](crate::Match::new).
#[derive(Clone)]
pub struct MatchServices {
    pub broadcaster: Arc<dyn Broadcaster>,
    pub reconnector: Arc<dyn Reconnector>,
    pub store: Arc<dyn SnapshotStore>,
}

impl std::fmt::Debug for MatchServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchServices").finish_non_exhaustive()
    }
}
