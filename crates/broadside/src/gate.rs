//! Reconnection hand-off between the lobby and running matches.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use broadside_match::Reconnector;
use broadside_protocol::PlayerId;
use broadside_session::SessionManager;
use broadside_transport::Connection;
use tokio::sync::Mutex;

/// Shared session index, guarded for the lobby and every match task.
pub type SharedSessions = Arc<Mutex<SessionManager<Connection>>>;

/// The [`Reconnector`] matches use: opens a slot in the session index and
/// waits for the lobby to fill it after a token check.
#[derive(Clone)]
pub struct SessionGate {
    sessions: SharedSessions,
}

impl SessionGate {
    pub fn new(sessions: SharedSessions) -> Self {
        Self { sessions }
    }
}

#[async_trait]
impl Reconnector for SessionGate {
    async fn await_reconnect(&self, player: PlayerId, wait: Duration) -> Option<Connection> {
        let slot = self.sessions.lock().await.expect_reconnect(player);
        let mut slot = match slot {
            Ok(slot) => slot,
            Err(e) => {
                tracing::warn!(player_id = %player, error = %e, "cannot wait for reconnection");
                return None;
            }
        };

        match tokio::time::timeout(wait, &mut slot).await {
            Ok(Ok(conn)) => Some(conn),
            Ok(Err(_)) => None,
            Err(_) => {
                // A connection delivered right at the deadline still counts.
                slot.close();
                if let Ok(conn) = slot.try_recv() {
                    return Some(conn);
                }
                self.sessions.lock().await.abandon(player);
                None
            }
        }
    }

    async fn release(&self, players: &[PlayerId]) {
        let mut sessions = self.sessions.lock().await;
        for player in players {
            sessions.release(*player);
        }
    }
}
