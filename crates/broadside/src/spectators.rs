//! The spectator set and the broadcast service built on it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use broadside_match::Broadcaster;
use broadside_protocol::FrameType;
use broadside_transport::{Connection, ConnectionId, Received};
use tokio::sync::Mutex;
use tokio::task::JoinSet;

/// One spectator, and whether a seat offer is out to them.
#[derive(Debug)]
struct Watcher {
    conn: Arc<Connection>,
    offered: bool,
}

/// Everyone currently watching.
///
/// Every mutation and every broadcast happens under the one lock. Each
/// send is bounded by the connection's send timeout, and a spectator whose
/// send fails is dropped from the set and closed.
///
/// A spectator who is being offered a seat stays in the set and keeps
/// receiving broadcasts until they say yes.
#[derive(Debug, Default)]
pub struct SpectatorSet {
    watchers: Mutex<Vec<Watcher>>,
}

impl SpectatorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a spectator and returns how many are now watching.
    pub async fn add(&self, conn: Connection) -> usize {
        let mut watchers = self.watchers.lock().await;
        tracing::info!(conn_id = %conn.id(), peer = %conn.peer(), "spectator joined");
        watchers.push(Watcher {
            conn: Arc::new(conn),
            offered: false,
        });
        watchers.len()
    }

    pub async fn len(&self) -> usize {
        self.watchers.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.watchers.lock().await.is_empty()
    }

    /// Sends `frames` in order to every spectator, pruning the ones that
    /// fail.
    pub async fn broadcast(&self, frames: &[(FrameType, &str)]) {
        let mut watchers = self.watchers.lock().await;
        let mut dead: Vec<ConnectionId> = Vec::new();

        for watcher in watchers.iter() {
            for (kind, text) in frames {
                if let Err(e) = watcher.conn.send_frame(*kind, text).await {
                    tracing::debug!(conn_id = %watcher.conn.id(), error = %e, "dropping spectator");
                    dead.push(watcher.conn.id());
                    break;
                }
            }
        }

        if !dead.is_empty() {
            let (gone, kept): (Vec<_>, Vec<_>) = watchers
                .drain(..)
                .partition(|w| dead.contains(&w.conn.id()));
            *watchers = kept;
            drop(watchers);
            for watcher in gone {
                watcher.conn.close().await;
            }
        }
    }

    /// Marks every spectator without an open offer as offered and returns
    /// them. They stay in the set. Settle the offer with
    /// [`end_offer`](Self::end_offer).
    pub(crate) async fn begin_offer(&self) -> Vec<Arc<Connection>> {
        let mut watchers = self.watchers.lock().await;
        watchers
            .iter_mut()
            .filter(|w| !w.offered)
            .map(|w| {
                w.offered = true;
                Arc::clone(&w.conn)
            })
            .collect()
    }

    /// Settles an offer: volunteers leave the set and are returned in the
    /// order given, everyone else keeps watching.
    ///
    /// Spectators pruned while the offer was open are not returned.
    pub(crate) async fn end_offer(
        &self,
        answers: Vec<(Arc<Connection>, bool)>,
    ) -> Vec<Connection> {
        let asked: Vec<ConnectionId> = answers.iter().map(|(conn, _)| conn.id()).collect();
        let volunteers: Vec<ConnectionId> = answers
            .iter()
            .filter(|(_, yes)| *yes)
            .map(|(conn, _)| conn.id())
            .collect();

        let removed: Vec<Watcher> = {
            let mut watchers = self.watchers.lock().await;
            for watcher in watchers.iter_mut() {
                if asked.contains(&watcher.conn.id()) {
                    watcher.offered = false;
                }
            }
            let (removed, kept): (Vec<_>, Vec<_>) = watchers
                .drain(..)
                .partition(|w| volunteers.contains(&w.conn.id()));
            *watchers = kept;
            removed
        };
        let still_here: Vec<ConnectionId> = removed.iter().map(|w| w.conn.id()).collect();
        drop(removed);

        let mut joined = Vec::new();
        for (conn, yes) in answers {
            if !yes || !still_here.contains(&conn.id()) {
                continue;
            }
            match Arc::try_unwrap(conn) {
                Ok(conn) => joined.push(conn),
                Err(conn) => {
                    tracing::warn!(conn_id = %conn.id(), "volunteer still shared, closing");
                    conn.close().await;
                }
            }
        }
        joined
    }

    /// Says goodbye to every spectator and closes them.
    pub async fn close_all(&self, message: &str) {
        let watchers = std::mem::take(&mut *self.watchers.lock().await);
        for watcher in watchers {
            let _ = watcher.conn.send_frame(FrameType::System, message).await;
            watcher.conn.close().await;
        }
    }
}

#[async_trait]
impl Broadcaster for SpectatorSet {
    async fn notify(&self, message: &str, boards: Option<(String, String)>) {
        match boards {
            Some((first, second)) => {
                self.broadcast(&[
                    (FrameType::Spectator, message),
                    (FrameType::BoardUpdate, &first),
                    (FrameType::BoardUpdate, &second),
                ])
                .await
            }
            None => self.broadcast(&[(FrameType::Spectator, message)]).await,
        }
    }
}

/// Asks each connection `question` at once and waits up to `wait` for the
/// answers. Returns every connection with whether it said yes, in the
/// order given.
pub(crate) async fn ask_all(
    conns: Vec<Arc<Connection>>,
    question: &str,
    wait: Duration,
) -> Vec<(Arc<Connection>, bool)> {
    let mut asks = JoinSet::new();
    for (index, conn) in conns.into_iter().enumerate() {
        let question = question.to_string();
        asks.spawn(async move {
            let yes = ask_yes_no(&conn, &question, wait).await;
            (index, conn, yes)
        });
    }

    let mut answers = Vec::new();
    while let Some(joined) = asks.join_next().await {
        match joined {
            Ok(answer) => answers.push(answer),
            Err(e) => tracing::warn!(error = %e, "recruitment prompt task failed"),
        }
    }
    answers.sort_by_key(|(index, _, _)| *index);
    answers
        .into_iter()
        .map(|(_, conn, yes)| (conn, yes))
        .collect()
}

async fn ask_yes_no(conn: &Connection, question: &str, wait: Duration) -> bool {
    if conn.send_frame(FrameType::Prompt, question).await.is_err() {
        return false;
    }
    match conn.recv_frame(wait).await {
        Received::Frame(frame) => {
            matches!(frame.text().trim().to_ascii_lowercase().as_str(), "y" | "yes")
        }
        _ => false,
    }
}
