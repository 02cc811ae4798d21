//! The pairing queue and the task that turns pairs into matches.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use broadside_match::{FinishReason, ForfeitCause, Match, MatchOutcome, MatchServices, Seat};
use broadside_protocol::{FrameType, MatchId, PlayerId};
use broadside_transport::Connection;
use tokio::sync::{mpsc, watch};

use crate::rematch::{REMATCH_DECLINED, offer_rematch};
use crate::server::{SHUTDOWN_MESSAGE, ServerState};
use crate::spectators::ask_all;

/// Counter for generating unique match IDs.
static NEXT_MATCH_ID: AtomicU64 = AtomicU64::new(1);

/// Offered to every spectator when a match ends.
pub const RECRUIT_PROMPT: &str = "Do you want to play the next game? (y/n):";

/// A player waiting for an opponent.
#[derive(Debug)]
pub(crate) struct Queued {
    pub(crate) player_id: PlayerId,
    pub(crate) conn: Connection,
}

/// FIFO of waiting players. The two oldest entries are always paired next.
#[derive(Debug, Clone)]
pub(crate) struct PairingQueue {
    tx: mpsc::UnboundedSender<Queued>,
}

impl PairingQueue {
    pub(crate) fn channel() -> (Self, mpsc::UnboundedReceiver<Queued>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Enqueues a player. Fails, handing the entry back, once the pairing
    /// task has stopped.
    pub(crate) fn push(&self, player_id: PlayerId, conn: Connection) -> Result<(), Queued> {
        self.tx
            .send(Queued { player_id, conn })
            .map_err(|e| e.0)
    }
}

/// Pairs queued players until shutdown, then turns away whoever is left.
pub(crate) async fn run_pairing(
    mut rx: mpsc::UnboundedReceiver<Queued>,
    state: Arc<ServerState>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut waiting: Option<Queued> = None;

    loop {
        if *shutdown.borrow() {
            break;
        }
        let next = tokio::select! {
            next = rx.recv() => next,
            _ = shutdown.changed() => None,
        };
        let Some(next) = next else { break };

        match waiting.take() {
            None => {
                tracing::debug!(player_id = %next.player_id, "waiting for an opponent");
                waiting = Some(next);
            }
            Some(first) => start_match(first, next, &state).await,
        }
    }

    rx.close();
    let mut left: Vec<Queued> = waiting.into_iter().collect();
    while let Ok(queued) = rx.try_recv() {
        left.push(queued);
    }
    for queued in left {
        let _ = queued.conn.send_frame(FrameType::System, SHUTDOWN_MESSAGE).await;
        queued.conn.close().await;
    }
    tracing::info!("pairing stopped");
}

/// Opens a match for a pair and hosts it in its own task.
async fn start_match(first: Queued, second: Queued, state: &Arc<ServerState>) {
    if let Some(game) = open_match(first, second, state).await {
        tokio::spawn(host_matches(game, Arc::clone(state)));
    }
}

/// Opens sessions for a pair, tells them their tokens, and builds the
/// match. `None` if the match could not be set up; both players are then
/// closed.
async fn open_match(first: Queued, second: Queued, state: &ServerState) -> Option<Match> {
    let match_id = MatchId(NEXT_MATCH_ID.fetch_add(1, Ordering::Relaxed));

    let tokens = {
        let mut sessions = state.sessions.lock().await;
        let first_token = sessions
            .open(first.player_id, match_id)
            .map(|s| s.token.clone());
        let second_token = sessions
            .open(second.player_id, match_id)
            .map(|s| s.token.clone());
        match (first_token, second_token) {
            (Ok(a), Ok(b)) => Ok([a, b]),
            (Err(e), _) | (_, Err(e)) => {
                sessions.release(first.player_id);
                sessions.release(second.player_id);
                Err(e)
            }
        }
    };
    let tokens = match tokens {
        Ok(tokens) => tokens,
        Err(e) => {
            tracing::error!(%match_id, error = %e, "could not open sessions");
            for queued in [first, second] {
                queued.conn.close().await;
            }
            return None;
        }
    };

    for (index, (queued, token)) in [&first, &second].into_iter().zip(&tokens).enumerate() {
        let greeting = format!(
            "Game is starting! You are Player {}. Your user ID is {} and your session token is {token}. \
             Use them to reconnect if you get disconnected.",
            index + 1,
            queued.player_id.0,
        );
        if let Err(e) = queued.conn.send_frame(FrameType::System, &greeting).await {
            // The engine notices the dead link on its first read.
            tracing::debug!(
                %match_id,
                player_id = %queued.player_id,
                error = %e,
                "greeting not sent"
            );
        }
    }
    state
        .spectators
        .broadcast(&[(
            FrameType::Spectator,
            &format!(
                "Game is starting! Player 1 (ID {}) and Player 2 (ID {}) are ready to play.",
                first.player_id.0, second.player_id.0
            ),
        )])
        .await;

    let services = MatchServices {
        broadcaster: state.spectators.clone(),
        reconnector: state.gate.clone(),
        store: state.store.clone(),
    };
    let game = Match::new(
        match_id,
        state.config.match_config.clone(),
        [
            (first.player_id, first.conn),
            (second.player_id, second.conn),
        ],
        services,
    );
    match game {
        Ok(game) => Some(game),
        Err(e) => {
            tracing::error!(%match_id, error = %e, "could not create match");
            let mut sessions = state.sessions.lock().await;
            sessions.release(first.player_id);
            sessions.release(second.player_id);
            None
        }
    }
}

/// Plays matches between the same pair for as long as both keep saying
/// yes to a rematch.
async fn host_matches(mut game: Match, state: Arc<ServerState>) {
    loop {
        let match_id = game.match_id();
        let outcome = game.play().await;
        tracing::debug!(%match_id, reason = %outcome.reason, "match task done");

        if state.config.lobby.recruit_spectators && !state.is_shutting_down() {
            let state = Arc::clone(&state);
            tokio::spawn(async move { recruit_spectators(&state).await });
        }

        let Some([first, second]) = after_match(outcome, &state).await else {
            return;
        };
        match open_match(first, second, &state).await {
            Some(next) => game = next,
            None => return,
        }
    }
}

/// Decides what happens to both players once a match is over. Returns the
/// pair if they play again.
///
/// A player who quit or dropped out is closed and the one left behind goes
/// back to the queue. If both are still here they are asked for a rematch.
async fn after_match(outcome: MatchOutcome, state: &ServerState) -> Option<[Queued; 2]> {
    let MatchOutcome { reason, players } = outcome;
    let [(first_id, first), (second_id, second)] = players;
    let mut seats = [
        Queued {
            player_id: first_id,
            conn: first,
        },
        Queued {
            player_id: second_id,
            conn: second,
        },
    ];

    if state.is_shutting_down() {
        for queued in &seats {
            let _ = queued.conn.send_frame(FrameType::System, SHUTDOWN_MESSAGE).await;
            queued.conn.close().await;
        }
        return None;
    }

    let leaver = match reason {
        FinishReason::Quit(seat)
        | FinishReason::Forfeit {
            seat,
            cause: ForfeitCause::Abandoned | ForfeitCause::FailedReconnect,
        } => Some(seat),
        FinishReason::Win(_)
        | FinishReason::Forfeit {
            cause: ForfeitCause::Inactivity,
            ..
        } => None,
    };

    if let Some(seat) = leaver {
        if seat == Seat::One {
            seats.swap(0, 1);
        }
        let [survivor, gone] = seats;
        gone.conn.close().await;
        requeue(survivor, state).await;
        return None;
    }

    let lobby = &state.config.lobby;
    let again = lobby.rematch
        && offer_rematch([&seats[0].conn, &seats[1].conn], lobby.rematch_timeout).await;
    if again {
        tracing::info!(
            player_one = %seats[0].player_id,
            player_two = %seats[1].player_id,
            "rematch agreed"
        );
        return Some(seats);
    }

    for queued in &seats {
        if lobby.rematch {
            let _ = queued.conn.send_frame(FrameType::System, REMATCH_DECLINED).await;
        }
        queued.conn.close().await;
    }
    None
}

/// Puts a player back in the queue under their existing id.
async fn requeue(queued: Queued, state: &ServerState) {
    let Queued { player_id, conn } = queued;
    tracing::info!(%player_id, "opponent left, back to the queue");
    if let Err(e) = conn
        .send_frame(FrameType::System, &crate::lobby::queued_message(player_id))
        .await
    {
        tracing::debug!(%player_id, error = %e, "requeue notice not sent");
        conn.close().await;
        return;
    }
    if let Err(rejected) = state.queue.push(player_id, conn) {
        let _ = rejected
            .conn
            .send_frame(FrameType::System, SHUTDOWN_MESSAGE)
            .await;
        rejected.conn.close().await;
    }
}

/// Offers every spectator a seat in the next game.
///
/// Spectators keep watching while they think it over. Volunteers then
/// leave the spectator set, get fresh player ids, and join the queue
/// oldest first.
pub(crate) async fn recruit_spectators(state: &ServerState) {
    let offered = state.spectators.begin_offer().await;
    if offered.is_empty() {
        return;
    }

    let answers = ask_all(offered, RECRUIT_PROMPT, state.config.lobby.recruit_timeout).await;

    for conn in state.spectators.end_offer(answers).await {
        let player_id = state.sessions.lock().await.register_player();
        tracing::info!(%player_id, conn_id = %conn.id(), "spectator joins the queue");
        let _ = conn
            .send_frame(FrameType::System, &crate::lobby::queued_message(player_id))
            .await;
        if let Err(rejected) = state.queue.push(player_id, conn) {
            rejected.conn.close().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use broadside_protocol::FrameCodec;

    fn conn() -> Connection {
        let (server, _client) = tokio::io::duplex(64);
        Connection::from_stream(server, FrameCodec::default(), "queued")
    }

    #[tokio::test]
    async fn test_pairing_queue_is_fifo() {
        let (queue, mut rx) = PairingQueue::channel();
        queue.push(PlayerId(1), conn()).unwrap();
        queue.push(PlayerId(2), conn()).unwrap();
        queue.push(PlayerId(3), conn()).unwrap();

        let order: Vec<_> = [
            rx.recv().await.unwrap(),
            rx.recv().await.unwrap(),
            rx.recv().await.unwrap(),
        ]
        .iter()
        .map(|q| q.player_id)
        .collect();
        assert_eq!(order, vec![PlayerId(1), PlayerId(2), PlayerId(3)]);
    }

    #[tokio::test]
    async fn test_pairing_queue_push_after_close_hands_back() {
        let (queue, mut rx) = PairingQueue::channel();
        rx.close();
        let rejected = queue.push(PlayerId(8), conn()).unwrap_err();
        assert_eq!(rejected.player_id, PlayerId(8));
    }
}
