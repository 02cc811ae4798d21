//! Per-connection classification: new player, returning player, or
//! spectator.
//!
//! Every accepted connection runs through [`classify`] in its own task, so
//! a slow client never holds up the accept loop.

use std::sync::Arc;
use std::time::Duration;

use broadside_protocol::{FrameType, PlayerId};
use broadside_transport::{Connection, Received};
use tokio::time::Instant;

use crate::BroadsideError;
use crate::server::ServerState;

pub const WELCOME_PROMPT: &str = "Welcome! Are you a new player, reconnecting, or a spectator? \
     (Type 'new', your user ID, or 'spectator'):";
pub const TOKEN_PROMPT: &str = "Please enter your session token to reconnect:";
pub const INVALID_CHOICE: &str =
    "Invalid input. Please type 'new', your user ID, or 'spectator'.";
pub const SPECTATING_MESSAGE: &str =
    "You are now spectating. You will receive updates about ongoing games.";

/// What a connection said it is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Choice {
    NewPlayer,
    Returning(PlayerId),
    Spectator,
    Invalid,
}

impl Choice {
    pub(crate) fn parse(answer: &str) -> Self {
        let answer = answer.trim().to_ascii_lowercase();
        match answer.as_str() {
            "new" | "n" => Self::NewPlayer,
            "spectator" | "s" => Self::Spectator,
            digits if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => {
                match digits.parse() {
                    Ok(id) => Self::Returning(PlayerId(id)),
                    Err(_) => Self::Invalid,
                }
            }
            _ => Self::Invalid,
        }
    }
}

/// The acknowledgement a player gets on joining the queue.
pub(crate) fn queued_message(player_id: PlayerId) -> String {
    format!(
        "Welcome, Player {}! You are in the queue. Waiting for another player...",
        player_id.0
    )
}

/// Classifies one connection and routes it.
pub(crate) async fn classify(
    conn: Connection,
    state: Arc<ServerState>,
) -> Result<(), BroadsideError> {
    let conn_id = conn.id();
    tracing::debug!(%conn_id, peer = %conn.peer(), "classifying connection");

    conn.send_frame(FrameType::System, WELCOME_PROMPT).await?;
    let Some(answer) = read_answer(&conn, state.config.lobby.classify_timeout).await else {
        tracing::debug!(%conn_id, "no answer to welcome prompt");
        conn.close().await;
        return Ok(());
    };

    match Choice::parse(&answer) {
        Choice::NewPlayer => admit_player(conn, &state).await,
        Choice::Returning(player_id) => resume_player(conn, player_id, &state).await,
        Choice::Spectator => admit_spectator(conn, &state).await,
        Choice::Invalid => {
            conn.send_frame(FrameType::System, INVALID_CHOICE).await?;
            conn.close().await;
            Ok(())
        }
    }
}

async fn admit_player(conn: Connection, state: &ServerState) -> Result<(), BroadsideError> {
    let player_id = state.sessions.lock().await.register_player();
    tracing::info!(%player_id, conn_id = %conn.id(), "player queued");
    conn.send_frame(FrameType::System, &queued_message(player_id))
        .await?;

    if let Err(rejected) = state.queue.push(player_id, conn) {
        let _ = rejected
            .conn
            .send_frame(FrameType::System, crate::server::SHUTDOWN_MESSAGE)
            .await;
        rejected.conn.close().await;
    }
    Ok(())
}

async fn admit_spectator(conn: Connection, state: &ServerState) -> Result<(), BroadsideError> {
    if state.is_shutting_down() {
        let result = conn
            .send_frame(FrameType::System, crate::server::SHUTDOWN_MESSAGE)
            .await;
        conn.close().await;
        return Ok(result?);
    }
    conn.send_frame(FrameType::System, SPECTATING_MESSAGE).await?;
    state.spectators.add(conn).await;
    state
        .spectators
        .broadcast(&[(FrameType::Spectator, "A new spectator has joined.")])
        .await;
    Ok(())
}

/// Checks a returning player's token and hands the connection to the
/// match waiting for them.
async fn resume_player(
    conn: Connection,
    player_id: PlayerId,
    state: &ServerState,
) -> Result<(), BroadsideError> {
    conn.send_frame(FrameType::Prompt, TOKEN_PROMPT).await?;
    let Some(token) = read_answer(&conn, state.config.lobby.classify_timeout).await else {
        conn.close().await;
        return Ok(());
    };

    let checked = state.sessions.lock().await.reconnect(player_id, &token);
    let slot = match checked {
        Ok(slot) => slot,
        Err(e) => {
            tracing::warn!(%player_id, reason = %e, "reconnection denied");
            return deny(conn, &e.to_string()).await;
        }
    };

    match slot.send(conn) {
        Ok(()) => {
            tracing::info!(%player_id, "connection handed to match");
            Ok(())
        }
        Err(conn) => {
            state.sessions.lock().await.abandon(player_id);
            tracing::warn!(%player_id, "match stopped waiting before hand-off");
            deny(conn, "the match is no longer waiting for you").await
        }
    }
}

async fn deny(conn: Connection, reason: &str) -> Result<(), BroadsideError> {
    let result = conn
        .send_frame(FrameType::System, &format!("Reconnection denied: {reason}"))
        .await;
    conn.close().await;
    Ok(result?)
}

/// Waits for one text answer, skipping corrupt frames. `None` if the
/// connection closes or the deadline passes first.
async fn read_answer(conn: &Connection, wait: Duration) -> Option<String> {
    let deadline = Instant::now() + wait;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match conn.recv_frame(remaining).await {
            Received::Frame(frame) => return Some(frame.text().trim().to_string()),
            Received::Corrupt(e) => {
                tracing::debug!(conn_id = %conn.id(), error = %e, "corrupt frame ignored");
            }
            Received::TimedOut | Received::Closed | Received::Reset => return None,
        }
    }
}
