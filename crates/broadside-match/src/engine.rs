//! The turn engine: one task per match, from placement to teardown.

use std::sync::Arc;
use std::time::Duration;

use broadside_board::{InputError, Orientation, Shot, format_coordinate, parse_coordinate};
use broadside_protocol::{FrameType, MatchId, PlayerId};
use broadside_transport::{Connection, Received};
use tokio::time::Instant;

use crate::{
    FinishReason, ForfeitCause, MatchConfig, MatchError, MatchServices, MatchState,
    Phase, Reconnector, Seat,
};

/// Sent to both players after the finish reason.
pub const CLOSING_MESSAGE: &str = "The game has ended. Thank you for playing!";

const FIRE_PROMPT: &str = "Enter coordinate to fire at (e.g. B5 or 'quit' to exit):";
const COORDINATE_PROMPT: &str = "Enter starting coordinate (e.g. A1):";
const ORIENTATION_PROMPT: &str =
    "Enter orientation ('H' for horizontal, 'V' for vertical):";

/// What one read from a player came to.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Line(String),
    Quit,
    TimedOut,
    Gone,
}

/// Releases both sessions if the engine task dies before teardown.
struct ReleaseGuard {
    reconnector: Option<Arc<dyn Reconnector>>,
    players: [PlayerId; 2],
}

impl ReleaseGuard {
    fn disarm(&mut self) {
        self.reconnector = None;
    }
}

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        if let Some(reconnector) = self.reconnector.take() {
            let players = self.players;
            tokio::spawn(async move {
                reconnector.release(&players).await;
            });
        }
    }
}

/// How a match ended, with both players' connections still open.
#[derive(Debug)]
pub struct MatchOutcome {
    pub reason: FinishReason,
    /// Player 1 first.
    pub players: [(PlayerId, Connection); 2],
}

/// A running match between two connected players.
///
/// Owns both connections, both boards and the turn counters. Create one
/// with [`Match::new`] and drive it with [`Match::run`] inside its own task.
pub struct Match {
    config: MatchConfig,
    state: MatchState,
    conns: [Connection; 2],
    services: MatchServices,
    phase: Phase,
}

impl Match {
    /// Sets up a match in `Placement(Player 1)`.
    ///
    /// # Errors
    /// [`MatchError`] if `config` can't produce a playable match.
    pub fn new(
        match_id: MatchId,
        config: MatchConfig,
        players: [(PlayerId, Connection); 2],
        services: MatchServices,
    ) -> Result<Self, MatchError> {
        config.validate()?;
        let [(first, first_conn), (second, second_conn)] = players;
        let state = MatchState::new(match_id, [first, second], config.board_size)?;
        Ok(Self {
            config,
            state,
            conns: [first_conn, second_conn],
            services,
            phase: Phase::Placement(Seat::One),
        })
    }

    pub fn match_id(&self) -> MatchId {
        self.state.match_id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Runs the match to completion, closes both connections, and returns
    /// how it ended.
    pub async fn run(self) -> FinishReason {
        let outcome = self.play().await;
        for (_, conn) in &outcome.players {
            conn.close().await;
        }
        outcome.reason
    }

    /// Runs the match to completion and hands both connections back open.
    ///
    /// Both players are told the outcome, the snapshot is removed and both
    /// sessions are released before this returns. What happens to the
    /// connections next is up to the caller.
    pub async fn play(mut self) -> MatchOutcome {
        let match_id = self.state.match_id;
        let mut guard = ReleaseGuard {
            reconnector: Some(Arc::clone(&self.services.reconnector)),
            players: self.state.players,
        };
        tracing::info!(
            %match_id,
            player_one = %self.state.players[0],
            player_two = %self.state.players[1],
            "match started"
        );

        let reason = loop {
            let next = match self.phase {
                Phase::Placement(seat) => self.placement(seat).await,
                Phase::Turn(seat) => self.turn(seat).await,
                Phase::Disconnected(seat) => self.disconnected(seat).await,
                Phase::AwaitingReconnect(seat) => self.await_reconnect(seat).await,
                Phase::Finished(reason) => break reason,
            };
            self.transition(next);
        };

        self.finish(reason).await;
        guard.disarm();

        let Match { state, conns, .. } = self;
        let [first, second] = conns;
        MatchOutcome {
            reason,
            players: [(state.players[0], first), (state.players[1], second)],
        }
    }

    fn transition(&mut self, next: Phase) {
        debug_assert!(
            self.phase.can_transition_to(next),
            "illegal transition {} -> {}",
            self.phase,
            next
        );
        tracing::debug!(
            match_id = %self.state.match_id,
            from = %self.phase,
            to = %next,
            "phase change"
        );
        self.phase = next;
    }

    // -----------------------------------------------------------------------
    // Phases
    // -----------------------------------------------------------------------

    async fn placement(&mut self, seat: Seat) -> Phase {
        let size = self.config.board_size;
        self.send(seat, FrameType::System, "Please place your ships manually on the board.")
            .await;
        self.send_own_board(seat, "YOUR BOARD").await;
        self.send(
            seat.other(),
            FrameType::System,
            &format!("Waiting for {seat} to place their ships..."),
        )
        .await;

        let fleet = self.config.fleet.clone();
        for class in fleet {
            loop {
                self.send(seat, FrameType::System, &format!("Placing your {class}."))
                    .await;
                self.send(seat, FrameType::Prompt, COORDINATE_PROMPT).await;
                let coord_text = match self.read_line(seat, self.config.placement_timeout).await {
                    Input::Line(text) => text,
                    other => return abandon(seat, other),
                };
                let (row, col) = match parse_coordinate(&coord_text, size) {
                    Ok(rc) => rc,
                    Err(e) => {
                        self.reject_input(seat, &e).await;
                        continue;
                    }
                };

                self.send(seat, FrameType::Prompt, ORIENTATION_PROMPT).await;
                let orientation_text =
                    match self.read_line(seat, self.config.placement_timeout).await {
                        Input::Line(text) => text,
                        other => return abandon(seat, other),
                    };
                let Ok(orientation) = orientation_text.parse::<Orientation>() else {
                    self.send(
                        seat,
                        FrameType::System,
                        "Invalid orientation. Please enter 'H' for horizontal or 'V' for vertical.",
                    )
                    .await;
                    continue;
                };

                let placed = self.state.boards[seat.index()].try_place(
                    class.name(),
                    row,
                    col,
                    class.length(),
                    orientation,
                );
                if placed.is_err() {
                    self.send(
                        seat,
                        FrameType::System,
                        &format!("Cannot place {} at {coord_text}. Try again.", class.name()),
                    )
                    .await;
                    continue;
                }

                self.send(
                    seat,
                    FrameType::System,
                    &format!("{} placed successfully!", class.name()),
                )
                .await;
                self.send_own_board(seat, "UPDATED BOARD").await;
                break;
            }
        }

        tracing::info!(match_id = %self.state.match_id, %seat, "fleet placed");
        self.services
            .broadcaster
            .notify(&format!("{seat} has placed their ships."), None)
            .await;

        match seat {
            Seat::One => {
                self.send(
                    seat,
                    FrameType::System,
                    "All ships placed! Waiting for Player 2 to place their ships.",
                )
                .await;
                Phase::Placement(Seat::Two)
            }
            Seat::Two => {
                self.state.current_turn = Seat::One;
                self.persist().await;
                self.send_both(FrameType::System, "All ships placed! The game is starting.")
                    .await;
                self.services
                    .broadcaster
                    .notify("Both fleets are placed. Player 1 fires first.", None)
                    .await;
                Phase::Turn(Seat::One)
            }
        }
    }

    async fn turn(&mut self, seat: Seat) -> Phase {
        let other = seat.other();
        self.state.current_turn = seat;

        let view = self.state.firing_view(seat).render();
        self.send(seat, FrameType::BoardUpdate, &format!("YOUR FIRING BOARD:\n{view}"))
            .await;
        self.send(other, FrameType::System, &format!("Waiting for {seat}..."))
            .await;
        self.services
            .broadcaster
            .notify(&format!("It is {seat}'s turn."), None)
            .await;

        loop {
            self.send(seat, FrameType::Prompt, FIRE_PROMPT).await;
            let text = match self.read_line(seat, self.config.turn_timeout).await {
                Input::Line(text) => text,
                Input::Quit => return Phase::Finished(FinishReason::Quit(seat)),
                Input::Gone => return Phase::Disconnected(seat),
                Input::TimedOut => return self.timed_out(seat).await,
            };

            let (row, col) = match parse_coordinate(&text, self.config.board_size) {
                Ok(rc) => rc,
                Err(e) => {
                    self.reject_input(seat, &e).await;
                    continue;
                }
            };

            match self.state.boards[other.index()].fire_at(row, col) {
                Ok(Shot::AlreadyShot) => {
                    self.send(
                        seat,
                        FrameType::System,
                        "You've already fired at that location.",
                    )
                    .await;
                }
                Ok(shot) => return self.resolve(seat, row, col, shot).await,
                Err(e) => {
                    self.send(seat, FrameType::System, &format!("Invalid input: {e}"))
                        .await;
                }
            }
        }
    }

    /// Records a shot that landed, tells everyone, and decides what's next.
    async fn resolve(&mut self, seat: Seat, row: usize, col: usize, shot: Shot) -> Phase {
        let other = seat.other();
        self.state.observer[other.index()].record(row, col, &shot);
        self.state.timeout_counts[seat.index()] = 0;

        let coord = format_coordinate(row, col);
        let message = match &shot {
            Shot::Hit { sunk: Some(name) } => format!("{seat} HIT at {coord}! Sunk {name}!"),
            Shot::Hit { sunk: None } => format!("{seat} HIT at {coord}!"),
            _ => format!("{seat} MISS at {coord}!"),
        };
        tracing::debug!(match_id = %self.state.match_id, %seat, %coord, ?shot, "shot resolved");

        self.send_both(FrameType::Game, &message).await;
        let view = self.state.firing_view(seat).render();
        self.send(seat, FrameType::BoardUpdate, &format!("YOUR FIRING BOARD:\n{view}"))
            .await;
        self.services
            .broadcaster
            .notify(&message, Some(self.spectator_boards()))
            .await;

        let won = self.state.boards[other.index()].all_sunk();
        if !won {
            self.state.current_turn = other;
        }
        self.persist().await;

        if won {
            Phase::Finished(FinishReason::Win(seat))
        } else {
            Phase::Turn(other)
        }
    }

    async fn timed_out(&mut self, seat: Seat) -> Phase {
        let count = &mut self.state.timeout_counts[seat.index()];
        *count = count.saturating_add(1);
        let count = *count;
        tracing::info!(match_id = %self.state.match_id, %seat, count, "turn timed out");

        if count >= self.config.max_timeouts {
            return Phase::Finished(FinishReason::Forfeit {
                seat,
                cause: ForfeitCause::Inactivity,
            });
        }

        let message = format!("{seat} took too long. Turn skipped.");
        self.send_both(FrameType::System, &message).await;
        self.services.broadcaster.notify(&message, None).await;

        self.state.current_turn = seat.other();
        self.persist().await;
        Phase::Turn(seat.other())
    }

    async fn disconnected(&mut self, seat: Seat) -> Phase {
        tracing::info!(
            match_id = %self.state.match_id,
            player_id = %self.state.player(seat),
            %seat,
            "player disconnected"
        );
        self.persist().await;
        self.conns[seat.index()].close().await;

        let message = format!("{seat} disconnected, waiting for reconnection...");
        self.send(seat.other(), FrameType::System, &message).await;
        self.services.broadcaster.notify(&message, None).await;
        Phase::AwaitingReconnect(seat)
    }

    async fn await_reconnect(&mut self, seat: Seat) -> Phase {
        let match_id = self.state.match_id;
        let player = self.state.player(seat);
        let replacement = self
            .services
            .reconnector
            .await_reconnect(player, self.config.reconnect_timeout)
            .await;

        let Some(conn) = replacement else {
            tracing::info!(%match_id, player_id = %player, "reconnect window expired");
            return Phase::Finished(FinishReason::Forfeit {
                seat,
                cause: ForfeitCause::FailedReconnect,
            });
        };
        self.conns[seat.index()] = conn;

        match self.services.store.load(match_id).await {
            Ok(Some(saved)) => self.state = saved,
            Ok(None) => {
                tracing::warn!(%match_id, "no snapshot to resume from, using live state");
            }
            Err(e) => {
                tracing::warn!(%match_id, error = %e, "snapshot load failed, using live state");
            }
        }
        tracing::info!(%match_id, player_id = %player, "player reconnected");

        self.send(seat, FrameType::System, "You have reconnected. Continuing the game...")
            .await;
        let message = format!("{seat} has reconnected. Continuing the game...");
        self.send(seat.other(), FrameType::System, &message).await;
        self.services.broadcaster.notify(&message, None).await;

        Phase::Turn(self.state.current_turn)
    }

    async fn finish(&mut self, reason: FinishReason) {
        let match_id = self.state.match_id;
        let text = reason.to_string();

        self.send_both(FrameType::System, &text).await;
        self.send_both(FrameType::System, CLOSING_MESSAGE).await;
        self.services.broadcaster.notify(&text, None).await;

        if let Err(e) = self.services.store.remove(match_id).await {
            tracing::warn!(%match_id, error = %e, "failed to remove snapshot");
        }
        self.services.reconnector.release(&self.state.players).await;

        tracing::info!(
            %match_id,
            winner = ?reason.winner(),
            reason = %text,
            "match finished"
        );
    }

    // -----------------------------------------------------------------------
    // I/O helpers
    // -----------------------------------------------------------------------

    /// Waits up to `wait` for one line from `seat`.
    ///
    /// Corrupt frames are dropped and the wait continues against the same
    /// deadline.
    async fn read_line(&self, seat: Seat, wait: Duration) -> Input {
        let deadline = Instant::now() + wait;
        let conn = &self.conns[seat.index()];
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match conn.recv_frame(remaining).await {
                Received::Frame(frame) => {
                    let text = frame.text().trim().to_string();
                    if text.eq_ignore_ascii_case("quit") {
                        return Input::Quit;
                    }
                    return Input::Line(text);
                }
                Received::TimedOut => return Input::TimedOut,
                Received::Closed | Received::Reset => return Input::Gone,
                Received::Corrupt(e) => {
                    tracing::debug!(
                        match_id = %self.state.match_id,
                        %seat,
                        error = %e,
                        "corrupt frame ignored"
                    );
                }
            }
        }
    }

    async fn reject_input(&self, seat: Seat, error: &InputError) {
        let message = match error {
            InputError::Empty => "Invalid input. Please enter a coordinate.".to_string(),
            other => format!("Invalid input: {other}"),
        };
        self.send(seat, FrameType::System, &message).await;
    }

    /// Best effort: a failed send surfaces on the next read from that seat.
    async fn send(&self, seat: Seat, kind: FrameType, text: &str) {
        if let Err(e) = self.conns[seat.index()].send_frame(kind, text).await {
            tracing::debug!(
                match_id = %self.state.match_id,
                %seat,
                error = %e,
                "send failed"
            );
        }
    }

    async fn send_both(&self, kind: FrameType, text: &str) {
        for seat in Seat::BOTH {
            self.send(seat, kind, text).await;
        }
    }

    async fn send_own_board(&self, seat: Seat, title: &str) {
        let grid = self.state.board(seat).omniscient().render();
        self.send(seat, FrameType::BoardUpdate, &format!("{title}:\n{grid}"))
            .await;
    }

    fn spectator_boards(&self) -> (String, String) {
        let [first, second] = Seat::BOTH.map(|seat| {
            format!(
                "{seat}'s board:\n{}",
                self.state.board(seat).omniscient().render()
            )
        });
        (first, second)
    }

    /// A failed save is logged and the match carries on.
    async fn persist(&self) {
        if let Err(e) = self.services.store.save(&self.state).await {
            tracing::warn!(match_id = %self.state.match_id, error = %e, "snapshot save failed");
        }
    }
}

impl std::fmt::Debug for Match {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Match")
            .field("match_id", &self.state.match_id)
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}

/// Ends placement after anything but a line of input.
fn abandon(seat: Seat, input: Input) -> Phase {
    match input {
        Input::Quit => Phase::Finished(FinishReason::Quit(seat)),
        _ => Phase::Finished(FinishReason::Forfeit {
            seat,
            cause: ForfeitCause::Abandoned,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abandon_quit_is_quit() {
        assert_eq!(
            abandon(Seat::Two, Input::Quit),
            Phase::Finished(FinishReason::Quit(Seat::Two))
        );
    }

    #[test]
    fn test_abandon_silence_or_drop_is_forfeit() {
        let expected = Phase::Finished(FinishReason::Forfeit {
            seat: Seat::One,
            cause: ForfeitCause::Abandoned,
        });
        assert_eq!(abandon(Seat::One, Input::TimedOut), expected);
        assert_eq!(abandon(Seat::One, Input::Gone), expected);
    }
}
