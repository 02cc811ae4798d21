//! Match configuration and the turn engine's state machine.

use std::fmt;
use std::time::Duration;

use broadside_board::{BOARD_SIZE, Board, FLEET, ShipClass};
use serde::{Deserialize, Serialize};

use crate::MatchError;

// ---------------------------------------------------------------------------
// MatchConfig
// ---------------------------------------------------------------------------

/// Settings for one match.
#[derive(Debug, Clone)]
pub struct MatchConfig {
    /// Width and height of both boards.
    pub board_size: usize,

    /// Ships each player places, in placement order.
    pub fleet: Vec<ShipClass>,

    /// How long a player has to answer each fire prompt.
    pub turn_timeout: Duration,

    /// How long a player has to answer each placement prompt.
    pub placement_timeout: Duration,

    /// How long a dropped player has to come back.
    pub reconnect_timeout: Duration,

    /// Consecutive turn timeouts that forfeit the match.
    pub max_timeouts: u8,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            board_size: BOARD_SIZE,
            fleet: FLEET.to_vec(),
            turn_timeout: Duration::from_secs(10),
            placement_timeout: Duration::from_secs(300),
            reconnect_timeout: Duration::from_secs(60),
            max_timeouts: 2,
        }
    }
}

impl MatchConfig {
    /// Checks that a match with this config can actually be played.
    pub fn validate(&self) -> Result<(), MatchError> {
        Board::new(self.board_size)?;
        if self.fleet.is_empty() {
            return Err(MatchError::InvalidConfig("fleet is empty".into()));
        }
        if let Some(ship) = self
            .fleet
            .iter()
            .find(|s| s.length() == 0 || s.length() > self.board_size)
        {
            return Err(MatchError::InvalidConfig(format!(
                "{ship} does not fit a {n}x{n} board",
                n = self.board_size
            )));
        }
        if self.max_timeouts == 0 {
            return Err(MatchError::InvalidConfig(
                "max_timeouts must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Seat
// ---------------------------------------------------------------------------

/// One side of a match. Player 1 places first and fires first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Seat {
    One,
    Two,
}

impl Seat {
    pub const BOTH: [Seat; 2] = [Seat::One, Seat::Two];

    /// Index into per-seat arrays.
    pub fn index(self) -> usize {
        match self {
            Self::One => 0,
            Self::Two => 1,
        }
    }

    /// The opponent.
    pub fn other(self) -> Self {
        match self {
            Self::One => Self::Two,
            Self::Two => Self::One,
        }
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Player {}", self.index() + 1)
    }
}

// ---------------------------------------------------------------------------
// FinishReason
// ---------------------------------------------------------------------------

/// Why a player forfeited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForfeitCause {
    /// Too many consecutive turn timeouts.
    Inactivity,
    /// Dropped and did not come back in time.
    FailedReconnect,
    /// Dropped or went silent before both fleets were placed.
    Abandoned,
}

/// How a match ended. The `Display` text is what both players are told.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinishReason {
    /// The seat sank the whole opposing fleet.
    Win(Seat),
    /// The seat typed `quit`.
    Quit(Seat),
    /// The seat lost without the fleet being sunk.
    Forfeit { seat: Seat, cause: ForfeitCause },
}

impl FinishReason {
    /// The winning seat, if the match got far enough to have one.
    pub fn winner(&self) -> Option<Seat> {
        match *self {
            Self::Win(seat) => Some(seat),
            Self::Quit(seat) => Some(seat.other()),
            Self::Forfeit {
                cause: ForfeitCause::Abandoned,
                ..
            } => None,
            Self::Forfeit { seat, .. } => Some(seat.other()),
        }
    }
}

impl fmt::Display for FinishReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Win(seat) => write!(
                f,
                "{seat} wins! All of {}'s ships are sunk.",
                seat.other()
            ),
            Self::Quit(seat) => {
                write!(f, "{seat} quit the game. {} wins.", seat.other())
            }
            Self::Forfeit { seat, cause } => match cause {
                ForfeitCause::Inactivity => write!(
                    f,
                    "Game over: {seat} forfeited the game due to inactivity. {} wins.",
                    seat.other()
                ),
                ForfeitCause::FailedReconnect => write!(
                    f,
                    "Game over: {seat} did not reconnect in time. {} wins.",
                    seat.other()
                ),
                ForfeitCause::Abandoned => {
                    write!(f, "Game over: {seat} left before the game started.")
                }
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// Where the turn engine is.
///
/// ```text
/// Placement(1) → Placement(2) → Turn(1) ⇄ Turn(2)
///                                  │
///                        Disconnected(n) → AwaitingReconnect(n) → Turn(..)
///
/// any non-finished phase → Finished(reason)
/// ```
///
/// A turn skipped on timeout is an ordinary `Turn(n) → Turn(other)` step.
/// Nothing leaves `Finished`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Placement(Seat),
    Turn(Seat),
    Disconnected(Seat),
    AwaitingReconnect(Seat),
    Finished(FinishReason),
}

impl Phase {
    /// Returns `true` once both fleets are placed and the match is live.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            Self::Turn(_) | Self::Disconnected(_) | Self::AwaitingReconnect(_)
        )
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Finished(_))
    }

    /// Returns `true` if moving to `target` is a legal step.
    pub fn can_transition_to(self, target: Self) -> bool {
        match (self, target) {
            (Self::Finished(_), _) => false,
            (_, Self::Finished(_)) => true,
            (Self::Placement(Seat::One), Self::Placement(Seat::Two)) => true,
            (Self::Placement(Seat::Two), Self::Turn(Seat::One)) => true,
            (Self::Turn(n), Self::Turn(m)) => m == n.other(),
            (Self::Turn(n), Self::Disconnected(m)) => m == n,
            (Self::Disconnected(n), Self::AwaitingReconnect(m)) => m == n,
            (Self::AwaitingReconnect(_), Self::Turn(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Placement(seat) => write!(f, "Placement({seat})"),
            Self::Turn(seat) => write!(f, "Turn({seat})"),
            Self::Disconnected(seat) => write!(f, "Disconnected({seat})"),
            Self::AwaitingReconnect(seat) => {
                write!(f, "AwaitingReconnect({seat})")
            }
            Self::Finished(_) => write!(f, "Finished"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forfeit(seat: Seat, cause: ForfeitCause) -> FinishReason {
        FinishReason::Forfeit { seat, cause }
    }

    #[test]
    fn test_match_config_default() {
        let config = MatchConfig::default();
        assert_eq!(config.board_size, 10);
        assert_eq!(config.fleet.len(), 5);
        assert_eq!(config.turn_timeout, Duration::from_secs(10));
        assert_eq!(config.reconnect_timeout, Duration::from_secs(60));
        assert_eq!(config.max_timeouts, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_match_config_validate_rejects_unplayable() {
        let empty = MatchConfig {
            fleet: vec![],
            ..MatchConfig::default()
        };
        assert!(matches!(empty.validate(), Err(MatchError::InvalidConfig(_))));

        let tiny = MatchConfig {
            board_size: 3,
            ..MatchConfig::default()
        };
        assert!(matches!(tiny.validate(), Err(MatchError::InvalidConfig(_))));

        let huge = MatchConfig {
            board_size: 40,
            ..MatchConfig::default()
        };
        assert!(matches!(huge.validate(), Err(MatchError::Board(_))));
    }

    #[test]
    fn test_seat_other_and_display() {
        assert_eq!(Seat::One.other(), Seat::Two);
        assert_eq!(Seat::Two.other(), Seat::One);
        assert_eq!(Seat::Two.to_string(), "Player 2");
    }

    #[test]
    fn test_finish_reason_display_names_winner() {
        assert_eq!(
            FinishReason::Win(Seat::One).to_string(),
            "Player 1 wins! All of Player 2's ships are sunk."
        );
        assert_eq!(
            FinishReason::Quit(Seat::Two).to_string(),
            "Player 2 quit the game. Player 1 wins."
        );
        assert_eq!(
            forfeit(Seat::Two, ForfeitCause::Inactivity).to_string(),
            "Game over: Player 2 forfeited the game due to inactivity. Player 1 wins."
        );
        assert_eq!(
            forfeit(Seat::One, ForfeitCause::FailedReconnect).to_string(),
            "Game over: Player 1 did not reconnect in time. Player 2 wins."
        );
    }

    #[test]
    fn test_finish_reason_winner() {
        assert_eq!(FinishReason::Win(Seat::Two).winner(), Some(Seat::Two));
        assert_eq!(FinishReason::Quit(Seat::Two).winner(), Some(Seat::One));
        assert_eq!(
            forfeit(Seat::One, ForfeitCause::Inactivity).winner(),
            Some(Seat::Two)
        );
        assert_eq!(forfeit(Seat::One, ForfeitCause::Abandoned).winner(), None);
    }

    #[test]
    fn test_phase_can_transition_to() {
        use Phase::*;
        let done = Finished(FinishReason::Win(Seat::One));

        assert!(Placement(Seat::One).can_transition_to(Placement(Seat::Two)));
        assert!(Placement(Seat::Two).can_transition_to(Turn(Seat::One)));
        assert!(!Placement(Seat::One).can_transition_to(Turn(Seat::One)));

        assert!(Turn(Seat::One).can_transition_to(Turn(Seat::Two)));
        assert!(!Turn(Seat::One).can_transition_to(Turn(Seat::One)));
        assert!(Turn(Seat::Two).can_transition_to(Disconnected(Seat::Two)));
        assert!(!Turn(Seat::Two).can_transition_to(Disconnected(Seat::One)));

        assert!(
            Disconnected(Seat::One).can_transition_to(AwaitingReconnect(Seat::One))
        );
        assert!(AwaitingReconnect(Seat::One).can_transition_to(Turn(Seat::Two)));

        assert!(Placement(Seat::Two).can_transition_to(done));
        assert!(!done.can_transition_to(Turn(Seat::One)));
        assert!(!done.can_transition_to(done));
    }

    #[test]
    fn test_phase_is_active() {
        assert!(!Phase::Placement(Seat::One).is_active());
        assert!(Phase::Turn(Seat::One).is_active());
        assert!(Phase::AwaitingReconnect(Seat::Two).is_active());
        assert!(!Phase::Finished(FinishReason::Quit(Seat::One)).is_active());
        assert!(Phase::Finished(FinishReason::Quit(Seat::One)).is_finished());
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::Turn(Seat::One).to_string(), "Turn(Player 1)");
        assert_eq!(
            Phase::AwaitingReconnect(Seat::Two).to_string(),
            "AwaitingReconnect(Player 2)"
        );
    }
}
