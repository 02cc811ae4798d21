//! The durable part of a match.

use broadside_board::{Board, Grid};
use broadside_protocol::{MatchId, PlayerId};
use serde::{Deserialize, Serialize};

use crate::{MatchError, Seat, StoreError};

/// Everything needed to resume a match after a player drops.
///
/// Written once both fleets are placed, rewritten after every resolved
/// shot, timeout skip and disconnect, and removed when the match ends.
/// `observer[i]` is what the attacker has learned about `boards[i]`, so it
/// always equals `boards[i].redacted()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchState {
    pub match_id: MatchId,
    pub players: [PlayerId; 2],
    pub boards: [Board; 2],
    pub observer: [Grid; 2],
    pub current_turn: Seat,
    pub timeout_counts: [u8; 2],
}

impl MatchState {
    /// Empty boards, Player 1 to move, no timeouts.
    pub fn new(
        match_id: MatchId,
        players: [PlayerId; 2],
        board_size: usize,
    ) -> Result<Self, MatchError> {
        Ok(Self {
            match_id,
            players,
            boards: [Board::new(board_size)?, Board::new(board_size)?],
            observer: [Grid::new(board_size), Grid::new(board_size)],
            current_turn: Seat::One,
            timeout_counts: [0, 0],
        })
    }

    pub fn player(&self, seat: Seat) -> PlayerId {
        self.players[seat.index()]
    }

    /// The board `seat` defends.
    pub fn board(&self, seat: Seat) -> &Board {
        &self.boards[seat.index()]
    }

    /// What `seat` sees when aiming at its opponent.
    pub fn firing_view(&self, seat: Seat) -> &Grid {
        &self.observer[seat.other().index()]
    }

    pub fn to_json(&self) -> Result<String, StoreError> {
        serde_json::to_string(self).map_err(StoreError::Encode)
    }

    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        serde_json::from_str(json).map_err(StoreError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use broadside_board::{Orientation, Shot};

    fn sample() -> MatchState {
        let mut state =
            MatchState::new(MatchId(7), [PlayerId(1), PlayerId(2)], 10).unwrap();
        state.boards[1]
            .try_place("Destroyer", 0, 0, 2, Orientation::Horizontal)
            .unwrap();
        let shot = state.boards[1].fire_at(0, 0).unwrap();
        state.observer[1].record(0, 0, &shot);
        state.current_turn = Seat::Two;
        state.timeout_counts = [0, 1];
        state
    }

    #[test]
    fn test_match_state_new_starts_with_player_one() {
        let state =
            MatchState::new(MatchId(1), [PlayerId(3), PlayerId(4)], 10).unwrap();
        assert_eq!(state.current_turn, Seat::One);
        assert_eq!(state.timeout_counts, [0, 0]);
        assert_eq!(state.player(Seat::Two), PlayerId(4));
    }

    #[test]
    fn test_match_state_firing_view_is_opponents_observer() {
        let state = sample();
        assert_eq!(state.firing_view(Seat::One), &state.boards[1].redacted());
        assert_eq!(state.board(Seat::Two).ships_afloat(), 1);
    }

    #[test]
    fn test_match_state_json_reencodes_identically() {
        let state = sample();
        let json = state.to_json().unwrap();
        let restored = MatchState::from_json(&json).unwrap();
        assert_eq!(restored, state);
        assert_eq!(restored.to_json().unwrap(), json);
        assert_eq!(
            restored.boards[1].clone().fire_at(0, 0).unwrap(),
            Shot::AlreadyShot
        );
    }

    #[test]
    fn test_match_state_from_json_rejects_garbage() {
        assert!(matches!(
            MatchState::from_json("{not json"),
            Err(StoreError::Decode(_))
        ));
    }
}
