use broadside_board::{BOARD_SIZE, Board, Cell, FLEET, Grid, Orientation, Shot};
use proptest::prelude::*;

/// Places the standard fleet one ship per row, each starting at `offset`
/// columns in (clamped so it fits).
fn fleet_board(offsets: &[usize]) -> Board {
    let mut board = Board::new(BOARD_SIZE).unwrap();
    for (i, class) in FLEET.iter().enumerate() {
        let col = offsets[i].min(BOARD_SIZE - class.length());
        board
            .try_place(class.name(), i * 2, col, class.length(), Orientation::Horizontal)
            .unwrap();
    }
    board
}

fn coord() -> impl Strategy<Value = (usize, usize)> {
    (0..BOARD_SIZE, 0..BOARD_SIZE)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Revealed cells never revert, whatever order shots arrive in.
    #[test]
    fn revealed_cells_stay_revealed(
        offsets in proptest::collection::vec(0..BOARD_SIZE, 5),
        shots in proptest::collection::vec(coord(), 0..150),
    ) {
        let mut board = fleet_board(&offsets);
        let mut revealed = Vec::new();

        for (row, col) in shots {
            board.fire_at(row, col).unwrap();
            revealed.push((row, col));
            for &(r, c) in &revealed {
                let cell = board.omniscient().get(r, c).unwrap();
                prop_assert!(matches!(cell, Cell::Hit | Cell::Miss));
            }
        }
    }

    /// Firing at an already revealed cell reports AlreadyShot and leaves
    /// the board exactly as it was.
    #[test]
    fn repeat_shots_never_mutate(
        offsets in proptest::collection::vec(0..BOARD_SIZE, 5),
        shots in proptest::collection::vec(coord(), 1..60),
    ) {
        let mut board = fleet_board(&offsets);
        for &(row, col) in &shots {
            board.fire_at(row, col).unwrap();
        }
        let before = board.clone();
        for &(row, col) in &shots {
            prop_assert_eq!(board.fire_at(row, col).unwrap(), Shot::AlreadyShot);
        }
        prop_assert_eq!(board, before);
    }

    /// Each ship is announced as sunk exactly once, and all_sunk turns true
    /// exactly when the last ship goes down.
    #[test]
    fn sinking_is_reported_once_per_ship(
        offsets in proptest::collection::vec(0..BOARD_SIZE, 5),
        order in Just((0..BOARD_SIZE * BOARD_SIZE).collect::<Vec<_>>()).prop_shuffle(),
    ) {
        let mut board = fleet_board(&offsets);
        let mut sunk = Vec::new();

        for index in order {
            let (row, col) = (index / BOARD_SIZE, index % BOARD_SIZE);
            if let Shot::Hit { sunk: Some(name) } = board.fire_at(row, col).unwrap() {
                sunk.push(name);
            }
            prop_assert_eq!(board.all_sunk(), sunk.len() == FLEET.len());
        }

        sunk.sort();
        let mut expected: Vec<String> =
            FLEET.iter().map(|c| c.name().to_string()).collect();
        expected.sort();
        prop_assert_eq!(sunk, expected);
    }

    /// An attacker's observer grid, fed every shot result, always equals the
    /// redacted view of the target board.
    #[test]
    fn observer_grid_equals_redacted_view(
        offsets in proptest::collection::vec(0..BOARD_SIZE, 5),
        shots in proptest::collection::vec(coord(), 0..120),
    ) {
        let mut board = fleet_board(&offsets);
        let mut observer = Grid::new(BOARD_SIZE);

        for (row, col) in shots {
            let shot = board.fire_at(row, col).unwrap();
            observer.record(row, col, &shot);
            prop_assert_eq!(&observer, &board.redacted());
        }
    }
}
