//! Error types for the board layer.

/// Errors from board operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    /// The coordinate is outside the board.
    #[error("({row}, {col}) is outside the board")]
    OutOfBounds { row: usize, col: usize },

    /// The ship would leave the board or overlap another ship.
    #[error("{name} does not fit there")]
    CannotPlace { name: String },

    /// Boards must be between 1 and 26 cells wide (one letter per row).
    #[error("board size {0} is not supported")]
    InvalidSize(usize),
}

/// Errors from interpreting a line of player input.
///
/// The match answers all of these by prompting the same player again;
/// none of them changes any state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    /// Nothing was typed.
    #[error("empty input")]
    Empty,

    /// Not a coordinate like `B5`, or one outside the board.
    #[error("invalid coordinate '{0}'")]
    InvalidCoordinate(String),

    /// Not `H` or `V`.
    #[error("invalid orientation '{0}'")]
    InvalidOrientation(String),
}
