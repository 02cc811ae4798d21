//! Error types for the match layer.

use broadside_board::BoardError;

/// Errors from setting up a match.
///
/// Once a match is running nothing is surfaced as an error: every way a
/// match can end is a [`FinishReason`](crate::FinishReason).
#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    /// The configuration can't produce a playable match.
    #[error("invalid match config: {0}")]
    InvalidConfig(String),

    /// The board could not be created.
    #[error(transparent)]
    Board(#[from] BoardError),
}

/// Errors from a snapshot store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("snapshot I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not encode snapshot: {0}")]
    Encode(serde_json::Error),

    #[error("could not decode snapshot: {0}")]
    Decode(serde_json::Error),
}
