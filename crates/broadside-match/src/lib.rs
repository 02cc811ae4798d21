//! Match lifecycle for Broadside.
//!
//! Each match runs as one Tokio task that owns both players' connections,
//! both boards and the turn counters. It talks to the rest of the server
//! only through three capabilities injected at construction:
//!
//! - [`Broadcaster`]: fan-out to spectators
//! - [`Reconnector`]: hands over a replacement connection after a drop
//! - [`SnapshotStore`]: keyed, durable [`MatchState`] snapshots
//!
//! # Key types
//!
//! - [`Match`]: the turn engine; call [`Match::run`] or [`Match::play`]
//!   inside a task
//! - [`Phase`]: where the engine is in its state machine
//! - [`FinishReason`]: why a match ended, sent to both players
//! - [`MatchConfig`]: board, fleet and timeouts

mod config;
mod engine;
mod error;
mod services;
mod state;
mod store;

pub use config::{FinishReason, ForfeitCause, MatchConfig, Phase, Seat};
pub use engine::{CLOSING_MESSAGE, Match, MatchOutcome};
pub use error::{MatchError, StoreError};
pub use services::{Broadcaster, MatchServices, Reconnector};
pub use state::MatchState;
pub use store::{FileSnapshotStore, MemorySnapshotStore, SnapshotStore};
