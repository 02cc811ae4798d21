//! Player session management for Broadside.
//!
//! This crate handles the identity side of a player's connection:
//!
//! 1. **Identity**: handing out monotonically increasing player ids
//! 2. **Session tracking**: which player is in which match, and whether
//!    their connection is live ([`SessionManager`])
//! 3. **Reconnection**: checking a returning player's token and handing
//!    the new connection to the match that is waiting for it
//!
//! # How it fits in the stack
//!
//! ```text
//! Lobby / Match (above)  ← asks "may this connection resume player N?"
//!     ↕
//! Session Layer (this crate)  ← owns tokens and reconnection slots
//!     ↕
//! Protocol Layer (below)  ← provides PlayerId, MatchId
//! ```

mod error;
mod manager;
mod session;

pub use error::SessionError;
pub use manager::SessionManager;
pub use session::{Session, SessionState};
