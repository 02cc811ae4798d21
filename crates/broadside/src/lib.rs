//! # Broadside
//!
//! A two-player Battleship server over a checksummed TCP frame protocol.
//!
//! Players connect, get paired in arrival order, and play a full match:
//! fleet placement, alternating shots, turn timeouts, and reconnection with
//! a session token after a dropped link. When a match ends both players
//! are asked for another game. Anyone else can watch as a spectator and is
//! offered a seat when a match ends.
//!
//! This crate is the server itself. It wires the lower layers together:
//!
//! - `broadside-protocol`: frames, checksums, payload transforms
//! - `broadside-transport`: framed TCP connections
//! - `broadside-session`: player ids, tokens, reconnection slots
//! - `broadside-board`: grids, ships, shots
//! - `broadside-match`: the per-match turn engine
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use broadside::prelude::*;
//!
//! # async fn start() -> Result<(), BroadsideError> {
//! let server = BroadsideServer::builder()
//!     .bind("0.0.0.0:5005")
//!     .build()
//!     .await?;
//! let handle = server.handle();
//! tokio::spawn(async move {
//!     let _ = tokio::signal::ctrl_c().await;
//!     handle.shutdown();
//! });
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod gate;
mod lobby;
mod pairing;
mod rematch;
mod server;
mod spectators;

pub use config::{LobbyConfig, ServerConfig};
pub use error::BroadsideError;
pub use gate::{SessionGate, SharedSessions};
pub use lobby::{INVALID_CHOICE, SPECTATING_MESSAGE, TOKEN_PROMPT, WELCOME_PROMPT};
pub use pairing::RECRUIT_PROMPT;
pub use rematch::{REMATCH_DECLINED, REMATCH_INVALID, REMATCH_PROMPT};
pub use server::{BroadsideServer, BroadsideServerBuilder, SHUTDOWN_MESSAGE, ServerHandle};
pub use spectators::SpectatorSet;

pub mod prelude {
    pub use crate::{
        BroadsideError, BroadsideServer, BroadsideServerBuilder, LobbyConfig, ServerConfig,
        ServerHandle,
    };
    pub use broadside_match::{FileSnapshotStore, MatchConfig, MemorySnapshotStore};
    pub use broadside_protocol::{CaesarShift, FrameCodec, FrameType, Identity};
}
