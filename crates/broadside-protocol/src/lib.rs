//! Wire protocol for Broadside.
//!
//! This crate defines the "language" that clients and the server speak:
//!
//! - **Types** ([`Frame`], [`FrameType`], [`PlayerId`], [`MatchId`]):
//!   the structures that travel on the wire or identify who sent them.
//! - **Codec** ([`FrameCodec`], [`PayloadTransform`]): how a frame is
//!   turned into checksummed bytes and back.
//! - **Errors** ([`ProtocolError`]): what can go wrong while decoding.
//! - **Diagnostics** ([`simulate_corruption`]): a self-check that flips
//!   bytes in encoded frames and counts how many the checksum catches.
//!
//! # Frame layout
//!
//! ```text
//! ┌──────────┬──────────┬──────────────┬───────────────┬─────────────┐
//! │ seq: u16 │ kind: u8 │ length: u32  │ checksum: u32 │ payload ... │
//! └──────────┴──────────┴──────────────┴───────────────┴─────────────┘
//!   header (7 bytes, big-endian)          CRC-32 over header + payload
//! ```
//!
//! The protocol layer sits between transport (raw bytes) and the lobby or
//! match (text commands). It knows nothing about sockets or games.

mod codec;
mod diagnostics;
mod error;
mod types;

pub use codec::{
    CaesarShift, FrameCodec, HEADER_LEN, Identity, MAX_PAYLOAD_LEN,
    PREFIX_LEN, PayloadTransform, declared_len,
};
pub use diagnostics::{CorruptionReport, simulate_corruption};
pub use error::ProtocolError;
pub use types::{Frame, FrameType, MatchId, PlayerId};
