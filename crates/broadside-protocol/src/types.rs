//! Core protocol types: identities and the decoded frame.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a player, handed out by the lobby.
///
/// This is the number a client types to reconnect. A newtype wrapper so a
/// `MatchId` can never be passed where a `PlayerId` is expected, even
/// though both are `u64` underneath.
///
/// `#[serde(transparent)]` serializes `PlayerId(42)` as plain `42`, which
/// keeps match snapshots readable.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// A unique identifier for a match (one game between two players).
///
/// Snapshots are stored under this key.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MatchId(pub u64);

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "M-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// FrameType
// ---------------------------------------------------------------------------

/// What a frame is for. Carried as a single byte in the header.
///
/// The numeric values are fixed: existing clients send `6` (Prompt) for
/// every line a user types, and expect the rest of the mapping unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum FrameType {
    /// Gameplay narration: hits, misses, turn changes.
    Game = 1,
    /// Free-form chat.
    Chat = 2,
    /// Lobby and lifecycle notices.
    System = 3,
    /// Messages addressed to spectators.
    Spectator = 4,
    /// A rendered board.
    BoardUpdate = 5,
    /// A request for input, or a client's reply to one.
    Prompt = 6,
}

impl FrameType {
    /// The byte written to the wire for this type.
    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for FrameType {
    type Error = ProtocolError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            1 => Ok(Self::Game),
            2 => Ok(Self::Chat),
            3 => Ok(Self::System),
            4 => Ok(Self::Spectator),
            5 => Ok(Self::BoardUpdate),
            6 => Ok(Self::Prompt),
            other => Err(ProtocolError::Malformed(format!(
                "unknown frame type {other}"
            ))),
        }
    }
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Game => "game",
            Self::Chat => "chat",
            Self::System => "system",
            Self::Spectator => "spectator",
            Self::BoardUpdate => "board-update",
            Self::Prompt => "prompt",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Frame
// ---------------------------------------------------------------------------

/// A decoded, checksum-verified frame.
///
/// The checksum only exists on the wire. Once a `Frame` value exists, its
/// bytes have already been verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Sender-chosen sequence number. Informational only.
    pub seq: u16,
    /// What the frame is for.
    pub kind: FrameType,
    /// The payload with the transform already inverted.
    pub payload: Vec<u8>,
}

impl Frame {
    /// Creates a frame carrying UTF-8 text.
    pub fn text_frame(seq: u16, kind: FrameType, text: &str) -> Self {
        Self {
            seq,
            kind,
            payload: text.as_bytes().to_vec(),
        }
    }

    /// The payload as text. Invalid UTF-8 is replaced, never rejected.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}
