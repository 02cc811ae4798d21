//! Error types for the protocol layer.
//!
//! Each crate in Broadside defines its own error enum. When you see a
//! `ProtocolError`, you know the bytes arrived but could not be trusted,
//! not that the socket failed or the game rejected a move.

/// Errors that can occur while encoding or decoding a frame.
///
/// A frame that fails to decode is dropped by the reader. It is never
/// handed to the lobby or to a match.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// The CRC-32 carried in the frame does not match the one recomputed
    /// over its header and payload.
    ///
    /// The checksum is verified before anything else is trusted, so a
    /// corrupted length or type byte also ends up here.
    #[error("checksum mismatch: frame carries {expected:#010x}, computed {actual:#010x}")]
    ChecksumMismatch {
        /// The checksum found in the frame.
        expected: u32,
        /// The checksum recomputed by the receiver.
        actual: u32,
    },

    /// The bytes are structurally wrong: too short, a length that disagrees
    /// with the body, or an unknown frame type.
    #[error("malformed frame: {0}")]
    Malformed(String),

    /// The payload is larger than a single frame may carry.
    #[error("payload of {0} bytes exceeds the frame limit")]
    PayloadTooLarge(usize),
}
