//! Frame codec: header, checksum and payload transform.
//!
//! Encoding applies the [`PayloadTransform`] to a copy of the payload, then
//! computes a CRC-32 over the 7-byte header followed by the transformed
//! payload. Decoding reverses this, verifying the checksum before trusting
//! any header field.
//!
//! The transform is pluggable. [`CaesarShift`] with a shift of 13 is what
//! existing clients speak; [`Identity`] sends payloads untouched. Neither
//! hides anything from an observer of the wire.

use std::fmt;
use std::sync::Arc;

use crate::{Frame, FrameType, ProtocolError};

/// Length of `seq | kind | length`.
pub const HEADER_LEN: usize = 7;

/// Length of the header plus the checksum. Every frame is at least this long.
pub const PREFIX_LEN: usize = HEADER_LEN + 4;

/// Largest payload a single frame may carry (64 KiB).
///
/// A reader seeing a larger declared length treats the frame as malformed
/// rather than allocating for it.
pub const MAX_PAYLOAD_LEN: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// PayloadTransform
// ---------------------------------------------------------------------------

/// A reversible, length-preserving transformation of payload bytes.
///
/// `invert(apply(x)) == x` must hold for every byte string.
pub trait PayloadTransform: fmt::Debug + Send + Sync + 'static {
    /// Transforms outbound bytes in place.
    fn apply(&self, data: &mut [u8]);

    /// Undoes [`apply`](Self::apply) in place.
    fn invert(&self, data: &mut [u8]);
}

/// Leaves payloads untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl PayloadTransform for Identity {
    fn apply(&self, _data: &mut [u8]) {}

    fn invert(&self, _data: &mut [u8]) {}
}

/// Rotates ASCII letters by a fixed amount, preserving case.
///
/// Every other byte passes through unchanged, including the bytes of
/// multi-byte UTF-8 sequences (all of which are `>= 0x80`), so a valid
/// UTF-8 payload stays valid UTF-8.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaesarShift {
    shift: u8,
}

impl CaesarShift {
    /// Creates a shift. Values are taken modulo 26.
    pub fn new(shift: u8) -> Self {
        Self { shift: shift % 26 }
    }

    /// The effective shift in `0..26`.
    pub fn shift(&self) -> u8 {
        self.shift
    }
}

impl Default for CaesarShift {
    fn default() -> Self {
        Self::new(13)
    }
}

impl PayloadTransform for CaesarShift {
    fn apply(&self, data: &mut [u8]) {
        rotate(data, self.shift);
    }

    fn invert(&self, data: &mut [u8]) {
        rotate(data, (26 - self.shift) % 26);
    }
}

fn rotate(data: &mut [u8], by: u8) {
    for byte in data.iter_mut() {
        *byte = match *byte {
            b'a'..=b'z' => b'a' + (*byte - b'a' + by) % 26,
            b'A'..=b'Z' => b'A' + (*byte - b'A' + by) % 26,
            other => other,
        };
    }
}

// ---------------------------------------------------------------------------
// FrameCodec
// ---------------------------------------------------------------------------

/// Encodes and decodes checksummed frames.
///
/// Cheap to clone: the transform is shared behind an `Arc`, so every
/// connection can carry its own handle to the same codec.
#[derive(Clone)]
pub struct FrameCodec {
    transform: Arc<dyn PayloadTransform>,
}

impl FrameCodec {
    /// Creates a codec using the given payload transform.
    pub fn new(transform: impl PayloadTransform) -> Self {
        Self {
            transform: Arc::new(transform),
        }
    }

    /// A codec that sends payloads as-is.
    pub fn plain() -> Self {
        Self::new(Identity)
    }

    /// Encodes a frame to wire bytes.
    ///
    /// # Errors
    /// Returns [`ProtocolError::PayloadTooLarge`] if the payload exceeds
    /// [`MAX_PAYLOAD_LEN`]. Any in-range input encodes.
    pub fn encode(
        &self,
        seq: u16,
        kind: FrameType,
        payload: &[u8],
    ) -> Result<Vec<u8>, ProtocolError> {
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(ProtocolError::PayloadTooLarge(payload.len()));
        }

        let mut body = payload.to_vec();
        self.transform.apply(&mut body);

        let mut header = [0u8; HEADER_LEN];
        header[0..2].copy_from_slice(&seq.to_be_bytes());
        header[2] = kind.as_byte();
        // Bounded by MAX_PAYLOAD_LEN above, so this never truncates.
        header[3..7].copy_from_slice(&(body.len() as u32).to_be_bytes());

        let checksum = checksum(&header, &body);

        let mut out = Vec::with_capacity(PREFIX_LEN + body.len());
        out.extend_from_slice(&header);
        out.extend_from_slice(&checksum.to_be_bytes());
        out.extend_from_slice(&body);
        Ok(out)
    }

    /// Encodes a text payload.
    pub fn encode_text(
        &self,
        seq: u16,
        kind: FrameType,
        text: &str,
    ) -> Result<Vec<u8>, ProtocolError> {
        self.encode(seq, kind, text.as_bytes())
    }

    /// Decodes and verifies one complete frame.
    ///
    /// Checks run in this order:
    /// 1. shorter than [`PREFIX_LEN`] → `Malformed`
    /// 2. checksum over header + payload → `ChecksumMismatch`
    /// 3. declared length vs. actual body → `Malformed`
    /// 4. frame type byte → `Malformed`
    ///
    /// Because the checksum is checked first, any single corrupted byte
    /// (header, checksum or payload) is reported as `ChecksumMismatch`.
    pub fn decode(&self, bytes: &[u8]) -> Result<Frame, ProtocolError> {
        if bytes.len() < PREFIX_LEN {
            return Err(ProtocolError::Malformed(format!(
                "frame is {} bytes, shorter than the {PREFIX_LEN}-byte prefix",
                bytes.len()
            )));
        }

        let header = &bytes[..HEADER_LEN];
        let body = &bytes[PREFIX_LEN..];

        let expected =
            u32::from_be_bytes([bytes[7], bytes[8], bytes[9], bytes[10]]);
        let actual = checksum(header, body);
        if expected != actual {
            return Err(ProtocolError::ChecksumMismatch { expected, actual });
        }

        let declared = declared_len(header)?;
        if declared != body.len() {
            return Err(ProtocolError::Malformed(format!(
                "header declares {declared} payload bytes, frame carries {}",
                body.len()
            )));
        }

        let kind = FrameType::try_from(header[2])?;
        let seq = u16::from_be_bytes([header[0], header[1]]);

        let mut payload = body.to_vec();
        self.transform.invert(&mut payload);

        Ok(Frame { seq, kind, payload })
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(CaesarShift::default())
    }
}

impl fmt::Debug for FrameCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameCodec")
            .field("transform", &self.transform)
            .finish()
    }
}

/// Reads the payload length declared in a frame header.
///
/// Readers use this between the two read phases to learn how many body
/// bytes follow the prefix. The value is unverified until the whole frame
/// passes [`FrameCodec::decode`].
pub fn declared_len(header: &[u8]) -> Result<usize, ProtocolError> {
    if header.len() < HEADER_LEN {
        return Err(ProtocolError::Malformed(format!(
            "header is {} bytes, expected {HEADER_LEN}",
            header.len()
        )));
    }
    let len = u32::from_be_bytes([header[3], header[4], header[5], header[6]]);
    Ok(len as usize)
}

fn checksum(header: &[u8], body: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(header);
    hasher.update(body);
    hasher.finalize()
}
