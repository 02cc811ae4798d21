//! Transport layer for Broadside.
//!
//! Provides the framed [`Connection`] that every other layer talks through,
//! and [`TcpTransport`], which accepts them.
//!
//! A connection reads in two phases: the fixed 11-byte prefix first, then
//! exactly as many payload bytes as the prefix declares. Each phase has its
//! own deadline. Whatever happens, a read ends in one [`Received`] value;
//! timeouts, hang-ups and corrupt frames are outcomes, not errors.

#![allow(async_fn_in_trait)]

mod connection;
mod error;
mod tcp;

pub use connection::{Connection, DEFAULT_SEND_TIMEOUT};
pub use error::TransportError;
pub use tcp::TcpTransport;

use std::fmt;

use broadside_protocol::{Frame, ProtocolError};

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// The outcome of one attempt to read a frame.
#[derive(Debug)]
pub enum Received {
    /// A complete, checksum-verified frame.
    Frame(Frame),
    /// Nothing complete arrived before the deadline. Bytes that did arrive
    /// are kept for the next read.
    TimedOut,
    /// The peer closed the stream.
    Closed,
    /// The connection was reset, aborted, or otherwise broke.
    Reset,
    /// A frame arrived but failed verification and was dropped.
    Corrupt(ProtocolError),
}

impl Received {
    /// The frame, if one arrived. Every other outcome maps to `None`.
    pub fn into_frame(self) -> Option<Frame> {
        match self {
            Self::Frame(frame) => Some(frame),
            _ => None,
        }
    }

    /// `true` when the connection is gone for good.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, Self::Closed | Self::Reset)
    }
}

/// Accepts new incoming connections.
pub trait Transport: Send + Sync + 'static {
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for and accepts the next incoming connection.
    async fn accept(&self) -> Result<Connection, Self::Error>;

    /// Returns the address the transport is listening on.
    fn local_addr(&self) -> std::io::Result<std::net::SocketAddr>;
}
