use std::time::Duration;

use broadside_protocol::ProtocolError;

/// Errors that can occur in the transport layer.
///
/// Only sends, binds and connects produce these. Reads report their
/// outcome as a [`Received`](crate::Received) value instead.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection was already closed locally.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// The peer did not accept the whole frame in time.
    #[error("send timed out after {0:?}")]
    Timeout(Duration),

    /// The frame could not be encoded.
    #[error("encode failed: {0}")]
    Encode(#[from] ProtocolError),

    /// Binding or accepting connections failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// Connecting to a remote listener failed.
    #[error("connect failed: {0}")]
    ConnectFailed(#[source] std::io::Error),
}
