//! Framed connection over any byte stream.

use std::io::ErrorKind;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU64, Ordering};
use std::time::Duration;

use broadside_protocol::{
    FrameCodec, FrameType, MAX_PAYLOAD_LEN, PREFIX_LEN, ProtocolError,
    declared_len,
};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::{ConnectionId, Received, TransportError};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// How long a single send may take before the peer is treated as dead.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(2);

const READ_CHUNK: usize = 4096;

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Read half plus the bytes received so far that don't yet form a frame.
///
/// Keeping the partial bytes here (instead of inside a `read_exact` future)
/// means a read that times out halfway loses nothing.
struct FrameReader {
    stream: BoxedReader,
    buffer: Vec<u8>,
}

impl FrameReader {
    /// Reads until at least `needed` bytes are buffered or the deadline
    /// passes. On failure, returns the outcome the caller should report.
    async fn fill_to(
        &mut self,
        needed: usize,
        deadline: Instant,
    ) -> Result<(), Received> {
        let mut chunk = [0u8; READ_CHUNK];
        while self.buffer.len() < needed {
            let want = (needed - self.buffer.len()).min(READ_CHUNK);
            let read = tokio::time::timeout_at(
                deadline,
                self.stream.read(&mut chunk[..want]),
            )
            .await;
            match read {
                Err(_) => return Err(Received::TimedOut),
                Ok(Ok(0)) => return Err(Received::Closed),
                Ok(Ok(n)) => self.buffer.extend_from_slice(&chunk[..n]),
                Ok(Err(e)) => return Err(classify_read_error(&e)),
            }
        }
        Ok(())
    }
}

/// A single framed connection to a client.
///
/// Reads and writes are independent: one task may wait for input while
/// another broadcasts to the same connection. Outbound frames are numbered
/// from a per-connection counter that wraps at `u16::MAX`.
pub struct Connection {
    id: ConnectionId,
    peer: String,
    codec: FrameCodec,
    reader: Mutex<FrameReader>,
    writer: Mutex<BoxedWriter>,
    next_seq: AtomicU16,
    send_timeout: Duration,
    closed: AtomicBool,
}

impl Connection {
    /// Wraps any bidirectional byte stream.
    ///
    /// `peer` is used only for logging. Tests pass one end of a
    /// `tokio::io::duplex` pair here.
    pub fn from_stream<S>(stream: S, codec: FrameCodec, peer: impl Into<String>) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, write_half) = tokio::io::split(stream);
        let id =
            ConnectionId::new(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed));
        Self {
            id,
            peer: peer.into(),
            codec,
            reader: Mutex::new(FrameReader {
                stream: Box::new(read_half),
                buffer: Vec::new(),
            }),
            writer: Mutex::new(Box::new(write_half)),
            next_seq: AtomicU16::new(0),
            send_timeout: DEFAULT_SEND_TIMEOUT,
            closed: AtomicBool::new(false),
        }
    }

    /// Overrides the per-send deadline.
    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    /// Returns the unique identifier for this connection.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// The remote address, as given when the connection was created.
    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Reads the next frame, waiting at most `wait` for each read phase.
    ///
    /// A declared length above [`MAX_PAYLOAD_LEN`] is reported as
    /// `Corrupt` without reading the body; the stream is very likely out
    /// of step after that, and later reads will say so.
    pub async fn recv_frame(&self, wait: Duration) -> Received {
        let mut reader = self.reader.lock().await;

        if let Err(outcome) =
            reader.fill_to(PREFIX_LEN, Instant::now() + wait).await
        {
            return outcome;
        }

        let len = match declared_len(&reader.buffer[..PREFIX_LEN]) {
            Ok(len) => len,
            Err(e) => return Received::Corrupt(e),
        };
        if len > MAX_PAYLOAD_LEN {
            reader.buffer.drain(..PREFIX_LEN);
            tracing::debug!(conn_id = %self.id, len, "oversized frame dropped");
            return Received::Corrupt(ProtocolError::Malformed(format!(
                "declared payload of {len} bytes exceeds {MAX_PAYLOAD_LEN}"
            )));
        }

        let total = PREFIX_LEN + len;
        if let Err(outcome) = reader.fill_to(total, Instant::now() + wait).await {
            return outcome;
        }

        let bytes: Vec<u8> = reader.buffer.drain(..total).collect();
        match self.codec.decode(&bytes) {
            Ok(frame) => Received::Frame(frame),
            Err(e) => {
                tracing::debug!(conn_id = %self.id, error = %e, "frame dropped");
                Received::Corrupt(e)
            }
        }
    }

    /// Sends a text frame, numbered from this connection's counter.
    pub async fn send_frame(
        &self,
        kind: FrameType,
        text: &str,
    ) -> Result<(), TransportError> {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.send_frame_with_seq(seq, kind, text.as_bytes()).await
    }

    /// Sends a frame with an explicit sequence number.
    ///
    /// The whole write is bounded by the send timeout, so a peer that
    /// stops reading cannot stall the caller.
    pub async fn send_frame_with_seq(
        &self,
        seq: u16,
        kind: FrameType,
        payload: &[u8],
    ) -> Result<(), TransportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::ConnectionClosed(self.id.to_string()));
        }
        let bytes = self.codec.encode(seq, kind, payload)?;

        let mut writer = self.writer.lock().await;
        let write = async {
            writer.write_all(&bytes).await?;
            writer.flush().await
        };
        match tokio::time::timeout(self.send_timeout, write).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(TransportError::SendFailed(e)),
            Err(_) => Err(TransportError::Timeout(self.send_timeout)),
        }
    }

    /// Shuts down the write side. Later sends fail; safe to call twice.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let mut writer = self.writer.lock().await;
        let _ = tokio::time::timeout(self.send_timeout, writer.shutdown()).await;
        tracing::debug!(conn_id = %self.id, peer = %self.peer, "connection closed");
    }

    /// `true` once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("peer", &self.peer)
            .finish_non_exhaustive()
    }
}

fn classify_read_error(e: &std::io::Error) -> Received {
    match e.kind() {
        ErrorKind::UnexpectedEof => Received::Closed,
        _ => Received::Reset,
    }
}
