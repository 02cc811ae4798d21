//! TCP transport: a listener that hands out framed connections.

use std::time::Duration;

use broadside_protocol::FrameCodec;
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};

use crate::{Connection, DEFAULT_SEND_TIMEOUT, Transport, TransportError};

/// A TCP [`Transport`] that listens for incoming connections.
///
/// Every accepted connection shares the transport's codec.
pub struct TcpTransport {
    listener: TcpListener,
    codec: FrameCodec,
    send_timeout: Duration,
}

impl TcpTransport {
    /// Binds a new TCP transport to the given address.
    pub async fn bind(
        addr: &str,
        codec: FrameCodec,
    ) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, "TCP transport listening");
        Ok(Self {
            listener,
            codec,
            send_timeout: DEFAULT_SEND_TIMEOUT,
        })
    }

    /// Sets the send deadline applied to accepted connections.
    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    /// Opens a client connection to a listening server.
    pub async fn connect(
        addr: impl ToSocketAddrs,
        codec: FrameCodec,
    ) -> Result<Connection, TransportError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(TransportError::ConnectFailed)?;
        let peer = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".into());
        let _ = stream.set_nodelay(true);
        Ok(Connection::from_stream(stream, codec, peer))
    }
}

impl Transport for TcpTransport {
    type Error = TransportError;

    async fn accept(&self) -> Result<Connection, Self::Error> {
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;
        let _ = stream.set_nodelay(true);

        let conn = Connection::from_stream(stream, self.codec.clone(), addr.to_string())
            .with_send_timeout(self.send_timeout);
        tracing::debug!(conn_id = %conn.id(), %addr, "accepted TCP connection");
        Ok(conn)
    }

    fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }
}
