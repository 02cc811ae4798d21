//! `BroadsideServer` builder and server loop.
//!
//! This is the entry point for running a Broadside server. It ties
//! together all the layers: transport → lobby → pairing → match.

use std::sync::Arc;
use std::time::Duration;

use broadside_match::{MatchConfig, MemorySnapshotStore, SnapshotStore};
use broadside_protocol::FrameCodec;
use broadside_transport::{TcpTransport, Transport};
use tokio::sync::watch;

use crate::gate::{SessionGate, SharedSessions};
use crate::lobby::classify;
use crate::pairing::{PairingQueue, Queued, run_pairing};
use crate::spectators::SpectatorSet;
use crate::{BroadsideError, LobbyConfig, ServerConfig};

/// Sent to spectators and queued players when the server stops.
pub const SHUTDOWN_MESSAGE: &str = "Server is shutting down. Disconnecting...";

/// Shared server state passed to each connection and match task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks.
pub(crate) struct ServerState {
    pub(crate) sessions: SharedSessions,
    pub(crate) spectators: Arc<SpectatorSet>,
    pub(crate) gate: Arc<SessionGate>,
    pub(crate) store: Arc<dyn SnapshotStore>,
    pub(crate) config: ServerConfig,
    pub(crate) queue: PairingQueue,
    shutdown: watch::Receiver<bool>,
}

impl ServerState {
    pub(crate) fn is_shutting_down(&self) -> bool {
        *self.shutdown.borrow()
    }
}

/// Builder for configuring and starting a Broadside server.
///
/// # Example
///
/// ```rust,no_run
/// use broadside::prelude::*;
///
/// # async fn start() -> Result<(), BroadsideError> {
/// let server = BroadsideServer::builder()
///     .bind("0.0.0.0:5005")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct BroadsideServerBuilder {
    config: ServerConfig,
    store: Option<Arc<dyn SnapshotStore>>,
}

impl BroadsideServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            store: None,
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Sets the rules every match is played with.
    pub fn match_config(mut self, config: MatchConfig) -> Self {
        self.config.match_config = config;
        self
    }

    pub fn lobby_config(mut self, config: LobbyConfig) -> Self {
        self.config.lobby = config;
        self
    }

    /// Sets the frame codec, and with it the payload transform.
    pub fn codec(mut self, codec: FrameCodec) -> Self {
        self.config.codec = codec;
        self
    }

    pub fn send_timeout(mut self, timeout: Duration) -> Self {
        self.config.send_timeout = timeout;
        self
    }

    /// Sets where match snapshots go. Defaults to memory.
    pub fn snapshot_store(mut self, store: impl SnapshotStore) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    /// Validates the configuration and binds the listener.
    pub async fn build(self) -> Result<BroadsideServer, BroadsideError> {
        self.config.match_config.validate()?;

        let transport = TcpTransport::bind(&self.config.bind_addr, self.config.codec.clone())
            .await?
            .with_send_timeout(self.config.send_timeout);

        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemorySnapshotStore::new()));
        let sessions = SharedSessions::default();
        let (queue, pairing_rx) = PairingQueue::channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let state = Arc::new(ServerState {
            gate: Arc::new(SessionGate::new(Arc::clone(&sessions))),
            sessions,
            spectators: Arc::new(SpectatorSet::new()),
            store,
            config: self.config,
            queue,
            shutdown: shutdown_rx,
        });

        Ok(BroadsideServer {
            transport,
            state,
            pairing_rx,
            shutdown: Arc::new(shutdown_tx),
        })
    }
}

impl Default for BroadsideServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Stops a running server from another task.
#[derive(Debug, Clone)]
pub struct ServerHandle {
    shutdown: Arc<watch::Sender<bool>>,
}

impl ServerHandle {
    /// Asks the server to stop accepting and say goodbye to everyone not
    /// in a match. Matches already running play on.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }
}

/// A bound Broadside server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct BroadsideServer {
    transport: TcpTransport,
    state: Arc<ServerState>,
    pairing_rx: tokio::sync::mpsc::UnboundedReceiver<Queued>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl BroadsideServer {
    /// Creates a new builder.
    pub fn builder() -> BroadsideServerBuilder {
        BroadsideServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            shutdown: Arc::clone(&self.shutdown),
        }
    }

    /// Runs the server accept loop.
    ///
    /// Accepts incoming connections and spawns a classification task for
    /// each one. Runs until [`ServerHandle::shutdown`] is called.
    pub async fn run(self) -> Result<(), BroadsideError> {
        let addr = self.local_addr().map(|a| a.to_string()).unwrap_or_default();
        tracing::info!(%addr, "Broadside server running");

        let mut shutdown = self.shutdown.subscribe();
        let pairing = tokio::spawn(run_pairing(
            self.pairing_rx,
            Arc::clone(&self.state),
            shutdown.clone(),
        ));

        loop {
            if *shutdown.borrow_and_update() {
                break;
            }
            tokio::select! {
                accepted = self.transport.accept() => match accepted {
                    Ok(conn) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            if let Err(e) = classify(conn, state).await {
                                tracing::debug!(
                                    error = %e,
                                    "connection ended with error"
                                );
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Broadside server shutting down");
        drop(self.transport);
        self.state.spectators.close_all(SHUTDOWN_MESSAGE).await;
        if let Err(e) = pairing.await {
            tracing::error!(error = %e, "pairing task failed");
        }
        Ok(())
    }
}
