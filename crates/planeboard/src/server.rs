//! `PlaneboardServer` builder and accept loop.
//!
//! This is the entry point for running a table server. It ties the
//! layers together: transport → adapter → room directory → room actors.

use std::sync::Arc;
use std::time::Duration;

use planeboard_protocol::{Codec, JsonCodec};
use planeboard_room::{DeckResolver, RoomConfig, RoomDirectory};
use planeboard_transport::{Transport, TransportError, WebSocketTransport};

use crate::archidekt::ArchidektResolver;
use crate::config::ServerConfig;
use crate::handler::handle_connection;
use crate::PlaneboardError;

/// Query parameters an upgrade request must carry.
const REQUIRED_PARAMS: &[&str] = &["room"];

/// Shared server state passed to each connection task.
pub(crate) struct ServerState<R: DeckResolver, C: Codec> {
    pub(crate) rooms: RoomDirectory<R>,
    pub(crate) codec: C,
    pub(crate) read_timeout: Duration,
    pub(crate) heartbeat_interval: Duration,
}

/// Builder for configuring and starting a Planeboard server.
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use planeboard::prelude::*;
///
/// # async fn start() -> Result<(), PlaneboardError> {
/// let resolver = ArchidektResolver::new(Duration::from_secs(10))?;
/// let server = PlaneboardServer::builder()
///     .bind("0.0.0.0:8080")
///     .build(resolver)
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct PlaneboardServerBuilder {
    config: ServerConfig,
}

impl PlaneboardServerBuilder {
    /// Creates a builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Replaces every setting at once, e.g. one built from [`Cli`](crate::Cli).
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Sets how long a connection may stay silent before it is dropped.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = timeout;
        self
    }

    /// Sets the configuration every room is created with.
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.config.room = config;
        self
    }

    /// Binds the listener. Decks are resolved through `resolver`.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build<R: DeckResolver>(
        self,
        resolver: R,
    ) -> Result<PlaneboardServer<R, JsonCodec>, PlaneboardError> {
        let transport = WebSocketTransport::bind(&self.config.bind_addr)
            .await?
            .with_required_params(REQUIRED_PARAMS);

        let state = Arc::new(ServerState {
            rooms: RoomDirectory::new(resolver, self.config.room.clone()),
            codec: JsonCodec,
            read_timeout: self.config.read_timeout,
            heartbeat_interval: self.config.heartbeat_interval(),
        });

        Ok(PlaneboardServer { transport, state })
    }
}

impl Default for PlaneboardServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Planeboard server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct PlaneboardServer<R: DeckResolver = ArchidektResolver, C: Codec = JsonCodec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<R, C>>,
}

impl PlaneboardServer {
    /// Creates a new builder.
    pub fn builder() -> PlaneboardServerBuilder {
        PlaneboardServerBuilder::new()
    }
}

impl<R: DeckResolver, C: Codec> PlaneboardServer<R, C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the accept loop, spawning one task per connection. Runs until
    /// the process is terminated.
    pub async fn run(mut self) -> Result<(), PlaneboardError> {
        tracing::info!("Planeboard server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(
                                error = %e,
                                "connection ended with error"
                            );
                        }
                    });
                }
                Err(e @ TransportError::MissingParam(_)) => {
                    tracing::debug!(error = %e, "upgrade rejected");
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
