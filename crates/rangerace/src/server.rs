//! Server builder and accept loop.

use std::net::SocketAddr;
use std::time::Duration;

use rangerace_game::{Coordinator, CoordinatorHandle, GameConfig};
use rangerace_transport::WebSocketTransport;

use crate::ServerError;
use crate::handler::handle_connection;

/// Builder for configuring and starting a rangerace server.
pub struct ServerBuilder {
    bind_addr: String,
    ws_path: String,
    write_deadline: Duration,
    game: GameConfig,
}

impl ServerBuilder {
    /// Creates a builder with the default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            ws_path: "/ws".to_string(),
            write_deadline: Duration::from_secs(10),
            game: GameConfig::default(),
        }
    }

    /// Sets the address to bind the listener to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the HTTP path clients upgrade on. Defaults to `/ws`.
    pub fn ws_path(mut self, path: &str) -> Self {
        self.ws_path = path.to_string();
        self
    }

    /// Bounds each per-client socket write. Defaults to 10 seconds.
    pub fn write_deadline(mut self, deadline: Duration) -> Self {
        self.write_deadline = deadline;
        self
    }

    /// Overrides the game rules and timings.
    pub fn game_config(mut self, config: GameConfig) -> Self {
        self.game = config;
        self
    }

    /// Binds the listener and spawns the pool coordinator.
    pub async fn build(self) -> Result<Server, ServerError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;
        let coordinator = Coordinator::spawn(self.game);
        Ok(Server {
            transport,
            coordinator,
            ws_path: self.ws_path,
            write_deadline: self.write_deadline,
        })
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running rangerace server.
///
/// Created by [`ServerBuilder::build`]; call [`run`](Self::run) to start
/// accepting connections.
pub struct Server {
    transport: WebSocketTransport,
    coordinator: CoordinatorHandle,
    ws_path: String,
    write_deadline: Duration,
}

impl Server {
    /// Creates a new builder.
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.transport.local_addr()?)
    }

    /// A handle to the pool coordinator, for snapshots and broadcasts.
    pub fn coordinator(&self) -> CoordinatorHandle {
        self.coordinator.clone()
    }

    /// Runs the accept loop.
    ///
    /// Every incoming connection gets its own task that performs the
    /// WebSocket upgrade and serves the client until it disconnects. Fails
    /// only when the listener itself fails; per-connection errors stay in
    /// their own task.
    pub async fn run(self) -> Result<(), ServerError> {
        tracing::info!(path = %self.ws_path, "rangerace server running");

        loop {
            let pending = match self.transport.accept().await {
                Ok(pending) => pending,
                Err(e) => {
                    tracing::error!(error = %e, "accept failed, shutting down");
                    return Err(e.into());
                }
            };
            let coordinator = self.coordinator.clone();
            let path = self.ws_path.clone();
            let deadline = self.write_deadline;
            tokio::spawn(async move {
                if let Err(e) = handle_connection(pending, coordinator, path, deadline).await {
                    tracing::debug!(error = %e, "connection ended with error");
                }
            });
        }
    }
}
