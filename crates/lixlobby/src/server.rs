//! `LobbyServer` builder and accept loop.
//!
//! This is the entry point for running the lobby's authentication
//! server. It ties the layers together: transport → protocol → auth.

use std::sync::Arc;
use std::time::Duration;

use lixlobby_auth::{AuthService, CredentialStore, HashingConfig, SessionConfig, spawn_reaper};
use lixlobby_protocol::{Codec, JsonCodec};
use lixlobby_transport::{Transport, WebSocketTransport};

use crate::handler::handle_connection;
use crate::{LobbyConfig, LobbyError};

/// Shared server state handed to each connection task.
pub(crate) struct ServerState<S: CredentialStore, C: Codec> {
    pub(crate) auth: AuthService<S>,
    pub(crate) codec: C,
    pub(crate) idle_timeout: Duration,
}

/// Builder for configuring and starting a lobby server.
///
/// # Example
///
/// ```rust,no_run
/// use lixlobby::prelude::*;
///
/// # async fn start() -> Result<(), LobbyError> {
/// let server = LobbyServer::builder()
///     .config(LobbyConfig::load("config.toml")?)
///     .bind("0.0.0.0:8081")
///     .build(InMemoryCredentialStore::new())
///     .await?;
/// server.run().await
/// # }
/// ```
#[derive(Debug, Default)]
pub struct LobbyServerBuilder {
    config: LobbyConfig,
}

impl LobbyServerBuilder {
    /// Creates a builder with [`LobbyConfig::default`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole configuration. Call this before the finer
    /// setters, which override individual fields.
    pub fn config(mut self, config: LobbyConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.config.session = config;
        self
    }

    pub fn hashing_config(mut self, config: HashingConfig) -> Self {
        self.config.hashing = config;
        self
    }

    /// Binds the listener and builds the server around `store`.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    ///
    /// # Errors
    /// - [`LobbyError::Hashing`] if the Argon2 parameters are unusable
    /// - [`LobbyError::Transport`] if the address cannot be bound
    pub async fn build<S: CredentialStore>(
        self,
        store: S,
    ) -> Result<LobbyServer<S, JsonCodec>, LobbyError> {
        let auth = AuthService::new(store, &self.config.hashing, self.config.session.clone())?;
        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;

        let state = Arc::new(ServerState {
            auth,
            codec: JsonCodec,
            idle_timeout: self.config.idle_timeout(),
        });

        Ok(LobbyServer { transport, state })
    }
}

/// A lobby server bound to its address.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct LobbyServer<S: CredentialStore, C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<S, C>>,
}

impl LobbyServer<lixlobby_auth::InMemoryCredentialStore, JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> LobbyServerBuilder {
        LobbyServerBuilder::new()
    }
}

impl<S, C> LobbyServer<S, C>
where
    S: CredentialStore,
    C: Codec,
{
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// The authentication service every connection shares. Useful for
    /// provisioning users before [`run`](Self::run).
    pub fn auth(&self) -> &AuthService<S> {
        &self.state.auth
    }

    /// Runs the accept loop.
    ///
    /// Starts the session reaper, then spawns a handler task for each
    /// accepted socket. The WebSocket handshake runs inside that task, so
    /// a peer that stalls mid-handshake only ties up its own task.
    ///
    /// Runs until the process is terminated; the reaper stops when this
    /// future is dropped.
    pub async fn run(mut self) -> Result<(), LobbyError> {
        let _reaper = spawn_reaper(Arc::clone(self.state.auth.registry()));

        match self.transport.local_addr() {
            Ok(addr) => tracing::info!(%addr, "lobby server running"),
            Err(_) => tracing::info!("lobby server running"),
        }

        loop {
            match self.transport.accept().await {
                Ok(pending) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(pending, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
