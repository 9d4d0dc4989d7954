//! Network transport for the LixLobby server.
//!
//! Lobby clients connect over WebSocket and exchange text frames. This
//! crate hides the socket plumbing behind two small traits:
//!
//! - [`Transport`] accepts new clients.
//! - [`PendingConnection`] is an accepted socket that has not finished
//!   its upgrade handshake yet.
//! - [`Connection`] sends and receives whole frames for one client.
//!
//! The rest of the workspace only ever sees byte slices, so the protocol
//! layer decides what a frame means.
//!
//! # Feature Flags
//!
//! - `websocket` (default) — WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{PendingWebSocket, WebSocketConnection, WebSocketTransport};

use std::fmt;
use std::net::SocketAddr;

/// Identifies one accepted client connection in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Accepts incoming lobby clients.
pub trait Transport: Send + Sync + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;

    /// An accepted socket still waiting for its handshake.
    type Pending: PendingConnection<Connection = Self::Connection>;

    /// Waits for the next client socket.
    ///
    /// Does not read from the socket, so a peer that never sends its
    /// handshake cannot hold up the accept loop. Finish the handshake
    /// with [`PendingConnection::upgrade`] in the client's own task.
    async fn accept(&mut self) -> Result<Self::Pending, TransportError>;

    /// The address the listener is bound to.
    fn local_addr(&self) -> std::io::Result<SocketAddr>;
}

/// A client socket between accept and a completed handshake.
pub trait PendingConnection: Send + 'static {
    type Connection: Connection;

    fn id(&self) -> ConnectionId;

    fn peer_addr(&self) -> SocketAddr;

    /// Runs the upgrade handshake. Callers should bound this with a
    /// timeout; a silent peer never completes it.
    async fn upgrade(self) -> Result<Self::Connection, TransportError>;
}

/// One client connection.
pub trait Connection: Send + Sync + 'static {
    /// Sends one frame to the client.
    async fn send(&self, data: &[u8]) -> Result<(), TransportError>;

    /// Receives the next frame.
    ///
    /// Returns `Ok(None)` once the client has closed the connection.
    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError>;

    /// Closes the connection with a normal close frame.
    async fn close(&self) -> Result<(), TransportError>;

    fn id(&self) -> ConnectionId;

    fn peer_addr(&self) -> SocketAddr;
}
