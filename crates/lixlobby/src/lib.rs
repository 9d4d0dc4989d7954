//! # LixLobby
//!
//! Authentication server for the LixChess game lobby.
//!
//! Clients connect over WebSocket and exchange JSON envelopes. A client
//! logs in with a username and password and receives a session token;
//! other lobby services present that token to learn which user holds it.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lixlobby::prelude::*;
//!
//! # async fn start() -> Result<(), LobbyError> {
//! let server = LobbyServerBuilder::new()
//!     .bind("0.0.0.0:8081")
//!     .build(InMemoryCredentialStore::new())
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::{ConfigError, LobbyConfig};
pub use error::LobbyError;
pub use server::{LobbyServer, LobbyServerBuilder};

pub use lixlobby_auth as auth;
pub use lixlobby_protocol as protocol;
pub use lixlobby_transport as transport;

/// The types most programs embedding the server need.
pub mod prelude {
    pub use crate::{ConfigError, LobbyConfig, LobbyError, LobbyServer, LobbyServerBuilder};
    pub use lixlobby_auth::{
        AuthError, AuthService, CredentialStore, HashingConfig, InMemoryCredentialStore,
        SessionConfig, SessionToken, StoreError, StoredHash, UserRecord,
    };
    pub use lixlobby_protocol::{Envelope, LobbyMessage, Password, UserId, error_codes};
}
