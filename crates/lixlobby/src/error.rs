//! Unified error type for the lobby server.

use lixlobby_auth::{AuthError, VerifyError};
use lixlobby_protocol::ProtocolError;
use lixlobby_transport::TransportError;

use crate::ConfigError;

/// Top-level error that wraps the errors of every layer.
///
/// The `#[from]` attributes let `?` lift a sub-crate error straight into
/// a `LobbyError`.
#[derive(Debug, thiserror::Error)]
pub enum LobbyError {
    /// Binding, accepting, sending or receiving failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A frame could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The configured Argon2 parameters are unusable.
    #[error("password hashing setup failed: {0}")]
    Hashing(#[from] VerifyError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
