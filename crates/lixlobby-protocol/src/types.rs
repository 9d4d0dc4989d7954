//! Message types exchanged between lobby clients and the server.
//!
//! Every frame on the wire is one [`Envelope`]. The envelope carries a
//! sequence number and a timestamp on the outside and one
//! [`LobbyMessage`] inside.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// The stable identifier of a registered lobby user.
///
/// Serialized as a plain number (`#[serde(transparent)]`), so
/// `UserId(42)` is `42` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Password
// ---------------------------------------------------------------------------

/// A plaintext password as submitted by a client.
///
/// Exists only so that `{:?}` on a decoded message can never print the
/// secret. The server copies it into a zeroizing buffer as soon as the
/// message is dispatched.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Password(String);

impl Password {
    pub fn new(plaintext: impl Into<String>) -> Self {
        Self(plaintext.into())
    }

    /// Hands the plaintext over, consuming the wrapper.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(***)")
    }
}

// ---------------------------------------------------------------------------
// LobbyMessage
// ---------------------------------------------------------------------------

/// HTTP-style codes carried by [`LobbyMessage::Error`].
pub mod error_codes {
    /// The request was malformed, had empty fields, or is not a message
    /// clients may send.
    pub const BAD_REQUEST: u16 = 400;
}

/// Everything a lobby client and the server can say to each other.
///
/// Internally tagged, so a login request looks like:
///
/// ```json
/// { "type": "Authenticate", "username": "alice", "password": "..." }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LobbyMessage {
    // -- Authentication --

    /// Client → Server: log in with a username and password.
    Authenticate { username: String, password: Password },

    /// Server → Client: outcome of an `Authenticate`.
    ///
    /// `session_token` is present iff `success` is true. A failed login
    /// never says why it failed.
    AuthResult {
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_token: Option<String>,
    },

    // -- Sessions --

    /// Lobby service → Server: is this token still a live session?
    ValidateSession { token: String },

    /// Server → Lobby service: answer to `ValidateSession`.
    /// `user_id` is present iff `valid` is true.
    SessionStatus {
        valid: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user_id: Option<UserId>,
    },

    /// Client → Server: end this session.
    Logout { token: String },

    /// Server → Client: the session is gone (or never existed).
    LoggedOut,

    // -- Keep-alive --

    /// Client → Server: still here. The server echoes `client_time`.
    Heartbeat { client_time: u64 },

    /// Server → Client: answer to `Heartbeat`.
    HeartbeatAck { client_time: u64, server_time: u64 },

    /// Either direction: closing the connection.
    Disconnect { reason: String },

    // -- Errors --

    /// Server → Client: the request could not be processed.
    /// See [`error_codes`].
    Error { code: u16, message: String },
}

impl LobbyMessage {
    /// The `"type"` tag this message carries on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            LobbyMessage::Authenticate { .. } => "Authenticate",
            LobbyMessage::AuthResult { .. } => "AuthResult",
            LobbyMessage::ValidateSession { .. } => "ValidateSession",
            LobbyMessage::SessionStatus { .. } => "SessionStatus",
            LobbyMessage::Logout { .. } => "Logout",
            LobbyMessage::LoggedOut => "LoggedOut",
            LobbyMessage::Heartbeat { .. } => "Heartbeat",
            LobbyMessage::HeartbeatAck { .. } => "HeartbeatAck",
            LobbyMessage::Disconnect { .. } => "Disconnect",
            LobbyMessage::Error { .. } => "Error",
        }
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// The top-level frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Per-sender sequence number, incremented on every frame.
    pub seq: u64,

    /// Milliseconds since the sender's connection started.
    pub timestamp: u64,

    pub message: LobbyMessage,
}

impl Envelope {
    pub fn new(seq: u64, timestamp: u64, message: LobbyMessage) -> Self {
        Self {
            seq,
            timestamp,
            message,
        }
    }
}
