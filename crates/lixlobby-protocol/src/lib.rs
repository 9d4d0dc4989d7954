//! Wire protocol for the LixLobby server.
//!
//! - **Types** ([`Envelope`], [`LobbyMessage`], [`UserId`]) — what travels
//!   between a lobby client and the server.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how those messages
//!   become bytes.
//! - **Errors** ([`ProtocolError`]) — what can go wrong converting them.
//!
//! The protocol layer knows nothing about sockets or credentials. It sits
//! between them:
//!
//! ```text
//! Transport (frames) → Protocol (Envelope) → Auth (sessions)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{Envelope, LobbyMessage, Password, UserId, error_codes};
