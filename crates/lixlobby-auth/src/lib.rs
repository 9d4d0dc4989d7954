//! Credential verification and session issuance for the LixLobby server.
//!
//! This crate answers two questions for the rest of the lobby:
//!
//! 1. **Is this caller who they claim to be?** — [`AuthService::authenticate`]
//!    looks the username up in a [`CredentialStore`], checks the password
//!    with the [`PasswordVerifier`] (Argon2id, constant-time compare) and
//!    on success issues a [`SessionToken`].
//! 2. **Is this token still a live session?** —
//!    [`AuthService::validate_session`] resolves a token to its
//!    [`UserId`] through the [`SessionRegistry`].
//!
//! # How it fits in the stack
//!
//! ```text
//! Server (above)  ← decodes requests, renders AuthError::rejection()
//!     ↕
//! Auth (this crate)  ← credentials, password hashing, sessions
//!     ↕
//! CredentialStore (injected)  ← wherever user records actually live
//! ```

mod error;
mod password;
mod registry;
mod service;
mod session;
mod store;
mod token;

pub use error::{AuthError, RegistryError, Rejection, StoreError, VerifyError};
pub use lixlobby_protocol::UserId;
pub use password::{HashingConfig, PasswordVerifier};
pub use registry::{ReaperHandle, SessionRegistry, spawn_reaper};
pub use service::{AuthService, Credential, MAX_PASSWORD_LEN, MAX_USERNAME_LEN};
pub use session::{SessionConfig, SessionRecord};
pub use store::{CredentialStore, InMemoryCredentialStore, StoredHash, UserRecord};
pub use token::{MalformedToken, SessionToken, TOKEN_BYTES};
