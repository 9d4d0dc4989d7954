//! The authentication service: login, session checks and logout.
//!
//! A login attempt moves through these states:
//!
//! ```text
//! Received ──→ CredentialLookup ──(not found / store down)──→ RejectGeneric
//!                     │
//!                   found
//!                     ▼
//!               PasswordCheck ──(mismatch / corrupt hash)──→ RejectGeneric
//!                     │
//!                   match
//!                     ▼
//!               IssueSession ──→ Success
//! ```
//!
//! Every rejected path runs exactly one Argon2 verification, the same as
//! the success path, so response time does not reveal whether a username
//! exists.

use std::fmt;
use std::sync::Arc;

use lixlobby_protocol::UserId;
use tracing::Instrument;
use zeroize::Zeroizing;

use crate::{
    AuthError, CredentialStore, HashingConfig, PasswordVerifier, SessionConfig, SessionRegistry,
    SessionToken, StoredHash, VerifyError,
};

/// Longest username accepted, in bytes.
pub const MAX_USERNAME_LEN: usize = 64;

/// Longest password accepted, in bytes. Caps the work an attacker can
/// make one Argon2 call do.
pub const MAX_PASSWORD_LEN: usize = 1024;

/// A username/password pair for one login attempt.
///
/// The password buffer is wiped on drop and never printed.
pub struct Credential {
    pub username: String,
    password: Zeroizing<String>,
}

impl Credential {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: Zeroizing::new(password.into()),
        }
    }

    /// Rejects empty or oversized fields.
    fn check_shape(&self) -> Result<(), AuthError> {
        if self.username.is_empty() {
            return Err(AuthError::InvalidInput("username must not be empty".into()));
        }
        if self.password.is_empty() {
            return Err(AuthError::InvalidInput("password must not be empty".into()));
        }
        if self.username.len() > MAX_USERNAME_LEN {
            return Err(AuthError::InvalidInput(format!(
                "username longer than {MAX_USERNAME_LEN} bytes"
            )));
        }
        if self.password.len() > MAX_PASSWORD_LEN {
            return Err(AuthError::InvalidInput(format!(
                "password longer than {MAX_PASSWORD_LEN} bytes"
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Verifies credentials and manages the sessions they earn.
///
/// Generic over the [`CredentialStore`] so the storage backend is chosen
/// by whoever builds the service; there is no global database handle.
pub struct AuthService<S: CredentialStore> {
    store: S,
    verifier: Arc<PasswordVerifier>,
    registry: Arc<SessionRegistry>,
}

impl<S: CredentialStore> AuthService<S> {
    /// Builds a service with its own verifier and registry.
    ///
    /// # Errors
    /// [`VerifyError::Params`] if the hashing parameters are unusable.
    pub fn new(
        store: S,
        hashing: &HashingConfig,
        sessions: SessionConfig,
    ) -> Result<Self, VerifyError> {
        Ok(Self::from_parts(
            store,
            Arc::new(PasswordVerifier::new(hashing)?),
            Arc::new(SessionRegistry::new(sessions)),
        ))
    }

    /// Builds a service from existing parts, e.g. a registry shared with
    /// another component.
    pub fn from_parts(
        store: S,
        verifier: Arc<PasswordVerifier>,
        registry: Arc<SessionRegistry>,
    ) -> Self {
        Self {
            store,
            verifier,
            registry,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn verifier(&self) -> &Arc<PasswordVerifier> {
        &self.verifier
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Logs a user in and returns a fresh session token.
    ///
    /// # Errors
    /// - [`AuthError::InvalidInput`] — empty or oversized field; the store
    ///   is not consulted
    /// - [`AuthError::InvalidCredentials`] — unknown user or wrong password
    /// - [`AuthError::StoreUnavailable`] — the store could not answer
    /// - [`AuthError::CorruptRecord`] — the user's stored hash is unusable
    /// - [`AuthError::Internal`] — token collision or a crashed hash task
    ///
    /// Use [`AuthError::rejection`] before showing any of these to a
    /// client.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<SessionToken, AuthError> {
        self.authenticate_credential(Credential::new(username, password))
            .await
    }

    /// [`authenticate`](Self::authenticate) for an already built
    /// [`Credential`].
    pub async fn authenticate_credential(
        &self,
        credential: Credential,
    ) -> Result<SessionToken, AuthError> {
        if let Err(e) = credential.check_shape() {
            tracing::debug!(error = %e, "login rejected: bad input");
            return Err(e);
        }

        let span = tracing::info_span!("authenticate", username = %credential.username);
        self.run_login(credential).instrument(span).await
    }

    async fn run_login(&self, credential: Credential) -> Result<SessionToken, AuthError> {
        let Credential { username, password } = credential;

        let record = match self.store.lookup_by_name(&username).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                self.check_password(password, None).await?;
                tracing::info!("login rejected: invalid credentials (unknown user)");
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => {
                self.check_password(password, None).await?;
                tracing::error!(error = %e, "login rejected: credential store unavailable");
                return Err(AuthError::StoreUnavailable(e));
            }
        };

        let user_id = record.user_id;
        match self.check_password(password, Some(record.password_hash)).await? {
            Ok(true) => {}
            Ok(false) => {
                tracing::info!(%user_id, "login rejected: invalid credentials (wrong password)");
                return Err(AuthError::InvalidCredentials);
            }
            Err(source) => {
                tracing::error!(%user_id, error = %source, "login rejected: corrupt credential record");
                return Err(AuthError::CorruptRecord { user_id, source });
            }
        }

        let token = self.registry.issue(user_id).await?;
        tracing::info!(%user_id, "login succeeded");
        Ok(token)
    }

    /// Runs one Argon2 verification on the blocking pool.
    ///
    /// With no stored hash, verifies against the dummy hash instead and
    /// reports a mismatch. The plaintext is moved in and wiped when the
    /// closure finishes.
    async fn check_password(
        &self,
        password: Zeroizing<String>,
        stored: Option<StoredHash>,
    ) -> Result<Result<bool, VerifyError>, AuthError> {
        let verifier = Arc::clone(&self.verifier);
        tokio::task::spawn_blocking(move || match stored {
            Some(hash) => verifier.verify(&password, &hash),
            None => {
                verifier.verify_dummy(&password);
                Ok(false)
            }
        })
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "password check task failed");
            AuthError::Internal(format!("password check task failed: {e}"))
        })
    }

    /// Resolves a token string to the user it belongs to.
    ///
    /// Garbage, unknown, revoked and expired tokens all give
    /// [`AuthError::SessionInvalid`]. A successful check slides the
    /// session's expiry forward.
    pub async fn validate_session(&self, token: &str) -> Result<UserId, AuthError> {
        let Some(token) = SessionToken::parse(token) else {
            tracing::debug!("session check failed: malformed token");
            return Err(AuthError::SessionInvalid);
        };
        match self.registry.validate(&token).await {
            Some(user_id) => Ok(user_id),
            None => {
                tracing::debug!(token = %token.fingerprint(), "session check failed: unknown or expired");
                Err(AuthError::SessionInvalid)
            }
        }
    }

    /// Ends the session behind `token`. Unknown and malformed tokens are
    /// ignored, so calling this twice is fine.
    pub async fn logout(&self, token: &str) {
        match SessionToken::parse(token) {
            Some(token) => {
                self.registry.revoke(&token).await;
            }
            None => tracing::debug!("logout ignored: malformed token"),
        }
    }

    /// Ends every session `user_id` holds. Returns how many there were.
    pub async fn logout_everywhere(&self, user_id: UserId) -> usize {
        self.registry.revoke_user(user_id).await
    }
}
