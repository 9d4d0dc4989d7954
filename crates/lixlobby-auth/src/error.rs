//! Error types for the authentication layer.
//!
//! Each component has its own enum so the cause of a failure stays precise
//! inside the crate. [`AuthError`] is what [`AuthService`](crate::AuthService)
//! returns, and [`AuthError::rejection`] is the only view of it that may
//! cross the network boundary.

/// A [`CredentialStore`](crate::CredentialStore) could not answer.
///
/// "User not found" is NOT an error; stores return `Ok(None)` for that.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing database or service could not be reached.
    #[error("credential store unreachable: {0}")]
    Unavailable(String),

    /// The backend answered with something the store could not map to a
    /// [`UserRecord`](crate::UserRecord).
    #[error("credential store returned bad data: {0}")]
    Backend(String),
}

/// Failures of the password hasher itself, never "wrong password".
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    /// The stored hash could not be parsed, or names an algorithm or
    /// parameter set we cannot run.
    #[error("malformed stored password hash: {0}")]
    Malformed(String),

    /// Argon2 refused the configured cost parameters.
    #[error("invalid hashing parameters: {0}")]
    Params(String),

    /// Deriving a hash failed.
    #[error("password hashing failed: {0}")]
    Hashing(String),
}

/// Failures inside the [`SessionRegistry`](crate::SessionRegistry).
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// A freshly generated token matched a live one. With 256 random bits
    /// this means the random source is broken.
    #[error("generated session token collided with a live session")]
    TokenCollision,
}

/// Everything that can go wrong in an [`AuthService`](crate::AuthService)
/// call.
///
/// The variants keep the operational cause for logs. Callers facing the
/// network must go through [`AuthError::rejection`], which folds every
/// credential-related cause into one answer.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// A request field was empty, too long, or otherwise unusable.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Unknown username or wrong password. Deliberately carries no detail.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The credential store failed for infrastructure reasons.
    #[error(transparent)]
    StoreUnavailable(#[from] StoreError),

    /// The user's stored hash is unusable.
    #[error("corrupt credential record for user {user_id}: {source}")]
    CorruptRecord {
        user_id: lixlobby_protocol::UserId,
        #[source]
        source: VerifyError,
    },

    /// The session token is unknown, expired, revoked or malformed.
    #[error("session invalid or expired")]
    SessionInvalid,

    /// Something broke that no caller input can explain.
    #[error("internal authentication failure: {0}")]
    Internal(String),
}

impl From<RegistryError> for AuthError {
    fn from(err: RegistryError) -> Self {
        AuthError::Internal(err.to_string())
    }
}

/// The externally visible outcome of a failed call.
///
/// Three shapes only: the request was malformed, the login failed, or
/// the session is not valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    BadRequest,
    InvalidCredentials,
    SessionInvalid,
}

impl AuthError {
    /// Collapses this error to what a client is allowed to learn.
    pub fn rejection(&self) -> Rejection {
        match self {
            AuthError::InvalidInput(_) => Rejection::BadRequest,
            AuthError::InvalidCredentials
            | AuthError::StoreUnavailable(_)
            | AuthError::CorruptRecord { .. }
            | AuthError::Internal(_) => Rejection::InvalidCredentials,
            AuthError::SessionInvalid => Rejection::SessionInvalid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lixlobby_protocol::UserId;

    #[test]
    fn test_rejection_collapses_operational_causes() {
        let causes = [
            AuthError::InvalidCredentials,
            AuthError::StoreUnavailable(StoreError::Unavailable("db down".into())),
            AuthError::CorruptRecord {
                user_id: UserId(1),
                source: VerifyError::Malformed("bad phc".into()),
            },
            AuthError::Internal("collision".into()),
        ];
        for cause in &causes {
            assert_eq!(cause.rejection(), Rejection::InvalidCredentials, "{cause}");
        }
    }

    #[test]
    fn test_rejection_keeps_client_and_session_errors_distinct() {
        assert_eq!(
            AuthError::InvalidInput("empty".into()).rejection(),
            Rejection::BadRequest
        );
        assert_eq!(AuthError::SessionInvalid.rejection(), Rejection::SessionInvalid);
    }

    #[test]
    fn test_store_error_converts_with_question_mark() {
        fn lookup() -> Result<(), AuthError> {
            let store: Result<(), StoreError> =
                Err(StoreError::Unavailable("timeout".into()));
            store?;
            Ok(())
        }
        assert!(matches!(lookup(), Err(AuthError::StoreUnavailable(_))));
    }

    #[test]
    fn test_registry_error_maps_to_internal() {
        let err: AuthError = RegistryError::TokenCollision.into();
        assert!(matches!(err, AuthError::Internal(_)));
    }
}
