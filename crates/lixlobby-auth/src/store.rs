//! Credential lookup: the one thing the auth core needs from user storage.
//!
//! The lobby's user table lives somewhere else (a SQL database in
//! production). The core never writes to it and only ever asks one
//! question: "give me the record for this name". [`CredentialStore`] is
//! that question as a trait, injected into
//! [`AuthService`](crate::AuthService) at construction.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;

use lixlobby_protocol::UserId;
use tokio::sync::RwLock;

use crate::StoreError;

/// A salted password hash in PHC string format, e.g.
/// `$argon2id$v=19$m=19456,t=2,p=1$<salt>$<hash>`.
///
/// The string embeds the algorithm, its parameters, the salt and the
/// derived hash, so verifying needs nothing but the plaintext.
#[derive(Clone, PartialEq, Eq)]
pub struct StoredHash(String);

impl StoredHash {
    pub fn new(phc: impl Into<String>) -> Self {
        Self(phc.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for StoredHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Hashes are offline-crackable; keep them out of logs.
        f.write_str("StoredHash(***)")
    }
}

/// One registered user, as the credential store hands it out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub user_id: UserId,
    pub name: String,
    pub password_hash: StoredHash,
}

/// Looks up user records by name.
///
/// Implementations must be safe to call from many tasks at once.
///
/// # Returns
/// - `Ok(Some(record))` — the user exists
/// - `Ok(None)` — no such user
/// - `Err(StoreError)` — the store could not answer
pub trait CredentialStore: Send + Sync + 'static {
    fn lookup_by_name(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<UserRecord>, StoreError>> + Send;
}

/// A [`CredentialStore`] held entirely in memory.
///
/// Used by the demo server and by tests. Names are matched exactly.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    users: RwLock<HashMap<String, UserRecord>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a record. Returns `false` and leaves the store unchanged if
    /// the name is already taken.
    pub async fn insert(&self, record: UserRecord) -> bool {
        let mut users = self.users.write().await;
        if users.contains_key(&record.name) {
            return false;
        }
        tracing::debug!(user_id = %record.user_id, name = %record.name, "user added");
        users.insert(record.name.clone(), record);
        true
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

impl CredentialStore for InMemoryCredentialStore {
    async fn lookup_by_name(&self, name: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.users.read().await.get(name).cloned())
    }
}
