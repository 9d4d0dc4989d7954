//! The session registry: every live session token and who it belongs to.
//!
//! Responsibilities:
//! - issuing fresh tokens after a successful login
//! - answering "is this token a live session, and whose?"
//! - sliding a session's expiry forward on each successful check
//! - revoking tokens on logout
//! - sweeping out expired sessions in the background
//!
//! # Concurrency
//!
//! The map is split into shards, each behind its own
//! `tokio::sync::Mutex`, and a token always lives in the shard picked by
//! its first byte. Every operation locks exactly one shard except
//! [`revoke_user`](SessionRegistry::revoke_user) and the reaper, which
//! visit shards one at a time and never hold two locks at once. No lock
//! is ever held across password hashing or a store lookup; those happen
//! in [`AuthService`](crate::AuthService) before the registry is touched.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use lixlobby_protocol::UserId;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::{RegistryError, SessionConfig, SessionRecord, SessionToken};

type Shard = Mutex<HashMap<SessionToken, SessionRecord>>;

/// Thread-safe map from session token to [`SessionRecord`].
///
/// ## Lifecycle
///
/// ```text
/// issue() ──→ [live] ──validate()──→ [live, expiry slid forward]
///               │  │
///               │  └──(ttl or hard cap elapsed)──→ [expired] ──→ reaper / validate() removes
///               │
///               └──revoke()──→ gone
/// ```
pub struct SessionRegistry {
    config: SessionConfig,
    shards: Box<[Shard]>,
}

impl SessionRegistry {
    /// Creates an empty registry. The config is passed through
    /// [`SessionConfig::validated`] first.
    pub fn new(config: SessionConfig) -> Self {
        let config = config.validated();
        let shards = (0..config.shards).map(|_| Mutex::new(HashMap::new())).collect();
        Self { config, shards }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn shard(&self, token: &SessionToken) -> &Shard {
        &self.shards[token.shard(self.shards.len())]
    }

    /// Starts a new session for `user_id` and returns its token.
    ///
    /// # Errors
    /// [`RegistryError::TokenCollision`] if the fresh token is already
    /// live. That cannot happen with a working random source, so it is
    /// reported instead of retried.
    pub async fn issue(&self, user_id: UserId) -> Result<SessionToken, RegistryError> {
        let token = SessionToken::generate();
        let record = SessionRecord::new(token, user_id, Instant::now(), &self.config);

        let mut shard = self.shard(&token).lock().await;
        match shard.entry(token) {
            Entry::Occupied(_) => {
                tracing::error!(
                    %user_id,
                    token = %token.fingerprint(),
                    "session token collision, random source is suspect"
                );
                Err(RegistryError::TokenCollision)
            }
            Entry::Vacant(slot) => {
                slot.insert(record);
                tracing::info!(%user_id, token = %token.fingerprint(), "session issued");
                Ok(token)
            }
        }
    }

    /// Checks a token and returns the owner if the session is live.
    ///
    /// A live session has its `last_seen_at` updated and its expiry slid
    /// forward. An expired one is removed on the spot.
    pub async fn validate(&self, token: &SessionToken) -> Option<UserId> {
        let now = Instant::now();
        let mut shard = self.shard(token).lock().await;

        let record = shard.get_mut(token)?;
        if record.is_expired_at(now) {
            let user_id = record.user_id;
            shard.remove(token);
            tracing::debug!(%user_id, token = %token.fingerprint(), "session expired on validate");
            return None;
        }

        record.touch(now, &self.config);
        Some(record.user_id)
    }

    /// Ends a session immediately. Revoking an unknown or already revoked
    /// token is not an error.
    ///
    /// Returns `true` if a session was actually removed.
    pub async fn revoke(&self, token: &SessionToken) -> bool {
        let removed = self.shard(token).lock().await.remove(token);
        match removed {
            Some(record) => {
                tracing::info!(
                    user_id = %record.user_id,
                    token = %token.fingerprint(),
                    "session revoked"
                );
                true
            }
            None => false,
        }
    }

    /// Revokes every session belonging to `user_id`. Returns how many were
    /// removed.
    pub async fn revoke_user(&self, user_id: UserId) -> usize {
        let mut removed = 0;
        for shard in self.shards.iter() {
            let mut shard = shard.lock().await;
            let before = shard.len();
            shard.retain(|_, record| record.user_id != user_id);
            removed += before - shard.len();
        }
        if removed > 0 {
            tracing::info!(%user_id, removed, "all sessions revoked for user");
        }
        removed
    }

    /// A snapshot of the record behind `token`, without touching it.
    /// Expired records that the reaper has not swept yet are still
    /// returned.
    pub async fn get(&self, token: &SessionToken) -> Option<SessionRecord> {
        self.shard(token).lock().await.get(token).cloned()
    }

    /// One reaper pass: drops every expired record and returns how many
    /// were dropped.
    ///
    /// Locks one shard at a time and yields between shards, so a pass
    /// only ever blocks issue/validate on one shard for one scan of it.
    pub async fn reap_expired(&self) -> usize {
        let mut reaped = 0;
        for shard in self.shards.iter() {
            {
                let now = Instant::now();
                let mut shard = shard.lock().await;
                let before = shard.len();
                shard.retain(|_, record| !record.is_expired_at(now));
                reaped += before - shard.len();
            }
            tokio::task::yield_now().await;
        }
        if reaped > 0 {
            tracing::debug!(reaped, "expired sessions reaped");
        }
        reaped
    }

    /// Number of records held, including expired ones not yet reaped.
    pub async fn len(&self) -> usize {
        let mut total = 0;
        for shard in self.shards.iter() {
            total += shard.lock().await.len();
        }
        total
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Runs [`SessionRegistry::reap_expired`] every
/// [`SessionConfig::reap_interval`] until the returned handle is shut down
/// or dropped.
///
/// Missed ticks are skipped rather than bunched up.
pub fn spawn_reaper(registry: Arc<SessionRegistry>) -> ReaperHandle {
    let period = registry.config().reap_interval();
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::debug!(period_secs = period.as_secs(), "session reaper started");
        loop {
            ticker.tick().await;
            registry.reap_expired().await;
        }
    });
    ReaperHandle { task }
}

/// Owns the background reaper task. Dropping it stops the reaper.
pub struct ReaperHandle {
    task: JoinHandle<()>,
}

impl ReaperHandle {
    /// Stops the reaper.
    pub fn shutdown(self) {
        // Drop does the work.
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for ReaperHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
