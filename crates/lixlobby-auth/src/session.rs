//! Session types: configuration and the per-token record.

use std::time::Duration;

use lixlobby_protocol::UserId;
use serde::Deserialize;
use tokio::time::Instant;

use crate::SessionToken;

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Lifetime and housekeeping settings for sessions.
///
/// Expiry is sliding: every successful validation pushes `expires_at` out
/// to `now + session_ttl_secs`, but never past `issued_at +
/// max_lifetime_secs`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Idle lifetime of a session, in seconds. Default: 30 minutes.
    pub session_ttl_secs: u64,

    /// Absolute cap on a session's lifetime, in seconds. Default: 12 hours.
    pub max_lifetime_secs: u64,

    /// How often the background reaper sweeps out expired sessions, in
    /// seconds. Default: 60.
    pub reap_interval_secs: u64,

    /// Number of independently locked shards in the registry. Default: 16.
    pub shards: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_ttl_secs: 30 * 60,
            max_lifetime_secs: 12 * 60 * 60,
            reap_interval_secs: 60,
            shards: 16,
        }
    }
}

impl SessionConfig {
    pub const MAX_SHARDS: usize = 256;

    /// Upper bound for every duration setting: ten years. Larger values
    /// would overflow `Instant` arithmetic.
    pub const MAX_DURATION_SECS: u64 = 10 * 365 * 24 * 60 * 60;

    /// Clamps out-of-range values so the config is safe to use.
    ///
    /// Called by [`SessionRegistry::new`](crate::SessionRegistry::new).
    /// Rules:
    /// - Every duration at most `MAX_DURATION_SECS`.
    /// - `session_ttl_secs` at least 1, so `expires_at > issued_at` holds.
    /// - `max_lifetime_secs` at least `session_ttl_secs`.
    /// - `reap_interval_secs` at least 1.
    /// - `shards` within `1..=MAX_SHARDS`.
    pub fn validated(mut self) -> Self {
        for (name, value) in [
            ("session_ttl_secs", &mut self.session_ttl_secs),
            ("max_lifetime_secs", &mut self.max_lifetime_secs),
            ("reap_interval_secs", &mut self.reap_interval_secs),
        ] {
            if *value > Self::MAX_DURATION_SECS {
                tracing::warn!(
                    setting = name,
                    value = *value,
                    max = Self::MAX_DURATION_SECS,
                    "duration too large, capping it"
                );
                *value = Self::MAX_DURATION_SECS;
            }
        }
        if self.session_ttl_secs == 0 {
            tracing::warn!("session_ttl_secs is 0, using 1");
            self.session_ttl_secs = 1;
        }
        if self.max_lifetime_secs < self.session_ttl_secs {
            tracing::warn!(
                max_lifetime_secs = self.max_lifetime_secs,
                session_ttl_secs = self.session_ttl_secs,
                "max_lifetime_secs below session_ttl_secs, raising it"
            );
            self.max_lifetime_secs = self.session_ttl_secs;
        }
        if self.reap_interval_secs == 0 {
            tracing::warn!("reap_interval_secs is 0, using 1");
            self.reap_interval_secs = 1;
        }
        if !(1..=Self::MAX_SHARDS).contains(&self.shards) {
            let clamped = self.shards.clamp(1, Self::MAX_SHARDS);
            tracing::warn!(shards = self.shards, clamped, "shard count out of range");
            self.shards = clamped;
        }
        self
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs(self.max_lifetime_secs)
    }

    pub fn reap_interval(&self) -> Duration {
        Duration::from_secs(self.reap_interval_secs)
    }
}

// ---------------------------------------------------------------------------
// SessionRecord
// ---------------------------------------------------------------------------

/// The registry's record of one live session.
///
/// Times come from `tokio::time::Instant`, the runtime's monotonic clock,
/// so tests can pause and advance it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub token: SessionToken,
    pub user_id: UserId,
    pub issued_at: Instant,
    pub expires_at: Instant,
    pub last_seen_at: Instant,
}

impl SessionRecord {
    pub(crate) fn new(token: SessionToken, user_id: UserId, now: Instant, config: &SessionConfig) -> Self {
        Self {
            token,
            user_id,
            issued_at: now,
            expires_at: now + config.session_ttl(),
            last_seen_at: now,
        }
    }

    /// Whether the session is dead at `now`. A session expires exactly at
    /// `expires_at`.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    /// Slides the expiry forward after a successful validation.
    pub(crate) fn touch(&mut self, now: Instant, config: &SessionConfig) {
        let hard_cap = self.issued_at + config.max_lifetime();
        self.last_seen_at = now;
        self.expires_at = (now + config.session_ttl()).min(hard_cap);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(ttl: u64, cap: u64) -> SessionConfig {
        SessionConfig {
            session_ttl_secs: ttl,
            max_lifetime_secs: cap,
            ..SessionConfig::default()
        }
    }

    #[test]
    fn test_default_config_values() {
        let cfg = SessionConfig::default();
        assert_eq!(cfg.session_ttl(), Duration::from_secs(1800));
        assert_eq!(cfg.max_lifetime(), Duration::from_secs(43_200));
        assert_eq!(cfg.shards, 16);
    }

    #[test]
    fn test_validated_fixes_zero_ttl_and_low_cap() {
        let cfg = SessionConfig {
            session_ttl_secs: 0,
            max_lifetime_secs: 0,
            reap_interval_secs: 0,
            shards: 0,
        }
        .validated();
        assert_eq!(cfg.session_ttl_secs, 1);
        assert_eq!(cfg.max_lifetime_secs, 1);
        assert_eq!(cfg.reap_interval_secs, 1);
        assert_eq!(cfg.shards, 1);
    }

    #[test]
    fn test_validated_caps_shards() {
        let cfg = SessionConfig {
            shards: 10_000,
            ..SessionConfig::default()
        }
        .validated();
        assert_eq!(cfg.shards, SessionConfig::MAX_SHARDS);
    }

    #[test]
    fn test_validated_caps_huge_durations() {
        let cfg = SessionConfig {
            session_ttl_secs: u64::MAX,
            max_lifetime_secs: u64::MAX,
            reap_interval_secs: u64::MAX,
            shards: 4,
        }
        .validated();
        assert_eq!(cfg.session_ttl_secs, SessionConfig::MAX_DURATION_SECS);
        assert_eq!(cfg.max_lifetime_secs, SessionConfig::MAX_DURATION_SECS);
        assert_eq!(cfg.reap_interval_secs, SessionConfig::MAX_DURATION_SECS);

        let now = Instant::now();
        let mut rec = SessionRecord::new(SessionToken::generate(), UserId(1), now, &cfg);
        rec.touch(now + Duration::from_secs(5), &cfg);
        assert!(!rec.is_expired_at(now + Duration::from_secs(86_400)));
    }

    #[test]
    fn test_validated_caps_ttl_before_raising_lifetime() {
        let cfg = SessionConfig {
            session_ttl_secs: u64::MAX,
            max_lifetime_secs: 60,
            ..SessionConfig::default()
        }
        .validated();
        assert_eq!(cfg.session_ttl_secs, SessionConfig::MAX_DURATION_SECS);
        assert_eq!(cfg.max_lifetime_secs, SessionConfig::MAX_DURATION_SECS);
    }

    #[test]
    fn test_new_record_expires_after_ttl() {
        let cfg = config(60, 600);
        let now = Instant::now();
        let rec = SessionRecord::new(SessionToken::generate(), UserId(1), now, &cfg);
        assert!(rec.expires_at > rec.issued_at);
        assert!(!rec.is_expired_at(now + Duration::from_secs(59)));
        assert!(rec.is_expired_at(now + Duration::from_secs(60)));
    }

    #[test]
    fn test_touch_slides_expiry_up_to_cap() {
        let cfg = config(60, 100);
        let start = Instant::now();
        let mut rec = SessionRecord::new(SessionToken::generate(), UserId(1), start, &cfg);

        rec.touch(start + Duration::from_secs(30), &cfg);
        assert_eq!(rec.expires_at, start + Duration::from_secs(90));
        assert_eq!(rec.last_seen_at, start + Duration::from_secs(30));

        rec.touch(start + Duration::from_secs(80), &cfg);
        assert_eq!(
            rec.expires_at,
            start + Duration::from_secs(100),
            "expiry must never pass issued_at + max lifetime"
        );
    }
}
