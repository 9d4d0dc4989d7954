//! Server configuration, loadable from a TOML file.
//!
//! Every key is optional. A missing key takes its default, so an empty
//! file is a valid config:
//!
//! ```toml
//! bind_addr = "0.0.0.0:8081"
//! idle_timeout_secs = 15
//!
//! [session]
//! session_ttl_secs = 1800
//! max_lifetime_secs = 43200
//! reap_interval_secs = 60
//! shards = 16
//!
//! [hashing]
//! memory_kib = 19456
//! iterations = 2
//! parallelism = 1
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use lixlobby_auth::{HashingConfig, SessionConfig};
use serde::Deserialize;

/// Errors from reading or parsing a config file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration for a [`LobbyServer`](crate::LobbyServer).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LobbyConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: String,

    /// A connection that sends nothing for this long is dropped.
    pub idle_timeout_secs: u64,

    pub session: SessionConfig,

    pub hashing: HashingConfig,
}

impl Default for LobbyConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8081".to_string(),
            idle_timeout_secs: 15,
            session: SessionConfig::default(),
            hashing: HashingConfig::default(),
        }
    }
}

impl LobbyConfig {
    /// Parses a config from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Reads and parses the TOML file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    pub fn idle_timeout(&self) -> Duration {
        // A zero timeout would drop every client before its first frame.
        Duration::from_secs(self.idle_timeout_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_toml_str_empty_gives_defaults() {
        let config = LobbyConfig::from_toml_str("").unwrap();
        assert_eq!(config, LobbyConfig::default());
        assert_eq!(config.session.session_ttl_secs, 1800);
        assert_eq!(config.hashing.memory_kib, 19456);
    }

    #[test]
    fn test_from_toml_str_partial_sections_keep_other_defaults() {
        let config = LobbyConfig::from_toml_str(
            r#"
            bind_addr = "0.0.0.0:9000"

            [session]
            session_ttl_secs = 600
            "#,
        )
        .unwrap();

        assert_eq!(config.bind_addr, "0.0.0.0:9000");
        assert_eq!(config.idle_timeout_secs, 15);
        assert_eq!(config.session.session_ttl_secs, 600);
        assert_eq!(config.session.max_lifetime_secs, 43200);
        assert_eq!(config.hashing, HashingConfig::default());
    }

    #[test]
    fn test_from_toml_str_wrong_type_is_parse_error() {
        let result = LobbyConfig::from_toml_str("idle_timeout_secs = \"soon\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let result = LobbyConfig::load("/definitely/not/here/lobby.toml");
        match result {
            Err(ConfigError::Io { path, .. }) => {
                assert!(path.ends_with("lobby.toml"));
            }
            other => panic!("expected Io error, got {other:?}"),
        }
    }

    #[test]
    fn test_load_reads_file_from_disk() {
        let path = std::env::temp_dir().join(format!("lixlobby-config-{}.toml", std::process::id()));
        std::fs::write(&path, "idle_timeout_secs = 30\n[hashing]\niterations = 3\n").unwrap();

        let config = LobbyConfig::load(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(config.idle_timeout(), Duration::from_secs(30));
        assert_eq!(config.hashing.iterations, 3);
    }

    #[test]
    fn test_idle_timeout_zero_is_raised_to_one_second() {
        let config = LobbyConfig {
            idle_timeout_secs: 0,
            ..LobbyConfig::default()
        };
        assert_eq!(config.idle_timeout(), Duration::from_secs(1));
    }
}
