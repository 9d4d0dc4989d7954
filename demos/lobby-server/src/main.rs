use std::path::Path;

use lixlobby::prelude::*;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "config.toml";

/// Users every demo server starts with.
const DEMO_USERS: &[(u64, &str, &str)] = &[
    (1, "alice", "correct-horse"),
    (2, "bob", "battery-staple"),
];

/// Reads the config named on the command line, else `config.toml` if it
/// exists, else the defaults.
fn load_config() -> Result<LobbyConfig, ConfigError> {
    match std::env::args().nth(1) {
        Some(path) => LobbyConfig::load(path),
        None if Path::new(DEFAULT_CONFIG).exists() => LobbyConfig::load(DEFAULT_CONFIG),
        None => Ok(LobbyConfig::default()),
    }
}

async fn seed_demo_users<C>(
    server: &LobbyServer<InMemoryCredentialStore, C>,
) -> Result<(), LobbyError>
where
    C: lixlobby::protocol::Codec,
{
    for &(id, name, password) in DEMO_USERS {
        let password_hash = server.auth().verifier().hash_password(password)?;
        let record = UserRecord {
            user_id: UserId(id),
            name: name.to_string(),
            password_hash,
        };
        if server.auth().store().insert(record).await {
            tracing::info!(user_id = %UserId(id), name, "demo user registered");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,lixlobby=debug,lixlobby_auth=debug")),
        )
        .init();

    let config = load_config()?;
    tracing::info!(bind_addr = %config.bind_addr, "starting lobby server");

    let server = LobbyServerBuilder::new()
        .config(config)
        .build(InMemoryCredentialStore::new())
        .await?;
    seed_demo_users(&server).await?;

    server.run().await?;
    Ok(())
}
