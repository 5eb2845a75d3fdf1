//! Application-level configuration loading.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "FOOSBALL_BACK_CONFIG_PATH";
/// Outbound queue length used when the file does not set one.
const DEFAULT_OUTBOUND_QUEUE_CAPACITY: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    max_connections: Option<usize>,
    outbound_queue_capacity: usize,
    players: Vec<SeedPlayer>,
}

/// Player record provisioned into the in-memory store at startup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SeedPlayer {
    /// Player identifier, as sent on `/register/{sub}`.
    pub sub: String,
    /// Picture URL shown in snapshots.
    #[serde(default)]
    pub picture: String,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(app_config) => {
                    info!(
                        path = %path.display(),
                        max_connections = ?app_config.max_connections,
                        seed_players = app_config.players.len(),
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Parse a configuration document. Missing keys keep their defaults.
    pub fn from_json(contents: &str) -> serde_json::Result<Self> {
        serde_json::from_str::<RawConfig>(contents).map(Into::into)
    }

    /// Cap on simultaneously attached clients; `None` means unlimited.
    pub fn max_connections(&self) -> Option<usize> {
        self.max_connections
    }

    /// Number of messages a client may lag behind before deliveries start to wait.
    pub fn outbound_queue_capacity(&self) -> usize {
        self.outbound_queue_capacity
    }

    /// Players the in-memory backend starts with. Ignored by persistent backends.
    pub fn seed_players(&self) -> &[SeedPlayer] {
        &self.players
    }

    pub fn with_max_connections(mut self, max_connections: Option<usize>) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn with_outbound_queue_capacity(mut self, capacity: usize) -> Self {
        self.outbound_queue_capacity = capacity.max(1);
        self
    }

    pub fn with_seed_players(mut self, players: Vec<SeedPlayer>) -> Self {
        self.players = players;
        self
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            max_connections: None,
            outbound_queue_capacity: DEFAULT_OUTBOUND_QUEUE_CAPACITY,
            players: Vec::new(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    max_connections: Option<usize>,
    #[serde(default)]
    outbound_queue_capacity: Option<usize>,
    #[serde(default)]
    players: Vec<SeedPlayer>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        Self::default()
            .with_max_connections(value.max_connections)
            .with_outbound_queue_capacity(
                value
                    .outbound_queue_capacity
                    .unwrap_or(DEFAULT_OUTBOUND_QUEUE_CAPACITY),
            )
            .with_seed_players(value.players)
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_keeps_defaults() {
        let config = AppConfig::from_json("{}").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.max_connections(), None);
    }

    #[test]
    fn lobby_cap_and_queue_capacity_are_read() {
        let config =
            AppConfig::from_json(r#"{"max_connections": 4, "outbound_queue_capacity": 0}"#)
                .unwrap();
        assert_eq!(config.max_connections(), Some(4));
        assert_eq!(config.outbound_queue_capacity(), 1);
    }

    #[test]
    fn seed_players_are_read_with_optional_pictures() {
        let config = AppConfig::from_json(
            r#"{"players": [{"sub": "alice", "picture": "a.png"}, {"sub": "bob"}]}"#,
        )
        .unwrap();
        assert_eq!(
            config.seed_players(),
            [
                SeedPlayer {
                    sub: "alice".into(),
                    picture: "a.png".into(),
                },
                SeedPlayer {
                    sub: "bob".into(),
                    picture: String::new(),
                },
            ]
        );
    }

    #[test]
    fn malformed_document_is_an_error() {
        assert!(AppConfig::from_json(r#"{"max_connections": "four"}"#).is_err());
    }
}
