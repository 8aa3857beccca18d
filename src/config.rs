//! Process configuration
//!
//! Read from the environment once at start-up (after `.env` is loaded).

use std::collections::HashSet;
use std::env;
use std::fmt;
use std::net::SocketAddr;

pub const DEFAULT_PORT: u16 = 10000;
pub const DEFAULT_PREFIX: &str = "!";

/// Credentials guarding the stats page
#[derive(Clone, PartialEq, Eq)]
pub struct StatsCredentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for StatsCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatsCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Application configuration loaded from environment variables.
#[derive(Clone)]
pub struct Config {
    pub discord_token: String,
    pub port: u16,
    /// `None` when either `STATS_USERNAME` or `STATS_PASSWORD` is unset
    pub stats: Option<StatsCredentials>,
    /// `None` runs the case store disabled
    pub database_url: Option<String>,
    pub db_min_connections: u32,
    pub db_max_connections: u32,
    pub owner_ids: HashSet<u64>,
    pub command_prefix: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("discord_token", &"<redacted>")
            .field("port", &self.port)
            .field("stats", &self.stats)
            .field("database_url", &self.database_url.as_ref().map(|_| "<set>"))
            .field("db_min_connections", &self.db_min_connections)
            .field("db_max_connections", &self.db_max_connections)
            .field("owner_ids", &self.owner_ids)
            .field("command_prefix", &self.command_prefix)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    /// Returns `ConfigError` when the token is missing or a value does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let discord_token = var("DISCORD_TOKEN").ok_or(ConfigError::Missing("DISCORD_TOKEN"))?;

        let stats = match (var("STATS_USERNAME"), var("STATS_PASSWORD")) {
            (Some(username), Some(password)) => Some(StatsCredentials { username, password }),
            _ => None,
        };

        let owner_ids = var("OWNER_IDS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(|id| {
                        id.parse::<u64>()
                            .map_err(|_| ConfigError::Invalid("OWNER_IDS", id.to_string()))
                    })
                    .collect::<Result<HashSet<_>, _>>()
            })
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            discord_token,
            port: parse_or(var("PORT"), "PORT", DEFAULT_PORT)?,
            stats,
            database_url: var("DATABASE_URL"),
            db_min_connections: parse_or(var("DB_MIN_CONNECTIONS"), "DB_MIN_CONNECTIONS", 1)?,
            db_max_connections: parse_or(var("DB_MAX_CONNECTIONS"), "DB_MAX_CONNECTIONS", 5)?,
            owner_ids,
            command_prefix: var("COMMAND_PREFIX").unwrap_or_else(|| DEFAULT_PREFIX.to_string()),
        })
    }

    /// Address the status surface listens on
    #[must_use]
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}

fn parse_or<T: std::str::FromStr>(
    value: Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    value.map_or(Ok(default), |raw| {
        raw.trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(key, raw.clone()))
    })
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
    #[error("Invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("DISCORD_TOKEN", "abc")]).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.stats, None);
        assert_eq!(config.database_url, None);
        assert_eq!(config.db_min_connections, 1);
        assert_eq!(config.db_max_connections, 5);
        assert!(config.owner_ids.is_empty());
        assert_eq!(config.command_prefix, "!");
        assert_eq!(config.listen_addr().port(), 10000);
    }

    #[test]
    fn test_missing_token() {
        let err = load(&[("PORT", "8080")]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("DISCORD_TOKEN")));
    }

    #[test]
    fn test_full_config() {
        let config = load(&[
            ("DISCORD_TOKEN", "abc"),
            ("PORT", "8080"),
            ("STATS_USERNAME", "admin"),
            ("STATS_PASSWORD", "hunter2"),
            ("DATABASE_URL", "sqlite:cases.db"),
            ("OWNER_IDS", "123, 456,"),
        ])
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.stats.as_ref().unwrap().username, "admin");
        assert_eq!(config.owner_ids, HashSet::from([123, 456]));
        assert_eq!(config.database_url.as_deref(), Some("sqlite:cases.db"));
    }

    #[test]
    fn test_half_configured_stats_is_off() {
        let config = load(&[("DISCORD_TOKEN", "abc"), ("STATS_USERNAME", "admin")]).unwrap();
        assert_eq!(config.stats, None);
    }

    #[test]
    fn test_invalid_values() {
        let err = load(&[("DISCORD_TOKEN", "abc"), ("PORT", "http")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid("PORT", _)));

        let err = load(&[("DISCORD_TOKEN", "abc"), ("OWNER_IDS", "12,bob")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid("OWNER_IDS", ref v) if v == "bob"));
    }

    #[test]
    fn test_debug_hides_secrets() {
        let config = load(&[
            ("DISCORD_TOKEN", "super-secret-token"),
            ("STATS_USERNAME", "admin"),
            ("STATS_PASSWORD", "hunter2"),
        ])
        .unwrap();
        let printed = format!("{config:?}");
        assert!(!printed.contains("super-secret-token"));
        assert!(!printed.contains("hunter2"));
        assert!(printed.contains("admin"));
    }
}
