use crate::errors::{Error, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_AUTH_TOKEN: &str = "secret-token-123";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Memory,
    Postgres,
}

#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 100,
            min_connections: 10,
            acquire_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub http_addr: String,
    pub backend: Backend,
    pub database_url: Option<String>,
    pub pool: PoolConfig,
    pub auth_token: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup. Unparsable numbers fall back to
    /// their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = PoolConfig::default();

        let backend = match lookup("STORE_BACKEND").as_deref() {
            None | Some("memory") => Backend::Memory,
            Some("postgres") => Backend::Postgres,
            Some(other) => {
                return Err(Error::Config(format!(
                    "unknown STORE_BACKEND '{}', expected 'memory' or 'postgres'",
                    other
                )))
            }
        };

        let database_url = lookup("DATABASE_URL");
        if backend == Backend::Postgres && database_url.is_none() {
            return Err(Error::Config(
                "DATABASE_URL is required when STORE_BACKEND=postgres".to_string(),
            ));
        }

        Ok(Self {
            http_addr: lookup("HTTP_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            backend,
            database_url,
            pool: PoolConfig {
                max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", defaults.max_connections),
                min_connections: parse_or(&lookup, "DB_MIN_CONNECTIONS", defaults.min_connections),
                acquire_timeout: Duration::from_secs(parse_or(
                    &lookup,
                    "DB_ACQUIRE_TIMEOUT_SECS",
                    defaults.acquire_timeout.as_secs(),
                )),
            },
            auth_token: lookup("AUTH_TOKEN").unwrap_or_else(|| DEFAULT_AUTH_TOKEN.to_string()),
        })
    }
}

/// Values that do not fit `T` fall back to `default`
fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Strips credentials from a database URL for logging
pub fn redact_url(url: &str) -> &str {
    url.rsplit('@').next().unwrap_or("***")
}
