//! Environment-driven configuration.
//!
//! Values are read from the process environment after `.env` has been
//! loaded. Missing variables fall back to defaults; present but unparseable
//! ones are an error.

use std::{
    env,
    net::SocketAddr,
    num::{NonZeroU32, NonZeroUsize},
};

use thiserror::Error;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://contacts.db";
pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    /// Tokio worker threads.
    pub workers: usize,
    pub db_max_connections: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let cpus = NonZeroUsize::new(num_cpus::get()).unwrap_or(NonZeroUsize::MIN);

        let database_url =
            lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());
        let bind_addr = parse_or(&lookup, "BIND_ADDR", || {
            SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT))
        })?;
        // Zero is rejected by the parse itself, so the error carries the raw input.
        let workers = parse_or(&lookup, "WORKERS", || cpus)?.get();
        let db_max_connections = parse_or(&lookup, "DB_MAX_CONNECTIONS", || {
            NonZeroU32::try_from(cpus).unwrap_or(NonZeroU32::MIN)
        })?
        .get();

        Ok(Self {
            database_url,
            bind_addr,
            workers,
            db_max_connections,
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: impl FnOnce() -> T,
) -> Result<T, ConfigError> {
    match lookup(var) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
        None => Ok(default()),
    }
}
