//! Configuration management.
//!
//! All settings come from environment variables with defaults:
//! - `DEADLINE_HOST` / `DEADLINE_PORT`: listen address (`127.0.0.1:3030`)
//! - `DEADLINE_STORE_URL`: remote task store base URL (`http://localhost:5000`),
//!   or `memory:` for an in-process store
//! - `DEADLINE_TICK_MS`: status refresh period in milliseconds (`1000`)
//! - `DEADLINE_DEFAULT_FILTER`: initial filter (`all`, `completed`, `incomplete`)

use std::time::Duration;
use thiserror::Error;

use crate::filter::FilterSelector;

/// Value of `DEADLINE_STORE_URL` selecting the in-process store.
pub const MEMORY_STORE: &str = "memory:";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value} ({reason})")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Where the task list is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreTarget {
    Http(String),
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub store: StoreTarget,
    pub tick_period: Duration,
    pub default_filter: FilterSelector,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3030,
            store: StoreTarget::Http("http://localhost:5000".to_string()),
            tick_period: crate::ticker::DEFAULT_PERIOD,
            default_filter: FilterSelector::All,
        }
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let host = var("DEADLINE_HOST").unwrap_or(defaults.host);

        let port = match var("DEADLINE_PORT") {
            Some(raw) => raw.trim().parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::InvalidValue {
                    name: "DEADLINE_PORT",
                    value: raw.clone(),
                    reason: e.to_string(),
                }
            })?,
            None => defaults.port,
        };

        let store = match var("DEADLINE_STORE_URL") {
            Some(raw) if raw.trim() == MEMORY_STORE => StoreTarget::Memory,
            Some(raw) => {
                let url = raw.trim().to_string();
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(ConfigError::InvalidValue {
                        name: "DEADLINE_STORE_URL",
                        value: raw,
                        reason: "expected an http(s) URL or 'memory:'".to_string(),
                    });
                }
                StoreTarget::Http(url)
            }
            None => defaults.store,
        };

        let tick_period = match var("DEADLINE_TICK_MS") {
            Some(raw) => {
                let ms: u64 = raw.trim().parse().map_err(|e: std::num::ParseIntError| {
                    ConfigError::InvalidValue {
                        name: "DEADLINE_TICK_MS",
                        value: raw.clone(),
                        reason: e.to_string(),
                    }
                })?;
                if ms == 0 {
                    return Err(ConfigError::InvalidValue {
                        name: "DEADLINE_TICK_MS",
                        value: raw,
                        reason: "must be greater than zero".to_string(),
                    });
                }
                Duration::from_millis(ms)
            }
            None => defaults.tick_period,
        };

        let default_filter = match var("DEADLINE_DEFAULT_FILTER") {
            Some(raw) => raw.parse().map_err(|e: crate::filter::UnknownFilter| {
                ConfigError::InvalidValue {
                    name: "DEADLINE_DEFAULT_FILTER",
                    value: raw.clone(),
                    reason: e.to_string(),
                }
            })?,
            None => defaults.default_filter,
        };

        Ok(Self {
            host,
            port,
            store,
            tick_period,
            default_filter,
        })
    }
}
