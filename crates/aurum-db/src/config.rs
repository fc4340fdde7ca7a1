//! Application configuration.
//!
//! Loaded from environment variables with fallback to defaults.
//!
//! | Variable                          | Default     |                             |
//! |-----------------------------------|-------------|-----------------------------|
//! | `AURUM_DATABASE_PATH`             | `aurum.db`  | SQLite file                 |
//! | `AURUM_DB_MAX_CONNECTIONS`        | `5`         | pool size                   |
//! | `AURUM_STORE_UTC_OFFSET_MINUTES`  | `420` (WIB) | store calendar for prices   |
//! | `AURUM_LOG`                       | `info`      | tracing `EnvFilter`         |

use chrono::FixedOffset;
use std::env;
use std::path::PathBuf;

use crate::pool::DbConfig;

const DEFAULT_DATABASE_PATH: &str = "aurum.db";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_UTC_OFFSET_MINUTES: i32 = 7 * 60;
const DEFAULT_LOG_FILTER: &str = "info";

/// Process-wide settings for the binaries.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_path: PathBuf,
    pub max_connections: u32,
    /// The store's local time zone. "Today" for the daily price check is
    /// measured here, not in UTC: pass it to
    /// [`PriceRepository::needs_update_today`](crate::PriceRepository::needs_update_today).
    pub store_offset: FixedOffset,
    pub log_filter: String,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_path = lookup("AURUM_DATABASE_PATH")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH));

        let max_connections = match lookup("AURUM_DB_MAX_CONNECTIONS") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| ConfigError::InvalidValue("AURUM_DB_MAX_CONNECTIONS".to_string()))?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        let offset_minutes = match lookup("AURUM_STORE_UTC_OFFSET_MINUTES") {
            Some(raw) => raw.trim().parse::<i32>().map_err(|_| {
                ConfigError::InvalidValue("AURUM_STORE_UTC_OFFSET_MINUTES".to_string())
            })?,
            None => DEFAULT_UTC_OFFSET_MINUTES,
        };
        let store_offset = offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| ConfigError::InvalidValue("AURUM_STORE_UTC_OFFSET_MINUTES".to_string()))?;

        let log_filter = lookup("AURUM_LOG")
            .filter(|f| !f.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        Ok(AppConfig {
            database_path,
            max_connections,
            store_offset,
            log_filter,
        })
    }

    /// Pool settings for this configuration.
    pub fn to_db_config(&self) -> DbConfig {
        DbConfig::new(&self.database_path).max_connections(self.max_connections)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}
