//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use flashdeck_core::domain::DEFAULT_REVISION_THRESHOLD;
use tracing::Level;

/// Token secrets shorter than this are refused.
const MIN_SECRET_LEN: usize = 16;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Credentials for the admin account created when the system has none.
#[derive(Clone)]
pub struct AdminSeed {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone)]
pub struct Config {
    pub bind_address: SocketAddr,
    /// A Postgres URL, or `memory://` for the non-persistent in-process store.
    pub database_url: String,
    pub log_level: Level,
    pub secret_key: String,
    pub revision_threshold: u8,
    pub session_ttl_days: i64,
    pub cors_origin: String,
    pub bootstrap_admin: Option<AdminSeed>,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_source(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key/value lookup.
    pub fn from_source<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Load Server and Database Settings ---
        let bind_address = parse_or(&lookup, "BIND_ADDRESS", SocketAddr::from(([0, 0, 0, 0], 3000)))?;

        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load Study Settings ---
        let secret_key = lookup("SECRET_KEY")
            .ok_or_else(|| ConfigError::MissingVar("SECRET_KEY".to_string()))?;
        if secret_key.len() < MIN_SECRET_LEN {
            return Err(ConfigError::InvalidValue(
                "SECRET_KEY".to_string(),
                format!("must be at least {} bytes long", MIN_SECRET_LEN),
            ));
        }

        let revision_threshold = parse_or(&lookup, "REVISION_THRESHOLD", DEFAULT_REVISION_THRESHOLD)?;
        if revision_threshold > 100 {
            return Err(ConfigError::InvalidValue(
                "REVISION_THRESHOLD".to_string(),
                "must be between 0 and 100".to_string(),
            ));
        }

        let session_ttl_days = parse_or(&lookup, "SESSION_TTL_DAYS", 30_i64)?;
        if session_ttl_days <= 0 {
            return Err(ConfigError::InvalidValue(
                "SESSION_TTL_DAYS".to_string(),
                "must be a positive number of days".to_string(),
            ));
        }

        let cors_origin =
            lookup("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:3000".to_string());

        // --- Load the optional bootstrap admin ---
        let admin_vars = ["ADMIN_USERNAME", "ADMIN_EMAIL", "ADMIN_PASSWORD"].map(|key| lookup(key));
        let bootstrap_admin = match admin_vars {
            [None, None, None] => None,
            [Some(username), Some(email), Some(password)] => Some(AdminSeed {
                username,
                email,
                password,
            }),
            partial => {
                let missing = ["ADMIN_USERNAME", "ADMIN_EMAIL", "ADMIN_PASSWORD"]
                    .iter()
                    .zip(partial.iter())
                    .find(|(_, value)| value.is_none())
                    .map(|(key, _)| key.to_string())
                    .unwrap_or_default();
                return Err(ConfigError::MissingVar(missing));
            }
        };

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            secret_key,
            revision_threshold,
            session_ttl_days,
            cors_origin,
            bootstrap_admin,
        })
    }

    pub fn uses_memory_store(&self) -> bool {
        self.database_url.starts_with("memory://")
    }
}

/// Parses `key` if it is set, otherwise falls back to `default`.
fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("log_level", &self.log_level)
            .field("revision_threshold", &self.revision_threshold)
            .field("session_ttl_days", &self.session_ttl_days)
            .field("cors_origin", &self.cors_origin)
            .field("bootstrap_admin", &self.bootstrap_admin.as_ref().map(|a| &a.username))
            .finish_non_exhaustive()
    }
}
