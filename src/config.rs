use std::time::Duration;

use crate::errors::AppError;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_ADMIN_PASSWORD: &str = "admin123";
const DEFAULT_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_BULK_CONCURRENCY: usize = 4;
const MIN_SESSION_KEY_LEN: usize = 64;

/// Runtime settings for bulk step changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkSettings {
    /// Maximum number of items processed at the same time within one batch.
    pub concurrency: usize,
    /// Overall batch deadline. Items not started before it expires are
    /// reported as failed.
    pub timeout: Option<Duration>,
}

impl Default for BulkSettings {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_BULK_CONCURRENCY,
            timeout: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    pub max_connections: u32,
    /// `None` means a random key is generated at startup.
    pub session_key: Option<String>,
    pub admin_password: String,
    pub bulk: BulkSettings,
}

impl AppConfig {
    /// Load configuration from the process environment, reading `.env` first
    /// when present.
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut errors = Vec::new();

        let database_url = lookup("DATABASE_URL").unwrap_or_default();
        if database_url.trim().is_empty() {
            errors.push("DATABASE_URL is required".to_string());
        }

        let bind_addr = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());

        let max_connections = match lookup("DB_MAX_CONNECTIONS") {
            Some(raw) => match raw.parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    errors.push(format!("DB_MAX_CONNECTIONS must be a positive integer, got '{raw}'"));
                    DEFAULT_MAX_CONNECTIONS
                }
            },
            None => DEFAULT_MAX_CONNECTIONS,
        };

        let session_key = match lookup("SESSION_KEY") {
            Some(val) if val.len() >= MIN_SESSION_KEY_LEN => Some(val),
            Some(val) => {
                log::warn!(
                    "SESSION_KEY too short ({} bytes, need {}+), generating random key",
                    val.len(),
                    MIN_SESSION_KEY_LEN
                );
                None
            }
            None => {
                log::warn!("No SESSION_KEY set, generating random key (sessions lost on restart)");
                None
            }
        };

        let admin_password = lookup("ADMIN_PASSWORD").unwrap_or_else(|| {
            log::warn!("No ADMIN_PASSWORD set, using the default admin password");
            DEFAULT_ADMIN_PASSWORD.to_string()
        });

        let concurrency = match lookup("BULK_CONCURRENCY") {
            Some(raw) => match raw.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    errors.push(format!("BULK_CONCURRENCY must be a positive integer, got '{raw}'"));
                    DEFAULT_BULK_CONCURRENCY
                }
            },
            None => DEFAULT_BULK_CONCURRENCY,
        };

        let timeout = match lookup("BULK_TIMEOUT_SECS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Some(Duration::from_secs(secs)),
                _ => {
                    errors.push(format!("BULK_TIMEOUT_SECS must be a positive integer, got '{raw}'"));
                    None
                }
            },
            None => None,
        };

        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }

        Ok(Self {
            database_url,
            bind_addr,
            max_connections,
            session_key,
            admin_password,
            bulk: BulkSettings { concurrency, timeout },
        })
    }
}
