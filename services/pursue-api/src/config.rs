//! Configuration for the Pursue API service.

use pursue_core::CoreConfig;
use std::time::Duration;

/// Where repositories keep their data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    Postgres,
    Memory,
}

/// Pursue API configuration
#[derive(Clone)]
pub struct Config {
    /// HTTP server port
    pub http_port: u16,
    /// Storage backend
    pub storage: Storage,
    /// Database URL (postgres storage only)
    pub database_url: Option<String>,
    /// Maximum pooled database connections
    pub db_max_connections: u32,
    /// Apply embedded migrations on startup
    pub run_migrations: bool,
    /// HS256 secret for bearer tokens
    pub jwt_secret: String,
    /// Shared key for the internal job routes
    pub internal_job_key: String,
    /// Request timeout
    pub request_timeout: Duration,
    /// Metrics enabled
    pub metrics_enabled: bool,
    /// Core business configuration
    pub core: CoreConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let storage = match std::env::var("STORAGE")
            .unwrap_or_else(|_| "postgres".to_string())
            .as_str()
        {
            "postgres" => Storage::Postgres,
            "memory" => Storage::Memory,
            _ => return Err(ConfigError::Invalid("STORAGE")),
        };

        // Database
        let database_url = match (storage, std::env::var("DATABASE_URL")) {
            (_, Ok(url)) => Some(url),
            (Storage::Memory, Err(_)) => None,
            (Storage::Postgres, Err(_)) => return Err(ConfigError::Missing("DATABASE_URL")),
        };

        let db_max_connections = std::env::var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("DB_MAX_CONNECTIONS"))?;

        let run_migrations = std::env::var("RUN_MIGRATIONS")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("RUN_MIGRATIONS"))?;

        let http_port = std::env::var("HTTP_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("HTTP_PORT"))?;

        // Secrets
        let jwt_secret =
            std::env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?;
        let internal_job_key = std::env::var("INTERNAL_JOB_KEY")
            .map_err(|_| ConfigError::Missing("INTERNAL_JOB_KEY"))?;
        if internal_job_key.is_empty() {
            return Err(ConfigError::Invalid("INTERNAL_JOB_KEY"));
        }

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("REQUEST_TIMEOUT_SECS"))?;

        let metrics_enabled = std::env::var("METRICS_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);

        Ok(Self {
            http_port,
            storage,
            database_url,
            db_max_connections,
            run_migrations,
            jwt_secret,
            internal_job_key,
            request_timeout: Duration::from_secs(request_timeout_secs),
            metrics_enabled,
            core: CoreConfig::new(),
        })
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("http_port", &self.http_port)
            .field("storage", &self.storage)
            .field("db_max_connections", &self.db_max_connections)
            .field("run_migrations", &self.run_migrations)
            .field("request_timeout", &self.request_timeout)
            .field("metrics_enabled", &self.metrics_enabled)
            .finish_non_exhaustive()
    }
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
