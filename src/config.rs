use std::time::Duration;

use serde::Deserialize;

use crate::error::SqlAccessorError;

pub const DEFAULT_PORT: u16 = 5432;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_IDLE_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5_000;

/// Connection settings, fixed for the lifetime of an accessor.
///
/// Deserializes from either snake_case keys or the `max` / `idleTimeoutMillis` /
/// `connectionTimeoutMillis` option names:
/// ```rust
/// use pg_crud_accessor::prelude::*;
///
/// let cfg = ConnectionConfig::from_json(serde_json::json!({
///     "user": "app", "host": "localhost", "database": "app", "password": "secret",
///     "connectionTimeoutMillis": 1000
/// }))?;
/// assert_eq!(cfg.port, 5432);
/// assert_eq!(cfg.connect_timeout_ms, 1000);
/// # Ok::<(), SqlAccessorError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConnectionConfig {
    pub user: String,
    pub host: String,
    pub database: String,
    pub password: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Passed to the driver; a single call never holds more than one connection.
    #[serde(default = "default_max", alias = "max")]
    pub max_connections: u32,
    #[serde(default = "default_idle", alias = "idleTimeoutMillis")]
    pub idle_timeout_ms: u64,
    #[serde(default = "default_connect", alias = "connectionTimeoutMillis")]
    pub connect_timeout_ms: u64,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_max() -> u32 {
    DEFAULT_MAX_CONNECTIONS
}

fn default_idle() -> u64 {
    DEFAULT_IDLE_TIMEOUT_MS
}

fn default_connect() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_MS
}

impl ConnectionConfig {
    pub fn new(
        user: impl Into<String>,
        host: impl Into<String>,
        database: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            user: user.into(),
            host: host.into(),
            database: database.into(),
            password: password.into(),
            port: DEFAULT_PORT,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            idle_timeout_ms: DEFAULT_IDLE_TIMEOUT_MS,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
        }
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    #[must_use]
    pub fn with_idle_timeout_ms(mut self, ms: u64) -> Self {
        self.idle_timeout_ms = ms;
        self
    }

    #[must_use]
    pub fn with_connect_timeout_ms(mut self, ms: u64) -> Self {
        self.connect_timeout_ms = ms;
        self
    }

    /// Parse and validate a JSON configuration object.
    ///
    /// # Errors
    /// Returns `SqlAccessorError::ConfigError` if a required field is missing or invalid.
    pub fn from_json(value: serde_json::Value) -> Result<Self, SqlAccessorError> {
        let cfg: ConnectionConfig = serde_json::from_value(value)
            .map_err(|e| SqlAccessorError::ConfigError(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read `PGUSER`, `PGHOST`, `PGDATABASE`, `PGPASSWORD` and optionally `PGPORT`.
    ///
    /// # Errors
    /// Returns `SqlAccessorError::ConfigError` if a required variable is unset or the port is
    /// not a number.
    pub fn from_env() -> Result<Self, SqlAccessorError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, SqlAccessorError> {
        let required = |key: &str| {
            lookup(key).ok_or_else(|| SqlAccessorError::ConfigError(format!("{key} is required")))
        };
        let mut cfg = ConnectionConfig::new(
            required("PGUSER")?,
            required("PGHOST")?,
            required("PGDATABASE")?,
            required("PGPASSWORD")?,
        );
        if let Some(port) = lookup("PGPORT") {
            cfg.port = port
                .parse()
                .map_err(|e| SqlAccessorError::ConfigError(format!("PGPORT {port:?}: {e}")))?;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    /// # Errors
    /// Returns `SqlAccessorError::ConfigError` naming the first invalid field.
    pub fn validate(&self) -> Result<(), SqlAccessorError> {
        if self.user.is_empty() {
            return Err(SqlAccessorError::ConfigError("user is required".to_string()));
        }
        if self.host.is_empty() {
            return Err(SqlAccessorError::ConfigError("host is required".to_string()));
        }
        if self.database.is_empty() {
            return Err(SqlAccessorError::ConfigError(
                "database is required".to_string(),
            ));
        }
        if self.port == 0 {
            return Err(SqlAccessorError::ConfigError(
                "port must be non-zero".to_string(),
            ));
        }
        if self.max_connections == 0 {
            return Err(SqlAccessorError::ConfigError(
                "max must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    #[must_use]
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    /// Map onto a `tokio_postgres` connection config.
    #[cfg(feature = "postgres")]
    #[must_use]
    pub fn to_tokio_config(&self) -> tokio_postgres::Config {
        let mut pg = tokio_postgres::Config::new();
        pg.host(&self.host)
            .port(self.port)
            .user(&self.user)
            .password(&self.password)
            .dbname(&self.database)
            .connect_timeout(self.connect_timeout())
            .application_name(env!("CARGO_PKG_NAME"));
        pg
    }
}
