use async_trait::async_trait;

use crate::config::ConnectionConfig;
use crate::error::SqlAccessorError;
use crate::query::QueryAndParams;
use crate::results::ResultSet;

/// Opens database sessions. One connection is opened per executed statement.
#[async_trait]
pub trait Driver: Send + Sync {
    type Connection: DriverConnection;

    /// Establish a new session.
    ///
    /// # Errors
    /// Returns `SqlAccessorError::ConnectionError` if no session can be established.
    async fn connect(&self, config: &ConnectionConfig)
    -> Result<Self::Connection, SqlAccessorError>;
}

/// A live session produced by a [`Driver`].
#[async_trait]
pub trait DriverConnection: Send {
    /// Run one parameterized statement and return its rows and affected-row count.
    ///
    /// # Errors
    /// Returns `SqlAccessorError::StatementError` if the statement fails.
    async fn query(&mut self, request: &QueryAndParams) -> Result<ResultSet, SqlAccessorError>;

    /// Release the session. Called exactly once, on every exit path.
    ///
    /// # Errors
    /// Returns `SqlAccessorError::ConnectionError` if the session did not shut down cleanly.
    async fn disconnect(&mut self) -> Result<(), SqlAccessorError>;
}
