use crate::config::ConnectionConfig;
use crate::driver::{Driver, DriverConnection};
use crate::error::SqlAccessorError;
use crate::query::QueryAndParams;
use crate::results::ResultSet;

/// Runs one statement per connection: connect, query, release.
pub struct Executor<D> {
    config: ConnectionConfig,
    driver: D,
}

impl<D: Driver> Executor<D> {
    pub fn new(config: ConnectionConfig, driver: D) -> Self {
        Self { config, driver }
    }

    #[must_use]
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    #[must_use]
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Execute `request` on a fresh connection.
    ///
    /// The connection is released whether the statement succeeds or fails. A statement error is
    /// returned in preference to a release error; a release error after a successful statement is
    /// logged and the result is still returned.
    ///
    /// # Errors
    /// Returns `SqlAccessorError::ConnectionError` when the connection cannot be opened and
    /// `SqlAccessorError::StatementError` when the statement fails.
    pub async fn execute(&self, request: &QueryAndParams) -> Result<ResultSet, SqlAccessorError> {
        tracing::debug!(sql = %request.query, params = request.params.len(), "executing statement");

        tracing::trace!(host = %self.config.host, database = %self.config.database, "connect");
        let mut conn = self.driver.connect(&self.config).await.inspect_err(|e| {
            tracing::debug!(error = %e, "connect failed");
        })?;

        let outcome = conn.query(request).await;
        let released = conn.disconnect().await;
        tracing::trace!("disconnect");

        match (outcome, released) {
            (Err(statement_err), Err(release_err)) => {
                tracing::warn!(error = %release_err, "disconnect after failed statement");
                Err(statement_err)
            }
            (Err(statement_err), Ok(())) => Err(statement_err),
            (Ok(result_set), Err(release_err)) => {
                tracing::warn!(error = %release_err, "disconnect after successful statement");
                Ok(result_set)
            }
            (Ok(result_set), Ok(())) => Ok(result_set),
        }
    }
}
