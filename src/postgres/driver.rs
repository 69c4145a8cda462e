use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_postgres::{Client, NoTls};

use crate::config::ConnectionConfig;
use crate::driver::{Driver, DriverConnection};
use crate::error::SqlAccessorError;
use crate::query::QueryAndParams;
use crate::results::ResultSet;

use super::params::as_refs;
use super::query::build_result_set_from_statement;

/// `tokio-postgres` backed driver. Each `connect` opens a fresh, unpooled session.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDriver;

/// An open `tokio-postgres` session and the task driving its socket.
pub struct PostgresConnection {
    client: Option<Client>,
    connection_task: Option<JoinHandle<Result<(), tokio_postgres::Error>>>,
}

#[async_trait]
impl Driver for PostgresDriver {
    type Connection = PostgresConnection;

    async fn connect(
        &self,
        config: &ConnectionConfig,
    ) -> Result<Self::Connection, SqlAccessorError> {
        let pg_config = config.to_tokio_config();
        tracing::trace!(
            host = %config.host,
            port = config.port,
            database = %config.database,
            user = %config.user,
            max = config.max_connections,
            "postgres connect start"
        );
        let (client, connection) = pg_config.connect(NoTls).await.map_err(|e| {
            SqlAccessorError::ConnectionError(format!(
                "postgres connect to {}:{} failed: {e}",
                config.host, config.port
            ))
        })?;
        let connection_task = tokio::spawn(connection);
        Ok(PostgresConnection {
            client: Some(client),
            connection_task: Some(connection_task),
        })
    }
}

impl PostgresConnection {
    fn client(&self) -> Result<&Client, SqlAccessorError> {
        self.client.as_ref().ok_or_else(|| {
            SqlAccessorError::ConnectionError("postgres connection already released".into())
        })
    }
}

#[async_trait]
impl DriverConnection for PostgresConnection {
    async fn query(&mut self, request: &QueryAndParams) -> Result<ResultSet, SqlAccessorError> {
        let client = self.client()?;
        let stmt = client
            .prepare(&request.query)
            .await
            .map_err(|e| SqlAccessorError::from_pg_statement(&e))?;
        let params = as_refs(&request.params);

        if stmt.columns().is_empty() {
            let affected = client
                .execute(&stmt, &params)
                .await
                .map_err(|e| SqlAccessorError::from_pg_statement(&e))?;
            let affected = usize::try_from(affected).map_err(|e| {
                SqlAccessorError::ExecutionError(format!(
                    "postgres affected rows conversion error: {e}"
                ))
            })?;
            return Ok(ResultSet::affected(affected));
        }

        let rows = client
            .query(&stmt, &params)
            .await
            .map_err(|e| SqlAccessorError::from_pg_statement(&e))?;
        build_result_set_from_statement(&stmt, &rows)
    }

    async fn disconnect(&mut self) -> Result<(), SqlAccessorError> {
        // Dropping the client closes the socket; the connection future then resolves.
        drop(self.client.take());
        let Some(task) = self.connection_task.take() else {
            return Ok(());
        };
        match task.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(SqlAccessorError::ConnectionError(format!(
                "postgres connection closed with error: {e}"
            ))),
            Err(join_err) => Err(SqlAccessorError::ConnectionError(format!(
                "postgres connection task failed: {join_err}"
            ))),
        }
    }
}

impl Drop for PostgresConnection {
    fn drop(&mut self) {
        if let Some(task) = self.connection_task.take() {
            task.abort();
        }
    }
}
