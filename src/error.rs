use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqlAccessorError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// A submitted statement failed. `code` carries the SQLSTATE when the driver reports one.
    #[error("Statement error: {message}")]
    StatementError {
        message: String,
        code: Option<String>,
    },

    #[error("Parameter conversion error: {0}")]
    ParameterError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("Alias {0:?} is used by more than one table in the same query")]
    AliasConflict(String),

    #[error("Filter references unknown alias {0:?}")]
    UnknownAlias(String),

    #[error("Table {schema}.{table} has no primary key")]
    MissingPrimaryKey { schema: String, table: String },

    #[error("Update of {schema}.{table} has no fields to set")]
    EmptyUpdate { schema: String, table: String },
}

impl SqlAccessorError {
    /// Build a `StatementError` without a SQLSTATE.
    pub fn statement(message: impl Into<String>) -> Self {
        SqlAccessorError::StatementError {
            message: message.into(),
            code: None,
        }
    }

    /// The SQLSTATE code of a failed statement, if any.
    #[must_use]
    pub fn sql_state(&self) -> Option<&str> {
        match self {
            SqlAccessorError::StatementError { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

#[cfg(feature = "postgres")]
impl SqlAccessorError {
    pub(crate) fn from_pg_statement(err: &tokio_postgres::Error) -> Self {
        use crate::postgres::params::BindError;
        use tokio_postgres::types::WrongType;

        let cause = std::error::Error::source(err);
        if cause.is_some_and(|c| c.is::<BindError>() || c.is::<WrongType>()) {
            return SqlAccessorError::ParameterError(err.to_string());
        }
        match err.as_db_error() {
            Some(db) => SqlAccessorError::StatementError {
                message: db.message().to_string(),
                code: Some(db.code().code().to_string()),
            },
            None => SqlAccessorError::StatementError {
                message: err.to_string(),
                code: err.code().map(|c| c.code().to_string()),
            },
        }
    }
}
