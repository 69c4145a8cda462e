use std::collections::HashMap;
use std::sync::RwLock;

use crate::config::ConnectionConfig;
use crate::driver::Driver;
use crate::error::SqlAccessorError;
use crate::executor::Executor;
use crate::introspect::{ColumnDescriptor, Introspector, TableDescriptor};
use crate::query_builder::{
    FindModel, TableRef, check_update_fields, find_by_pk_statement, insert_statement,
    select_statement, update_statement,
};
use crate::results::{CustomDbRow, ResultSet};
use crate::types::{Record, RowValues};

#[cfg(feature = "postgres")]
use crate::postgres::PostgresDriver;

/// Accessor backed by `tokio-postgres`.
#[cfg(feature = "postgres")]
pub type PgAccessor = SqlAccessor<PostgresDriver>;

type PrimaryKeyCache = RwLock<HashMap<TableRef, Option<String>>>;

/// Generic CRUD access to any table, driven by catalog introspection.
///
/// Every operation opens its own connection (two when it needs the primary key) and releases
/// it before returning. `schema` defaults to `public`.
///
/// ```rust,no_run
/// use pg_crud_accessor::prelude::*;
///
/// # async fn demo() -> Result<(), SqlAccessorError> {
/// let db = PgAccessor::new(ConnectionConfig::new("app", "localhost", "app", "secret"))?;
/// db.insert("users", &Record::new().with("name", "Ann").with("active", false), None)
///     .await?;
/// let ann = db
///     .find_one("users", &FindModel::new().filter(FilterClause::new("name", "Ann")), None)
///     .await?;
/// # let _ = ann;
/// # Ok(())
/// # }
/// ```
pub struct SqlAccessor<D> {
    executor: Executor<D>,
    primary_keys: Option<PrimaryKeyCache>,
}

#[cfg(feature = "postgres")]
impl SqlAccessor<PostgresDriver> {
    /// # Errors
    /// Returns `SqlAccessorError::ConfigError` if `config` does not validate.
    pub fn new(config: ConnectionConfig) -> Result<Self, SqlAccessorError> {
        Self::with_driver(config, PostgresDriver)
    }
}

impl<D: Driver> SqlAccessor<D> {
    /// # Errors
    /// Returns `SqlAccessorError::ConfigError` if `config` does not validate.
    pub fn with_driver(config: ConnectionConfig, driver: D) -> Result<Self, SqlAccessorError> {
        config.validate()?;
        tracing::debug!(
            host = %config.host,
            port = config.port,
            database = %config.database,
            max = config.max_connections,
            idle_timeout_ms = config.idle_timeout_ms,
            connect_timeout_ms = config.connect_timeout_ms,
            "accessor configured"
        );
        Ok(Self {
            executor: Executor::new(config, driver),
            primary_keys: None,
        })
    }

    /// Remember primary key lookups for the lifetime of this accessor.
    #[must_use]
    pub fn with_primary_key_cache(mut self) -> Self {
        self.primary_keys = Some(RwLock::new(HashMap::new()));
        self
    }

    pub fn clear_primary_key_cache(&self) {
        if let Some(cache) = &self.primary_keys {
            cache
                .write()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .clear();
        }
    }

    #[must_use]
    pub fn config(&self) -> &ConnectionConfig {
        self.executor.config()
    }

    #[must_use]
    pub fn driver(&self) -> &D {
        self.executor.driver()
    }

    /// Columns of `table` from `information_schema.columns`.
    ///
    /// # Errors
    /// Invalid identifiers, connection and statement errors.
    pub async fn columns_table(
        &self,
        table: &str,
        schema: Option<&str>,
    ) -> Result<Vec<ColumnDescriptor>, SqlAccessorError> {
        let table = TableRef::new(table, schema)?;
        Introspector::new(&self.executor).list_columns(&table).await
    }

    /// The table's primary key, or `None` when it has none.
    ///
    /// # Errors
    /// Invalid identifiers, connection and statement errors.
    pub async fn columns_pk_table(
        &self,
        table: &str,
        schema: Option<&str>,
    ) -> Result<Option<TableDescriptor>, SqlAccessorError> {
        let table = TableRef::new(table, schema)?;
        let primary_key = self.primary_key_of(&table).await?;
        Ok(primary_key.map(|pk| TableDescriptor {
            schema: table.schema().to_string(),
            table: table.table().to_string(),
            primary_key: Some(pk),
        }))
    }

    /// Insert `record` and return the raw result.
    ///
    /// # Errors
    /// Invalid identifiers, connection and statement errors.
    pub async fn insert(
        &self,
        table: &str,
        record: &Record,
        schema: Option<&str>,
    ) -> Result<ResultSet, SqlAccessorError> {
        let table = TableRef::new(table, schema)?;
        let request = insert_statement(&table, record)?;
        self.executor.execute(&request).await
    }

    /// Update the row whose primary key equals `id`. Returns `id` if a row changed, `None` if
    /// nothing matched.
    ///
    /// # Errors
    /// `EmptyUpdate` when no field would be written, `MissingPrimaryKey` when the table has no
    /// primary key, plus identifier, connection and statement errors.
    pub async fn update(
        &self,
        table: &str,
        record: &Record,
        id: impl Into<RowValues>,
        schema: Option<&str>,
    ) -> Result<Option<RowValues>, SqlAccessorError> {
        let id = id.into();
        let table = TableRef::new(table, schema)?;
        check_update_fields(&table, record)?;
        let primary_key = self.require_primary_key(&table).await?;
        let request = update_statement(&table, &primary_key, record, &id)?;
        let result_set = self.executor.execute(&request).await?;
        Ok((result_set.rows_affected > 0).then_some(id))
    }

    /// The row whose primary key equals `id`.
    ///
    /// # Errors
    /// `MissingPrimaryKey` when the table has no primary key, plus identifier, connection and
    /// statement errors.
    pub async fn find_by_pk(
        &self,
        table: &str,
        id: impl Into<RowValues>,
        schema: Option<&str>,
    ) -> Result<Option<CustomDbRow>, SqlAccessorError> {
        let id = id.into();
        let table = TableRef::new(table, schema)?;
        let primary_key = self.require_primary_key(&table).await?;
        let request = find_by_pk_statement(&table, &primary_key, id)?;
        Ok(self.executor.execute(&request).await?.into_first())
    }

    /// All rows matching `model`'s joins and filters.
    ///
    /// # Errors
    /// Builder errors (identifiers, aliases, missing primary key for a join), connection and
    /// statement errors.
    pub async fn find_all(
        &self,
        table: &str,
        model: &FindModel,
        schema: Option<&str>,
    ) -> Result<Vec<CustomDbRow>, SqlAccessorError> {
        let table = TableRef::new(table, schema)?;
        let primary_key = if model.needs_primary_key() {
            self.primary_key_of(&table).await?
        } else {
            None
        };
        let request = select_statement(&table, primary_key.as_deref(), model)?;
        Ok(self.executor.execute(&request).await?.results)
    }

    /// The first row [`find_all`](Self::find_all) returns.
    ///
    /// # Errors
    /// Same as [`find_all`](Self::find_all).
    pub async fn find_one(
        &self,
        table: &str,
        model: &FindModel,
        schema: Option<&str>,
    ) -> Result<Option<CustomDbRow>, SqlAccessorError> {
        Ok(self
            .find_all(table, model, schema)
            .await?
            .into_iter()
            .next())
    }

    async fn primary_key_of(&self, table: &TableRef) -> Result<Option<String>, SqlAccessorError> {
        if let Some(cache) = &self.primary_keys {
            let cached = cache
                .read()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .get(table)
                .cloned();
            if let Some(hit) = cached {
                return Ok(hit);
            }
        }

        let primary_key = Introspector::new(&self.executor)
            .primary_key_of(table)
            .await?;

        if let Some(cache) = &self.primary_keys {
            cache
                .write()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .insert(table.clone(), primary_key.clone());
        }
        Ok(primary_key)
    }

    async fn require_primary_key(&self, table: &TableRef) -> Result<String, SqlAccessorError> {
        self.primary_key_of(table)
            .await?
            .ok_or_else(|| SqlAccessorError::MissingPrimaryKey {
                schema: table.schema().to_string(),
                table: table.table().to_string(),
            })
    }
}
