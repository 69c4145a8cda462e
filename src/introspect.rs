use serde::Serialize;

use crate::driver::Driver;
use crate::error::SqlAccessorError;
use crate::executor::Executor;
use crate::query::QueryAndParams;
use crate::query_builder::TableRef;
use crate::results::CustomDbRow;
use crate::types::RowValues;

const COLUMNS_SQL: &str = "SELECT column_name::text AS column_name, \
    data_type::text AS data_type, \
    (is_nullable = 'YES') AS is_nullable, \
    column_default::text AS column_default, \
    ordinal_position::int4 AS ordinal_position \
    FROM information_schema.columns \
    WHERE table_name = $1::text AND table_schema = $2::text \
    ORDER BY ordinal_position";

const PRIMARY_KEY_SQL: &str = "SELECT ku.table_name::text AS table_name, \
    ku.column_name::text AS primary_key_column \
    FROM information_schema.table_constraints AS tc \
    INNER JOIN information_schema.key_column_usage AS ku \
    ON tc.constraint_type = 'PRIMARY KEY' \
    AND tc.constraint_name = ku.constraint_name \
    AND tc.constraint_schema = ku.constraint_schema \
    AND ku.table_name = $1::text \
    AND ku.table_schema = $2::text \
    ORDER BY ku.ordinal_position";

/// One column of a table as reported by `information_schema.columns`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub data_type: String,
    pub is_nullable: bool,
    pub default: Option<String>,
    pub ordinal_position: i64,
}

/// A table and its primary key column. Composite keys report their first column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableDescriptor {
    pub schema: String,
    pub table: String,
    pub primary_key: Option<String>,
}

pub(crate) fn columns_query(table: &TableRef) -> QueryAndParams {
    QueryAndParams::new(COLUMNS_SQL, catalog_params(table))
}

pub(crate) fn primary_key_query(table: &TableRef) -> QueryAndParams {
    QueryAndParams::new(PRIMARY_KEY_SQL, catalog_params(table))
}

fn catalog_params(table: &TableRef) -> Vec<RowValues> {
    vec![
        RowValues::Text(table.table().to_string()),
        RowValues::Text(table.schema().to_string()),
    ]
}

fn text(row: &CustomDbRow, column: &str) -> Option<String> {
    row.get(column).and_then(RowValues::as_text).map(str::to_string)
}

impl ColumnDescriptor {
    fn from_row(row: &CustomDbRow) -> Result<Self, SqlAccessorError> {
        let name = text(row, "column_name").ok_or_else(|| {
            SqlAccessorError::ExecutionError("catalog row without column_name".to_string())
        })?;
        Ok(Self {
            name,
            data_type: text(row, "data_type").unwrap_or_default(),
            is_nullable: row
                .get("is_nullable")
                .and_then(RowValues::as_bool)
                .copied()
                .unwrap_or(true),
            default: text(row, "column_default"),
            ordinal_position: row
                .get("ordinal_position")
                .and_then(RowValues::as_int)
                .copied()
                .unwrap_or_default(),
        })
    }
}

/// Catalog lookups. Nothing is cached here; every call is a round trip.
pub struct Introspector<'a, D> {
    executor: &'a Executor<D>,
}

impl<'a, D: Driver> Introspector<'a, D> {
    pub fn new(executor: &'a Executor<D>) -> Self {
        Self { executor }
    }

    /// Columns of `table` in catalog ordinal order.
    ///
    /// # Errors
    /// Propagates connection and statement errors.
    pub async fn list_columns(
        &self,
        table: &TableRef,
    ) -> Result<Vec<ColumnDescriptor>, SqlAccessorError> {
        let result_set = self.executor.execute(&columns_query(table)).await?;
        let columns = result_set
            .results
            .iter()
            .map(ColumnDescriptor::from_row)
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(table = %table, columns = columns.len(), "listed columns");
        Ok(columns)
    }

    /// The first primary key column of `table`, or `None` when it has no primary key.
    ///
    /// # Errors
    /// Propagates connection and statement errors.
    pub async fn primary_key_of(
        &self,
        table: &TableRef,
    ) -> Result<Option<String>, SqlAccessorError> {
        let result_set = self.executor.execute(&primary_key_query(table)).await?;
        let primary_key = result_set
            .results
            .first()
            .and_then(|row| text(row, "primary_key_column"));
        tracing::debug!(table = %table, primary_key = ?primary_key, "resolved primary key");
        Ok(primary_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn catalog_queries_bind_table_then_schema() {
        let t = TableRef::new("users", Some("crm")).unwrap();
        let qp = primary_key_query(&t);
        assert_eq!(qp.placeholder_count(), 2);
        assert_eq!(
            qp.params,
            vec![RowValues::Text("users".into()), RowValues::Text("crm".into())]
        );
        assert!(qp.query.contains("'PRIMARY KEY'"));
        assert_eq!(columns_query(&t).params, qp.params);
    }

    #[test]
    fn column_descriptor_reads_catalog_row() {
        let row = CustomDbRow::new(
            Arc::new(
                ["column_name", "data_type", "is_nullable", "column_default", "ordinal_position"]
                    .map(String::from)
                    .to_vec(),
            ),
            vec![
                RowValues::Text("id".into()),
                RowValues::Text("integer".into()),
                RowValues::Bool(false),
                RowValues::Null,
                RowValues::Int(1),
            ],
        );
        let column = ColumnDescriptor::from_row(&row).unwrap();
        assert_eq!(
            column,
            ColumnDescriptor {
                name: "id".into(),
                data_type: "integer".into(),
                is_nullable: false,
                default: None,
                ordinal_position: 1,
            }
        );
    }
}
