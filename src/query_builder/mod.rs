//! Dynamic SQL assembly for the CRUD accessor.
//!
//! Every builder returns a [`QueryAndParams`](crate::query::QueryAndParams) whose `$N`
//! placeholders line up one-to-one with its parameter vector. Identifiers are validated before
//! they reach the SQL text; values are only ever bound.

mod dml;
mod model;
mod select;

pub use dml::{insert_statement, update_statement};
pub(crate) use dml::check_update_fields;
pub use model::{Connector, FilterClause, FindModel, JoinKind, JoinSpec};
pub use select::{alias_for, find_by_pk_statement, select_statement};

use crate::error::SqlAccessorError;
use crate::identifier::validate_identifier;

pub const DEFAULT_SCHEMA: &str = "public";

/// A validated `schema.table` reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableRef {
    schema: String,
    table: String,
}

impl TableRef {
    /// `schema` defaults to `public`.
    ///
    /// # Errors
    /// Returns `SqlAccessorError::InvalidIdentifier` if either name is not a plain identifier.
    pub fn new(table: &str, schema: Option<&str>) -> Result<Self, SqlAccessorError> {
        let schema = validate_identifier(schema.unwrap_or(DEFAULT_SCHEMA))?;
        let table = validate_identifier(table)?;
        Ok(Self {
            schema: schema.to_string(),
            table: table.to_string(),
        })
    }

    #[must_use]
    pub fn schema(&self) -> &str {
        &self.schema
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// `schema.table` as it appears in SQL text.
    #[must_use]
    pub fn qualified(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }
}

impl std::fmt::Display for TableRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_defaults_to_public() {
        let t = TableRef::new("users", None).unwrap();
        assert_eq!(t.qualified(), "public.users");
        assert_eq!(TableRef::new("users", Some("crm")).unwrap().to_string(), "crm.users");
    }

    #[test]
    fn rejects_bad_names() {
        assert!(TableRef::new("users;--", None).is_err());
        assert!(TableRef::new("users", Some("public.x")).is_err());
    }
}
