//! Schema-agnostic CRUD access to PostgreSQL tables.
//!
//! Given only a table name (and optionally a schema), [`SqlAccessor`] looks up the table's
//! primary key in `information_schema`, builds parameterized SQL for insert, update,
//! point lookups and joined/filtered selects, and runs each statement on its own connection.

pub mod accessor;
pub mod config;
pub mod driver;
pub mod error;
pub mod executor;
pub mod identifier;
pub mod introspect;
pub mod prelude;
pub mod query;
pub mod query_builder;
pub mod results;
pub mod types;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use accessor::SqlAccessor;
#[cfg(feature = "postgres")]
pub use accessor::PgAccessor;
pub use config::ConnectionConfig;
pub use error::SqlAccessorError;
pub use query::QueryAndParams;
pub use results::{CustomDbRow, ResultSet};
pub use types::{Record, RowValues};
