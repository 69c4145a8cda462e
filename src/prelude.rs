//! Convenient imports for common functionality.

pub use crate::accessor::SqlAccessor;
pub use crate::config::ConnectionConfig;
pub use crate::driver::{Driver, DriverConnection};
pub use crate::error::SqlAccessorError;
pub use crate::executor::Executor;
pub use crate::introspect::{ColumnDescriptor, TableDescriptor};
pub use crate::query::QueryAndParams;
pub use crate::query_builder::{Connector, FilterClause, FindModel, JoinKind, JoinSpec, TableRef};
pub use crate::results::{CustomDbRow, ResultSet};
pub use crate::types::{Record, RowValues};

#[cfg(feature = "postgres")]
pub use crate::accessor::PgAccessor;
#[cfg(feature = "postgres")]
pub use crate::postgres::PostgresDriver;
