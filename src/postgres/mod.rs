// PostgreSQL module - the `tokio-postgres` implementation of the driver seam
//
// - driver: connection open/query/release
// - params: RowValues -> PostgreSQL parameter encoding
// - query: result row extraction

pub mod driver;
pub mod params;
pub mod query;

pub use driver::{PostgresConnection, PostgresDriver};
pub use query::{build_result_set_from_statement, postgres_extract_value};
