use std::sync::LazyLock;

use regex::Regex;

use crate::error::SqlAccessorError;

/// PostgreSQL truncates identifiers longer than `NAMEDATALEN - 1` bytes.
pub const MAX_IDENTIFIER_LEN: usize = 63;

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z_][a-z0-9_]*$").expect("static identifier pattern"));

/// Check that `name` can be interpolated into SQL text as a bare identifier.
///
/// Table, schema, column and alias names cannot be bound as parameters, so anything that is
/// not a plain identifier is rejected here before SQL is assembled. Names are interpolated
/// unquoted and PostgreSQL folds unquoted names to lower case, so upper case is rejected too:
/// the catalog lookup binds the name verbatim and would miss the folded table.
///
/// # Errors
/// Returns `SqlAccessorError::InvalidIdentifier` for empty, overlong, or non-identifier input.
pub fn validate_identifier(name: &str) -> Result<&str, SqlAccessorError> {
    if name.len() > MAX_IDENTIFIER_LEN || !IDENTIFIER.is_match(name) {
        return Err(SqlAccessorError::InvalidIdentifier(name.to_string()));
    }
    Ok(name)
}
