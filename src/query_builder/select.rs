use std::collections::HashSet;

use crate::error::SqlAccessorError;
use crate::identifier::validate_identifier;
use crate::query::{QueryAndParams, placeholder};
use crate::types::RowValues;

use super::{FindModel, TableRef};

const LETTERS: &[u8; 26] = b"abcdefghijklmnopqrstuvwxyz";

/// Table alias for the `index`-th table reference of a query.
///
/// The first 26 are `a`..`z`; after that `t26`, `t27`, .. so the supply never runs out.
#[must_use]
pub fn alias_for(index: usize) -> String {
    match LETTERS.get(index) {
        Some(letter) => char::from(*letter).to_string(),
        None => format!("t{index}"),
    }
}

/// `SELECT * FROM schema.table WHERE pk = $1`.
///
/// # Errors
/// Returns `SqlAccessorError::InvalidIdentifier` if `primary_key` is not a plain identifier.
pub fn find_by_pk_statement(
    table: &TableRef,
    primary_key: &str,
    id: RowValues,
) -> Result<QueryAndParams, SqlAccessorError> {
    let primary_key = validate_identifier(primary_key)?;
    Ok(QueryAndParams::new(
        format!("SELECT * FROM {} WHERE {primary_key} = $1", table.qualified()),
        vec![id],
    ))
}

/// `SELECT * FROM schema.table AS a [JOIN ..] [WHERE ..]` for a [`FindModel`].
///
/// The base table is always `a`. Unnamed joins take the next generated alias in order; named
/// joins keep their own and do not consume one. Filters are numbered `$1..` in list order.
///
/// # Errors
/// - `SqlAccessorError::InvalidIdentifier` for any bad table, column or alias name.
/// - `SqlAccessorError::AliasConflict` when two table references end up with the same alias.
/// - `SqlAccessorError::UnknownAlias` when a filter names an alias absent from the query.
/// - `SqlAccessorError::MissingPrimaryKey` when a join needs the base primary key and there is none.
pub fn select_statement(
    table: &TableRef,
    primary_key: Option<&str>,
    model: &FindModel,
) -> Result<QueryAndParams, SqlAccessorError> {
    let base_alias = alias_for(0);
    let mut aliases: HashSet<String> = HashSet::from([base_alias.clone()]);
    let mut next_alias = 1;

    let mut sql = format!("SELECT * FROM {} AS {base_alias}", table.qualified());

    for join in &model.joins {
        let target = TableRef::new(&join.table, Some(join.schema.as_str()))?;
        let alias = match &join.alias {
            Some(named) => validate_identifier(named)?.to_string(),
            None => {
                let generated = alias_for(next_alias);
                next_alias += 1;
                generated
            }
        };
        if !aliases.insert(alias.clone()) {
            return Err(SqlAccessorError::AliasConflict(alias));
        }

        let on = validate_identifier(&join.on)?;
        let base_column = match (&join.base_column, primary_key) {
            (Some(column), _) => validate_identifier(column)?,
            (None, Some(pk)) => validate_identifier(pk)?,
            (None, None) => {
                return Err(SqlAccessorError::MissingPrimaryKey {
                    schema: table.schema().to_string(),
                    table: table.table().to_string(),
                });
            }
        };

        sql.push_str(&format!(
            " {} {} AS {alias} ON {alias}.{on} = {base_alias}.{base_column}",
            join.kind.as_sql(),
            target.qualified(),
        ));
    }

    let mut params = Vec::with_capacity(model.filters.len());
    for (index, filter) in model.filters.iter().enumerate() {
        let key = validate_identifier(&filter.key)?;
        let qualifier = match &filter.alias {
            Some(alias) if aliases.contains(alias.as_str()) => format!("{alias}."),
            Some(alias) => return Err(SqlAccessorError::UnknownAlias(alias.clone())),
            None => String::new(),
        };
        let lead = if index == 0 {
            "WHERE"
        } else {
            filter.connector.as_sql()
        };
        params.push(filter.value.clone());
        sql.push_str(&format!(
            " {lead} {qualifier}{key} = {}",
            placeholder(params.len())
        ));
    }

    Ok(QueryAndParams::new(sql, params))
}
