use crate::error::SqlAccessorError;
use crate::identifier::validate_identifier;
use crate::query::{QueryAndParams, placeholder};
use crate::types::{Record, RowValues};

use super::TableRef;

/// `INSERT INTO schema.table (c1,c2,..) VALUES ($1,$2,..)` in record order.
///
/// Every field is written, `NULL` included. An empty record inserts `DEFAULT VALUES`.
///
/// # Errors
/// Returns `SqlAccessorError::InvalidIdentifier` if a record key is not a plain identifier.
pub fn insert_statement(
    table: &TableRef,
    record: &Record,
) -> Result<QueryAndParams, SqlAccessorError> {
    if record.is_empty() {
        return Ok(QueryAndParams::new_without_params(format!(
            "INSERT INTO {} DEFAULT VALUES",
            table.qualified()
        )));
    }

    let mut columns = Vec::with_capacity(record.len());
    let mut placeholders = Vec::with_capacity(record.len());
    let mut params = Vec::with_capacity(record.len());
    for (key, value) in record.iter() {
        columns.push(validate_identifier(key)?);
        params.push(value.clone());
        placeholders.push(placeholder(params.len()));
    }

    let query = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table.qualified(),
        columns.join(","),
        placeholders.join(",")
    );
    Ok(QueryAndParams::new(query, params))
}

/// `UPDATE schema.table SET c=$2,.. WHERE pk=$1`.
///
/// `$1` is the id. Fields are written in record order when
/// [`RowValues::is_update_candidate`] holds, numbered from `$2`.
///
/// # Errors
/// Returns `SqlAccessorError::InvalidIdentifier` for a bad key or primary key name, and
/// `SqlAccessorError::EmptyUpdate` when no field qualifies.
pub fn update_statement(
    table: &TableRef,
    primary_key: &str,
    record: &Record,
    id: &RowValues,
) -> Result<QueryAndParams, SqlAccessorError> {
    let primary_key = validate_identifier(primary_key)?;
    check_update_fields(table, record)?;

    let mut params = vec![id.clone()];
    let mut assignments = Vec::new();
    for (key, value) in record.iter().filter(|(_, v)| v.is_update_candidate()) {
        params.push(value.clone());
        assignments.push(format!("{key}={}", placeholder(params.len())));
    }

    let query = format!(
        "UPDATE {} SET {} WHERE {primary_key}=$1",
        table.qualified(),
        assignments.join(",")
    );
    Ok(QueryAndParams::new(query, params))
}

/// Fail early when `record` would produce an empty or unsafe SET list.
///
/// # Errors
/// Returns `SqlAccessorError::InvalidIdentifier` for a bad included key and
/// `SqlAccessorError::EmptyUpdate` when no field qualifies.
pub(crate) fn check_update_fields(table: &TableRef, record: &Record) -> Result<(), SqlAccessorError> {
    let mut included = 0;
    for (key, _) in record.iter().filter(|(_, v)| v.is_update_candidate()) {
        validate_identifier(key)?;
        included += 1;
    }
    if included == 0 {
        return Err(SqlAccessorError::EmptyUpdate {
            schema: table.schema().to_string(),
            table: table.table().to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> TableRef {
        TableRef::new("users", None).unwrap()
    }

    #[test]
    fn insert_binds_every_field_in_order() {
        let record = Record::new().with("name", "Ann").with("active", false);
        let qp = insert_statement(&users(), &record).unwrap();
        assert_eq!(qp.query, "INSERT INTO public.users (name,active) VALUES ($1,$2)");
        assert_eq!(
            qp.params,
            vec![RowValues::Text("Ann".into()), RowValues::Bool(false)]
        );
    }

    #[test]
    fn insert_keeps_nulls_and_zeros() {
        let record = Record::new()
            .with("a", RowValues::Null)
            .with("b", 0)
            .with("c", "");
        let qp = insert_statement(&users(), &record).unwrap();
        assert_eq!(qp.query, "INSERT INTO public.users (a,b,c) VALUES ($1,$2,$3)");
        assert_eq!(qp.params.len(), qp.placeholder_count());
        assert_eq!(qp.params[0], RowValues::Null);
    }

    #[test]
    fn insert_empty_record_uses_defaults() {
        let qp = insert_statement(&users(), &Record::new()).unwrap();
        assert_eq!(qp.query, "INSERT INTO public.users DEFAULT VALUES");
        assert!(qp.params.is_empty());
    }

    #[test]
    fn insert_rejects_injected_column() {
        let record = Record::new().with("name) VALUES ('x'); --", "x");
        assert!(matches!(
            insert_statement(&users(), &record),
            Err(SqlAccessorError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn update_binds_id_first_and_skips_null() {
        let record = Record::new()
            .with("name", RowValues::Null)
            .with("active", false);
        let qp = update_statement(&users(), "id", &record, &RowValues::Int(7)).unwrap();
        assert_eq!(qp.query, "UPDATE public.users SET active=$2 WHERE id=$1");
        assert_eq!(qp.params, vec![RowValues::Int(7), RowValues::Bool(false)]);
        assert_eq!(qp.placeholder_count(), qp.params.len());
    }

    #[test]
    fn update_numbers_only_included_fields() {
        let record = Record::new()
            .with("a", 0)
            .with("b", "")
            .with("c", f64::NAN)
            .with("d", 5)
            .with("e", "x");
        let qp = update_statement(&users(), "user_id", &record, &RowValues::Text("7".into()))
            .unwrap();
        assert_eq!(
            qp.query,
            "UPDATE public.users SET b=$2,d=$3,e=$4 WHERE user_id=$1"
        );
        assert_eq!(
            qp.params,
            vec![
                RowValues::Text("7".into()),
                RowValues::Text(String::new()),
                RowValues::Int(5),
                RowValues::Text("x".into())
            ]
        );
    }

    #[test]
    fn update_with_nothing_to_set_fails() {
        let record = Record::new().with("a", RowValues::Null).with("b", 0);
        let err = update_statement(&users(), "id", &record, &RowValues::Int(1)).unwrap_err();
        assert!(matches!(err, SqlAccessorError::EmptyUpdate { .. }));
    }

    #[test]
    fn update_validates_only_written_keys() {
        let record = Record::new().with("bad key", RowValues::Null).with("ok", 1);
        assert!(update_statement(&users(), "id", &record, &RowValues::Int(1)).is_ok());
        let record = Record::new().with("bad key", 1);
        assert!(update_statement(&users(), "id", &record, &RowValues::Int(1)).is_err());
    }
}
