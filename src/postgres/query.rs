use std::error::Error;
use std::net::IpAddr;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use tokio_postgres::types::{FromSql, Kind, Type};
use tokio_postgres::{Row, Statement};
use uuid::Uuid;

use crate::error::SqlAccessorError;
use crate::results::ResultSet;
use crate::types::RowValues;

/// Build a result set using statement metadata for column names.
///
/// # Errors
/// Returns errors from row value extraction.
pub fn build_result_set_from_statement(
    stmt: &Statement,
    rows: &[Row],
) -> Result<ResultSet, SqlAccessorError> {
    let column_names: Vec<String> = stmt
        .columns()
        .iter()
        .map(|col| col.name().to_string())
        .collect();
    let column_count = column_names.len();

    let mut result_set = ResultSet::with_capacity(rows.len());
    result_set.set_column_names(Arc::new(column_names));

    for row in rows {
        let mut row_values = Vec::with_capacity(column_count);
        for idx in 0..column_count {
            row_values.push(postgres_extract_value(row, idx)?);
        }
        result_set.add_row_values(row_values);
    }

    Ok(result_set)
}

/// Extracts a `RowValues` from a `tokio_postgres` Row at the given index.
///
/// `numeric`, `uuid`, `time` and `inet` come back as text, one-dimensional scalar arrays as a
/// JSON array. Types with no decoding of their own are returned as raw bytes rather than failing
/// the row.
///
/// # Errors
/// Returns `SqlAccessorError::ExecutionError` if the column cannot be decoded.
pub fn postgres_extract_value(row: &Row, idx: usize) -> Result<RowValues, SqlAccessorError> {
    let type_info = row.columns()[idx].type_();
    let decode_err = |e: tokio_postgres::Error| {
        SqlAccessorError::ExecutionError(format!(
            "column {} ({}): {e}",
            row.columns()[idx].name(),
            type_info.name()
        ))
    };

    let value = match type_info.name() {
        "int2" => {
            let val: Option<i16> = row.try_get(idx).map_err(decode_err)?;
            val.map_or(RowValues::Null, |v| RowValues::Int(i64::from(v)))
        }
        "int4" => {
            let val: Option<i32> = row.try_get(idx).map_err(decode_err)?;
            val.map_or(RowValues::Null, |v| RowValues::Int(i64::from(v)))
        }
        "int8" => {
            let val: Option<i64> = row.try_get(idx).map_err(decode_err)?;
            val.map_or(RowValues::Null, RowValues::Int)
        }
        "float4" => {
            let val: Option<f32> = row.try_get(idx).map_err(decode_err)?;
            val.map_or(RowValues::Null, |v| RowValues::Float(f64::from(v)))
        }
        "float8" => {
            let val: Option<f64> = row.try_get(idx).map_err(decode_err)?;
            val.map_or(RowValues::Null, RowValues::Float)
        }
        "bool" => {
            let val: Option<bool> = row.try_get(idx).map_err(decode_err)?;
            val.map_or(RowValues::Null, RowValues::Bool)
        }
        "timestamp" => {
            let val: Option<NaiveDateTime> = row.try_get(idx).map_err(decode_err)?;
            val.map_or(RowValues::Null, RowValues::Timestamp)
        }
        "timestamptz" => {
            let val: Option<DateTime<Utc>> = row.try_get(idx).map_err(decode_err)?;
            val.map_or(RowValues::Null, |v| RowValues::Timestamp(v.naive_utc()))
        }
        "date" => {
            let val: Option<NaiveDate> = row.try_get(idx).map_err(decode_err)?;
            val.and_then(|d| d.and_hms_opt(0, 0, 0))
                .map_or(RowValues::Null, RowValues::Timestamp)
        }
        "json" | "jsonb" => {
            let val: Option<Value> = row.try_get(idx).map_err(decode_err)?;
            val.map_or(RowValues::Null, RowValues::JSON)
        }
        "bytea" => {
            let val: Option<Vec<u8>> = row.try_get(idx).map_err(decode_err)?;
            val.map_or(RowValues::Null, RowValues::Blob)
        }
        "oid" => {
            let val: Option<u32> = row.try_get(idx).map_err(decode_err)?;
            val.map_or(RowValues::Null, |v| RowValues::Int(i64::from(v)))
        }
        // Exact decimals stay textual; beyond `Decimal`'s range (or NaN) the raw read below wins.
        "numeric" => match row.try_get::<_, Option<Decimal>>(idx) {
            Ok(val) => val.map_or(RowValues::Null, |v| RowValues::Text(v.to_string())),
            Err(_) => raw_value(row, idx, type_info).map_err(decode_err)?,
        },
        "uuid" => {
            let val: Option<Uuid> = row.try_get(idx).map_err(decode_err)?;
            val.map_or(RowValues::Null, |v| RowValues::Text(v.to_string()))
        }
        "time" => {
            let val: Option<NaiveTime> = row.try_get(idx).map_err(decode_err)?;
            val.map_or(RowValues::Null, |v| RowValues::Text(v.to_string()))
        }
        "inet" => {
            let val: Option<IpAddr> = row.try_get(idx).map_err(decode_err)?;
            val.map_or(RowValues::Null, |v| RowValues::Text(v.to_string()))
        }
        "_int2" => array::<i16>(row, idx).map_err(decode_err)?,
        "_int4" => array::<i32>(row, idx).map_err(decode_err)?,
        "_int8" => array::<i64>(row, idx).map_err(decode_err)?,
        "_float8" => array::<f64>(row, idx).map_err(decode_err)?,
        "_bool" => array::<bool>(row, idx).map_err(decode_err)?,
        "_text" | "_varchar" => array::<String>(row, idx).map_err(decode_err)?,
        _ if <String as FromSql<'_>>::accepts(type_info) => {
            let val: Option<String> = row.try_get(idx).map_err(decode_err)?;
            val.map_or(RowValues::Null, RowValues::Text)
        }
        _ => raw_value(row, idx, type_info).map_err(decode_err)?,
    };
    Ok(value)
}

fn array<'a, T>(row: &'a Row, idx: usize) -> Result<RowValues, tokio_postgres::Error>
where
    T: FromSql<'a> + Into<Value>,
{
    let val: Option<Vec<Option<T>>> = row.try_get(idx)?;
    Ok(val.map_or(RowValues::Null, |items| {
        RowValues::JSON(Value::Array(
            items
                .into_iter()
                .map(|item| item.map_or(Value::Null, Into::into))
                .collect(),
        ))
    }))
}

/// Wire bytes of a column whose type has no dedicated decoding.
struct RawValue(Vec<u8>);

impl<'a> FromSql<'a> for RawValue {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        Ok(RawValue(raw.to_vec()))
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

/// Enum labels are sent as text; everything else (interval, cidr, ranges, composites, ..) is
/// returned as its binary wire form.
fn raw_value(
    row: &Row,
    idx: usize,
    type_info: &Type,
) -> Result<RowValues, tokio_postgres::Error> {
    let val: Option<RawValue> = row.try_get(idx)?;
    Ok(match (val, type_info.kind()) {
        (None, _) => RowValues::Null,
        (Some(RawValue(bytes)), Kind::Enum(_)) => {
            RowValues::Text(String::from_utf8_lossy(&bytes).into_owned())
        }
        (Some(RawValue(bytes)), _) => {
            tracing::trace!(ty = type_info.name(), len = bytes.len(), "undecoded column");
            RowValues::Blob(bytes)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_value_accepts_any_type() {
        assert!(<RawValue as FromSql<'_>>::accepts(&Type::INTERVAL));
        assert!(<RawValue as FromSql<'_>>::accepts(&Type::CIDR));
        let raw = RawValue::from_sql(&Type::INTERVAL, &[0, 0, 0, 1]).unwrap();
        assert_eq!(raw.0, vec![0, 0, 0, 1]);
    }
}
