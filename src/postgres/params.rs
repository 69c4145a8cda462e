use std::error::Error;
use std::net::IpAddr;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde_json::Value;
use tokio_postgres::types::{IsNull, Kind, ToSql, Type, to_sql_checked};
use tokio_util::bytes;
use uuid::Uuid;

use crate::types::RowValues;

/// A value that cannot be encoded for the column type the server declared.
#[derive(Debug, thiserror::Error)]
#[error("cannot bind {value} as {ty}: {reason}")]
pub(crate) struct BindError {
    value: String,
    ty: String,
    reason: String,
}

impl BindError {
    fn boxed(
        value: &RowValues,
        ty: &Type,
        reason: impl ToString,
    ) -> Box<dyn Error + Sync + Send> {
        let value = match value {
            RowValues::Text(s) => format!("{s:?}"),
            RowValues::Blob(b) => format!("{} bytes", b.len()),
            other => other.to_json().to_string(),
        };
        Box::new(BindError {
            value,
            ty: ty.name().to_string(),
            reason: reason.to_string(),
        })
    }
}

type BindResult = Result<IsNull, Box<dyn Error + Sync + Send>>;

/// Borrow a parameter slice as `tokio_postgres` arguments.
pub(crate) fn as_refs(params: &[RowValues]) -> Vec<&(dyn ToSql + Sync)> {
    let mut references = Vec::with_capacity(params.len());
    for p in params {
        references.push(p as &(dyn ToSql + Sync));
    }
    references
}

fn is_text(ty: &Type) -> bool {
    matches!(*ty, Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME)
}

fn parse<T>(value: &RowValues, ty: &Type, s: &str) -> Result<T, Box<dyn Error + Sync + Send>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    s.trim().parse::<T>().map_err(|e| BindError::boxed(value, ty, e))
}

fn parse_bool(
    value: &RowValues,
    ty: &Type,
    s: &str,
) -> Result<bool, Box<dyn Error + Sync + Send>> {
    match s.trim().to_ascii_lowercase().as_str() {
        "t" | "true" | "y" | "yes" | "on" | "1" => Ok(true),
        "f" | "false" | "n" | "no" | "off" | "0" => Ok(false),
        _ => Err(BindError::boxed(value, ty, "not a boolean")),
    }
}

fn parse_timestamp(
    value: &RowValues,
    ty: &Type,
    s: &str,
) -> Result<NaiveDateTime, Box<dyn Error + Sync + Send>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.naive_utc());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| BindError::boxed(value, ty, "not a timestamp"))
}

impl RowValues {
    fn int_to_sql(&self, i: i64, ty: &Type, out: &mut bytes::BytesMut) -> BindResult {
        let narrow = |e: std::num::TryFromIntError| BindError::boxed(self, ty, e);
        match *ty {
            Type::INT2 => i16::try_from(i).map_err(narrow)?.to_sql(ty, out),
            Type::INT4 => i32::try_from(i).map_err(narrow)?.to_sql(ty, out),
            Type::INT8 => i.to_sql(ty, out),
            #[allow(clippy::cast_precision_loss)]
            Type::FLOAT4 => (i as f32).to_sql(ty, out),
            #[allow(clippy::cast_precision_loss)]
            Type::FLOAT8 => (i as f64).to_sql(ty, out),
            Type::NUMERIC => Decimal::from(i).to_sql(ty, out),
            ref t if is_text(t) => i.to_string().to_sql(ty, out),
            _ => Err(BindError::boxed(self, ty, "integer does not fit this column")),
        }
    }

    fn float_to_sql(&self, f: f64, ty: &Type, out: &mut bytes::BytesMut) -> BindResult {
        match *ty {
            #[allow(clippy::cast_possible_truncation)]
            Type::FLOAT4 => (f as f32).to_sql(ty, out),
            Type::FLOAT8 => f.to_sql(ty, out),
            Type::NUMERIC => Decimal::try_from(f)
                .map_err(|e| BindError::boxed(self, ty, e))?
                .to_sql(ty, out),
            ref t if is_text(t) => f.to_string().to_sql(ty, out),
            _ => Err(BindError::boxed(self, ty, "float does not fit this column")),
        }
    }

    /// Text is parsed into the declared column type, so ids and filter values that arrive as
    /// strings still bind against typed columns.
    fn text_to_sql(&self, s: &str, ty: &Type, out: &mut bytes::BytesMut) -> BindResult {
        match *ty {
            Type::INT2 => parse::<i16>(self, ty, s)?.to_sql(ty, out),
            Type::INT4 => parse::<i32>(self, ty, s)?.to_sql(ty, out),
            Type::INT8 => parse::<i64>(self, ty, s)?.to_sql(ty, out),
            Type::FLOAT4 => parse::<f32>(self, ty, s)?.to_sql(ty, out),
            Type::FLOAT8 => parse::<f64>(self, ty, s)?.to_sql(ty, out),
            Type::NUMERIC => parse::<Decimal>(self, ty, s)?.to_sql(ty, out),
            Type::BOOL => parse_bool(self, ty, s)?.to_sql(ty, out),
            Type::UUID => parse::<Uuid>(self, ty, s)?.to_sql(ty, out),
            Type::TIMESTAMP => parse_timestamp(self, ty, s)?.to_sql(ty, out),
            Type::TIMESTAMPTZ => parse_timestamp(self, ty, s)?.and_utc().to_sql(ty, out),
            Type::DATE => parse_timestamp(self, ty, s)?.date().to_sql(ty, out),
            Type::JSON | Type::JSONB => serde_json::from_str::<Value>(s)
                .unwrap_or_else(|_| Value::String(s.to_string()))
                .to_sql(ty, out),
            Type::TIME => parse::<NaiveTime>(self, ty, s)?.to_sql(ty, out),
            Type::INET => parse::<IpAddr>(self, ty, s)?.to_sql(ty, out),
            Type::BYTEA => s.as_bytes().to_sql(ty, out),
            ref t if <&str as ToSql>::accepts(t) => s.to_sql(ty, out),
            // Enum labels travel as plain text.
            ref t if matches!(t.kind(), Kind::Enum(_)) => {
                out.extend_from_slice(s.as_bytes());
                Ok(IsNull::No)
            }
            _ => Err(BindError::boxed(self, ty, "no text conversion for this column type")),
        }
    }
}

impl ToSql for RowValues {
    fn to_sql(&self, ty: &Type, out: &mut bytes::BytesMut) -> BindResult {
        match self {
            RowValues::Int(i) => self.int_to_sql(*i, ty, out),
            RowValues::Float(f) => self.float_to_sql(*f, ty, out),
            RowValues::Text(s) => self.text_to_sql(s, ty, out),
            RowValues::Bool(b) => match *ty {
                Type::BOOL => (*b).to_sql(ty, out),
                ref t if is_text(t) => b.to_string().to_sql(ty, out),
                _ => Err(BindError::boxed(self, ty, "boolean does not fit this column")),
            },
            RowValues::Timestamp(dt) => match *ty {
                Type::TIMESTAMP => dt.to_sql(ty, out),
                Type::TIMESTAMPTZ => dt.and_utc().to_sql(ty, out),
                Type::DATE => dt.date().to_sql(ty, out),
                Type::TIME => dt.time().to_sql(ty, out),
                ref t if is_text(t) => dt.to_string().to_sql(ty, out),
                _ => Err(BindError::boxed(self, ty, "timestamp does not fit this column")),
            },
            RowValues::Null => Ok(IsNull::Yes),
            RowValues::JSON(jsval) => match *ty {
                Type::JSON | Type::JSONB => jsval.to_sql(ty, out),
                ref t if is_text(t) => jsval.to_string().to_sql(ty, out),
                _ => Err(BindError::boxed(self, ty, "json does not fit this column")),
            },
            RowValues::Blob(bytes) => match *ty {
                Type::BYTEA => bytes.to_sql(ty, out),
                _ => Err(BindError::boxed(self, ty, "bytes do not fit this column")),
            },
        }
    }

    /// Every column type is accepted so `NULL` binds anywhere; values that do not fit the
    /// declared type fail in `to_sql` with a `BindError`.
    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_postgres::types::FromSql;

    fn encode(
        value: &RowValues,
        ty: &Type,
    ) -> Result<bytes::BytesMut, Box<dyn Error + Sync + Send>> {
        let mut out = bytes::BytesMut::new();
        value.to_sql(ty, &mut out)?;
        Ok(out)
    }

    fn decode<'a, T: FromSql<'a>>(ty: &Type, raw: &'a [u8]) -> T {
        T::from_sql(ty, raw).unwrap()
    }

    #[test]
    fn text_ids_bind_as_the_column_type() {
        let id = RowValues::Text("7".into());
        assert_eq!(decode::<i32>(&Type::INT4, &encode(&id, &Type::INT4).unwrap()), 7);
        assert_eq!(decode::<i64>(&Type::INT8, &encode(&id, &Type::INT8).unwrap()), 7);
        assert_eq!(decode::<i16>(&Type::INT2, &encode(&id, &Type::INT2).unwrap()), 7);
        let flag = RowValues::Text("false".into());
        assert!(!decode::<bool>(&Type::BOOL, &encode(&flag, &Type::BOOL).unwrap()));
    }

    #[test]
    fn unparsable_text_is_a_bind_error() {
        let err = encode(&RowValues::Text("seven".into()), &Type::INT4).unwrap_err();
        assert!(err.downcast_ref::<BindError>().is_some(), "{err}");
        let err = encode(&RowValues::Int(70_000), &Type::INT2).unwrap_err();
        assert!(err.downcast_ref::<BindError>().is_some(), "{err}");
    }

    #[test]
    fn integers_narrow_to_real() {
        let out = encode(&RowValues::Int(2), &Type::FLOAT4).unwrap();
        assert_eq!(out.len(), 4);
        assert!((decode::<f32>(&Type::FLOAT4, &out) - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn timestamps_bind_into_date_columns() {
        let dt = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(13, 5, 0)
            .unwrap();
        let out = encode(&RowValues::Timestamp(dt), &Type::DATE).unwrap();
        assert_eq!(decode::<NaiveDate>(&Type::DATE, &out), dt.date());
        let out = encode(&RowValues::Text("2024-03-01".into()), &Type::DATE).unwrap();
        assert_eq!(decode::<NaiveDate>(&Type::DATE, &out), dt.date());
    }

    #[test]
    fn numeric_and_uuid_accept_text_and_numbers() {
        let out = encode(&RowValues::Text("12.50".into()), &Type::NUMERIC).unwrap();
        assert_eq!(decode::<Decimal>(&Type::NUMERIC, &out), Decimal::new(1250, 2));
        let out = encode(&RowValues::Int(3), &Type::NUMERIC).unwrap();
        assert_eq!(decode::<Decimal>(&Type::NUMERIC, &out), Decimal::from(3));

        let id = "67e55044-10b1-426f-9247-bb680e5fe0c8";
        let out = encode(&RowValues::Text(id.into()), &Type::UUID).unwrap();
        assert_eq!(decode::<Uuid>(&Type::UUID, &out).to_string(), id);
    }

    #[test]
    fn mismatched_values_are_rejected_not_miswritten() {
        assert!(encode(&RowValues::Bool(true), &Type::INT4).is_err());
        assert!(encode(&RowValues::Blob(vec![1]), &Type::TEXT).is_err());
        assert!(encode(&RowValues::Float(1.5), &Type::INT8).is_err());
        assert!(encode(&RowValues::Text("1 day".into()), &Type::INTERVAL).is_err());
    }

    #[test]
    fn null_binds_to_any_column_type() {
        for ty in [Type::INTERVAL, Type::UUID, Type::TIME, Type::INT4_ARRAY] {
            assert!(<RowValues as ToSql>::accepts(&ty));
            let mut out = bytes::BytesMut::new();
            assert!(matches!(RowValues::Null.to_sql(&ty, &mut out), Ok(IsNull::Yes)));
        }
    }
}
