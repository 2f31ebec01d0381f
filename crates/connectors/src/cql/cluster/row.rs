use super::params::{DATE_EPOCH_OFFSET, unix_epoch};
use crate::cql::error::DbError;
use bigdecimal::{BigDecimal, num_bigint::BigInt};
use chrono::{DateTime, Duration, NaiveTime};
use model::core::{data_type::DataType, value::Value};
use scylla::value::CqlValue;
use uuid::Uuid;

/// Decodes a stored cell into the model value for the column's declared type.
pub fn from_cql_value(
    column: &str,
    data_type: DataType,
    cell: Option<CqlValue>,
) -> Result<Value, DbError> {
    let Some(cell) = cell else {
        return Ok(Value::Null);
    };

    let mismatch = |cell: &CqlValue| {
        DbError::Conversion(format!(
            "column '{column}' declared as {data_type} but the store returned {cell:?}"
        ))
    };

    let value = match (data_type, cell) {
        (_, CqlValue::Empty) => Value::Null,
        (DataType::Ascii, CqlValue::Ascii(v) | CqlValue::Text(v)) => Value::Ascii(v),
        (DataType::Text, CqlValue::Text(v) | CqlValue::Ascii(v)) => Value::Text(v),
        (DataType::TinyInt, CqlValue::TinyInt(v)) => Value::TinyInt(v),
        (DataType::SmallInt, CqlValue::SmallInt(v)) => Value::SmallInt(v),
        (DataType::Int, CqlValue::Int(v)) => Value::Int(v),
        (DataType::BigInt, CqlValue::BigInt(v)) => Value::BigInt(v),
        (DataType::Float, CqlValue::Float(v)) => Value::Float(v),
        (DataType::Double, CqlValue::Double(v)) => Value::Double(v),
        (DataType::Decimal, CqlValue::Decimal(v)) => {
            let (bytes, scale) = v.as_signed_be_bytes_slice_and_exponent();
            Value::Decimal(BigDecimal::new(
                BigInt::from_signed_bytes_be(bytes),
                i64::from(scale),
            ))
        }
        (DataType::Boolean, CqlValue::Boolean(v)) => Value::Boolean(v),
        (DataType::Timestamp, CqlValue::Timestamp(v)) => DateTime::from_timestamp_millis(v.0)
            .map(Value::Timestamp)
            .ok_or_else(|| DbError::Conversion(format!("timestamp out of range in '{column}'")))?,
        (DataType::Date, CqlValue::Date(v)) => {
            let days = i64::from(v.0) - DATE_EPOCH_OFFSET;
            unix_epoch()
                .checked_add_signed(Duration::days(days))
                .map(Value::Date)
                .ok_or_else(|| DbError::Conversion(format!("date out of range in '{column}'")))?
        }
        (DataType::Time, CqlValue::Time(v)) => {
            let secs = u32::try_from(v.0 / 1_000_000_000).ok();
            let nanos = u32::try_from(v.0 % 1_000_000_000).ok();
            secs.zip(nanos)
                .and_then(|(s, n)| NaiveTime::from_num_seconds_from_midnight_opt(s, n))
                .map(Value::Time)
                .ok_or_else(|| DbError::Conversion(format!("time out of range in '{column}'")))?
        }
        (DataType::Uuid, CqlValue::Uuid(v)) => Value::Uuid(v),
        (DataType::Uuid, CqlValue::Timeuuid(v)) => Value::Uuid(Uuid::from(v)),
        (DataType::TimeUuid, CqlValue::Timeuuid(v)) => Value::TimeUuid(Uuid::from(v)),
        (DataType::TimeUuid, CqlValue::Uuid(v)) => Value::TimeUuid(v),
        (DataType::Blob, CqlValue::Blob(v)) => Value::Blob(v),
        (DataType::Inet, CqlValue::Inet(v)) => Value::Inet(v),
        (_, other) => return Err(mismatch(&other)),
    };

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scylla::value::{CqlDate, CqlTimestamp};

    #[test]
    fn decodes_missing_cell_as_null() {
        assert_eq!(from_cql_value("c", DataType::Int, None).unwrap(), Value::Null);
    }

    #[test]
    fn decodes_timestamp_millis() {
        let value =
            from_cql_value("ts", DataType::Timestamp, Some(CqlValue::Timestamp(CqlTimestamp(1_500)))).unwrap();
        let Value::Timestamp(ts) = value else {
            panic!("expected timestamp");
        };
        assert_eq!(ts.timestamp_millis(), 1_500);
    }

    #[test]
    fn decodes_date_relative_to_epoch_offset() {
        let value =
            from_cql_value("d", DataType::Date, Some(CqlValue::Date(CqlDate((1 << 31) + 1)))).unwrap();
        assert_eq!(value, Value::Date(unix_epoch().succ_opt().unwrap()));
    }

    #[test]
    fn rejects_type_mismatch() {
        let err = from_cql_value("c", DataType::Int, Some(CqlValue::Text("x".into()))).unwrap_err();
        assert!(matches!(err, DbError::Conversion(_)));
    }
}
