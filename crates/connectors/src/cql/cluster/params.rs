use crate::cql::error::DbError;
use chrono::{NaiveDate, NaiveTime, Timelike};
use model::core::value::Value;
use scylla::value::{CqlDate, CqlDecimal, CqlTime, CqlTimestamp, CqlTimeuuid, CqlValue};

/// Day numbering used by the `date` type: 2^31 is the unix epoch.
pub(crate) const DATE_EPOCH_OFFSET: i64 = 1 << 31;

pub(crate) fn unix_epoch() -> NaiveDate {
    NaiveDate::default()
}

/// Binds a typed value to its CQL wire value. `Null` binds as an unset cell.
pub fn to_cql_value(value: &Value) -> Result<Option<CqlValue>, DbError> {
    let bound = match value {
        Value::Ascii(v) => CqlValue::Ascii(v.clone()),
        Value::Text(v) => CqlValue::Text(v.clone()),
        Value::TinyInt(v) => CqlValue::TinyInt(*v),
        Value::SmallInt(v) => CqlValue::SmallInt(*v),
        Value::Int(v) => CqlValue::Int(*v),
        Value::BigInt(v) => CqlValue::BigInt(*v),
        Value::Float(v) => CqlValue::Float(*v),
        Value::Double(v) => CqlValue::Double(*v),
        Value::Decimal(v) => {
            let (digits, scale) = v.as_bigint_and_exponent();
            let scale = i32::try_from(scale)
                .map_err(|_| DbError::Conversion(format!("decimal scale out of range: {v}")))?;
            CqlValue::Decimal(CqlDecimal::from_signed_be_bytes_and_exponent(
                digits.to_signed_bytes_be(),
                scale,
            ))
        }
        Value::Boolean(v) => CqlValue::Boolean(*v),
        Value::Timestamp(v) => CqlValue::Timestamp(CqlTimestamp(v.timestamp_millis())),
        Value::Date(v) => CqlValue::Date(date_to_cql(*v)?),
        Value::Time(v) => CqlValue::Time(time_to_cql(*v)),
        Value::Uuid(v) => CqlValue::Uuid(*v),
        Value::TimeUuid(v) => CqlValue::Timeuuid(CqlTimeuuid::from(*v)),
        Value::Blob(v) => CqlValue::Blob(v.clone()),
        Value::Inet(v) => CqlValue::Inet(*v),
        Value::Null => return Ok(None),
    };
    Ok(Some(bound))
}

pub fn to_cql_values(values: &[Value]) -> Result<Vec<Option<CqlValue>>, DbError> {
    values.iter().map(to_cql_value).collect()
}

fn date_to_cql(date: NaiveDate) -> Result<CqlDate, DbError> {
    let days = (date - unix_epoch()).num_days() + DATE_EPOCH_OFFSET;
    u32::try_from(days)
        .map(CqlDate)
        .map_err(|_| DbError::Conversion(format!("date out of range: {date}")))
}

fn time_to_cql(time: NaiveTime) -> CqlTime {
    let nanos = i64::from(time.num_seconds_from_midnight()) * 1_000_000_000
        + i64::from(time.nanosecond());
    CqlTime(nanos)
}
