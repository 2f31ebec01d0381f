use crate::core::data_type::DataType;
use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, net::IpAddr};
use uuid::Uuid;

/// A typed cell value, one variant per [`DataType`] plus `Null`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Value {
    Ascii(String),
    Text(String),
    TinyInt(i8),
    SmallInt(i16),
    Int(i32),
    BigInt(i64),
    Float(f32),
    Double(f64),
    Decimal(BigDecimal),
    Boolean(bool),
    Timestamp(DateTime<Utc>),
    Date(NaiveDate),
    Time(NaiveTime),
    Uuid(Uuid),
    TimeUuid(Uuid),
    Blob(Vec<u8>),
    Inet(IpAddr),
    Null,
}

impl Value {
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Value::Ascii(_) => Some(DataType::Ascii),
            Value::Text(_) => Some(DataType::Text),
            Value::TinyInt(_) => Some(DataType::TinyInt),
            Value::SmallInt(_) => Some(DataType::SmallInt),
            Value::Int(_) => Some(DataType::Int),
            Value::BigInt(_) => Some(DataType::BigInt),
            Value::Float(_) => Some(DataType::Float),
            Value::Double(_) => Some(DataType::Double),
            Value::Decimal(_) => Some(DataType::Decimal),
            Value::Boolean(_) => Some(DataType::Boolean),
            Value::Timestamp(_) => Some(DataType::Timestamp),
            Value::Date(_) => Some(DataType::Date),
            Value::Time(_) => Some(DataType::Time),
            Value::Uuid(_) => Some(DataType::Uuid),
            Value::TimeUuid(_) => Some(DataType::TimeUuid),
            Value::Blob(_) => Some(DataType::Blob),
            Value::Inet(_) => Some(DataType::Inet),
            Value::Null => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Equality used when comparing a stored cell against the source value.
    ///
    /// Exact after coercion: no numeric tolerance, timestamps compared at
    /// millisecond precision (the unit a CQL `timestamp` keeps).
    pub fn matches(&self, stored: &Value) -> bool {
        use Value::*;
        match (self, stored) {
            (Null, Null) => true,
            (Ascii(a) | Text(a), Ascii(b) | Text(b)) => a == b,
            (Uuid(a) | TimeUuid(a), Uuid(b) | TimeUuid(b)) => a == b,
            (Timestamp(a), Timestamp(b)) => a.timestamp_millis() == b.timestamp_millis(),
            (Float(a), Float(b)) => a.to_bits() == b.to_bits() || a == b,
            (Double(a), Double(b)) => a.to_bits() == b.to_bits() || a == b,
            (Decimal(a), Decimal(b)) => a == b,
            (TinyInt(a), TinyInt(b)) => a == b,
            (SmallInt(a), SmallInt(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (BigInt(a), BigInt(b)) => a == b,
            (Boolean(a), Boolean(b)) => a == b,
            (Date(a), Date(b)) => a == b,
            (Time(a), Time(b)) => a == b,
            (Blob(a), Blob(b)) => a == b,
            (Inet(a), Inet(b)) => a == b,
            _ => false,
        }
    }

    pub fn size_bytes(&self) -> usize {
        match self {
            Value::Ascii(s) | Value::Text(s) => s.len(),
            Value::TinyInt(_) => 1,
            Value::SmallInt(_) => 2,
            Value::Int(_) | Value::Float(_) | Value::Date(_) => 4,
            Value::BigInt(_) | Value::Double(_) | Value::Timestamp(_) | Value::Time(_) => 8,
            Value::Decimal(v) => v.to_string().len(),
            Value::Boolean(_) => 1,
            Value::Uuid(_) | Value::TimeUuid(_) => 16,
            Value::Blob(b) => b.len(),
            Value::Inet(IpAddr::V4(_)) => 4,
            Value::Inet(IpAddr::V6(_)) => 16,
            Value::Null => 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldValue {
    pub name: String,
    pub value: Value,
    pub data_type: DataType,
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Ascii(v) | Value::Text(v) => write!(f, "'{}'", v.replace('\'', "''")),
            Value::TinyInt(v) => write!(f, "{v}"),
            Value::SmallInt(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::BigInt(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::Decimal(v) => write!(f, "{v}"),
            Value::Boolean(v) => write!(f, "{v}"),
            Value::Timestamp(v) => write!(f, "'{}'", v.format("%Y-%m-%d %H:%M:%S%.3f%z")),
            Value::Date(v) => write!(f, "'{v}'"),
            Value::Time(v) => write!(f, "'{v}'"),
            Value::Uuid(v) | Value::TimeUuid(v) => write!(f, "{v}"),
            Value::Blob(v) => {
                let hex = v
                    .iter()
                    .fold(String::from("0x"), |acc, byte| acc + &format!("{byte:02x}"));
                f.write_str(&hex)
            }
            Value::Inet(v) => write!(f, "'{v}'"),
            Value::Null => write!(f, "NULL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamps_match_at_millisecond_precision() {
        let micros = Utc.timestamp_micros(1_700_000_000_123_456).unwrap();
        let millis = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert!(Value::Timestamp(micros).matches(&Value::Timestamp(millis)));
        assert!(!Value::Timestamp(millis).matches(&Value::Timestamp(
            Utc.timestamp_millis_opt(1_700_000_000_124).unwrap()
        )));
    }

    #[test]
    fn numbers_match_exactly_without_cross_width_coercion() {
        assert!(Value::Double(0.1).matches(&Value::Double(0.1)));
        assert!(!Value::Double(0.1).matches(&Value::Double(0.1 + f64::EPSILON)));
        assert!(!Value::Int(1).matches(&Value::BigInt(1)));
    }

    #[test]
    fn text_flavours_compare_by_content() {
        assert!(Value::Ascii("abc".into()).matches(&Value::Text("abc".into())));
        assert!(!Value::Text("abc".into()).matches(&Value::Null));
        assert!(Value::Null.matches(&Value::Null));
    }

    #[test]
    fn display_renders_cql_literals() {
        assert_eq!(Value::Text("it's".into()).to_string(), "'it''s'");
        assert_eq!(Value::Blob(vec![0xca, 0xfe]).to_string(), "0xcafe");
        assert_eq!(Value::Null.to_string(), "NULL");
    }
}
