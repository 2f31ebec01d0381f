use crate::error::EncodingError;
use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use model::{
    core::{
        data_type::DataType,
        value::{FieldValue, Value},
    },
    records::{record::SourceRecord, row::RowData},
    schema::RowSchema,
};
use std::{net::IpAddr, str::FromStr};
use uuid::Uuid;

/// Converts one source record into a typed row for `schema`.
///
/// Pure and deterministic: the same record and schema always give the same
/// row or the same error. Field order follows the record; names are taken
/// from the schema so they match the table's own spelling.
pub fn encode(record: &SourceRecord, schema: &RowSchema) -> Result<RowData, EncodingError> {
    let mut field_values = Vec::with_capacity(record.len());

    for (name, raw) in &record.fields {
        let column = schema
            .column(name)
            .ok_or_else(|| EncodingError::UnknownColumn {
                column: name.clone(),
            })?;
        let is_key = schema.is_key_column(&column.name);
        let value = encode_field(&column.name, raw, column.data_type, is_key)?;

        field_values.push(FieldValue {
            name: column.name.clone(),
            value,
            data_type: column.data_type,
        });
    }

    for key in schema.primary_key() {
        if !field_values.iter().any(|fv| fv.name == *key) {
            return Err(EncodingError::MissingKey {
                column: key.clone(),
            });
        }
    }

    Ok(RowData::new(record.line, field_values))
}

fn encode_field(
    column: &str,
    raw: &str,
    data_type: DataType,
    is_key: bool,
) -> Result<Value, EncodingError> {
    let blank = if data_type.accepts_empty() {
        raw.is_empty()
    } else {
        raw.trim().is_empty()
    };

    if blank {
        if is_key {
            return Err(EncodingError::Empty {
                column: column.to_string(),
            });
        }
        if !data_type.accepts_empty() {
            return Ok(Value::Null);
        }
    }

    parse_value(raw, data_type).map_err(|reason| EncodingError::Parse {
        column: column.to_string(),
        raw_value: raw.to_string(),
        data_type,
        reason,
    })
}

/// Parses a non-empty raw string into the value for `data_type`.
pub fn parse_value(raw: &str, data_type: DataType) -> Result<Value, String> {
    let trimmed = raw.trim();
    match data_type {
        DataType::Text => Ok(Value::Text(raw.to_string())),
        DataType::Ascii => {
            if raw.is_ascii() {
                Ok(Value::Ascii(raw.to_string()))
            } else {
                Err("contains non-ASCII characters".to_string())
            }
        }
        DataType::TinyInt => trimmed.parse().map(Value::TinyInt).map_err(|e| e.to_string()),
        DataType::SmallInt => trimmed.parse().map(Value::SmallInt).map_err(|e| e.to_string()),
        DataType::Int => trimmed.parse().map(Value::Int).map_err(|e| e.to_string()),
        DataType::BigInt => trimmed.parse().map(Value::BigInt).map_err(|e| e.to_string()),
        DataType::Float => {
            let v: f32 = trimmed.parse().map_err(|e: std::num::ParseFloatError| e.to_string())?;
            finite(v, v.is_finite()).map(Value::Float)
        }
        DataType::Double => {
            let v: f64 = trimmed.parse().map_err(|e: std::num::ParseFloatError| e.to_string())?;
            finite(v, v.is_finite()).map(Value::Double)
        }
        DataType::Decimal => BigDecimal::from_str(trimmed)
            .map(Value::Decimal)
            .map_err(|e| e.to_string()),
        DataType::Boolean => match trimmed.to_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(Value::Boolean(true)),
            "false" | "0" | "no" => Ok(Value::Boolean(false)),
            _ => Err("expected true/false, 1/0 or yes/no".to_string()),
        },
        DataType::Timestamp => parse_timestamp(trimmed).map(Value::Timestamp),
        DataType::Date => NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
            .map(Value::Date)
            .map_err(|e| e.to_string()),
        DataType::Time => NaiveTime::parse_from_str(trimmed, "%H:%M:%S%.f")
            .map(Value::Time)
            .map_err(|e| e.to_string()),
        DataType::Uuid => Uuid::parse_str(trimmed)
            .map(Value::Uuid)
            .map_err(|e| e.to_string()),
        DataType::TimeUuid => {
            let uuid = Uuid::parse_str(trimmed).map_err(|e| e.to_string())?;
            if uuid.get_version_num() == 1 {
                Ok(Value::TimeUuid(uuid))
            } else {
                Err(format!(
                    "expected a version 1 uuid, got version {}",
                    uuid.get_version_num()
                ))
            }
        }
        DataType::Blob => parse_hex(trimmed).map(Value::Blob),
        DataType::Inet => IpAddr::from_str(trimmed)
            .map(Value::Inet)
            .map_err(|e| e.to_string()),
    }
}

fn finite<T>(value: T, is_finite: bool) -> Result<T, String> {
    if is_finite {
        Ok(value)
    } else {
        Err("non-finite values are not allowed".to_string())
    }
}

const NAIVE_TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Accepts RFC 3339, naive date-times (taken as UTC), bare dates and epoch
/// milliseconds. The result is truncated to milliseconds.
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    let parsed = if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        dt.with_timezone(&Utc)
    } else if let Some(dt) = NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    {
        dt.and_utc()
    } else if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        date.and_time(NaiveTime::MIN).and_utc()
    } else if let Ok(millis) = raw.parse::<i64>() {
        DateTime::from_timestamp_millis(millis)
            .ok_or_else(|| "epoch milliseconds out of range".to_string())?
    } else {
        return Err("expected RFC 3339, 'YYYY-MM-DD HH:MM:SS', a date or epoch milliseconds".into());
    };

    DateTime::from_timestamp_millis(parsed.timestamp_millis())
        .ok_or_else(|| "timestamp out of range".to_string())
}

fn parse_hex(raw: &str) -> Result<Vec<u8>, String> {
    let digits = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .ok_or_else(|| "blob literals must start with 0x".to_string())?;

    if digits.len() % 2 != 0 {
        return Err("odd number of hex digits".to_string());
    }

    (0..digits.len())
        .step_by(2)
        .map(|i| {
            digits
                .get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| format!("invalid hex digits at offset {i}"))
        })
        .collect()
}
