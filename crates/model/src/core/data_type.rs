use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt, str::FromStr};

/// Logical column types a row can be encoded into.
///
/// The set is closed on purpose: parsing, binding and decoding all match on it
/// exhaustively, so a new variant has to be handled everywhere before the
/// workspace compiles again.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Ascii,
    Text,
    TinyInt,
    SmallInt,
    Int,
    BigInt,
    Float,
    Double,
    Decimal,
    Boolean,
    Timestamp,
    Date,
    Time,
    Uuid,
    TimeUuid,
    Blob,
    Inet,
}

lazy_static! {
    static ref CQL_TYPE_MAP: HashMap<&'static str, DataType> = build_cql_type_map();
}

impl DataType {
    /// Resolves a CQL type name as reported by `system_schema.columns`.
    pub fn from_cql_type(type_name: &str) -> Result<Self, String> {
        let normalized = type_name.trim().to_lowercase();
        CQL_TYPE_MAP
            .get(normalized.as_str())
            .copied()
            .ok_or_else(|| format!("Unsupported CQL column type: {type_name}"))
    }

    pub fn cql_name(&self) -> &'static str {
        match self {
            DataType::Ascii => "ascii",
            DataType::Text => "text",
            DataType::TinyInt => "tinyint",
            DataType::SmallInt => "smallint",
            DataType::Int => "int",
            DataType::BigInt => "bigint",
            DataType::Float => "float",
            DataType::Double => "double",
            DataType::Decimal => "decimal",
            DataType::Boolean => "boolean",
            DataType::Timestamp => "timestamp",
            DataType::Date => "date",
            DataType::Time => "time",
            DataType::Uuid => "uuid",
            DataType::TimeUuid => "timeuuid",
            DataType::Blob => "blob",
            DataType::Inet => "inet",
        }
    }

    /// Text-like columns accept an empty string as a real value.
    pub fn accepts_empty(&self) -> bool {
        matches!(self, DataType::Text | DataType::Ascii)
    }
}

impl FromStr for DataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DataType::from_cql_type(s)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cql_name())
    }
}

fn build_cql_type_map() -> HashMap<&'static str, DataType> {
    use DataType::*;

    let entries = [
        ("ascii", Ascii),
        ("text", Text),
        ("varchar", Text),
        ("tinyint", TinyInt),
        ("smallint", SmallInt),
        ("int", Int),
        ("bigint", BigInt),
        ("float", Float),
        ("double", Double),
        ("decimal", Decimal),
        ("boolean", Boolean),
        ("timestamp", Timestamp),
        ("date", Date),
        ("time", Time),
        ("uuid", Uuid),
        ("timeuuid", TimeUuid),
        ("blob", Blob),
        ("inet", Inet),
    ];

    let mut map = HashMap::new();
    for (name, data_type) in entries {
        map.insert(name, data_type);
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_aliases_case_insensitively() {
        assert_eq!(DataType::from_cql_type("VARCHAR"), Ok(DataType::Text));
        assert_eq!(DataType::from_cql_type(" bigint "), Ok(DataType::BigInt));
        assert_eq!("timeuuid".parse::<DataType>(), Ok(DataType::TimeUuid));
    }

    #[test]
    fn rejects_unsupported_types() {
        assert!(DataType::from_cql_type("counter").is_err());
        assert!(DataType::from_cql_type("list<int>").is_err());
        assert!(DataType::from_cql_type("varint").is_err());
    }

    #[test]
    fn cql_name_round_trips_through_the_map() {
        for name in ["ascii", "text", "int", "decimal", "timestamp", "inet"] {
            let data_type = DataType::from_cql_type(name).unwrap();
            assert_eq!(data_type.cql_name(), name);
        }
    }
}
