use crate::core::value::{FieldValue, Value};
use serde::{Deserialize, Serialize};

/// A record after encoding: typed values in source field order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowData {
    pub line: u64,
    pub field_values: Vec<FieldValue>,
}

impl RowData {
    pub fn new(line: u64, field_values: Vec<FieldValue>) -> Self {
        RowData { line, field_values }
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.field_values
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(field))
    }

    pub fn get_value(&self, field: &str) -> Value {
        self.get(field)
            .map(|f| f.value.clone())
            .unwrap_or(Value::Null)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.field_values.iter().map(|f| f.name.clone()).collect()
    }

    pub fn values(&self) -> Vec<Value> {
        self.field_values.iter().map(|f| f.value.clone()).collect()
    }

    pub fn size_bytes(&self) -> usize {
        self.field_values.iter().map(|f| f.value.size_bytes()).sum()
    }
}
