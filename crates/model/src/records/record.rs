use serde::{Deserialize, Serialize};

/// One parsed input line: field names paired with their raw text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
    /// 1-based line in the source the record started on.
    pub line: u64,
    pub fields: Vec<(String, String)>,
}

impl SourceRecord {
    pub fn new(line: u64, fields: Vec<(String, String)>) -> Self {
        SourceRecord { line, fields }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(field))
            .map(|(_, value)| value.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
