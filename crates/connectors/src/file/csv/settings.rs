use serde::{Deserialize, Serialize};

/// Dialect options for the CSV reader. The first row is always the header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvSettings {
    pub delimiter: char,
    pub quote: char,
    /// Trim surrounding whitespace from headers and fields.
    pub trim: bool,
}

impl CsvSettings {
    pub fn new(delimiter: char) -> Self {
        CsvSettings {
            delimiter,
            ..Default::default()
        }
    }

    pub(crate) fn reader_builder(&self) -> csv::ReaderBuilder {
        let mut builder = csv::ReaderBuilder::new();
        builder
            .delimiter(self.delimiter as u8)
            .quote(self.quote as u8)
            .has_headers(true)
            .trim(if self.trim {
                csv::Trim::All
            } else {
                csv::Trim::None
            });
        builder
    }
}

impl Default for CsvSettings {
    fn default() -> Self {
        CsvSettings {
            delimiter: ',',
            quote: '"',
            trim: false,
        }
    }
}
