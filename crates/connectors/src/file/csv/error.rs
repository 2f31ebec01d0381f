use thiserror::Error;

#[derive(Debug, Error)]
pub enum FileError {
    #[error("File not found: {0}")]
    NotFound(String),
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("CSV parsing error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("Invalid CSV header: {0}")]
    InvalidHeader(String),
    #[error("Malformed record at line {line}: {reason}")]
    MalformedRecord { line: u64, reason: String },
}

impl FileError {
    /// Source line the error refers to, when it concerns one record.
    pub fn line(&self) -> Option<u64> {
        match self {
            FileError::MalformedRecord { line, .. } => Some(*line),
            _ => None,
        }
    }

    /// Whether reading can continue with the next record.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, FileError::MalformedRecord { .. })
    }
}
