use connectors::{cql::error::DbError, file::csv::error::FileError};
use engine_config::report::ingest::{FailureEntry, FailureKind};
use engine_core::{error::ConnectionError, metrics::MetricsSnapshot};
use model::core::{data_type::DataType, identifiers::BatchId};
use thiserror::Error;

/// A raw field could not be turned into a typed value. Every variant names
/// the offending column.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    #[error("column '{column}' is not part of the table schema")]
    UnknownColumn { column: String },

    #[error("primary key column '{column}' is empty")]
    Empty { column: String },

    #[error("column '{column}': cannot parse '{raw_value}' as {data_type}: {reason}")]
    Parse {
        column: String,
        raw_value: String,
        data_type: DataType,
        reason: String,
    },

    #[error("record has no value for primary key column '{column}'")]
    MissingKey { column: String },
}

impl EncodingError {
    pub fn column(&self) -> &str {
        match self {
            EncodingError::UnknownColumn { column }
            | EncodingError::Empty { column }
            | EncodingError::Parse { column, .. }
            | EncodingError::MissingKey { column } => column,
        }
    }
}

/// One input record that was rejected and not written.
#[derive(Error, Debug)]
pub enum RecordFailure {
    #[error("line {line}: {source}")]
    Encoding {
        line: u64,
        #[source]
        source: EncodingError,
    },

    #[error("{source}")]
    Input {
        #[source]
        source: FileError,
    },
}

impl RecordFailure {
    pub fn line(&self) -> Option<u64> {
        match self {
            RecordFailure::Encoding { line, .. } => Some(*line),
            RecordFailure::Input { source } => source.line(),
        }
    }

    pub fn column(&self) -> Option<&str> {
        match self {
            RecordFailure::Encoding { source, .. } => Some(source.column()),
            RecordFailure::Input { .. } => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("Record rejected: {0}")]
    Record(#[from] RecordFailure),

    /// The whole batch was aborted. Its rows are not counted as processed.
    #[error("Failed to write batch '{batch_id}' ({batch_size} rows from line {first_line}): {source}")]
    Submit {
        batch_id: BatchId,
        batch_size: usize,
        first_line: u64,
        #[source]
        source: DbError,
    },

    /// The input can no longer be read.
    #[error("Failed to read input: {0}")]
    Input(#[source] FileError),

    #[error("Batch submission task failed: {0}")]
    Task(String),
}

#[derive(Error, Debug)]
pub enum IngestError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error("Failed to open input: {0}")]
    Input(#[from] FileError),

    /// The run ended early: on the first failure under stop-on-first-error,
    /// or on an unreadable input. `processed` rows were committed.
    #[error("Stopped after {processed} rows: {cause}")]
    Stopped {
        processed: u64,
        /// Counters at the moment the run ended.
        metrics: MetricsSnapshot,
        #[source]
        cause: WriteError,
    },
}

impl IngestError {
    /// Rows committed before the run ended.
    pub fn processed(&self) -> u64 {
        match self {
            IngestError::Stopped { processed, .. } => *processed,
            _ => 0,
        }
    }

    /// Whether any batch write failed before the run ended, including one
    /// that failed while a different failure was stopping the run.
    pub fn has_failed_batches(&self) -> bool {
        match self {
            IngestError::Stopped { metrics, cause, .. } => {
                metrics.batches_failed > 0
                    || matches!(cause, WriteError::Submit { .. } | WriteError::Task(_))
            }
            _ => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid key columns: {0}")]
    InvalidKey(String),

    /// The reference input itself is malformed.
    #[error("line {line}: {source}")]
    Encoding {
        line: u64,
        #[source]
        source: EncodingError,
    },

    #[error("Failed to read input: {0}")]
    Input(#[from] FileError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

impl WriteError {
    /// Serializable form for the run report.
    pub fn to_failure_entry(&self) -> FailureEntry {
        let (kind, line, column, batch_id) = match self {
            WriteError::Record(failure @ RecordFailure::Encoding { .. }) => (
                FailureKind::Encoding,
                failure.line(),
                failure.column().map(str::to_string),
                None,
            ),
            WriteError::Record(failure @ RecordFailure::Input { .. }) => {
                (FailureKind::Input, failure.line(), None, None)
            }
            WriteError::Input(source) => (FailureKind::Input, source.line(), None, None),
            WriteError::Submit {
                batch_id,
                first_line,
                ..
            } => (
                FailureKind::Write,
                Some(*first_line),
                None,
                Some(batch_id.to_string()),
            ),
            WriteError::Task(_) => (FailureKind::Write, None, None, None),
        };

        FailureEntry {
            kind,
            line,
            column,
            batch_id,
            message: self.to_string(),
        }
    }
}
