use engine_config::error::ConfigError;
use engine_core::error::ConnectionError;
use engine_processing::error::{IngestError, ValidationError, WriteError};
use connectors::cql::error::DbError;
use thiserror::Error;

pub const EXIT_GENERAL: u8 = 1;
pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_INPUT: u8 = 3;
pub const EXIT_WRITE: u8 = 4;
pub const EXIT_MISMATCH: u8 = 5;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Ingestion failed: {0}")]
    Ingest(#[from] IngestError),

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error("Failed to read table schema: {0}")]
    Schema(#[from] DbError),

    /// The run finished but skipped records or batches.
    #[error("{record_failures} records rejected, {batches_failed} batches failed")]
    Incomplete {
        record_failures: u64,
        batches_failed: u64,
    },

    #[error("{discrepancies} of {total} rows differ from the reference input")]
    Mismatch { discrepancies: u64, total: u64 },

    #[error("Failed to write output: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to write CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to serialize data to JSON: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    #[error("Invalid arguments: {0}")]
    Usage(String),
}

impl CliError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::Config(_) | CliError::Usage(_) => EXIT_CONFIG,
            CliError::Ingest(err) => match err {
                IngestError::Connection(_) => EXIT_WRITE,
                IngestError::Input(_) => EXIT_INPUT,
                IngestError::Stopped { .. } if err.has_failed_batches() => EXIT_WRITE,
                IngestError::Stopped { cause, .. } => match cause {
                    WriteError::Record(_) | WriteError::Input(_) => EXIT_INPUT,
                    WriteError::Submit { .. } | WriteError::Task(_) => EXIT_WRITE,
                },
            },
            CliError::Validation(err) => match err {
                ValidationError::InvalidKey(_) => EXIT_CONFIG,
                ValidationError::Encoding { .. } | ValidationError::Input(_) => EXIT_INPUT,
                ValidationError::Connection(_) => EXIT_WRITE,
            },
            CliError::Connection(_) | CliError::Schema(_) => EXIT_WRITE,
            CliError::Incomplete { batches_failed, .. } => {
                if *batches_failed > 0 {
                    EXIT_WRITE
                } else {
                    EXIT_INPUT
                }
            }
            CliError::Mismatch { .. } => EXIT_MISMATCH,
            CliError::Io(_) | CliError::Csv(_) | CliError::JsonSerialize(_) => EXIT_GENERAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use connectors::file::csv::error::FileError;
    use engine_core::metrics::MetricsSnapshot;
    use engine_processing::error::{EncodingError, RecordFailure};
    use model::core::identifiers::BatchId;

    #[test]
    fn test_exit_codes() {
        let config = CliError::Config(ConfigError::Invalid("batch_size must be positive".into()));
        assert_eq!(config.exit_code(), 2);

        let stopped_on_record = CliError::Ingest(IngestError::Stopped {
            processed: 10,
            metrics: MetricsSnapshot::default(),
            cause: WriteError::Record(RecordFailure::Encoding {
                line: 12,
                source: EncodingError::Empty {
                    column: "colid".into(),
                },
            }),
        });
        assert_eq!(stopped_on_record.exit_code(), 3);

        let stopped_on_batch = CliError::Ingest(IngestError::Stopped {
            processed: 0,
            metrics: MetricsSnapshot::default(),
            cause: WriteError::Submit {
                batch_id: BatchId::new("b-1"),
                batch_size: 200,
                first_line: 2,
                source: DbError::Write("timeout".into()),
            },
        });
        assert_eq!(stopped_on_batch.exit_code(), 4);

        let missing = CliError::Ingest(IngestError::Input(FileError::NotFound("a.csv".into())));
        assert_eq!(missing.exit_code(), 3);

        let mismatch = CliError::Mismatch {
            discrepancies: 1,
            total: 10,
        };
        assert_eq!(mismatch.exit_code(), 5);
    }

    #[test]
    fn test_stopped_run_with_failed_batch_is_a_write_error() {
        let err = CliError::Ingest(IngestError::Stopped {
            processed: 0,
            metrics: MetricsSnapshot {
                batches_failed: 1,
                record_failures: 1,
                ..Default::default()
            },
            cause: WriteError::Record(RecordFailure::Encoding {
                line: 4,
                source: EncodingError::Empty {
                    column: "colid".into(),
                },
            }),
        });
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn test_incomplete_run_exit_code() {
        let records_only = CliError::Incomplete {
            record_failures: 1,
            batches_failed: 0,
        };
        assert_eq!(records_only.exit_code(), 3);

        let with_batches = CliError::Incomplete {
            record_failures: 1,
            batches_failed: 2,
        };
        assert_eq!(with_batches.exit_code(), 4);
    }
}
