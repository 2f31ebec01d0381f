use crate::{
    error::IngestError,
    writer::{BatchWriter, ErrorPolicy, sink::WriteSink},
};
use connectors::file::csv::{error::FileError, settings::CsvSettings, source::CsvRecordSource};
use engine_config::report::ingest::{IngestReport, IngestReportParams, throughput};
use engine_core::connection::ConnectionManager;
use model::{execution::connection::ConnectionConfig, schema::RowSchema};
use std::{fs::File, io::Read, path::Path, sync::Arc, time::Instant};
use tracing::{error, info, warn};

/// Path value that selects standard input.
pub const STDIN_PATH: &str = "-";

/// Runs one CSV input into the configured table.
///
/// Drivers are cheap to create; the session they write through is owned by
/// the shared [`ConnectionManager`] and reused across runs with the same
/// configuration.
pub struct IngestionDriver {
    manager: Arc<ConnectionManager>,
    config: ConnectionConfig,
    schema: Arc<RowSchema>,
    csv: CsvSettings,
}

impl IngestionDriver {
    pub fn new(
        manager: Arc<ConnectionManager>,
        config: ConnectionConfig,
        schema: RowSchema,
        csv: CsvSettings,
    ) -> Self {
        Self {
            manager,
            config,
            schema: Arc::new(schema),
            csv,
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub async fn run<R: Read + Send>(
        &self,
        source_name: &str,
        reader: R,
        stop_on_first_error: bool,
    ) -> Result<IngestReport, IngestError> {
        let csv = &self.csv;
        self.execute(
            source_name,
            || CsvRecordSource::from_reader(source_name, reader, csv),
            stop_on_first_error,
        )
        .await
    }

    /// Runs an in-memory payload, as handed over by a flow framework.
    pub async fn run_content(
        &self,
        source_name: &str,
        content: &[u8],
        stop_on_first_error: bool,
    ) -> Result<IngestReport, IngestError> {
        self.run(source_name, content, stop_on_first_error).await
    }

    /// Runs a file, or standard input when `path` is `-`.
    pub async fn run_path(
        &self,
        path: &str,
        stop_on_first_error: bool,
    ) -> Result<IngestReport, IngestError> {
        if path == STDIN_PATH {
            return self.run("stdin", std::io::stdin(), stop_on_first_error).await;
        }
        let csv = &self.csv;
        self.execute(
            path,
            || CsvRecordSource::<File>::from_path(Path::new(path), csv),
            stop_on_first_error,
        )
        .await
    }

    async fn execute<R, F>(
        &self,
        source_name: &str,
        open: F,
        stop_on_first_error: bool,
    ) -> Result<IngestReport, IngestError>
    where
        R: Read + Send,
        F: FnOnce() -> Result<CsvRecordSource<R>, FileError>,
    {
        let start = Instant::now();
        let table = self.config.table().clone();
        let dry_run = self.config.dry_run();
        info!(source = source_name, table = %table, dry_run, "Starting ingestion");

        let records = open()?;
        let (sink, access, session_id) = if dry_run {
            (WriteSink::DryRun, None, None)
        } else {
            let acquired = self.manager.acquire(&self.config).await?;
            let session_id = acquired.session.id();
            info!(session_id = %session_id, access = %acquired.access, "Session acquired");
            (
                WriteSink::live(acquired.session, table.clone()),
                Some(acquired.access),
                Some(session_id),
            )
        };

        let mut writer = BatchWriter::new(sink, self.schema.clone(), self.config.batch_size());
        let policy = ErrorPolicy::from_stop_flag(stop_on_first_error);

        let summary = match writer.write(records, policy).await {
            Ok(summary) => summary,
            Err(cause) => {
                let metrics = writer.metrics();
                let processed = metrics.rows_processed;
                error!(
                    source = source_name,
                    processed,
                    failed_batches = metrics.batches_failed,
                    duration_ms = start.elapsed().as_millis(),
                    error = %cause,
                    "Ingestion stopped"
                );
                return Err(IngestError::Stopped {
                    processed,
                    metrics,
                    cause,
                });
            }
        };

        let elapsed = start.elapsed();
        let rows_per_sec = throughput(summary.metrics.rows_processed, elapsed)
            .map(|r| format!("{r:.2}"))
            .unwrap_or_else(|| "n/a".to_string());
        info!(
            source = source_name,
            rows = summary.metrics.rows_processed,
            batches = summary.metrics.batches_submitted,
            failures = summary.failures.len(),
            duration_ms = elapsed.as_millis(),
            rows_per_sec = %rows_per_sec,
            "Ingestion finished"
        );

        Ok(IngestReport::new(IngestReportParams {
            source: source_name.to_string(),
            table: table.to_string(),
            dry_run,
            access,
            session_id,
            metrics: summary.metrics,
            elapsed,
            failures: summary
                .failures
                .iter()
                .map(|f| f.to_failure_entry())
                .collect(),
        }))
    }
}

/// Outcome of one input of a multi-input run.
#[derive(Debug)]
pub struct InputRun {
    pub source: String,
    pub result: Result<IngestReport, IngestError>,
}

impl InputRun {
    /// Ran to completion without skipping any record or batch.
    pub fn succeeded(&self) -> bool {
        matches!(&self.result, Ok(report) if report.is_clean())
    }
}

/// Ingests `paths` in order with one driver per input, all sharing
/// `manager`, so every input after the first reuses the session.
///
/// Under stop-on-first-error the first input that fails ends the sequence.
/// Otherwise every input is attempted.
pub async fn run_inputs(
    manager: &Arc<ConnectionManager>,
    config: &ConnectionConfig,
    schema: &RowSchema,
    csv: &CsvSettings,
    paths: &[String],
    stop_on_first_error: bool,
) -> Vec<InputRun> {
    let mut runs = Vec::with_capacity(paths.len());
    for (i, path) in paths.iter().enumerate() {
        let driver = IngestionDriver::new(
            manager.clone(),
            config.clone(),
            schema.clone(),
            csv.clone(),
        );
        let run = InputRun {
            source: path.clone(),
            result: driver.run_path(path, stop_on_first_error).await,
        };

        let failed = !run.succeeded();
        runs.push(run);
        if failed && stop_on_first_error {
            let skipped = paths.len() - i - 1;
            if skipped > 0 {
                warn!(source = %path, skipped, "Input failed; skipping remaining inputs");
            }
            break;
        }
    }
    runs
}
