use crate::{
    encoder::encode,
    error::{RecordFailure, WriteError},
};
use connectors::file::csv::error::FileError;
use engine_core::metrics::{Metrics, MetricsSnapshot};
use model::{
    records::{batch::Batch, record::SourceRecord},
    schema::RowSchema,
};
use sink::WriteSink;
use state::BatchBuffer;
use std::{
    sync::{Arc, Mutex},
    time::Instant,
};
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error, info, info_span, warn};

pub mod sink;
pub mod state;

/// What to do when a record or batch fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// End the run on the first failure.
    Stop,
    /// Log, count and skip the failure.
    #[default]
    Continue,
}

impl ErrorPolicy {
    pub fn from_stop_flag(stop_on_first_error: bool) -> Self {
        if stop_on_first_error {
            ErrorPolicy::Stop
        } else {
            ErrorPolicy::Continue
        }
    }
}

/// Totals of a completed `write` call, plus every failure that was skipped.
#[derive(Debug)]
pub struct WriteSummary {
    pub metrics: MetricsSnapshot,
    pub failures: Vec<WriteError>,
}

/// Resolves to the number of rows written.
type Submission = JoinHandle<Result<usize, WriteError>>;

/// Encodes records and writes them in fixed-size batches.
///
/// At most one batch is in flight: the next submission is spawned only after
/// the previous one has been awaited, while encoding of the following rows
/// overlaps with it.
pub struct BatchWriter {
    sink: WriteSink,
    schema: Arc<RowSchema>,
    batch_size: usize,
    metrics: Metrics,
    submitted: Arc<Mutex<Vec<usize>>>,
}

impl BatchWriter {
    pub fn new(sink: WriteSink, schema: Arc<RowSchema>, batch_size: usize) -> Self {
        Self {
            sink,
            schema,
            batch_size: batch_size.max(1),
            metrics: Metrics::new(),
            submitted: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Sizes of the batches submitted successfully, in order.
    pub fn submitted_batch_sizes(&self) -> Vec<usize> {
        self.submitted
            .lock()
            .map(|sizes| sizes.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    /// Drives `records` through encoding and batching until the input is
    /// exhausted.
    ///
    /// Under [`ErrorPolicy::Stop`] the first failure is returned as the error.
    /// If it was a rejected record, the rows encoded before it are still
    /// written first. A failed batch stops the run without flushing anything
    /// further. Unreadable input always ends the run.
    pub async fn write<I>(&mut self, records: I, policy: ErrorPolicy) -> Result<WriteSummary, WriteError>
    where
        I: IntoIterator<Item = Result<SourceRecord, FileError>>,
    {
        let start = Instant::now();
        let mut buffer = BatchBuffer::new(self.batch_size);
        let mut in_flight: Option<Submission> = None;
        let mut failures = Vec::new();

        for next in records {
            let failure = match next {
                Ok(record) => match encode(&record, &self.schema) {
                    Ok(row) => {
                        if self.sink.is_dry_run() {
                            self.metrics.increment_rows(1);
                        }
                        if let Some(batch) = buffer.push(row) {
                            self.settle(&mut in_flight, policy, &mut failures).await?;
                            in_flight = Some(self.spawn_submit(batch));
                            buffer.submitted();
                        }
                        continue;
                    }
                    Err(source) => RecordFailure::Encoding {
                        line: record.line,
                        source,
                    },
                },
                Err(source) if source.is_recoverable() => RecordFailure::Input { source },
                Err(source) => {
                    error!(error = %source, "Input became unreadable; ending run");
                    self.flush_before_stop(&mut in_flight, &mut buffer, &mut failures)
                        .await?;
                    return Err(WriteError::Input(source));
                }
            };

            self.metrics.increment_record_failures(1);
            warn!(
                line = ?failure.line(),
                column = ?failure.column(),
                error = %failure,
                "Record rejected"
            );

            if policy == ErrorPolicy::Stop {
                self.flush_before_stop(&mut in_flight, &mut buffer, &mut failures)
                    .await?;
                return Err(WriteError::Record(failure));
            }
            failures.push(WriteError::Record(failure));
        }

        self.settle(&mut in_flight, policy, &mut failures).await?;
        if let Some(batch) = buffer.seal() {
            debug!(rows = batch.len(), "Submitting final partial batch");
            in_flight = Some(self.spawn_submit(batch));
            buffer.submitted();
            self.settle(&mut in_flight, policy, &mut failures).await?;
        }

        let metrics = self.metrics.snapshot();
        let elapsed = start.elapsed();
        info!(
            rows = metrics.rows_processed,
            batches = metrics.batches_submitted,
            failed_batches = metrics.batches_failed,
            rejected_records = metrics.record_failures,
            duration_ms = elapsed.as_millis(),
            "Write finished"
        );

        Ok(WriteSummary { metrics, failures })
    }

    /// Writes everything encoded before the failure that ends the run. A
    /// failed batch here is returned in place of that failure, which has
    /// already been logged.
    async fn flush_before_stop(
        &self,
        in_flight: &mut Option<Submission>,
        buffer: &mut BatchBuffer,
        failures: &mut Vec<WriteError>,
    ) -> Result<(), WriteError> {
        self.settle(in_flight, ErrorPolicy::Stop, failures).await?;
        if let Some(batch) = buffer.seal() {
            *in_flight = Some(self.spawn_submit(batch));
            buffer.submitted();
            self.settle(in_flight, ErrorPolicy::Stop, failures).await?;
        }
        Ok(())
    }

    /// Awaits the in-flight submission, if any. Its failure is returned under
    /// `Stop` and collected under `Continue`.
    async fn settle(
        &self,
        in_flight: &mut Option<Submission>,
        policy: ErrorPolicy,
        failures: &mut Vec<WriteError>,
    ) -> Result<(), WriteError> {
        let Some(handle) = in_flight.take() else {
            return Ok(());
        };

        let outcome = handle
            .await
            .map_err(|e| WriteError::Task(e.to_string()))
            .and_then(|result| result);

        match outcome {
            Ok(rows) => {
                debug!(rows, "Batch settled");
                Ok(())
            }
            Err(err @ WriteError::Task(_)) => Err(err),
            Err(err) if policy == ErrorPolicy::Stop => Err(err),
            Err(err) => {
                failures.push(err);
                Ok(())
            }
        }
    }

    fn spawn_submit(&self, batch: Batch) -> Submission {
        let sink = self.sink.clone();
        let metrics = self.metrics.clone();
        let submitted = self.submitted.clone();
        let span = info_span!("submit_batch", seq = batch.seq);

        let task = async move {
            let start = Instant::now();
            let rows = batch.len();
            debug!(batch_id = %batch.id, seq = batch.seq, rows, "Submitting batch");

            if let Err(source) = sink.submit(&batch).await {
                metrics.increment_failed_batches(1);
                error!(
                    batch_id = %batch.id,
                    rows,
                    first_line = batch.first_line(),
                    error = %source,
                    "Batch write failed"
                );
                return Err(WriteError::Submit {
                    batch_id: batch.id.clone(),
                    batch_size: rows,
                    first_line: batch.first_line(),
                    source,
                });
            }

            if !sink.is_dry_run() {
                metrics.increment_rows(rows as u64);
            }
            metrics.increment_batches(1);
            metrics.increment_bytes(batch.size_bytes() as u64);
            if let Ok(mut sizes) = submitted.lock() {
                sizes.push(rows);
            }

            let duration = start.elapsed();
            let rows_per_sec = rows as f64 / duration.as_secs_f64().max(f64::EPSILON);
            info!(
                batch_id = %batch.id,
                rows,
                duration_ms = duration.as_millis(),
                rows_per_sec = %format!("{:.2}", rows_per_sec),
                "Batch written"
            );

            Ok(rows)
        };
        tokio::spawn(task.instrument(span))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EncodingError;
    use connectors::cql::{memory::MemoryStore, session::SessionFactory};
    use model::{
        core::data_type::DataType,
        execution::connection::{ConnectionConfig, TableRef},
        schema::ColumnDef,
    };
    use std::time::Duration;
    use tracing_test::traced_test;

    fn table() -> TableRef {
        TableRef::new(Some("ks"), "t")
    }

    fn schema() -> Arc<RowSchema> {
        Arc::new(
            RowSchema::new(
                table(),
                vec![
                    ColumnDef::new("colid", DataType::Int),
                    ColumnDef::new("cola", DataType::Text),
                ],
                vec!["colid".to_string()],
            )
            .unwrap(),
        )
    }

    fn records(ids: &[&str]) -> Vec<Result<SourceRecord, FileError>> {
        ids.iter()
            .enumerate()
            .map(|(i, id)| {
                Ok(SourceRecord::new(
                    i as u64 + 2,
                    vec![
                        ("colid".to_string(), id.to_string()),
                        ("cola".to_string(), format!("v{i}")),
                    ],
                ))
            })
            .collect()
    }

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| i.to_string()).collect()
    }

    async fn live_sink(store: &MemoryStore) -> WriteSink {
        store.create_table((*schema()).clone());
        let config = ConnectionConfig::builder(table()).build().unwrap();
        let session = store.connect(&config).await.unwrap();
        WriteSink::live(session, table())
    }

    #[traced_test]
    #[tokio::test]
    async fn splits_input_into_full_batches_and_a_remainder() {
        let store = MemoryStore::new();
        let mut writer = BatchWriter::new(live_sink(&store).await, schema(), 4);
        let ids = ids(10);
        let input = records(&ids.iter().map(String::as_str).collect::<Vec<_>>());

        let summary = writer.write(input, ErrorPolicy::Continue).await.unwrap();

        assert_eq!(summary.metrics.rows_processed, 10);
        assert_eq!(summary.metrics.batches_submitted, 3);
        assert_eq!(writer.submitted_batch_sizes(), vec![4, 4, 2]);
        assert_eq!(store.submitted_batch_sizes(), vec![4, 4, 2]);
        assert_eq!(store.row_count(&table()), 10);
    }

    #[traced_test]
    #[tokio::test]
    async fn exact_multiple_has_no_trailing_batch() {
        let store = MemoryStore::new();
        let mut writer = BatchWriter::new(live_sink(&store).await, schema(), 5);
        let ids = ids(10);
        let input = records(&ids.iter().map(String::as_str).collect::<Vec<_>>());

        writer.write(input, ErrorPolicy::Continue).await.unwrap();
        assert_eq!(writer.submitted_batch_sizes(), vec![5, 5]);
    }

    #[traced_test]
    #[tokio::test]
    async fn empty_input_submits_nothing() {
        let store = MemoryStore::new();
        let mut writer = BatchWriter::new(live_sink(&store).await, schema(), 5);

        let summary = writer.write(Vec::new(), ErrorPolicy::Stop).await.unwrap();
        assert_eq!(summary.metrics.batches_submitted, 0);
        assert!(store.submitted_batch_sizes().is_empty());
    }

    #[traced_test]
    #[tokio::test]
    async fn keeps_at_most_one_batch_in_flight() {
        let store = MemoryStore::new();
        store.set_write_delay(Some(Duration::from_millis(5)));
        let mut writer = BatchWriter::new(live_sink(&store).await, schema(), 2);
        let ids = ids(12);
        let input = records(&ids.iter().map(String::as_str).collect::<Vec<_>>());

        writer.write(input, ErrorPolicy::Continue).await.unwrap();
        assert_eq!(store.max_concurrent_writes(), 1);
        assert_eq!(store.row_count(&table()), 12);
    }

    #[traced_test]
    #[tokio::test]
    async fn continue_policy_skips_bad_records() {
        let store = MemoryStore::new();
        let mut writer = BatchWriter::new(live_sink(&store).await, schema(), 2);
        let input = records(&["1", "x", "3"]);

        let summary = writer.write(input, ErrorPolicy::Continue).await.unwrap();

        assert_eq!(summary.metrics.rows_processed, 2);
        assert_eq!(summary.metrics.record_failures, 1);
        assert_eq!(summary.failures.len(), 1);
        let WriteError::Record(RecordFailure::Encoding { line, source }) = &summary.failures[0]
        else {
            panic!("expected encoding failure");
        };
        assert_eq!(*line, 3);
        assert!(matches!(source, EncodingError::Parse { column, .. } if column == "colid"));
        assert!(logs_contain("Record rejected"));
    }

    #[traced_test]
    #[tokio::test]
    async fn stop_policy_flushes_rows_before_the_bad_record() {
        let store = MemoryStore::new();
        let mut writer = BatchWriter::new(live_sink(&store).await, schema(), 10);
        let input = records(&["1", "2", "bad", "4"]);

        let err = writer.write(input, ErrorPolicy::Stop).await.unwrap_err();

        assert!(matches!(err, WriteError::Record(RecordFailure::Encoding { line: 4, .. })));
        assert_eq!(writer.metrics().rows_processed, 2);
        assert_eq!(store.row_count(&table()), 2);
    }

    #[traced_test]
    #[tokio::test]
    async fn stop_policy_reports_failed_flush_before_bad_record() {
        let store = MemoryStore::new();
        let mut writer = BatchWriter::new(live_sink(&store).await, schema(), 10);
        store.fail_next_writes(1);
        let input = records(&["1", "2", "bad", "4"]);

        let err = writer.write(input, ErrorPolicy::Stop).await.unwrap_err();

        assert!(matches!(
            err,
            WriteError::Submit {
                batch_size: 2,
                first_line: 2,
                ..
            }
        ));
        let metrics = writer.metrics();
        assert_eq!(metrics.batches_failed, 1);
        assert_eq!(metrics.record_failures, 1);
        assert_eq!(metrics.rows_processed, 0);
        assert_eq!(store.row_count(&table()), 0);
    }

    #[traced_test]
    #[tokio::test]
    async fn unreadable_input_flushes_encoded_rows() {
        let store = MemoryStore::new();
        let mut writer = BatchWriter::new(live_sink(&store).await, schema(), 10);
        let mut input = records(&["1", "2"]);
        input.push(Err(FileError::IoError(std::io::Error::other("disk gone"))));

        let err = writer.write(input, ErrorPolicy::Continue).await.unwrap_err();

        assert!(matches!(err, WriteError::Input(FileError::IoError(_))));
        assert_eq!(writer.metrics().rows_processed, 2);
        assert_eq!(store.row_count(&table()), 2);
    }

    #[traced_test]
    #[tokio::test]
    async fn unreadable_input_after_failed_flush_reports_the_write() {
        let store = MemoryStore::new();
        let mut writer = BatchWriter::new(live_sink(&store).await, schema(), 10);
        store.fail_next_writes(1);
        let mut input = records(&["1", "2"]);
        input.push(Err(FileError::IoError(std::io::Error::other("disk gone"))));

        let err = writer.write(input, ErrorPolicy::Continue).await.unwrap_err();

        assert!(matches!(err, WriteError::Submit { batch_size: 2, .. }));
        assert_eq!(writer.metrics().batches_failed, 1);
    }

    #[traced_test]
    #[tokio::test]
    async fn failed_batch_is_not_counted_and_earlier_batches_stay() {
        let store = MemoryStore::new();
        let sink = live_sink(&store).await;
        let mut writer = BatchWriter::new(sink, schema(), 2);
        let ids = ids(6);
        let input = records(&ids.iter().map(String::as_str).collect::<Vec<_>>());

        let first = records(&["100", "101"]);
        writer.write(first, ErrorPolicy::Continue).await.unwrap();
        store.fail_next_writes(1);
        let summary = writer.write(input, ErrorPolicy::Continue).await.unwrap();

        assert_eq!(summary.metrics.batches_failed, 1);
        assert_eq!(summary.metrics.rows_processed, 2 + 4);
        assert!(matches!(summary.failures[0], WriteError::Submit { batch_size: 2, .. }));
        assert_eq!(store.row_count(&table()), 6);
    }

    #[traced_test]
    #[tokio::test]
    async fn stop_policy_ends_on_failed_batch() {
        let store = MemoryStore::new();
        let sink = live_sink(&store).await;
        store.fail_next_writes(1);
        let mut writer = BatchWriter::new(sink, schema(), 2);
        let ids = ids(6);
        let input = records(&ids.iter().map(String::as_str).collect::<Vec<_>>());

        let err = writer.write(input, ErrorPolicy::Stop).await.unwrap_err();

        assert!(matches!(err, WriteError::Submit { first_line: 2, .. }));
        assert_eq!(writer.metrics().rows_processed, 0);
        assert_eq!(store.row_count(&table()), 0);
        assert!(logs_contain("Batch write failed"));
    }

    #[traced_test]
    #[tokio::test]
    async fn dry_run_counts_encoded_rows_without_writing() {
        let store = MemoryStore::new();
        store.create_table((*schema()).clone());
        let mut writer = BatchWriter::new(WriteSink::DryRun, schema(), 3);
        let input = records(&["1", "2", "oops", "4"]);

        let summary = writer.write(input, ErrorPolicy::Continue).await.unwrap();

        assert_eq!(summary.metrics.rows_processed, 3);
        assert_eq!(summary.metrics.record_failures, 1);
        assert_eq!(writer.submitted_batch_sizes(), vec![3]);
        assert_eq!(store.row_count(&table()), 0);
    }

    #[traced_test]
    #[tokio::test]
    async fn malformed_input_lines_are_record_failures() {
        let mut writer = BatchWriter::new(WriteSink::DryRun, schema(), 3);
        let mut input = records(&["1"]);
        input.push(Err(FileError::MalformedRecord {
            line: 3,
            reason: "found record with 1 fields".into(),
        }));

        let summary = writer.write(input, ErrorPolicy::Continue).await.unwrap();
        assert_eq!(summary.metrics.record_failures, 1);
        assert!(matches!(
            summary.failures[0],
            WriteError::Record(RecordFailure::Input { .. })
        ));
    }
}
