use chrono::{DateTime, Utc};
use engine_core::{connection::SessionAccess, metrics::MetricsSnapshot};
use model::core::identifiers::SessionId;
use serde::{Serialize, Serializer};
use std::time::Duration;

/// Outcome of one ingestion run.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub source: String,
    pub table: String,
    pub dry_run: bool,
    /// `None` in dry run, where no session is acquired.
    pub access: Option<SessionAccess>,
    pub session_id: Option<SessionId>,
    pub processed: u64,
    pub batches_submitted: u64,
    pub batches_failed: u64,
    pub record_failures: u64,
    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    pub elapsed: Duration,
    #[serde(serialize_with = "rate")]
    pub rows_per_sec: Option<f64>,
    pub finished_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<FailureEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Encoding,
    Input,
    Write,
}

/// A record or batch that was skipped during the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureEntry {
    pub kind: FailureKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<String>,
    pub message: String,
}

pub struct IngestReportParams {
    pub source: String,
    pub table: String,
    pub dry_run: bool,
    pub access: Option<SessionAccess>,
    pub session_id: Option<SessionId>,
    pub metrics: MetricsSnapshot,
    pub elapsed: Duration,
    pub failures: Vec<FailureEntry>,
}

impl IngestReport {
    pub fn new(params: IngestReportParams) -> Self {
        IngestReport {
            source: params.source,
            table: params.table,
            dry_run: params.dry_run,
            access: params.access,
            session_id: params.session_id,
            processed: params.metrics.rows_processed,
            batches_submitted: params.metrics.batches_submitted,
            batches_failed: params.metrics.batches_failed,
            record_failures: params.metrics.record_failures,
            elapsed: params.elapsed,
            rows_per_sec: throughput(params.metrics.rows_processed, params.elapsed),
            finished_at: Utc::now(),
            failures: params.failures,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.batches_failed == 0 && self.record_failures == 0
    }
}

/// Rows per second, or `None` when either the row count or the elapsed
/// time is zero.
pub fn throughput(rows: u64, elapsed: Duration) -> Option<f64> {
    let secs = elapsed.as_secs_f64();
    if rows == 0 || secs <= 0.0 {
        return None;
    }
    Some(rows as f64 / secs)
}

fn as_millis<S: Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
}

fn rate<S: Serializer>(rate: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
    match rate {
        Some(r) => serializer.serialize_f64((r * 100.0).round() / 100.0),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn throughput_guards_zero_inputs() {
        assert_eq!(throughput(0, Duration::from_secs(1)), None);
        assert_eq!(throughput(10, Duration::ZERO), None);
        assert_eq!(throughput(10, Duration::from_secs(2)), Some(5.0));
    }

    #[test]
    fn serializes_access_tag_and_millis() {
        let report = IngestReport::new(IngestReportParams {
            source: "input.csv".into(),
            table: "ks.t".into(),
            dry_run: false,
            access: Some(SessionAccess::Reuse),
            session_id: None,
            metrics: MetricsSnapshot {
                rows_processed: 3,
                batches_submitted: 1,
                ..Default::default()
            },
            elapsed: Duration::from_millis(1500),
            failures: Vec::new(),
        });

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["access"], "REUSE");
        assert_eq!(json["elapsed_ms"], 1500);
        assert_eq!(json["rows_per_sec"], 2.0);
        assert!(report.is_clean());
        assert!(json.get("failures").is_none());
    }
}
