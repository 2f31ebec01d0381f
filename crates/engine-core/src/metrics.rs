use serde::Serialize;
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

#[derive(Debug, Default)]
struct InnerMetrics {
    rows_processed: AtomicU64,
    bytes_written: AtomicU64,
    batches_submitted: AtomicU64,
    batches_failed: AtomicU64,
    record_failures: AtomicU64,
}

/// Run counters shared between the writer and its in-flight submission task.
#[derive(Debug, Clone)]
pub struct Metrics {
    inner: Arc<InnerMetrics>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub rows_processed: u64,
    pub bytes_written: u64,
    pub batches_submitted: u64,
    pub batches_failed: u64,
    pub record_failures: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Metrics {
            inner: Arc::new(InnerMetrics::default()),
        }
    }

    pub fn increment_rows(&self, count: u64) {
        self.inner.rows_processed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_bytes(&self, count: u64) {
        self.inner.bytes_written.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_batches(&self, count: u64) {
        self.inner
            .batches_submitted
            .fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_failed_batches(&self, count: u64) {
        self.inner.batches_failed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_record_failures(&self, count: u64) {
        self.inner
            .record_failures
            .fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            rows_processed: self.inner.rows_processed.load(Ordering::Relaxed),
            bytes_written: self.inner.bytes_written.load(Ordering::Relaxed),
            batches_submitted: self.inner.batches_submitted.load(Ordering::Relaxed),
            batches_failed: self.inner.batches_failed.load(Ordering::Relaxed),
            record_failures: self.inner.record_failures.load(Ordering::Relaxed),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
