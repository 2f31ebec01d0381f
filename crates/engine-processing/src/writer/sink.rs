use connectors::cql::{error::DbError, session::CqlSession};
use model::{execution::connection::TableRef, records::batch::Batch};
use std::sync::Arc;
use tracing::debug;

/// Where sealed batches go.
#[derive(Clone)]
pub enum WriteSink {
    /// One unlogged batch request per sealed batch.
    Live {
        session: Arc<dyn CqlSession>,
        table: TableRef,
    },
    /// Batches are formed and counted but never sent.
    DryRun,
}

impl WriteSink {
    pub fn live(session: Arc<dyn CqlSession>, table: TableRef) -> Self {
        WriteSink::Live { session, table }
    }

    pub fn is_dry_run(&self) -> bool {
        matches!(self, WriteSink::DryRun)
    }

    pub async fn submit(&self, batch: &Batch) -> Result<(), DbError> {
        match self {
            WriteSink::Live { session, table } => session.write_batch(table, batch).await,
            WriteSink::DryRun => {
                debug!(batch_id = %batch.id, rows = batch.len(), "Dry run: batch not sent");
                Ok(())
            }
        }
    }
}
