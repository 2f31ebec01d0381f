use crate::cql::error::DbError;
use async_trait::async_trait;
use model::{
    core::{identifiers::SessionId, value::{FieldValue, Value}},
    execution::connection::{ConnectionConfig, TableRef},
    records::batch::Batch,
    schema::{ColumnDef, RowSchema},
};
use std::sync::Arc;

/// A live, exclusively owned connection to a CQL cluster.
///
/// Consistency level and request timeout are fixed when the session is
/// opened and apply to every request issued through it.
#[async_trait]
pub trait CqlSession: Send + Sync {
    fn id(&self) -> SessionId;

    /// Issues every row of `batch` as one unlogged batch request.
    async fn write_batch(&self, table: &TableRef, batch: &Batch) -> Result<(), DbError>;

    /// Point read by primary key. Returns the stored values of `columns` in
    /// the requested order, or `None` when no row exists for the key.
    async fn fetch_by_key(
        &self,
        table: &TableRef,
        columns: &[ColumnDef],
        key: &[FieldValue],
    ) -> Result<Option<Vec<Value>>, DbError>;

    /// Reads the column layout and primary key of `table` from the cluster.
    async fn table_schema(&self, table: &TableRef) -> Result<RowSchema, DbError>;

    /// Releases the underlying connections. Later calls fail with
    /// [`DbError::Closed`].
    async fn close(&self);
}

/// Opens sessions for a configuration.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn CqlSession>, DbError>;
}
