//! In-process CQL store.
//!
//! Keeps tables in memory with upsert-by-primary-key semantics and exposes
//! failure injection hooks so the write and validation paths can be driven
//! without a cluster.

use crate::cql::{
    error::DbError,
    session::{CqlSession, SessionFactory},
};
use async_trait::async_trait;
use model::{
    core::{
        identifiers::SessionId,
        value::{FieldValue, Value},
    },
    execution::connection::{ConnectionConfig, TableRef},
    records::batch::Batch,
    schema::{ColumnDef, RowSchema, column::normalize_col_name},
};
use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};
use tracing::debug;

type StoredRow = HashMap<String, Value>;

struct MemoryTable {
    schema: RowSchema,
    rows: BTreeMap<Vec<String>, StoredRow>,
}

#[derive(Default)]
struct Inner {
    tables: Mutex<HashMap<String, MemoryTable>>,
    batch_sizes: Mutex<Vec<usize>>,
    write_delay: Mutex<Option<Duration>>,
    connects: AtomicUsize,
    closes: AtomicUsize,
    unreachable: AtomicBool,
    fail_writes: AtomicUsize,
    fail_reads: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// Shared handle to the in-memory cluster. Clones see the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn table_key(table: &TableRef) -> String {
    table.to_string().to_lowercase()
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_table(&self, schema: RowSchema) {
        let key = table_key(schema.table());
        lock(&self.inner.tables).insert(
            key,
            MemoryTable {
                schema,
                rows: BTreeMap::new(),
            },
        );
    }

    /// Removes the row stored under `key` (values in primary key order).
    pub fn delete_row(&self, table: &TableRef, key: &[Value]) -> bool {
        let key = key.iter().map(Value::to_string).collect::<Vec<_>>();
        lock(&self.inner.tables)
            .get_mut(&table_key(table))
            .is_some_and(|t| t.rows.remove(&key).is_some())
    }

    /// Overwrites one cell of an existing row.
    pub fn update_cell(&self, table: &TableRef, key: &[Value], column: &str, value: Value) -> bool {
        let key = key.iter().map(Value::to_string).collect::<Vec<_>>();
        let mut tables = lock(&self.inner.tables);
        let Some(row) = tables
            .get_mut(&table_key(table))
            .and_then(|t| t.rows.get_mut(&key))
        else {
            return false;
        };
        row.insert(normalize_col_name(column), value);
        true
    }

    pub fn row_count(&self, table: &TableRef) -> usize {
        lock(&self.inner.tables)
            .get(&table_key(table))
            .map_or(0, |t| t.rows.len())
    }

    pub fn get_row(&self, table: &TableRef, key: &[Value]) -> Option<HashMap<String, Value>> {
        let key = key.iter().map(Value::to_string).collect::<Vec<_>>();
        lock(&self.inner.tables)
            .get(&table_key(table))
            .and_then(|t| t.rows.get(&key).cloned())
    }

    /// Sizes of every batch the store has applied, in submission order.
    pub fn submitted_batch_sizes(&self) -> Vec<usize> {
        lock(&self.inner.batch_sizes).clone()
    }

    pub fn connect_count(&self) -> usize {
        self.inner.connects.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.inner.closes.load(Ordering::SeqCst)
    }

    /// Highest number of batch writes observed running at the same time.
    pub fn max_concurrent_writes(&self) -> usize {
        self.inner.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.inner.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// The next `count` batch writes fail without touching the data.
    pub fn fail_next_writes(&self, count: usize) {
        self.inner.fail_writes.store(count, Ordering::SeqCst);
    }

    /// The next `count` point reads fail.
    pub fn fail_next_reads(&self, count: usize) {
        self.inner.fail_reads.store(count, Ordering::SeqCst);
    }

    pub fn set_write_delay(&self, delay: Option<Duration>) {
        *lock(&self.inner.write_delay) = delay;
    }

    fn take_failure(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn apply(&self, table: &TableRef, batch: &Batch) -> Result<(), DbError> {
        let mut tables = lock(&self.inner.tables);
        let target = tables
            .get_mut(&table_key(table))
            .ok_or_else(|| DbError::UnknownTable(table.to_string()))?;

        // Validate every row before applying any so a rejected batch leaves no trace.
        let mut staged = Vec::with_capacity(batch.len());
        for row in &batch.rows {
            let mut key = Vec::with_capacity(target.schema.primary_key().len());
            for key_col in target.schema.primary_key() {
                match row.get(key_col).map(|fv| &fv.value) {
                    Some(value) if !value.is_null() => key.push(value.to_string()),
                    _ => {
                        return Err(DbError::Write(format!(
                            "line {}: missing value for primary key column '{key_col}'",
                            row.line
                        )));
                    }
                }
            }
            for fv in &row.field_values {
                if target.schema.column(&fv.name).is_none() {
                    return Err(DbError::Write(format!(
                        "line {}: unknown column '{}' in {table}",
                        row.line, fv.name
                    )));
                }
            }
            staged.push((key, &row.field_values));
        }

        for (key, field_values) in staged {
            let stored = target.rows.entry(key).or_default();
            for fv in field_values {
                let name = normalize_col_name(&fv.name);
                if fv.value.is_null() {
                    stored.remove(&name);
                } else {
                    stored.insert(name, fv.value.clone());
                }
            }
        }

        lock(&self.inner.batch_sizes).push(batch.len());
        Ok(())
    }

    fn lookup(
        &self,
        table: &TableRef,
        columns: &[ColumnDef],
        key: &[FieldValue],
    ) -> Result<Option<Vec<Value>>, DbError> {
        let tables = lock(&self.inner.tables);
        let target = tables
            .get(&table_key(table))
            .ok_or_else(|| DbError::UnknownTable(table.to_string()))?;

        // Rows are stored under the table's primary-key order, whatever order
        // the caller's key columns come in.
        let primary_key = target.schema.primary_key();
        if key.len() != primary_key.len() {
            return Err(DbError::Read(format!(
                "key must restrict exactly the primary key ({}) of {table}",
                primary_key.join(", ")
            )));
        }
        let mut ordered = Vec::with_capacity(primary_key.len());
        for key_col in primary_key {
            let value = key
                .iter()
                .find(|fv| fv.name.eq_ignore_ascii_case(key_col))
                .ok_or_else(|| {
                    DbError::Read(format!("missing primary key column '{key_col}' for {table}"))
                })?;
            ordered.push(value.value.to_string());
        }

        Ok(target.rows.get(&ordered).map(|row| {
            columns
                .iter()
                .map(|c| {
                    row.get(&normalize_col_name(&c.name))
                        .cloned()
                        .unwrap_or(Value::Null)
                })
                .collect()
        }))
    }
}

#[async_trait]
impl SessionFactory for MemoryStore {
    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn CqlSession>, DbError> {
        if self.inner.unreachable.load(Ordering::SeqCst) {
            return Err(DbError::Connect(format!(
                "no host reachable among {}",
                config.contact_points().join(", ")
            )));
        }
        self.inner.connects.fetch_add(1, Ordering::SeqCst);
        let session = MemorySession {
            id: SessionId::generate(),
            store: self.clone(),
            closed: AtomicBool::new(false),
        };
        debug!(session_id = %session.id, "Opened in-memory session");
        Ok(Arc::new(session))
    }
}

/// Session handed out by [`MemoryStore`].
pub struct MemorySession {
    id: SessionId,
    store: MemoryStore,
    closed: AtomicBool,
}

impl MemorySession {
    fn ensure_open(&self) -> Result<(), DbError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(DbError::Closed);
        }
        Ok(())
    }
}

struct InFlight<'a>(&'a Inner);

impl<'a> InFlight<'a> {
    fn enter(inner: &'a Inner) -> Self {
        let now = inner.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        inner.max_in_flight.fetch_max(now, Ordering::SeqCst);
        InFlight(inner)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl CqlSession for MemorySession {
    fn id(&self) -> SessionId {
        self.id
    }

    async fn write_batch(&self, table: &TableRef, batch: &Batch) -> Result<(), DbError> {
        self.ensure_open()?;
        let _in_flight = InFlight::enter(&self.store.inner);

        let delay = *lock(&self.store.inner.write_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if MemoryStore::take_failure(&self.store.inner.fail_writes) {
            return Err(DbError::Write(format!(
                "injected write failure for batch {}",
                batch.id
            )));
        }
        self.store.apply(table, batch)
    }

    async fn fetch_by_key(
        &self,
        table: &TableRef,
        columns: &[ColumnDef],
        key: &[FieldValue],
    ) -> Result<Option<Vec<Value>>, DbError> {
        self.ensure_open()?;
        if MemoryStore::take_failure(&self.store.inner.fail_reads) {
            return Err(DbError::Read("injected read failure".to_string()));
        }
        self.store.lookup(table, columns, key)
    }

    async fn table_schema(&self, table: &TableRef) -> Result<RowSchema, DbError> {
        self.ensure_open()?;
        lock(&self.store.inner.tables)
            .get(&table_key(table))
            .map(|t| t.schema.clone())
            .ok_or_else(|| DbError::UnknownTable(table.to_string()))
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.store.inner.closes.fetch_add(1, Ordering::SeqCst);
            debug!(session_id = %self.id, "Closed in-memory session");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::{core::data_type::DataType, records::row::RowData};

    fn schema() -> RowSchema {
        RowSchema::new(
            TableRef::new(Some("ks"), "t"),
            vec![
                ColumnDef::new("id", DataType::Int),
                ColumnDef::new("name", DataType::Text),
            ],
            vec!["id".to_string()],
        )
        .unwrap()
    }

    fn row(line: u64, id: i32, name: Value) -> RowData {
        RowData::new(
            line,
            vec![
                FieldValue {
                    name: "id".into(),
                    value: Value::Int(id),
                    data_type: DataType::Int,
                },
                FieldValue {
                    name: "name".into(),
                    value: name,
                    data_type: DataType::Text,
                },
            ],
        )
    }

    fn config() -> ConnectionConfig {
        ConnectionConfig::builder(TableRef::new(Some("ks"), "t"))
            .contact_points(["127.0.0.1"])
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn upserts_by_primary_key() {
        let store = MemoryStore::new();
        store.create_table(schema());
        let session = store.connect(&config()).await.unwrap();
        let table = TableRef::new(Some("ks"), "t");

        let first = Batch::seal(0, vec![row(2, 1, Value::Text("a".into()))]).unwrap();
        let second = Batch::seal(1, vec![row(3, 1, Value::Text("b".into()))]).unwrap();
        session.write_batch(&table, &first).await.unwrap();
        session.write_batch(&table, &second).await.unwrap();

        assert_eq!(store.row_count(&table), 1);
        let stored = session
            .fetch_by_key(
                &table,
                &[ColumnDef::new("name", DataType::Text)],
                &[FieldValue {
                    name: "id".into(),
                    value: Value::Int(1),
                    data_type: DataType::Int,
                }],
            )
            .await
            .unwrap();
        assert_eq!(stored, Some(vec![Value::Text("b".into())]));
        assert_eq!(store.submitted_batch_sizes(), vec![1, 1]);
    }

    #[tokio::test]
    async fn injected_write_failure_leaves_table_untouched() {
        let store = MemoryStore::new();
        store.create_table(schema());
        store.fail_next_writes(1);
        let session = store.connect(&config()).await.unwrap();
        let table = TableRef::new(Some("ks"), "t");
        let batch = Batch::seal(0, vec![row(2, 1, Value::Null)]).unwrap();

        assert!(session.write_batch(&table, &batch).await.is_err());
        assert_eq!(store.row_count(&table), 0);
        assert!(session.write_batch(&table, &batch).await.is_ok());
        assert_eq!(store.row_count(&table), 1);
    }

    #[tokio::test]
    async fn closed_session_rejects_requests() {
        let store = MemoryStore::new();
        store.create_table(schema());
        let session = store.connect(&config()).await.unwrap();
        session.close().await;
        session.close().await;

        let err = session
            .table_schema(&TableRef::new(Some("ks"), "t"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Closed));
        assert_eq!(store.close_count(), 1);
    }

    #[tokio::test]
    async fn unreachable_store_refuses_connections() {
        let store = MemoryStore::new();
        store.set_unreachable(true);
        assert!(store.connect(&config()).await.is_err());
        assert_eq!(store.connect_count(), 0);
    }

    #[tokio::test]
    async fn composite_key_lookup_ignores_key_column_order() {
        let table = TableRef::new(Some("ks"), "events");
        let store = MemoryStore::new();
        store.create_table(
            RowSchema::new(
                table.clone(),
                vec![
                    ColumnDef::new("a", DataType::Int),
                    ColumnDef::new("b", DataType::Text),
                    ColumnDef::new("v", DataType::Text),
                ],
                vec!["a".to_string(), "b".to_string()],
            )
            .unwrap(),
        );
        let session = store.connect(&config()).await.unwrap();
        let field = |name: &str, value: Value, data_type: DataType| FieldValue {
            name: name.into(),
            value,
            data_type,
        };
        let stored = RowData::new(
            2,
            vec![
                field("a", Value::Int(1), DataType::Int),
                field("b", Value::Text("x".into()), DataType::Text),
                field("v", Value::Text("payload".into()), DataType::Text),
            ],
        );
        session
            .write_batch(&table, &Batch::seal(0, vec![stored]).unwrap())
            .await
            .unwrap();

        let reversed = [
            field("b", Value::Text("x".into()), DataType::Text),
            field("a", Value::Int(1), DataType::Int),
        ];
        let found = session
            .fetch_by_key(&table, &[ColumnDef::new("v", DataType::Text)], &reversed)
            .await
            .unwrap();
        assert_eq!(found, Some(vec![Value::Text("payload".into())]));

        let partial = [field("a", Value::Int(1), DataType::Int)];
        assert!(
            session
                .fetch_by_key(&table, &[], &partial)
                .await
                .is_err()
        );
    }
}
