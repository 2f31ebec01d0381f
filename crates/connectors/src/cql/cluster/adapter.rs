use super::{params::to_cql_values, row::from_cql_value};
use crate::cql::{
    error::DbError,
    query::{QUERY_TABLE_COLUMNS_CQL, QueryGenerator},
    session::{CqlSession, SessionFactory},
};
use async_trait::async_trait;
use model::{
    core::{
        data_type::DataType,
        identifiers::SessionId,
        value::{FieldValue, Value},
    },
    execution::connection::{Consistency, ConnectionConfig, TableRef},
    records::batch::Batch,
    schema::{ColumnDef, RowSchema},
};
use scylla::{
    client::{
        execution_profile::ExecutionProfile, session::Session, session_builder::SessionBuilder,
    },
    policies::load_balancing::DefaultPolicy,
    statement::{
        Consistency as CqlConsistency,
        batch::{Batch as CqlBatch, BatchType},
        prepared::PreparedStatement,
    },
    value::Row,
};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// Session against a real Cassandra/Scylla cluster.
pub struct ScyllaSession {
    id: SessionId,
    session: RwLock<Option<Session>>,
    prepared: Mutex<HashMap<String, PreparedStatement>>,
}

impl ScyllaSession {
    pub async fn connect(config: &ConnectionConfig) -> Result<Self, DbError> {
        let policy = DefaultPolicy::builder()
            .prefer_datacenter(config.local_dc().to_string())
            .token_aware(true)
            .build();

        let profile = ExecutionProfile::builder()
            .consistency(map_consistency(config.consistency()))
            .request_timeout(Some(config.request_timeout()))
            .load_balancing_policy(policy)
            .build();

        let mut builder = SessionBuilder::new()
            .known_nodes(config.known_nodes())
            .connection_timeout(config.connection_timeout())
            .default_execution_profile_handle(profile.into_handle());

        if !config.username().is_empty() {
            builder = builder.user(config.username(), config.password());
        }

        let session = builder.build().await?;
        let id = SessionId::generate();
        info!(
            session_id = %id,
            hosts = ?config.contact_points(),
            local_dc = config.local_dc(),
            consistency = %config.consistency(),
            "Connected to CQL cluster"
        );

        Ok(ScyllaSession {
            id,
            session: RwLock::new(Some(session)),
            prepared: Mutex::new(HashMap::new()),
        })
    }

    async fn prepare(&self, session: &Session, cql: &str) -> Result<PreparedStatement, DbError> {
        let mut cache = self.prepared.lock().await;
        if let Some(stmt) = cache.get(cql) {
            return Ok(stmt.clone());
        }
        debug!(session_id = %self.id, cql, "Preparing statement");
        let stmt = session.prepare(cql).await?;
        cache.insert(cql.to_string(), stmt.clone());
        Ok(stmt)
    }
}

#[async_trait]
impl CqlSession for ScyllaSession {
    fn id(&self) -> SessionId {
        self.id
    }

    async fn write_batch(&self, table: &TableRef, batch: &Batch) -> Result<(), DbError> {
        let guard = self.session.read().await;
        let session = guard.as_ref().ok_or(DbError::Closed)?;

        let mut cql_batch = CqlBatch::new(BatchType::Unlogged);
        let mut values = Vec::with_capacity(batch.len());
        for row in &batch.rows {
            let cql = QueryGenerator::insert(table, &row.column_names());
            let stmt = self.prepare(session, &cql).await?;
            cql_batch.append_statement(stmt);
            values.push(to_cql_values(&row.values())?);
        }

        session.batch(&cql_batch, values).await?;
        debug!(session_id = %self.id, batch_id = %batch.id, rows = batch.len(), "Batch applied");
        Ok(())
    }

    async fn fetch_by_key(
        &self,
        table: &TableRef,
        columns: &[ColumnDef],
        key: &[FieldValue],
    ) -> Result<Option<Vec<Value>>, DbError> {
        let guard = self.session.read().await;
        let session = guard.as_ref().ok_or(DbError::Closed)?;

        let names = columns.iter().map(|c| c.name.clone()).collect::<Vec<_>>();
        let key_names = key.iter().map(|k| k.name.clone()).collect::<Vec<_>>();
        let cql = QueryGenerator::select_by_key(table, &names, &key_names);
        let stmt = self.prepare(session, &cql).await?;

        let key_values = key.iter().map(|k| k.value.clone()).collect::<Vec<_>>();
        let result = session
            .execute_unpaged(&stmt, to_cql_values(&key_values)?)
            .await?
            .into_rows_result()?;

        let Some(row) = result.maybe_first_row::<Row>()? else {
            return Ok(None);
        };

        if columns.is_empty() {
            return Ok(Some(Vec::new()));
        }

        let values = columns
            .iter()
            .zip(row.columns)
            .map(|(column, cell)| from_cql_value(&column.name, column.data_type, cell))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(values))
    }

    async fn table_schema(&self, table: &TableRef) -> Result<RowSchema, DbError> {
        let guard = self.session.read().await;
        let session = guard.as_ref().ok_or(DbError::Closed)?;

        let keyspace = match table.keyspace() {
            Some(keyspace) => keyspace.to_string(),
            None => current_keyspace(session)?,
        };

        let result = session
            .query_unpaged(QUERY_TABLE_COLUMNS_CQL, (keyspace.as_str(), table.name()))
            .await?
            .into_rows_result()?;

        let mut columns = Vec::new();
        let mut partition_key = Vec::new();
        let mut clustering = Vec::new();
        for row in result.rows::<(String, String, i32, String)>()? {
            let (name, kind, position, type_name) = row?;
            let data_type = DataType::from_cql_type(&type_name).map_err(|reason| {
                DbError::Schema(format!("column '{name}' of {table}: {reason}"))
            })?;
            match kind.as_str() {
                "partition_key" => partition_key.push((position, name.clone())),
                "clustering" => clustering.push((position, name.clone())),
                _ => {}
            }
            columns.push(ColumnDef::new(&name, data_type));
        }

        if columns.is_empty() {
            return Err(DbError::UnknownTable(table.to_string()));
        }

        partition_key.sort();
        clustering.sort();
        let primary_key = partition_key
            .into_iter()
            .chain(clustering)
            .map(|(_, name)| name)
            .collect::<Vec<_>>();

        RowSchema::new(table.clone(), columns, primary_key)
            .map_err(|err| DbError::Schema(err.to_string()))
    }

    async fn close(&self) {
        if self.session.write().await.take().is_some() {
            self.prepared.lock().await.clear();
            info!(session_id = %self.id, "CQL session closed");
        }
    }
}

fn current_keyspace(session: &Session) -> Result<String, DbError> {
    session
        .get_keyspace()
        .map(|ks| ks.to_string())
        .ok_or_else(|| {
            warn!("Table given without keyspace and no keyspace is in use");
            DbError::Schema("table has no keyspace and the session has none in use".to_string())
        })
}

fn map_consistency(consistency: Consistency) -> CqlConsistency {
    match consistency {
        Consistency::Any => CqlConsistency::Any,
        Consistency::One => CqlConsistency::One,
        Consistency::Two => CqlConsistency::Two,
        Consistency::Three => CqlConsistency::Three,
        Consistency::Quorum => CqlConsistency::Quorum,
        Consistency::All => CqlConsistency::All,
        Consistency::LocalQuorum => CqlConsistency::LocalQuorum,
        Consistency::EachQuorum => CqlConsistency::EachQuorum,
        Consistency::LocalOne => CqlConsistency::LocalOne,
        Consistency::Serial => CqlConsistency::Serial,
        Consistency::LocalSerial => CqlConsistency::LocalSerial,
    }
}

/// Opens [`ScyllaSession`]s.
#[derive(Debug, Clone, Default)]
pub struct ScyllaSessionFactory;

#[async_trait]
impl SessionFactory for ScyllaSessionFactory {
    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn CqlSession>, DbError> {
        let session = ScyllaSession::connect(config).await?;
        Ok(Arc::new(session))
    }
}

