use scylla::errors::{
    DeserializationError, ExecutionError, IntoRowsResultError, MaybeFirstRowError,
    NewSessionError, PrepareError, RowsError,
};
use thiserror::Error;

/// All errors coming from the CQL session layer.
#[derive(Debug, Error)]
pub enum DbError {
    /// The cluster could not be reached or refused the session.
    #[error("Session setup failed: {0}")]
    NewSession(#[from] NewSessionError),

    /// Statement preparation was rejected.
    #[error("Prepare failed: {0}")]
    Prepare(#[from] PrepareError),

    /// A request failed: timeout, unavailable replicas, rejected write, ...
    #[error("Request failed: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Unexpected response shape: {0}")]
    IntoRows(#[from] IntoRowsResultError),

    #[error("Failed to read rows: {0}")]
    Rows(#[from] RowsError),

    #[error("Failed to read first row: {0}")]
    FirstRow(#[from] MaybeFirstRowError),

    #[error("Failed to deserialize row: {0}")]
    Deserialize(#[from] DeserializationError),

    /// Connection attempt failed outside the driver (e.g. in-memory store).
    #[error("Connection failed: {0}")]
    Connect(String),

    /// Writing rows failed at the application level.
    #[error("Write error: {0}")]
    Write(String),

    /// Reading rows failed at the application level.
    #[error("Read error: {0}")]
    Read(String),

    /// A value could not be bound to or decoded from a CQL column.
    #[error("Value conversion error: {0}")]
    Conversion(String),

    #[error("Table not found: {0}")]
    UnknownTable(String),

    #[error("Invalid table schema: {0}")]
    Schema(String),

    #[error("Session is closed")]
    Closed,
}
