use thiserror::Error;

/// Raised while building model values that carry invariants.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("invalid table identifier '{0}': expected 'keyspace.table' or 'table'")]
    InvalidTable(String),

    #[error("unknown consistency level: {0}")]
    UnknownConsistency(String),

    #[error("duplicate column '{0}' in schema")]
    DuplicateColumn(String),

    #[error("primary key column '{0}' is not part of the schema")]
    UnknownKeyColumn(String),

    #[error("schema for '{0}' declares no primary key")]
    MissingPrimaryKey(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
