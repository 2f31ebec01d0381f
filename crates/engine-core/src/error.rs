use connectors::cql::error::DbError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConnectionError {
    /// Opening a session failed. Never retried by the manager.
    #[error("Failed to connect to [{hosts}]: {source}")]
    Connect {
        hosts: String,
        #[source]
        source: DbError,
    },
}
