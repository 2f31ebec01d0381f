use model::execution::errors::ModelError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while locating, reading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No configuration file found (looked for: {candidates})")]
    NotFound { candidates: String },

    #[error("Failed to read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid env file: {0}")]
    EnvFile(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error(transparent)]
    Model(#[from] ModelError),
}
