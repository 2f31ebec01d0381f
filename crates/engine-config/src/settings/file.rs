use crate::error::ConfigError;
use connectors::file::csv::settings::CsvSettings;
use model::{
    execution::connection::{
        DEFAULT_BATCH_SIZE, DEFAULT_CONNECTION_TIMEOUT, DEFAULT_LOCAL_DC, DEFAULT_PORT,
        DEFAULT_REQUEST_TIMEOUT,
    },
    schema::ColumnDef,
};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// On-disk shape of a connection file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub contact_points: Vec<String>,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub local_dc: String,
    pub connection_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub consistency_level: String,
    pub table: String,
    pub batch_size: usize,
    pub dry_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub csv: Option<CsvSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaBlock>,
}

/// Column layout given inline instead of read from the cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaBlock {
    pub columns: Vec<ColumnDef>,
    pub primary_key: Vec<String>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        ConfigFile {
            contact_points: Vec::new(),
            port: DEFAULT_PORT,
            username: String::new(),
            password: String::new(),
            local_dc: DEFAULT_LOCAL_DC.to_string(),
            connection_timeout_secs: DEFAULT_CONNECTION_TIMEOUT.as_secs(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
            consistency_level: "LOCAL_ONE".to_string(),
            table: String::new(),
            batch_size: DEFAULT_BATCH_SIZE,
            dry_run: false,
            csv: None,
            schema: None,
        }
    }
}

impl ConfigFile {
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}
