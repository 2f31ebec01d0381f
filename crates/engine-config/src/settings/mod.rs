use crate::{
    env::{ENV_CONTACT_POINTS, ENV_LOCAL_DC, ENV_PASSWORD, ENV_TABLE, ENV_USERNAME, EnvManager},
    error::ConfigError,
};
use connectors::file::csv::settings::CsvSettings;
use file::ConfigFile;
use model::{
    execution::connection::{Consistency, ConnectionConfig, TableRef},
    schema::RowSchema,
};
use std::{path::Path, time::Duration};
use tracing::{debug, info};

pub mod file;
pub mod locate;

/// Command-line values that win over the file.
#[derive(Debug, Clone, Copy, Default)]
pub struct Overrides {
    pub batch_size: Option<usize>,
    pub dry_run: Option<bool>,
}

/// Fully resolved configuration for one run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub connection: ConnectionConfig,
    pub csv: CsvSettings,
    /// Inline schema; `None` means it is read from the cluster.
    pub schema: Option<RowSchema>,
}

impl Settings {
    /// Reads `path`, or the first candidate file in `dir` when no path is
    /// given, then applies environment and command-line overrides.
    pub fn load(
        path: Option<&Path>,
        dir: &Path,
        env: &EnvManager,
        overrides: Overrides,
    ) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => locate::locate_config(dir)?,
        };
        info!(path = %path.display(), "Loading configuration");
        Self::resolve(ConfigFile::read(&path)?, env, overrides)
    }

    pub fn resolve(
        mut file: ConfigFile,
        env: &EnvManager,
        overrides: Overrides,
    ) -> Result<Self, ConfigError> {
        apply_env(&mut file, env);
        if let Some(batch_size) = overrides.batch_size {
            file.batch_size = batch_size;
        }
        if let Some(dry_run) = overrides.dry_run {
            file.dry_run = dry_run;
        }

        if file.table.trim().is_empty() {
            return Err(ConfigError::Invalid("table is required".to_string()));
        }
        if file.batch_size == 0 {
            return Err(ConfigError::Invalid("batch_size must be positive".to_string()));
        }
        if file.contact_points.iter().all(|h| h.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "at least one contact point is required".to_string(),
            ));
        }

        let table: TableRef = file.table.parse()?;
        let consistency: Consistency = file.consistency_level.parse()?;

        let connection = ConnectionConfig::builder(table.clone())
            .contact_points(file.contact_points)
            .port(file.port)
            .credentials(&file.username, &file.password)
            .local_dc(&file.local_dc)
            .connection_timeout(Duration::from_secs(file.connection_timeout_secs))
            .request_timeout(Duration::from_secs(file.request_timeout_secs))
            .consistency(consistency)
            .batch_size(file.batch_size)
            .dry_run(file.dry_run)
            .build()?;

        let schema = file
            .schema
            .map(|block| RowSchema::new(table, block.columns, block.primary_key))
            .transpose()?;

        debug!(config = ?connection, inline_schema = schema.is_some(), "Configuration resolved");
        Ok(Settings {
            connection,
            csv: file.csv.unwrap_or_default(),
            schema,
        })
    }
}

fn apply_env(file: &mut ConfigFile, env: &EnvManager) {
    if let Some(hosts) = env_override(env, ENV_CONTACT_POINTS) {
        file.contact_points = hosts
            .split(',')
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .collect();
    }
    if let Some(username) = env_override(env, ENV_USERNAME) {
        file.username = username.to_string();
    }
    if let Some(password) = env_override(env, ENV_PASSWORD) {
        file.password = password.to_string();
    }
    if let Some(local_dc) = env_override(env, ENV_LOCAL_DC) {
        file.local_dc = local_dc.to_string();
    }
    if let Some(table) = env_override(env, ENV_TABLE) {
        file.table = table.to_string();
    }
}

fn env_override<'a>(env: &'a EnvManager, key: &str) -> Option<&'a str> {
    let value = env.get(key)?;
    if let Some(shown) = env.display_value(key) {
        info!(variable = key, value = %shown, "Applying environment override");
    }
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::{core::data_type::DataType, execution::errors::ModelError};
    use std::fs;
    use tracing_test::traced_test;

    fn base() -> ConfigFile {
        ConfigFile {
            contact_points: vec!["10.0.0.1".into()],
            table: "prftest.csv2cql_test3".into(),
            ..Default::default()
        }
    }

    #[test]
    fn resolves_defaults() {
        let settings = Settings::resolve(base(), &EnvManager::empty(), Overrides::default()).unwrap();
        let conn = &settings.connection;
        assert_eq!(conn.port(), 9042);
        assert_eq!(conn.batch_size(), 200);
        assert_eq!(conn.consistency(), Consistency::LocalOne);
        assert_eq!(conn.request_timeout(), Duration::from_secs(60));
        assert_eq!(conn.table().to_string(), "prftest.csv2cql_test3");
        assert_eq!(settings.csv, CsvSettings::default());
    }

    #[test]
    fn env_and_flags_override_file() {
        let mut env = EnvManager::empty();
        env.set(ENV_CONTACT_POINTS, "10.1.1.1, 10.1.1.2");
        env.set(ENV_TABLE, "other.t");
        env.set(ENV_PASSWORD, "s3cret");

        let overrides = Overrides {
            batch_size: Some(50),
            dry_run: Some(true),
        };
        let settings = Settings::resolve(base(), &env, overrides).unwrap();
        let conn = &settings.connection;
        assert_eq!(conn.contact_points(), ["10.1.1.1", "10.1.1.2"]);
        assert_eq!(conn.table().keyspace(), Some("other"));
        assert_eq!(conn.password(), "s3cret");
        assert_eq!(conn.batch_size(), 50);
        assert!(conn.dry_run());
    }

    #[test]
    fn rejects_zero_batch_size() {
        let overrides = Overrides {
            batch_size: Some(0),
            dry_run: None,
        };
        let err = Settings::resolve(base(), &EnvManager::empty(), overrides).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_unknown_consistency() {
        let file = ConfigFile {
            consistency_level: "MOSTLY".into(),
            ..base()
        };
        let err = Settings::resolve(file, &EnvManager::empty(), Overrides::default()).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Model(ModelError::UnknownConsistency(_))
        ));
    }

    #[test]
    fn rejects_missing_table_and_hosts() {
        let no_table = ConfigFile {
            table: String::new(),
            ..base()
        };
        assert!(Settings::resolve(no_table, &EnvManager::empty(), Overrides::default()).is_err());

        let no_hosts = ConfigFile {
            contact_points: vec![],
            ..base()
        };
        assert!(Settings::resolve(no_hosts, &EnvManager::empty(), Overrides::default()).is_err());
    }

    #[test]
    fn builds_inline_schema_against_table() {
        let file = ConfigFile {
            schema: Some(file::SchemaBlock {
                columns: vec![
                    model::schema::ColumnDef::new("colid", DataType::Int),
                    model::schema::ColumnDef::new("cola", DataType::Text),
                ],
                primary_key: vec!["COLID".into()],
            }),
            ..base()
        };
        let settings = Settings::resolve(file, &EnvManager::empty(), Overrides::default()).unwrap();
        let schema = settings.schema.unwrap();
        assert_eq!(schema.primary_key(), ["colid"]);
        assert_eq!(schema.table().name(), "csv2cql_test3");
    }

    #[test]
    fn loads_candidate_file_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("connection.json"),
            r#"{"contact_points": ["127.0.0.1"], "table": "ks.t", "batch_size": 10}"#,
        )
        .unwrap();

        let settings =
            Settings::load(None, dir.path(), &EnvManager::empty(), Overrides::default()).unwrap();
        assert_eq!(settings.connection.batch_size(), 10);
    }

    #[traced_test]
    #[test]
    fn env_overrides_are_logged_without_secrets() {
        let mut env = EnvManager::empty();
        env.set(ENV_USERNAME, "loader");
        env.set(ENV_PASSWORD, "s3cr3t-pw");

        let settings = Settings::resolve(base(), &env, Overrides::default()).unwrap();

        assert_eq!(settings.connection.password(), "s3cr3t-pw");
        assert!(logs_contain("CQL_USERNAME"));
        assert!(logs_contain("loader"));
        assert!(logs_contain("CQL_PASSWORD"));
        assert!(!logs_contain("s3cr3t-pw"));
    }
}
