use connectors::{
    cql::memory::MemoryStore,
    file::csv::{settings::CsvSettings, source::CsvRecordSource},
};
use engine_config::{
    env::EnvManager,
    settings::{Overrides, Settings},
};
use engine_core::connection::ConnectionManager;
use engine_processing::driver::IngestionDriver;
use model::{
    core::{data_type::DataType, value::Value},
    execution::connection::{ConnectionConfig, TableRef},
    schema::{ColumnDef, RowSchema},
};
use rand::{Rng, SeedableRng, distributions::Alphanumeric, rngs::StdRng};
use std::{io::Write, path::PathBuf, sync::Arc};
use tempfile::NamedTempFile;

/// Points the live-cluster tests at a connection JSON file.
pub const TEST_CONFIG_ENV: &str = "CSV2CQL_TEST_CONFIG";

pub const TEST_KEYSPACE: &str = "prftest";
pub const TEST_TABLE: &str = "csv2cql_test3";

/// DDL of the table the scenarios write into. Live runs expect it to exist.
pub const TEST_TABLE_DDL: &str = r#"
    CREATE TABLE IF NOT EXISTS prftest.csv2cql_test3 (
        colid bigint PRIMARY KEY,
        cola text,
        colb text,
        colc text
    );
"#;

pub fn test_table() -> TableRef {
    TableRef::new(Some(TEST_KEYSPACE), TEST_TABLE)
}

pub fn test_schema() -> RowSchema {
    RowSchema::new(
        test_table(),
        vec![
            ColumnDef::new("colid", DataType::BigInt),
            ColumnDef::new("cola", DataType::Text),
            ColumnDef::new("colb", DataType::Text),
            ColumnDef::new("colc", DataType::Text),
        ],
        vec!["colid".to_string()],
    )
    .expect("valid test schema")
}

pub fn key(id: i64) -> Vec<Value> {
    vec![Value::BigInt(id)]
}

/// CSV with header `colid,cola,colb,colc`. Sequential ids run `0..rows`;
/// random ids are drawn from `0..rows²`.
pub fn generate_csv(rows: usize, sequential: bool, seed: u64) -> String {
    let mut rng = StdRng::seed_from_u64(seed);
    let id_range = (rows as u64).saturating_mul(rows as u64).max(1);
    let mut out = String::from("colid,cola,colb,colc\n");

    for i in 0..rows {
        let id = if sequential {
            i as u64
        } else {
            rng.gen_range(0..id_range)
        };
        let a = random_text(&mut rng);
        let b = random_text(&mut rng);
        let c = random_text(&mut rng);
        out.push_str(&format!("{id},{a},{b},{c}\n"));
    }
    out
}

fn random_text(rng: &mut StdRng) -> String {
    (0..10).map(|_| char::from(rng.sample(Alphanumeric))).collect()
}

/// Replaces the `colid` of data row `index` (0-based) with `value`.
pub fn corrupt_id(csv: &str, index: usize, value: &str) -> String {
    csv.lines()
        .enumerate()
        .map(|(i, line)| {
            if i == index + 1 {
                let rest = line.split_once(',').map(|(_, rest)| rest).unwrap_or("");
                format!("{value},{rest}")
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
        + "\n"
}

pub fn write_temp_csv(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp csv");
    file.write_all(content.as_bytes()).expect("write temp csv");
    file.flush().expect("flush temp csv");
    file
}

pub fn memory_config(dry_run: bool, batch_size: usize) -> ConnectionConfig {
    ConnectionConfig::builder(test_table())
        .contact_points(["10.129.53.159", "10.129.53.154"])
        .batch_size(batch_size)
        .dry_run(dry_run)
        .build()
        .expect("valid test config")
}

pub fn memory_manager(store: &MemoryStore) -> Arc<ConnectionManager> {
    store.create_table(test_schema());
    Arc::new(ConnectionManager::new(Arc::new(store.clone())))
}

pub fn memory_driver(
    manager: &Arc<ConnectionManager>,
    dry_run: bool,
    batch_size: usize,
) -> IngestionDriver {
    IngestionDriver::new(
        manager.clone(),
        memory_config(dry_run, batch_size),
        test_schema(),
        CsvSettings::default(),
    )
}

pub fn records(content: &str) -> CsvRecordSource<&[u8]> {
    CsvRecordSource::from_reader("reference", content.as_bytes(), &CsvSettings::default())
        .expect("readable csv")
}

/// Settings for the live-cluster tests, when `CSV2CQL_TEST_CONFIG` is set.
pub fn live_settings(batch_size: usize) -> Option<Settings> {
    let path = PathBuf::from(std::env::var(TEST_CONFIG_ENV).ok()?);
    let dir = path.parent()?.to_path_buf();
    let overrides = Overrides {
        batch_size: Some(batch_size),
        dry_run: Some(false),
    };
    Some(Settings::load(Some(&path), &dir, &EnvManager::new(), overrides).expect("load live config"))
}
