use crate::{
    error::CliError,
    generate::{GeneratorOptions, generate},
    output::InputOutcome,
};
use clap::Parser;
use commands::Commands;
use connectors::{
    cql::cluster::ScyllaSessionFactory,
    file::csv::{error::FileError, source::CsvRecordSource},
};
use engine_config::{
    env::EnvManager,
    settings::{Overrides, Settings},
};
use engine_core::connection::ConnectionManager;
use engine_processing::{
    driver::{STDIN_PATH, run_inputs},
    error::ValidationError,
    validator::Validator,
};
use model::{records::record::SourceRecord, schema::RowSchema};
use std::{
    fs::File,
    io::{self, BufWriter},
    path::{Path, PathBuf},
    process::ExitCode,
    sync::Arc,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod generate;
mod output;

const DEFAULT_ENV_FILE: &str = ".env";

#[derive(Parser)]
#[command(
    name = "csv2cql",
    version,
    about = "Bulk CSV ingestion and validation for Cassandra/Scylla tables"
)]
struct Cli {
    #[arg(long, global = true, help = "Config file path (defaults to connection-private.json, then connection.json)")]
    config: Option<PathBuf>,

    #[arg(long, global = true, help = "Env file with CQL_* overrides (defaults to .env)")]
    env_file: Option<PathBuf>,

    #[arg(long, short, global = true, help = "Enable debug logging")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::from(err.exit_code())
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Generate {
            rows,
            sequential,
            seed,
            output,
        } => {
            let options = GeneratorOptions {
                rows,
                sequential,
                seed,
            };
            match output {
                Some(path) => {
                    generate(BufWriter::new(File::create(&path)?), &options)?;
                    info!(rows, path = %path, "Generated CSV");
                }
                None => generate(io::stdout().lock(), &options)?,
            }
            Ok(())
        }
        Commands::Write {
            inputs,
            stdin,
            batch_size,
            dry_run,
            stop_on_first_error,
            output,
        } => {
            let inputs = if stdin {
                vec![STDIN_PATH.to_string()]
            } else {
                inputs
            };
            if inputs.is_empty() {
                return Err(CliError::Usage(
                    "at least one input file or --stdin is required".to_string(),
                ));
            }
            if inputs.iter().filter(|i| *i == STDIN_PATH).count() > 1 {
                return Err(CliError::Usage(
                    "standard input can be read only once".to_string(),
                ));
            }
            let overrides = Overrides {
                batch_size,
                dry_run: dry_run.then_some(true),
            };
            let settings = load_settings(cli.config.as_deref(), cli.env_file.as_deref(), overrides)?;
            let manager = new_manager();
            let result = write(&settings, &manager, &inputs, stop_on_first_error, output).await;
            manager.close().await;
            result
        }
        Commands::Validate {
            input,
            key,
            concurrency,
            output,
        } => {
            let settings = load_settings(
                cli.config.as_deref(),
                cli.env_file.as_deref(),
                Overrides::default(),
            )?;
            let manager = new_manager();
            let result = validate(&settings, &manager, &input, key, concurrency, output).await;
            manager.close().await;
            result
        }
        Commands::Schema { output } => {
            let settings = load_settings(
                cli.config.as_deref(),
                cli.env_file.as_deref(),
                Overrides::default(),
            )?;
            let manager = new_manager();
            let result = match resolve_schema(&settings, &manager).await {
                Ok(schema) => output::emit_report(&schema, output.as_deref()).await,
                Err(err) => Err(err),
            };
            manager.close().await;
            result
        }
    }
}

async fn write(
    settings: &Settings,
    manager: &Arc<ConnectionManager>,
    inputs: &[String],
    stop_on_first_error: bool,
    output: Option<String>,
) -> Result<(), CliError> {
    let schema = resolve_schema(settings, manager).await?;
    let runs = run_inputs(
        manager,
        &settings.connection,
        &schema,
        &settings.csv,
        inputs,
        stop_on_first_error,
    )
    .await;

    let reports = runs.iter().map(InputOutcome::from).collect::<Vec<_>>();
    output::emit_report(&reports, output.as_deref()).await?;

    let mut record_failures = 0;
    let mut batches_failed = 0;
    for run in runs {
        match run.result {
            Ok(report) => {
                record_failures += report.record_failures;
                batches_failed += report.batches_failed;
            }
            Err(err) => return Err(err.into()),
        }
    }
    if record_failures > 0 || batches_failed > 0 {
        return Err(CliError::Incomplete {
            record_failures,
            batches_failed,
        });
    }
    Ok(())
}

async fn validate(
    settings: &Settings,
    manager: &ConnectionManager,
    input: &str,
    key: Vec<String>,
    concurrency: Option<usize>,
    output: Option<String>,
) -> Result<(), CliError> {
    let schema = resolve_schema(settings, manager).await?;
    let key = if key.is_empty() {
        schema.primary_key().to_vec()
    } else {
        key
    };
    let acquired = manager.acquire(&settings.connection).await?;

    let mut validator = Validator::new(acquired.session);
    if let Some(concurrency) = concurrency {
        validator = validator.with_concurrency(concurrency);
    }

    let (name, records) = open_records(input, settings)?;
    let report = validator.validate(&name, records, &schema, &key).await?;
    output::emit_report(&report, output.as_deref()).await?;

    if !report.is_clean() {
        return Err(CliError::Mismatch {
            discrepancies: report.mismatched + report.missing,
            total: report.total,
        });
    }
    Ok(())
}

fn load_settings(
    config: Option<&Path>,
    env_file: Option<&Path>,
    overrides: Overrides,
) -> Result<Settings, CliError> {
    let mut env = EnvManager::new();
    match env_file {
        Some(path) => env.load_from_file(path)?,
        None => {
            env.load_optional(DEFAULT_ENV_FILE)?;
        }
    }

    let dir = std::env::current_dir()?;
    Ok(Settings::load(config, &dir, &env, overrides)?)
}

fn new_manager() -> Arc<ConnectionManager> {
    Arc::new(ConnectionManager::new(Arc::new(ScyllaSessionFactory)))
}

/// The inline schema from the config file, or the live table definition.
async fn resolve_schema(
    settings: &Settings,
    manager: &ConnectionManager,
) -> Result<RowSchema, CliError> {
    if let Some(schema) = &settings.schema {
        return Ok(schema.clone());
    }

    let table = settings.connection.table();
    info!(table = %table, "No schema in configuration, reading it from the cluster");
    let acquired = manager.acquire(&settings.connection).await?;
    Ok(acquired.session.table_schema(table).await?)
}

type RecordIter = Box<dyn Iterator<Item = Result<SourceRecord, FileError>>>;

fn open_records(input: &str, settings: &Settings) -> Result<(String, RecordIter), CliError> {
    let records: RecordIter = if input == STDIN_PATH {
        Box::new(
            CsvRecordSource::from_reader("stdin", io::stdin(), &settings.csv)
                .map_err(ValidationError::from)?,
        )
    } else {
        Box::new(CsvRecordSource::from_path(input, &settings.csv).map_err(ValidationError::from)?)
    };
    let name = if input == STDIN_PATH { "stdin" } else { input };
    Ok((name.to_string(), records))
}
