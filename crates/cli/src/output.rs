use crate::error::CliError;
use engine_config::report::ingest::IngestReport;
use engine_processing::driver::InputRun;
use serde::Serialize;

/// Report entry for one input of a `write` run.
#[derive(Serialize)]
#[serde(untagged)]
pub enum InputOutcome<'a> {
    Finished(&'a IngestReport),
    Failed {
        source: &'a str,
        processed: u64,
        error: String,
    },
}

impl<'a> From<&'a InputRun> for InputOutcome<'a> {
    fn from(run: &'a InputRun) -> Self {
        match &run.result {
            Ok(report) => InputOutcome::Finished(report),
            Err(err) => InputOutcome::Failed {
                source: &run.source,
                processed: err.processed(),
                error: err.to_string(),
            },
        }
    }
}

fn generate_report_json<T: Serialize>(report: &T) -> Result<String, CliError> {
    let json = serde_json::to_string_pretty(report)?;
    Ok(json)
}

pub async fn write_report<T: Serialize>(report: &T, path: &str) -> Result<(), CliError> {
    let report_json = generate_report_json(report)?;
    tokio::fs::write(path, report_json).await?;
    Ok(())
}

pub async fn print_report<T: Serialize>(report: &T) -> Result<(), CliError> {
    let report_json = generate_report_json(report)?;
    println!("{report_json}");
    Ok(())
}

/// Writes to `output` when given, otherwise prints to stdout.
pub async fn emit_report<T: Serialize>(report: &T, output: Option<&str>) -> Result<(), CliError> {
    match output {
        Some(path) => write_report(report, path).await,
        None => print_report(report).await,
    }
}
