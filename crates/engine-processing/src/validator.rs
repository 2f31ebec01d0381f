use crate::{encoder::encode, error::{EncodingError, ValidationError}};
use connectors::{
    cql::{error::DbError, session::CqlSession},
    file::csv::error::FileError,
};
use engine_config::report::validation::{RecordValidation, ValidationOutcome, ValidationReport};
use futures::stream::{self, StreamExt};
use model::{
    core::value::{FieldValue, Value},
    records::record::SourceRecord,
    schema::{ColumnDef, RowSchema},
};
use std::{sync::Arc, time::Instant};
use tracing::{debug, info, warn};

pub const DEFAULT_READ_CONCURRENCY: usize = 16;
const CHUNK_SIZE: usize = 1024;

/// One point read to issue: the key to look up and the values expected
/// under it.
struct Lookup {
    line: u64,
    key: Vec<FieldValue>,
    columns: Vec<ColumnDef>,
    expected: Vec<FieldValue>,
}

/// Reads rows back by primary key and compares them with a reference input.
/// Never writes.
pub struct Validator {
    session: Arc<dyn CqlSession>,
    concurrency: usize,
}

impl Validator {
    pub fn new(session: Arc<dyn CqlSession>) -> Self {
        Self {
            session,
            concurrency: DEFAULT_READ_CONCURRENCY,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Checks every record of `records` against the stored row with the same
    /// key. Results keep input order.
    ///
    /// `primary_key_columns` must name columns of `schema`; they are used in
    /// the order given. A record that cannot be encoded aborts the pass, since
    /// the reference itself is then malformed. A failed read is recorded as
    /// missing with its cause.
    pub async fn validate<I>(
        &self,
        source_name: &str,
        records: I,
        schema: &RowSchema,
        primary_key_columns: &[String],
    ) -> Result<ValidationReport, ValidationError>
    where
        I: IntoIterator<Item = Result<SourceRecord, FileError>>,
    {
        let start = Instant::now();
        let key_columns = resolve_key(schema, primary_key_columns)?;
        let mut report = ValidationReport::new(source_name, &schema.table().to_string());
        let mut chunk = Vec::with_capacity(CHUNK_SIZE);

        info!(
            source = source_name,
            table = %schema.table(),
            key = ?key_columns,
            "Starting validation"
        );

        for next in records {
            let record = next?;
            let row = encode(&record, schema).map_err(|source| ValidationError::Encoding {
                line: record.line,
                source,
            })?;
            chunk.push(lookup(row.line, row.field_values, schema, &key_columns)?);

            if chunk.len() >= CHUNK_SIZE {
                self.check(std::mem::take(&mut chunk), schema, &mut report)
                    .await;
            }
        }
        if !chunk.is_empty() {
            self.check(chunk, schema, &mut report).await;
        }

        info!(
            source = source_name,
            total = report.total,
            matched = report.matched,
            mismatched = report.mismatched,
            missing = report.missing,
            duration_ms = start.elapsed().as_millis(),
            "Validation finished"
        );
        Ok(report)
    }

    async fn check(&self, lookups: Vec<Lookup>, schema: &RowSchema, report: &mut ValidationReport) {
        let table = schema.table();
        let session = &self.session;

        let results = stream::iter(lookups)
            .map(|lookup| async move {
                let stored = session
                    .fetch_by_key(table, &lookup.columns, &lookup.key)
                    .await;
                (lookup, stored)
            })
            .buffered(self.concurrency)
            .collect::<Vec<_>>()
            .await;

        for (lookup, stored) in results {
            let key = lookup
                .key
                .iter()
                .map(|fv| fv.value.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            let outcome = compare(&lookup, stored);
            match &outcome {
                ValidationOutcome::Match => {}
                ValidationOutcome::Mismatch { columns } => {
                    warn!(line = lookup.line, key = %key, columns = ?columns, "Stored row differs")
                }
                ValidationOutcome::Missing { cause: None } => {
                    warn!(line = lookup.line, key = %key, "Row not found")
                }
                ValidationOutcome::Missing { cause: Some(cause) } => {
                    warn!(line = lookup.line, key = %key, error = %cause, "Read failed")
                }
            }
            report.record(RecordValidation {
                line: lookup.line,
                key,
                outcome,
            });
        }
    }
}

fn resolve_key(schema: &RowSchema, primary_key_columns: &[String]) -> Result<Vec<String>, ValidationError> {
    if primary_key_columns.is_empty() {
        return Err(ValidationError::InvalidKey(
            "at least one key column is required".to_string(),
        ));
    }

    let mut resolved: Vec<String> = Vec::with_capacity(primary_key_columns.len());
    for name in primary_key_columns {
        let column = schema.column(name).ok_or_else(|| {
            ValidationError::InvalidKey(format!("'{name}' is not a column of {}", schema.table()))
        })?;
        if resolved.contains(&column.name) {
            return Err(ValidationError::InvalidKey(format!(
                "'{name}' is listed more than once"
            )));
        }
        resolved.push(column.name.clone());
    }
    Ok(resolved)
}

fn lookup(
    line: u64,
    field_values: Vec<FieldValue>,
    schema: &RowSchema,
    key_columns: &[String],
) -> Result<Lookup, ValidationError> {
    let mut key = Vec::with_capacity(key_columns.len());
    for name in key_columns {
        let field = field_values
            .iter()
            .find(|fv| fv.name == *name)
            .ok_or_else(|| ValidationError::Encoding {
                line,
                source: EncodingError::MissingKey {
                    column: name.clone(),
                },
            })?;
        if field.value.is_null() {
            return Err(ValidationError::Encoding {
                line,
                source: EncodingError::Empty {
                    column: name.clone(),
                },
            });
        }
        key.push(field.clone());
    }

    let expected = field_values
        .into_iter()
        .filter(|fv| !key_columns.contains(&fv.name))
        .collect::<Vec<_>>();
    let columns = expected
        .iter()
        .filter_map(|fv| schema.column(&fv.name).cloned())
        .collect();

    Ok(Lookup {
        line,
        key,
        columns,
        expected,
    })
}

fn compare(lookup: &Lookup, stored: Result<Option<Vec<Value>>, DbError>) -> ValidationOutcome {
    match stored {
        Err(err) => ValidationOutcome::Missing {
            cause: Some(err.to_string()),
        },
        Ok(None) => ValidationOutcome::Missing { cause: None },
        Ok(Some(values)) => {
            let columns = lookup
                .expected
                .iter()
                .zip(values.iter())
                .filter(|(expected, stored)| !expected.value.matches(stored))
                .map(|(expected, _)| expected.name.clone())
                .collect::<Vec<_>>();
            debug!(line = lookup.line, differing = columns.len(), "Compared row");
            if columns.is_empty() {
                ValidationOutcome::Match
            } else {
                ValidationOutcome::Mismatch { columns }
            }
        }
    }
}
