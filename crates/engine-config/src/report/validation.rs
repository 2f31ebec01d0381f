use serde::Serialize;

/// Per-record verdict of a validation pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ValidationOutcome {
    Match,
    /// Row exists but these columns differ from the source.
    Mismatch { columns: Vec<String> },
    /// `cause` is `None` when the row is absent, or the read failure.
    Missing { cause: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordValidation {
    pub line: u64,
    pub key: String,
    #[serde(flatten)]
    pub outcome: ValidationOutcome,
}

/// Totals of a validation pass. Only records that did not match are listed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub source: String,
    pub table: String,
    pub total: u64,
    pub matched: u64,
    pub mismatched: u64,
    pub missing: u64,
    pub discrepancies: Vec<RecordValidation>,
}

impl ValidationReport {
    pub fn new(source: &str, table: &str) -> Self {
        ValidationReport {
            source: source.to_string(),
            table: table.to_string(),
            ..Default::default()
        }
    }

    pub fn record(&mut self, result: RecordValidation) {
        self.total += 1;
        match result.outcome {
            ValidationOutcome::Match => {
                self.matched += 1;
                return;
            }
            ValidationOutcome::Mismatch { .. } => self.mismatched += 1,
            ValidationOutcome::Missing { .. } => self.missing += 1,
        }
        self.discrepancies.push(result);
    }

    pub fn is_clean(&self) -> bool {
        self.matched == self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tallies_outcomes_and_keeps_discrepancies() {
        let mut report = ValidationReport::new("in.csv", "ks.t");
        report.record(RecordValidation {
            line: 2,
            key: "1".into(),
            outcome: ValidationOutcome::Match,
        });
        report.record(RecordValidation {
            line: 3,
            key: "2".into(),
            outcome: ValidationOutcome::Mismatch {
                columns: vec!["cola".into()],
            },
        });
        report.record(RecordValidation {
            line: 4,
            key: "3".into(),
            outcome: ValidationOutcome::Missing { cause: None },
        });

        assert_eq!(
            (report.total, report.matched, report.mismatched, report.missing),
            (3, 1, 1, 1)
        );
        assert_eq!(report.discrepancies.len(), 2);
        assert!(!report.is_clean());

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["discrepancies"][0]["status"], "mismatch");
        assert_eq!(json["discrepancies"][1]["cause"], serde_json::Value::Null);
    }
}
