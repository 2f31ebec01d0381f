//! Adapter for dataflow frameworks that hand over one payload per trigger
//! and route it on success or failure.

use crate::driver::IngestionDriver;
use connectors::file::csv::settings::CsvSettings;
use engine_core::connection::ConnectionManager;
use model::{execution::connection::ConnectionConfig, schema::RowSchema};
use std::{collections::BTreeMap, fmt, sync::Arc};
use tracing::{error, info};

pub const ATTR_ACCESS: &str = "cql.access";
pub const ATTR_COUNT: &str = "cql.count";
pub const ATTR_ERROR: &str = "cql.error";

/// Per-trigger settings supplied by the host framework.
#[derive(Debug, Clone)]
pub struct FlowProperties {
    pub connection: ConnectionConfig,
    pub schema: RowSchema,
    pub csv: CsvSettings,
    pub stop_on_first_error: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowRoute {
    Success,
    Failure,
}

impl fmt::Display for FlowRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowRoute::Success => f.write_str("success"),
            FlowRoute::Failure => f.write_str("failure"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FlowOutcome {
    pub route: FlowRoute,
    pub attributes: BTreeMap<String, String>,
}

/// Writes each triggered payload through a shared [`ConnectionManager`], so
/// consecutive triggers with the same properties reuse one session.
pub struct FlowProcessor {
    manager: Arc<ConnectionManager>,
}

impl FlowProcessor {
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self { manager }
    }

    /// One write attempt per payload; failures are routed, never retried.
    pub async fn on_trigger(&self, content: &[u8], properties: &FlowProperties) -> FlowOutcome {
        let driver = IngestionDriver::new(
            self.manager.clone(),
            properties.connection.clone(),
            properties.schema.clone(),
            properties.csv.clone(),
        );

        let mut attributes = BTreeMap::new();
        let result = driver
            .run_content("flowfile", content, properties.stop_on_first_error)
            .await;

        let route = match result {
            Ok(report) => {
                if let Some(access) = report.access {
                    attributes.insert(ATTR_ACCESS.to_string(), access.to_string());
                }
                attributes.insert(ATTR_COUNT.to_string(), report.processed.to_string());
                if report.is_clean() {
                    FlowRoute::Success
                } else {
                    let summary = format!(
                        "{} records rejected, {} batches failed",
                        report.record_failures, report.batches_failed
                    );
                    attributes.insert(ATTR_ERROR.to_string(), summary);
                    FlowRoute::Failure
                }
            }
            Err(err) => {
                error!(error = %err, "Flow payload failed");
                attributes.insert(ATTR_COUNT.to_string(), err.processed().to_string());
                attributes.insert(ATTR_ERROR.to_string(), err.to_string());
                FlowRoute::Failure
            }
        };

        info!(route = %route, count = ?attributes.get(ATTR_COUNT), "Flow payload routed");
        FlowOutcome { route, attributes }
    }
}
