use serde_json::{json, Value};

use crate::adapters::catalog::{CatalogConnection, CatalogConnector};
use crate::adapters::object_store::{ObjectStatProbe, ProbeOutcome};
use crate::runtime::config::ReconcileConfig;
use crate::runtime::contract::{Inconsistency, InconsistencyKind, CLEAN_SCAN_MARKER};
use crate::runtime::response::{success_response, ApiGatewayResponse};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileHandlerError {
    pub message: String,
}

impl ReconcileHandlerError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Scans every catalog row against the blob store and reports discrepancies.
///
/// The invocation walks `INIT → CONNECTED → QUERIED → CHECKED* → CLOSED →
/// RESPONDED`. Business-level discrepancies are accumulated into the
/// response; collaborator faults abort the scan, but only after the catalog
/// connection has been released.
pub fn handle_reconcile_event(
    event: &Value,
    config: &ReconcileConfig,
    connector: &dyn CatalogConnector,
    probe: &dyn ObjectStatProbe,
) -> Result<ApiGatewayResponse, ReconcileHandlerError> {
    log_reconcile_info(
        "scan_started",
        json!({
            "table": config.table_name,
            "bucket": config.bucket,
            "event": event,
        }),
    );

    // Connect failure is fatal and leaves nothing to release.
    let mut connection = connector.connect().map_err(ReconcileHandlerError::new)?;

    let scan = scan_catalog(connection.as_mut(), config, probe);
    let close_result = connection.close();

    let inconsistencies = match scan {
        Ok(entries) => entries,
        Err(message) => {
            // The scan fault takes precedence, but a close failure on the
            // abort path still has to reach the logs.
            if let Err(close_error) = close_result {
                log_reconcile_error("close_failed", json!({"error": close_error}));
            }
            log_reconcile_error("scan_aborted", json!({"error": message.clone()}));
            return Err(ReconcileHandlerError::new(message));
        }
    };
    close_result.map_err(ReconcileHandlerError::new)?;

    if inconsistencies.is_empty() {
        log_reconcile_info("scan_clean", json!({"table": config.table_name}));
        Ok(success_response(200, CLEAN_SCAN_MARKER))
    } else {
        log_reconcile_info(
            "scan_found_inconsistencies",
            json!({
                "table": config.table_name,
                "count": inconsistencies.len(),
            }),
        );
        Ok(success_response(400, &inconsistencies))
    }
}

fn scan_catalog(
    connection: &mut dyn CatalogConnection,
    config: &ReconcileConfig,
    probe: &dyn ObjectStatProbe,
) -> Result<Vec<Inconsistency>, String> {
    let rows = connection.fetch_rows(&config.table_name)?;
    let mut inconsistencies = Vec::new();

    // One probe in flight at a time: memory stays bounded by a single row,
    // at the cost of latency linear in row count.
    for row in &rows {
        match probe.head_object(&row.object_key)? {
            ProbeOutcome::Found { size } if size == row.expected_size => {}
            ProbeOutcome::Found { size } => {
                log_reconcile_info(
                    "size_mismatch",
                    json!({
                        "object": row.object_key,
                        "bucket": config.bucket,
                        "expected_size": row.expected_size,
                        "reported_size": size,
                    }),
                );
                inconsistencies.push(Inconsistency {
                    object: row.object_key.clone(),
                    bucket: config.bucket.clone(),
                    kind: InconsistencyKind::SizeMismatch,
                });
            }
            ProbeOutcome::Missing => {
                log_reconcile_info(
                    "object_missing",
                    json!({
                        "object": row.object_key,
                        "bucket": config.bucket,
                    }),
                );
                inconsistencies.push(Inconsistency {
                    object: row.object_key.clone(),
                    bucket: config.bucket.clone(),
                    kind: InconsistencyKind::NotFound,
                });
            }
        }
    }

    Ok(inconsistencies)
}

fn log_reconcile_info(event: &str, details: Value) {
    eprintln!(
        "{}",
        json!({
            "component": "reconcile_handler",
            "event": event,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "details": details,
        })
    );
}

fn log_reconcile_error(event: &str, details: Value) {
    eprintln!(
        "{}",
        json!({
            "component": "reconcile_handler",
            "level": "error",
            "event": event,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "details": details,
        })
    );
}
