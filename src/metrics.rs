//! Pipeline metrics.
//!
//! Stages record through the `metrics` facade. Without an installed recorder
//! the calls are no-ops. The CLI installs a Prometheus listener only when an
//! address is configured.

use ::metrics::{describe_counter, describe_histogram, Unit};
use once_cell::sync::Lazy;
use std::net::SocketAddr;
use std::sync::Once;
use tracing::{info, warn};

pub const RECORDS_INGESTED: &str = "etl_records_ingested_total";
pub const RECORDS_REJECTED: &str = "etl_records_rejected_total";
pub const DUPLICATES_REMOVED: &str = "etl_duplicates_removed_total";
pub const SECTORS_AGGREGATED: &str = "etl_sectors_aggregated_total";
pub const SECTORS_DROPPED: &str = "etl_sectors_dropped_total";
pub const DOCUMENTS_INSERTED: &str = "etl_documents_inserted_total";
pub const INSERT_BATCH_FAILURES: &str = "etl_insert_batch_failures_total";
pub const STAGE_DURATION: &str = "etl_stage_duration_seconds";

/// Every counter the pipeline emits, with its help text
pub static COUNTERS: Lazy<Vec<(&'static str, &'static str)>> = Lazy::new(|| {
    vec![
        (RECORDS_INGESTED, "Raw records written to the raw collection"),
        (RECORDS_REJECTED, "Raw records rejected by validation"),
        (DUPLICATES_REMOVED, "Clean records removed as duplicates"),
        (SECTORS_AGGREGATED, "Sector aggregates written to the snapshot"),
        (SECTORS_DROPPED, "Sector aggregates dropped for failing invariants"),
        (DOCUMENTS_INSERTED, "Documents inserted, by collection"),
        (INSERT_BATCH_FAILURES, "Insert batches that failed outright, by collection"),
    ]
});

static INIT: Once = Once::new();

/// Register metric descriptions with whatever recorder is installed
pub fn describe_metrics() {
    for (name, help) in COUNTERS.iter() {
        describe_counter!(*name, *help);
    }
    describe_histogram!(STAGE_DURATION, Unit::Seconds, "Wall time of one pipeline stage");
}

/// Install the Prometheus exporter listening on `addr`. Idempotent.
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: &str) {
    INIT.call_once(|| {
        let socket: SocketAddr = match addr.parse() {
            Ok(socket) => socket,
            Err(e) => {
                warn!("Invalid metrics addr '{}': {}; metrics export disabled", addr, e);
                return;
            }
        };
        match ::metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(socket)
            .install()
        {
            Ok(()) => {
                describe_metrics();
                info!("Prometheus exporter listening at http://{}/metrics", socket);
            }
            Err(e) => warn!("Failed to install Prometheus recorder: {}", e),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_metric_names_are_unique_and_prefixed() {
        let names: HashSet<_> = COUNTERS.iter().map(|(name, _)| *name).collect();
        assert_eq!(names.len(), COUNTERS.len());
        assert!(names.iter().all(|n| n.starts_with("etl_") && n.ends_with("_total")));
    }

    #[test]
    fn test_describe_without_recorder_is_noop() {
        describe_metrics();
    }
}
