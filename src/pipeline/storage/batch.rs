use ::metrics::counter;
use serde::Serialize;
use tracing::{info, warn};

use super::{Document, DocumentStore};

/// Totals for a chunked insert across all batches
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InsertSummary {
    pub batches: usize,
    pub inserted: usize,
    /// Documents rejected individually inside otherwise successful batches
    pub rejected_documents: usize,
    /// Batches whose insert call failed outright
    pub failed_batches: usize,
    /// Documents lost with failed batches
    pub failed_documents: usize,
}

/// Insert documents in chunks of `batch_size`.
///
/// A failing chunk is logged and counted and the remaining chunks are still
/// attempted, so `inserted` is always the exact number of stored documents.
pub async fn insert_documents(
    store: &dyn DocumentStore,
    collection: &str,
    documents: Vec<Document>,
    batch_size: usize,
) -> InsertSummary {
    let batch_size = batch_size.max(1);
    let total = documents.len();
    let mut summary = InsertSummary::default();
    let mut remaining = documents.into_iter();

    loop {
        let chunk: Vec<Document> = remaining.by_ref().take(batch_size).collect();
        if chunk.is_empty() {
            break;
        }
        summary.batches += 1;
        let chunk_len = chunk.len();

        match store.insert_batch(collection, chunk).await {
            Ok(report) => {
                summary.inserted += report.inserted;
                summary.rejected_documents += report.failed;
                info!(
                    "Inserted batch {}: {} documents ({}/{} total)",
                    summary.batches, report.inserted, summary.inserted, total
                );
                if report.failed > 0 {
                    warn!(
                        "Batch insert had some failures: {} inserted, {} errors (first: {})",
                        report.inserted,
                        report.failed,
                        report.errors.first().map(String::as_str).unwrap_or("n/a")
                    );
                }
            }
            Err(e) => {
                summary.failed_batches += 1;
                summary.failed_documents += chunk_len;
                counter!(crate::metrics::INSERT_BATCH_FAILURES, "collection" => collection.to_string()).increment(1);
                warn!("Batch {} insert into {} failed: {}", summary.batches, collection, e);
            }
        }
    }

    counter!(crate::metrics::DOCUMENTS_INSERTED, "collection" => collection.to_string())
        .increment(summary.inserted as u64);
    info!("Total documents inserted into {}: {}", collection, summary.inserted);
    summary
}
