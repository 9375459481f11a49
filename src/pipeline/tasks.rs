//! Stage runners: ingest, clean and aggregate, each reading from and writing
//! to the document store held by a [`PipelineContext`].

use ::metrics::{counter, histogram};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::{AppConfig, StorageBackend};
use crate::constants::{
    AGGREGATED_COLLECTION, CLEAN_COLLECTION, MIN_EXPECTED_COLUMNS, MIN_EXPECTED_ROWS, RAW_COLLECTION, SECTOR_KEY,
};
use crate::domain::{RawRecord, SectorAggregate};
use crate::error::{PipelineError, Result, StorageError};
use crate::metrics as etl_metrics;
use crate::pipeline::ingestion::load_raw_file;
use crate::pipeline::processing::aggregate::aggregate_by_sector;
use crate::pipeline::processing::dedup::deduplicate;
use crate::pipeline::processing::normalize::{normalize_batch, DefaultNormalizer};
use crate::pipeline::storage::{
    from_document, insert_documents, to_document, Document, DocumentStore, InMemoryStore, InsertSummary, SqliteStore,
};

/// Everything a stage needs: configuration and the storage collaborator
#[derive(Clone)]
pub struct PipelineContext {
    pub config: AppConfig,
    pub store: Arc<dyn DocumentStore>,
}

impl std::fmt::Debug for PipelineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineContext")
            .field("config", &self.config)
            .field("store", &self.store.backend_name())
            .finish()
    }
}

impl PipelineContext {
    pub fn new(config: AppConfig, store: Arc<dyn DocumentStore>) -> Self {
        Self { config, store }
    }

    /// Open the configured backend and check it is reachable.
    ///
    /// This is the only storage failure that aborts a run.
    pub async fn connect(config: AppConfig) -> Result<Self> {
        let store: Arc<dyn DocumentStore> = match config.storage.backend {
            StorageBackend::Sqlite => Arc::new(SqliteStore::open(&config.storage.sqlite_path)?),
            StorageBackend::Memory => Arc::new(InMemoryStore::new()),
        };
        store.ping().await.map_err(|e| {
            StorageError::Unavailable(format!("{} backend did not answer ping: {}", store.backend_name(), e))
        })?;
        info!("Connected to {} document store", store.backend_name());
        Ok(Self::new(config, store))
    }
}

/// Identity and timing shared by every stage report
#[derive(Debug, Clone, Serialize)]
pub struct RunInfo {
    pub run_id: Uuid,
    pub stage: &'static str,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Starts the clock for a stage and stamps the run identity when it ends
struct StageTimer {
    run_id: Uuid,
    stage: &'static str,
    started_at: DateTime<Utc>,
    clock: Instant,
}

impl StageTimer {
    fn start(stage: &'static str) -> Self {
        let run_id = Uuid::new_v4();
        info!("Starting {} stage (run {})", stage, run_id);
        Self {
            run_id,
            stage,
            started_at: Utc::now(),
            clock: Instant::now(),
        }
    }

    fn finish(self) -> RunInfo {
        let elapsed = self.clock.elapsed();
        histogram!(etl_metrics::STAGE_DURATION, "stage" => self.stage).record(elapsed.as_secs_f64());
        info!(
            "Finished {} stage (run {}) in {:.2}s",
            self.stage,
            self.run_id,
            elapsed.as_secs_f64()
        );
        RunInfo {
            run_id: self.run_id,
            stage: self.stage,
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub run: RunInfo,
    pub source: PathBuf,
    pub rows_read: usize,
    pub rows_skipped: usize,
    pub columns: usize,
    /// Row or column counts below what a full extract carries
    pub shape_warnings: Vec<String>,
    /// Documents removed from the raw collection before loading
    pub replaced: u64,
    pub insert: InsertSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct CleanReport {
    pub run: RunInfo,
    pub raw_records: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub duplicates_removed: usize,
    pub insert: InsertSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct AggregateReport {
    pub run: RunInfo,
    pub clean_records: usize,
    pub sectors: usize,
    pub dropped_sectors: Vec<String>,
    pub insert: InsertSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub ingest: IngestReport,
    pub clean: CleanReport,
    pub aggregate: AggregateReport,
}

/// Load an input file into the raw collection.
///
/// Rows are stored as read. With `replace` the raw collection is emptied
/// first; otherwise rows are appended to whatever an earlier ingest left.
#[instrument(skip(ctx), fields(backend = ctx.store.backend_name()))]
pub async fn run_ingest(ctx: &PipelineContext, source: &Path, replace: bool) -> Result<IngestReport> {
    let timer = StageTimer::start("ingest");
    let loaded = load_raw_file(source)?;
    let shape_warnings = shape_warnings(loaded.documents.len(), loaded.columns);
    for warning in &shape_warnings {
        warn!("{}", warning);
    }

    let replaced = if replace {
        let removed = ctx.store.clear(RAW_COLLECTION).await?;
        if removed > 0 {
            info!("Removed {} documents from {}", removed, RAW_COLLECTION);
        }
        removed
    } else {
        0
    };

    let rows_read = loaded.documents.len();
    let insert = insert_documents(
        ctx.store.as_ref(),
        RAW_COLLECTION,
        loaded.documents,
        ctx.config.pipeline.batch_size,
    )
    .await;
    counter!(etl_metrics::RECORDS_INGESTED).increment(insert.inserted as u64);
    info!("Successfully ingested {} documents", insert.inserted);

    Ok(IngestReport {
        run: timer.finish(),
        source: source.to_path_buf(),
        rows_read,
        rows_skipped: loaded.skipped,
        columns: loaded.columns,
        shape_warnings,
        replaced,
        insert,
    })
}

fn shape_warnings(rows: usize, columns: usize) -> Vec<String> {
    let mut warnings = Vec::new();
    if rows < MIN_EXPECTED_ROWS {
        warnings.push(format!("Expected at least {} rows, got {}", MIN_EXPECTED_ROWS, rows));
    }
    if columns < MIN_EXPECTED_COLUMNS {
        warnings.push(format!("Expected at least {} columns, got {}", MIN_EXPECTED_COLUMNS, columns));
    }
    warnings
}

/// Normalize and deduplicate the raw collection into a fresh clean collection
#[instrument(skip(ctx), fields(backend = ctx.store.backend_name()))]
pub async fn run_clean(ctx: &PipelineContext) -> Result<CleanReport> {
    let timer = StageTimer::start("clean");

    let raw_documents = ctx.store.find_all(RAW_COLLECTION).await?;
    info!("Loaded {} raw records", raw_documents.len());
    if raw_documents.is_empty() {
        warn!("No raw data found in {}; run ingest first", RAW_COLLECTION);
    }
    let raw_records = raw_documents.len();
    let records = raw_documents
        .into_iter()
        .map(from_document::<RawRecord>)
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let normalizer = DefaultNormalizer::new();
    let batch = normalize_batch(&normalizer, &records, ctx.config.pipeline.max_logged_rejections);
    counter!(etl_metrics::RECORDS_REJECTED).increment(batch.rejected as u64);
    let accepted = batch.accepted.len();

    let deduplicated = deduplicate(batch.accepted);
    counter!(etl_metrics::DUPLICATES_REMOVED).increment(deduplicated.removed as u64);
    info!("Removed {} duplicate records", deduplicated.removed);

    let documents = to_documents(&deduplicated.records)?;
    let removed = ctx.store.clear(CLEAN_COLLECTION).await?;
    if removed > 0 {
        info!("Replaced {} documents in {}", removed, CLEAN_COLLECTION);
    }
    let insert = insert_documents(
        ctx.store.as_ref(),
        CLEAN_COLLECTION,
        documents,
        ctx.config.pipeline.batch_size,
    )
    .await;
    info!("Successfully saved {} cleaned documents", insert.inserted);

    Ok(CleanReport {
        run: timer.finish(),
        raw_records,
        accepted,
        rejected: batch.rejected,
        duplicates_removed: deduplicated.removed,
        insert,
    })
}

/// Recompute the sector snapshot from the whole clean collection
#[instrument(skip(ctx), fields(backend = ctx.store.backend_name()))]
pub async fn run_aggregate(ctx: &PipelineContext) -> Result<AggregateReport> {
    let timer = StageTimer::start("aggregate");

    let clean_documents = ctx.store.find_all(CLEAN_COLLECTION).await?;
    if clean_documents.is_empty() {
        warn!("No clean data found in {}; run clean first", CLEAN_COLLECTION);
    }
    let mut records = Vec::with_capacity(clean_documents.len());
    for document in clean_documents {
        match from_document(document) {
            Ok(record) => records.push(record),
            Err(e) => warn!("Skipping unreadable clean record: {}", e),
        }
    }

    let outcome = aggregate_by_sector(&records);
    counter!(etl_metrics::SECTORS_AGGREGATED).increment(outcome.aggregates.len() as u64);
    counter!(etl_metrics::SECTORS_DROPPED).increment(outcome.dropped.len() as u64);

    let documents = to_documents(&outcome.aggregates)?;
    ctx.store.clear(AGGREGATED_COLLECTION).await?;
    ctx.store.ensure_unique_key(AGGREGATED_COLLECTION, SECTOR_KEY).await?;
    let insert = insert_documents(
        ctx.store.as_ref(),
        AGGREGATED_COLLECTION,
        documents,
        ctx.config.pipeline.batch_size,
    )
    .await;
    info!("Successfully saved {} aggregated documents", insert.inserted);

    Ok(AggregateReport {
        run: timer.finish(),
        clean_records: records.len(),
        sectors: outcome.aggregates.len(),
        dropped_sectors: outcome.dropped.into_iter().map(|e| e.sector).collect(),
        insert,
    })
}

/// Run ingest, clean and aggregate back to back
pub async fn run_all(ctx: &PipelineContext, source: &Path, replace: bool) -> Result<PipelineReport> {
    let ingest = run_ingest(ctx, source, replace).await?;
    let clean = run_clean(ctx).await?;
    let aggregate = run_aggregate(ctx).await?;
    Ok(PipelineReport {
        ingest,
        clean,
        aggregate,
    })
}

/// Read the current sector snapshot
pub async fn load_aggregates(store: &dyn DocumentStore) -> Result<Vec<SectorAggregate>> {
    let documents = store.find_all(AGGREGATED_COLLECTION).await?;
    documents
        .into_iter()
        .map(|document| from_document(document).map_err(PipelineError::from))
        .collect()
}

fn to_documents<T: Serialize>(items: &[T]) -> Result<Vec<Document>> {
    items
        .iter()
        .map(|item| to_document(item).map_err(PipelineError::from))
        .collect()
}
