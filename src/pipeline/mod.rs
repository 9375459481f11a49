// Batch ETL pipeline: ingestion, processing, storage and the stage runners

pub mod ingestion;
pub mod inspect;
pub mod processing;
pub mod storage;
pub mod tasks;

pub use tasks::{load_aggregates, run_aggregate, run_all, run_clean, run_ingest, PipelineContext};
