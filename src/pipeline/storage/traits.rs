use async_trait::async_trait;

use super::{Document, Filter, StorageResult};

/// Outcome of one unordered batch insert
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InsertReport {
    pub inserted: usize,
    pub failed: usize,
    /// One message per rejected document
    pub errors: Vec<String>,
}

/// Storage trait for the pipeline's document collections.
///
/// Inserts are unordered and best-effort: a document that violates a unique
/// key fails on its own and the rest of the batch is still written. An `Err`
/// means the whole call failed and nothing can be assumed about the batch.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Short backend name for logs
    fn backend_name(&self) -> &'static str;

    /// Connectivity probe run once before any stage does work
    async fn ping(&self) -> StorageResult<()>;

    async fn insert_batch(&self, collection: &str, documents: Vec<Document>) -> StorageResult<InsertReport>;
    async fn find_all(&self, collection: &str) -> StorageResult<Vec<Document>>;
    async fn find_one(&self, collection: &str, filter: &Filter) -> StorageResult<Option<Document>>;
    async fn count(&self, collection: &str, filter: &Filter) -> StorageResult<u64>;

    /// First `limit` documents in insertion order
    async fn sample(&self, collection: &str, limit: usize) -> StorageResult<Vec<Document>>;

    /// Remove every document of a collection, returning how many were removed
    async fn clear(&self, collection: &str) -> StorageResult<u64>;

    /// Enforce uniqueness of `field` for current and future documents
    async fn ensure_unique_key(&self, collection: &str, field: &str) -> StorageResult<()>;
}
