use super::traits::{DocumentStore, InsertReport};
use super::{matches, unique_value, Document, Filter, StorageResult};
use crate::error::StorageError;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

#[derive(Debug, Default)]
struct Collection {
    documents: Vec<Document>,
    /// Unique field name -> index of values already stored
    unique: HashMap<String, HashSet<String>>,
}

/// In-memory storage implementation for development/testing
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    collections: Arc<Mutex<HashMap<String, Collection>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, HashMap<String, Collection>>> {
        self.collections.lock().map_err(|_| StorageError::Backend {
            message: "in-memory store lock poisoned".to_string(),
        })
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> StorageResult<()> {
        self.lock().map(|_| ())
    }

    async fn insert_batch(&self, collection: &str, documents: Vec<Document>) -> StorageResult<InsertReport> {
        let mut collections = self.lock()?;
        let target = collections.entry(collection.to_string()).or_default();
        let mut report = InsertReport::default();

        'documents: for document in documents {
            // Check every unique key before touching any index
            let mut keys = Vec::with_capacity(target.unique.len());
            for (field, index) in &target.unique {
                match unique_value(&document, field) {
                    Some(value) if index.contains(&value) => {
                        report.failed += 1;
                        report.errors.push(format!("duplicate {} {}", field, value));
                        continue 'documents;
                    }
                    Some(value) => keys.push((field.clone(), value)),
                    None => {
                        report.failed += 1;
                        report.errors.push(format!("missing unique field {}", field));
                        continue 'documents;
                    }
                }
            }
            for (field, value) in keys {
                if let Some(index) = target.unique.get_mut(&field) {
                    index.insert(value);
                }
            }
            target.documents.push(document);
            report.inserted += 1;
        }

        debug!(
            "Inserted {} documents into {} ({} failed)",
            report.inserted, collection, report.failed
        );
        Ok(report)
    }

    async fn find_all(&self, collection: &str) -> StorageResult<Vec<Document>> {
        let collections = self.lock()?;
        Ok(collections
            .get(collection)
            .map(|c| c.documents.clone())
            .unwrap_or_default())
    }

    async fn find_one(&self, collection: &str, filter: &Filter) -> StorageResult<Option<Document>> {
        let collections = self.lock()?;
        Ok(collections
            .get(collection)
            .and_then(|c| c.documents.iter().find(|d| matches(d, filter)).cloned()))
    }

    async fn count(&self, collection: &str, filter: &Filter) -> StorageResult<u64> {
        let collections = self.lock()?;
        Ok(collections
            .get(collection)
            .map(|c| c.documents.iter().filter(|d| matches(d, filter)).count() as u64)
            .unwrap_or(0))
    }

    async fn sample(&self, collection: &str, limit: usize) -> StorageResult<Vec<Document>> {
        let collections = self.lock()?;
        Ok(collections
            .get(collection)
            .map(|c| c.documents.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn clear(&self, collection: &str) -> StorageResult<u64> {
        let mut collections = self.lock()?;
        let Some(target) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let removed = target.documents.len() as u64;
        target.documents.clear();
        for index in target.unique.values_mut() {
            index.clear();
        }
        debug!("Cleared {} documents from {}", removed, collection);
        Ok(removed)
    }

    async fn ensure_unique_key(&self, collection: &str, field: &str) -> StorageResult<()> {
        let mut collections = self.lock()?;
        let target = collections.entry(collection.to_string()).or_default();
        if target.unique.contains_key(field) {
            return Ok(());
        }

        let mut index = HashSet::with_capacity(target.documents.len());
        for document in &target.documents {
            let value = unique_value(document, field).ok_or_else(|| StorageError::Backend {
                message: format!("document in {} lacks unique field {}", collection, field),
            })?;
            if !index.insert(value.clone()) {
                return Err(StorageError::Backend {
                    message: format!("existing duplicate {} {} in {}", field, value, collection),
                });
            }
        }
        target.unique.insert(field.to_string(), index);
        Ok(())
    }
}
