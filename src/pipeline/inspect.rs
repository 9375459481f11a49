use serde::Serialize;
use std::collections::BTreeSet;

use crate::constants::pipeline_collections;
use crate::pipeline::storage::{Document, DocumentStore, Filter, StorageResult};

/// Documents sampled to discover a collection's columns
pub const COLUMN_SAMPLE_SIZE: usize = 10;

/// Internal identifier some backends add to documents
const ID_FIELD: &str = "_id";

#[derive(Debug, Clone, Serialize)]
pub struct CollectionStats {
    pub collection: String,
    pub documents: u64,
    /// Distinct field names across the sampled documents
    pub columns: Vec<String>,
    /// First document, when the collection is not empty
    pub sample: Option<Document>,
}

impl CollectionStats {
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }
}

pub async fn inspect_collection(store: &dyn DocumentStore, collection: &str) -> StorageResult<CollectionStats> {
    let documents = store.count(collection, &Filter::new()).await?;
    let samples = store.sample(collection, COLUMN_SAMPLE_SIZE).await?;

    let columns: BTreeSet<String> = samples
        .iter()
        .flat_map(|doc| doc.keys())
        .filter(|key| key.as_str() != ID_FIELD)
        .cloned()
        .collect();

    Ok(CollectionStats {
        collection: collection.to_string(),
        documents,
        columns: columns.into_iter().collect(),
        sample: samples.into_iter().next(),
    })
}

/// Stats for the raw, clean and aggregated collections, in pipeline order
pub async fn inspect_pipeline(store: &dyn DocumentStore) -> StorageResult<Vec<CollectionStats>> {
    let mut stats = Vec::new();
    for collection in pipeline_collections() {
        stats.push(inspect_collection(store, collection).await?);
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::RAW_COLLECTION;
    use crate::pipeline::storage::{to_document, InMemoryStore};
    use serde_json::json;

    #[tokio::test]
    async fn test_counts_columns_without_internal_id() {
        let store = InMemoryStore::new();
        let docs = vec![
            to_document(&json!({"_id": 1, "name": "A", "sector": "Fintech"})).unwrap(),
            to_document(&json!({"_id": 2, "name": "B", "city": "Paris"})).unwrap(),
        ];
        store.insert_batch(RAW_COLLECTION, docs).await.unwrap();

        let stats = inspect_collection(&store, RAW_COLLECTION).await.unwrap();
        assert_eq!(stats.documents, 2);
        assert_eq!(stats.columns, vec!["city", "name", "sector"]);
        assert_eq!(stats.column_count(), 3);
        assert!(stats.sample.is_some());
    }

    #[tokio::test]
    async fn test_empty_pipeline() {
        let store = InMemoryStore::new();
        let stats = inspect_pipeline(&store).await.unwrap();
        assert_eq!(stats.len(), 3);
        assert!(stats.iter().all(|s| s.documents == 0 && s.columns.is_empty() && s.sample.is_none()));
    }
}
