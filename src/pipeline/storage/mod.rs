//! Document storage: the collaborator every pipeline stage reads from and writes to.

pub mod batch;
pub mod in_memory;
pub mod sqlite;
pub mod traits;

pub use batch::{insert_documents, InsertSummary};
pub use in_memory::InMemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{DocumentStore, InsertReport};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::StorageError;

/// A stored document: a JSON object
pub type Document = Map<String, Value>;

/// Field-equality filter; an empty filter matches every document
pub type Filter = Map<String, Value>;

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Build a single-field equality filter
pub fn filter_eq(field: &str, value: impl Into<Value>) -> Filter {
    let mut filter = Filter::new();
    filter.insert(field.to_string(), value.into());
    filter
}

/// Whether `document` satisfies every condition of `filter`.
///
/// A `null` condition also matches a document that lacks the field.
pub fn matches(document: &Document, filter: &Filter) -> bool {
    filter.iter().all(|(field, expected)| match document.get(field) {
        Some(actual) => actual == expected,
        None => expected.is_null(),
    })
}

pub fn to_document<T: Serialize>(value: &T) -> StorageResult<Document> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(StorageError::Backend {
            message: format!("expected a JSON object, got {}", other),
        }),
    }
}

pub fn from_document<T: DeserializeOwned>(document: Document) -> StorageResult<T> {
    Ok(serde_json::from_value(Value::Object(document))?)
}

/// Serialize the value of a unique-key field into its index form
pub(crate) fn unique_value(document: &Document, field: &str) -> Option<String> {
    document
        .get(field)
        .filter(|v| !v.is_null())
        .map(|v| v.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_matches_field_equality() {
        let doc = to_document(&json!({"sector": "Fintech", "total": 3})).unwrap();
        assert!(matches(&doc, &Filter::new()));
        assert!(matches(&doc, &filter_eq("sector", "Fintech")));
        assert!(!matches(&doc, &filter_eq("sector", "Edtech")));
        assert!(matches(&doc, &filter_eq("country", Value::Null)));
        assert!(!matches(&doc, &filter_eq("total", "3")));
    }

    #[test]
    fn test_to_document_rejects_non_objects() {
        assert!(to_document(&json!([1, 2])).is_err());
    }
}
