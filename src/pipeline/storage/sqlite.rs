use super::traits::{DocumentStore, InsertReport};
use super::{matches, unique_value, Document, Filter, StorageResult};
use crate::error::StorageError;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

const SCHEMA: &str = r#"
    PRAGMA journal_mode=WAL;
    CREATE TABLE IF NOT EXISTS documents (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        collection  TEXT NOT NULL,
        body        TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents (collection);
    CREATE TABLE IF NOT EXISTS unique_keys (
        collection  TEXT NOT NULL,
        field       TEXT NOT NULL,
        PRIMARY KEY (collection, field)
    );
    CREATE TABLE IF NOT EXISTS unique_values (
        collection  TEXT NOT NULL,
        field       TEXT NOT NULL,
        value       TEXT NOT NULL,
        document_id INTEGER NOT NULL,
        PRIMARY KEY (collection, field, value)
    );
"#;

/// SQLite-backed document store: JSON bodies grouped by collection
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").field("conn", &"<Connection>").finish()
    }
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StorageError::Unavailable(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }
        let conn = Connection::open(path)
            .map_err(|e| StorageError::Unavailable(format!("cannot open {}: {}", path.display(), e)))?;
        conn.execute_batch(SCHEMA)?;
        info!("Opened SQLite document store at {}", path.display());
        Ok(Self { conn: Mutex::new(conn) })
    }

    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::Backend {
            message: "SQLite connection lock poisoned".to_string(),
        })
    }

    fn unique_fields(conn: &Connection, collection: &str) -> StorageResult<Vec<String>> {
        let mut stmt = conn.prepare("SELECT field FROM unique_keys WHERE collection = ?1 ORDER BY field")?;
        let fields = stmt
            .query_map(params![collection], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(fields)
    }

    fn load(conn: &Connection, collection: &str, limit: Option<usize>) -> StorageResult<Vec<(i64, Document)>> {
        let limit = limit.map(|l| l as i64).unwrap_or(-1);
        let mut stmt = conn.prepare("SELECT id, body FROM documents WHERE collection = ?1 ORDER BY id LIMIT ?2")?;
        let rows = stmt
            .query_map(params![collection, limit], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, body)| Ok((id, serde_json::from_str::<Document>(&body)?)))
            .collect()
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn ping(&self) -> StorageResult<()> {
        let conn = self.lock()?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        Ok(())
    }

    async fn insert_batch(&self, collection: &str, documents: Vec<Document>) -> StorageResult<InsertReport> {
        let mut conn = self.lock()?;
        let unique_fields = Self::unique_fields(&conn, collection)?;
        let tx = conn.transaction()?;
        let mut report = InsertReport::default();

        'documents: for document in documents {
            let mut keys = Vec::with_capacity(unique_fields.len());
            for field in &unique_fields {
                let Some(value) = unique_value(&document, field) else {
                    report.failed += 1;
                    report.errors.push(format!("missing unique field {}", field));
                    continue 'documents;
                };
                let taken: Option<i64> = tx
                    .query_row(
                        "SELECT document_id FROM unique_values WHERE collection = ?1 AND field = ?2 AND value = ?3",
                        params![collection, field, value],
                        |row| row.get(0),
                    )
                    .optional()?;
                if taken.is_some() {
                    report.failed += 1;
                    report.errors.push(format!("duplicate {} {}", field, value));
                    continue 'documents;
                }
                keys.push((field, value));
            }

            let body = serde_json::to_string(&document)?;
            tx.execute(
                "INSERT INTO documents (collection, body) VALUES (?1, ?2)",
                params![collection, body],
            )?;
            let id = tx.last_insert_rowid();
            for (field, value) in keys {
                tx.execute(
                    "INSERT INTO unique_values (collection, field, value, document_id) VALUES (?1, ?2, ?3, ?4)",
                    params![collection, field, value, id],
                )?;
            }
            report.inserted += 1;
        }

        tx.commit()?;
        debug!(
            "Inserted {} documents into {} ({} failed)",
            report.inserted, collection, report.failed
        );
        Ok(report)
    }

    async fn find_all(&self, collection: &str) -> StorageResult<Vec<Document>> {
        let conn = self.lock()?;
        Ok(Self::load(&conn, collection, None)?
            .into_iter()
            .map(|(_, doc)| doc)
            .collect())
    }

    async fn find_one(&self, collection: &str, filter: &Filter) -> StorageResult<Option<Document>> {
        let conn = self.lock()?;
        Ok(Self::load(&conn, collection, None)?
            .into_iter()
            .map(|(_, doc)| doc)
            .find(|doc| matches(doc, filter)))
    }

    async fn count(&self, collection: &str, filter: &Filter) -> StorageResult<u64> {
        let conn = self.lock()?;
        if filter.is_empty() {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM documents WHERE collection = ?1",
                params![collection],
                |row| row.get(0),
            )?;
            return Ok(n as u64);
        }
        Ok(Self::load(&conn, collection, None)?
            .iter()
            .filter(|(_, doc)| matches(doc, filter))
            .count() as u64)
    }

    async fn sample(&self, collection: &str, limit: usize) -> StorageResult<Vec<Document>> {
        let conn = self.lock()?;
        Ok(Self::load(&conn, collection, Some(limit))?
            .into_iter()
            .map(|(_, doc)| doc)
            .collect())
    }

    async fn clear(&self, collection: &str) -> StorageResult<u64> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let removed = tx.execute("DELETE FROM documents WHERE collection = ?1", params![collection])?;
        tx.execute("DELETE FROM unique_values WHERE collection = ?1", params![collection])?;
        tx.commit()?;
        debug!("Cleared {} documents from {}", removed, collection);
        Ok(removed as u64)
    }

    async fn ensure_unique_key(&self, collection: &str, field: &str) -> StorageResult<()> {
        let mut conn = self.lock()?;
        let existing = Self::load(&conn, collection, None)?;
        let tx = conn.transaction()?;
        let added = tx.execute(
            "INSERT OR IGNORE INTO unique_keys (collection, field) VALUES (?1, ?2)",
            params![collection, field],
        )?;
        if added == 0 {
            return Ok(());
        }

        for (id, document) in existing {
            let value = unique_value(&document, field).ok_or_else(|| StorageError::Backend {
                message: format!("document in {} lacks unique field {}", collection, field),
            })?;
            tx.execute(
                "INSERT INTO unique_values (collection, field, value, document_id) VALUES (?1, ?2, ?3, ?4)",
                params![collection, field, value, id],
            )
            .map_err(|_| StorageError::Backend {
                message: format!("existing duplicate {} {} in {}", field, value, collection),
            })?;
        }
        tx.commit()?;
        Ok(())
    }
}
