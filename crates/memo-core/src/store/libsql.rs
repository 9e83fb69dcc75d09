//! libSQL-backed document store.
//!
//! Persists field bags as JSON rows in a single `documents` table and
//! replays the same push-based full-snapshot contract as the in-memory
//! backend. Rows whose field bag no longer parses are skipped with a
//! warning instead of poisoning the snapshot.

use std::path::Path;
use std::sync::Arc;

use libsql::{params, Builder, Connection};
use uuid::Uuid;

use super::{Document, DocumentStore, OrderBy, RawFields, Subscription, WatcherHub};
use crate::error::Result;

/// Durable implementation of [`DocumentStore`] on a local libSQL database.
#[derive(Clone)]
pub struct LibSqlStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    // Keeps the embedded database open for the lifetime of the store.
    _db: libsql::Database,
    conn: Connection,
    hub: WatcherHub,
}

impl LibSqlStore {
    /// Open a store at the given path, creating the file and parent
    /// directories if needed. Runs migrations automatically.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let path_str = path.to_string_lossy().to_string();
        let db = Builder::new_local(&path_str).build().await?;
        Self::from_database(db).await
    }

    /// Open an in-memory store (useful for testing)
    pub async fn open_in_memory() -> Result<Self> {
        let db = Builder::new_local(":memory:").build().await?;
        Self::from_database(db).await
    }

    async fn from_database(db: libsql::Database) -> Result<Self> {
        let conn = db.connect()?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS documents (
                path TEXT NOT NULL,
                id TEXT NOT NULL,
                fields TEXT NOT NULL,
                PRIMARY KEY (path, id)
            )",
            (),
        )
        .await?;

        Ok(Self {
            inner: Arc::new(StoreInner {
                _db: db,
                conn,
                hub: WatcherHub::default(),
            }),
        })
    }

    async fn collection_snapshot(&self, path: &str) -> Result<Vec<Document>> {
        let mut rows = self
            .inner
            .conn
            .query(
                "SELECT id, fields FROM documents WHERE path = ?",
                params![path],
            )
            .await?;

        let mut documents = Vec::new();
        while let Some(row) = rows.next().await? {
            let id: String = row.get(0)?;
            let raw: String = row.get(1)?;
            match serde_json::from_str::<RawFields>(&raw) {
                Ok(fields) => documents.push(Document { id, fields }),
                Err(error) => {
                    tracing::warn!("skipping document {id} with unparseable fields: {error}");
                }
            }
        }
        Ok(documents)
    }

    async fn document_snapshot(&self, path: &str, id: &str) -> Result<Option<Document>> {
        let mut rows = self
            .inner
            .conn
            .query(
                "SELECT fields FROM documents WHERE path = ? AND id = ? LIMIT 1",
                params![path, id],
            )
            .await?;

        let Some(row) = rows.next().await? else {
            return Ok(None);
        };
        let raw: String = row.get(0)?;
        let fields = serde_json::from_str::<RawFields>(&raw)?;
        Ok(Some(Document {
            id: id.to_string(),
            fields,
        }))
    }

    /// Notify every watcher touched by a change to `(path, id)`.
    async fn publish_change(&self, path: &str, id: &str) -> Result<()> {
        let snapshot = self.collection_snapshot(path).await?;
        let document = self.document_snapshot(path, id).await?;
        self.inner.hub.publish_collection(path, &snapshot);
        self.inner.hub.publish_document(path, id, document.as_ref());
        Ok(())
    }
}

impl DocumentStore for LibSqlStore {
    async fn subscribe_collection(
        &self,
        path: &str,
        order_by: OrderBy,
    ) -> Result<Subscription<Vec<Document>>> {
        let initial = self.collection_snapshot(path).await?;
        Ok(self.inner.hub.watch_collection(path, order_by, initial))
    }

    async fn subscribe_document(
        &self,
        path: &str,
        id: &str,
    ) -> Result<Subscription<Option<Document>>> {
        let initial = self.document_snapshot(path, id).await?;
        Ok(self.inner.hub.watch_document(path, id, initial))
    }

    async fn read_document(&self, path: &str, id: &str) -> Result<Option<Document>> {
        self.document_snapshot(path, id).await
    }

    async fn create_document(&self, path: &str, fields: RawFields) -> Result<String> {
        let id = Uuid::now_v7().to_string();
        let raw = serde_json::to_string(&fields)?;
        self.inner
            .conn
            .execute(
                "INSERT INTO documents (path, id, fields) VALUES (?, ?, ?)",
                params![path, id.as_str(), raw],
            )
            .await?;

        tracing::debug!("created document {id} in {path}");
        self.publish_change(path, &id).await?;
        Ok(id)
    }

    async fn overwrite_document(&self, path: &str, id: &str, fields: RawFields) -> Result<()> {
        let raw = serde_json::to_string(&fields)?;
        self.inner
            .conn
            .execute(
                "INSERT OR REPLACE INTO documents (path, id, fields) VALUES (?, ?, ?)",
                params![path, id, raw],
            )
            .await?;

        self.publish_change(path, id).await?;
        Ok(())
    }

    async fn delete_document(&self, path: &str, id: &str) -> Result<()> {
        self.inner
            .conn
            .execute(
                "DELETE FROM documents WHERE path = ? AND id = ?",
                params![path, id],
            )
            .await?;

        self.publish_change(path, id).await?;
        Ok(())
    }
}
