//! In-memory document store backend.
//!
//! Backs tests and offline use with the same contract as the remote store:
//! push-based full-snapshot subscriptions, store-assigned ids, schemaless
//! field bags. Write failures can be injected to exercise error handling
//! without a network.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use super::{lock, Document, DocumentStore, OrderBy, RawFields, Subscription, WatcherHub};
use crate::error::{Error, Result};

/// In-process implementation of [`DocumentStore`].
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    collections: Mutex<HashMap<String, BTreeMap<String, RawFields>>>,
    hub: WatcherHub,
    failing_writes: AtomicU32,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` write calls fail with a store error.
    ///
    /// Lets callers exercise write-failure handling without a network.
    pub fn fail_next_writes(&self, count: u32) {
        self.inner.failing_writes.store(count, Ordering::SeqCst);
    }

    fn take_write_failure(&self) -> Result<()> {
        let armed = self
            .inner
            .failing_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if armed {
            Err(Error::Store("write rejected".to_string()))
        } else {
            Ok(())
        }
    }

    fn collection_snapshot(&self, path: &str) -> Vec<Document> {
        lock(&self.inner.collections)
            .get(path)
            .map(|documents| {
                documents
                    .iter()
                    .map(|(id, fields)| Document {
                        id: id.clone(),
                        fields: fields.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn document_snapshot(&self, path: &str, id: &str) -> Option<Document> {
        lock(&self.inner.collections)
            .get(path)
            .and_then(|documents| documents.get(id))
            .map(|fields| Document {
                id: id.to_string(),
                fields: fields.clone(),
            })
    }

    /// Notify every watcher touched by a change to `(path, id)`.
    fn publish_change(&self, path: &str, id: &str) {
        let snapshot = self.collection_snapshot(path);
        let document = self.document_snapshot(path, id);
        self.inner.hub.publish_collection(path, &snapshot);
        self.inner.hub.publish_document(path, id, document.as_ref());
    }
}

impl DocumentStore for MemoryStore {
    async fn subscribe_collection(
        &self,
        path: &str,
        order_by: OrderBy,
    ) -> Result<Subscription<Vec<Document>>> {
        let initial = self.collection_snapshot(path);
        Ok(self.inner.hub.watch_collection(path, order_by, initial))
    }

    async fn subscribe_document(
        &self,
        path: &str,
        id: &str,
    ) -> Result<Subscription<Option<Document>>> {
        let initial = self.document_snapshot(path, id);
        Ok(self.inner.hub.watch_document(path, id, initial))
    }

    async fn read_document(&self, path: &str, id: &str) -> Result<Option<Document>> {
        Ok(self.document_snapshot(path, id))
    }

    async fn create_document(&self, path: &str, fields: RawFields) -> Result<String> {
        self.take_write_failure()?;

        let id = Uuid::now_v7().to_string();
        lock(&self.inner.collections)
            .entry(path.to_string())
            .or_default()
            .insert(id.clone(), fields);

        tracing::debug!("created document {id} in {path}");
        self.publish_change(path, &id);
        Ok(id)
    }

    async fn overwrite_document(&self, path: &str, id: &str, fields: RawFields) -> Result<()> {
        self.take_write_failure()?;

        lock(&self.inner.collections)
            .entry(path.to_string())
            .or_default()
            .insert(id.to_string(), fields);

        self.publish_change(path, id);
        Ok(())
    }

    async fn delete_document(&self, path: &str, id: &str) -> Result<()> {
        self.take_write_failure()?;

        if let Some(documents) = lock(&self.inner.collections).get_mut(path) {
            documents.remove(id);
        }

        self.publish_change(path, id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const PATH: &str = "users/u1/memos";

    fn fields(body: &str, updated_at: i64) -> RawFields {
        let mut fields = RawFields::new();
        fields.insert("bodyText".to_string(), json!(body));
        fields.insert("updatedAt".to_string(), json!(updated_at));
        fields
    }

    #[tokio::test]
    async fn create_assigns_unique_ids() {
        let store = MemoryStore::new();
        let first = store.create_document(PATH, fields("a", 1)).await.unwrap();
        let second = store.create_document(PATH, fields("b", 2)).await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn collection_subscription_sees_each_mutation() {
        let store = MemoryStore::new();
        let subscription = store
            .subscribe_collection(PATH, OrderBy::descending("updatedAt"))
            .await
            .unwrap();
        assert!(subscription.current().is_empty());

        let id = store.create_document(PATH, fields("a", 1)).await.unwrap();
        assert_eq!(subscription.current().len(), 1);

        store
            .overwrite_document(PATH, &id, fields("a2", 5))
            .await
            .unwrap();
        let snapshot = subscription.current();
        assert_eq!(snapshot[0].fields.get("bodyText"), Some(&json!("a2")));

        store.delete_document(PATH, &id).await.unwrap();
        assert!(subscription.current().is_empty());
    }

    #[tokio::test]
    async fn collection_subscription_orders_newest_first() {
        let store = MemoryStore::new();
        store.create_document(PATH, fields("old", 1)).await.unwrap();
        store.create_document(PATH, fields("new", 9)).await.unwrap();
        store.create_document(PATH, fields("mid", 5)).await.unwrap();

        let subscription = store
            .subscribe_collection(PATH, OrderBy::descending("updatedAt"))
            .await
            .unwrap();
        let bodies: Vec<_> = subscription
            .current()
            .iter()
            .map(|doc| doc.fields.get("bodyText").cloned())
            .collect();
        assert_eq!(bodies, vec![Some(json!("new")), Some(json!("mid")), Some(json!("old"))]);
    }

    #[tokio::test]
    async fn document_subscription_resolves_missing_target_to_no_data() {
        let store = MemoryStore::new();
        let subscription = store.subscribe_document(PATH, "ghost").await.unwrap();
        assert_eq!(subscription.current(), None);
    }

    #[tokio::test]
    async fn document_subscription_sees_delete_as_no_data() {
        let store = MemoryStore::new();
        let id = store.create_document(PATH, fields("a", 1)).await.unwrap();

        let subscription = store.subscribe_document(PATH, &id).await.unwrap();
        assert!(subscription.current().is_some());

        store.delete_document(PATH, &id).await.unwrap();
        assert_eq!(subscription.current(), None);
    }

    #[tokio::test]
    async fn injected_write_failures_reject_then_recover() {
        let store = MemoryStore::new();
        store.fail_next_writes(1);

        let rejected = store.create_document(PATH, fields("a", 1)).await;
        assert!(rejected.is_err());

        let accepted = store.create_document(PATH, fields("a", 1)).await;
        assert!(accepted.is_ok());
    }

    #[tokio::test]
    async fn failed_write_leaves_snapshot_unchanged() {
        let store = MemoryStore::new();
        let id = store.create_document(PATH, fields("a", 1)).await.unwrap();

        store.fail_next_writes(1);
        assert!(store.delete_document(PATH, &id).await.is_err());
        assert!(store.read_document(PATH, &id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn delete_of_missing_document_is_not_an_error() {
        let store = MemoryStore::new();
        assert!(store.delete_document(PATH, "ghost").await.is_ok());
    }
}
