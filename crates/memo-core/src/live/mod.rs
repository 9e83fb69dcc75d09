//! Live query binders.
//!
//! Bind a store subscription to projected view state for the lifetime of a
//! screen. Each push replaces the previous snapshot wholesale; nothing here
//! applies diffs or merges partial state.
//!
//! Opening a feed re-checks the auth context at that moment. Without a
//! signed-in user no subscription is established and the feed stays empty,
//! which is a guarded no-op rather than an error.

use crate::auth::AuthContext;
use crate::error::Result;
use crate::models::{Memo, FIELD_UPDATED_AT};
use crate::store::{Document, DocumentStore, OrderBy, Subscription};

/// Live, projected view of the current user's memo collection,
/// newest first.
pub struct MemoListFeed {
    subscription: Option<Subscription<Vec<Document>>>,
}

impl MemoListFeed {
    /// Open the feed for the current user.
    pub async fn open<S: DocumentStore>(store: &S, auth: &AuthContext) -> Result<Self> {
        let Some(path) = auth.memos_path() else {
            tracing::debug!("memo list feed opened without a signed-in user");
            return Ok(Self { subscription: None });
        };

        let subscription = store
            .subscribe_collection(&path, OrderBy::descending(FIELD_UPDATED_AT))
            .await?;
        Ok(Self {
            subscription: Some(subscription),
        })
    }

    /// Whether a subscription is actually held.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.subscription.is_some()
    }

    /// Latest projected snapshot; not-yet-visible records are dropped.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Memo> {
        self.subscription
            .as_ref()
            .map(|subscription| project_documents(&subscription.current()))
            .unwrap_or_default()
    }

    /// Wait for the next snapshot.
    ///
    /// Resolves to `None` once the feed is closed, or immediately when it
    /// was never bound.
    pub async fn changed(&mut self) -> Option<Vec<Memo>> {
        let subscription = self.subscription.as_mut()?;
        let documents = subscription.changed().await?;
        Some(project_documents(&documents))
    }

    /// Tear down the underlying subscription. Safe to call repeatedly.
    pub fn close(&self) {
        if let Some(subscription) = &self.subscription {
            subscription.cancel();
        }
    }
}

/// Live, projected view of a single memo document.
pub struct MemoDocFeed {
    subscription: Option<Subscription<Option<Document>>>,
}

impl MemoDocFeed {
    /// Open the feed for one of the current user's memos.
    ///
    /// A deleted or never-existing target resolves to a "no data" snapshot,
    /// never an error.
    pub async fn open<S: DocumentStore>(store: &S, auth: &AuthContext, id: &str) -> Result<Self> {
        let Some(path) = auth.memos_path() else {
            tracing::debug!("memo doc feed opened without a signed-in user");
            return Ok(Self { subscription: None });
        };

        let subscription = store.subscribe_document(&path, id).await?;
        Ok(Self {
            subscription: Some(subscription),
        })
    }

    /// Whether a subscription is actually held.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.subscription.is_some()
    }

    /// Latest projected document, or `None` when there is no data.
    #[must_use]
    pub fn snapshot(&self) -> Option<Memo> {
        self.subscription
            .as_ref()
            .and_then(|subscription| subscription.current())
            .map(project_document)
    }

    /// Wait for the next document state; the inner `None` means "no data".
    pub async fn changed(&mut self) -> Option<Option<Memo>> {
        let subscription = self.subscription.as_mut()?;
        let document = subscription.changed().await?;
        Some(document.map(project_document))
    }

    /// Tear down the underlying subscription. Safe to call repeatedly.
    pub fn close(&self) {
        if let Some(subscription) = &self.subscription {
            subscription.cancel();
        }
    }
}

fn project_documents(documents: &[Document]) -> Vec<Memo> {
    documents
        .iter()
        .map(|document| Memo::project(document.id.as_str(), &document.fields))
        .filter(Memo::is_visible)
        .collect()
}

fn project_document(document: Document) -> Memo {
    Memo::project(document.id.as_str(), &document.fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthUser;
    use crate::models::memo_fields;
    use crate::store::MemoryStore;
    use pretty_assertions::assert_eq;

    fn auth() -> AuthContext {
        AuthContext::signed_in(AuthUser::new("u1"))
    }

    async fn seed(store: &MemoryStore, body: &str, updated_at: i64) -> String {
        store
            .create_document("users/u1/memos", memo_fields(body, &[], updated_at))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn unauthenticated_list_feed_stays_empty() {
        let store = MemoryStore::new();
        seed(&store, "invisible", 1).await;

        let mut feed = MemoListFeed::open(&store, &AuthContext::signed_out())
            .await
            .unwrap();
        assert!(!feed.is_live());
        assert!(feed.snapshot().is_empty());
        assert_eq!(feed.changed().await, None);
    }

    #[tokio::test]
    async fn list_feed_projects_and_orders_snapshots() {
        let store = MemoryStore::new();
        seed(&store, "old", 1).await;
        seed(&store, "new", 9).await;

        let feed = MemoListFeed::open(&store, &auth()).await.unwrap();
        let snapshot = feed.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].body_text, "new");
        assert_eq!(snapshot[1].body_text, "old");
    }

    #[tokio::test]
    async fn list_feed_drops_records_without_timestamp() {
        let store = MemoryStore::new();
        seed(&store, "visible", 1).await;
        store
            .create_document("users/u1/memos", crate::store::RawFields::new())
            .await
            .unwrap();

        let feed = MemoListFeed::open(&store, &auth()).await.unwrap();
        let snapshot = feed.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].body_text, "visible");
    }

    #[tokio::test]
    async fn list_feed_observes_later_mutations() {
        let store = MemoryStore::new();
        let mut feed = MemoListFeed::open(&store, &auth()).await.unwrap();

        seed(&store, "first", 1).await;
        let snapshot = feed.changed().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].body_text, "first");
    }

    #[tokio::test]
    async fn closed_list_feed_stops_emitting() {
        let store = MemoryStore::new();
        let mut feed = MemoListFeed::open(&store, &auth()).await.unwrap();

        feed.close();
        feed.close(); // duplicate teardown is a no-op
        assert_eq!(feed.changed().await, None);
    }

    #[tokio::test]
    async fn doc_feed_resolves_missing_target_to_no_data() {
        let store = MemoryStore::new();
        let feed = MemoDocFeed::open(&store, &auth(), "ghost").await.unwrap();
        assert!(feed.is_live());
        assert_eq!(feed.snapshot(), None);
    }

    #[tokio::test]
    async fn doc_feed_tracks_overwrite_and_delete() {
        let store = MemoryStore::new();
        let id = seed(&store, "before", 1).await;

        let mut feed = MemoDocFeed::open(&store, &auth(), &id).await.unwrap();
        assert_eq!(feed.snapshot().unwrap().body_text, "before");

        store
            .overwrite_document("users/u1/memos", &id, memo_fields("after", &[], 2))
            .await
            .unwrap();
        let next = feed.changed().await.unwrap();
        assert_eq!(next.unwrap().body_text, "after");

        store.delete_document("users/u1/memos", &id).await.unwrap();
        let next = feed.changed().await.unwrap();
        assert_eq!(next, None);
    }

    #[tokio::test]
    async fn unauthenticated_doc_feed_stays_empty() {
        let store = MemoryStore::new();
        let mut feed = MemoDocFeed::open(&store, &AuthContext::signed_out(), "m1")
            .await
            .unwrap();
        assert!(!feed.is_live());
        assert_eq!(feed.snapshot(), None);
        assert_eq!(feed.changed().await, None);
    }
}
