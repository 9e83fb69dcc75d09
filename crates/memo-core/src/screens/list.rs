//! List screen state

use super::Alert;
use crate::auth::AuthContext;
use crate::error::Result;
use crate::filter::{apply_filter, tag_universe, toggle_tag};
use crate::live::MemoListFeed;
use crate::models::Memo;
use crate::store::DocumentStore;

/// The memo list screen: live base snapshot, tag selection, and a
/// confirmation-gated delete.
///
/// The base snapshot only ever changes when the store pushes one; deletes
/// are not applied optimistically.
pub struct ListScreen<S> {
    store: S,
    auth: AuthContext,
    feed: MemoListFeed,
    memos: Vec<Memo>,
    selected_tags: Vec<String>,
    pending_delete: Option<String>,
    alerts: Vec<Alert>,
}

impl<S: DocumentStore> ListScreen<S> {
    /// Activate the screen: bind the live feed and adopt its first snapshot.
    pub async fn activate(store: S, auth: AuthContext) -> Result<Self> {
        let feed = MemoListFeed::open(&store, &auth).await?;
        let memos = feed.snapshot();
        Ok(Self {
            store,
            auth,
            feed,
            memos,
            selected_tags: Vec::new(),
            pending_delete: None,
            alerts: Vec::new(),
        })
    }

    /// Wait for the next pushed snapshot and adopt it wholesale.
    ///
    /// Returns `false` once the feed is closed (or was never bound).
    pub async fn next_change(&mut self) -> bool {
        match self.feed.changed().await {
            Some(memos) => {
                self.memos = memos;
                true
            }
            None => false,
        }
    }

    /// Memos matching the current tag selection, newest first.
    #[must_use]
    pub fn memos(&self) -> Vec<Memo> {
        apply_filter(&self.memos, &self.selected_tags)
    }

    /// The unfiltered base snapshot.
    #[must_use]
    pub fn all_memos(&self) -> &[Memo] {
        &self.memos
    }

    /// Distinct tags across the base snapshot, in first-seen order.
    #[must_use]
    pub fn tag_universe(&self) -> Vec<String> {
        tag_universe(&self.memos)
    }

    #[must_use]
    pub fn selected_tags(&self) -> &[String] {
        &self.selected_tags
    }

    /// Toggle a tag in the selection.
    pub fn toggle_tag(&mut self, tag: &str) {
        self.selected_tags = toggle_tag(&self.selected_tags, tag);
    }

    /// Arm deletion of a memo. Nothing is removed until confirmed.
    pub fn request_delete(&mut self, id: impl Into<String>) {
        self.pending_delete = Some(id.into());
    }

    /// Disarm a pending deletion.
    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    /// The memo id currently armed for deletion, if any.
    #[must_use]
    pub fn pending_delete(&self) -> Option<&str> {
        self.pending_delete.as_deref()
    }

    /// Execute the armed deletion.
    ///
    /// Silently skipped when no delete is pending or nobody is signed in.
    /// A store failure queues exactly one alert and leaves the snapshot
    /// untouched; a success is observed only through the next push.
    pub async fn confirm_delete(&mut self) {
        let Some(id) = self.pending_delete.take() else {
            return;
        };
        let Some(path) = self.auth.memos_path() else {
            tracing::debug!("delete skipped: no signed-in user");
            return;
        };

        if let Err(error) = self.store.delete_document(&path, &id).await {
            tracing::warn!("failed to delete memo {id}: {error}");
            self.alerts.push(Alert::DeleteFailed);
        }
    }

    /// Drain queued alerts.
    pub fn take_alerts(&mut self) -> Vec<Alert> {
        std::mem::take(&mut self.alerts)
    }

    /// Deactivate the screen, tearing down its subscription. Idempotent.
    pub fn deactivate(&self) {
        self.feed.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthUser;
    use crate::models::memo_fields;
    use crate::store::MemoryStore;
    use pretty_assertions::assert_eq;

    const PATH: &str = "users/u1/memos";

    fn auth() -> AuthContext {
        AuthContext::signed_in(AuthUser::new("u1"))
    }

    async fn seed(store: &MemoryStore, body: &str, tags: &[&str], updated_at: i64) -> String {
        let tags: Vec<String> = tags.iter().map(ToString::to_string).collect();
        store
            .create_document(PATH, memo_fields(body, &tags, updated_at))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn unauthenticated_activation_skips_subscription() {
        let store = MemoryStore::new();
        seed(&store, "hidden", &[], 1).await;

        let mut screen = ListScreen::activate(store, AuthContext::signed_out())
            .await
            .unwrap();
        assert!(screen.memos().is_empty());
        assert!(!screen.next_change().await);
    }

    #[tokio::test]
    async fn snapshot_is_replaced_on_each_push() {
        let store = MemoryStore::new();
        let mut screen = ListScreen::activate(store.clone(), auth()).await.unwrap();
        assert!(screen.memos().is_empty());

        seed(&store, "first", &[], 1).await;
        assert!(screen.next_change().await);
        assert_eq!(screen.memos().len(), 1);

        seed(&store, "second", &[], 2).await;
        assert!(screen.next_change().await);
        let memos = screen.memos();
        assert_eq!(memos.len(), 2);
        assert_eq!(memos[0].body_text, "second");
    }

    #[tokio::test]
    async fn tag_selection_filters_conjunctively() {
        let store = MemoryStore::new();
        seed(&store, "one", &["x", "y"], 2).await;
        seed(&store, "two", &["y"], 1).await;

        let mut screen = ListScreen::activate(store, auth()).await.unwrap();
        assert_eq!(screen.tag_universe(), vec!["x", "y"]);

        screen.toggle_tag("y");
        assert_eq!(screen.memos().len(), 2);

        screen.toggle_tag("x");
        let memos = screen.memos();
        assert_eq!(memos.len(), 1);
        assert_eq!(memos[0].body_text, "one");

        screen.toggle_tag("x");
        screen.toggle_tag("y");
        assert_eq!(screen.memos().len(), 2);
    }

    #[tokio::test]
    async fn confirmed_delete_is_observed_through_the_next_push() {
        let store = MemoryStore::new();
        let id = seed(&store, "doomed", &[], 1).await;

        let mut screen = ListScreen::activate(store, auth()).await.unwrap();
        screen.request_delete(&id);
        assert_eq!(screen.pending_delete(), Some(id.as_str()));

        screen.confirm_delete().await;
        assert!(screen.next_change().await);
        assert!(screen.memos().is_empty());
        assert!(screen.take_alerts().is_empty());
    }

    #[tokio::test]
    async fn cancelled_delete_touches_nothing() {
        let store = MemoryStore::new();
        let id = seed(&store, "safe", &[], 1).await;

        let mut screen = ListScreen::activate(store, auth()).await.unwrap();
        screen.request_delete(&id);
        screen.cancel_delete();
        screen.confirm_delete().await; // nothing pending, no-op

        assert_eq!(screen.memos().len(), 1);
        assert!(screen.take_alerts().is_empty());
    }

    #[tokio::test]
    async fn failed_delete_raises_one_alert_and_keeps_snapshot() {
        let store = MemoryStore::new();
        let id = seed(&store, "sturdy", &[], 1).await;

        let mut screen = ListScreen::activate(store.clone(), auth()).await.unwrap();
        store.fail_next_writes(1);
        screen.request_delete(&id);
        screen.confirm_delete().await;

        assert_eq!(screen.memos().len(), 1);
        assert_eq!(screen.take_alerts(), vec![Alert::DeleteFailed]);
        assert!(screen.take_alerts().is_empty()); // drained, not re-raised
        assert_eq!(screen.pending_delete(), None); // no retry scheduled
    }

    #[tokio::test]
    async fn delete_while_signed_out_is_skipped() {
        let store = MemoryStore::new();
        let id = seed(&store, "kept", &[], 1).await;

        let auth = auth();
        let mut screen = ListScreen::activate(store.clone(), auth.clone()).await.unwrap();
        screen.request_delete(&id);
        auth.sign_out();
        screen.confirm_delete().await;

        assert!(store.read_document(PATH, &id).await.unwrap().is_some());
        assert!(screen.take_alerts().is_empty());
    }

    #[tokio::test]
    async fn deactivate_is_idempotent() {
        let store = MemoryStore::new();
        let mut screen = ListScreen::activate(store, auth()).await.unwrap();

        screen.deactivate();
        screen.deactivate();
        assert!(!screen.next_change().await);
    }
}
