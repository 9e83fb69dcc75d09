//! Detail screen state

use crate::auth::AuthContext;
use crate::error::Result;
use crate::live::MemoDocFeed;
use crate::models::Memo;
use crate::store::DocumentStore;

/// Display-ready projection of the detail screen.
///
/// All fields are empty in the "no data" state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MemoDisplay {
    pub title: String,
    pub date: String,
    pub body: String,
    pub tags: Vec<String>,
}

const TITLE_PREVIEW_LEN: usize = 80;

/// The memo detail screen: a live view of a single document.
pub struct DetailScreen {
    feed: MemoDocFeed,
    memo: Option<Memo>,
}

impl DetailScreen {
    /// Activate the screen: bind the document feed and adopt its first state.
    pub async fn activate<S: DocumentStore>(
        store: &S,
        auth: &AuthContext,
        id: &str,
    ) -> Result<Self> {
        let feed = MemoDocFeed::open(store, auth, id).await?;
        let memo = feed.snapshot();
        Ok(Self { feed, memo })
    }

    /// Wait for the next pushed document state and adopt it.
    ///
    /// Returns `false` once the feed is closed (or was never bound).
    pub async fn next_change(&mut self) -> bool {
        match self.feed.changed().await {
            Some(memo) => {
                self.memo = memo;
                true
            }
            None => false,
        }
    }

    /// The current memo, or `None` when the document has no data.
    #[must_use]
    pub fn memo(&self) -> Option<&Memo> {
        self.memo.as_ref()
    }

    /// Display state for rendering; empty title and date without data.
    #[must_use]
    pub fn display(&self) -> MemoDisplay {
        self.memo.as_ref().map_or_else(MemoDisplay::default, |memo| {
            MemoDisplay {
                title: memo.title_preview(TITLE_PREVIEW_LEN),
                date: memo.updated_at_display(),
                body: memo.body_text.clone(),
                tags: memo.tags.clone(),
            }
        })
    }

    /// Deactivate the screen, tearing down its subscription. Idempotent.
    pub fn deactivate(&self) {
        self.feed.close();
    }
}
