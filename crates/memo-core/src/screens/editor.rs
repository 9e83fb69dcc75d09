//! Editor screen state (create and edit)

use super::Alert;
use crate::auth::AuthContext;
use crate::error::Result;
use crate::models::{memo_fields, Memo};
use crate::store::DocumentStore;
use crate::util::{normalize_tag, unix_timestamp_ms};

/// Outcome of a save attempt, used for navigation and alerting only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The write was accepted; `id` names the saved document
    Saved { id: String },
    /// The store rejected the write; one alert was queued, draft kept
    Failed,
    /// Nobody was signed in; the write was skipped silently
    SkippedUnauthenticated,
}

enum Mode {
    Create,
    Edit { id: String },
}

/// The memo editor screen: drafts a body and tag set, then saves the whole
/// draft as a single full overwrite stamped with the current time.
pub struct EditorScreen {
    mode: Mode,
    body_text: String,
    tags: Vec<String>,
    tag_input: String,
    alerts: Vec<Alert>,
}

impl EditorScreen {
    /// Start a blank draft for a new memo.
    #[must_use]
    pub fn create() -> Self {
        Self {
            mode: Mode::Create,
            body_text: String::new(),
            tags: Vec::new(),
            tag_input: String::new(),
            alerts: Vec::new(),
        }
    }

    /// Start an edit draft for an existing memo, prefilled from the store.
    ///
    /// A missing document or signed-out user yields an empty draft rather
    /// than an error.
    pub async fn edit<S: DocumentStore>(
        store: &S,
        auth: &AuthContext,
        id: impl Into<String>,
    ) -> Result<Self> {
        let id = id.into();
        let mut screen = Self {
            mode: Mode::Edit { id: id.clone() },
            body_text: String::new(),
            tags: Vec::new(),
            tag_input: String::new(),
            alerts: Vec::new(),
        };

        let Some(path) = auth.memos_path() else {
            return Ok(screen);
        };
        if let Some(document) = store.read_document(&path, &id).await? {
            let memo = Memo::project(document.id.as_str(), &document.fields);
            screen.body_text = memo.body_text;
            screen.tags = memo.tags;
        }
        Ok(screen)
    }

    #[must_use]
    pub fn body_text(&self) -> &str {
        &self.body_text
    }

    pub fn set_body_text(&mut self, text: impl Into<String>) {
        self.body_text = text.into();
    }

    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    #[must_use]
    pub fn tag_input(&self) -> &str {
        &self.tag_input
    }

    pub fn set_tag_input(&mut self, input: impl Into<String>) {
        self.tag_input = input.into();
    }

    /// Commit the tag input to the draft's tag list.
    ///
    /// The input is trimmed; empty and duplicate entries are dropped. The
    /// input field is cleared either way.
    pub fn add_tag(&mut self) {
        if let Some(tag) = normalize_tag(&self.tag_input) {
            if !self.tags.contains(&tag) {
                self.tags.push(tag);
            }
        }
        self.tag_input.clear();
    }

    /// Remove a tag from the draft.
    pub fn remove_tag(&mut self, tag: &str) {
        self.tags.retain(|existing| existing != tag);
    }

    /// Persist the draft: a create or a full overwrite with a fresh
    /// timestamp.
    ///
    /// Never retried automatically; a rejected write queues one alert and
    /// keeps the draft intact so the user can save again.
    pub async fn save<S: DocumentStore>(&mut self, store: &S, auth: &AuthContext) -> SaveOutcome {
        let Some(path) = auth.memos_path() else {
            tracing::debug!("save skipped: no signed-in user");
            return SaveOutcome::SkippedUnauthenticated;
        };

        let fields = memo_fields(&self.body_text, &self.tags, unix_timestamp_ms());
        let result = match &self.mode {
            Mode::Create => store.create_document(&path, fields).await,
            Mode::Edit { id } => store
                .overwrite_document(&path, id, fields)
                .await
                .map(|()| id.clone()),
        };

        match result {
            Ok(id) => SaveOutcome::Saved { id },
            Err(error) => {
                tracing::warn!("failed to save memo: {error}");
                self.alerts.push(Alert::SaveFailed);
                SaveOutcome::Failed
            }
        }
    }

    /// Drain queued alerts.
    pub fn take_alerts(&mut self) -> Vec<Alert> {
        std::mem::take(&mut self.alerts)
    }
}
