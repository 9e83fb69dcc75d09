//! Screen state machines.
//!
//! Rendering-agnostic models of the list, detail, and editor screens. Each
//! screen owns its live feed, adopts every pushed snapshot wholesale, and
//! tears the feed down on deactivation. Store failures surface as queued
//! [`Alert`]s and are never retried automatically.

mod detail;
mod editor;
mod list;

pub use detail::{DetailScreen, MemoDisplay};
pub use editor::{EditorScreen, SaveOutcome};
pub use list::ListScreen;

/// User-facing failure notice raised by a rejected store call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alert {
    SaveFailed,
    DeleteFailed,
}

impl Alert {
    /// Message shown to the user
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::SaveFailed => "Failed to save the memo.",
            Self::DeleteFailed => "Failed to delete the memo.",
        }
    }
}
