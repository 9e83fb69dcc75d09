//! Authentication boundary.
//!
//! Identity is carried as an explicit context handle rather than a process
//! global. Every subscribe/write call re-reads the current user through the
//! context at its own call boundary; nothing caches a stale auth state.

use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

/// A signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
}

impl AuthUser {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
        }
    }
}

/// Shared handle to the current signed-in user, if any.
///
/// Clones observe the same session; signing out through one handle is
/// visible to every operation holding another.
#[derive(Clone, Default)]
pub struct AuthContext {
    current: Arc<RwLock<Option<AuthUser>>>,
}

impl AuthContext {
    /// A context with nobody signed in
    #[must_use]
    pub fn signed_out() -> Self {
        Self::default()
    }

    /// A context with `user` already signed in
    #[must_use]
    pub fn signed_in(user: AuthUser) -> Self {
        let context = Self::default();
        context.sign_in(user);
        context
    }

    pub fn sign_in(&self, user: AuthUser) {
        tracing::debug!("signed in as {}", user.id);
        *self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(user);
    }

    pub fn sign_out(&self) {
        *self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// The current user at this instant.
    ///
    /// Callers must not cache the result across store calls.
    #[must_use]
    pub fn current_user(&self) -> Option<AuthUser> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Collection path for the current user's memos, when signed in.
    #[must_use]
    pub fn memos_path(&self) -> Option<String> {
        self.current_user().map(|user| memos_path(&user.id))
    }
}

/// Collection path of a user's private memo collection.
#[must_use]
pub fn memos_path(user_id: &str) -> String {
    format!("users/{user_id}/memos")
}
