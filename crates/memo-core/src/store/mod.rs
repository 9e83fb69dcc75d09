//! Document-store abstraction.
//!
//! The backing store is modeled as a schemaless collection of JSON field
//! bags with push-based subscriptions. Every push delivers the complete
//! current result set (or document), never a diff; consumers replace their
//! local snapshot wholesale on each emission.

mod libsql;
mod memory;

use std::cmp::Ordering as CmpOrdering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::{Map, Value};
use tokio::sync::watch;

use crate::error::Result;

pub use self::libsql::LibSqlStore;
pub use memory::MemoryStore;

/// Schemaless field bag stored for a single document.
pub type RawFields = Map<String, Value>;

/// A raw store record: store-assigned id plus its field bag.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Store-assigned identifier, unique within its collection
    pub id: String,
    /// Raw fields as persisted; no schema is enforced
    pub fields: RawFields,
}

/// Sort direction for collection subscriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Ordering applied to every collection snapshot before delivery.
///
/// Documents missing the order field always sort last, regardless of
/// direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

impl OrderBy {
    /// Order by `field`, largest first
    #[must_use]
    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Descending,
        }
    }

    /// Order by `field`, smallest first
    #[must_use]
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Ascending,
        }
    }
}

/// Async interface to the document store.
///
/// `path` scopes a collection (e.g. `users/{uid}/memos`). All methods are
/// suspension points; none block the caller's event loop.
#[allow(async_fn_in_trait)]
pub trait DocumentStore {
    /// Subscribe to a collection; each emission is the full ordered result set.
    async fn subscribe_collection(
        &self,
        path: &str,
        order_by: OrderBy,
    ) -> Result<Subscription<Vec<Document>>>;

    /// Subscribe to a single document; `None` emissions mean "no data".
    async fn subscribe_document(
        &self,
        path: &str,
        id: &str,
    ) -> Result<Subscription<Option<Document>>>;

    /// One-shot read of a single document.
    async fn read_document(&self, path: &str, id: &str) -> Result<Option<Document>>;

    /// Create a document with a store-assigned id; returns the new id.
    async fn create_document(&self, path: &str, fields: RawFields) -> Result<String>;

    /// Replace a document's entire field bag, creating it when missing.
    async fn overwrite_document(&self, path: &str, id: &str, fields: RawFields) -> Result<()>;

    /// Delete a document. Deleting a missing document is not an error.
    async fn delete_document(&self, path: &str, id: &str) -> Result<()>;
}

/// Live handle to a stream of complete snapshots.
///
/// Holds an open channel until [`Subscription::cancel`] is called; the
/// owning screen must cancel on deactivation or the watcher lingers in the
/// store's registry.
#[derive(Debug)]
pub struct Subscription<T> {
    rx: watch::Receiver<T>,
    cancelled: Arc<AtomicBool>,
}

impl<T: Clone> Subscription<T> {
    /// Latest snapshot delivered by the store.
    #[must_use]
    pub fn current(&self) -> T {
        self.rx.borrow().clone()
    }

    /// Wait for the next snapshot.
    ///
    /// Resolves to `None` once the subscription has been cancelled or the
    /// store side has shut down.
    pub async fn changed(&mut self) -> Option<T> {
        if self.is_cancelled() {
            return None;
        }
        match self.rx.changed().await {
            Ok(()) if !self.is_cancelled() => Some(self.rx.borrow_and_update().clone()),
            _ => None,
        }
    }

    /// Tear the subscription down. Safe to call any number of times.
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            tracing::debug!("subscription cancelled");
        }
    }

    /// Whether [`Subscription::cancel`] has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

struct CollectionWatcher {
    sender: watch::Sender<Vec<Document>>,
    cancelled: Arc<AtomicBool>,
    order_by: OrderBy,
}

struct DocumentWatcher {
    sender: watch::Sender<Option<Document>>,
    cancelled: Arc<AtomicBool>,
}

/// Fan-out registry shared by store backends.
///
/// Each mutation publishes the full post-change state to every live watcher
/// on the affected path. Cancelled or dropped watchers are pruned on
/// publish.
#[derive(Default)]
pub(crate) struct WatcherHub {
    collections: Mutex<HashMap<String, Vec<CollectionWatcher>>>,
    documents: Mutex<HashMap<(String, String), Vec<DocumentWatcher>>>,
}

impl WatcherHub {
    pub fn watch_collection(
        &self,
        path: &str,
        order_by: OrderBy,
        mut initial: Vec<Document>,
    ) -> Subscription<Vec<Document>> {
        sort_documents(&mut initial, &order_by);
        let (sender, rx) = watch::channel(initial);
        let cancelled = Arc::new(AtomicBool::new(false));

        lock(&self.collections)
            .entry(path.to_string())
            .or_default()
            .push(CollectionWatcher {
                sender,
                cancelled: Arc::clone(&cancelled),
                order_by,
            });

        Subscription { rx, cancelled }
    }

    pub fn watch_document(
        &self,
        path: &str,
        id: &str,
        initial: Option<Document>,
    ) -> Subscription<Option<Document>> {
        let (sender, rx) = watch::channel(initial);
        let cancelled = Arc::new(AtomicBool::new(false));

        lock(&self.documents)
            .entry((path.to_string(), id.to_string()))
            .or_default()
            .push(DocumentWatcher {
                sender,
                cancelled: Arc::clone(&cancelled),
            });

        Subscription { rx, cancelled }
    }

    /// Push the current result set to every live collection watcher on `path`.
    pub fn publish_collection(&self, path: &str, documents: &[Document]) {
        let mut collections = lock(&self.collections);
        let Some(watchers) = collections.get_mut(path) else {
            return;
        };

        watchers.retain(|watcher| {
            if watcher.cancelled.load(Ordering::SeqCst) || watcher.sender.is_closed() {
                return false;
            }
            let mut snapshot = documents.to_vec();
            sort_documents(&mut snapshot, &watcher.order_by);
            watcher.sender.send(snapshot).is_ok()
        });

        if watchers.is_empty() {
            collections.remove(path);
        }
    }

    /// Push the current document state to every live watcher on `(path, id)`.
    pub fn publish_document(&self, path: &str, id: &str, document: Option<&Document>) {
        let mut documents = lock(&self.documents);
        let key = (path.to_string(), id.to_string());
        let Some(watchers) = documents.get_mut(&key) else {
            return;
        };

        watchers.retain(|watcher| {
            if watcher.cancelled.load(Ordering::SeqCst) || watcher.sender.is_closed() {
                return false;
            }
            watcher.sender.send(document.cloned()).is_ok()
        });

        if watchers.is_empty() {
            documents.remove(&key);
        }
    }
}

/// Lock a std mutex, recovering the guard if a writer panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Sort documents by the order field; missing values sort last.
pub(crate) fn sort_documents(documents: &mut [Document], order_by: &OrderBy) {
    documents.sort_by(|a, b| {
        match (a.fields.get(&order_by.field), b.fields.get(&order_by.field)) {
            (None, None) => CmpOrdering::Equal,
            (None, Some(_)) => CmpOrdering::Greater,
            (Some(_), None) => CmpOrdering::Less,
            (Some(left), Some(right)) => {
                let ordering = compare_values(left, right);
                match order_by.direction {
                    Direction::Ascending => ordering,
                    Direction::Descending => ordering.reverse(),
                }
            }
        }
    });
}

/// Best-effort comparison of two JSON order-field values.
///
/// Mixed or non-comparable types compare equal, leaving the (stable) input
/// order untouched.
fn compare_values(left: &Value, right: &Value) -> CmpOrdering {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => match (a.as_i64(), b.as_i64()) {
            (Some(a), Some(b)) => a.cmp(&b),
            _ => a
                .as_f64()
                .zip(b.as_f64())
                .and_then(|(a, b)| a.partial_cmp(&b))
                .unwrap_or(CmpOrdering::Equal),
        },
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        _ => CmpOrdering::Equal,
    }
}
