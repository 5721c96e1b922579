//! Collaborator contracts
//!
//! The feed never talks to a concrete backend. It depends on these traits so
//! the same synchronization logic runs against the in-memory store in tests
//! and against a hosted document store in production.
//!
//! ## Key Traits
//!
//! - [`DocumentStore`]: push-based collection subscriptions plus one-shot reads and writes
//! - [`AuthProvider`]: the current [`Viewer`] and its transitions
//! - [`Clock`]: creation timestamps, swappable in tests

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::watch;

use crate::error::StoreError;
use crate::identity::Viewer;
use crate::post::{StoredDocument, Timestamp};
use crate::query::CollectionQuery;

/// A notification pushed by the store to a subscriber
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    /// The full current set of documents matching the query, in query order
    Snapshot(Vec<StoredDocument>),
    /// The listener failed and will receive no further snapshots
    Error(String),
}

/// Callback the store invokes for each push
pub type SnapshotSink = Arc<dyn Fn(StoreEvent) + Send + Sync>;

/// Handle returned by [`DocumentStore::subscribe`]
///
/// Detaching is idempotent; dropping the registration detaches it.
pub struct ListenerRegistration {
    detach: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl ListenerRegistration {
    /// Wrap the backend-specific detach action
    pub fn new(detach: impl FnOnce() + Send + 'static) -> Self {
        Self {
            detach: Mutex::new(Some(Box::new(detach))),
        }
    }

    /// A registration with nothing to release
    pub fn noop() -> Self {
        Self {
            detach: Mutex::new(None),
        }
    }

    /// Release the listener. Returns `true` only on the first call.
    pub fn detach(&self) -> bool {
        let action = self.detach.lock().take();
        match action {
            Some(action) => {
                action();
                true
            }
            None => false,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.detach.lock().is_some()
    }
}

impl Drop for ListenerRegistration {
    fn drop(&mut self) {
        self.detach();
    }
}

impl fmt::Debug for ListenerRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistration")
            .field("attached", &self.is_attached())
            .finish()
    }
}

/// External document store
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Register `sink` for full-snapshot pushes of the documents matching `query`
    ///
    /// The first push may arrive at any later time, or never.
    fn subscribe(
        &self,
        query: CollectionQuery,
        sink: SnapshotSink,
    ) -> Result<ListenerRegistration, StoreError>;

    /// One-shot read of a single document
    async fn get_document(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<StoredDocument>, StoreError>;

    /// Create a document with a store-assigned id
    async fn create_document(
        &self,
        collection: &str,
        fields: serde_json::Value,
    ) -> Result<String, StoreError>;
}

/// External auth collaborator
pub trait AuthProvider: Send + Sync {
    /// The viewer signed in right now
    fn current(&self) -> Option<Viewer>;

    /// Change notifications; the receiver's initial value is the current viewer
    fn watch(&self) -> watch::Receiver<Option<Viewer>>;
}

/// Time abstraction for testability
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Real clock using system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::from(Utc::now())
    }
}

/// Clock that only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock {
    seconds: AtomicI64,
}

impl ManualClock {
    pub fn new(start_seconds: i64) -> Self {
        Self {
            seconds: AtomicI64::new(start_seconds),
        }
    }

    pub fn advance(&self, seconds: i64) {
        self.seconds.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp::new(self.seconds.load(Ordering::SeqCst), 0)
    }
}
