//! In-memory collaborators for testing
//!
//! Provides a document store and an auth provider that behave like their
//! hosted counterparts closely enough to exercise the feed without a network.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agorei_core::{CollectionQuery, MemoryStore, DocumentStore};
//!
//! let store = MemoryStore::new();
//! let registration = store.subscribe(
//!     CollectionQuery::new("posts").order_by_desc("createdAt"),
//!     Arc::new(|event| println!("{event:?}")),
//! )?;
//! store.put_document("posts", "p1", json!({"title": "Hello"}));
//! ```

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering as AtomicOrdering};

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::identity::Viewer;
use crate::post::StoredDocument;
use crate::query::{CollectionQuery, Direction};
use crate::traits::{AuthProvider, DocumentStore, ListenerRegistration, SnapshotSink, StoreEvent};

struct Listener {
    query: CollectionQuery,
    sink: SnapshotSink,
}

/// A document store held entirely in memory
///
/// Every write pushes a fresh full snapshot to each listener whose query
/// covers the written collection, synchronously on the writer's thread.
pub struct MemoryStore {
    /// collection -> (document id -> fields)
    collections: DashMap<String, BTreeMap<String, Value>>,
    listeners: Arc<DashMap<u64, Listener>>,
    next_listener: AtomicU64,
    held: AtomicBool,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            collections: DashMap::new(),
            listeners: Arc::new(DashMap::new()),
            next_listener: AtomicU64::new(1),
            held: AtomicBool::new(false),
            offline: AtomicBool::new(false),
        }
    }

    /// Insert or replace a document, then push to listeners
    pub fn put_document(&self, collection: &str, id: &str, data: Value) {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), data);
        debug!(collection, id, "document written");
        self.push_collection(collection);
    }

    /// Remove a document, then push to listeners. Returns whether it existed.
    pub fn remove_document(&self, collection: &str, id: &str) -> bool {
        let removed = self
            .collections
            .get_mut(collection)
            .and_then(|mut docs| docs.remove(id))
            .is_some();
        if removed {
            debug!(collection, id, "document removed");
            self.push_collection(collection);
        }
        removed
    }

    /// Number of documents in a collection
    pub fn document_count(&self, collection: &str) -> usize {
        self.collections
            .get(collection)
            .map(|docs| docs.len())
            .unwrap_or(0)
    }

    /// Number of attached listeners
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Stop delivering pushes until [`release_pushes`](Self::release_pushes)
    pub fn hold_pushes(&self) {
        self.held.store(true, AtomicOrdering::SeqCst);
    }

    /// Resume pushes and deliver the current snapshot to every listener
    pub fn release_pushes(&self) {
        self.held.store(false, AtomicOrdering::SeqCst);
        for (query, sink) in self.listener_sinks(None) {
            sink(StoreEvent::Snapshot(self.snapshot(&query)));
        }
    }

    /// While offline, new subscriptions, reads and writes are rejected
    ///
    /// Attached listeners are left alone; use
    /// [`fail_listeners`](Self::fail_listeners) to break them.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, AtomicOrdering::SeqCst);
    }

    fn is_offline(&self) -> bool {
        self.offline.load(AtomicOrdering::SeqCst)
    }

    /// Fail every listener with `message` and detach them
    pub fn fail_listeners(&self, message: &str) {
        let failed = self.listener_sinks(None);
        self.listeners.clear();
        warn!(count = failed.len(), message, "failing listeners");
        for (_, sink) in failed {
            sink(StoreEvent::Error(message.to_string()));
        }
    }

    /// Documents matching `query`, in query order
    pub fn snapshot(&self, query: &CollectionQuery) -> Vec<StoredDocument> {
        let mut docs: Vec<StoredDocument> = match self.collections.get(&query.collection) {
            Some(collection) => collection
                .iter()
                .filter(|(_, data)| query.matches(&query.collection, data))
                .map(|(id, data)| StoredDocument::new(id.clone(), data.clone()))
                .collect(),
            None => Vec::new(),
        };

        if let Some(order) = &query.order_by {
            // Stable sort keeps id order among equal keys
            docs.sort_by(|a, b| {
                let ord = compare_field(a.data.get(&order.field), b.data.get(&order.field));
                match order.direction {
                    Direction::Asc => ord,
                    Direction::Desc => ord.reverse(),
                }
            });
        }
        docs
    }

    fn push_collection(&self, collection: &str) {
        if self.held.load(AtomicOrdering::SeqCst) {
            return;
        }
        for (query, sink) in self.listener_sinks(Some(collection)) {
            sink(StoreEvent::Snapshot(self.snapshot(&query)));
        }
    }

    // Sinks are cloned out so no map guard is held while they run.
    fn listener_sinks(&self, collection: Option<&str>) -> Vec<(CollectionQuery, SnapshotSink)> {
        let mut sinks: Vec<(u64, CollectionQuery, SnapshotSink)> = self
            .listeners
            .iter()
            .filter(|entry| collection.is_none_or(|c| entry.value().query.collection == c))
            .map(|entry| {
                (
                    *entry.key(),
                    entry.value().query.clone(),
                    entry.value().sink.clone(),
                )
            })
            .collect();
        sinks.sort_by_key(|(key, _, _)| *key);
        sinks
            .into_iter()
            .map(|(_, query, sink)| (query, sink))
            .collect()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn subscribe(
        &self,
        query: CollectionQuery,
        sink: SnapshotSink,
    ) -> Result<ListenerRegistration, StoreError> {
        if self.is_offline() {
            return Err(StoreError::SubscribeFailed(format!(
                "{} is offline",
                query.collection
            )));
        }
        let key = self.next_listener.fetch_add(1, AtomicOrdering::SeqCst);
        self.listeners.insert(
            key,
            Listener {
                query: query.clone(),
                sink: sink.clone(),
            },
        );
        debug!(listener = key, collection = %query.collection, "listener attached");

        if !self.held.load(AtomicOrdering::SeqCst) {
            sink(StoreEvent::Snapshot(self.snapshot(&query)));
        }

        let listeners = Arc::clone(&self.listeners);
        Ok(ListenerRegistration::new(move || {
            listeners.remove(&key);
            debug!(listener = key, "listener detached");
        }))
    }

    async fn get_document(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<StoredDocument>, StoreError> {
        if self.is_offline() {
            return Err(StoreError::ReadFailed(format!("{collection}/{id}: store offline")));
        }
        Ok(self
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id).cloned())
            .map(|data| StoredDocument::new(id, data)))
    }

    async fn create_document(&self, collection: &str, fields: Value) -> Result<String, StoreError> {
        if self.is_offline() {
            return Err(StoreError::WriteFailed(format!("{collection}: store offline")));
        }
        if !fields.is_object() {
            return Err(StoreError::WriteFailed(
                "document fields must be a JSON object".to_string(),
            ));
        }
        let id = uuid::Uuid::new_v4().simple().to_string();
        self.put_document(collection, &id, fields);
        Ok(id)
    }
}

/// Compare two optional field values for ordering
///
/// Timestamps (`{seconds, nanoseconds}`) compare chronologically, numbers
/// numerically, strings lexically. Missing values sort lowest.
fn compare_field(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => compare_values(a, b),
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Object(_), Value::Object(_)) => timestamp_key(a).cmp(&timestamp_key(b)),
        _ => Ordering::Equal,
    }
}

fn timestamp_key(value: &Value) -> (i64, u64) {
    let seconds = value.get("seconds").and_then(Value::as_i64).unwrap_or(0);
    let nanos = value.get("nanoseconds").and_then(Value::as_u64).unwrap_or(0);
    (seconds, nanos)
}

/// Auth provider driven by explicit sign-in and sign-out calls
pub struct MemoryAuth {
    viewer: watch::Sender<Option<Viewer>>,
}

impl MemoryAuth {
    /// Start with nobody signed in
    pub fn new() -> Self {
        let (viewer, _) = watch::channel(None);
        Self { viewer }
    }

    pub fn signed_in(viewer: Viewer) -> Self {
        let (viewer, _) = watch::channel(Some(viewer));
        Self { viewer }
    }

    pub fn sign_in(&self, viewer: Viewer) {
        self.viewer.send_replace(Some(viewer));
    }

    pub fn sign_out(&self) {
        self.viewer.send_replace(None);
    }
}

impl Default for MemoryAuth {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthProvider for MemoryAuth {
    fn current(&self) -> Option<Viewer> {
        self.viewer.borrow().clone()
    }

    fn watch(&self) -> watch::Receiver<Option<Viewer>> {
        self.viewer.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;

    fn recording_sink() -> (SnapshotSink, Arc<Mutex<Vec<StoreEvent>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let recorded = events.clone();
        let sink: SnapshotSink = Arc::new(move |event| recorded.lock().push(event));
        (sink, events)
    }

    fn ids(event: &StoreEvent) -> Vec<String> {
        match event {
            StoreEvent::Snapshot(docs) => docs.iter().map(|d| d.id.clone()).collect(),
            StoreEvent::Error(_) => Vec::new(),
        }
    }

    #[test]
    fn test_subscribe_delivers_initial_empty_snapshot() {
        let store = MemoryStore::new();
        let (sink, events) = recording_sink();
        let _registration = store.subscribe(CollectionQuery::new("posts"), sink).unwrap();

        let events = events.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0], StoreEvent::Snapshot(Vec::new()));
    }

    #[test]
    fn test_writes_push_ordered_full_snapshots() {
        let store = MemoryStore::new();
        let (sink, events) = recording_sink();
        let _registration = store
            .subscribe(CollectionQuery::new("posts").order_by_desc("createdAt"), sink)
            .unwrap();

        store.put_document("posts", "x", json!({"createdAt": {"seconds": 10, "nanoseconds": 0}}));
        store.put_document("posts", "y", json!({"createdAt": {"seconds": 30, "nanoseconds": 0}}));
        store.put_document("posts", "z", json!({"createdAt": {"seconds": 20, "nanoseconds": 0}}));
        store.put_document("users", "u", json!({}));

        let events = events.lock();
        assert_eq!(events.len(), 4);
        assert_eq!(ids(&events[3]), vec!["y", "z", "x"]);
    }

    #[test]
    fn test_filtered_listener_sees_only_matching() {
        let store = MemoryStore::new();
        store.put_document("posts", "a1", json!({"userId": "a"}));
        store.put_document("posts", "b1", json!({"userId": "b"}));

        let (sink, events) = recording_sink();
        let _registration = store
            .subscribe(CollectionQuery::new("posts").where_eq("userId", "a"), sink)
            .unwrap();
        assert_eq!(ids(&events.lock()[0]), vec!["a1"]);
    }

    #[test]
    fn test_detach_stops_pushes() {
        let store = MemoryStore::new();
        let (sink, events) = recording_sink();
        let registration = store.subscribe(CollectionQuery::new("posts"), sink).unwrap();
        assert_eq!(store.listener_count(), 1);

        registration.detach();
        assert_eq!(store.listener_count(), 0);
        store.put_document("posts", "p", json!({}));
        assert_eq!(events.lock().len(), 1);
    }

    #[test]
    fn test_held_pushes_are_delivered_on_release() {
        let store = MemoryStore::new();
        store.hold_pushes();
        let (sink, events) = recording_sink();
        let _registration = store.subscribe(CollectionQuery::new("posts"), sink).unwrap();
        store.put_document("posts", "p", json!({}));
        assert!(events.lock().is_empty());

        store.release_pushes();
        let events = events.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(ids(&events[0]), vec!["p"]);
    }

    #[test]
    fn test_fail_listeners_sends_error_and_detaches() {
        let store = MemoryStore::new();
        let (sink, events) = recording_sink();
        let _registration = store.subscribe(CollectionQuery::new("posts"), sink).unwrap();
        store.fail_listeners("permission denied");

        assert_eq!(store.listener_count(), 0);
        let events = events.lock();
        assert_eq!(
            events.last(),
            Some(&StoreEvent::Error("permission denied".to_string()))
        );
    }

    #[test]
    fn test_remove_document_pushes() {
        let store = MemoryStore::new();
        store.put_document("posts", "p", json!({}));
        let (sink, events) = recording_sink();
        let _registration = store.subscribe(CollectionQuery::new("posts"), sink).unwrap();

        assert!(store.remove_document("posts", "p"));
        assert!(!store.remove_document("posts", "p"));
        let events = events.lock();
        assert_eq!(events.len(), 2);
        assert!(ids(&events[1]).is_empty());
    }

    #[tokio::test]
    async fn test_create_and_get_document() {
        let store = MemoryStore::new();
        let id = tokio_test::assert_ok!(
            store
                .create_document("posts", json!({"title": "Hello"}))
                .await
        );
        let doc = store.get_document("posts", &id).await.unwrap().unwrap();
        assert_eq!(doc.data["title"], "Hello");
        assert!(store.get_document("posts", "missing").await.unwrap().is_none());
        assert!(store.create_document("posts", json!(3)).await.is_err());
    }

    #[tokio::test]
    async fn test_offline_store_rejects_everything_new() {
        let store = MemoryStore::new();
        store.set_offline(true);

        let (sink, _events) = recording_sink();
        assert!(matches!(
            store.subscribe(CollectionQuery::new("posts"), sink),
            Err(StoreError::SubscribeFailed(_))
        ));
        assert!(matches!(
            store.get_document("users", "uid-a").await,
            Err(StoreError::ReadFailed(_))
        ));
        assert!(matches!(
            store.create_document("posts", json!({})).await,
            Err(StoreError::WriteFailed(_))
        ));

        store.set_offline(false);
        let (sink, _events) = recording_sink();
        tokio_test::assert_ok!(store.subscribe(CollectionQuery::new("posts"), sink));
    }

    #[test]
    fn test_memory_auth_transitions() {
        let auth = MemoryAuth::new();
        let rx = auth.watch();
        assert!(auth.current().is_none());

        auth.sign_in(Viewer::new("uid-a", "a@example.com"));
        assert_eq!(rx.borrow().as_ref().map(|v| v.id.as_str()), Some("uid-a"));

        auth.sign_out();
        assert!(auth.current().is_none());
    }
}
