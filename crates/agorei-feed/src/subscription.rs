//! Change feed client
//!
//! Wraps a [`DocumentStore`] subscription so that each push reaches the
//! handler as a fully decoded set of posts, and so that unsubscribing is
//! final: once [`Subscription::unsubscribe`] returns, the handler is never
//! called again, even if the store delivers a late push from another thread.

use std::fmt;
use std::sync::Arc;

use agorei_core::{
    CollectionQuery, DocumentStore, FeedError, ListenerRegistration, Post, SnapshotSink,
    StoreEvent, StoredDocument,
};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

/// What a subscriber receives on each push
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    /// The complete current set, replacing whatever was held before
    Snapshot(Vec<Post>),
    /// The store reported a failure for this subscription
    Failed(String),
}

/// Load state of one subscription
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum FeedStatus {
    /// No push received yet
    #[default]
    Loading,
    /// At least one snapshot received
    Ready,
    /// The store reported an error; recoverable by subscribing again
    Failed(String),
}

impl FeedStatus {
    /// Status after applying `event`
    pub fn after(&self, event: &FeedEvent) -> FeedStatus {
        match event {
            FeedEvent::Snapshot(_) => FeedStatus::Ready,
            FeedEvent::Failed(reason) => FeedStatus::Failed(reason.clone()),
        }
    }
}

type Handler = Box<dyn Fn(FeedEvent) + Send + Sync>;

/// Holds the handler until unsubscribe clears it.
///
/// Pushes invoke the handler under the slot lock, so clearing the slot
/// waits out any push already in flight.
struct HandlerSlot {
    handler: Mutex<Option<Handler>>,
}

impl HandlerSlot {
    fn deliver(&self, event: FeedEvent) -> bool {
        let guard = self.handler.lock();
        match guard.as_ref() {
            Some(handler) => {
                handler(event);
                true
            }
            None => false,
        }
    }
}

/// Subscribes to collections on a document store
#[derive(Clone)]
pub struct FeedClient {
    store: Arc<dyn DocumentStore>,
}

impl FeedClient {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Subscribe `handler` to full-snapshot pushes for `query`
    ///
    /// The handler may run on the store's delivery thread, possibly before
    /// this call returns. It must not call back into the returned
    /// [`Subscription`].
    pub fn subscribe<F>(
        &self,
        query: CollectionQuery,
        handler: F,
    ) -> Result<Subscription, FeedError>
    where
        F: Fn(FeedEvent) + Send + Sync + 'static,
    {
        let slot = Arc::new(HandlerSlot {
            handler: Mutex::new(Some(Box::new(handler))),
        });

        let sink_slot = Arc::clone(&slot);
        let collection = query.collection.clone();
        let sink: SnapshotSink = Arc::new(move |event| {
            let event = match event {
                StoreEvent::Snapshot(docs) => FeedEvent::Snapshot(decode_posts(&collection, &docs)),
                StoreEvent::Error(reason) => {
                    warn!(collection = %collection, reason = %reason, "feed listener failed");
                    FeedEvent::Failed(reason)
                }
            };
            if !sink_slot.deliver(event) {
                debug!(collection = %collection, "dropped push after unsubscribe");
            }
        });

        let label = describe(&query);
        let registration = self
            .store
            .subscribe(query, sink)
            .map_err(|err| FeedError::Unavailable(err.to_string()))?;
        info!(query = %label, "subscribed");

        Ok(Subscription {
            slot,
            registration,
            label,
        })
    }
}

impl fmt::Debug for FeedClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedClient").finish_non_exhaustive()
    }
}

/// A live subscription; dropping it unsubscribes
pub struct Subscription {
    slot: Arc<HandlerSlot>,
    registration: ListenerRegistration,
    label: String,
}

impl Subscription {
    /// Stop delivery. Only the first call has any effect; returns whether it did.
    pub fn unsubscribe(&self) -> bool {
        let handler = self.slot.handler.lock().take();
        if handler.is_none() {
            return false;
        }
        self.registration.detach();
        info!(query = %self.label, "unsubscribed");
        true
    }

    pub fn is_active(&self) -> bool {
        self.slot.handler.lock().is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("query", &self.label)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Decode a pushed snapshot, skipping documents with malformed fields
fn decode_posts(collection: &str, docs: &[StoredDocument]) -> Vec<Post> {
    docs.iter()
        .filter_map(|doc| match Post::from_document(doc) {
            Ok(post) => Some(post),
            Err(err) => {
                warn!(collection, id = %doc.id, error = %err, "skipping malformed document");
                None
            }
        })
        .collect()
}

fn describe(query: &CollectionQuery) -> String {
    let mut label = query.collection.clone();
    if let Some(agorei_core::FieldFilter::Equals { field, value }) = &query.filter {
        label.push_str(&format!(" where {field} == {value}"));
    }
    if let Some(order) = &query.order_by {
        label.push_str(&format!(" order by {} {:?}", order.field, order.direction));
    }
    label
}
