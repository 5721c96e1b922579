//! Feed session
//!
//! Owns everything scoped to one signed-in viewer: the two subscriptions
//! (general feed and own posts), the raw pushed sets, their projections, and
//! the selection. Pushes arrive on whatever thread the store delivers them
//! on and are parked in a per-channel slot; the session applies them one at
//! a time on its own task, so each push is projected, reconciled, and
//! republished before the next one is looked at. A push replaces whatever is
//! still parked for its channel.
//!
//! Every (re)subscription bumps a generation counter. Parked pushes from an
//! older generation are discarded, which is what makes a push that raced an
//! unsubscribe harmless.

use std::sync::Arc;

use agorei_core::{
    AgoreiResult, AuthError, AuthProvider, Clock, DocumentStore, FeedError, NewPost, Post, PostId,
    StoreError, Viewer, identity_changed,
};
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::config::FeedConfig;
use crate::projection::{project_feed, project_owned};
use crate::selection::{Selection, ToggleOutcome};
use crate::subscription::{FeedClient, FeedEvent, FeedStatus, Subscription};
use crate::view::{FeedView, feed_state, owned_entries};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Channel {
    Feed,
    Owned,
}

#[derive(Debug)]
struct Update {
    generation: u64,
    channel: Channel,
    event: FeedEvent,
}

/// Latest unapplied push per channel
#[derive(Debug, Default)]
struct Pending {
    feed: Option<Update>,
    owned: Option<Update>,
}

impl Pending {
    fn slot(&mut self, channel: Channel) -> &mut Option<Update> {
        match channel {
            Channel::Feed => &mut self.feed,
            Channel::Owned => &mut self.owned,
        }
    }

    /// Park `update`, replacing an older push for the same channel
    fn put(&mut self, update: Update) {
        let slot = self.slot(update.channel);
        if slot
            .as_ref()
            .is_some_and(|parked| parked.generation > update.generation)
        {
            return;
        }
        *slot = Some(update);
    }

    fn take(&mut self) -> [Option<Update>; 2] {
        [self.feed.take(), self.owned.take()]
    }

    fn clear(&mut self) {
        self.feed = None;
        self.owned = None;
    }
}

/// Raw set, status, and projection for one subscription
#[derive(Debug, Default)]
struct Stream {
    subscription: Option<Subscription>,
    status: FeedStatus,
    raw: Vec<Post>,
    projected: Vec<Post>,
}

impl Stream {
    fn close(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
        self.status = FeedStatus::Loading;
    }

    fn reset(&mut self) {
        self.close();
        self.raw.clear();
        self.projected.clear();
    }
}

/// Feed state for one session of the UI shell
pub struct FeedSession {
    client: FeedClient,
    config: FeedConfig,
    viewer: Option<Viewer>,
    generation: u64,
    pending: Arc<Mutex<Pending>>,
    wake_tx: mpsc::Sender<()>,
    wake_rx: mpsc::Receiver<()>,
    feed: Stream,
    owned: Stream,
    selection: Selection,
    view_tx: watch::Sender<FeedView>,
}

impl FeedSession {
    /// Create a signed-out session
    pub fn new(store: Arc<dyn DocumentStore>, config: FeedConfig) -> Self {
        // One wake-up is enough to drain every parked push
        let (wake_tx, wake_rx) = mpsc::channel(1);
        let (view_tx, _) = watch::channel(FeedView::signed_out());
        Self {
            client: FeedClient::new(store),
            config,
            viewer: None,
            generation: 0,
            pending: Arc::new(Mutex::new(Pending::default())),
            wake_tx,
            wake_rx,
            feed: Stream::default(),
            owned: Stream::default(),
            selection: Selection::new(),
            view_tx,
        }
    }

    pub fn viewer(&self) -> Option<&Viewer> {
        self.viewer.as_ref()
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Receiver of every republished view
    pub fn watch(&self) -> watch::Receiver<FeedView> {
        self.view_tx.subscribe()
    }

    /// The current view
    pub fn view(&self) -> FeedView {
        self.view_tx.borrow().clone()
    }

    /// Follow an auth transition
    ///
    /// A new identity tears down both subscriptions and the selection, then
    /// subscribes again for the new viewer. The same identity is a no-op
    /// apart from refreshing the label.
    pub fn set_viewer(&mut self, viewer: Option<Viewer>) -> Result<(), FeedError> {
        if !identity_changed(self.viewer.as_ref(), viewer.as_ref()) {
            if viewer != self.viewer {
                self.viewer = viewer;
                self.publish();
            }
            return Ok(());
        }

        info!(
            from = ?self.viewer.as_ref().map(|v| v.id.as_str()),
            to = ?viewer.as_ref().map(|v| v.id.as_str()),
            "viewer changed"
        );
        self.teardown();
        self.viewer = viewer;
        let result = match self.viewer.clone() {
            Some(viewer) => self.subscribe_for(&viewer),
            None => Ok(()),
        };
        self.publish();
        result
    }

    /// Subscribe again after a failure, keeping the selection
    ///
    /// Does nothing when signed out.
    pub fn resubscribe(&mut self) -> Result<(), FeedError> {
        let Some(viewer) = self.viewer.clone() else {
            return Ok(());
        };
        info!(viewer = %viewer.id, "resubscribing");
        self.feed.close();
        self.owned.close();
        self.generation += 1;
        let result = self.subscribe_for(&viewer);
        self.publish();
        result
    }

    /// Toggle `id` in the selection and republish
    pub fn toggle(&mut self, id: &PostId) -> ToggleOutcome {
        if self.viewer.is_none() {
            return ToggleOutcome::Unavailable;
        }
        let outcome = self.selection.toggle(id);
        if outcome != ToggleOutcome::Unavailable {
            self.publish();
        }
        outcome
    }

    /// Write a new post owned by the current viewer
    ///
    /// The post reaches the feed through the next push like any other write.
    pub async fn create_post(&self, draft: NewPost, clock: &dyn Clock) -> AgoreiResult<PostId> {
        let viewer = self.viewer.as_ref().ok_or(AuthError::NotAuthenticated)?;
        draft.validate()?;
        let document = draft.into_document(viewer, clock.now());
        let fields = serde_json::to_value(&document).map_err(StoreError::from)?;
        let id = self
            .client
            .store()
            .create_document(&self.config.collection, fields)
            .await?;
        info!(post = %id, author = %viewer.id, "post created");
        Ok(PostId::new(id))
    }

    /// Apply every parked push without waiting. Returns how many were applied.
    pub fn process_pending(&mut self) -> usize {
        let applied = self.drain();
        if applied > 0 {
            self.publish();
        }
        applied
    }

    /// Wait until at least one current push is parked, then apply everything parked
    pub async fn next_update(&mut self) -> usize {
        loop {
            let applied = self.drain();
            if applied > 0 {
                self.publish();
                return applied;
            }
            if self.wake_rx.recv().await.is_none() {
                return 0;
            }
        }
    }

    /// Drive the session from an auth provider until `shutdown` flips to true
    pub async fn run(&mut self, auth: &dyn AuthProvider, mut shutdown: watch::Receiver<bool>) {
        let mut viewers = auth.watch();
        let initial = viewers.borrow_and_update().clone();
        if let Err(err) = self.set_viewer(initial) {
            warn!(error = %err, "initial subscribe failed");
        }

        loop {
            tokio::select! {
                changed = viewers.changed() => {
                    if changed.is_err() {
                        debug!("auth provider dropped");
                        break;
                    }
                    let viewer = viewers.borrow_and_update().clone();
                    if let Err(err) = self.set_viewer(viewer) {
                        warn!(error = %err, "subscribe failed");
                    }
                }
                Some(()) = self.wake_rx.recv() => {
                    if self.drain() > 0 {
                        self.publish();
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        self.shutdown();
    }

    /// Teardown: unsubscribe, drop the selection, sign out
    pub fn shutdown(&mut self) {
        self.teardown();
        self.viewer = None;
        self.publish();
        info!("feed session shut down");
    }

    fn teardown(&mut self) {
        self.feed.reset();
        self.owned.reset();
        self.selection.clear();
        self.generation += 1;
        // Drop pushes parked by the subscriptions just closed
        self.pending.lock().clear();
    }

    fn drain(&mut self) -> usize {
        let parked = self.pending.lock().take();
        let mut applied = 0;
        for update in parked.into_iter().flatten() {
            if self.apply(update) {
                applied += 1;
            }
        }
        applied
    }

    fn subscribe_for(&mut self, viewer: &Viewer) -> Result<(), FeedError> {
        let feed = self.subscribe_channel(Channel::Feed, viewer);
        let owned = self.subscribe_channel(Channel::Owned, viewer);
        feed.and(owned)
    }

    fn subscribe_channel(&mut self, channel: Channel, viewer: &Viewer) -> Result<(), FeedError> {
        let query = match channel {
            Channel::Feed => self.config.feed_query(),
            Channel::Owned => self.config.owner_query(viewer),
        };
        let pending = Arc::clone(&self.pending);
        let wake = self.wake_tx.clone();
        let generation = self.generation;
        let result = self.client.subscribe(query, move |event| {
            pending.lock().put(Update {
                generation,
                channel,
                event,
            });
            // A full channel already holds a wake-up that will see this push
            let _ = wake.try_send(());
        });

        let stream = self.stream_mut(channel);
        match result {
            Ok(subscription) => {
                stream.subscription = Some(subscription);
                stream.status = FeedStatus::Loading;
                Ok(())
            }
            Err(err) => {
                warn!(?channel, error = %err, "subscribe failed");
                stream.status = FeedStatus::Failed(err.to_string());
                Err(err)
            }
        }
    }

    fn stream_mut(&mut self, channel: Channel) -> &mut Stream {
        match channel {
            Channel::Feed => &mut self.feed,
            Channel::Owned => &mut self.owned,
        }
    }

    /// Apply one push. Returns false if it was stale.
    fn apply(&mut self, update: Update) -> bool {
        if update.generation != self.generation {
            debug!(
                generation = update.generation,
                current = self.generation,
                "discarding stale push"
            );
            return false;
        }

        let viewer = self.viewer.clone();
        let channel = update.channel;
        let stream = self.stream_mut(channel);
        stream.status = stream.status.after(&update.event);
        let FeedEvent::Snapshot(posts) = update.event else {
            return true;
        };

        debug!(?channel, count = posts.len(), "applying snapshot");
        stream.raw = posts;
        match channel {
            Channel::Feed => {
                self.feed.projected = project_feed(&self.feed.raw, viewer.as_ref());
            }
            Channel::Owned => {
                self.owned.projected = project_owned(&self.owned.raw, viewer.as_ref());
                let owned_ids = self.owned.projected.iter().map(|post| post.id.clone());
                self.selection.reconcile(owned_ids);
            }
        }
        true
    }

    fn build_view(&self) -> FeedView {
        let Some(viewer) = self.viewer.clone() else {
            return FeedView::signed_out();
        };
        FeedView {
            viewer: Some(viewer),
            feed: feed_state(&self.feed.status, &self.feed.projected),
            owned_status: self.owned.status.clone(),
            owned: owned_entries(&self.owned.status, &self.owned.projected, &self.selection),
            ranked: self.selection.ranked_view(&self.owned.projected),
            selection_full: self.selection.is_full(),
        }
    }

    fn publish(&self) {
        self.view_tx.send_replace(self.build_view());
    }
}

impl Drop for FeedSession {
    fn drop(&mut self) {
        self.feed.close();
        self.owned.close();
    }
}
