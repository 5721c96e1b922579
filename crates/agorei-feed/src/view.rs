//! Rendered state republished by a [`FeedSession`](crate::FeedSession)

use agorei_core::{Post, Viewer};
use serde::Serialize;

use crate::selection::{MAX_SELECTION, RankSlot, Selection};
use crate::subscription::FeedStatus;

/// State of the general feed as the UI should render it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FeedState {
    /// Nobody is signed in; nothing is visible
    SignedOut,
    /// Subscribed, no push received yet
    Loading,
    Ready { posts: Vec<Post> },
    /// The store failed; recoverable by resubscribing
    Unavailable { reason: String },
}

impl FeedState {
    pub fn posts(&self) -> &[Post] {
        match self {
            FeedState::Ready { posts } => posts,
            _ => &[],
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, FeedState::Loading)
    }
}

/// One of the viewer's own posts with its selection flags
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnedEntry {
    pub post: Post,
    pub selected: bool,
    /// False when toggling would be a no-op (selection full, not picked)
    pub available: bool,
}

/// Everything the UI shell renders
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedView {
    pub viewer: Option<Viewer>,
    pub feed: FeedState,
    pub owned_status: FeedStatus,
    pub owned: Vec<OwnedEntry>,
    pub ranked: [RankSlot; MAX_SELECTION],
    pub selection_full: bool,
}

impl FeedView {
    pub fn signed_out() -> Self {
        Self {
            viewer: None,
            feed: FeedState::SignedOut,
            owned_status: FeedStatus::Loading,
            owned: Vec::new(),
            ranked: Selection::new().ranked_view(&[]),
            selection_full: false,
        }
    }

    /// Ids of the ranked picks, in rank order
    pub fn ranked_ids(&self) -> Vec<&str> {
        self.ranked
            .iter()
            .filter_map(RankSlot::post)
            .map(|post| post.id.as_str())
            .collect()
    }
}

impl Default for FeedView {
    fn default() -> Self {
        Self::signed_out()
    }
}

pub(crate) fn feed_state(status: &FeedStatus, posts: &[Post]) -> FeedState {
    match status {
        FeedStatus::Loading => FeedState::Loading,
        FeedStatus::Ready => FeedState::Ready {
            posts: posts.to_vec(),
        },
        FeedStatus::Failed(reason) => FeedState::Unavailable {
            reason: format!("failed to load feed: {reason}"),
        },
    }
}

pub(crate) fn owned_entries(
    status: &FeedStatus,
    owned: &[Post],
    selection: &Selection,
) -> Vec<OwnedEntry> {
    if *status != FeedStatus::Ready {
        return Vec::new();
    }
    owned
        .iter()
        .map(|post| OwnedEntry {
            post: post.clone(),
            selected: selection.is_selected(&post.id),
            available: selection.is_available(&post.id),
        })
        .collect()
}
