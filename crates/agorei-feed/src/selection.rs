//! Bounded selection of the viewer's own posts
//!
//! Holds at most [`MAX_SELECTION`] post ids in the order they were picked.
//! Rank comes from pick order alone: deselecting and reselecting a post moves
//! it to the end. None of the operations fail; a full selection or an id the
//! viewer does not own simply yields [`ToggleOutcome::Unavailable`].

use std::collections::HashSet;

use agorei_core::{Post, PostId};
use serde::Serialize;
use tracing::debug;

/// Maximum number of picks
pub const MAX_SELECTION: usize = 4;

/// Result of [`Selection::toggle`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToggleOutcome {
    Selected,
    Deselected,
    /// Selection is full or the post is not among the viewer's own; nothing changed
    Unavailable,
}

impl ToggleOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToggleOutcome::Selected => "selected",
            ToggleOutcome::Deselected => "deselected",
            ToggleOutcome::Unavailable => "unavailable",
        }
    }
}

/// One slot of the ranked view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "slot", rename_all = "snake_case")]
pub enum RankSlot {
    Filled { rank: usize, post: Post },
    Empty { rank: usize },
}

impl RankSlot {
    /// 1-based rank
    pub fn rank(&self) -> usize {
        match self {
            RankSlot::Filled { rank, .. } | RankSlot::Empty { rank } => *rank,
        }
    }

    pub fn post(&self) -> Option<&Post> {
        match self {
            RankSlot::Filled { post, .. } => Some(post),
            RankSlot::Empty { .. } => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, RankSlot::Empty { .. })
    }
}

/// Ephemeral per-viewer selection state
#[derive(Debug, Clone, Default)]
pub struct Selection {
    picks: Vec<PostId>,
    owner_posts: HashSet<PostId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selected ids in rank order
    pub fn ids(&self) -> &[PostId] {
        &self.picks
    }

    pub fn len(&self) -> usize {
        self.picks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.picks.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.picks.len() >= MAX_SELECTION
    }

    pub fn is_selected(&self, id: &PostId) -> bool {
        self.picks.contains(id)
    }

    /// Whether toggling `id` would change anything
    pub fn is_available(&self, id: &PostId) -> bool {
        self.is_selected(id) || (!self.is_full() && self.owner_posts.contains(id))
    }

    /// Select `id` if it is free and owned, or deselect it if already picked
    pub fn toggle(&mut self, id: &PostId) -> ToggleOutcome {
        if let Some(index) = self.picks.iter().position(|pick| pick == id) {
            self.picks.remove(index);
            debug!(post = %id, "deselected");
            return ToggleOutcome::Deselected;
        }

        if !self.is_full() && self.owner_posts.contains(id) {
            self.picks.push(id.clone());
            debug!(post = %id, rank = self.picks.len(), "selected");
            ToggleOutcome::Selected
        } else {
            debug!(post = %id, full = self.is_full(), "selection unavailable");
            ToggleOutcome::Unavailable
        }
    }

    /// Replace the owned set and drop picks that left it
    ///
    /// Survivors keep their relative order. Returns the dropped ids.
    pub fn reconcile<I>(&mut self, owner_posts: I) -> Vec<PostId>
    where
        I: IntoIterator<Item = PostId>,
    {
        self.owner_posts = owner_posts.into_iter().collect();
        let picks = std::mem::take(&mut self.picks);
        let (kept, dropped): (Vec<PostId>, Vec<PostId>) = picks
            .into_iter()
            .partition(|pick| self.owner_posts.contains(pick));
        self.picks = kept;
        if !dropped.is_empty() {
            debug!(dropped = dropped.len(), "reconciled stale picks");
        }
        dropped
    }

    /// Fixed-length view: slot `i` holds the post picked `i`-th, else empty
    pub fn ranked_view(&self, posts: &[Post]) -> [RankSlot; MAX_SELECTION] {
        std::array::from_fn(|index| {
            let rank = index + 1;
            self.picks
                .get(index)
                .and_then(|id| posts.iter().find(|post| &post.id == id))
                .map(|post| RankSlot::Filled {
                    rank,
                    post: post.clone(),
                })
                .unwrap_or(RankSlot::Empty { rank })
        })
    }

    /// Forget every pick and the owned set
    pub fn clear(&mut self) {
        self.picks.clear();
        self.owner_posts.clear();
    }
}
