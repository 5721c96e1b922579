//! # Agorei Feed
//!
//! Real-time feed synchronization and bounded selection.
//!
//! The document store pushes the full set of matching posts on every change.
//! This crate turns those pushes into what the UI renders:
//!
//! - [`FeedClient`] / [`Subscription`]: subscribe to a collection, receive
//!   decoded full snapshots, unsubscribe exactly once
//! - [`project`]: pure privacy filter and newest-first ordering for a viewer
//! - [`Selection`]: up to [`MAX_SELECTION`] of the viewer's own posts, ranked
//!   by pick order
//! - [`FeedSession`]: ties the above to auth transitions and republishes a
//!   [`FeedView`] after every change
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use agorei_core::{MemoryStore, Viewer};
//! use agorei_feed::{FeedConfig, FeedSession};
//!
//! let store = Arc::new(MemoryStore::new());
//! let mut session = FeedSession::new(store.clone(), FeedConfig::default());
//! session.set_viewer(Some(Viewer::new("uid-a", "a@example.com")))?;
//! session.process_pending();
//! println!("{:?}", session.view().feed);
//! ```

pub mod config;
pub mod projection;
pub mod selection;
pub mod session;
pub mod subscription;
pub mod view;

pub use config::FeedConfig;
pub use projection::{Visibility, project, project_feed, project_owned};
pub use selection::{MAX_SELECTION, RankSlot, Selection, ToggleOutcome};
pub use session::FeedSession;
pub use subscription::{FeedClient, FeedEvent, FeedStatus, Subscription};
pub use view::{FeedState, FeedView, OwnedEntry};
