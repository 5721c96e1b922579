//! # Agorei Core
//!
//! Core types, errors, and collaborator traits for the Agorei feed.
//!
//! The feed itself lives in `agorei-feed`; this crate holds what it is built
//! on, so that the same synchronization logic runs against the in-memory
//! collaborators in tests and a hosted document store in production.
//!
//! ## Key Traits
//!
//! - [`DocumentStore`]: push-based full-snapshot subscriptions over a collection
//! - [`AuthProvider`]: the signed-in [`Viewer`] and its transitions
//! - [`Clock`]: time source for creation timestamps
//!
//! ## Key Types
//!
//! - [`Post`]: normalized content item decoded from a [`StoredDocument`]
//! - [`PostDocument`]: the persisted field contract
//! - [`NewPost`]: a validated draft for the create-post flow
//! - [`CollectionQuery`]: collection, filter, and ordering of a subscription
//! - [`UserProfile`]: the viewer's profile, read with [`fetch_profile`]

pub mod error;
pub mod identity;
pub mod memory;
pub mod post;
pub mod profile;
pub mod query;
pub mod traits;

// Re-export main types
pub use error::*;
pub use identity::*;
pub use memory::*;
pub use post::*;
pub use profile::*;
pub use query::*;
pub use traits::*;
