//! Feed configuration

use agorei_core::{CollectionQuery, Viewer};
use serde::{Deserialize, Serialize};

/// Where posts live in the document store and how they are keyed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Collection holding post documents
    pub collection: String,
    /// Field the general feed is ordered by
    pub order_field: String,
    /// Field naming the owner of a post
    pub owner_field: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            collection: "posts".to_string(),
            order_field: "createdAt".to_string(),
            owner_field: "userId".to_string(),
        }
    }
}

impl FeedConfig {
    /// Every post, newest first
    ///
    /// Private posts of other users are delivered too and filtered
    /// client-side by the projection.
    pub fn feed_query(&self) -> CollectionQuery {
        CollectionQuery::new(&self.collection).order_by_desc(&self.order_field)
    }

    /// Posts owned by `viewer`
    pub fn owner_query(&self, viewer: &Viewer) -> CollectionQuery {
        CollectionQuery::new(&self.collection).where_eq(&self.owner_field, viewer.id.as_str())
    }
}
