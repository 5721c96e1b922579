//! Viewer profile lookup
//!
//! Profiles live in their own collection, keyed by the viewer's id. A missing
//! profile is not an error.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AgoreiResult, StoreError};
use crate::identity::Viewer;
use crate::traits::DocumentStore;

/// Collection holding profile documents
pub const PROFILES_COLLECTION: &str = "users";

/// Public profile fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub bio: String,
}

/// Fetch the profile of `viewer`, `None` if it does not exist
pub async fn fetch_profile(
    store: &dyn DocumentStore,
    viewer: &Viewer,
) -> AgoreiResult<Option<UserProfile>> {
    let Some(doc) = store
        .get_document(PROFILES_COLLECTION, viewer.id.as_str())
        .await?
    else {
        debug!(viewer = %viewer.id, "no profile document");
        return Ok(None);
    };
    let profile = serde_json::from_value(doc.data).map_err(StoreError::from)?;
    Ok(Some(profile))
}
