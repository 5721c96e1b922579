//! Post data model
//!
//! [`PostDocument`] mirrors the persisted fields exactly as the document store
//! holds them. Every field is optional on decode so that older or partially
//! written documents still load. [`Post`] is the normalized form the feed
//! works with.

use std::cmp::Ordering;
use std::fmt::{self, Display};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DraftError, StoreError};
use crate::identity::{UserId, Viewer};

/// Opaque post identifier assigned by the document store
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(pub String);

impl PostId {
    /// Create a post id from any string-like value
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PostId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Post visibility
///
/// Unrecognized values decode as `Private`, the more restrictive choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Privacy {
    #[default]
    Public,
    #[serde(other)]
    Private,
}

impl Display for Privacy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Privacy::Public => write!(f, "public"),
            Privacy::Private => write!(f, "private"),
        }
    }
}

/// Creation timestamp with sub-second precision
///
/// Ordered by seconds, then nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Timestamp {
    pub seconds: i64,
    #[serde(default)]
    pub nanoseconds: u32,
}

impl Timestamp {
    pub fn new(seconds: i64, nanoseconds: u32) -> Self {
        Self {
            seconds,
            nanoseconds,
        }
    }

    /// Convert to a UTC datetime, if representable
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.seconds, self.nanoseconds)
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Self {
            seconds: value.timestamp(),
            nanoseconds: value.timestamp_subsec_nanos(),
        }
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.to_rfc3339()),
            None => write!(f, "{}.{:09}", self.seconds, self.nanoseconds),
        }
    }
}

/// A raw document as delivered by the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub id: String,
    pub data: serde_json::Value,
}

impl StoredDocument {
    pub fn new(id: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }
}

/// Persisted fields of a post document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privacy: Option<Privacy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
}

/// A content item in normalized form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub title: String,
    pub category: String,
    pub description: String,
    pub privacy: Privacy,
    /// `None` when the document carries no owner; such a post is owned by nobody
    pub owner_id: Option<UserId>,
    pub owner_label: String,
    /// `None` when the store has not stamped the document yet
    pub created_at: Option<Timestamp>,
}

impl Post {
    /// Normalize a decoded document
    pub fn from_parts(id: PostId, doc: PostDocument) -> Self {
        Self {
            id,
            title: doc.title.unwrap_or_default(),
            category: doc.category.unwrap_or_default(),
            description: doc.description.unwrap_or_default(),
            privacy: doc.privacy.unwrap_or_default(),
            owner_id: doc.user_id,
            owner_label: doc.user_email.unwrap_or_default(),
            created_at: doc.created_at,
        }
    }

    /// Decode a stored document
    ///
    /// Absent fields fall back to defaults; only a field of the wrong JSON
    /// type is an error.
    pub fn from_document(doc: &StoredDocument) -> Result<Self, StoreError> {
        let fields: PostDocument = serde_json::from_value(doc.data.clone())?;
        Ok(Self::from_parts(PostId::new(doc.id.clone()), fields))
    }

    /// Whether `user` owns this post
    pub fn is_owned_by(&self, user: &UserId) -> bool {
        self.owner_id.as_ref() == Some(user)
    }

    /// Newest first; unstamped posts last; ties by id ascending
    pub fn cmp_newest_first(&self, other: &Post) -> Ordering {
        other
            .created_at
            .cmp(&self.created_at)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Draft for a new post, validated client-side before it is written
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPost {
    pub title: String,
    pub category: String,
    pub description: String,
    #[serde(default)]
    pub privacy: Privacy,
}

impl NewPost {
    pub fn new(
        title: impl Into<String>,
        category: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            category: category.into(),
            description: description.into(),
            privacy: Privacy::Public,
        }
    }

    pub fn with_privacy(mut self, privacy: Privacy) -> Self {
        self.privacy = privacy;
        self
    }

    /// All text fields must be non-empty
    pub fn validate(&self) -> Result<(), DraftError> {
        for (name, value) in [
            ("title", &self.title),
            ("category", &self.category),
            ("description", &self.description),
        ] {
            if value.trim().is_empty() {
                return Err(DraftError::MissingField(name));
            }
        }
        Ok(())
    }

    /// Build the persisted fields for this draft
    pub fn into_document(self, author: &Viewer, created_at: Timestamp) -> PostDocument {
        PostDocument {
            title: Some(self.title),
            category: Some(self.category),
            description: Some(self.description),
            privacy: Some(self.privacy),
            created_at: Some(created_at),
            user_id: Some(author.id.clone()),
            user_email: Some(author.label.clone()),
        }
    }
}
