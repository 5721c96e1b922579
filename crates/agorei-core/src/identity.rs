//! Viewer identity
//!
//! A [`Viewer`] is the signed-in user as reported by the auth collaborator.
//! Two viewers are the same identity when their [`UserId`]s match; the
//! display label is informational only.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// Opaque user identifier assigned by the auth collaborator
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    /// Create a user id from any string-like value
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for UserId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// The authenticated actor of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewer {
    pub id: UserId,
    /// Display identifier, e.g. a contact address
    pub label: String,
}

impl Viewer {
    /// Create a new viewer
    pub fn new(id: impl Into<UserId>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }

    /// Whether `other` is the same identity (labels are ignored)
    pub fn same_identity(&self, other: &Viewer) -> bool {
        self.id == other.id
    }
}

/// Compare two optional viewers by identity
pub fn identity_changed(before: Option<&Viewer>, after: Option<&Viewer>) -> bool {
    match (before, after) {
        (None, None) => false,
        (Some(a), Some(b)) => !a.same_identity(b),
        _ => true,
    }
}
