//! Feed projection
//!
//! Pure derivation of what a viewer sees from the raw pushed set. Each push
//! replaces the raw set wholesale and the projection is recomputed in full;
//! nothing is patched incrementally.

use agorei_core::{Post, Privacy, Viewer};

/// Which posts a projection keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Public posts, plus private posts owned by the viewer
    Feed,
    /// Only posts owned by the viewer, whatever their privacy
    OwnedBy,
}

impl Visibility {
    /// Whether `viewer` may see `post` under this predicate
    pub fn admits(&self, post: &Post, viewer: &Viewer) -> bool {
        match self {
            Visibility::Feed => match post.privacy {
                Privacy::Public => true,
                Privacy::Private => post.is_owned_by(&viewer.id),
            },
            Visibility::OwnedBy => post.is_owned_by(&viewer.id),
        }
    }
}

/// Filter `raw` for `viewer` and order it newest first
///
/// Yields nothing when no viewer is signed in. Posts sharing a creation time
/// are ordered by id, so identical input always projects identically.
pub fn project(raw: &[Post], viewer: Option<&Viewer>, visibility: Visibility) -> Vec<Post> {
    let Some(viewer) = viewer else {
        return Vec::new();
    };

    let mut visible: Vec<Post> = raw
        .iter()
        .filter(|post| visibility.admits(post, viewer))
        .cloned()
        .collect();
    visible.sort_by(Post::cmp_newest_first);
    visible
}

/// The general feed for `viewer`
pub fn project_feed(raw: &[Post], viewer: Option<&Viewer>) -> Vec<Post> {
    project(raw, viewer, Visibility::Feed)
}

/// The viewer's own posts
pub fn project_owned(raw: &[Post], viewer: Option<&Viewer>) -> Vec<Post> {
    project(raw, viewer, Visibility::OwnedBy)
}
