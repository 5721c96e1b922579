//! Error types for Agorei
//!
//! Only collaborator failures are modeled as errors. Boundary conditions of
//! the feed (no viewer, full selection, stale selection) are ordinary values
//! and never appear here.

use thiserror::Error;

/// Top-level error type for Agorei
#[derive(Debug, Error)]
pub enum AgoreiError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),

    #[error("Draft error: {0}")]
    Draft(#[from] DraftError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),
}

/// Errors raised by the external document store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Subscribe failed: {0}")]
    SubscribeFailed(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Errors surfaced by the change feed
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Feed unavailable: {0}")]
    Unavailable(String),
}

/// Errors from validating a new post draft
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DraftError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
}

/// Errors from the auth collaborator
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("No viewer is signed in")]
    NotAuthenticated,
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Result type alias for Agorei operations
pub type AgoreiResult<T> = Result<T, AgoreiError>;
