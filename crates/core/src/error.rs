//! Error model for identifiers and merge-patch documents.

use thiserror::Error;

/// Result type for merge-patch computations.
pub type PatchResult<T> = Result<T, PatchError>;

/// An identifier segment failed validation.
///
/// Identifiers become path segments of store keys, so they must be non-empty
/// and must not contain the key separator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdError {
    #[error("{kind} must not be empty")]
    Empty { kind: &'static str },

    #[error("{kind} must not contain '/': {value}")]
    Separator { kind: &'static str, value: String },
}

/// Merge-patch failure (RFC 7396 over JSON bytes).
#[derive(Debug, Error)]
pub enum PatchError {
    /// The document being diffed or patched is not valid JSON.
    #[error("invalid json document: {0}")]
    InvalidDocument(#[source] serde_json::Error),

    /// The patch itself is not valid JSON.
    #[error("invalid merge patch: {0}")]
    InvalidPatch(#[source] serde_json::Error),

    /// Re-serializing a merged value failed.
    #[error("failed to serialize merged document: {0}")]
    Serialize(#[source] serde_json::Error),
}
