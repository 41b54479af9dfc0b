//! Codec error model.

use thiserror::Error;

use patchlog_core::EntityId;

use crate::action::{ActionKind, StateSide};
use crate::envelope::ContentId;

/// Result type for translation and envelope coding.
pub type CodecResult<T> = Result<T, CodecError>;

/// Failure while translating actions or coding envelopes.
///
/// Two classes live here:
/// - **data errors**: the input could not be represented (`Serialization`,
///   `Encode`, `MalformedEnvelope`, `ContentIdMismatch`)
/// - **contract violations**: the caller built an action this codec cannot
///   accept (`UnrecognizedActionKind`, `MissingState`). These indicate a
///   programming defect upstream and should not be retried.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to serialize {side} state of entity {entity_id}: {source}")]
    Serialization {
        entity_id: EntityId,
        side: StateSide,
        #[source]
        source: serde_json::Error,
    },

    #[error("unrecognized action kind code {code}")]
    UnrecognizedActionKind { code: u8 },

    #[error("{kind} action for entity {entity_id} is missing its {side} state")]
    MissingState {
        kind: ActionKind,
        entity_id: EntityId,
        side: StateSide,
    },

    #[error("failed to encode envelope: {0}")]
    Encode(#[source] rmp_serde::encode::Error),

    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("envelope content id mismatch (expected {expected}, found {found})")]
    ContentIdMismatch { expected: ContentId, found: ContentId },
}

impl CodecError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedEnvelope(msg.into())
    }

    /// Whether this error reports a caller defect rather than bad data.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Self::UnrecognizedActionKind { .. } | Self::MissingState { .. }
        )
    }
}
