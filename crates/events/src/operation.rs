//! Operations: the persisted form of an action, and the translator that
//! produces them.

use serde::{Deserialize, Serialize};

use patchlog_core::{EntityId, JsonInput, merge_patch};

use crate::action::{Action, ActionKind, StateSide};
use crate::error::{CodecError, CodecResult};

/// Kind of a persisted operation.
///
/// Stored as its numeric code. Codes this version does not know are kept as
/// `Unrecognized` so that a foreign or corrupt event survives decoding intact
/// and is rejected where it is applied.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum OperationKind {
    Create,
    Save,
    Delete,
    Unrecognized(UnknownCode),
}

/// A kind code outside the known set.
///
/// Only obtainable through `OperationKind::from(u8)`, so it never holds the
/// code of a known kind.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct UnknownCode(u8);

impl UnknownCode {
    pub fn get(self) -> u8 {
        self.0
    }
}

impl core::fmt::Display for UnknownCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl OperationKind {
    pub fn code(self) -> u8 {
        match self {
            Self::Create => ActionKind::Create.code(),
            Self::Save => ActionKind::Save.code(),
            Self::Delete => ActionKind::Delete.code(),
            Self::Unrecognized(code) => code.get(),
        }
    }

    /// The action kind this operation materializes, if recognized.
    pub fn action_kind(self) -> Option<ActionKind> {
        match self {
            Self::Create => Some(ActionKind::Create),
            Self::Save => Some(ActionKind::Save),
            Self::Delete => Some(ActionKind::Delete),
            Self::Unrecognized(_) => None,
        }
    }
}

impl From<u8> for OperationKind {
    fn from(code: u8) -> Self {
        match ActionKind::try_from(code) {
            Ok(kind) => kind.into(),
            Err(_) => Self::Unrecognized(UnknownCode(code)),
        }
    }
}

impl From<OperationKind> for u8 {
    fn from(kind: OperationKind) -> Self {
        kind.code()
    }
}

impl From<ActionKind> for OperationKind {
    fn from(kind: ActionKind) -> Self {
        match kind {
            ActionKind::Create => Self::Create,
            ActionKind::Save => Self::Save,
            ActionKind::Delete => Self::Delete,
        }
    }
}

/// A persisted entity mutation.
///
/// Payload meaning depends on the kind:
/// - `Create`: the full canonical entity body
/// - `Save`: a JSON merge patch from the previous to the current body
/// - `Delete`: empty
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    kind: OperationKind,
    entity_id: EntityId,
    #[serde(with = "serde_bytes")]
    payload: Vec<u8>,
}

impl Operation {
    /// Assemble an operation from already-encoded parts.
    pub fn from_parts(kind: OperationKind, entity_id: EntityId, payload: Vec<u8>) -> Self {
        Self {
            kind,
            entity_id,
            payload,
        }
    }

    /// Translate a creation: the payload is the canonical body of `current`.
    pub fn create(entity_id: EntityId, current: &JsonInput) -> CodecResult<Self> {
        let payload = canonical(&entity_id, StateSide::Current, current)?;
        Ok(Self::from_parts(OperationKind::Create, entity_id, payload))
    }

    /// Translate an update: the payload is the merge patch from `previous` to
    /// `current`.
    pub fn save(entity_id: EntityId, previous: &JsonInput, current: &JsonInput) -> CodecResult<Self> {
        let previous = parse(&entity_id, StateSide::Previous, previous)?;
        let current = parse(&entity_id, StateSide::Current, current)?;

        let patch = merge_patch::diff(&previous, &current);
        let payload = serde_json::to_vec(&patch).map_err(|source| CodecError::Serialization {
            entity_id: entity_id.clone(),
            side: StateSide::Current,
            source,
        })?;
        Ok(Self::from_parts(OperationKind::Save, entity_id, payload))
    }

    /// Translate a deletion. Never fails.
    pub fn delete(entity_id: EntityId) -> Self {
        Self::from_parts(OperationKind::Delete, entity_id, Vec::new())
    }

    /// Dispatch an action to the matching translation.
    pub fn from_action(action: &Action) -> CodecResult<Self> {
        let entity_id = action.entity_id.clone();
        match action.kind {
            ActionKind::Create => {
                let current = required(action, StateSide::Current)?;
                Self::create(entity_id, current)
            }
            ActionKind::Save => {
                let previous = required(action, StateSide::Previous)?;
                let current = required(action, StateSide::Current)?;
                Self::save(entity_id, previous, current)
            }
            ActionKind::Delete => Ok(Self::delete(entity_id)),
        }
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn entity_id(&self) -> &EntityId {
        &self.entity_id
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }
}

fn required(action: &Action, side: StateSide) -> CodecResult<&JsonInput> {
    let state = match side {
        StateSide::Previous => action.previous.as_ref(),
        StateSide::Current => action.current.as_ref(),
    };
    state.ok_or_else(|| CodecError::MissingState {
        kind: action.kind,
        entity_id: action.entity_id.clone(),
        side,
    })
}

fn parse(entity_id: &EntityId, side: StateSide, input: &JsonInput) -> CodecResult<serde_json::Value> {
    input.to_value().map_err(|source| CodecError::Serialization {
        entity_id: entity_id.clone(),
        side,
        source,
    })
}

fn canonical(entity_id: &EntityId, side: StateSide, input: &JsonInput) -> CodecResult<Vec<u8>> {
    input.to_canonical_bytes().map_err(|source| CodecError::Serialization {
        entity_id: entity_id.clone(),
        side,
        source,
    })
}
