use serde::{Deserialize, Serialize};

use patchlog_core::{EntityId, JsonInput, ModelName};

use crate::error::CodecError;

/// Kind of entity mutation requested by the application layer.
///
/// Wire codes are stable: `Create = 0`, `Save = 1`, `Delete = 2`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Create,
    Save,
    Delete,
}

impl ActionKind {
    pub fn code(self) -> u8 {
        match self {
            Self::Create => 0,
            Self::Save => 1,
            Self::Delete => 2,
        }
    }
}

impl TryFrom<u8> for ActionKind {
    type Error = CodecError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Create),
            1 => Ok(Self::Save),
            2 => Ok(Self::Delete),
            code => Err(CodecError::UnrecognizedActionKind { code }),
        }
    }
}

impl core::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Self::Create => "create",
            Self::Save => "save",
            Self::Delete => "delete",
        })
    }
}

/// Which state of an action a failure refers to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StateSide {
    Previous,
    Current,
}

impl core::fmt::Display for StateSide {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Self::Previous => "previous",
            Self::Current => "current",
        })
    }
}

/// A requested entity mutation (transient; never persisted).
///
/// Actions are **intent**. The codec turns each one into an operation that is
/// wrapped into a persisted event.
///
/// Expected shape per kind:
/// - `Create`: `current` set
/// - `Save`: `previous` and `current` set
/// - `Delete`: neither required
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub kind: ActionKind,
    pub model_name: ModelName,
    pub entity_id: EntityId,
    pub previous: Option<JsonInput>,
    pub current: Option<JsonInput>,
}

impl Action {
    pub fn create(model_name: ModelName, entity_id: EntityId, current: impl Into<JsonInput>) -> Self {
        Self {
            kind: ActionKind::Create,
            model_name,
            entity_id,
            previous: None,
            current: Some(current.into()),
        }
    }

    pub fn save(
        model_name: ModelName,
        entity_id: EntityId,
        previous: impl Into<JsonInput>,
        current: impl Into<JsonInput>,
    ) -> Self {
        Self {
            kind: ActionKind::Save,
            model_name,
            entity_id,
            previous: Some(previous.into()),
            current: Some(current.into()),
        }
    }

    pub fn delete(model_name: ModelName, entity_id: EntityId) -> Self {
        Self {
            kind: ActionKind::Delete,
            model_name,
            entity_id,
            previous: None,
            current: None,
        }
    }

    /// Build an action from a raw kind code supplied by a foreign caller.
    pub fn from_code(
        code: u8,
        model_name: ModelName,
        entity_id: EntityId,
        previous: Option<JsonInput>,
        current: Option<JsonInput>,
    ) -> Result<Self, CodecError> {
        Ok(Self {
            kind: ActionKind::try_from(code)?,
            model_name,
            entity_id,
            previous,
            current,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_codes_round_trip() {
        for kind in [ActionKind::Create, ActionKind::Save, ActionKind::Delete] {
            assert_eq!(ActionKind::try_from(kind.code()).unwrap(), kind);
        }
    }

    #[test]
    fn unknown_code_is_a_contract_violation() {
        let err = Action::from_code(
            9,
            "user".parse().unwrap(),
            "42".parse().unwrap(),
            None,
            None,
        )
        .unwrap_err();

        assert!(matches!(err, CodecError::UnrecognizedActionKind { code: 9 }));
        assert!(err.is_contract_violation());
    }
}
