//! Transactional replay of merge-patch events into materialized entity state.
//!
//! A reduce call is one transaction:
//!
//! ```text
//! Open ─▶ for each event: Applying ─▶ Applied ──▶ ... ─▶ Committed
//!                                  └─▶ Aborted ─────────▶ RolledBack
//! ```
//!
//! Either every event of the call is applied and committed, or the store is
//! left exactly as it was and no outcomes are returned.

use thiserror::Error;
use tracing::{debug, debug_span, warn};

use patchlog_core::{EntityId, ModelName, PatchError, merge_patch};
use patchlog_events::{ActionKind, Event, OperationKind, PatchEvent};

use crate::datastore::{DiscardOnDrop, Key, StoreError, Transaction, TxnDatastore};

/// Per-event record of a successful reduce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReduceOutcome {
    pub kind: ActionKind,
    pub model_name: ModelName,
    pub entity_id: EntityId,
}

/// Reduce failure. Any variant means the whole call was rolled back.
#[derive(Debug, Error)]
pub enum ReduceError {
    #[error("can't create already existing instance {model}/{entity}")]
    CreateOnExisting { model: ModelName, entity: EntityId },

    #[error("can't save nonexistent instance {model}/{entity}")]
    SaveOnMissing { model: ModelName, entity: EntityId },

    #[error("unknown operation type {code} for {model}/{entity}")]
    UnknownOperation {
        code: u8,
        model: ModelName,
        entity: EntityId,
    },

    #[error("error when reducing save event for {model}/{entity}: {source}")]
    Patch {
        model: ModelName,
        entity: EntityId,
        #[source]
        source: PatchError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ReduceError {
    /// The `(model, entity)` pair the failure refers to, when there is one.
    pub fn entity(&self) -> Option<(&ModelName, &EntityId)> {
        match self {
            Self::CreateOnExisting { model, entity }
            | Self::SaveOnMissing { model, entity }
            | Self::UnknownOperation { model, entity, .. }
            | Self::Patch { model, entity, .. } => Some((model, entity)),
            Self::Store(_) => None,
        }
    }
}

/// Replay `events`, in the given order, against `store` below `base_key`.
///
/// Each event targets `base_key / model / entity_id`:
/// - `Create` requires the key to be absent and stores the payload verbatim
/// - `Save` requires the key to be present and merge-patches the stored body
/// - `Delete` removes the key, tolerating absence
///
/// Events are never reordered or deduplicated. On success one outcome per
/// event is returned in input order.
pub fn reduce(
    events: &[PatchEvent],
    store: &dyn TxnDatastore,
    base_key: &Key,
) -> Result<Vec<ReduceOutcome>, ReduceError> {
    let span = debug_span!("reduce", base_key = %base_key, events = events.len());
    let _enter = span.enter();

    let mut txn = DiscardOnDrop::new(store.begin(false)?);

    let result = apply_all(&mut *txn, events, base_key).and_then(|outcomes| {
        txn.commit()?;
        Ok(outcomes)
    });

    match &result {
        Ok(_) => debug!("reduce committed"),
        Err(err) => warn!(error = %err, "reduce rolled back"),
    }
    result
}

fn apply_all(
    txn: &mut (dyn Transaction + '_),
    events: &[PatchEvent],
    base_key: &Key,
) -> Result<Vec<ReduceOutcome>, ReduceError> {
    let mut outcomes = Vec::with_capacity(events.len());
    for event in events {
        outcomes.push(apply_one(txn, event, base_key)?);
    }
    Ok(outcomes)
}

fn apply_one(
    txn: &mut (dyn Transaction + '_),
    event: &PatchEvent,
    base_key: &Key,
) -> Result<ReduceOutcome, ReduceError> {
    let model = event.model_name();
    let entity = event.entity_id();
    let key = base_key.entity(model, entity);
    let operation = event.operation();

    let kind = match operation.kind() {
        OperationKind::Create => {
            if txn.has(&key)? {
                return Err(ReduceError::CreateOnExisting {
                    model: model.clone(),
                    entity: entity.clone(),
                });
            }
            txn.put(key, operation.payload().to_vec())?;
            debug!(model = %model, entity = %entity, "create operation applied");
            ActionKind::Create
        }
        OperationKind::Save => {
            let stored = match txn.get(&key) {
                Ok(value) => value,
                Err(StoreError::NotFound(_)) => {
                    return Err(ReduceError::SaveOnMissing {
                        model: model.clone(),
                        entity: entity.clone(),
                    });
                }
                Err(err) => return Err(err.into()),
            };
            let patched = merge_patch::merge_patch(&stored, operation.payload()).map_err(|source| {
                ReduceError::Patch {
                    model: model.clone(),
                    entity: entity.clone(),
                    source,
                }
            })?;
            txn.put(key, patched)?;
            debug!(model = %model, entity = %entity, "save operation applied");
            ActionKind::Save
        }
        OperationKind::Delete => {
            txn.delete(&key)?;
            debug!(model = %model, entity = %entity, "delete operation applied");
            ActionKind::Delete
        }
        OperationKind::Unrecognized(code) => {
            return Err(ReduceError::UnknownOperation {
                code: code.get(),
                model: model.clone(),
                entity: entity.clone(),
            });
        }
    };

    Ok(ReduceOutcome {
        kind,
        model_name: model.clone(),
        entity_id: entity.clone(),
    })
}
