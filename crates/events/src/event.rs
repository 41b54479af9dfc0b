use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use patchlog_core::{EntityId, ModelName};

use crate::operation::Operation;

/// A replayable record of one entity mutation.
///
/// Events are:
/// - **immutable** (treat them as facts)
/// - keyed by model + entity id + timestamp
/// - designed to be **replayed** in the order they were produced
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Wall-clock instant the event was produced.
    fn time(&self) -> DateTime<Utc>;

    fn entity_id(&self) -> &EntityId;

    fn model_name(&self) -> &ModelName;

    /// Timestamp as big-endian unix nanoseconds.
    ///
    /// Big-endian keeps byte-wise ordering equal to chronological ordering for
    /// instants after the epoch. Saturates outside the nanosecond range
    /// (years 1677 to 2262).
    fn time_bytes(&self) -> [u8; 8] {
        let time = self.time();
        let nanos = time.timestamp_nanos_opt().unwrap_or(if time.timestamp() < 0 {
            i64::MIN
        } else {
            i64::MAX
        });
        nanos.to_be_bytes()
    }
}

/// The merge-patch event: one operation stamped with its model and instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchEvent {
    #[serde(with = "chrono::serde::ts_nanoseconds")]
    timestamp: DateTime<Utc>,
    entity_id: EntityId,
    model_name: ModelName,
    operation: Operation,
}

impl PatchEvent {
    pub fn new(
        timestamp: DateTime<Utc>,
        model_name: ModelName,
        operation: Operation,
    ) -> Self {
        Self {
            timestamp,
            entity_id: operation.entity_id().clone(),
            model_name,
            operation,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    pub fn into_operation(self) -> Operation {
        self.operation
    }
}

impl Event for PatchEvent {
    fn time(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn entity_id(&self) -> &EntityId {
        &self.entity_id
    }

    fn model_name(&self) -> &ModelName {
        &self.model_name
    }
}
