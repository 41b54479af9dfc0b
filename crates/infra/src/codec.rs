//! The event codec boundary used by the replicated store.

use std::sync::Arc;

use patchlog_events::{Action, CodecError, EncodedEnvelope, EnvelopeCodec, Event, PatchEvent};

use crate::config::PatcherConfig;
use crate::datastore::{Key, TxnDatastore};
use crate::reducer::{self, ReduceError, ReduceOutcome};

/// Turns entity actions into replayable events and replays them into a store.
///
/// The store engine owns envelope persistence and delivery order; it calls
/// `create` on the writing replica, ships the envelope bytes, and calls
/// `events_from_bytes` + `reduce` wherever the batch is materialized.
pub trait EventCodec: Send + Sync {
    type Ev: Event;

    fn create(&self, actions: &[Action]) -> Result<(Vec<Self::Ev>, EncodedEnvelope), CodecError>;

    fn reduce(
        &self,
        events: &[Self::Ev],
        store: &dyn TxnDatastore,
        base_key: &Key,
    ) -> Result<Vec<ReduceOutcome>, ReduceError>;

    fn events_from_bytes(&self, bytes: &[u8]) -> Result<Vec<Self::Ev>, CodecError>;
}

impl<C> EventCodec for Arc<C>
where
    C: EventCodec + ?Sized,
{
    type Ev = C::Ev;

    fn create(&self, actions: &[Action]) -> Result<(Vec<Self::Ev>, EncodedEnvelope), CodecError> {
        (**self).create(actions)
    }

    fn reduce(
        &self,
        events: &[Self::Ev],
        store: &dyn TxnDatastore,
        base_key: &Key,
    ) -> Result<Vec<ReduceOutcome>, ReduceError> {
        (**self).reduce(events, store, base_key)
    }

    fn events_from_bytes(&self, bytes: &[u8]) -> Result<Vec<Self::Ev>, CodecError> {
        (**self).events_from_bytes(bytes)
    }
}

/// Merge-patch event codec.
///
/// `Create` actions carry the full body, `Save` actions carry an RFC 7396
/// merge patch, `Delete` actions carry nothing.
#[derive(Debug, Clone, Default)]
pub struct JsonPatcher {
    codec: EnvelopeCodec,
    config: PatcherConfig,
}

impl JsonPatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: PatcherConfig) -> Self {
        Self {
            codec: EnvelopeCodec::with_schema_version(config.schema_version),
            config,
        }
    }

    pub fn config(&self) -> &PatcherConfig {
        &self.config
    }

    pub fn envelope_codec(&self) -> &EnvelopeCodec {
        &self.codec
    }

    /// Reduce below the configured base key.
    pub fn reduce_default(
        &self,
        events: &[PatchEvent],
        store: &dyn TxnDatastore,
    ) -> Result<Vec<ReduceOutcome>, ReduceError> {
        reducer::reduce(events, store, &self.config.base_key)
    }

    /// Decode an envelope, checking its digest when configured to.
    pub fn events_from_envelope(&self, envelope: &EncodedEnvelope) -> Result<Vec<PatchEvent>, CodecError> {
        if self.config.verify_content_id {
            self.codec.decode_verified(envelope.bytes(), &envelope.cid())
        } else {
            self.codec.decode(envelope.bytes())
        }
    }
}

impl EventCodec for JsonPatcher {
    type Ev = PatchEvent;

    fn create(&self, actions: &[Action]) -> Result<(Vec<PatchEvent>, EncodedEnvelope), CodecError> {
        self.codec.create(actions)
    }

    fn reduce(
        &self,
        events: &[PatchEvent],
        store: &dyn TxnDatastore,
        base_key: &Key,
    ) -> Result<Vec<ReduceOutcome>, ReduceError> {
        reducer::reduce(events, store, base_key)
    }

    fn events_from_bytes(&self, bytes: &[u8]) -> Result<Vec<PatchEvent>, CodecError> {
        self.codec.decode(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datastore::InMemoryDatastore;
    use serde_json::json;

    #[test]
    fn pipeline_through_shared_codec() {
        let patcher: Arc<JsonPatcher> =
            Arc::new(JsonPatcher::with_config(PatcherConfig::default().with_base_key("/model")));
        let store = InMemoryDatastore::new();

        let actions = vec![Action::create(
            "user".parse().unwrap(),
            "42".parse().unwrap(),
            json!({"a": 1}),
        )];
        let (_, envelope) = patcher.create(&actions).unwrap();

        let events = patcher.events_from_envelope(&envelope).unwrap();
        patcher.reduce_default(&events, &store).unwrap();

        assert_eq!(store.get(&Key::new("/model/user/42")), Some(br#"{"a":1}"#.to_vec()));
    }

    #[test]
    fn schema_version_follows_config() {
        let patcher = JsonPatcher::with_config(PatcherConfig::default().with_schema_version(3));
        assert_eq!(patcher.envelope_codec().schema_version(), 3);

        let (_, envelope) = patcher.create(&[]).unwrap();
        assert!(matches!(
            JsonPatcher::new().events_from_bytes(envelope.bytes()),
            Err(CodecError::MalformedEnvelope(_))
        ));
        assert!(patcher.events_from_bytes(envelope.bytes()).unwrap().is_empty());
    }
}
