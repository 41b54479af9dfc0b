//! Black-box replay scenarios: actions → envelope bytes → events → store.

use anyhow::Result;
use serde_json::{Value, json};

use patchlog_core::JsonInput;
use patchlog_events::{Action, CodecError, EnvelopeCodec, Event, Operation, OperationKind, PatchEvent};
use patchlog_infra::{
    EventCodec, InMemoryDatastore, JsonPatcher, Key, ReduceError, StoreError, Transaction,
    TxnDatastore,
};

fn base() -> Key {
    Key::new("/model")
}

fn user_key(id: &str) -> Key {
    base().entity(&"user".parse().unwrap(), &id.parse().unwrap())
}

fn create(id: &str, body: impl Into<JsonInput>) -> Action {
    Action::create("user".parse().unwrap(), id.parse().unwrap(), body)
}

fn save(id: &str, previous: Value, current: Value) -> Action {
    Action::save("user".parse().unwrap(), id.parse().unwrap(), previous, current)
}

fn delete(id: &str) -> Action {
    Action::delete("user".parse().unwrap(), id.parse().unwrap())
}

/// Encode on the "writer" side and decode from bytes on the "replica" side.
fn ship(patcher: &JsonPatcher, actions: &[Action]) -> Result<Vec<PatchEvent>> {
    let (_, envelope) = patcher.create(actions)?;
    Ok(patcher.events_from_bytes(envelope.bytes())?)
}

fn stored_json(store: &InMemoryDatastore, key: &Key) -> Option<Value> {
    store
        .get(key)
        .map(|bytes| serde_json::from_slice(&bytes).expect("stored body is json"))
}

#[test]
fn create_then_duplicate_create_is_rejected() -> Result<()> {
    patchlog_observability::init();
    let patcher = JsonPatcher::new();
    let store = InMemoryDatastore::new();

    let events = ship(&patcher, &[create("42", json!({"a": 1}))])?;
    let outcomes = patcher.reduce(&events, &store, &base())?;
    assert_eq!(outcomes.len(), 1);
    assert_eq!(store.get(&Key::new("/model/user/42")), Some(br#"{"a":1}"#.to_vec()));

    let again = ship(&patcher, &[create("42", json!({"a": 2}))])?;
    let err = patcher.reduce(&again, &store, &base()).unwrap_err();
    match &err {
        ReduceError::CreateOnExisting { model, entity } => {
            assert_eq!(model.as_str(), "user");
            assert_eq!(entity.as_str(), "42");
        }
        other => panic!("expected CreateOnExisting, got {other:?}"),
    }
    assert_eq!(stored_json(&store, &user_key("42")), Some(json!({"a": 1})));
    Ok(())
}

#[test]
fn save_diff_reproduces_current_state() -> Result<()> {
    let patcher = JsonPatcher::new();
    let store = InMemoryDatastore::new();

    let previous = json!({"a": 1, "b": 2});
    let current = json!({"a": 1, "c": 3});

    let (events, _) = patcher.create(&[
        create("7", previous.clone()),
        save("7", previous, current.clone()),
    ])?;

    let patch: Value = serde_json::from_slice(events[1].operation().payload())?;
    assert_eq!(patch, json!({"b": null, "c": 3}));

    patcher.reduce(&events, &store, &base())?;
    assert_eq!(stored_json(&store, &user_key("7")), Some(current));
    Ok(())
}

#[test]
fn save_on_missing_entity_creates_nothing() -> Result<()> {
    let patcher = JsonPatcher::new();
    let store = InMemoryDatastore::new();

    let events = ship(&patcher, &[save("9", json!({}), json!({"x": 1}))])?;
    let err = patcher.reduce(&events, &store, &base()).unwrap_err();

    assert!(matches!(err, ReduceError::SaveOnMissing { .. }));
    assert!(store.is_empty());
    Ok(())
}

#[test]
fn delete_of_missing_entity_is_a_no_op() -> Result<()> {
    let patcher = JsonPatcher::new();
    let store = InMemoryDatastore::new();

    let events = ship(&patcher, &[delete("nobody")])?;
    let outcomes = patcher.reduce(&events, &store, &base())?;

    assert_eq!(outcomes.len(), 1);
    assert!(store.is_empty());
    Ok(())
}

#[test]
fn failed_batch_rolls_back_earlier_events() -> Result<()> {
    let patcher = JsonPatcher::new();
    let store = InMemoryDatastore::new();

    // Pre-existing state must survive byte-for-byte.
    patcher.reduce(&ship(&patcher, &[create("keep", json!({"k": true}))])?, &store, &base())?;
    let before = store.snapshot();

    let events = ship(
        &patcher,
        &[
            create("A", json!({"x": 1})),
            save("keep", json!({"k": true}), json!({"k": false})),
            save("B", json!({}), json!({"y": 2})),
        ],
    )?;
    let err = patcher.reduce(&events, &store, &base()).unwrap_err();

    assert!(matches!(err, ReduceError::SaveOnMissing { ref entity, .. } if entity.as_str() == "B"));
    assert_eq!(store.get(&user_key("A")), None);
    assert_eq!(store.snapshot(), before);
    Ok(())
}

#[test]
fn events_are_applied_in_supplied_order() -> Result<()> {
    let patcher = JsonPatcher::new();
    let store = InMemoryDatastore::new();

    let (events, _) = patcher.create(&[
        create("1", json!({"n": 0})),
        save("1", json!({"n": 0}), json!({"n": 1})),
        save("1", json!({"n": 1}), json!({"n": 2, "done": true})),
    ])?;

    // Reversed order must fail: the first save finds nothing to patch.
    let reversed: Vec<_> = events.iter().rev().cloned().collect();
    assert!(patcher.reduce(&reversed, &store, &base()).is_err());
    assert!(store.is_empty());

    let outcomes = patcher.reduce(&events, &store, &base())?;
    let ids: Vec<_> = outcomes.iter().map(|o| o.entity_id.as_str()).collect();
    assert_eq!(ids, vec!["1", "1", "1"]);
    assert_eq!(stored_json(&store, &user_key("1")), Some(json!({"n": 2, "done": true})));
    Ok(())
}

#[test]
fn replicas_converge_from_the_same_envelope() -> Result<()> {
    let patcher = JsonPatcher::new();
    let replica_a = InMemoryDatastore::new();
    let replica_b = InMemoryDatastore::new();

    let (_, envelope) = patcher.create(&[
        create("1", json!({"name": "ada", "tags": ["x"]})),
        save(
            "1",
            json!({"name": "ada", "tags": ["x"]}),
            json!({"name": "ada", "tags": ["x", "y"], "age": 36}),
        ),
        create("2", JsonInput::raw(r#"{"z": 1, "a": 2}"#)),
    ])?;

    for replica in [&replica_a, &replica_b] {
        let events = patcher.events_from_envelope(&envelope)?;
        patcher.reduce(&events, replica, &base())?;
    }

    assert_eq!(replica_a.snapshot(), replica_b.snapshot());
    assert_eq!(replica_a.get(&user_key("2")), Some(br#"{"a":2,"z":1}"#.to_vec()));
    Ok(())
}

#[test]
fn round_trip_preserves_timestamps_and_payloads() -> Result<()> {
    let codec = EnvelopeCodec::new();
    let (events, envelope) = codec.create(&[
        create("1", json!({"a": 1})),
        delete("1"),
    ])?;

    let decoded = codec.decode(envelope.bytes())?;
    assert_eq!(decoded, events);
    for (a, b) in decoded.iter().zip(&events) {
        assert_eq!(a.timestamp(), b.timestamp());
        assert_eq!(a.time_bytes(), b.time_bytes());
        assert_eq!(a.operation().payload(), b.operation().payload());
    }
    Ok(())
}

#[test]
fn translation_failure_aborts_the_whole_batch() {
    let patcher = JsonPatcher::new();
    let mut incomplete = create("2", json!({}));
    incomplete.current = None;

    let err = patcher
        .create(&[create("1", json!({})), incomplete])
        .unwrap_err();
    assert!(matches!(err, CodecError::MissingState { .. }));
    assert!(err.is_contract_violation());
}

#[test]
fn foreign_operation_is_rejected_after_decode() -> Result<()> {
    let patcher = JsonPatcher::new();
    let store = InMemoryDatastore::new();

    let foreign = PatchEvent::new(
        chrono::Utc::now(),
        "user".parse()?,
        Operation::from_parts(OperationKind::from(99), "1".parse()?, b"{}".to_vec()),
    );
    let envelope = patcher.envelope_codec().encode(&[foreign])?;
    let events = patcher.events_from_bytes(envelope.bytes())?;

    let err = patcher.reduce(&events, &store, &base()).unwrap_err();
    assert!(matches!(err, ReduceError::UnknownOperation { code: 99, .. }));
    Ok(())
}

/// Store whose commits always fail, to check error pass-through.
struct FailingCommitStore {
    inner: InMemoryDatastore,
}

struct FailingCommitTxn<'a> {
    inner: Box<dyn Transaction + 'a>,
}

impl Transaction for FailingCommitTxn<'_> {
    fn has(&mut self, key: &Key) -> Result<bool, StoreError> {
        self.inner.has(key)
    }

    fn get(&mut self, key: &Key) -> Result<Vec<u8>, StoreError> {
        self.inner.get(key)
    }

    fn put(&mut self, key: Key, value: Vec<u8>) -> Result<(), StoreError> {
        self.inner.put(key, value)
    }

    fn delete(&mut self, key: &Key) -> Result<(), StoreError> {
        self.inner.delete(key)
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        Err(StoreError::Backend("disk full".to_string()))
    }

    fn discard(&mut self) {
        self.inner.discard()
    }
}

impl TxnDatastore for FailingCommitStore {
    fn begin(&self, read_only: bool) -> Result<Box<dyn Transaction + '_>, StoreError> {
        Ok(Box::new(FailingCommitTxn {
            inner: self.inner.begin(read_only)?,
        }))
    }
}

#[test]
fn store_errors_pass_through_unchanged() -> Result<()> {
    let patcher = JsonPatcher::new();
    let store = FailingCommitStore {
        inner: InMemoryDatastore::new(),
    };

    let events = ship(&patcher, &[create("1", json!({"a": 1}))])?;
    let err = patcher.reduce(&events, &store, &base()).unwrap_err();

    assert!(matches!(err, ReduceError::Store(StoreError::Backend(ref msg)) if msg == "disk full"));
    assert!(err.entity().is_none());
    assert!(store.inner.is_empty());
    Ok(())
}
