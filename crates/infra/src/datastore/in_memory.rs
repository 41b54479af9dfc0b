use std::collections::BTreeMap;
use std::sync::RwLock;

use super::key::Key;
use super::r#trait::{StoreError, Transaction, TxnDatastore};

/// Committed state of one key. Deleted keys keep a tombstone so that their
/// version still moves forward.
#[derive(Debug, Clone)]
struct Slot {
    version: u64,
    value: Option<Vec<u8>>,
}

#[derive(Debug, Default)]
struct Inner {
    slots: BTreeMap<Key, Slot>,
    /// Version stamped on the slots written by the most recent commit.
    clock: u64,
}

/// In-memory transactional key/value store.
///
/// Intended for tests/dev. Not optimized for performance.
///
/// Transactions are optimistic:
/// - reads see the latest committed value (read-committed)
/// - every key a transaction reads or writes records the version it first saw
/// - `commit` fails with [`StoreError::Conflict`] if any of those keys has
///   been committed by someone else since
///
/// Deleted keys keep their tombstone slot for the lifetime of the store, so
/// memory grows with the number of distinct keys ever written.
///
/// A poisoned lock makes transactions fail with [`StoreError::Poisoned`],
/// while the non-transactional inspection helpers (`get`, `snapshot`,
/// `keys_with_prefix`) read it as an empty store.
#[derive(Debug, Default)]
pub struct InMemoryDatastore {
    inner: RwLock<Inner>,
}

impl InMemoryDatastore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed value of `key`, outside any transaction.
    ///
    /// `None` also when the lock is poisoned.
    pub fn get(&self, key: &Key) -> Option<Vec<u8>> {
        let inner = self.inner.read().ok()?;
        inner.slots.get(key).and_then(|slot| slot.value.clone())
    }

    /// All live committed entries (tombstones excluded). Empty when the lock
    /// is poisoned.
    pub fn snapshot(&self) -> BTreeMap<Key, Vec<u8>> {
        let inner = match self.inner.read() {
            Ok(i) => i,
            Err(_) => return BTreeMap::new(),
        };

        inner
            .slots
            .iter()
            .filter_map(|(k, slot)| slot.value.clone().map(|v| (k.clone(), v)))
            .collect()
    }

    /// Live keys strictly below `prefix`, in key order. Empty when the lock is
    /// poisoned.
    pub fn keys_with_prefix(&self, prefix: &Key) -> Vec<Key> {
        let inner = match self.inner.read() {
            Ok(i) => i,
            Err(_) => return vec![],
        };

        inner
            .slots
            .iter()
            .filter(|(k, slot)| slot.value.is_some() && prefix.is_ancestor_of(k))
            .map(|(k, _)| k.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn committed(&self, key: &Key) -> Result<(u64, Option<Vec<u8>>), StoreError> {
        let inner = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(inner
            .slots
            .get(key)
            .map(|slot| (slot.version, slot.value.clone()))
            .unwrap_or((0, None)))
    }
}

impl TxnDatastore for InMemoryDatastore {
    fn begin(&self, read_only: bool) -> Result<Box<dyn Transaction + '_>, StoreError> {
        Ok(Box::new(InMemoryTxn {
            store: self,
            read_only,
            state: TxnState::Open,
            observed: BTreeMap::new(),
            writes: BTreeMap::new(),
        }))
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum TxnState {
    Open,
    Committed,
    Discarded,
}

#[derive(Debug)]
struct InMemoryTxn<'a> {
    store: &'a InMemoryDatastore,
    read_only: bool,
    state: TxnState,
    /// First-seen committed version per touched key.
    observed: BTreeMap<Key, u64>,
    /// Buffered writes; `None` is a pending delete.
    writes: BTreeMap<Key, Option<Vec<u8>>>,
}

impl InMemoryTxn<'_> {
    fn ensure_open(&self) -> Result<(), StoreError> {
        match self.state {
            TxnState::Open => Ok(()),
            TxnState::Committed | TxnState::Discarded => Err(StoreError::TransactionClosed),
        }
    }

    fn ensure_writable(&self) -> Result<(), StoreError> {
        self.ensure_open()?;
        if self.read_only {
            return Err(StoreError::ReadOnly);
        }
        Ok(())
    }

    fn read(&mut self, key: &Key) -> Result<Option<Vec<u8>>, StoreError> {
        self.ensure_open()?;
        if let Some(pending) = self.writes.get(key) {
            return Ok(pending.clone());
        }

        let (version, value) = self.store.committed(key)?;
        self.observed.entry(key.clone()).or_insert(version);
        Ok(value)
    }

    fn observe(&mut self, key: &Key) -> Result<(), StoreError> {
        if !self.observed.contains_key(key) {
            let (version, _) = self.store.committed(key)?;
            self.observed.insert(key.clone(), version);
        }
        Ok(())
    }
}

impl Transaction for InMemoryTxn<'_> {
    fn has(&mut self, key: &Key) -> Result<bool, StoreError> {
        Ok(self.read(key)?.is_some())
    }

    fn get(&mut self, key: &Key) -> Result<Vec<u8>, StoreError> {
        self.read(key)?.ok_or_else(|| StoreError::NotFound(key.clone()))
    }

    fn put(&mut self, key: Key, value: Vec<u8>) -> Result<(), StoreError> {
        self.ensure_writable()?;
        self.observe(&key)?;
        self.writes.insert(key, Some(value));
        Ok(())
    }

    fn delete(&mut self, key: &Key) -> Result<(), StoreError> {
        self.ensure_writable()?;
        self.observe(key)?;
        self.writes.insert(key.clone(), None);
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        self.ensure_open()?;
        if self.writes.is_empty() {
            self.state = TxnState::Committed;
            return Ok(());
        }

        let store = self.store;
        let mut inner = store.inner.write().map_err(|_| StoreError::Poisoned)?;

        for (key, seen) in &self.observed {
            let current = inner.slots.get(key).map(|slot| slot.version).unwrap_or(0);
            if current != *seen {
                self.state = TxnState::Discarded;
                self.writes.clear();
                return Err(StoreError::Conflict(key.clone()));
            }
        }

        inner.clock += 1;
        let version = inner.clock;
        for (key, value) in std::mem::take(&mut self.writes) {
            inner.slots.insert(key, Slot { version, value });
        }
        self.state = TxnState::Committed;
        Ok(())
    }

    fn discard(&mut self) {
        if self.state == TxnState::Open {
            self.state = TxnState::Discarded;
        }
        self.writes.clear();
        self.observed.clear();
    }
}
