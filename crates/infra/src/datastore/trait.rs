use std::sync::Arc;

use thiserror::Error;

use super::key::Key;

/// Transactional key/value store error.
///
/// These are **infrastructure errors**. The reducer passes them through to
/// its caller unchanged; it never retries.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("key not found: {0}")]
    NotFound(Key),

    #[error("write attempted in a read-only transaction")]
    ReadOnly,

    #[error("transaction already committed or discarded")]
    TransactionClosed,

    /// Another transaction committed a change to a key this transaction
    /// observed.
    #[error("write conflict on key {0}")]
    Conflict(Key),

    #[error("store lock poisoned")]
    Poisoned,

    #[error("store backend failure: {0}")]
    Backend(String),
}

/// One transaction against a [`TxnDatastore`].
///
/// Writes are buffered and become visible to others only on `commit`. After
/// `commit` or `discard` every data operation fails with
/// [`StoreError::TransactionClosed`].
pub trait Transaction {
    fn has(&mut self, key: &Key) -> Result<bool, StoreError>;

    /// Read a value; a missing key is [`StoreError::NotFound`].
    fn get(&mut self, key: &Key) -> Result<Vec<u8>, StoreError>;

    fn put(&mut self, key: Key, value: Vec<u8>) -> Result<(), StoreError>;

    /// Remove a key. Removing an absent key succeeds.
    fn delete(&mut self, key: &Key) -> Result<(), StoreError>;

    fn commit(&mut self) -> Result<(), StoreError>;

    /// Release the transaction without applying its writes.
    ///
    /// Idempotent, and a no-op after `commit`.
    fn discard(&mut self);
}

/// Key/value store offering atomic multi-key transactions.
///
/// Isolation is the store's responsibility: implementations must give at
/// least read-committed reads and must fail `commit` on conflicting writes.
pub trait TxnDatastore: Send + Sync {
    fn begin(&self, read_only: bool) -> Result<Box<dyn Transaction + '_>, StoreError>;
}

impl<S> TxnDatastore for Arc<S>
where
    S: TxnDatastore + ?Sized,
{
    fn begin(&self, read_only: bool) -> Result<Box<dyn Transaction + '_>, StoreError> {
        (**self).begin(read_only)
    }
}
