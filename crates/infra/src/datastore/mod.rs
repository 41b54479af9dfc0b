//! Transactional key/value store boundary.
//!
//! The reducer materializes entity state through this abstraction without
//! making any storage assumptions beyond atomic multi-key transactions.

pub mod in_memory;
pub mod key;
pub mod r#trait;

pub use in_memory::InMemoryDatastore;
pub use key::Key;
pub use r#trait::{StoreError, Transaction, TxnDatastore};

/// Discards the wrapped transaction when dropped.
///
/// Guarantees release on every exit path, including early `?` returns.
/// Discarding after a successful commit is a no-op.
pub(crate) struct DiscardOnDrop<'a>(Box<dyn Transaction + 'a>);

impl<'a> DiscardOnDrop<'a> {
    pub(crate) fn new(txn: Box<dyn Transaction + 'a>) -> Self {
        Self(txn)
    }
}

impl<'a> core::ops::Deref for DiscardOnDrop<'a> {
    type Target = dyn Transaction + 'a;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

impl core::ops::DerefMut for DiscardOnDrop<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.0
    }
}

impl Drop for DiscardOnDrop<'_> {
    fn drop(&mut self) {
        self.0.discard();
    }
}
