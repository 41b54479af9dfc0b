//! Infrastructure layer: transactional store boundary, reducer, codec wiring,
//! and configuration.

pub mod codec;
pub mod config;
pub mod datastore;
pub mod reducer;


pub use codec::{EventCodec, JsonPatcher};
pub use config::{ConfigError, PatcherConfig};
pub use datastore::{InMemoryDatastore, Key, StoreError, Transaction, TxnDatastore};
pub use reducer::{ReduceError, ReduceOutcome, reduce};
