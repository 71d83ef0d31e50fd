//! Persistent state for the liveness engine.
//!
//! A [`LedgerStore`] is a flat ordered key/value map. Engine events stage
//! their mutations in a [`LedgerTxn`] and commit them as one batch.

pub mod backend;
pub mod config;
pub mod key_prefix;
pub mod keys;
pub mod memory;
#[cfg(feature = "rocksdb")]
pub mod rocks;
mod state;
pub mod txn;

pub use backend::{LedgerError, LedgerOp, LedgerStats, LedgerStore, Result};
pub use config::{BackendType, StorageConfig};
pub use memory::MemoryLedger;
#[cfg(feature = "rocksdb")]
pub use rocks::RocksLedger;
pub use txn::{LedgerTxn, Savepoint};
