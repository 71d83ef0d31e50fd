use crate::backend::{LedgerStore, Result};
use crate::memory::MemoryLedger;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend_type: BackendType,
}

impl Default for StorageConfig {
    fn default() -> Self {
        // Default to RocksDB for persistence if available
        #[cfg(feature = "rocksdb")]
        let backend_type = BackendType::RocksDB {
            path: std::env::var("NIL_DATA_DIR").unwrap_or_else(|_| "./data/ledger".to_string()),
        };

        #[cfg(not(feature = "rocksdb"))]
        let backend_type = BackendType::Memory;

        Self { backend_type }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackendType {
    Memory,
    #[cfg(feature = "rocksdb")]
    RocksDB { path: String },
}

impl StorageConfig {
    pub fn memory() -> Self {
        Self {
            backend_type: BackendType::Memory,
        }
    }

    /// Point a persistent backend at `path`; a no-op for the memory backend
    pub fn set_data_dir(&mut self, path: &str) {
        match &mut self.backend_type {
            BackendType::Memory => {
                let _ = path;
            }
            #[cfg(feature = "rocksdb")]
            BackendType::RocksDB { path: current } => *current = path.to_string(),
        }
    }

    pub fn open(&self) -> Result<Arc<dyn LedgerStore>> {
        let store: Arc<dyn LedgerStore> = match &self.backend_type {
            BackendType::Memory => Arc::new(MemoryLedger::new()),
            #[cfg(feature = "rocksdb")]
            BackendType::RocksDB { path } => Arc::new(crate::rocks::RocksLedger::new(path)?),
        };
        tracing::info!(backend = ?self.backend_type, "💾 Ledger store opened");
        Ok(store)
    }
}
