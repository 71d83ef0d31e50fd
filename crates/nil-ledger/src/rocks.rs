use crate::backend::{LedgerError, LedgerOp, LedgerStats, LedgerStore, Result};
use async_trait::async_trait;
use rocksdb::{IteratorMode, Options, WriteBatch, DB};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub struct RocksLedger {
    db: Arc<DB>,
    batches: AtomicU64,
}

impl RocksLedger {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);

        opts.set_write_buffer_size(64 * 1024 * 1024); // 64MB
        opts.set_max_write_buffer_number(3);
        opts.set_max_background_jobs(4);
        opts.set_level_compaction_dynamic_level_bytes(true);

        Self::with_options(path, opts)
    }

    pub fn with_options<P: AsRef<Path>>(path: P, opts: Options) -> Result<Self> {
        let db = DB::open(&opts, path)
            .map_err(|e| LedgerError::BackendError(format!("Failed to open RocksDB: {}", e)))?;

        Ok(Self {
            db: Arc::new(db),
            batches: AtomicU64::new(0),
        })
    }
}

#[async_trait]
impl LedgerStore for RocksLedger {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.db
            .get(key)
            .map_err(|e| LedgerError::BackendError(format!("RocksDB get error: {}", e)))
    }

    async fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.db
            .put(key, value)
            .map_err(|e| LedgerError::BackendError(format!("RocksDB put error: {}", e)))
    }

    async fn delete(&self, key: &[u8]) -> Result<()> {
        self.db
            .delete(key)
            .map_err(|e| LedgerError::BackendError(format!("RocksDB delete error: {}", e)))
    }

    async fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let iter = self
            .db
            .iterator(IteratorMode::From(prefix, rocksdb::Direction::Forward));
        let mut entries = Vec::new();

        for item in iter {
            let (key, value) =
                item.map_err(|e| LedgerError::BackendError(format!("Iterator error: {}", e)))?;

            if !key.starts_with(prefix) {
                break;
            }
            entries.push((key.to_vec(), value.to_vec()));
        }

        Ok(entries)
    }

    async fn write_batch(&self, ops: Vec<LedgerOp>) -> Result<()> {
        let mut batch = WriteBatch::default();
        for op in ops {
            match op {
                LedgerOp::Put(k, v) => batch.put(k, v),
                LedgerOp::Delete(k) => batch.delete(k),
            }
        }

        self.db
            .write(batch)
            .map_err(|e| LedgerError::BackendError(format!("RocksDB batch write error: {}", e)))?;
        self.batches.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        self.db
            .flush()
            .map_err(|e| LedgerError::BackendError(format!("RocksDB flush error: {}", e)))
    }

    async fn stats(&self) -> Result<LedgerStats> {
        let entries = self
            .db
            .property_int_value("rocksdb.estimate-num-keys")
            .map_err(|e| LedgerError::BackendError(format!("RocksDB property error: {}", e)))?
            .unwrap_or(0) as usize;

        Ok(LedgerStats {
            entries,
            batches_committed: self.batches.load(Ordering::Relaxed),
        })
    }
}
