use crate::backend::{LedgerOp, LedgerStats, LedgerStore, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory ledger for testing and development
pub struct MemoryLedger {
    entries: Arc<RwLock<BTreeMap<Vec<u8>, Vec<u8>>>>,
    batches: AtomicU64,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(BTreeMap::new())),
            batches: AtomicU64::new(0),
        }
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).cloned())
    }

    async fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    async fn delete(&self, key: &[u8]) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.remove(key);
        Ok(())
    }

    async fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let entries = self.entries.read().await;
        Ok(entries
            .range::<[u8], _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    async fn write_batch(&self, ops: Vec<LedgerOp>) -> Result<()> {
        // Single write guard: readers never observe a partial batch
        let mut entries = self.entries.write().await;
        for op in ops {
            match op {
                LedgerOp::Put(k, v) => {
                    entries.insert(k, v);
                }
                LedgerOp::Delete(k) => {
                    entries.remove(&k);
                }
            }
        }
        self.batches.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        Ok(())
    }

    async fn stats(&self) -> Result<LedgerStats> {
        let entries = self.entries.read().await;
        Ok(LedgerStats {
            entries: entries.len(),
            batches_committed: self.batches.load(Ordering::Relaxed),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_prefix_scan_is_ordered_and_bounded() {
        let ledger = MemoryLedger::new();
        ledger.put(b"a:2", b"two").await.unwrap();
        ledger.put(b"a:1", b"one").await.unwrap();
        ledger.put(b"b:1", b"other").await.unwrap();
        ledger.put(b"a", b"bare").await.unwrap();

        let found = ledger.scan_prefix(b"a:").await.unwrap();
        let keys: Vec<_> = found.iter().map(|(k, _)| k.as_slice()).collect();
        assert_eq!(keys, vec![&b"a:1"[..], &b"a:2"[..]]);
    }

    #[tokio::test]
    async fn test_batch_applies_in_order() {
        let ledger = MemoryLedger::new();
        ledger.put(b"k", b"old").await.unwrap();
        ledger
            .write_batch(vec![
                LedgerOp::Delete(b"k".to_vec()),
                LedgerOp::Put(b"k".to_vec(), b"new".to_vec()),
                LedgerOp::Put(b"j".to_vec(), b"x".to_vec()),
            ])
            .await
            .unwrap();
        assert_eq!(ledger.get(b"k").await.unwrap(), Some(b"new".to_vec()));
        let stats = ledger.stats().await.unwrap();
        assert_eq!(stats.entries, 2);
        assert_eq!(stats.batches_committed, 1);
    }
}
