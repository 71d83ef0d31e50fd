use crate::backend::{LedgerOp, LedgerStore, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;
use tracing::debug;

/// Write overlay over a [`LedgerStore`].
///
/// Reads see staged writes first. Nothing reaches the store until
/// [`LedgerTxn::commit`], which applies every staged write in one batch.
/// Dropping the transaction discards them.
pub struct LedgerTxn {
    store: Arc<dyn LedgerStore>,
    // None marks a staged delete
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

pub struct Savepoint(BTreeMap<Vec<u8>, Option<Vec<u8>>>);

impl LedgerTxn {
    pub fn begin(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            store,
            writes: BTreeMap::new(),
        }
    }

    /// Snapshot of the staged writes for [`LedgerTxn::rollback_to`]
    pub fn savepoint(&self) -> Savepoint {
        Savepoint(self.writes.clone())
    }

    /// Discard everything staged since `savepoint`
    pub fn rollback_to(&mut self, savepoint: Savepoint) {
        self.writes = savepoint.0;
    }

    pub fn staged(&self) -> usize {
        self.writes.len()
    }

    pub async fn get_raw(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        match self.writes.get(key) {
            Some(staged) => Ok(staged.clone()),
            None => self.store.get(key).await,
        }
    }

    pub fn put_raw(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.writes.insert(key, Some(value));
    }

    pub fn delete(&mut self, key: Vec<u8>) {
        self.writes.insert(key, None);
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &[u8]) -> Result<Option<T>> {
        match self.get_raw(key).await? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn put<T: Serialize>(&mut self, key: Vec<u8>, value: &T) -> Result<()> {
        let bytes = bincode::serialize(value)?;
        self.put_raw(key, bytes);
        Ok(())
    }

    /// Store entries under `prefix` merged with staged writes, in key order
    pub async fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> =
            self.store.scan_prefix(prefix).await?.into_iter().collect();

        let staged = self
            .writes
            .range::<[u8], _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(|(k, _)| k.starts_with(prefix));
        for (key, value) in staged {
            match value {
                Some(v) => {
                    merged.insert(key.clone(), v.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }

        Ok(merged.into_iter().collect())
    }

    pub async fn scan_values<T: DeserializeOwned>(&self, prefix: &[u8]) -> Result<Vec<T>> {
        self.scan_prefix(prefix)
            .await?
            .iter()
            .map(|(_, v)| Ok(bincode::deserialize(v)?))
            .collect()
    }

    pub async fn commit(self) -> Result<()> {
        if self.writes.is_empty() {
            return Ok(());
        }
        let count = self.writes.len();
        let ops = self
            .writes
            .into_iter()
            .map(|(k, v)| match v {
                Some(v) => LedgerOp::Put(k, v),
                None => LedgerOp::Delete(k),
            })
            .collect();
        self.store.write_batch(ops).await?;
        debug!(writes = count, "📝 Ledger transaction committed");
        Ok(())
    }

    pub fn rollback(self) {
        debug!(discarded = self.writes.len(), "↩️ Ledger transaction rolled back");
    }
}
