//! Typed accessors for engine state on top of [`LedgerTxn`]

use crate::backend::Result;
use crate::keys;
use crate::txn::LedgerTxn;
use nil_types::{Address, Assignment, Deal, DealId, Provider};

impl LedgerTxn {
    pub async fn deal(&self, id: DealId) -> Result<Option<Deal>> {
        self.get(&keys::deal(id)).await
    }

    pub fn put_deal(&mut self, deal: &Deal) -> Result<()> {
        self.put(keys::deal(deal.id), deal)
    }

    /// Every deal in id order
    pub async fn deals(&self) -> Result<Vec<Deal>> {
        self.scan_values(&keys::deals()).await
    }

    /// Reserve the next sequential deal id, starting at 1
    pub async fn next_deal_id(&mut self) -> Result<DealId> {
        let key = keys::deal_seq();
        let next: u64 = self.get(&key).await?.unwrap_or(1);
        self.put(key, &(next + 1))?;
        Ok(next)
    }

    pub async fn provider(&self, address: &Address) -> Result<Option<Provider>> {
        self.get(&keys::provider(address)).await
    }

    pub fn put_provider(&mut self, provider: &Provider) -> Result<()> {
        self.put(keys::provider(&provider.address), provider)
    }

    /// Registered providers in address (key) order
    pub async fn providers(&self) -> Result<Vec<Provider>> {
        self.scan_values(&keys::providers()).await
    }

    pub async fn chain_height(&self) -> Result<u64> {
        Ok(self.get(&keys::chain_height()).await?.unwrap_or(0))
    }

    pub fn set_chain_height(&mut self, height: u64) -> Result<()> {
        self.put(keys::chain_height(), &height)
    }

    /// Epoch id of the most recent committed end-of-epoch pass, if any
    pub async fn last_closed_epoch(&self) -> Result<Option<u64>> {
        self.get(&keys::last_closed_epoch()).await
    }

    pub fn set_last_closed_epoch(&mut self, epoch_id: u64) -> Result<()> {
        self.put(keys::last_closed_epoch(), &epoch_id)
    }

    pub async fn epoch_seed(&self, epoch_id: u64) -> Result<Option<[u8; 32]>> {
        self.get(&keys::epoch_seed(epoch_id)).await
    }

    pub fn put_epoch_seed(&mut self, epoch_id: u64, seed: &[u8; 32]) -> Result<()> {
        self.put(keys::epoch_seed(epoch_id), seed)
    }

    pub async fn credits(&self, epoch_id: u64, deal: DealId, a: &Assignment) -> Result<u64> {
        Ok(self.get(&keys::credits(epoch_id, deal, a)).await?.unwrap_or(0))
    }

    pub fn set_credits(&mut self, epoch_id: u64, deal: DealId, a: &Assignment, n: u64) -> Result<()> {
        self.put(keys::credits(epoch_id, deal, a), &n)
    }

    pub async fn synthetic(&self, epoch_id: u64, deal: DealId, a: &Assignment) -> Result<u64> {
        Ok(self.get(&keys::synthetic(epoch_id, deal, a)).await?.unwrap_or(0))
    }

    pub fn set_synthetic(&mut self, epoch_id: u64, deal: DealId, a: &Assignment, n: u64) -> Result<()> {
        self.put(keys::synthetic(epoch_id, deal, a), &n)
    }

    /// Height at which a credit id was first recorded
    pub async fn credit_seen(&self, credit_id: &[u8; 32]) -> Result<Option<u64>> {
        self.get(&keys::credit_seen(credit_id)).await
    }

    pub fn mark_credit_seen(&mut self, credit_id: &[u8; 32], height: u64) -> Result<()> {
        self.put(keys::credit_seen(credit_id), &height)
    }

    pub async fn synthetic_seen(&self, credit_id: &[u8; 32]) -> Result<Option<u64>> {
        self.get(&keys::synthetic_seen(credit_id)).await
    }

    pub fn mark_synthetic_seen(&mut self, credit_id: &[u8; 32], height: u64) -> Result<()> {
        self.put(keys::synthetic_seen(credit_id), &height)
    }

    pub async fn missed(&self, deal: DealId, a: &Assignment) -> Result<u64> {
        Ok(self.get(&keys::missed(deal, a)).await?.unwrap_or(0))
    }

    /// Zero clears the counter
    pub fn set_missed(&mut self, deal: DealId, a: &Assignment, n: u64) -> Result<()> {
        if n == 0 {
            self.delete(keys::missed(deal, a));
            return Ok(());
        }
        self.put(keys::missed(deal, a), &n)
    }

    pub async fn receipt_nonce(&self, deal: DealId, file_path: &str) -> Result<u64> {
        Ok(self.get(&keys::receipt_nonce(deal, file_path)).await?.unwrap_or(0))
    }

    pub fn set_receipt_nonce(&mut self, deal: DealId, file_path: &str, nonce: u64) -> Result<()> {
        self.put(keys::receipt_nonce(deal, file_path), &nonce)
    }

    pub async fn provider_failures(&self, deal: DealId, address: &Address) -> Result<u64> {
        Ok(self.get(&keys::provider_failures(deal, address)).await?.unwrap_or(0))
    }

    pub fn set_provider_failures(&mut self, deal: DealId, address: &Address, n: u64) -> Result<()> {
        if n == 0 {
            self.delete(keys::provider_failures(deal, address));
            return Ok(());
        }
        self.put(keys::provider_failures(deal, address), &n)
    }
}
