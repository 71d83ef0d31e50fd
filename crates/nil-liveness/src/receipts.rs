//! Envelope checks for retrieval and session receipts.
//!
//! These run before any proof verification and reject receipts that are
//! addressed to the wrong deal, epoch or provider, malformed, or expired.

use crate::error::{LivenessError, Result};
use nil_ledger::LedgerTxn;
use nil_proof::{RetrievalReceipt, SessionProof};
use nil_slab::SlabGeometry;
use nil_types::{Address, Deal, DealId};
use std::collections::BTreeSet;

/// Who a receipt must be addressed to
#[derive(Debug, Clone, Copy)]
pub struct Envelope<'a> {
    pub deal_id: DealId,
    pub epoch_id: u64,
    pub provider: &'a Address,
    pub height: u64,
}

impl Envelope<'_> {
    fn check_addressing(&self, deal_id: DealId, epoch_id: u64, provider: &Address) -> Result<()> {
        if deal_id != self.deal_id {
            return Err(LivenessError::InvalidRequest(format!(
                "receipt is for deal {}, not {}",
                deal_id, self.deal_id
            )));
        }
        if epoch_id != self.epoch_id {
            return Err(LivenessError::EpochMismatch {
                expected: self.epoch_id,
                got: epoch_id,
            });
        }
        if provider != self.provider {
            return Err(LivenessError::InvalidRequest(format!(
                "receipt names provider {}, submitted by {}",
                provider, self.provider
            )));
        }
        Ok(())
    }

    fn check_expiry(&self, expires_at: u64) -> Result<()> {
        if expires_at != 0 && self.height > expires_at {
            return Err(LivenessError::ReceiptExpired {
                expires_at,
                height: self.height,
            });
        }
        Ok(())
    }
}

/// Trimmed, non-empty file path used as the nonce scope
pub fn normalize_path(path: &str) -> Result<&str> {
    let path = path.trim();
    if path.is_empty() {
        return Err(LivenessError::InvalidRequest(
            "receipt file path is empty".to_string(),
        ));
    }
    Ok(path)
}

pub fn check_receipt_envelope(env: &Envelope<'_>, deal: &Deal, receipt: &RetrievalReceipt) -> Result<()> {
    env.check_addressing(receipt.deal_id, receipt.epoch_id, &receipt.provider)?;
    normalize_path(&receipt.file_path)?;

    if receipt.range_len == 0 {
        return Err(LivenessError::InvalidRequest("receipt range is empty".to_string()));
    }
    if receipt.bytes_served != receipt.range_len {
        return Err(LivenessError::InvalidRequest(format!(
            "bytes_served {} does not match range_len {}",
            receipt.bytes_served, receipt.range_len
        )));
    }
    env.check_expiry(receipt.expires_at)?;

    // The embedded proof must address a chunk the served range touched
    let geometry = SlabGeometry::new(deal.total_units, deal.witness_units)?;
    let touched = geometry.chunks_for_range(receipt.range_start, receipt.range_len)?;
    let target = (receipt.proof.unit_index, receipt.proof.chunk_index);
    if !touched.contains(&target) {
        return Err(LivenessError::InvalidRequest(format!(
            "proof for unit {} chunk {} lies outside the served range",
            target.0, target.1
        )));
    }
    Ok(())
}

pub fn check_session_envelope(env: &Envelope<'_>, session: &SessionProof) -> Result<()> {
    let receipt = &session.receipt;
    env.check_addressing(receipt.deal_id, receipt.epoch_id, &receipt.provider)?;
    normalize_path(&receipt.file_path)?;

    if receipt.total_bytes == 0 || receipt.chunk_count == 0 {
        return Err(LivenessError::InvalidRequest(
            "session must cover at least one byte and one chunk".to_string(),
        ));
    }
    if receipt.chunk_leaf_root.len() != 32 {
        return Err(LivenessError::InvalidRequest(format!(
            "chunk_leaf_root must be 32 bytes, got {}",
            receipt.chunk_leaf_root.len()
        )));
    }
    env.check_expiry(receipt.expires_at)?;

    if session.chunks.len() as u64 != receipt.chunk_count {
        return Err(LivenessError::InvalidRequest(format!(
            "session declares {} chunks, carries {}",
            receipt.chunk_count,
            session.chunks.len()
        )));
    }

    let mut leaves = BTreeSet::new();
    let mut total: u64 = 0;
    for chunk in &session.chunks {
        if chunk.leaf_index as u64 >= receipt.chunk_count {
            return Err(LivenessError::InvalidRequest(format!(
                "leaf index {} out of range",
                chunk.leaf_index
            )));
        }
        if !leaves.insert(chunk.leaf_index) {
            return Err(LivenessError::InvalidRequest(format!(
                "duplicate leaf index {}",
                chunk.leaf_index
            )));
        }
        total = total
            .checked_add(chunk.range_len)
            .ok_or_else(|| LivenessError::InvalidRequest("session byte count overflows".to_string()))?;
    }
    if total != receipt.total_bytes {
        return Err(LivenessError::InvalidRequest(format!(
            "chunks cover {} bytes, receipt claims {}",
            total, receipt.total_bytes
        )));
    }
    Ok(())
}

/// Reject nonces at or below the last accepted one for `(deal, path)`
pub async fn check_nonce(txn: &LedgerTxn, deal_id: DealId, file_path: &str, nonce: u64) -> Result<()> {
    let path = normalize_path(file_path)?;
    let last = txn.receipt_nonce(deal_id, path).await?;
    if nonce <= last {
        return Err(LivenessError::NonceReplay {
            file_path: path.to_string(),
            nonce,
            last,
        });
    }
    Ok(())
}

pub fn store_nonce(txn: &mut LedgerTxn, deal_id: DealId, file_path: &str, nonce: u64) -> Result<()> {
    let path = normalize_path(file_path)?;
    txn.set_receipt_nonce(deal_id, path, nonce)?;
    Ok(())
}
