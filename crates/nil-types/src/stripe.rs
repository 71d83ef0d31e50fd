use crate::constants::{BASE_REPLICATION, CHUNKS_PER_UNIT};
use crate::deal::Deal;
use crate::error::{Result, TypesError};
use crate::hint::ServiceHint;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RedundancyMode {
    /// Every provider holds a full replica; assignment is the provider address
    Replication,
    /// RS(K, M) striping; assignment is the slot index
    ErasureCoded,
}

/// Striping geometry of a deal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StripeParams {
    pub mode: RedundancyMode,
    pub k: u64,
    pub m: u64,
    /// Chunks of each unit held by one slot
    pub rows_per_slot: u64,
    pub leaf_count: u64,
    pub slot_count: u64,
}

impl StripeParams {
    pub fn replication() -> Self {
        Self {
            mode: RedundancyMode::Replication,
            k: 0,
            m: 0,
            rows_per_slot: CHUNKS_PER_UNIT as u64,
            leaf_count: CHUNKS_PER_UNIT as u64,
            slot_count: 0,
        }
    }

    pub fn erasure_coded(k: u64, m: u64) -> Result<Self> {
        if k == 0 || m == 0 || CHUNKS_PER_UNIT as u64 % k != 0 {
            return Err(TypesError::InvalidStripe(format!("RS({}, {})", k, m)));
        }
        if k.checked_add(m).map_or(true, |slots| slots > BASE_REPLICATION) {
            return Err(TypesError::InvalidStripe(format!(
                "RS({}, {}) exceeds {} slots",
                k, m, BASE_REPLICATION
            )));
        }
        let rows = CHUNKS_PER_UNIT as u64 / k;
        Ok(Self {
            mode: RedundancyMode::ErasureCoded,
            k,
            m,
            rows_per_slot: rows,
            leaf_count: (k + m) * rows,
            slot_count: k + m,
        })
    }

    /// Resolve from the deal's explicit profile, falling back to its service hint
    pub fn for_deal(deal: &Deal) -> Result<Self> {
        if deal.stripe_k > 0 || deal.stripe_m > 0 {
            return Self::erasure_coded(deal.stripe_k, deal.stripe_m);
        }
        let hint = ServiceHint::parse(&deal.service_hint)?;
        match hint.rs {
            Some((k, m)) => Self::erasure_coded(k, m),
            None => Ok(Self::replication()),
        }
    }

    pub fn is_erasure_coded(&self) -> bool {
        self.mode == RedundancyMode::ErasureCoded
    }
}
