use crate::address::Address;
use crate::constants::COMMITMENT_SIZE;
use crate::error::{Result, TypesError};
use crate::lifecycle::LifecycleState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub type DealId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlotStatus {
    Active,
    Repairing,
}

impl LifecycleState for SlotStatus {
    fn is_terminal(&self) -> bool {
        false
    }

    fn can_transition_to(&self, next: &Self) -> bool {
        use SlotStatus::*;
        matches!((self, next), (Active, Repairing) | (Repairing, Active))
    }
}

/// One placement position of an erasure-coded deal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub index: u32,
    pub provider: Address,
    pub pending_provider: Option<Address>,
    pub status: SlotStatus,
    pub status_since_height: u64,
    pub repair_target_gen: u64,
}

impl Slot {
    pub fn new(index: u32, provider: Address, height: u64) -> Self {
        Self {
            index,
            provider,
            pending_provider: None,
            status: SlotStatus::Active,
            status_since_height: height,
            repair_target_gen: 0,
        }
    }

    pub fn is_repairing(&self) -> bool {
        self.status == SlotStatus::Repairing
    }

    pub fn transition_to(&mut self, new_status: SlotStatus, height: u64) -> Result<()> {
        if !self.status.can_transition_to(&new_status) {
            return Err(TypesError::InvalidStateTransition {
                from: format!("{:?}", self.status),
                to: format!("{:?}", new_status),
            });
        }

        tracing::debug!(
            slot = self.index,
            from = ?self.status,
            to = ?new_status,
            height,
            "Slot state transition"
        );

        self.status = new_status;
        self.status_since_height = height;
        Ok(())
    }
}

/// Unit of liveness accounting: a replica holder or an erasure-coded slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Assignment {
    Provider(Address),
    Slot(u32),
}

impl Assignment {
    /// Bytes mixed into challenge and credit hashes
    pub fn hash_bytes(&self) -> Vec<u8> {
        match self {
            Assignment::Provider(addr) => addr.as_bytes().to_vec(),
            Assignment::Slot(slot) => (*slot as u64).to_be_bytes().to_vec(),
        }
    }

    /// Tagged bytes for composite store keys
    pub fn key_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(21);
        match self {
            Assignment::Provider(addr) => {
                out.push(0);
                out.extend_from_slice(addr.as_bytes());
            }
            Assignment::Slot(slot) => {
                out.push(1);
                out.extend_from_slice(&slot.to_be_bytes());
            }
        }
        out
    }
}

impl std::fmt::Display for Assignment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Assignment::Provider(addr) => write!(f, "provider:{}", addr),
            Assignment::Slot(slot) => write!(f, "slot:{}", slot),
        }
    }
}

/// On-chain storage deal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deal {
    pub id: DealId,
    pub owner: Address,
    /// 48-byte manifest commitment; empty until content is committed
    pub manifest_root: Vec<u8>,
    pub total_units: u64,
    pub witness_units: u64,
    pub providers: Vec<Address>,
    pub slots: Vec<Slot>,
    pub escrow_balance: u128,
    pub current_gen: u64,
    pub service_hint: String,
    pub start_block: u64,
    pub end_block: u64,
    /// Explicit RS profile; zero means "derive from service hint"
    pub stripe_k: u64,
    pub stripe_m: u64,
}

impl Deal {
    /// Unit 0 plus witness units
    pub fn meta_units(&self) -> u64 {
        1 + self.witness_units
    }

    pub fn user_units(&self) -> u64 {
        self.total_units.saturating_sub(self.meta_units())
    }

    pub fn has_content(&self) -> bool {
        self.total_units > 0 && self.manifest_root.len() == COMMITMENT_SIZE
    }

    pub fn is_active_at(&self, height: u64) -> bool {
        height >= self.start_block && height <= self.end_block
    }

    pub fn is_assigned(&self, provider: &Address) -> bool {
        self.providers.contains(provider)
    }

    pub fn slot_of(&self, provider: &Address) -> Option<&Slot> {
        self.slots.iter().find(|s| &s.provider == provider)
    }

    /// Providers holding or pending on any slot of this deal
    pub fn reserved_providers(&self) -> BTreeSet<Address> {
        let mut reserved = BTreeSet::new();
        for slot in &self.slots {
            if !slot.provider.is_zero() {
                reserved.insert(slot.provider);
            }
            if let Some(pending) = slot.pending_provider {
                reserved.insert(pending);
            }
        }
        reserved
    }
}
