use nil_types::{Address, Assignment, DealId};
use serde::{Deserialize, Serialize};

/// Notable outcomes of an engine event, returned to the caller for emission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LivenessEvent {
    EpochSeedPersisted {
        epoch_id: u64,
        height: u64,
    },
    QuotaShortfall {
        deal_id: DealId,
        epoch_id: u64,
        assignment: Assignment,
        quota: u64,
        satisfied: u64,
        missed_epochs: u64,
    },
    SlotRepairStarted {
        deal_id: DealId,
        slot: u32,
        old_provider: Address,
        pending_provider: Address,
        automatic: bool,
    },
    SlotRepairCompleted {
        deal_id: DealId,
        slot: u32,
        provider: Address,
        generation: u64,
    },
}

impl LivenessEvent {
    pub fn name(&self) -> &'static str {
        match self {
            LivenessEvent::EpochSeedPersisted { .. } => "epoch_seed_persisted",
            LivenessEvent::QuotaShortfall { .. } => "liveness_quota_shortfall",
            LivenessEvent::SlotRepairStarted { .. } => "slot_repair_started",
            LivenessEvent::SlotRepairCompleted { .. } => "slot_repair_completed",
        }
    }
}
