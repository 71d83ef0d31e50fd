use crate::error::{LivenessError, Result};
use crate::events::LivenessEvent;
use nil_ledger::LedgerTxn;
use nil_types::{
    Address, Assignment, Deal, DealId, HintBase, Provider, ServiceHint, SlotStatus, StripeParams,
};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, warn};

pub const REPAIR_TAG: &[u8] = b"nilstore/repair/v1";

/// Active, capability-compatible providers outside `reserved`, in input order
pub fn eligible_candidates(
    providers: &[Provider],
    base: HintBase,
    reserved: &BTreeSet<Address>,
) -> Vec<Address> {
    providers
        .iter()
        .filter(|p| p.is_eligible_for(base) && !reserved.contains(&p.address))
        .map(|p| p.address)
        .collect()
}

/// Deterministic unweighted pick from `candidates`
pub fn select_candidate(
    candidates: &[Address],
    seed: &[u8; 32],
    deal_id: DealId,
    gen: u64,
    slot: u32,
) -> Option<Address> {
    if candidates.is_empty() {
        return None;
    }
    let mut h = Sha256::new();
    h.update(REPAIR_TAG);
    h.update(seed);
    h.update(deal_id.to_be_bytes());
    h.update(gen.to_be_bytes());
    h.update((slot as u64).to_be_bytes());
    let digest: [u8; 32] = h.finalize().into();

    let mut word = [0u8; 8];
    word.copy_from_slice(&digest[..8]);
    let idx = u64::from_be_bytes(word) % candidates.len() as u64;
    candidates.get(idx as usize).copied()
}

/// Slot repair state machine for erasure-coded deals
pub struct SlotRepairController {
    // Metrics
    pub repairs_started: Option<Arc<prometheus::IntCounter>>,
    pub repairs_completed: Option<Arc<prometheus::IntCounter>>,
    pub slots_repairing: Option<Arc<prometheus::IntGauge>>,
}

impl Default for SlotRepairController {
    fn default() -> Self {
        Self::new()
    }
}

impl SlotRepairController {
    pub fn new() -> Self {
        Self {
            repairs_started: None,
            repairs_completed: None,
            slots_repairing: None,
        }
    }

    /// Set metrics for tracking repair operations
    pub fn set_metrics(
        &mut self,
        repairs_started: Arc<prometheus::IntCounter>,
        repairs_completed: Arc<prometheus::IntCounter>,
        slots_repairing: Arc<prometheus::IntGauge>,
    ) {
        self.repairs_started = Some(repairs_started);
        self.repairs_completed = Some(repairs_completed);
        self.slots_repairing = Some(slots_repairing);
    }

    /// Reset the repairing gauge to a count taken from the ledger
    pub fn set_repairing(&self, slots: u64) {
        if let Some(ref gauge) = self.slots_repairing {
            gauge.set(slots as i64);
        }
    }

    /// Apply the metric deltas of committed repair events
    pub fn apply_metrics(&self, events: &[LivenessEvent]) {
        for event in events {
            match event {
                LivenessEvent::SlotRepairStarted { .. } => {
                    if let Some(ref counter) = self.repairs_started {
                        counter.inc();
                    }
                    if let Some(ref gauge) = self.slots_repairing {
                        gauge.inc();
                    }
                }
                LivenessEvent::SlotRepairCompleted { .. } => {
                    if let Some(ref counter) = self.repairs_completed {
                        counter.inc();
                    }
                    if let Some(ref gauge) = self.slots_repairing {
                        gauge.dec();
                    }
                }
                _ => {}
            }
        }
    }

    async fn load_owned_deal(
        &self,
        txn: &LedgerTxn,
        deal_id: DealId,
        caller: &Address,
    ) -> Result<Deal> {
        let deal = txn
            .deal(deal_id)
            .await?
            .ok_or(LivenessError::DealNotFound(deal_id))?;
        if &deal.owner != caller {
            return Err(LivenessError::Unauthorized(format!(
                "{} does not own deal {}",
                caller, deal_id
            )));
        }
        if !StripeParams::for_deal(&deal)?.is_erasure_coded() {
            return Err(LivenessError::NotErasureCoded(deal_id));
        }
        Ok(deal)
    }

    fn slot_position(deal: &Deal, slot: u32) -> Result<usize> {
        deal.slots
            .iter()
            .position(|s| s.index == slot)
            .ok_or(LivenessError::SlotNotFound {
                deal_id: deal.id,
                slot,
            })
    }

    /// Move a slot to Repairing toward `pending`; no eligibility checks
    fn begin_repair(&self, deal: &mut Deal, slot: u32, pending: Address, height: u64) -> Result<Address> {
        let pos = Self::slot_position(deal, slot)?;
        let target_gen = deal.current_gen;
        let entry = &mut deal.slots[pos];
        entry.transition_to(SlotStatus::Repairing, height)?;
        entry.pending_provider = Some(pending);
        entry.repair_target_gen = target_gen;
        Ok(entry.provider)
    }

    /// Owner-initiated repair of `slot` toward `pending`
    pub async fn start_repair(
        &self,
        txn: &mut LedgerTxn,
        deal_id: DealId,
        caller: &Address,
        slot: u32,
        pending: &Address,
        height: u64,
    ) -> Result<LivenessEvent> {
        let mut deal = self.load_owned_deal(txn, deal_id, caller).await?;
        let pos = Self::slot_position(&deal, slot)?;
        let current = &deal.slots[pos];

        if current.is_repairing() {
            return Err(LivenessError::InvalidTransition {
                from: format!("{:?}", current.status),
                to: format!("{:?}", SlotStatus::Repairing),
            });
        }
        if pending.is_zero() {
            return Err(LivenessError::InvalidPendingProvider(
                "pending provider is blank".to_string(),
            ));
        }
        if pending == &current.provider {
            return Err(LivenessError::InvalidPendingProvider(format!(
                "{} already holds slot {}",
                pending, slot
            )));
        }

        let provider = txn
            .provider(pending)
            .await?
            .ok_or(LivenessError::ProviderNotFound(*pending))?;
        let base = ServiceHint::parse(&deal.service_hint)?.base;
        if !provider.is_eligible_for(base) {
            return Err(LivenessError::ProviderIneligible {
                provider: *pending,
                reason: format!(
                    "status {:?} with {} capabilities cannot serve {:?} deals",
                    provider.status, provider.capabilities, base
                ),
            });
        }
        if deal.reserved_providers().contains(pending) {
            return Err(LivenessError::AlreadyAssigned(*pending));
        }

        let old_provider = self.begin_repair(&mut deal, slot, *pending, height)?;
        txn.put_deal(&deal)?;

        info!(
            deal_id,
            slot,
            old_provider = %old_provider,
            pending_provider = %pending,
            height,
            "🔧 Slot repair started"
        );

        Ok(LivenessEvent::SlotRepairStarted {
            deal_id,
            slot,
            old_provider,
            pending_provider: *pending,
            automatic: false,
        })
    }

    /// Promote the pending provider of a repairing slot
    pub async fn complete_repair(
        &self,
        txn: &mut LedgerTxn,
        deal_id: DealId,
        caller: &Address,
        slot: u32,
        height: u64,
    ) -> Result<LivenessEvent> {
        let mut deal = self.load_owned_deal(txn, deal_id, caller).await?;
        let pos = Self::slot_position(&deal, slot)?;

        let entry = &mut deal.slots[pos];
        let pending = match entry.pending_provider {
            Some(p) if entry.is_repairing() => p,
            _ => {
                return Err(LivenessError::InvalidTransition {
                    from: format!("{:?}", entry.status),
                    to: format!("{:?}", SlotStatus::Active),
                });
            }
        };

        entry.transition_to(SlotStatus::Active, height)?;
        entry.provider = pending;
        entry.pending_provider = None;
        entry.repair_target_gen = 0;

        if let Some(holder) = deal.providers.get_mut(pos) {
            *holder = pending;
        }
        deal.current_gen += 1;
        let generation = deal.current_gen;

        // The new holder starts with a clean record
        txn.set_missed(deal_id, &Assignment::Slot(slot), 0)?;
        txn.put_deal(&deal)?;

        info!(
            deal_id,
            slot,
            provider = %pending,
            generation,
            height,
            "✅ Slot repair completed"
        );

        Ok(LivenessEvent::SlotRepairCompleted {
            deal_id,
            slot,
            provider: pending,
            generation,
        })
    }

    /// Start a repair chosen by seed for a slot that exhausted its missed-epoch budget.
    ///
    /// Mutates `deal` in place; the caller persists it. Returns `None` when
    /// the slot is not eligible or no candidate exists.
    pub async fn auto_repair(
        &self,
        txn: &LedgerTxn,
        deal: &mut Deal,
        slot: u32,
        seed: &[u8; 32],
        reserved: &mut BTreeSet<Address>,
        height: u64,
    ) -> Result<Option<LivenessEvent>> {
        let pos = Self::slot_position(deal, slot)?;
        let current = &deal.slots[pos];
        if current.status != SlotStatus::Active || current.pending_provider.is_some() {
            return Ok(None);
        }

        let base = ServiceHint::parse(&deal.service_hint)?.base;
        let providers = txn.providers().await?;
        let candidates = eligible_candidates(&providers, base, reserved);

        let Some(pick) = select_candidate(&candidates, seed, deal.id, deal.current_gen, slot) else {
            warn!(
                deal_id = deal.id,
                slot,
                registered = providers.len(),
                reserved = reserved.len(),
                "⚠️ No repair candidate"
            );
            return Ok(None);
        };

        let old_provider = self.begin_repair(deal, slot, pick, height)?;
        reserved.insert(pick);

        info!(
            deal_id = deal.id,
            slot,
            old_provider = %old_provider,
            pending_provider = %pick,
            candidates = candidates.len(),
            height,
            "🔧 Automatic slot repair started"
        );

        Ok(Some(LivenessEvent::SlotRepairStarted {
            deal_id: deal.id,
            slot,
            old_provider,
            pending_provider: pick,
            automatic: true,
        }))
    }
}
