//! Epoch accounting: height math, seeds, challenge derivation, quotas and
//! the epoch-end pass that turns credits into missed-epoch counters.

use crate::error::{LivenessError, Result};
use crate::events::LivenessEvent;
use crate::repair::SlotRepairController;
use nil_ledger::LedgerTxn;
use nil_types::{
    Address, Assignment, Deal, DealId, HintBase, LivenessParams, ServiceHint, SlotStatus,
    StripeParams, BPS_DENOMINATOR, CHUNKS_PER_UNIT, CHUNK_SIZE, UNIT_SIZE,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const EPOCH_SEED_TAG: &[u8] = b"nilstore/epoch/v1";
pub const CHALLENGE_TAG: &[u8] = b"nilstore/chal/v1";
pub const CREDIT_TAG: &[u8] = b"nilstore/credit/v1";
pub const SYNTHETIC_TAG: &[u8] = b"nilstore/synth/v1";

fn be_u64(bytes: &[u8]) -> u64 {
    let mut b = [0u8; 8];
    b.copy_from_slice(&bytes[..8]);
    u64::from_be_bytes(b)
}

/// Block range of one epoch, both ends inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochWindow {
    pub epoch_id: u64,
    pub start: u64,
    pub end: u64,
}

impl EpochWindow {
    pub fn at(height: u64, epoch_len: u64) -> Result<Self> {
        if epoch_len == 0 {
            return Err(LivenessError::InvalidEpochParams(
                "epoch length must be positive".to_string(),
            ));
        }
        if height == 0 {
            return Err(LivenessError::InvalidEpochParams(
                "height 0 belongs to no epoch".to_string(),
            ));
        }
        Self::of_epoch((height - 1) / epoch_len, epoch_len)
    }

    pub fn of_epoch(epoch_id: u64, epoch_len: u64) -> Result<Self> {
        if epoch_len == 0 {
            return Err(LivenessError::InvalidEpochParams(
                "epoch length must be positive".to_string(),
            ));
        }
        let overflow = || LivenessError::InvalidEpochParams(format!("epoch {} overflows", epoch_id));
        let start = epoch_id
            .checked_mul(epoch_len)
            .and_then(|s| s.checked_add(1))
            .ok_or_else(overflow)?;
        let end = start.checked_add(epoch_len - 1).ok_or_else(overflow)?;
        Ok(Self {
            epoch_id,
            start,
            end,
        })
    }

    pub fn is_start(&self, height: u64) -> bool {
        height == self.start
    }

    pub fn is_end(&self, height: u64) -> bool {
        height == self.end
    }
}

pub fn epoch_seed(chain_id: &str, epoch_id: u64, header_hash: &[u8]) -> [u8; 32] {
    let mut h = Sha256::new();
    h.update(EPOCH_SEED_TAG);
    h.update(chain_id.as_bytes());
    h.update(epoch_id.to_be_bytes());
    h.update(header_hash);
    h.finalize().into()
}

/// One `(unit, chunk)` position a provider must prove in an epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub ordinal: u64,
    pub unit_index: u64,
    /// Chunk within the unit; the row within the slot for erasure-coded deals
    pub chunk_index: u64,
    /// Position in the unit's stripe leaf space
    pub leaf_index: u64,
}

pub fn derive_challenge(
    seed: &[u8; 32],
    deal: &Deal,
    stripe: &StripeParams,
    assignment: &Assignment,
    ordinal: u64,
) -> Result<Challenge> {
    let user_units = deal.user_units();
    if user_units == 0 {
        return Err(LivenessError::InvalidRequest(format!(
            "deal {} has no user-data units",
            deal.id
        )));
    }

    let mut h = Sha256::new();
    h.update(CHALLENGE_TAG);
    h.update(seed);
    h.update(deal.id.to_be_bytes());
    h.update(deal.current_gen.to_be_bytes());
    h.update(assignment.hash_bytes());
    h.update(ordinal.to_be_bytes());
    let sum: [u8; 32] = h.finalize().into();

    let unit_index = deal.meta_units() + be_u64(&sum[0..8]) % user_units;
    let (chunk_index, leaf_index) = match (stripe.is_erasure_coded(), assignment) {
        (true, Assignment::Slot(slot)) => {
            let row = be_u64(&sum[8..16]) % stripe.rows_per_slot;
            (row, *slot as u64 * stripe.rows_per_slot + row)
        }
        _ => {
            let chunk = be_u64(&sum[8..16]) % CHUNKS_PER_UNIT as u64;
            (chunk, chunk)
        }
    };

    Ok(Challenge {
        ordinal,
        unit_index,
        chunk_index,
        leaf_index,
    })
}

/// Challenges for ordinals `0..count`
pub fn derive_challenges(
    seed: &[u8; 32],
    deal: &Deal,
    stripe: &StripeParams,
    assignment: &Assignment,
    count: u64,
) -> Result<Vec<Challenge>> {
    (0..count)
        .map(|ordinal| derive_challenge(seed, deal, stripe, assignment, ordinal))
        .collect()
}

/// Bytes one assignment is responsible for
pub fn slot_bytes(deal: &Deal, stripe: &StripeParams) -> Result<u64> {
    let per_unit = if stripe.is_erasure_coded() {
        stripe.rows_per_slot * CHUNK_SIZE as u64
    } else {
        UNIT_SIZE as u64
    };
    deal.user_units()
        .checked_mul(per_unit)
        .ok_or_else(|| LivenessError::QuotaOverflow(format!("slot bytes of deal {}", deal.id)))
}

/// Chunk proofs an assignment owes per epoch
pub fn quota(params: &LivenessParams, deal: &Deal, stripe: &StripeParams) -> Result<u64> {
    let hint = ServiceHint::parse(&deal.service_hint)?;
    let bps = match hint.base {
        HintBase::Cold => params.quota_bps_cold,
        _ => params.quota_bps_hot,
    };

    let bytes = slot_bytes(deal, stripe)? as u128 * bps as u128;
    let target_bytes = bytes.div_ceil(BPS_DENOMINATOR as u128);
    let target = u64::try_from(target_bytes.div_ceil(CHUNK_SIZE as u128))
        .map_err(|_| LivenessError::QuotaOverflow(format!("quota of deal {}", deal.id)))?;

    let mut quota = target.max(params.quota_min_blobs);
    if params.quota_max_blobs > 0 {
        quota = quota.min(params.quota_max_blobs);
    }
    if quota == 0 {
        return Err(LivenessError::InvalidEpochParams(format!(
            "deal {} has a zero quota",
            deal.id
        )));
    }
    Ok(quota)
}

/// Portion of `quota` a credit family may satisfy
pub fn credit_cap(quota: u64, cap_bps: u64) -> u64 {
    if cap_bps >= BPS_DENOMINATOR {
        return quota;
    }
    (quota as u128 * cap_bps as u128).div_ceil(BPS_DENOMINATOR as u128) as u64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditKind {
    Proof,
    Synthetic,
}

impl CreditKind {
    fn tag(&self) -> &'static [u8] {
        match self {
            CreditKind::Proof => CREDIT_TAG,
            CreditKind::Synthetic => SYNTHETIC_TAG,
        }
    }
}

pub fn credit_id(
    kind: CreditKind,
    epoch_id: u64,
    deal_id: DealId,
    gen: u64,
    assignment: &Assignment,
    unit_index: u64,
    chunk_index: u64,
) -> [u8; 32] {
    let mut h = Sha256::new();
    h.update(kind.tag());
    h.update(epoch_id.to_be_bytes());
    h.update(deal_id.to_be_bytes());
    h.update(gen.to_be_bytes());
    h.update(assignment.hash_bytes());
    h.update(unit_index.to_be_bytes());
    h.update(chunk_index.to_be_bytes());
    h.finalize().into()
}

/// Assignment a provider's credits count toward.
///
/// `None` means the provider's slot is mid-repair and earns nothing.
pub fn resolve_assignment(
    deal: &Deal,
    stripe: &StripeParams,
    provider: &Address,
) -> Result<Option<Assignment>> {
    let not_assigned = || LivenessError::NotAssigned {
        deal_id: deal.id,
        provider: *provider,
    };

    if !stripe.is_erasure_coded() {
        if !deal.is_assigned(provider) {
            return Err(not_assigned());
        }
        return Ok(Some(Assignment::Provider(*provider)));
    }

    let slot = deal.slot_of(provider).ok_or_else(not_assigned)?;
    if slot.status != SlotStatus::Active {
        return Ok(None);
    }
    Ok(Some(Assignment::Slot(slot.index)))
}

/// Assignments evaluated at epoch end
pub fn assignments(deal: &Deal, stripe: &StripeParams) -> Vec<Assignment> {
    if stripe.is_erasure_coded() {
        deal.slots
            .iter()
            .filter(|s| s.status == SlotStatus::Active)
            .map(|s| Assignment::Slot(s.index))
            .collect()
    } else {
        deal.providers.iter().copied().map(Assignment::Provider).collect()
    }
}

/// Result of evaluating one assignment at epoch end
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentOutcome {
    pub deal_id: DealId,
    pub assignment: Assignment,
    pub quota: u64,
    pub applied_credits: u64,
    pub applied_synthetic: u64,
    pub missed_epochs: u64,
}

impl AssignmentOutcome {
    pub fn satisfied(&self) -> bool {
        self.applied_credits + self.applied_synthetic >= self.quota
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochReport {
    pub epoch_id: u64,
    pub height: u64,
    /// Whether `height` closed the epoch and the pass ran
    pub evaluated: bool,
    pub outcomes: Vec<AssignmentOutcome>,
    pub skipped_deals: Vec<(DealId, String)>,
    pub events: Vec<LivenessEvent>,
}

impl EpochReport {
    pub fn shortfalls(&self) -> impl Iterator<Item = &AssignmentOutcome> {
        self.outcomes.iter().filter(|o| !o.satisfied())
    }
}

pub struct EpochScheduler {
    params: LivenessParams,
    chain_id: String,
    // Metrics
    pub credits_recorded: Option<Arc<prometheus::IntCounter>>,
    pub credits_deduplicated: Option<Arc<prometheus::IntCounter>>,
    pub synthetic_recorded: Option<Arc<prometheus::IntCounter>>,
    pub quota_shortfalls: Option<Arc<prometheus::IntCounter>>,
}

impl EpochScheduler {
    pub fn new(params: LivenessParams, chain_id: impl Into<String>) -> Self {
        Self {
            params,
            chain_id: chain_id.into(),
            credits_recorded: None,
            credits_deduplicated: None,
            synthetic_recorded: None,
            quota_shortfalls: None,
        }
    }

    /// Set metrics for tracking credit and quota outcomes
    pub fn set_metrics(
        &mut self,
        credits_recorded: Arc<prometheus::IntCounter>,
        credits_deduplicated: Arc<prometheus::IntCounter>,
        synthetic_recorded: Arc<prometheus::IntCounter>,
        quota_shortfalls: Arc<prometheus::IntCounter>,
    ) {
        self.credits_recorded = Some(credits_recorded);
        self.credits_deduplicated = Some(credits_deduplicated);
        self.synthetic_recorded = Some(synthetic_recorded);
        self.quota_shortfalls = Some(quota_shortfalls);
    }

    pub fn params(&self) -> &LivenessParams {
        &self.params
    }

    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    pub fn window(&self, height: u64) -> Result<EpochWindow> {
        EpochWindow::at(height, self.params.epoch_len_blocks)
    }

    /// Seed of the epoch containing `height`.
    ///
    /// A missing seed is derived and staged only at the epoch's start height.
    pub async fn seed_at(
        &self,
        txn: &mut LedgerTxn,
        height: u64,
        header_hash: &[u8],
    ) -> Result<([u8; 32], bool)> {
        let window = self.window(height)?;
        if let Some(seed) = txn.epoch_seed(window.epoch_id).await? {
            return Ok((seed, false));
        }
        if !window.is_start(height) {
            return Err(LivenessError::SeedUnavailable(window.epoch_id));
        }

        let seed = epoch_seed(&self.chain_id, window.epoch_id, header_hash);
        txn.put_epoch_seed(window.epoch_id, &seed)?;
        info!(
            epoch_id = window.epoch_id,
            height,
            seed = hex::encode(&seed[..8]),
            "🌱 Epoch seed persisted"
        );
        Ok((seed, true))
    }

    pub fn quota_for(&self, deal: &Deal, stripe: &StripeParams) -> Result<u64> {
        quota(&self.params, deal, stripe)
    }

    /// Record one proof credit; `false` if ignored or already counted
    #[allow(clippy::too_many_arguments)]
    pub async fn record_credit(
        &self,
        txn: &mut LedgerTxn,
        deal: &Deal,
        epoch_id: u64,
        provider: &Address,
        unit_index: u64,
        chunk_index: u64,
        height: u64,
    ) -> Result<bool> {
        self.record(
            CreditKind::Proof,
            txn,
            deal,
            epoch_id,
            provider,
            unit_index,
            chunk_index,
            height,
        )
        .await
    }

    /// Record one retrieval credit; same rules as [`Self::record_credit`]
    #[allow(clippy::too_many_arguments)]
    pub async fn record_synthetic(
        &self,
        txn: &mut LedgerTxn,
        deal: &Deal,
        epoch_id: u64,
        provider: &Address,
        unit_index: u64,
        chunk_index: u64,
        height: u64,
    ) -> Result<bool> {
        self.record(
            CreditKind::Synthetic,
            txn,
            deal,
            epoch_id,
            provider,
            unit_index,
            chunk_index,
            height,
        )
        .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn record(
        &self,
        kind: CreditKind,
        txn: &mut LedgerTxn,
        deal: &Deal,
        epoch_id: u64,
        provider: &Address,
        unit_index: u64,
        chunk_index: u64,
        height: u64,
    ) -> Result<bool> {
        // Unit 0 and witness units carry no user data
        if unit_index < deal.meta_units() {
            debug!(deal_id = deal.id, unit_index, "Credit for metadata unit ignored");
            return Ok(false);
        }

        let stripe = StripeParams::for_deal(deal)?;
        let Some(assignment) = resolve_assignment(deal, &stripe, provider)? else {
            debug!(deal_id = deal.id, provider = %provider, "Credit for repairing slot ignored");
            return Ok(false);
        };

        let id = credit_id(
            kind,
            epoch_id,
            deal.id,
            deal.current_gen,
            &assignment,
            unit_index,
            chunk_index,
        );

        let seen = match kind {
            CreditKind::Proof => txn.credit_seen(&id).await?,
            CreditKind::Synthetic => txn.synthetic_seen(&id).await?,
        };
        if let Some(first_height) = seen {
            debug!(
                deal_id = deal.id,
                epoch_id,
                %assignment,
                first_height,
                credit = ?kind,
                "Duplicate credit ignored"
            );
            if let Some(ref counter) = self.credits_deduplicated {
                counter.inc();
            }
            return Ok(false);
        }

        match kind {
            CreditKind::Proof => {
                txn.mark_credit_seen(&id, height)?;
                let n = txn.credits(epoch_id, deal.id, &assignment).await?;
                txn.set_credits(epoch_id, deal.id, &assignment, n + 1)?;
                if let Some(ref counter) = self.credits_recorded {
                    counter.inc();
                }
            }
            CreditKind::Synthetic => {
                txn.mark_synthetic_seen(&id, height)?;
                let n = txn.synthetic(epoch_id, deal.id, &assignment).await?;
                txn.set_synthetic(epoch_id, deal.id, &assignment, n + 1)?;
                if let Some(ref counter) = self.synthetic_recorded {
                    counter.inc();
                }
            }
        }

        debug!(
            deal_id = deal.id,
            epoch_id,
            %assignment,
            unit_index,
            chunk_index,
            credit = ?kind,
            "💰 Credit recorded"
        );
        Ok(true)
    }

    /// Quota pass over every deal at the end of the epoch containing `height`.
    ///
    /// An epoch already closed in the ledger is not evaluated again. Metric
    /// deltas are left to `apply_metrics` once the pass commits. Deals that fail to evaluate are logged and skipped; their staged
    /// writes are discarded and the pass continues.
    pub async fn end_epoch(
        &self,
        txn: &mut LedgerTxn,
        repair: &SlotRepairController,
        height: u64,
    ) -> Result<EpochReport> {
        let window = self.window(height)?;
        let mut report = EpochReport {
            epoch_id: window.epoch_id,
            height,
            ..Default::default()
        };
        if !window.is_end(height) {
            return Ok(report);
        }
        if let Some(closed) = txn.last_closed_epoch().await? {
            if closed >= window.epoch_id {
                debug!(epoch_id = window.epoch_id, closed, height, "Epoch already closed");
                return Ok(report);
            }
        }
        report.evaluated = true;

        let seed = txn.epoch_seed(window.epoch_id).await?;
        let deals = txn.deals().await?;
        info!(
            epoch_id = window.epoch_id,
            height,
            deals = deals.len(),
            "⏳ Epoch quota pass"
        );

        for deal in deals {
            let deal_id = deal.id;
            let savepoint = txn.savepoint();
            let outcome_mark = report.outcomes.len();
            let event_mark = report.events.len();

            if let Err(e) = self
                .evaluate_deal(txn, repair, deal, &window, seed.as_ref(), height, &mut report)
                .await
            {
                warn!(deal_id, epoch_id = window.epoch_id, error = %e, "⚠️ Deal skipped in epoch pass");
                txn.rollback_to(savepoint);
                report.outcomes.truncate(outcome_mark);
                report.events.truncate(event_mark);
                report.skipped_deals.push((deal_id, e.to_string()));
            }
        }

        txn.set_last_closed_epoch(window.epoch_id)?;
        Ok(report)
    }

    /// Count the shortfalls of a committed epoch report
    pub fn apply_metrics(&self, report: &EpochReport) {
        if let Some(ref counter) = self.quota_shortfalls {
            counter.inc_by(report.shortfalls().count() as u64);
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn evaluate_deal(
        &self,
        txn: &mut LedgerTxn,
        repair: &SlotRepairController,
        mut deal: Deal,
        window: &EpochWindow,
        seed: Option<&[u8; 32]>,
        height: u64,
        report: &mut EpochReport,
    ) -> Result<()> {
        if !deal.has_content() || !deal.is_active_at(height) {
            return Ok(());
        }

        let stripe = StripeParams::for_deal(&deal)?;
        let quota = self.quota_for(&deal, &stripe)?;
        let cap = credit_cap(quota, self.params.credit_cap_bps);
        let synth_cap = credit_cap(quota, self.params.synthetic_cap_bps);
        let evict_after = self.params.evict_after_missed_epochs;

        let mut reserved = deal.reserved_providers();
        let mut deal_changed = false;

        for assignment in assignments(&deal, &stripe) {
            let credits = txn.credits(window.epoch_id, deal.id, &assignment).await?;
            let synthetic = txn.synthetic(window.epoch_id, deal.id, &assignment).await?;

            let applied = credits.min(cap).min(quota);
            let applied_synthetic = synthetic.min(synth_cap);
            let satisfied = applied + applied_synthetic;

            let missed = if satisfied >= quota {
                txn.set_missed(deal.id, &assignment, 0)?;
                0
            } else {
                let missed = txn.missed(deal.id, &assignment).await? + 1;
                txn.set_missed(deal.id, &assignment, missed)?;
                warn!(
                    event = "liveness_quota_shortfall",
                    deal_id = deal.id,
                    epoch_id = window.epoch_id,
                    %assignment,
                    quota,
                    credits,
                    synthetic,
                    satisfied,
                    missed_epochs = missed,
                    "⚠️ Liveness quota shortfall"
                );
                report.events.push(LivenessEvent::QuotaShortfall {
                    deal_id: deal.id,
                    epoch_id: window.epoch_id,
                    assignment,
                    quota,
                    satisfied,
                    missed_epochs: missed,
                });
                missed
            };

            report.outcomes.push(AssignmentOutcome {
                deal_id: deal.id,
                assignment,
                quota,
                applied_credits: applied,
                applied_synthetic,
                missed_epochs: missed,
            });

            let Assignment::Slot(slot) = assignment else {
                continue;
            };
            if evict_after == 0 || missed < evict_after {
                continue;
            }
            let Some(seed) = seed else {
                warn!(
                    deal_id = deal.id,
                    slot,
                    epoch_id = window.epoch_id,
                    "⚠️ No epoch seed, automatic repair deferred"
                );
                continue;
            };

            if let Some(event) = repair
                .auto_repair(txn, &mut deal, slot, seed, &mut reserved, height)
                .await?
            {
                report.events.push(event);
                deal_changed = true;
            }
        }

        if deal_changed {
            txn.put_deal(&deal)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nil_types::Slot;

    fn addr(n: u8) -> Address {
        Address::from_bytes([n; 20])
    }

    fn deal(hint: &str, total_units: u64, witness_units: u64) -> Deal {
        Deal {
            id: 7,
            owner: addr(9),
            manifest_root: vec![1; 48],
            total_units,
            witness_units,
            providers: vec![addr(1), addr(2), addr(3)],
            slots: Vec::new(),
            escrow_balance: 0,
            current_gen: 0,
            service_hint: hint.to_string(),
            start_block: 1,
            end_block: 10_000,
            stripe_k: 0,
            stripe_m: 0,
        }
    }

    #[test]
    fn test_epoch_windows() {
        let w = EpochWindow::at(1, 100).unwrap();
        assert_eq!((w.epoch_id, w.start, w.end), (0, 1, 100));
        let w = EpochWindow::at(100, 100).unwrap();
        assert_eq!(w.epoch_id, 0);
        assert!(w.is_end(100));
        let w = EpochWindow::at(101, 100).unwrap();
        assert_eq!((w.epoch_id, w.start), (1, 101));
        assert!(w.is_start(101));

        assert!(EpochWindow::at(0, 100).is_err());
        assert!(EpochWindow::at(5, 0).is_err());
        assert!(EpochWindow::of_epoch(u64::MAX, 2).is_err());
    }

    #[test]
    fn test_seed_depends_on_inputs() {
        let a = epoch_seed("nil-1", 3, &[0u8; 32]);
        assert_eq!(a, epoch_seed("nil-1", 3, &[0u8; 32]));
        assert_ne!(a, epoch_seed("nil-2", 3, &[0u8; 32]));
        assert_ne!(a, epoch_seed("nil-1", 4, &[0u8; 32]));
        assert_ne!(a, epoch_seed("nil-1", 3, &[1u8; 32]));
    }

    #[test]
    fn test_challenges_land_in_user_units() {
        let d = deal("Hot", 12, 2);
        let stripe = StripeParams::replication();
        let a = Assignment::Provider(addr(1));
        let seed = [5u8; 32];

        let challenges = derive_challenges(&seed, &d, &stripe, &a, 32).unwrap();
        assert_eq!(challenges.len(), 32);
        for c in &challenges {
            assert!(c.unit_index >= 3 && c.unit_index < 12);
            assert!(c.chunk_index < 64);
            assert_eq!(c.leaf_index, c.chunk_index);
        }
        assert_eq!(challenges, derive_challenges(&seed, &d, &stripe, &a, 32).unwrap());

        let other = derive_challenges(&seed, &d, &stripe, &Assignment::Provider(addr(2)), 32).unwrap();
        assert_ne!(challenges, other);
    }

    #[test]
    fn test_erasure_coded_challenges_stay_in_slot_rows() {
        let d = deal("Hot:rs=8+4", 12, 2);
        let stripe = StripeParams::erasure_coded(8, 4).unwrap();
        for c in derive_challenges(&[9u8; 32], &d, &stripe, &Assignment::Slot(3), 16).unwrap() {
            assert!(c.chunk_index < 8);
            assert_eq!(c.leaf_index, 3 * 8 + c.chunk_index);
        }
    }

    #[test]
    fn test_challenge_requires_user_units() {
        let d = deal("Hot", 3, 2);
        let stripe = StripeParams::replication();
        assert!(derive_challenge(&[0; 32], &d, &stripe, &Assignment::Slot(0), 0).is_err());
    }

    #[test]
    fn test_quota_formula() {
        let params = LivenessParams::default();
        let stripe = StripeParams::replication();

        // 10 user units * 8 MiB * 1% = 838,861 bytes -> 7 chunks
        let hot = deal("Hot", 12, 1);
        assert_eq!(quota(&params, &hot, &stripe).unwrap(), 7);

        // 0.5% -> 419,431 bytes -> 4 chunks
        let cold = deal("cold:owner=x", 12, 1);
        assert_eq!(quota(&params, &cold, &stripe).unwrap(), 4);

        // Tiny deal falls back to min_blobs
        let small = deal("Hot", 3, 1);
        assert_eq!(quota(&params, &small, &StripeParams::replication()).unwrap(), 1);

        // Huge deal is bounded by max_blobs
        let big = deal("Hot", 20_000, 10);
        assert_eq!(quota(&params, &big, &stripe).unwrap(), 64);

        let unbounded = LivenessParams {
            quota_max_blobs: 0,
            ..Default::default()
        };
        assert!(quota(&unbounded, &big, &stripe).unwrap() > 64);

        let zero = LivenessParams {
            quota_min_blobs: 0,
            quota_bps_hot: 0,
            ..Default::default()
        };
        assert!(matches!(
            quota(&zero, &hot, &stripe),
            Err(LivenessError::InvalidEpochParams(_))
        ));
    }

    #[test]
    fn test_erasure_coded_slot_bytes() {
        let d = deal("Hot:rs=8+4", 12, 1);
        let stripe = StripeParams::erasure_coded(8, 4).unwrap();
        assert_eq!(slot_bytes(&d, &stripe).unwrap(), 10 * 8 * CHUNK_SIZE as u64);

        let overflow = deal("Hot", u64::MAX, 0);
        assert!(matches!(
            slot_bytes(&overflow, &StripeParams::replication()),
            Err(LivenessError::QuotaOverflow(_))
        ));
    }

    #[test]
    fn test_credit_caps() {
        assert_eq!(credit_cap(7, 5000), 4);
        assert_eq!(credit_cap(8, 5000), 4);
        assert_eq!(credit_cap(7, 10_000), 7);
        assert_eq!(credit_cap(7, 20_000), 7);
        assert_eq!(credit_cap(7, 0), 0);
        assert_eq!(credit_cap(1, 1), 1);
    }

    #[test]
    fn test_credit_id_separates_families() {
        let a = Assignment::Slot(1);
        let proof = credit_id(CreditKind::Proof, 1, 2, 0, &a, 5, 6);
        assert_ne!(proof, credit_id(CreditKind::Synthetic, 1, 2, 0, &a, 5, 6));
        assert_ne!(proof, credit_id(CreditKind::Proof, 1, 2, 1, &a, 5, 6));
        assert_ne!(proof, credit_id(CreditKind::Proof, 1, 2, 0, &a, 5, 7));
    }

    #[test]
    fn test_resolve_assignment() {
        let mut d = deal("Hot:rs=2+1", 12, 1);
        let replication = StripeParams::replication();
        assert_eq!(
            resolve_assignment(&d, &replication, &addr(2)).unwrap(),
            Some(Assignment::Provider(addr(2)))
        );
        assert!(matches!(
            resolve_assignment(&d, &replication, &addr(8)),
            Err(LivenessError::NotAssigned { .. })
        ));

        let stripe = StripeParams::erasure_coded(2, 1).unwrap();
        d.slots = (0..3u32).map(|i| Slot::new(i, addr(i as u8 + 1), 1)).collect();
        d.slots[1].status = SlotStatus::Repairing;

        assert_eq!(
            resolve_assignment(&d, &stripe, &addr(1)).unwrap(),
            Some(Assignment::Slot(0))
        );
        assert_eq!(resolve_assignment(&d, &stripe, &addr(2)).unwrap(), None);
        assert_eq!(assignments(&d, &stripe), vec![Assignment::Slot(0), Assignment::Slot(2)]);
    }
}
