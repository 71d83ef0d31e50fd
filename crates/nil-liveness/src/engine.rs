use crate::config::EngineConfig;
use crate::error::{LivenessError, Result};
use crate::events::LivenessEvent;
use crate::metrics::LivenessMetrics;
use crate::receipts::{self, Envelope};
use crate::repair::SlotRepairController;
use crate::scheduler::{self, Challenge, EpochReport, EpochScheduler};
use nil_ledger::{LedgerStore, LedgerTxn};
use nil_proof::mock::HashCommitment;
use nil_proof::{
    ChainedProof, ChainedProofVerifier, CommitmentScheme, LivenessProof, ProofError,
    RetrievalReceipt, SessionProof,
};
use nil_slab::SlabGeometry;
use nil_types::{
    normalize_endpoints, Address, Assignment, Capabilities, Deal, DealId, LivenessParams, Provider,
    ServiceHint, Slot, StripeParams, COMMITMENT_SIZE,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Parameters of a new storage deal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDeal {
    pub owner: Address,
    pub service_hint: String,
    pub start_block: u64,
    pub end_block: u64,
    pub escrow_balance: u128,
    pub providers: Vec<Address>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofOutcome {
    pub kind: String,
    pub accepted: bool,
    /// Credits newly counted; replays of an already credited chunk add nothing
    pub credits_recorded: u64,
    /// Consecutive system proof failures after this submission
    pub consecutive_failures: u64,
    pub rejection: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochCredits {
    pub credits: u64,
    pub synthetic: u64,
}

/// Single-writer state machine over deals, providers and epoch accounting.
///
/// Every mutating call holds the write lock for its whole duration and
/// commits its writes in one batch, or none of them on error.
pub struct LivenessEngine {
    store: Arc<dyn LedgerStore>,
    verifier: ChainedProofVerifier,
    scheduler: EpochScheduler,
    repair: SlotRepairController,
    write_lock: Mutex<()>,
    // Metrics
    pub proofs_rejected: Option<Arc<prometheus::IntCounter>>,
}

impl LivenessEngine {
    pub fn new(
        config: &EngineConfig,
        store: Arc<dyn LedgerStore>,
        scheme: Arc<dyn CommitmentScheme>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            verifier: ChainedProofVerifier::new(scheme),
            scheduler: EpochScheduler::new(config.liveness.clone(), config.chain_id.clone()),
            repair: SlotRepairController::new(),
            write_lock: Mutex::new(()),
            proofs_rejected: None,
        })
    }

    /// Engine over the configured store with the hash commitment scheme
    pub fn open(config: &EngineConfig) -> Result<Self> {
        let store = config.storage.open()?;
        Self::new(config, store, Arc::new(HashCommitment))
    }

    /// Wire metrics and seed the repairing gauge from the ledger
    pub async fn set_metrics(&mut self, metrics: &LivenessMetrics) -> Result<()> {
        self.scheduler.set_metrics(
            metrics.credits_recorded.clone(),
            metrics.credits_deduplicated.clone(),
            metrics.synthetic_recorded.clone(),
            metrics.quota_shortfalls.clone(),
        );
        self.repair.set_metrics(
            metrics.repairs_started.clone(),
            metrics.repairs_completed.clone(),
            metrics.slots_repairing.clone(),
        );
        self.proofs_rejected = Some(metrics.proofs_rejected.clone());

        let repairing = self.repairing_slots().await?;
        self.repair.set_repairing(repairing);
        debug!(repairing, "Repair gauge synced");
        Ok(())
    }

    /// Slots currently in repair across every deal
    pub async fn repairing_slots(&self) -> Result<u64> {
        let deals = self.txn().deals().await?;
        Ok(deals
            .iter()
            .flat_map(|d| d.slots.iter())
            .filter(|s| s.is_repairing())
            .count() as u64)
    }

    pub fn params(&self) -> &LivenessParams {
        self.scheduler.params()
    }

    pub fn verifier(&self) -> &ChainedProofVerifier {
        &self.verifier
    }

    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    fn txn(&self) -> LedgerTxn {
        LedgerTxn::begin(self.store.clone())
    }

    pub async fn register_provider(
        &self,
        address: Address,
        capabilities: Capabilities,
        total_storage: u64,
        endpoints: &[String],
    ) -> Result<Provider> {
        let _guard = self.write_lock.lock().await;
        let mut txn = self.txn();

        if address.is_zero() {
            return Err(LivenessError::InvalidRequest(
                "provider address is blank".to_string(),
            ));
        }
        if txn.provider(&address).await?.is_some() {
            return Err(LivenessError::ProviderExists(address));
        }

        let endpoints = normalize_endpoints(endpoints)?;
        let provider = Provider::new(address, capabilities, total_storage, endpoints);
        txn.put_provider(&provider)?;
        txn.commit().await?;

        info!(
            provider = %address,
            capabilities = %capabilities,
            total_storage,
            endpoints = provider.endpoints.len(),
            "📦 Provider registered"
        );
        Ok(provider)
    }

    pub async fn create_deal(&self, request: NewDeal) -> Result<Deal> {
        let _guard = self.write_lock.lock().await;
        let mut txn = self.txn();

        let hint = ServiceHint::parse(&request.service_hint)?;
        if request.start_block > request.end_block {
            return Err(LivenessError::InvalidRequest(format!(
                "deal window {}..{} is empty",
                request.start_block, request.end_block
            )));
        }
        if request.providers.is_empty() {
            return Err(LivenessError::InvalidRequest(
                "deal needs at least one provider".to_string(),
            ));
        }
        let distinct: BTreeSet<&Address> = request.providers.iter().collect();
        if distinct.len() != request.providers.len() {
            return Err(LivenessError::InvalidRequest(
                "deal providers must be distinct".to_string(),
            ));
        }
        for provider in &request.providers {
            if txn.provider(provider).await?.is_none() {
                return Err(LivenessError::ProviderNotFound(*provider));
            }
        }

        let (stripe_k, stripe_m) = hint.rs.unwrap_or((0, 0));
        if let Some((k, m)) = hint.rs {
            let stripe = StripeParams::erasure_coded(k, m)?;
            if request.providers.len() as u64 != stripe.slot_count {
                return Err(LivenessError::InvalidRequest(format!(
                    "RS({}, {}) needs {} providers, got {}",
                    k,
                    m,
                    stripe.slot_count,
                    request.providers.len()
                )));
            }
        }

        let id = txn.next_deal_id().await?;
        let deal = Deal {
            id,
            owner: request.owner,
            manifest_root: Vec::new(),
            total_units: 0,
            witness_units: 0,
            providers: request.providers,
            slots: Vec::new(),
            escrow_balance: request.escrow_balance,
            current_gen: 0,
            service_hint: hint.raw,
            start_block: request.start_block,
            end_block: request.end_block,
            stripe_k,
            stripe_m,
        };
        txn.put_deal(&deal)?;
        txn.commit().await?;

        info!(
            deal_id = id,
            owner = %deal.owner,
            providers = deal.providers.len(),
            hint = %deal.service_hint,
            "📄 Deal created"
        );
        Ok(deal)
    }

    /// Bind a manifest root and slab geometry to a deal
    pub async fn commit_content(
        &self,
        deal_id: DealId,
        caller: &Address,
        manifest_root: &[u8],
        total_units: u64,
        witness_units: u64,
    ) -> Result<Deal> {
        let _guard = self.write_lock.lock().await;
        let mut txn = self.txn();

        let mut deal = txn
            .deal(deal_id)
            .await?
            .ok_or(LivenessError::DealNotFound(deal_id))?;
        if &deal.owner != caller {
            return Err(LivenessError::Unauthorized(format!(
                "{} does not own deal {}",
                caller, deal_id
            )));
        }
        if manifest_root.len() != COMMITMENT_SIZE {
            return Err(LivenessError::InvalidRequest(format!(
                "manifest root must be {} bytes, got {}",
                COMMITMENT_SIZE,
                manifest_root.len()
            )));
        }
        SlabGeometry::new(total_units, witness_units)?;

        let height = txn.chain_height().await?;
        let recommit = deal.has_content();
        deal.manifest_root = manifest_root.to_vec();
        deal.total_units = total_units;
        deal.witness_units = witness_units;
        if recommit {
            deal.current_gen += 1;
        }

        let stripe = StripeParams::for_deal(&deal)?;
        if stripe.is_erasure_coded() && deal.slots.is_empty() {
            deal.slots = deal
                .providers
                .iter()
                .enumerate()
                .map(|(i, p)| Slot::new(i as u32, *p, height))
                .collect();
        }

        txn.put_deal(&deal)?;
        txn.commit().await?;

        info!(
            deal_id,
            total_units,
            witness_units,
            generation = deal.current_gen,
            recommit,
            "🧱 Deal content committed"
        );
        Ok(deal)
    }

    /// Block start hook: records the height and persists the epoch seed at epoch starts
    pub async fn begin_block(&self, height: u64, header_hash: &[u8]) -> Result<Vec<LivenessEvent>> {
        let _guard = self.write_lock.lock().await;
        let mut txn = self.txn();

        let last = txn.chain_height().await?;
        if height < last {
            return Err(LivenessError::InvalidRequest(format!(
                "height {} is behind {}",
                height, last
            )));
        }
        let window = self.scheduler.window(height)?;
        txn.set_chain_height(height)?;

        let mut events = Vec::new();
        if window.is_start(height) {
            let (_, persisted) = self.scheduler.seed_at(&mut txn, height, header_hash).await?;
            if persisted {
                events.push(LivenessEvent::EpochSeedPersisted {
                    epoch_id: window.epoch_id,
                    height,
                });
            }
        }

        txn.commit().await?;
        Ok(events)
    }

    /// Block end hook: runs the quota pass when `height` closes an epoch
    pub async fn end_block(&self, height: u64) -> Result<EpochReport> {
        let _guard = self.write_lock.lock().await;
        let mut txn = self.txn();

        let last = txn.chain_height().await?;
        if height < last {
            return Err(LivenessError::InvalidRequest(format!(
                "height {} is behind {}",
                height, last
            )));
        }
        txn.set_chain_height(height)?;

        let report = self.scheduler.end_epoch(&mut txn, &self.repair, height).await?;
        txn.commit().await?;
        self.scheduler.apply_metrics(&report);
        self.repair.apply_metrics(&report.events);

        if report.evaluated {
            info!(
                epoch_id = report.epoch_id,
                assignments = report.outcomes.len(),
                shortfalls = report.shortfalls().count(),
                skipped = report.skipped_deals.len(),
                "🏁 Epoch closed"
            );
        }
        Ok(report)
    }

    pub async fn prove_liveness(
        &self,
        deal_id: DealId,
        creator: &Address,
        epoch_id: u64,
        proof: LivenessProof,
    ) -> Result<ProofOutcome> {
        let _guard = self.write_lock.lock().await;
        let mut txn = self.txn();

        let deal = txn
            .deal(deal_id)
            .await?
            .ok_or(LivenessError::DealNotFound(deal_id))?;
        if !deal.is_assigned(creator) {
            return Err(LivenessError::NotAssigned {
                deal_id,
                provider: *creator,
            });
        }

        let height = txn.chain_height().await?;
        let current = self.scheduler.window(height)?.epoch_id;
        if epoch_id != current {
            return Err(LivenessError::EpochMismatch {
                expected: current,
                got: epoch_id,
            });
        }
        if !deal.has_content() {
            return Err(LivenessError::InvalidRequest(format!(
                "deal {} has no committed content",
                deal_id
            )));
        }

        let env = Envelope {
            deal_id,
            epoch_id,
            provider: creator,
            height,
        };
        let kind = proof.kind().to_string();

        let outcome = match proof {
            LivenessProof::System(chained) => {
                self.accept_system_proof(&mut txn, &deal, creator, epoch_id, height, &chained)
                    .await?
            }
            LivenessProof::UserReceipt(receipt) => {
                let credited = self
                    .accept_receipt(&mut txn, &deal, &env, &receipt)
                    .await?;
                accepted(credited as u64)
            }
            LivenessProof::UserReceiptBatch(batch) => {
                if batch.is_empty() {
                    return Err(LivenessError::EmptyBatch);
                }
                let mut credited = 0;
                for receipt in &batch {
                    credited += self.accept_receipt(&mut txn, &deal, &env, receipt).await? as u64;
                }
                accepted(credited)
            }
            LivenessProof::Session(session) => {
                let credited = self.accept_session(&mut txn, &deal, &env, &session).await?;
                accepted(credited)
            }
        };

        txn.commit().await?;
        Ok(ProofOutcome { kind, ..outcome })
    }

    async fn accept_system_proof(
        &self,
        txn: &mut LedgerTxn,
        deal: &Deal,
        creator: &Address,
        epoch_id: u64,
        height: u64,
        proof: &ChainedProof,
    ) -> Result<ProofOutcome> {
        if let Err(e) = self.verifier.verify(&deal.manifest_root, proof) {
            let failures = txn.provider_failures(deal.id, creator).await? + 1;
            txn.set_provider_failures(deal.id, creator, failures)?;

            warn!(
                deal_id = deal.id,
                provider = %creator,
                stage = ?e.stage(),
                error = %e,
                failures,
                "❌ System proof rejected"
            );
            let threshold = self.params().provider_failure_threshold;
            if threshold > 0 && failures >= threshold {
                warn!(
                    deal_id = deal.id,
                    provider = %creator,
                    failures,
                    threshold,
                    "⚠️ Provider degraded"
                );
            }
            if let Some(ref counter) = self.proofs_rejected {
                counter.inc();
            }

            return Ok(ProofOutcome {
                kind: String::new(),
                accepted: false,
                credits_recorded: 0,
                consecutive_failures: failures,
                rejection: Some(e.to_string()),
            });
        }

        let credited = self
            .scheduler
            .record_credit(
                txn,
                deal,
                epoch_id,
                creator,
                proof.unit_index,
                proof.chunk_index,
                height,
            )
            .await?;

        txn.set_provider_failures(deal.id, creator, 0)?;
        let mut provider = txn
            .provider(creator)
            .await?
            .ok_or(LivenessError::ProviderNotFound(*creator))?;
        provider.reputation_score = provider.reputation_score.saturating_add(1);
        txn.put_provider(&provider)?;

        debug!(
            deal_id = deal.id,
            provider = %creator,
            unit_index = proof.unit_index,
            chunk_index = proof.chunk_index,
            credited,
            "✅ System proof accepted"
        );
        Ok(accepted(credited as u64))
    }

    async fn accept_receipt(
        &self,
        txn: &mut LedgerTxn,
        deal: &Deal,
        env: &Envelope<'_>,
        receipt: &RetrievalReceipt,
    ) -> Result<bool> {
        receipts::check_receipt_envelope(env, deal, receipt)?;
        receipts::check_nonce(txn, deal.id, &receipt.file_path, receipt.nonce).await?;
        self.verifier.verify(&deal.manifest_root, &receipt.proof)?;

        let credited = self
            .scheduler
            .record_synthetic(
                txn,
                deal,
                env.epoch_id,
                env.provider,
                receipt.proof.unit_index,
                receipt.proof.chunk_index,
                env.height,
            )
            .await?;
        receipts::store_nonce(txn, deal.id, &receipt.file_path, receipt.nonce)?;

        debug!(
            deal_id = deal.id,
            provider = %env.provider,
            nonce = receipt.nonce,
            bytes = receipt.bytes_served,
            credited,
            "🧾 Retrieval receipt accepted"
        );
        Ok(credited)
    }

    async fn accept_session(
        &self,
        txn: &mut LedgerTxn,
        deal: &Deal,
        env: &Envelope<'_>,
        session: &SessionProof,
    ) -> Result<u64> {
        receipts::check_session_envelope(env, session)?;
        let receipt = &session.receipt;
        receipts::check_nonce(txn, deal.id, &receipt.file_path, receipt.nonce).await?;

        for chunk in &session.chunks {
            self.verifier.verify(&deal.manifest_root, &chunk.proof)?;
            if !chunk.verify_inclusion(&receipt.chunk_leaf_root) {
                return Err(ProofError::InvalidMerklePath(chunk.leaf_index as u64).into());
            }
        }

        let mut credited = 0;
        for chunk in &session.chunks {
            credited += self
                .scheduler
                .record_synthetic(
                    txn,
                    deal,
                    env.epoch_id,
                    env.provider,
                    chunk.proof.unit_index,
                    chunk.proof.chunk_index,
                    env.height,
                )
                .await? as u64;
        }
        receipts::store_nonce(txn, deal.id, &receipt.file_path, receipt.nonce)?;

        debug!(
            deal_id = deal.id,
            provider = %env.provider,
            chunks = session.chunks.len(),
            total_bytes = receipt.total_bytes,
            credited,
            "🧾 Session receipt accepted"
        );
        Ok(credited)
    }

    pub async fn start_slot_repair(
        &self,
        deal_id: DealId,
        caller: &Address,
        slot: u32,
        pending_provider: &Address,
    ) -> Result<LivenessEvent> {
        let _guard = self.write_lock.lock().await;
        let mut txn = self.txn();
        let height = txn.chain_height().await?;
        let event = self
            .repair
            .start_repair(&mut txn, deal_id, caller, slot, pending_provider, height)
            .await?;
        txn.commit().await?;
        self.repair.apply_metrics(std::slice::from_ref(&event));
        Ok(event)
    }

    pub async fn complete_slot_repair(
        &self,
        deal_id: DealId,
        caller: &Address,
        slot: u32,
    ) -> Result<LivenessEvent> {
        let _guard = self.write_lock.lock().await;
        let mut txn = self.txn();
        let height = txn.chain_height().await?;
        let event = self
            .repair
            .complete_repair(&mut txn, deal_id, caller, slot, height)
            .await?;
        txn.commit().await?;
        self.repair.apply_metrics(std::slice::from_ref(&event));
        Ok(event)
    }

    pub async fn get_deal(&self, deal_id: DealId) -> Result<Option<Deal>> {
        Ok(self.txn().deal(deal_id).await?)
    }

    pub async fn get_provider(&self, address: &Address) -> Result<Option<Provider>> {
        Ok(self.txn().provider(address).await?)
    }

    pub async fn missed_epochs(&self, deal_id: DealId, assignment: &Assignment) -> Result<u64> {
        Ok(self.txn().missed(deal_id, assignment).await?)
    }

    pub async fn epoch_credits(
        &self,
        epoch_id: u64,
        deal_id: DealId,
        assignment: &Assignment,
    ) -> Result<EpochCredits> {
        let txn = self.txn();
        Ok(EpochCredits {
            credits: txn.credits(epoch_id, deal_id, assignment).await?,
            synthetic: txn.synthetic(epoch_id, deal_id, assignment).await?,
        })
    }

    pub async fn provider_failures(&self, deal_id: DealId, address: &Address) -> Result<u64> {
        Ok(self.txn().provider_failures(deal_id, address).await?)
    }

    pub async fn epoch_seed(&self, epoch_id: u64) -> Result<Option<[u8; 32]>> {
        Ok(self.txn().epoch_seed(epoch_id).await?)
    }

    pub async fn chain_height(&self) -> Result<u64> {
        Ok(self.txn().chain_height().await?)
    }

    /// The first `count` challenges a provider owes in the current epoch
    pub async fn current_challenges(
        &self,
        deal_id: DealId,
        provider: &Address,
        count: u64,
    ) -> Result<Vec<Challenge>> {
        let txn = self.txn();
        let deal = txn
            .deal(deal_id)
            .await?
            .ok_or(LivenessError::DealNotFound(deal_id))?;
        let window = self.scheduler.window(txn.chain_height().await?)?;
        let seed = txn
            .epoch_seed(window.epoch_id)
            .await?
            .ok_or(LivenessError::SeedUnavailable(window.epoch_id))?;

        let stripe = StripeParams::for_deal(&deal)?;
        let Some(assignment) = scheduler::resolve_assignment(&deal, &stripe, provider)? else {
            return Ok(Vec::new());
        };
        scheduler::derive_challenges(&seed, &deal, &stripe, &assignment, count)
    }
}

fn accepted(credits_recorded: u64) -> ProofOutcome {
    ProofOutcome {
        kind: String::new(),
        accepted: true,
        credits_recorded,
        consecutive_failures: 0,
        rejection: None,
    }
}

impl std::fmt::Debug for LivenessEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LivenessEngine")
            .field("chain_id", &self.scheduler.chain_id())
            .field("params", self.scheduler.params())
            .finish_non_exhaustive()
    }
}
