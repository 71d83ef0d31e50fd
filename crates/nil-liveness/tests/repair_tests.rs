mod common;

use common::{addr, Harness};
use nil_liveness::{LivenessEngine, LivenessError, LivenessEvent, LivenessMetrics, Result};
use nil_proof::mock::HashCommitment;
use nil_proof::LivenessProof;
use nil_types::{Address, Assignment, Capabilities, DealId, SlotStatus};
use std::sync::Arc;

struct EcDeal {
    h: Harness,
    deal_id: DealId,
    holders: [Address; 3],
}

/// RS(2, 1) deal over p1..p3 with one Hot-capable spare (p4) and one Archive spare (p6)
async fn ec_deal() -> EcDeal {
    let h = Harness::new().await;
    let p1 = h.register(1, Capabilities::General).await;
    let p2 = h.register(2, Capabilities::General).await;
    let p3 = h.register(3, Capabilities::Edge).await;
    h.register(4, Capabilities::General).await;
    h.register(6, Capabilities::Archive).await;
    let deal_id = h.deal("Hot:rs=2+1", &[p1, p2, p3]).await;
    EcDeal {
        h,
        deal_id,
        holders: [p1, p2, p3],
    }
}

async fn missed(h: &Harness, deal_id: DealId, slot: u32) -> u64 {
    h.engine
        .missed_epochs(deal_id, &Assignment::Slot(slot))
        .await
        .unwrap()
}

async fn start_repair(
    h: &Harness,
    deal_id: DealId,
    caller: Address,
    slot: u32,
    pending: Address,
) -> Result<LivenessEvent> {
    h.engine
        .start_slot_repair(deal_id, &caller, slot, &pending)
        .await
}

#[tokio::test]
async fn test_commit_creates_active_slots() {
    let ec = ec_deal().await;
    let deal = ec.h.engine.get_deal(ec.deal_id).await.unwrap().unwrap();
    assert_eq!((deal.stripe_k, deal.stripe_m), (2, 1));
    assert_eq!(deal.slots.len(), 3);
    for (i, slot) in deal.slots.iter().enumerate() {
        assert_eq!(slot.index, i as u32);
        assert_eq!(slot.provider, ec.holders[i]);
        assert_eq!(slot.status, SlotStatus::Active);
        assert_eq!(slot.pending_provider, None);
    }

    let challenges = ec
        .h
        .engine
        .current_challenges(ec.deal_id, &ec.holders[1], 3)
        .await
        .unwrap();
    for c in challenges {
        assert!(c.chunk_index < 32);
        assert!(c.leaf_index >= 32 && c.leaf_index < 64);
    }
}

#[tokio::test]
async fn test_auto_repair_after_missed_threshold() {
    let ec = ec_deal().await;
    let h = &ec.h;
    let [p1, p2, p3] = ec.holders;

    // Only slot 2 keeps up with its quota of one chunk per epoch
    h.engine
        .prove_liveness(ec.deal_id, &p3, 0, LivenessProof::System(h.proof(2, 1)))
        .await
        .unwrap();
    let reports = h.run_to(10).await;
    assert!(reports[0]
        .events
        .iter()
        .all(|e| matches!(e, LivenessEvent::QuotaShortfall { .. })));
    assert_eq!(reports[0].shortfalls().count(), 2);

    h.run_to(11).await;
    h.engine
        .prove_liveness(ec.deal_id, &p3, 1, LivenessProof::System(h.proof(2, 1)))
        .await
        .unwrap();
    let reports = h.run_to(20).await;
    let started: Vec<_> = reports[0]
        .events
        .iter()
        .filter_map(|e| match e {
            LivenessEvent::SlotRepairStarted {
                slot,
                old_provider,
                pending_provider,
                automatic,
                ..
            } => Some((*slot, *old_provider, *pending_provider, *automatic)),
            _ => None,
        })
        .collect();
    // p4 is the only Hot-capable spare, so slot 1 finds no candidate
    assert_eq!(started, vec![(0, p1, addr(4), true)]);

    let deal = h.engine.get_deal(ec.deal_id).await.unwrap().unwrap();
    assert_eq!(deal.slots[0].status, SlotStatus::Repairing);
    assert_eq!(deal.slots[0].pending_provider, Some(addr(4)));
    assert_eq!(deal.slots[0].repair_target_gen, deal.current_gen);
    assert_eq!(deal.slots[1].status, SlotStatus::Active);
    assert_eq!(deal.slots[2].status, SlotStatus::Active);

    assert_eq!(missed(h, ec.deal_id, 0).await, 2);
    assert_eq!(missed(h, ec.deal_id, 1).await, 2);
    assert_eq!(missed(h, ec.deal_id, 2).await, 0);

    // A repairing slot is not evaluated
    h.run_to(21).await;
    h.engine
        .prove_liveness(ec.deal_id, &p3, 2, LivenessProof::System(h.proof(3, 2)))
        .await
        .unwrap();
    let reports = h.run_to(30).await;
    assert!(reports[0]
        .outcomes
        .iter()
        .all(|o| o.assignment != Assignment::Slot(0)));
    assert_eq!(missed(h, ec.deal_id, 0).await, 2);
    assert_eq!(missed(h, ec.deal_id, 1).await, 3);

    // A repairing slot earns no credit
    h.run_to(31).await;
    let outcome = h
        .engine
        .prove_liveness(ec.deal_id, &p1, 3, LivenessProof::System(h.proof(2, 3)))
        .await
        .unwrap();
    assert!(outcome.accepted);
    assert_eq!(outcome.credits_recorded, 0);

    let event = h.engine.complete_slot_repair(ec.deal_id, &h.owner, 0).await.unwrap();
    assert_eq!(
        event,
        LivenessEvent::SlotRepairCompleted {
            deal_id: ec.deal_id,
            slot: 0,
            provider: addr(4),
            generation: 1,
        }
    );
    let deal = h.engine.get_deal(ec.deal_id).await.unwrap().unwrap();
    assert_eq!(deal.slots[0].provider, addr(4));
    assert_eq!(deal.slots[0].status, SlotStatus::Active);
    assert_eq!(deal.slots[0].pending_provider, None);
    assert_eq!(deal.providers, vec![addr(4), p2, p3]);
    assert_eq!(deal.current_gen, 1);
    assert_eq!(missed(h, ec.deal_id, 0).await, 0);

    let err = h
        .engine
        .prove_liveness(ec.deal_id, &p1, 3, LivenessProof::System(h.proof(2, 4)))
        .await
        .unwrap_err();
    assert!(matches!(err, LivenessError::NotAssigned { .. }));

    let outcome = h
        .engine
        .prove_liveness(ec.deal_id, &addr(4), 3, LivenessProof::System(h.proof(2, 4)))
        .await
        .unwrap();
    assert_eq!(outcome.credits_recorded, 1);
}

#[tokio::test]
async fn test_zero_evict_threshold_disables_auto_repair() {
    let mut config = common::config();
    config.liveness.evict_after_missed_epochs = 0;
    let h = Harness::with_config(config).await;
    let p1 = h.register(1, Capabilities::General).await;
    let p2 = h.register(2, Capabilities::General).await;
    let p3 = h.register(3, Capabilities::General).await;
    h.register(4, Capabilities::General).await;
    let deal_id = h.deal("Hot:rs=2+1", &[p1, p2, p3]).await;

    let reports = h.run_to(50).await;
    assert_eq!(reports.len(), 5);
    assert!(reports.iter().all(|r| r
        .events
        .iter()
        .all(|e| !matches!(e, LivenessEvent::SlotRepairStarted { .. }))));
    assert_eq!(
        h.engine
            .missed_epochs(deal_id, &Assignment::Slot(0))
            .await
            .unwrap(),
        5
    );
}

#[tokio::test]
async fn test_complete_repair_requires_repairing_slot() {
    let ec = ec_deal().await;
    let h = &ec.h;
    let before = h.engine.get_deal(ec.deal_id).await.unwrap().unwrap();
    let stats = h.store.stats().await.unwrap();

    let err = h
        .engine
        .complete_slot_repair(ec.deal_id, &h.owner, 0)
        .await
        .unwrap_err();
    assert!(matches!(err, LivenessError::InvalidTransition { .. }));

    assert_eq!(h.engine.get_deal(ec.deal_id).await.unwrap().unwrap(), before);
    assert_eq!(h.store.stats().await.unwrap(), stats);
}

#[tokio::test]
async fn test_manual_repair_validation() {
    let ec = ec_deal().await;
    let h = &ec.h;
    let owner = h.owner;
    let [p1, p2, _] = ec.holders;
    let start = move |caller, slot, pending| start_repair(h, ec.deal_id, caller, slot, pending);

    let err = start(p1, 0, addr(4)).await.unwrap_err();
    assert!(matches!(err, LivenessError::Unauthorized(_)));

    let err = start(owner, 9, addr(4)).await.unwrap_err();
    assert!(matches!(err, LivenessError::SlotNotFound { slot: 9, .. }));

    let err = start(owner, 0, Address::ZERO).await.unwrap_err();
    assert!(matches!(err, LivenessError::InvalidPendingProvider(_)));

    let err = start(owner, 0, p1).await.unwrap_err();
    assert!(matches!(err, LivenessError::InvalidPendingProvider(_)));

    let err = start(owner, 0, addr(0x55)).await.unwrap_err();
    assert!(matches!(err, LivenessError::ProviderNotFound(_)));

    let err = start(owner, 0, addr(6)).await.unwrap_err();
    assert!(matches!(err, LivenessError::ProviderIneligible { .. }));

    let err = start(owner, 0, p2).await.unwrap_err();
    assert!(matches!(err, LivenessError::AlreadyAssigned(p) if p == p2));

    let event = start(owner, 0, addr(4)).await.unwrap();
    assert_eq!(
        event,
        LivenessEvent::SlotRepairStarted {
            deal_id: ec.deal_id,
            slot: 0,
            old_provider: p1,
            pending_provider: addr(4),
            automatic: false,
        }
    );

    let err = start(owner, 0, addr(4)).await.unwrap_err();
    assert!(matches!(err, LivenessError::InvalidTransition { .. }));

    // A pending provider is reserved for the whole deal
    let err = start(owner, 1, addr(4)).await.unwrap_err();
    assert!(matches!(err, LivenessError::AlreadyAssigned(_)));
}

#[tokio::test]
async fn test_repair_needs_erasure_coded_deal() {
    let h = Harness::new().await;
    let p1 = h.register(1, Capabilities::General).await;
    let p2 = h.register(2, Capabilities::General).await;
    let deal_id = h.deal("Hot", &[p1]).await;

    let err = h
        .engine
        .start_slot_repair(deal_id, &h.owner, 0, &p2)
        .await
        .unwrap_err();
    assert!(matches!(err, LivenessError::NotErasureCoded(id) if id == deal_id));

    let err = h
        .engine
        .start_slot_repair(99, &h.owner, 0, &p2)
        .await
        .unwrap_err();
    assert!(matches!(err, LivenessError::DealNotFound(99)));
}

#[tokio::test]
async fn test_repair_metrics_follow_committed_events() {
    let mut ec = ec_deal().await;
    let metrics = LivenessMetrics::new().unwrap();
    ec.h.engine.set_metrics(&metrics).await.unwrap();
    let h = &ec.h;
    assert_eq!(metrics.slots_repairing.get(), 0);

    // Every slot misses twice; only slot 0 finds a Hot-capable spare
    h.run_to(20).await;
    assert_eq!(metrics.quota_shortfalls.get(), 6);
    assert_eq!(metrics.repairs_started.get(), 1);
    assert_eq!(metrics.slots_repairing.get(), 1);
    assert_eq!(h.engine.repairing_slots().await.unwrap(), 1);

    let err = start_repair(h, ec.deal_id, h.owner, 0, addr(4)).await.unwrap_err();
    assert!(matches!(err, LivenessError::InvalidTransition { .. }));
    assert_eq!(metrics.repairs_started.get(), 1);

    h.engine.complete_slot_repair(ec.deal_id, &h.owner, 0).await.unwrap();
    assert_eq!(metrics.repairs_completed.get(), 1);
    assert_eq!(metrics.slots_repairing.get(), 0);
}

#[tokio::test]
async fn test_repair_gauge_rebuilt_on_reopen() {
    let ec = ec_deal().await;
    let h = &ec.h;
    start_repair(h, ec.deal_id, h.owner, 1, addr(4)).await.unwrap();

    let mut reopened =
        LivenessEngine::new(&common::config(), h.store.clone(), Arc::new(HashCommitment)).unwrap();
    let metrics = LivenessMetrics::new().unwrap();
    reopened.set_metrics(&metrics).await.unwrap();
    assert_eq!(metrics.slots_repairing.get(), 1);
    assert_eq!(metrics.repairs_started.get(), 0);

    reopened.complete_slot_repair(ec.deal_id, &h.owner, 1).await.unwrap();
    assert_eq!(metrics.slots_repairing.get(), 0);
    assert_eq!(metrics.repairs_completed.get(), 1);
}
