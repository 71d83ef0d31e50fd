use nil_ledger::{LedgerStore, LedgerTxn, MemoryLedger, StorageConfig};
use nil_types::{Address, Assignment, Capabilities, Deal, Provider};
use std::sync::Arc;

fn addr(n: u8) -> Address {
    Address::from_bytes([n; 20])
}

fn deal(id: u64) -> Deal {
    Deal {
        id,
        owner: addr(9),
        manifest_root: Vec::new(),
        total_units: 0,
        witness_units: 0,
        providers: vec![addr(1)],
        slots: Vec::new(),
        escrow_balance: 1_000,
        current_gen: 0,
        service_hint: "Hot".to_string(),
        start_block: 1,
        end_block: 1_000,
        stripe_k: 0,
        stripe_m: 0,
    }
}

async fn exercise_store(store: Arc<dyn LedgerStore>) {
    let mut txn = LedgerTxn::begin(store.clone());
    assert_eq!(txn.next_deal_id().await.unwrap(), 1);
    assert_eq!(txn.next_deal_id().await.unwrap(), 2);
    for id in [2u64, 1, 300] {
        txn.put_deal(&deal(id)).unwrap();
    }
    for n in [5u8, 3, 4] {
        let p = Provider::new(addr(n), Capabilities::General, 1 << 40, vec!["/ip4/1.2.3.4".into()]);
        txn.put_provider(&p).unwrap();
    }
    let a = Assignment::Provider(addr(1));
    txn.set_credits(4, 1, &a, 7).unwrap();
    txn.set_missed(1, &a, 2).unwrap();
    txn.put_epoch_seed(4, &[0xAB; 32]).unwrap();
    txn.commit().await.unwrap();

    let txn = LedgerTxn::begin(store.clone());
    let ids: Vec<u64> = txn.deals().await.unwrap().iter().map(|d| d.id).collect();
    assert_eq!(ids, vec![1, 2, 300]);

    let providers: Vec<Address> = txn
        .providers()
        .await
        .unwrap()
        .iter()
        .map(|p| p.address)
        .collect();
    assert_eq!(providers, vec![addr(3), addr(4), addr(5)]);

    assert_eq!(txn.credits(4, 1, &a).await.unwrap(), 7);
    assert_eq!(txn.credits(5, 1, &a).await.unwrap(), 0);
    assert_eq!(txn.missed(1, &a).await.unwrap(), 2);
    assert_eq!(txn.epoch_seed(4).await.unwrap(), Some([0xAB; 32]));
    assert_eq!(txn.epoch_seed(5).await.unwrap(), None);
}

#[tokio::test]
async fn test_memory_ledger_state() {
    exercise_store(Arc::new(MemoryLedger::new())).await;
}

#[tokio::test]
async fn test_default_config_opens_memory_store() {
    let store = StorageConfig::memory().open().unwrap();
    exercise_store(store).await;
}

#[tokio::test]
async fn test_missed_zero_clears_key() {
    let store: Arc<dyn LedgerStore> = Arc::new(MemoryLedger::new());
    let a = Assignment::Slot(2);

    let mut txn = LedgerTxn::begin(store.clone());
    txn.set_missed(1, &a, 3).unwrap();
    txn.commit().await.unwrap();
    assert_eq!(store.stats().await.unwrap().entries, 1);

    let mut txn = LedgerTxn::begin(store.clone());
    txn.set_missed(1, &a, 0).unwrap();
    txn.commit().await.unwrap();
    assert_eq!(store.stats().await.unwrap().entries, 0);
}

#[cfg(feature = "rocksdb")]
#[tokio::test]
async fn test_rocks_ledger_state_survives_reopen() {
    use nil_ledger::RocksLedger;

    let dir = tempfile::tempdir().unwrap();
    {
        let store: Arc<dyn LedgerStore> = Arc::new(RocksLedger::new(dir.path()).unwrap());
        exercise_store(store.clone()).await;
        store.flush().await.unwrap();
    }

    let store: Arc<dyn LedgerStore> = Arc::new(RocksLedger::new(dir.path()).unwrap());
    let txn = LedgerTxn::begin(store);
    assert_eq!(txn.deals().await.unwrap().len(), 3);
    assert_eq!(txn.epoch_seed(4).await.unwrap(), Some([0xAB; 32]));
}
