mod common;

use common::{addr, config, Harness};
use nil_liveness::{ErrorKind, LivenessEngine, LivenessError, LivenessMetrics};
use nil_proof::LivenessProof;
use nil_types::{Capabilities, ProviderStatus};

#[tokio::test]
async fn test_register_provider() {
    let h = Harness::new().await;
    let endpoints = vec![
        " /dns4/sp.example/tcp/443/https ".to_string(),
        "/dns4/sp.example/tcp/443/https".to_string(),
    ];
    let provider = h
        .engine
        .register_provider(addr(1), Capabilities::Archive, 1 << 30, &endpoints)
        .await
        .unwrap();
    assert_eq!(provider.endpoints, vec!["/dns4/sp.example/tcp/443/https".to_string()]);
    assert_eq!(provider.status, ProviderStatus::Active);
    assert_eq!(h.engine.get_provider(&addr(1)).await.unwrap(), Some(provider));

    let err = h
        .engine
        .register_provider(addr(1), Capabilities::General, 1, &endpoints)
        .await
        .unwrap_err();
    assert!(matches!(err, LivenessError::ProviderExists(_)));

    let err = h
        .engine
        .register_provider(addr(2), Capabilities::General, 1, &["tcp://nope".to_string()])
        .await
        .unwrap_err();
    assert!(matches!(err, LivenessError::InvalidRequest(_)));

    let err = h
        .engine
        .register_provider(nil_types::Address::ZERO, Capabilities::General, 1, &endpoints)
        .await
        .unwrap_err();
    assert!(matches!(err, LivenessError::InvalidRequest(_)));
}

#[tokio::test]
async fn test_create_deal_validation() {
    let h = Harness::new().await;
    let p1 = h.register(1, Capabilities::General).await;
    let p2 = h.register(2, Capabilities::General).await;

    let first = h.engine.create_deal(h.new_deal("Hot", &[p1])).await.unwrap();
    let second = h.engine.create_deal(h.new_deal("Cold", &[p1, p2])).await.unwrap();
    assert_eq!(first.id, 1);
    assert_eq!(second.id, 2);
    assert!(!first.has_content());
    assert!(first.slots.is_empty());

    let err = h.engine.create_deal(h.new_deal("Hot", &[])).await.unwrap_err();
    assert!(matches!(err, LivenessError::InvalidRequest(_)));

    let err = h.engine.create_deal(h.new_deal("Hot", &[p1, p1])).await.unwrap_err();
    assert!(matches!(err, LivenessError::InvalidRequest(_)));

    let err = h
        .engine
        .create_deal(h.new_deal("Hot", &[p1, addr(0x33)]))
        .await
        .unwrap_err();
    assert!(matches!(err, LivenessError::ProviderNotFound(_)));

    // RS(2, 1) needs exactly three providers
    let err = h
        .engine
        .create_deal(h.new_deal("Hot:rs=2+1", &[p1, p2]))
        .await
        .unwrap_err();
    assert!(matches!(err, LivenessError::InvalidRequest(_)));

    let err = h
        .engine
        .create_deal(h.new_deal("Hot:rs=3+1", &[p1, p2]))
        .await
        .unwrap_err();
    assert!(matches!(err, LivenessError::InvalidRequest(_)));

    let mut request = h.new_deal("Hot", &[p1]);
    request.start_block = 50;
    request.end_block = 10;
    let err = h.engine.create_deal(request).await.unwrap_err();
    assert!(matches!(err, LivenessError::InvalidRequest(_)));
}

#[tokio::test]
async fn test_commit_content() {
    let h = Harness::new().await;
    let p1 = h.register(1, Capabilities::General).await;
    let deal = h.engine.create_deal(h.new_deal("Hot", &[p1])).await.unwrap();

    let err = h
        .engine
        .commit_content(deal.id, &p1, &h.manifest, 4, 1)
        .await
        .unwrap_err();
    assert!(matches!(err, LivenessError::Unauthorized(_)));

    let err = h
        .engine
        .commit_content(deal.id, &h.owner, &h.manifest[..32], 4, 1)
        .await
        .unwrap_err();
    assert!(matches!(err, LivenessError::InvalidRequest(_)));

    // Meta units would fill the whole slab
    let err = h
        .engine
        .commit_content(deal.id, &h.owner, &h.manifest, 2, 1)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Format);

    let err = h
        .engine
        .commit_content(99, &h.owner, &h.manifest, 4, 1)
        .await
        .unwrap_err();
    assert!(matches!(err, LivenessError::DealNotFound(99)));

    let committed = h
        .engine
        .commit_content(deal.id, &h.owner, &h.manifest, 4, 1)
        .await
        .unwrap();
    assert_eq!(committed.current_gen, 0);
    assert_eq!(committed.user_units(), 2);

    let recommitted = h
        .engine
        .commit_content(deal.id, &h.owner, &h.manifest, 4, 1)
        .await
        .unwrap();
    assert_eq!(recommitted.current_gen, 1);
}

#[tokio::test]
async fn test_metrics_track_engine_activity() {
    let metrics = LivenessMetrics::new().unwrap();
    let mut h = Harness::new().await;
    h.engine.set_metrics(&metrics).await.unwrap();

    let p1 = h.register(1, Capabilities::General).await;
    let deal_id = h.deal("Hot", &[p1]).await;

    let proof = LivenessProof::System(h.proof(2, 5));
    h.engine.prove_liveness(deal_id, &p1, 0, proof.clone()).await.unwrap();
    h.engine.prove_liveness(deal_id, &p1, 0, proof).await.unwrap();

    let mut bad = h.proof(2, 6);
    bad.z[0] ^= 1;
    h.engine
        .prove_liveness(deal_id, &p1, 0, LivenessProof::System(bad))
        .await
        .unwrap();
    h.run_to(10).await;

    assert_eq!(metrics.credits_recorded.get(), 1);
    assert_eq!(metrics.credits_deduplicated.get(), 1);
    assert_eq!(metrics.proofs_rejected.get(), 1);
    assert_eq!(metrics.quota_shortfalls.get(), 1);
    assert!(metrics.gather().contains("nil_quota_shortfalls_total 1"));
}

#[test]
fn test_invalid_config_rejected() {
    let mut bad = config();
    bad.liveness.epoch_len_blocks = 0;
    assert!(matches!(
        LivenessEngine::open(&bad),
        Err(LivenessError::ConfigError(_))
    ));

    let mut bad = config();
    bad.chain_id.clear();
    assert!(LivenessEngine::open(&bad).is_err());
}

#[cfg(feature = "rocksdb")]
#[tokio::test]
async fn test_state_survives_reopen() {
    use nil_ledger::{BackendType, StorageConfig};
    use nil_types::Assignment;

    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config();
    cfg.storage = StorageConfig {
        backend_type: BackendType::RocksDB {
            path: dir.path().join("ledger").to_string_lossy().into_owned(),
        },
    };

    let deal_id = {
        let engine = LivenessEngine::open(&cfg).unwrap();
        engine.begin_block(1, b"header-1").await.unwrap();
        engine
            .register_provider(
                addr(1),
                Capabilities::General,
                1 << 40,
                &["/ip4/127.0.0.1/tcp/9000".to_string()],
            )
            .await
            .unwrap();
        let deal = engine
            .create_deal(nil_liveness::NewDeal {
                owner: addr(0xEE),
                service_hint: "Hot".to_string(),
                start_block: 1,
                end_block: 100,
                escrow_balance: 0,
                providers: vec![addr(1)],
            })
            .await
            .unwrap();
        for height in 2..=10 {
            engine.begin_block(height, b"h").await.unwrap();
            engine.end_block(height).await.unwrap();
        }
        deal.id
    };

    let engine = LivenessEngine::open(&cfg).unwrap();
    assert_eq!(engine.chain_height().await.unwrap(), 10);
    assert!(engine.get_deal(deal_id).await.unwrap().is_some());
    assert!(engine.get_provider(&addr(1)).await.unwrap().is_some());
    assert!(engine.epoch_seed(0).await.unwrap().is_some());
    // No content committed, so the epoch pass left no missed record
    assert_eq!(
        engine
            .missed_epochs(deal_id, &Assignment::Provider(addr(1)))
            .await
            .unwrap(),
        0
    );
}
