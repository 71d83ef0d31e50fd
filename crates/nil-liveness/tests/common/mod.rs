#![allow(dead_code)]

use nil_ledger::{LedgerStore, MemoryLedger, StorageConfig};
use nil_liveness::{EngineConfig, EpochReport, LivenessEngine, NewDeal};
use nil_proof::mock::HashCommitment;
use nil_proof::{ChainedProof, ProofAssembler, RetrievalReceipt, Scalar, UnitWitness};
use nil_types::{Address, Capabilities, DealId};
use std::sync::Arc;

pub const CHUNK: u64 = 131_072;
pub const UNIT: u64 = 8_388_608;
pub const TOTAL_UNITS: u64 = 4;
pub const WITNESS_UNITS: u64 = 1;

pub fn addr(n: u8) -> Address {
    Address::from_bytes([n; 20])
}

pub fn config() -> EngineConfig {
    let mut config = EngineConfig {
        chain_id: "nil-test".to_string(),
        storage: StorageConfig::memory(),
        ..Default::default()
    };
    config.liveness.epoch_len_blocks = 10;
    config.liveness.evict_after_missed_epochs = 2;
    config
}

/// Engine plus a two-user-unit slab (units 2 and 3) and a prover for it
pub struct Harness {
    pub engine: LivenessEngine,
    pub store: Arc<dyn LedgerStore>,
    pub assembler: ProofAssembler,
    pub unit_roots: Vec<Scalar>,
    pub witnesses: Vec<UnitWitness>,
    pub manifest: [u8; 48],
    pub owner: Address,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_config(config()).await
    }

    pub async fn with_config(config: EngineConfig) -> Self {
        let scheme = Arc::new(HashCommitment);
        let store: Arc<dyn LedgerStore> = Arc::new(MemoryLedger::new());
        let engine = LivenessEngine::new(&config, store.clone(), scheme.clone()).unwrap();
        let assembler = ProofAssembler::new(scheme);

        let witnesses: Vec<UnitWitness> = (0..2u8)
            .map(|u| {
                let chunks = (0..64u8).map(|c| vec![u * 64 + c; 64]).collect();
                assembler.witness_for_chunks(chunks).unwrap()
            })
            .collect();
        let unit_roots = vec![
            [0x10; 32],
            [0x11; 32],
            witnesses[0].root(),
            witnesses[1].root(),
        ];
        let manifest = assembler.manifest_root(&unit_roots);

        engine.begin_block(1, b"header-1").await.unwrap();

        Self {
            engine,
            store,
            assembler,
            unit_roots,
            witnesses,
            manifest,
            owner: addr(0xEE),
        }
    }

    pub async fn register(&self, n: u8, capabilities: Capabilities) -> Address {
        let address = addr(n);
        self.engine
            .register_provider(
                address,
                capabilities,
                1 << 40,
                &["/ip4/127.0.0.1/tcp/9000".to_string()],
            )
            .await
            .unwrap();
        address
    }

    pub fn new_deal(&self, hint: &str, providers: &[Address]) -> NewDeal {
        NewDeal {
            owner: self.owner,
            service_hint: hint.to_string(),
            start_block: 1,
            end_block: 10_000,
            escrow_balance: 1_000_000,
            providers: providers.to_vec(),
        }
    }

    /// Create a deal and commit the harness slab to it
    pub async fn deal(&self, hint: &str, providers: &[Address]) -> DealId {
        let deal = self
            .engine
            .create_deal(self.new_deal(hint, providers))
            .await
            .unwrap();
        self.engine
            .commit_content(deal.id, &self.owner, &self.manifest, TOTAL_UNITS, WITNESS_UNITS)
            .await
            .unwrap();
        deal.id
    }

    pub fn proof(&self, unit: u64, chunk: u64) -> ChainedProof {
        let witness = &self.witnesses[(unit - 2) as usize];
        self.assembler
            .assemble(&self.unit_roots, unit, witness, chunk, [7; 32])
            .unwrap()
    }

    /// Receipt for 4 KiB served from the start of `(unit, chunk)`
    #[allow(clippy::too_many_arguments)]
    pub fn receipt(
        &self,
        deal_id: DealId,
        epoch_id: u64,
        provider: Address,
        path: &str,
        nonce: u64,
        unit: u64,
        chunk: u64,
    ) -> RetrievalReceipt {
        RetrievalReceipt {
            deal_id,
            epoch_id,
            provider,
            file_path: path.to_string(),
            range_start: (unit - 2) * UNIT + chunk * CHUNK,
            range_len: 4096,
            bytes_served: 4096,
            nonce,
            expires_at: 0,
            proof: self.proof(unit, chunk),
        }
    }

    /// Drive blocks up to `target`, returning the reports of closed epochs
    pub async fn run_to(&self, target: u64) -> Vec<EpochReport> {
        let start = self.engine.chain_height().await.unwrap() + 1;
        let mut reports = Vec::new();
        for height in start..=target {
            let header = format!("header-{}", height);
            self.engine.begin_block(height, header.as_bytes()).await.unwrap();
            let report = self.engine.end_block(height).await.unwrap();
            if report.evaluated {
                reports.push(report);
            }
        }
        reports
    }
}
