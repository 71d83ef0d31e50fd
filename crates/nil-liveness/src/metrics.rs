use prometheus::{IntCounter, IntGauge, Registry, TextEncoder};
use std::sync::Arc;

/// Prometheus counters for the liveness engine
#[derive(Clone)]
pub struct LivenessMetrics {
    registry: Arc<Registry>,
    pub credits_recorded: Arc<IntCounter>,
    pub credits_deduplicated: Arc<IntCounter>,
    pub synthetic_recorded: Arc<IntCounter>,
    pub quota_shortfalls: Arc<IntCounter>,
    pub repairs_started: Arc<IntCounter>,
    pub repairs_completed: Arc<IntCounter>,
    pub proofs_rejected: Arc<IntCounter>,
    pub slots_repairing: Arc<IntGauge>,
}

impl LivenessMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let counter = |name: &str, help: &str| -> prometheus::Result<Arc<IntCounter>> {
            let c = IntCounter::new(name, help)?;
            registry.register(Box::new(c.clone()))?;
            Ok(Arc::new(c))
        };

        let credits_recorded = counter("nil_credits_recorded_total", "Proof credits recorded")?;
        let credits_deduplicated = counter(
            "nil_credits_deduplicated_total",
            "Credits ignored because their id was already seen",
        )?;
        let synthetic_recorded =
            counter("nil_synthetic_credits_recorded_total", "Retrieval credits recorded")?;
        let quota_shortfalls = counter(
            "nil_quota_shortfalls_total",
            "Assignments that missed their epoch quota",
        )?;
        let repairs_started = counter("nil_slot_repairs_started_total", "Slot repairs started")?;
        let repairs_completed =
            counter("nil_slot_repairs_completed_total", "Slot repairs completed")?;
        let proofs_rejected = counter("nil_proofs_rejected_total", "System proofs rejected")?;

        let slots_repairing = IntGauge::new("nil_slots_repairing", "Slots currently repairing")?;
        registry.register(Box::new(slots_repairing.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            credits_recorded,
            credits_deduplicated,
            synthetic_recorded,
            quota_shortfalls,
            repairs_started,
            repairs_completed,
            proofs_rejected,
            slots_repairing: Arc::new(slots_repairing),
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Text exposition of every registered metric
    pub fn gather(&self) -> String {
        let encoder = TextEncoder::new();
        encoder
            .encode_to_string(&self.registry.gather())
            .unwrap_or_default()
    }
}
