//! Epoch liveness accounting and slot repair for NilStore deals.
//!
//! [`LivenessEngine`] is the entry point. It serializes block hooks, proof
//! submissions and repair requests, and persists all state through a
//! [`nil_ledger::LedgerStore`].

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod logging;
pub mod metrics;
pub mod receipts;
pub mod repair;
pub mod scheduler;

pub use config::EngineConfig;
pub use engine::{EpochCredits, LivenessEngine, NewDeal, ProofOutcome};
pub use error::{ErrorKind, LivenessError, Result};
pub use events::LivenessEvent;
pub use logging::{init_logging, LoggingConfig};
pub use metrics::LivenessMetrics;
pub use repair::SlotRepairController;
pub use scheduler::{Challenge, EpochReport, EpochScheduler, EpochWindow};
