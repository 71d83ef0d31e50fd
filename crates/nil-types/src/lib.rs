pub mod address;
pub mod constants;
pub mod deal;
pub mod error;
pub mod hint;
pub mod lifecycle;
pub mod params;
pub mod provider;
pub mod stripe;

pub use address::Address;
pub use constants::*;
pub use deal::{Assignment, Deal, DealId, Slot, SlotStatus};
pub use error::{Result, TypesError};
pub use hint::{HintBase, ServiceHint};
pub use lifecycle::LifecycleState;
pub use params::LivenessParams;
pub use provider::{normalize_endpoints, Capabilities, Provider, ProviderStatus};
pub use stripe::{RedundancyMode, StripeParams};
