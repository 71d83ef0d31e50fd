use crate::constants::BPS_DENOMINATOR;
use crate::error::{Result, TypesError};
use serde::{Deserialize, Serialize};

/// Epoch liveness and repair parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LivenessParams {
    /// Blocks per accounting epoch
    pub epoch_len_blocks: u64,
    /// Quota for hot deals, in basis points of slot bytes
    pub quota_bps_hot: u64,
    /// Quota for cold deals, in basis points of slot bytes
    pub quota_bps_cold: u64,
    pub quota_min_blobs: u64,
    /// Upper bound on quota; zero disables the bound
    pub quota_max_blobs: u64,
    /// Share of quota that real proof credits may satisfy
    pub credit_cap_bps: u64,
    /// Share of quota that synthetic (retrieval) credits may satisfy
    pub synthetic_cap_bps: u64,
    /// Missed epochs after which an erasure-coded slot is repaired; zero disables
    pub evict_after_missed_epochs: u64,
    /// Consecutive failed system proofs before a provider is flagged degraded
    pub provider_failure_threshold: u64,
}

impl Default for LivenessParams {
    fn default() -> Self {
        Self {
            epoch_len_blocks: 100,
            quota_bps_hot: 100,  // 1% of slot bytes per epoch
            quota_bps_cold: 50,  // 0.5%
            quota_min_blobs: 1,
            quota_max_blobs: 64, // one unit's worth of chunks
            credit_cap_bps: 5000,
            synthetic_cap_bps: 10_000,
            evict_after_missed_epochs: 3,
            provider_failure_threshold: 3,
        }
    }
}

impl LivenessParams {
    pub fn validate(&self) -> Result<()> {
        if self.epoch_len_blocks == 0 {
            return Err(TypesError::InvalidParams(
                "epoch_len_blocks must be positive".to_string(),
            ));
        }
        if self.quota_bps_hot > BPS_DENOMINATOR || self.quota_bps_cold > BPS_DENOMINATOR {
            return Err(TypesError::InvalidParams(format!(
                "quota bps must not exceed {}",
                BPS_DENOMINATOR
            )));
        }
        if self.quota_max_blobs > 0 && self.quota_min_blobs > self.quota_max_blobs {
            return Err(TypesError::InvalidParams(format!(
                "quota_min_blobs {} exceeds quota_max_blobs {}",
                self.quota_min_blobs, self.quota_max_blobs
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let params = LivenessParams::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.epoch_len_blocks, 100);
        assert_eq!(params.evict_after_missed_epochs, 3);
    }

    #[test]
    fn test_invalid_params() {
        let mut params = LivenessParams {
            epoch_len_blocks: 0,
            ..Default::default()
        };
        assert!(params.validate().is_err());

        params.epoch_len_blocks = 10;
        params.quota_min_blobs = 100;
        assert!(params.validate().is_err());

        params.quota_max_blobs = 0;
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let params: LivenessParams = serde_json::from_str(r#"{"epoch_len_blocks": 5}"#).unwrap();
        assert_eq!(params.epoch_len_blocks, 5);
        assert_eq!(params.credit_cap_bps, 5000);
    }
}
