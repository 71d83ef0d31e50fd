use crate::error::{LivenessError, Result};
use crate::logging::LoggingConfig;
use nil_ledger::StorageConfig;
use nil_types::LivenessParams;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Mixed into every epoch seed
    pub chain_id: String,
    pub liveness: LivenessParams,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chain_id: "nilstore-local".to_string(),
            liveness: LivenessParams::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, raw: Option<String>) -> Result<Option<T>> {
    match raw {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| LivenessError::ConfigError(format!("{} has invalid value {:?}", name, raw))),
        None => Ok(None),
    }
}

impl EngineConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| LivenessError::ConfigError(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| LivenessError::ConfigError(e.to_string()))
    }

    /// Overlay `NIL_*` environment variables
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|name| env::var(name).ok())
    }

    /// Overlay `NIL_*` settings resolved through `lookup`; blank strings are ignored
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |name: &str| lookup(name).filter(|v| !v.is_empty());

        if let Some(chain_id) = text("NIL_CHAIN_ID") {
            self.chain_id = chain_id;
        }
        if let Some(len) = parse_var("NIL_EPOCH_LEN", lookup("NIL_EPOCH_LEN"))? {
            self.liveness.epoch_len_blocks = len;
        }
        if let Some(n) = parse_var("NIL_EVICT_AFTER", lookup("NIL_EVICT_AFTER"))? {
            self.liveness.evict_after_missed_epochs = n;
        }
        if let Some(bps) = parse_var("NIL_CREDIT_CAP_BPS", lookup("NIL_CREDIT_CAP_BPS"))? {
            self.liveness.credit_cap_bps = bps;
        }
        if let Some(level) = text("NIL_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(dir) = text("NIL_DATA_DIR") {
            self.storage.set_data_dir(&dir);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.chain_id.is_empty() {
            return Err(LivenessError::ConfigError("chain_id must be set".to_string()));
        }
        self.liveness
            .validate()
            .map_err(|e| LivenessError::ConfigError(e.to_string()))?;
        Ok(())
    }
}
