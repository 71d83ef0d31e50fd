use crate::address::Address;
use crate::error::{Result, TypesError};
use crate::hint::HintBase;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Initial reputation assigned at registration
pub const INITIAL_REPUTATION: i64 = 100;

/// Maximum advertised endpoints per provider
pub const MAX_ENDPOINTS: usize = 8;

/// Maximum length of a single endpoint string
pub const MAX_ENDPOINT_LEN: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capabilities {
    Archive,
    General,
    Edge,
}

impl Capabilities {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capabilities::Archive => "Archive",
            Capabilities::General => "General",
            Capabilities::Edge => "Edge",
        }
    }

    /// Whether a provider with these capabilities may serve a deal with the given hint
    pub fn serves(&self, base: HintBase) -> bool {
        match base {
            HintBase::Hot => matches!(self, Capabilities::General | Capabilities::Edge),
            HintBase::Cold => matches!(self, Capabilities::Archive | Capabilities::General),
            HintBase::General => true,
        }
    }
}

impl FromStr for Capabilities {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Archive" => Ok(Capabilities::Archive),
            "General" => Ok(Capabilities::General),
            "Edge" => Ok(Capabilities::Edge),
            other => Err(TypesError::InvalidCapabilities(other.to_string())),
        }
    }
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderStatus {
    Active,
    Jailed,
}

/// Registered storage provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    pub address: Address,
    pub capabilities: Capabilities,
    pub status: ProviderStatus,
    pub reputation_score: i64,
    pub total_storage: u64,
    pub endpoints: Vec<String>,
}

impl Provider {
    pub fn new(
        address: Address,
        capabilities: Capabilities,
        total_storage: u64,
        endpoints: Vec<String>,
    ) -> Self {
        Self {
            address,
            capabilities,
            status: ProviderStatus::Active,
            reputation_score: INITIAL_REPUTATION,
            total_storage,
            endpoints,
        }
    }

    /// Active and capability-compatible with the hint
    pub fn is_eligible_for(&self, base: HintBase) -> bool {
        self.status == ProviderStatus::Active && self.capabilities.serves(base)
    }
}

/// Validate and canonicalize advertised endpoints.
///
/// Endpoints are multiaddr-style strings (`/dns4/host/tcp/443/https`).
/// Duplicates are dropped, order is preserved.
pub fn normalize_endpoints(raw: &[String]) -> Result<Vec<String>> {
    if raw.is_empty() {
        return Err(TypesError::InvalidParams(
            "at least one endpoint is required".to_string(),
        ));
    }
    if raw.len() > MAX_ENDPOINTS {
        return Err(TypesError::InvalidParams(format!(
            "too many endpoints (max {})",
            MAX_ENDPOINTS
        )));
    }

    let mut out: Vec<String> = Vec::with_capacity(raw.len());
    for ep in raw {
        let ep = ep.trim();
        if ep.is_empty() {
            return Err(TypesError::InvalidParams("endpoint must be non-empty".to_string()));
        }
        if ep.len() > MAX_ENDPOINT_LEN {
            return Err(TypesError::InvalidParams("endpoint too long".to_string()));
        }
        if !ep.starts_with('/') {
            return Err(TypesError::InvalidParams(format!("invalid endpoint: {:?}", ep)));
        }
        if ep.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(TypesError::InvalidParams(
                "endpoint contains whitespace/control characters".to_string(),
            ));
        }
        if !out.iter().any(|e| e == ep) {
            out.push(ep.to_string());
        }
    }
    Ok(out)
}
