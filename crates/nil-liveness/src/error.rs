use nil_ledger::LedgerError;
use nil_proof::ProofError;
use nil_slab::SlabError;
use nil_types::{Address, DealId, TypesError};
use thiserror::Error;

/// Coarse grouping used by callers to decide how to surface an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Format,
    Proof,
    State,
    Scheduling,
    Storage,
    Config,
}

#[derive(Error, Debug)]
pub enum LivenessError {
    #[error("Slab format error: {0}")]
    Format(#[from] SlabError),

    #[error("Proof rejected: {0}")]
    Proof(#[from] ProofError),

    #[error("Deal not found: {0}")]
    DealNotFound(DealId),

    #[error("Slot {slot} not found in deal {deal_id}")]
    SlotNotFound { deal_id: DealId, slot: u32 },

    #[error("Provider not found: {0}")]
    ProviderNotFound(Address),

    #[error("Provider already registered: {0}")]
    ProviderExists(Address),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Invalid pending provider: {0}")]
    InvalidPendingProvider(String),

    #[error("Provider {provider} is not eligible: {reason}")]
    ProviderIneligible { provider: Address, reason: String },

    #[error("Provider {0} is already assigned to this deal")]
    AlreadyAssigned(Address),

    #[error("Provider {provider} is not assigned to deal {deal_id}")]
    NotAssigned { deal_id: DealId, provider: Address },

    #[error("Deal {0} is not erasure-coded")]
    NotErasureCoded(DealId),

    #[error("Nonce {nonce} for {file_path:?} must exceed {last}")]
    NonceReplay {
        file_path: String,
        nonce: u64,
        last: u64,
    },

    #[error("Receipt expired at height {expires_at} (current {height})")]
    ReceiptExpired { expires_at: u64, height: u64 },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Epoch mismatch: expected {expected}, got {got}")]
    EpochMismatch { expected: u64, got: u64 },

    #[error("Receipt batch is empty")]
    EmptyBatch,

    #[error("No repair candidate for slot {slot} of deal {deal_id}")]
    NoRepairCandidate { deal_id: DealId, slot: u32 },

    #[error("Quota overflow: {0}")]
    QuotaOverflow(String),

    #[error("Invalid epoch parameters: {0}")]
    InvalidEpochParams(String),

    #[error("Seed unavailable for epoch {0}")]
    SeedUnavailable(u64),

    #[error("Storage error: {0}")]
    Storage(#[from] LedgerError),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<TypesError> for LivenessError {
    fn from(e: TypesError) -> Self {
        match e {
            TypesError::InvalidStateTransition { from, to } => {
                LivenessError::InvalidTransition { from, to }
            }
            other => LivenessError::InvalidRequest(other.to_string()),
        }
    }
}

impl LivenessError {
    pub fn kind(&self) -> ErrorKind {
        use LivenessError::*;
        match self {
            Format(_) => ErrorKind::Format,
            Proof(_) => ErrorKind::Proof,
            NoRepairCandidate { .. }
            | QuotaOverflow(_)
            | InvalidEpochParams(_)
            | SeedUnavailable(_) => ErrorKind::Scheduling,
            Storage(_) => ErrorKind::Storage,
            ConfigError(_) => ErrorKind::Config,
            _ => ErrorKind::State,
        }
    }
}

pub type Result<T> = std::result::Result<T, LivenessError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(LivenessError::EmptyBatch.kind(), ErrorKind::State);
        assert_eq!(LivenessError::SeedUnavailable(3).kind(), ErrorKind::Scheduling);
        assert_eq!(
            LivenessError::from(ProofError::InvalidOpeningProof).kind(),
            ErrorKind::Proof
        );
        assert_eq!(
            LivenessError::from(SlabError::BadVersion(9)).kind(),
            ErrorKind::Format
        );
        assert_eq!(
            LivenessError::from(LedgerError::NotFound("k".into())).kind(),
            ErrorKind::Storage
        );
    }

    #[test]
    fn test_type_errors_map_to_state() {
        let err: LivenessError = TypesError::InvalidStateTransition {
            from: "Active".into(),
            to: "Active".into(),
        }
        .into();
        assert!(matches!(err, LivenessError::InvalidTransition { .. }));

        let err: LivenessError = TypesError::InvalidServiceHint("rs=0+1".into()).into();
        assert!(matches!(err, LivenessError::InvalidRequest(_)));
        assert_eq!(err.kind(), ErrorKind::State);
    }
}
