use thiserror::Error;

/// Verification stage that rejected a chained proof
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProofStage {
    Format,
    Manifest,
    Merkle,
    Opening,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProofError {
    #[error("Malformed proof: {0}")]
    MalformedProof(String),

    #[error("Manifest opening does not bind unit root at index {0}")]
    InvalidManifestOpening(u64),

    #[error("Merkle path does not reach unit root for chunk {0}")]
    InvalidMerklePath(u64),

    #[error("Polynomial opening proof rejected")]
    InvalidOpeningProof,

    #[error("Invalid tree: {0}")]
    InvalidTree(String),
}

impl ProofError {
    /// Garbage input, as opposed to a cryptographically invalid proof
    pub fn is_malformed(&self) -> bool {
        matches!(self, ProofError::MalformedProof(_) | ProofError::InvalidTree(_))
    }

    pub fn stage(&self) -> ProofStage {
        match self {
            ProofError::MalformedProof(_) | ProofError::InvalidTree(_) => ProofStage::Format,
            ProofError::InvalidManifestOpening(_) => ProofStage::Manifest,
            ProofError::InvalidMerklePath(_) => ProofStage::Merkle,
            ProofError::InvalidOpeningProof => ProofStage::Opening,
        }
    }
}

pub type Result<T> = std::result::Result<T, ProofError>;
