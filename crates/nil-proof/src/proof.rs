use crate::commitment::{Commitment, CommitmentScheme, OpeningProof, Scalar};
use crate::error::{ProofError, Result};
use crate::merkle::{self, Node};
use nil_types::{COMMITMENT_SIZE, SCALAR_SIZE};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::debug;

/// Positions addressable by a manifest opening
pub const MANIFEST_DOMAIN: u64 = 4096;

/// Proof that chunk `chunk_index` of unit `unit_index` is backed by a deal's
/// manifest root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainedProof {
    pub unit_index: u64,
    pub unit_root_fr: Vec<u8>,
    pub manifest_opening: Vec<u8>,
    pub chunk_commitment: Vec<u8>,
    pub merkle_path: Vec<Vec<u8>>,
    pub chunk_index: u64,
    pub z: Vec<u8>,
    pub y: Vec<u8>,
    pub opening_proof: Vec<u8>,
}

/// Fixed-width view of a proof after length validation
struct CheckedProof {
    unit_root: Scalar,
    manifest_opening: OpeningProof,
    chunk_commitment: Commitment,
    path: Vec<Node>,
    z: Scalar,
    y: Scalar,
    opening_proof: OpeningProof,
}

fn fixed<const N: usize>(field: &str, bytes: &[u8]) -> Result<[u8; N]> {
    if bytes.len() != N {
        return Err(ProofError::MalformedProof(format!(
            "{} must be {} bytes, got {}",
            field,
            N,
            bytes.len()
        )));
    }
    let mut out = [0u8; N];
    out.copy_from_slice(bytes);
    Ok(out)
}

impl ChainedProof {
    fn check(&self) -> Result<CheckedProof> {
        let manifest_opening = fixed::<COMMITMENT_SIZE>("manifest_opening", &self.manifest_opening)?;
        let unit_root = fixed::<SCALAR_SIZE>("unit_root_fr", &self.unit_root_fr)?;
        let chunk_commitment = fixed::<COMMITMENT_SIZE>("chunk_commitment", &self.chunk_commitment)?;
        if self.merkle_path.is_empty() {
            return Err(ProofError::MalformedProof("merkle_path is empty".to_string()));
        }
        let path = self
            .merkle_path
            .iter()
            .map(|node| fixed::<SCALAR_SIZE>("merkle_path node", node))
            .collect::<Result<Vec<_>>>()?;
        let z = fixed::<SCALAR_SIZE>("z", &self.z)?;
        let y = fixed::<SCALAR_SIZE>("y", &self.y)?;
        let opening_proof = fixed::<COMMITMENT_SIZE>("opening_proof", &self.opening_proof)?;

        Ok(CheckedProof {
            unit_root,
            manifest_opening,
            chunk_commitment,
            path,
            z,
            y,
            opening_proof,
        })
    }

    /// Length checks only; no cryptography
    pub fn validate_lengths(&self) -> Result<()> {
        self.check().map(|_| ())
    }

    /// SHA-256 over the canonical field concatenation
    pub fn proof_hash(&self) -> [u8; 32] {
        let mut h = Sha256::new();
        h.update(self.unit_index.to_be_bytes());
        h.update(&self.unit_root_fr);
        h.update(&self.manifest_opening);
        h.update(&self.chunk_commitment);
        h.update(self.chunk_index.to_be_bytes());
        for node in &self.merkle_path {
            h.update(node);
        }
        h.update(&self.z);
        h.update(&self.y);
        h.update(&self.opening_proof);
        h.finalize().into()
    }
}

/// Stateless verifier for [`ChainedProof`]s
#[derive(Clone)]
pub struct ChainedProofVerifier {
    scheme: Arc<dyn CommitmentScheme>,
}

impl ChainedProofVerifier {
    pub fn new(scheme: Arc<dyn CommitmentScheme>) -> Self {
        Self { scheme }
    }

    pub fn scheme(&self) -> &Arc<dyn CommitmentScheme> {
        &self.scheme
    }

    /// Check all three stages against a 48-byte manifest root.
    ///
    /// The error names the first stage that failed; callers treat every
    /// failure as a rejection.
    pub fn verify(&self, manifest_root: &[u8], proof: &ChainedProof) -> Result<()> {
        let checked = proof.check()?;
        let manifest = fixed::<COMMITMENT_SIZE>("manifest_root", manifest_root)?;

        if proof.unit_index >= MANIFEST_DOMAIN
            || !self.scheme.verify_manifest_opening(
                &manifest,
                proof.unit_index,
                &checked.manifest_opening,
                &checked.unit_root,
            )
        {
            return Err(ProofError::InvalidManifestOpening(proof.unit_index));
        }

        if !merkle::verify_path(
            &checked.chunk_commitment,
            &checked.path,
            proof.chunk_index,
            &checked.unit_root,
        ) {
            return Err(ProofError::InvalidMerklePath(proof.chunk_index));
        }

        if !self.scheme.verify_open(
            &checked.chunk_commitment,
            &checked.z,
            &checked.y,
            &checked.opening_proof,
        ) {
            return Err(ProofError::InvalidOpeningProof);
        }

        debug!(
            unit_index = proof.unit_index,
            chunk_index = proof.chunk_index,
            "🔐 Chained proof verified"
        );
        Ok(())
    }

    pub fn is_valid(&self, manifest_root: &[u8], proof: &ChainedProof) -> bool {
        self.verify(manifest_root, proof).is_ok()
    }
}

impl std::fmt::Debug for ChainedProofVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainedProofVerifier").finish_non_exhaustive()
    }
}
