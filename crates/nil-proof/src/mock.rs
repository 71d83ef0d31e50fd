//! Deterministic hash-based stand-in for a polynomial commitment scheme.
//!
//! Proofs are keyed digests over the public inputs, so this offers no
//! soundness. It reproduces the accept/reject behaviour of a real scheme for
//! well-formed inputs, which is what tests and local devnets need.

use crate::commitment::{Commitment, CommitmentScheme, OpeningProof, Scalar};
use sha2::{Digest, Sha256, Sha384};

const COMMIT_TAG: &[u8] = b"nilstore/mock/commit";
const EVAL_TAG: &[u8] = b"nilstore/mock/eval";
const OPEN_TAG: &[u8] = b"nilstore/mock/open";
const MANIFEST_TAG: &[u8] = b"nilstore/mock/manifest";
const MANIFEST_OPEN_TAG: &[u8] = b"nilstore/mock/manifest-open";

#[derive(Debug, Clone, Copy, Default)]
pub struct HashCommitment;

impl HashCommitment {
    fn opening(commitment: &Commitment, z: &Scalar, y: &Scalar) -> OpeningProof {
        let mut h = Sha384::new();
        h.update(OPEN_TAG);
        h.update(commitment);
        h.update(z);
        h.update(y);
        finish(h)
    }

    fn manifest_opening(manifest: &Commitment, index: u64, leaf: &Scalar) -> OpeningProof {
        let mut h = Sha384::new();
        h.update(MANIFEST_OPEN_TAG);
        h.update(manifest);
        h.update(index.to_be_bytes());
        h.update(leaf);
        finish(h)
    }
}

fn finish(h: Sha384) -> [u8; 48] {
    let mut out = [0u8; 48];
    out.copy_from_slice(&h.finalize());
    out
}

impl CommitmentScheme for HashCommitment {
    fn commit(&self, data: &[u8]) -> Commitment {
        let mut h = Sha384::new();
        h.update(COMMIT_TAG);
        h.update(data);
        finish(h)
    }

    fn open(&self, data: &[u8], z: &Scalar) -> (Scalar, OpeningProof) {
        let mut h = Sha256::new();
        h.update(EVAL_TAG);
        h.update(data);
        h.update(z);
        let y: Scalar = h.finalize().into();
        let proof = Self::opening(&self.commit(data), z, &y);
        (y, proof)
    }

    fn verify_open(
        &self,
        commitment: &Commitment,
        z: &Scalar,
        y: &Scalar,
        proof: &OpeningProof,
    ) -> bool {
        &Self::opening(commitment, z, y) == proof
    }

    fn commit_manifest(&self, unit_roots: &[Scalar]) -> Commitment {
        let mut h = Sha384::new();
        h.update(MANIFEST_TAG);
        for root in unit_roots {
            h.update(root);
        }
        finish(h)
    }

    fn open_manifest(&self, unit_roots: &[Scalar], index: u64) -> Option<OpeningProof> {
        let leaf = unit_roots.get(usize::try_from(index).ok()?)?;
        let manifest = self.commit_manifest(unit_roots);
        Some(Self::manifest_opening(&manifest, index, leaf))
    }

    fn verify_manifest_opening(
        &self,
        manifest: &Commitment,
        index: u64,
        opening: &OpeningProof,
        leaf_value: &Scalar,
    ) -> bool {
        &Self::manifest_opening(manifest, index, leaf_value) == opening
    }
}
