use nil_types::{COMMITMENT_SIZE, SCALAR_SIZE};

pub type Commitment = [u8; COMMITMENT_SIZE];
pub type Scalar = [u8; SCALAR_SIZE];
pub type OpeningProof = [u8; COMMITMENT_SIZE];

/// Polynomial commitment backend.
///
/// Implementations are expected to be correct and constant-time; callers
/// never look inside commitments or proofs.
pub trait CommitmentScheme: Send + Sync {
    /// Commit to one chunk of data
    fn commit(&self, data: &[u8]) -> Commitment;

    /// Evaluate the chunk polynomial at `z`, returning `(y, proof)`
    fn open(&self, data: &[u8], z: &Scalar) -> (Scalar, OpeningProof);

    fn verify_open(&self, commitment: &Commitment, z: &Scalar, y: &Scalar, proof: &OpeningProof)
        -> bool;

    /// Commit to the vector of per-unit roots
    fn commit_manifest(&self, unit_roots: &[Scalar]) -> Commitment;

    /// Opening of position `index` of the manifest vector, if in range
    fn open_manifest(&self, unit_roots: &[Scalar], index: u64) -> Option<OpeningProof>;

    fn verify_manifest_opening(
        &self,
        manifest: &Commitment,
        index: u64,
        opening: &OpeningProof,
        leaf_value: &Scalar,
    ) -> bool;
}
