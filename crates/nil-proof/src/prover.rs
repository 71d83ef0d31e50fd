use crate::commitment::{Commitment, CommitmentScheme, Scalar};
use crate::error::{ProofError, Result};
use crate::merkle::MerkleTree;
use crate::proof::ChainedProof;
use nil_types::{CHUNKS_PER_UNIT, CHUNK_SIZE, UNIT_SIZE};
use std::sync::Arc;

/// Chunk commitments and witness tree of one unit
#[derive(Debug, Clone)]
pub struct UnitWitness {
    chunks: Vec<Vec<u8>>,
    commitments: Vec<Commitment>,
    tree: MerkleTree,
}

impl UnitWitness {
    pub fn root(&self) -> Scalar {
        self.tree.root()
    }

    pub fn commitments(&self) -> &[Commitment] {
        &self.commitments
    }

    /// Serialized form stored in witness units
    pub fn witness_bytes(&self) -> Vec<u8> {
        self.commitments.iter().flatten().copied().collect()
    }

    pub fn chunk(&self, index: usize) -> Option<&[u8]> {
        self.chunks.get(index).map(Vec::as_slice)
    }
}

/// Provider-side construction of chained proofs
#[derive(Clone)]
pub struct ProofAssembler {
    scheme: Arc<dyn CommitmentScheme>,
}

impl ProofAssembler {
    pub fn new(scheme: Arc<dyn CommitmentScheme>) -> Self {
        Self { scheme }
    }

    /// Commit a power-of-two list of chunks
    pub fn witness_for_chunks(&self, chunks: Vec<Vec<u8>>) -> Result<UnitWitness> {
        let commitments: Vec<Commitment> = chunks.iter().map(|c| self.scheme.commit(c)).collect();
        let tree = MerkleTree::from_commitments(&commitments)?;
        Ok(UnitWitness {
            chunks,
            commitments,
            tree,
        })
    }

    /// Split a unit into its 64 chunks, zero-padding a short final unit
    pub fn witness_for_unit(&self, unit: &[u8]) -> Result<UnitWitness> {
        if unit.len() > UNIT_SIZE {
            return Err(ProofError::MalformedProof(format!(
                "unit is {} bytes, max {}",
                unit.len(),
                UNIT_SIZE
            )));
        }
        let mut chunks = Vec::with_capacity(CHUNKS_PER_UNIT);
        for i in 0..CHUNKS_PER_UNIT {
            let start = (i * CHUNK_SIZE).min(unit.len());
            let end = ((i + 1) * CHUNK_SIZE).min(unit.len());
            let mut chunk = unit[start..end].to_vec();
            chunk.resize(CHUNK_SIZE, 0);
            chunks.push(chunk);
        }
        self.witness_for_chunks(chunks)
    }

    pub fn manifest_root(&self, unit_roots: &[Scalar]) -> Commitment {
        self.scheme.commit_manifest(unit_roots)
    }

    /// Build the proof for `chunk_index` of `unit_index` at evaluation point `z`.
    ///
    /// `unit_roots` is the full manifest vector in slab order, and
    /// `unit_roots[unit_index]` must be `witness.root()`.
    pub fn assemble(
        &self,
        unit_roots: &[Scalar],
        unit_index: u64,
        witness: &UnitWitness,
        chunk_index: u64,
        z: Scalar,
    ) -> Result<ChainedProof> {
        let manifest_opening = self
            .scheme
            .open_manifest(unit_roots, unit_index)
            .ok_or(ProofError::InvalidManifestOpening(unit_index))?;

        let idx = usize::try_from(chunk_index)
            .map_err(|_| ProofError::InvalidMerklePath(chunk_index))?;
        let chunk = witness
            .chunk(idx)
            .ok_or(ProofError::InvalidMerklePath(chunk_index))?;
        let path = witness.tree.proof(idx)?;
        let (y, opening_proof) = self.scheme.open(chunk, &z);

        Ok(ChainedProof {
            unit_index,
            unit_root_fr: witness.root().to_vec(),
            manifest_opening: manifest_opening.to_vec(),
            chunk_commitment: witness.commitments[idx].to_vec(),
            merkle_path: path.iter().map(|n| n.to_vec()).collect(),
            chunk_index,
            z: z.to_vec(),
            y: y.to_vec(),
            opening_proof: opening_proof.to_vec(),
        })
    }
}
