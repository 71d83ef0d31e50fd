//! Chained proof verification: manifest opening, witness Merkle path and
//! polynomial opening, plus the liveness proof variants built on it.

pub mod commitment;
pub mod error;
pub mod liveness;
pub mod merkle;
pub mod mock;
pub mod proof;
pub mod prover;

pub use commitment::{Commitment, CommitmentScheme, OpeningProof, Scalar};
pub use error::{ProofError, ProofStage, Result};
pub use liveness::{
    LivenessProof, RetrievalReceipt, SessionChunk, SessionProof, SessionReceipt,
};
pub use merkle::MerkleTree;
pub use proof::{ChainedProof, ChainedProofVerifier, MANIFEST_DOMAIN};
pub use prover::{ProofAssembler, UnitWitness};
