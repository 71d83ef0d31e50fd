//! Liveness proof variants accepted from providers.

use crate::merkle::{self, Node};
use crate::proof::ChainedProof;
use nil_types::{Address, DealId};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

const SESSION_LEAF_TAG: &[u8] = b"nilstore/session/v1";

/// Retrieval receipt countersigned by the deal owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalReceipt {
    pub deal_id: DealId,
    pub epoch_id: u64,
    pub provider: Address,
    pub file_path: String,
    pub range_start: u64,
    pub range_len: u64,
    pub bytes_served: u64,
    pub nonce: u64,
    /// Zero means no expiry
    pub expires_at: u64,
    pub proof: ChainedProof,
}

/// Receipt covering a whole download session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionReceipt {
    pub deal_id: DealId,
    pub epoch_id: u64,
    pub provider: Address,
    pub file_path: String,
    pub total_bytes: u64,
    pub chunk_count: u64,
    /// Root of the session tree over [`session_leaf`]s
    pub chunk_leaf_root: Vec<u8>,
    pub nonce: u64,
    pub expires_at: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionChunk {
    pub leaf_index: u32,
    pub range_start: u64,
    pub range_len: u64,
    pub proof: ChainedProof,
    pub merkle_path: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionProof {
    pub receipt: SessionReceipt,
    pub chunks: Vec<SessionChunk>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LivenessProof {
    /// Direct proof against the epoch's challenge
    System(ChainedProof),
    UserReceipt(RetrievalReceipt),
    UserReceiptBatch(Vec<RetrievalReceipt>),
    Session(SessionProof),
}

impl LivenessProof {
    pub fn kind(&self) -> &'static str {
        match self {
            LivenessProof::System(_) => "system",
            LivenessProof::UserReceipt(_) => "user_receipt",
            LivenessProof::UserReceiptBatch(_) => "user_receipt_batch",
            LivenessProof::Session(_) => "session",
        }
    }
}

pub fn session_leaf(range_start: u64, range_len: u64, proof_hash: &[u8; 32]) -> Node {
    let mut h = Sha256::new();
    h.update(SESSION_LEAF_TAG);
    h.update(range_start.to_be_bytes());
    h.update(range_len.to_be_bytes());
    h.update(proof_hash);
    h.finalize().into()
}

pub fn session_pair(left: &Node, right: &Node) -> Node {
    let mut h = Sha256::new();
    h.update(left);
    h.update(right);
    h.finalize().into()
}

impl SessionChunk {
    pub fn leaf(&self) -> Node {
        session_leaf(self.range_start, self.range_len, &self.proof.proof_hash())
    }

    /// Check this chunk's leaf against the session root
    pub fn verify_inclusion(&self, root: &[u8]) -> bool {
        let Ok(root) = <[u8; 32]>::try_from(root) else {
            return false;
        };
        let mut path = Vec::with_capacity(self.merkle_path.len());
        for node in &self.merkle_path {
            match <[u8; 32]>::try_from(node.as_slice()) {
                Ok(n) => path.push(n),
                Err(_) => return false,
            }
        }
        merkle::verify_path_with(self.leaf(), &path, self.leaf_index as u64, &root, session_pair)
    }
}
