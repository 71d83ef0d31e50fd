//! Binary Merkle tree over chunk commitments (Blake2s-256).

use crate::error::{ProofError, Result};
use blake2::{Blake2s256, Digest};
use nil_types::SCALAR_SIZE;

pub type Node = [u8; SCALAR_SIZE];

pub fn hash_leaf(commitment: &[u8]) -> Node {
    Blake2s256::digest(commitment).into()
}

pub fn hash_pair(left: &Node, right: &Node) -> Node {
    let mut hasher = Blake2s256::new();
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

/// Walk a path from `leaf` upwards. An even index means the current node is
/// the left child at that level.
pub fn fold_path<F>(leaf: Node, path: &[Node], mut index: u64, combine: F) -> Node
where
    F: Fn(&Node, &Node) -> Node,
{
    let mut current = leaf;
    for sibling in path {
        current = if index % 2 == 0 {
            combine(&current, sibling)
        } else {
            combine(sibling, &current)
        };
        index /= 2;
    }
    current
}

/// True if `path` authenticates `leaf` at `index` under `root`.
///
/// An index that does not fit in `path.len()` levels is rejected.
pub fn verify_path_with<F>(leaf: Node, path: &[Node], index: u64, root: &Node, combine: F) -> bool
where
    F: Fn(&Node, &Node) -> Node,
{
    if path.len() < 64 && index >> path.len() != 0 {
        return false;
    }
    &fold_path(leaf, path, index, combine) == root
}

pub fn verify_path(commitment: &[u8], path: &[Node], index: u64, root: &Node) -> bool {
    verify_path_with(hash_leaf(commitment), path, index, root, hash_pair)
}

/// Fully materialized tree; `levels[0]` holds the hashed leaves.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    levels: Vec<Vec<Node>>,
}

impl MerkleTree {
    pub fn from_leaves(leaves: &[Node]) -> Result<Self> {
        Self::build(leaves.to_vec(), hash_pair)
    }

    pub fn from_commitments<T: AsRef<[u8]>>(commitments: &[T]) -> Result<Self> {
        let leaves = commitments.iter().map(|c| hash_leaf(c.as_ref())).collect();
        Self::build(leaves, hash_pair)
    }

    pub fn build<F>(leaves: Vec<Node>, combine: F) -> Result<Self>
    where
        F: Fn(&Node, &Node) -> Node,
    {
        if leaves.is_empty() || !leaves.len().is_power_of_two() {
            return Err(ProofError::InvalidTree(format!(
                "leaf count {} is not a power of two",
                leaves.len()
            )));
        }

        let mut levels = vec![leaves];
        while levels[levels.len() - 1].len() > 1 {
            let next = levels[levels.len() - 1]
                .chunks(2)
                .map(|pair| combine(&pair[0], &pair[1]))
                .collect();
            levels.push(next);
        }
        Ok(Self { levels })
    }

    pub fn root(&self) -> Node {
        self.levels[self.levels.len() - 1][0]
    }

    pub fn leaf_count(&self) -> usize {
        self.levels[0].len()
    }

    /// Sibling path from leaf to root
    pub fn proof(&self, index: usize) -> Result<Vec<Node>> {
        if index >= self.leaf_count() {
            return Err(ProofError::InvalidTree(format!(
                "leaf {} out of {}",
                index,
                self.leaf_count()
            )));
        }
        let mut path = Vec::with_capacity(self.levels.len() - 1);
        let mut idx = index;
        for level in &self.levels[..self.levels.len() - 1] {
            path.push(level[idx ^ 1]);
            idx /= 2;
        }
        Ok(path)
    }
}
