// crates/instproof-merkle/src/lib.rs

//! Keccak256 Merkle commitment over instruction leaves.
//!
//! - Leaf node: `keccak256(leaf_bytes)`.
//! - Parent node: `keccak256(left || right)`.
//! - Odd levels: the unpaired last node is hashed **with itself**
//!   (`keccak256(x || x)`). This is the rule the chain uses when it commits
//!   `InstructionMerkleRoot`; the foreign verifier recombines paths with the
//!   same rule, so it must never change.
//! - Empty input commits to the all-zero digest and has no provable index.
//!
//! Paths are bottom → top. `is_left[i]` is `true` when the sibling at level
//! `i` is the *left* operand of the parent hash.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used
)]

use instproof_crypto::{Digest32, Keccak256, NodeHasher, ZERO_DIGEST};
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;

/// Errors from tree openings and path recombination.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MerkleError {
    /// Requested leaf index does not exist.
    #[error("leaf index {index} out of range for a tree of {len} leaves")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of leaves in the tree.
        len: usize,
    },
    /// Sibling list and direction flags have different lengths.
    #[error("malformed proof: {path} siblings but {flags} direction flags")]
    MalformedProof {
        /// Sibling count.
        path: usize,
        /// Flag count.
        flags: usize,
    },
}

/// Inclusion path for one leaf.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MerkleProof {
    /// Sibling digests, bottom → top.
    pub path: Vec<Digest32>,
    /// `true` when the sibling at the same level is the left operand.
    pub is_left: Vec<bool>,
}

impl MerkleProof {
    /// Number of levels in the path.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.path.len()
    }

    /// `true` for single-leaf trees.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    /// Recompute the root from an already-hashed leaf using `hasher`.
    pub fn recombine_with<H: NodeHasher>(
        &self,
        hasher: &H,
        leaf_hash: Digest32,
    ) -> Result<Digest32, MerkleError> {
        if self.path.len() != self.is_left.len() {
            return Err(MerkleError::MalformedProof {
                path: self.path.len(),
                flags: self.is_left.len(),
            });
        }
        let mut cur = leaf_hash;
        for (sib, &left) in self.path.iter().zip(&self.is_left) {
            cur = if left {
                hasher.hash_nodes(sib, &cur)
            } else {
                hasher.hash_nodes(&cur, sib)
            };
        }
        Ok(cur)
    }

    /// Keccak256 recombination (the chain's hash).
    pub fn recombine(&self, leaf_hash: Digest32) -> Result<Digest32, MerkleError> {
        self.recombine_with(&Keccak256, leaf_hash)
    }

    /// Check that `leaf_data` (unhashed) recombines to `root`.
    #[must_use]
    pub fn verify(&self, root: &Digest32, leaf_data: &[u8]) -> bool {
        self.recombine(Keccak256.hash_leaf(leaf_data))
            .is_ok_and(|r| r == *root)
    }

    /// Hex-encoded siblings (wire form).
    #[must_use]
    pub fn path_hex(&self) -> Vec<String> {
        self.path.iter().map(hex::encode).collect()
    }
}

/// Level-ordered Merkle tree; `levels[0]` holds the leaf hashes and the last
/// level holds the single root.
#[derive(Clone, Debug)]
pub struct MerkleTree<H: NodeHasher = Keccak256> {
    levels: Vec<Vec<Digest32>>,
    _hasher: PhantomData<H>,
}

impl MerkleTree<Keccak256> {
    /// Hash each item of `data` as a leaf and build the tree.
    #[must_use]
    pub fn from_data<T: AsRef<[u8]>>(data: &[T]) -> Self {
        Self::from_data_with(Keccak256, data)
    }
}

impl<H: NodeHasher> MerkleTree<H> {
    /// Build from raw leaf pre-images with a custom hasher.
    #[must_use]
    pub fn from_data_with<T: AsRef<[u8]>>(hasher: H, data: &[T]) -> Self {
        let leaves = data.iter().map(|d| hasher.hash_leaf(d.as_ref())).collect();
        Self::from_leaf_hashes_with(hasher, leaves)
    }

    /// Build from already-hashed leaves.
    #[must_use]
    pub fn from_leaf_hashes_with(hasher: H, leaves: Vec<Digest32>) -> Self {
        let mut levels = vec![leaves];
        loop {
            let lvl = &levels[levels.len() - 1];
            if lvl.len() <= 1 {
                break;
            }
            let next: Vec<Digest32> = lvl
                .chunks(2)
                .map(|pair| match pair {
                    [l, r] => hasher.hash_nodes(l, r),
                    // odd tail: pair the node with itself
                    [l] => hasher.hash_nodes(l, l),
                    _ => unreachable!("chunks(2) yields one or two nodes"),
                })
                .collect();
            levels.push(next);
        }
        Self {
            levels,
            _hasher: PhantomData,
        }
    }

    /// Number of leaves.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.levels[0].len()
    }

    /// `true` if the tree has no leaves.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.levels[0].is_empty()
    }

    /// Tree root (all zeros when empty).
    #[must_use]
    pub fn root(&self) -> Digest32 {
        self.levels
            .last()
            .and_then(|top| top.first())
            .copied()
            .unwrap_or(ZERO_DIGEST)
    }

    /// Inclusion path for the leaf at `index`.
    pub fn prove(&self, index: usize) -> Result<MerkleProof, MerkleError> {
        if index >= self.len() {
            return Err(MerkleError::IndexOutOfRange {
                index,
                len: self.len(),
            });
        }
        let depth = self.levels.len() - 1;
        let mut path = Vec::with_capacity(depth);
        let mut is_left = Vec::with_capacity(depth);
        let mut idx = index;
        for lvl in &self.levels[..depth] {
            let sib = idx ^ 1;
            // A missing right sibling means the node was paired with itself.
            let node = lvl.get(sib).unwrap_or(&lvl[idx]);
            path.push(*node);
            is_left.push(sib < idx);
            idx >>= 1;
        }
        Ok(MerkleProof { path, is_left })
    }
}

/// Keccak256 Merkle root of raw leaf pre-images.
#[must_use]
pub fn merkle_root<T: AsRef<[u8]>>(data: &[T]) -> Digest32 {
    MerkleTree::from_data(data).root()
}

/// Build the tree over `data` and open `index` in one call.
pub fn build_proof<T: AsRef<[u8]>>(
    data: &[T],
    index: usize,
) -> Result<(MerkleProof, Digest32), MerkleError> {
    let tree = MerkleTree::from_data(data);
    let proof = tree.prove(index)?;
    Ok((proof, tree.root()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use instproof_crypto::keccak256;

    fn pair(a: &Digest32, b: &Digest32) -> Digest32 {
        Keccak256.hash_nodes(a, b)
    }

    #[test]
    fn empty_tree_root_is_zero() {
        let t = MerkleTree::from_data::<&[u8]>(&[]);
        assert!(t.is_empty());
        assert_eq!(t.root(), ZERO_DIGEST);
        assert!(matches!(
            t.prove(0),
            Err(MerkleError::IndexOutOfRange { index: 0, len: 0 })
        ));
    }

    #[test]
    fn three_leaves_duplicates_the_tail() {
        let (a, b, c) = (keccak256(b"a"), keccak256(b"b"), keccak256(b"c"));
        let expected = pair(&pair(&a, &b), &pair(&c, &c));
        assert_eq!(merkle_root(&[b"a", b"b", b"c"]), expected);
    }

    #[test]
    fn tail_leaf_path_carries_itself() {
        let t = MerkleTree::from_data(&[b"a", b"b", b"c"]);
        let p = t.prove(2).unwrap();
        let c = keccak256(b"c");
        assert_eq!(p.path[0], c);
        assert_eq!(p.is_left, vec![false, true]);
        assert!(p.verify(&t.root(), b"c"));
    }

    #[test]
    fn malformed_proof_rejected() {
        let p = MerkleProof {
            path: vec![ZERO_DIGEST],
            is_left: vec![],
        };
        assert_eq!(
            p.recombine(ZERO_DIGEST),
            Err(MerkleError::MalformedProof { path: 1, flags: 0 })
        );
    }
}
