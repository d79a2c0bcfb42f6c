// crates/instproof-crypto/src/lib.rs

//! Minimal crypto substrate: Keccak256 digests, the node-hasher trait the
//! Merkle crate is generic over, and the chain's Base58Check text encoding
//! (see [`base58check`]).
//!
//! The foreign-ledger verifier recomputes instruction roots with Keccak256
//! (the Ethereum variant, *not* NIST SHA3-256), so every digest produced here
//! must stay bit-identical to that construction.

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

use sha3::{Digest, Keccak256 as Keccak256Core};

pub mod base58check;

/// A 32-byte digest.
pub type Digest32 = [u8; 32];

/// All-zero digest; the root of an empty tree.
pub const ZERO_DIGEST: Digest32 = [0u8; 32];

/// Hash interface used by Merkle construction.
///
/// Implementations must be deterministic and must not apply any domain
/// separation the external verifier does not also apply.
pub trait NodeHasher {
    /// Hash a raw leaf pre-image into a leaf node.
    #[must_use]
    fn hash_leaf(&self, data: &[u8]) -> Digest32;

    /// Hash an ordered pair of child nodes into their parent.
    #[must_use]
    fn hash_nodes(&self, left: &Digest32, right: &Digest32) -> Digest32;
}

/// Keccak256 hasher (Ethereum flavour, 0x01 padding).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Keccak256;

impl NodeHasher for Keccak256 {
    #[inline]
    fn hash_leaf(&self, data: &[u8]) -> Digest32 {
        keccak256(data)
    }

    #[inline]
    fn hash_nodes(&self, left: &Digest32, right: &Digest32) -> Digest32 {
        keccak256_concat(&[left, right])
    }
}

/// Keccak256 of a single byte string.
#[inline]
#[must_use]
pub fn keccak256(data: &[u8]) -> Digest32 {
    let mut h = Keccak256Core::new();
    h.update(data);
    h.finalize().into()
}

/// Keccak256 over the concatenation of `parts` (no separators, no length prefixes).
#[must_use]
pub fn keccak256_concat(parts: &[&[u8]]) -> Digest32 {
    let mut h = Keccak256Core::new();
    for p in parts {
        h.update(p);
    }
    h.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::{keccak256, keccak256_concat, Keccak256, NodeHasher};

    #[test]
    fn known_vectors() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
        assert_eq!(
            hex::encode(keccak256(b"abc")),
            "4e03657aea45a94fc7d47ba826c8d667c0d1e6e33a64a036ec44f58fa12d6c45"
        );
    }

    #[test]
    fn concat_matches_single_buffer() {
        let joined = keccak256(b"helloworld");
        assert_eq!(keccak256_concat(&[b"hello", b"world"]), joined);
    }

    #[test]
    fn node_order_matters() {
        let a = keccak256(b"a");
        let b = keccak256(b"b");
        let h = Keccak256;
        assert_ne!(h.hash_nodes(&a, &b), h.hash_nodes(&b, &a));
        let mut buf = a.to_vec();
        buf.extend_from_slice(&b);
        assert_eq!(h.hash_nodes(&a, &b), keccak256(&buf));
    }
}
