//! Path/root properties of the instruction Merkle tree.
//!
//! The reference root below is an independent array-backed construction in
//! the layout the chain uses when it commits `InstructionMerkleRoot`
//! (power-of-two slot array, empty slots, self-pairing of a lone left child).

use instproof_crypto::{keccak256, Digest32, Keccak256, NodeHasher, ZERO_DIGEST};
use instproof_merkle::{build_proof, merkle_root, MerkleError, MerkleTree};
use proptest::prelude::*;

/// Array-backed reference root with the self-pairing rule.
fn reference_root(data: &[Vec<u8>]) -> Digest32 {
    if data.is_empty() {
        return ZERO_DIGEST;
    }
    let width = data.len().next_power_of_two();
    let size = width * 2 - 1;
    let mut slots: Vec<Option<Digest32>> = vec![None; size];
    for (i, d) in data.iter().enumerate() {
        slots[i] = Some(keccak256(d));
    }
    let mut offset = width;
    let mut i = 0;
    while i + 1 < size {
        slots[offset] = match (slots[i], slots[i + 1]) {
            (None, _) => None,
            (Some(l), None) => Some(Keccak256.hash_nodes(&l, &l)),
            (Some(l), Some(r)) => Some(Keccak256.hash_nodes(&l, &r)),
        };
        offset += 1;
        i += 2;
    }
    slots[size - 1].unwrap_or(ZERO_DIGEST)
}

fn leaves(n: usize) -> Vec<Vec<u8>> {
    (0..n).map(|i| format!("leaf-{i}").into_bytes()).collect()
}

#[test]
fn single_leaf_has_empty_path() {
    let data = [b"only".to_vec()];
    let (proof, root) = build_proof(&data, 0).unwrap();
    assert!(proof.is_empty());
    assert_eq!(root, keccak256(b"only"));
    assert!(proof.verify(&root, b"only"));
}

#[test]
fn four_instruction_scenario() {
    let insts: Vec<Vec<String>> = vec![
        vec!["101".into(), "addr1".into(), "amt1".into(), "txAABB".into()],
        vec!["101".into(), "addr2".into(), "amt2".into(), "txCCDD".into()],
        vec!["40".into(), "3".into()],
        vec!["41".into(), "7".into(), "x".into()],
    ];
    let flat: Vec<Vec<u8>> = insts.iter().map(|i| i.concat().into_bytes()).collect();
    let declared = reference_root(&flat);

    let tree = MerkleTree::from_data(&flat);
    let proof = tree.prove(0).unwrap();
    assert_eq!(proof.len(), 2);
    assert_eq!(tree.root(), declared);
    assert_eq!(proof.recombine(keccak256(b"101addr1amt1txAABB")).unwrap(), declared);
}

#[test]
fn odd_rule_matches_reference_for_small_trees() {
    for n in 0..=33 {
        let data = leaves(n);
        assert_eq!(merkle_root(&data), reference_root(&data), "n = {n}");
    }
}

#[test]
fn rebuilds_are_deterministic() {
    let data = leaves(7);
    let a = MerkleTree::from_data(&data);
    let b = MerkleTree::from_data(&data);
    assert_eq!(a.root(), b.root());
    for i in 0..data.len() {
        assert_eq!(a.prove(i).unwrap(), b.prove(i).unwrap());
    }
}

#[test]
fn out_of_range_is_an_error() {
    let data = leaves(5);
    assert_eq!(
        build_proof(&data, 5).unwrap_err(),
        MerkleError::IndexOutOfRange { index: 5, len: 5 }
    );
}

#[test]
fn tampered_leaf_does_not_verify() {
    let data = leaves(6);
    let (proof, root) = build_proof(&data, 3).unwrap();
    assert!(proof.verify(&root, &data[3]));
    assert!(!proof.verify(&root, b"leaf-x"));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn every_index_recombines_to_root(
        data in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..24), 1..40),
        pick in any::<prop::sample::Index>(),
    ) {
        let tree = MerkleTree::from_data(&data);
        let i = pick.index(data.len());
        let proof = tree.prove(i).unwrap();
        prop_assert_eq!(proof.recombine(keccak256(&data[i])).unwrap(), tree.root());
        prop_assert_eq!(tree.root(), reference_root(&data));
    }
}
