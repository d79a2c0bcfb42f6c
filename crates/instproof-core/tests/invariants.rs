//! Invariants for the core chain types.
//!
//! These tests treat:
//! - `Hash` text form as a lossless, case-insensitive encoding of the bytes,
//! - `Instruction::flatten` as plain field concatenation (the Merkle leaf), and
//! - chain types as stable under the JSON and CBOR codecs used for fixtures.

use instproof_core::io::{from_cbor, to_cbor};
use instproof_core::{BeaconBlock, BlockHeader, Hash, Instruction, ValidationData};
use proptest::prelude::*;

fn header(height: u64) -> BlockHeader {
    BlockHeader {
        height,
        shard_id: None,
        beacon_height: None,
        hash: Hash([height as u8; 32]),
        previous_hash: Hash::ZERO,
        instruction_merkle_root: Hash([0xAA; 32]),
        meta_hash: Hash([0xBB; 32]),
    }
}

proptest! {
    #[test]
    fn hash_text_round_trips(bytes in any::<[u8; 32]>(), upper in any::<bool>(), prefixed in any::<bool>()) {
        let h = Hash(bytes);
        let mut s = h.to_string();
        if upper {
            s = s.to_ascii_uppercase();
        }
        if prefixed {
            s.insert_str(0, "0x");
        }
        prop_assert_eq!(s.parse::<Hash>().unwrap(), h);
    }

    #[test]
    fn flatten_is_field_concatenation(fields in prop::collection::vec(".{0,8}", 1..10)) {
        let inst = Instruction::new(fields.clone());
        prop_assert_eq!(inst.flatten(), fields.concat().into_bytes());
        let head = &fields[..fields.len() - 1];
        prop_assert_eq!(inst.flatten_without_height(), head.concat().into_bytes());
    }
}

#[test]
fn beacon_block_survives_json_and_cbor() {
    let block = BeaconBlock {
        header: header(7),
        instructions: vec![
            ["70", "committee", "0", "7"].into_iter().collect(),
            ["1", "x"].into_iter().collect(),
        ],
    };
    let js = serde_json::to_string(&block).unwrap();
    assert!(!js.contains("shard_id"), "beacon headers omit shard fields: {js}");
    assert_eq!(serde_json::from_str::<BeaconBlock>(&js).unwrap(), block);
    assert_eq!(from_cbor::<BeaconBlock>(&to_cbor(&block).unwrap()).unwrap(), block);
}

#[test]
fn validation_data_uses_hex_signatures() {
    let v = ValidationData {
        signatures: vec![vec![0xca, 0xfe], vec![]],
        signer_indices: vec![1, 5],
    };
    let js = serde_json::to_value(&v).unwrap();
    assert_eq!(js["signatures"][0], "cafe");
    assert_eq!(js["signatures"][1], "");
    assert_eq!(serde_json::from_value::<ValidationData>(js).unwrap(), v);
}
