// crates/instproof-core/src/result.rs

//! Proof output types.
//!
//! [`SwapProof`] is one layer's in-memory proof; [`ProofResult`] is the
//! external aggregate relayers submit to a foreign verifier. Its JSON field
//! names are fixed for compatibility and must not be renamed.

use crate::types::Instruction;
use serde::{Deserialize, Serialize};

/// Inclusion proof of one instruction in one block, plus the block's
/// consensus attestation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapProof {
    /// The located instruction, height field included.
    pub instruction: Instruction,
    /// Hex sibling hashes, bottom to top.
    pub inst_path: Vec<String>,
    /// `true` where the sibling is the left operand.
    pub inst_path_is_left: Vec<bool>,
    /// Hex instruction Merkle root.
    pub inst_root: String,
    /// Hex header meta hash.
    pub block_meta_hash: String,
    /// Hex validator signatures over the block.
    pub signer_signatures: Vec<String>,
    /// Committee index per signature.
    pub signer_indices: Vec<usize>,
    /// Height of the block the instruction lives in.
    pub block_height: u64,
}

/// Relayer-facing proof aggregate.
///
/// Bridge-layer fields are empty for 1-layer confirmations.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProofResult {
    /// Hex of the flattened instruction with the height field stripped.
    pub instruction: String,
    /// Decimal beacon-layer block height.
    pub beacon_height: String,
    /// Decimal bridge-layer block height, `""` for 1-layer proofs.
    pub bridge_height: String,

    /// Beacon-layer sibling path.
    pub beacon_inst_path: Vec<String>,
    /// Beacon-layer direction flags.
    pub beacon_inst_path_is_left: Vec<bool>,
    /// Beacon-layer instruction root.
    pub beacon_inst_root: String,
    /// Beacon block meta hash.
    pub beacon_blk_data: String,
    /// Beacon committee signatures.
    pub beacon_sigs: Vec<String>,
    /// Beacon committee signer indices.
    pub beacon_sig_idxs: Vec<usize>,

    /// Bridge-layer sibling path.
    pub bridge_inst_path: Vec<String>,
    /// Bridge-layer direction flags.
    pub bridge_inst_path_is_left: Vec<bool>,
    /// Bridge-layer instruction root.
    pub bridge_inst_root: String,
    /// Bridge block meta hash.
    pub bridge_blk_data: String,
    /// Bridge committee signatures.
    pub bridge_sigs: Vec<String>,
    /// Bridge committee signer indices.
    pub bridge_sig_idxs: Vec<usize>,
}

impl ProofResult {
    /// Beacon-only proof; `instruction` is the already-encoded payload.
    #[must_use]
    pub fn one_layer(instruction: String, beacon: SwapProof) -> Self {
        Self {
            instruction,
            beacon_height: beacon.block_height.to_string(),
            beacon_inst_path: beacon.inst_path,
            beacon_inst_path_is_left: beacon.inst_path_is_left,
            beacon_inst_root: beacon.inst_root,
            beacon_blk_data: beacon.block_meta_hash,
            beacon_sigs: beacon.signer_signatures,
            beacon_sig_idxs: beacon.signer_indices,
            ..Self::default()
        }
    }

    /// Bridge proof confirmed by a beacon proof.
    #[must_use]
    pub fn two_layer(instruction: String, beacon: SwapProof, bridge: SwapProof) -> Self {
        Self {
            bridge_height: bridge.block_height.to_string(),
            bridge_inst_path: bridge.inst_path,
            bridge_inst_path_is_left: bridge.inst_path_is_left,
            bridge_inst_root: bridge.inst_root,
            bridge_blk_data: bridge.block_meta_hash,
            bridge_sigs: bridge.signer_signatures,
            bridge_sig_idxs: bridge.signer_indices,
            ..Self::one_layer(instruction, beacon)
        }
    }

    /// `true` when the bridge layer is populated.
    #[must_use]
    pub fn is_two_layer(&self) -> bool {
        !self.bridge_height.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer(height: u64) -> SwapProof {
        SwapProof {
            instruction: ["72", "x", "9"].into_iter().collect(),
            inst_path: vec!["aa".into()],
            inst_path_is_left: vec![true],
            inst_root: "bb".into(),
            block_meta_hash: "cc".into(),
            signer_signatures: vec!["dd".into()],
            signer_indices: vec![3],
            block_height: height,
        }
    }

    #[test]
    fn wire_field_names_are_pascal_case() {
        let r = ProofResult::two_layer("ab".into(), layer(12), layer(5));
        let v = serde_json::to_value(&r).unwrap();
        for key in [
            "Instruction",
            "BeaconHeight",
            "BridgeHeight",
            "BeaconInstPath",
            "BeaconInstPathIsLeft",
            "BeaconInstRoot",
            "BeaconBlkData",
            "BeaconSigs",
            "BeaconSigIdxs",
            "BridgeInstPath",
            "BridgeInstPathIsLeft",
            "BridgeInstRoot",
            "BridgeBlkData",
            "BridgeSigs",
            "BridgeSigIdxs",
        ] {
            assert!(v.get(key).is_some(), "missing {key}");
        }
        assert_eq!(v["BeaconHeight"], "12");
        assert_eq!(v["BridgeHeight"], "5");
    }

    #[test]
    fn one_layer_leaves_bridge_fields_empty() {
        let r = ProofResult::one_layer("ab".into(), layer(7));
        assert!(!r.is_two_layer());
        assert_eq!(r.bridge_height, "");
        assert!(r.bridge_inst_path.is_empty() && r.bridge_sigs.is_empty());
        assert_eq!(r.beacon_sig_idxs, vec![3]);
    }
}
