// crates/instproof-prover/src/assembler.rs

//! One layer of an instruction proof.
//!
//! Given a block, its full instruction list and a leaf index, the assembler
//! opens the Keccak256 instruction tree at that index, binds the proof to the
//! header's committed root and meta hash, and attaches the block's consensus
//! signatures.

use crate::signatures::ConsensusSignatureExtractor;
use instproof_core::{BlockRef, ConsensusEngine, Instruction, ProofError, SwapProof};
use instproof_merkle::MerkleTree;
use tracing::{debug, debug_span, warn, Span};

/// Builds [`SwapProof`]s.
#[derive(Debug)]
pub struct ProofAssembler<'a, C: ?Sized> {
    extractor: ConsensusSignatureExtractor<'a, C>,
    verify_roots: bool,
    span: Span,
}

impl<'a, C: ConsensusEngine + ?Sized> ProofAssembler<'a, C> {
    /// Assembler logging under a child of `parent`.
    pub fn new(consensus: &'a C, verify_roots: bool, parent: &Span) -> Self {
        let span = debug_span!(parent: parent, "assembler", verify_roots);
        Self {
            extractor: ConsensusSignatureExtractor::new(consensus, &span),
            verify_roots,
            span,
        }
    }

    /// Proof for `instructions[index]` inside `block`.
    pub fn assemble(
        &self,
        block: BlockRef<'_>,
        instructions: &[Instruction],
        index: usize,
    ) -> Result<SwapProof, ProofError> {
        let header = block.header();
        let leaves: Vec<Vec<u8>> = instructions.iter().map(Instruction::flatten).collect();
        let tree = MerkleTree::from_data(&leaves);
        let path = tree.prove(index).map_err(|e| {
            ProofError::inconsistent(format!(
                "{} block {}: {e}",
                block.chain(),
                header.height
            ))
        })?;

        let committed = header.instruction_merkle_root;
        if tree.root() != committed.0 {
            if self.verify_roots {
                return Err(ProofError::inconsistent(format!(
                    "{} block {}: rebuilt instruction root {} differs from committed {committed}",
                    block.chain(),
                    header.height,
                    hex::encode(tree.root())
                )));
            }
            warn!(
                parent: &self.span,
                chain = %block.chain(),
                height = header.height,
                "instruction root mismatch ignored"
            );
        }

        let sigs = self.extractor.extract(block)?;
        debug!(
            parent: &self.span,
            chain = %block.chain(),
            height = header.height,
            index,
            leaves = leaves.len(),
            depth = path.len(),
            "layer assembled"
        );
        Ok(SwapProof {
            // index < len was checked by `prove`
            instruction: instructions[index].clone(),
            inst_path: path.path_hex(),
            inst_path_is_left: path.is_left,
            inst_root: committed.to_hex(),
            block_meta_hash: header.meta_hash.to_hex(),
            signer_signatures: sigs.signatures,
            signer_indices: sigs.indices,
            block_height: header.height,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use instproof_core::{BeaconBlock, BlockHeader, ErrorKind, Hash, ValidationData};
    use instproof_merkle::merkle_root;

    struct NoSigs;

    impl ConsensusEngine for NoSigs {
        fn extract_bridge_validation_data(&self, _b: BlockRef<'_>) -> anyhow::Result<ValidationData> {
            Ok(ValidationData::default())
        }
    }

    fn block(instructions: Vec<Instruction>, root: Hash) -> BeaconBlock {
        BeaconBlock {
            header: BlockHeader {
                height: 8,
                shard_id: None,
                beacon_height: None,
                hash: Hash([1; 32]),
                previous_hash: Hash::ZERO,
                instruction_merkle_root: root,
                meta_hash: Hash([2; 32]),
            },
            instructions,
        }
    }

    fn four() -> Vec<Instruction> {
        vec![
            ["101", "addr1", "amt1", "txAABB"].into_iter().collect(),
            ["101", "addr2", "amt2", "txCCDD"].into_iter().collect(),
            ["40", "3"].into_iter().collect(),
            ["41", "7", "x"].into_iter().collect(),
        ]
    }

    #[test]
    fn proof_binds_to_committed_root() {
        let insts = four();
        let leaves: Vec<Vec<u8>> = insts.iter().map(Instruction::flatten).collect();
        let b = block(insts.clone(), Hash(merkle_root(&leaves)));
        let p = ProofAssembler::new(&NoSigs, true, &Span::none())
            .assemble(BlockRef::Beacon(&b), &insts, 0)
            .unwrap();
        assert_eq!(p.inst_path.len(), 2);
        assert_eq!(p.inst_root, b.header.instruction_merkle_root.to_hex());
        assert_eq!(p.block_meta_hash, "02".repeat(32));
        assert_eq!(p.block_height, 8);
    }

    #[test]
    fn root_mismatch_is_inconsistent_unless_disabled() {
        let insts = four();
        let b = block(insts.clone(), Hash([9; 32]));
        let err = ProofAssembler::new(&NoSigs, true, &Span::none())
            .assemble(BlockRef::Beacon(&b), &insts, 1)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Inconsistency);

        let p = ProofAssembler::new(&NoSigs, false, &Span::none())
            .assemble(BlockRef::Beacon(&b), &insts, 1)
            .unwrap();
        assert_eq!(p.inst_root, "09".repeat(32));
    }

    #[test]
    fn index_out_of_range_is_an_error() {
        let insts = four();
        let b = block(insts.clone(), Hash::ZERO);
        let err = ProofAssembler::new(&NoSigs, false, &Span::none())
            .assemble(BlockRef::Beacon(&b), &insts, 4)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Inconsistency);
    }
}
