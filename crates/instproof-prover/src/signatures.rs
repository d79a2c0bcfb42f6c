// crates/instproof-prover/src/signatures.rs

//! Transport encoding of a block's consensus attestation.
//!
//! Signature aggregation and validator sets belong to the consensus engine;
//! this adapter only asks for the raw data and hex-encodes it.

use instproof_core::{BlockRef, ConsensusEngine, ProofError};
use tracing::{debug, debug_span, Span};

/// Hex signatures plus committee indices, ready for a [`SwapProof`](instproof_core::SwapProof).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EncodedSignatures {
    /// Hex-encoded raw signatures.
    pub signatures: Vec<String>,
    /// Committee index of each signer.
    pub indices: Vec<usize>,
}

/// Thin wrapper over [`ConsensusEngine::extract_bridge_validation_data`].
#[derive(Debug)]
pub struct ConsensusSignatureExtractor<'a, C: ?Sized> {
    consensus: &'a C,
    span: Span,
}

impl<'a, C: ConsensusEngine + ?Sized> ConsensusSignatureExtractor<'a, C> {
    /// Extractor logging under a child of `parent`.
    pub fn new(consensus: &'a C, parent: &Span) -> Self {
        Self {
            consensus,
            span: debug_span!(parent: parent, "signatures"),
        }
    }

    /// Signatures and signer indices for `block`.
    pub fn extract(&self, block: BlockRef<'_>) -> Result<EncodedSignatures, ProofError> {
        let header = block.header();
        let data = self
            .consensus
            .extract_bridge_validation_data(block)
            .map_err(|e| ProofError::upstream("extract_bridge_validation_data", e))?;
        if data.signatures.len() != data.signer_indices.len() {
            return Err(ProofError::inconsistent(format!(
                "{} block {}: {} signatures but {} signer indices",
                block.chain(),
                header.height,
                data.signatures.len(),
                data.signer_indices.len()
            )));
        }
        debug!(
            parent: &self.span,
            chain = %block.chain(),
            height = header.height,
            signers = data.signatures.len(),
            "extracted validation data"
        );
        Ok(EncodedSignatures {
            signatures: data.signatures.iter().map(hex::encode).collect(),
            indices: data.signer_indices,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use instproof_core::{BeaconBlock, BlockHeader, Hash, ValidationData};

    struct Fixed(ValidationData);

    impl ConsensusEngine for Fixed {
        fn extract_bridge_validation_data(&self, _block: BlockRef<'_>) -> anyhow::Result<ValidationData> {
            Ok(self.0.clone())
        }
    }

    fn block() -> BeaconBlock {
        BeaconBlock {
            header: BlockHeader {
                height: 3,
                shard_id: None,
                beacon_height: None,
                hash: Hash::ZERO,
                previous_hash: Hash::ZERO,
                instruction_merkle_root: Hash::ZERO,
                meta_hash: Hash::ZERO,
            },
            instructions: Vec::new(),
        }
    }

    #[test]
    fn hex_encodes_raw_signatures() {
        let engine = Fixed(ValidationData {
            signatures: vec![vec![0xde, 0xad], vec![0x01]],
            signer_indices: vec![0, 4],
        });
        let b = block();
        let out = ConsensusSignatureExtractor::new(&engine, &Span::none())
            .extract(BlockRef::Beacon(&b))
            .unwrap();
        assert_eq!(out.signatures, vec!["dead".to_owned(), "01".to_owned()]);
        assert_eq!(out.indices, vec![0, 4]);
    }

    #[test]
    fn count_mismatch_is_inconsistent() {
        let engine = Fixed(ValidationData {
            signatures: vec![vec![1]],
            signer_indices: vec![],
        });
        let b = block();
        let err = ConsensusSignatureExtractor::new(&engine, &Span::none())
            .extract(BlockRef::Beacon(&b))
            .unwrap_err();
        assert_eq!(err.kind(), instproof_core::ErrorKind::Inconsistency);
    }
}
