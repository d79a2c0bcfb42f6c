// crates/instproof-core/src/chain.rs

//! Read-only access to the host node.
//!
//! The prover never owns chain state. It borrows these collaborators for the
//! lifetime of a request and only reads through them, so implementations
//! must be safe to share across concurrent requests (`Send + Sync`).
//!
//! All methods return [`anyhow::Result`]: storage and consensus failures are
//! opaque to the prover and get wrapped as upstream errors by the caller.

use crate::types::{
    BeaconBlock, BlockRef, ChainId, Hash, Instruction, ShardBlock, ValidationData, ViewHandle,
};
use anyhow::Result;

/// Block lookups against the node's persisted chains.
pub trait BlockStore: Send + Sync {
    /// Finalized (irreversible) view of `chain`.
    fn final_view(&self, chain: ChainId) -> Result<ViewHandle>;

    /// Beacon block at `height` as seen from `view`, or `None` if the store
    /// holds no such block.
    fn beacon_block_by_height(&self, view: &ViewHandle, height: u64) -> Result<Option<BeaconBlock>>;

    /// Every stored block of `shard_id` at `height`. More than one result
    /// means the store still holds fork siblings at that height.
    fn shard_blocks_by_height(&self, height: u64, shard_id: u8) -> Result<Vec<ShardBlock>>;
}

/// Access to the consensus engine's per-block validation data.
pub trait ConsensusEngine: Send + Sync {
    /// Signatures and signer indices of the committee that approved `block`.
    fn extract_bridge_validation_data(&self, block: BlockRef<'_>) -> Result<ValidationData>;
}

/// Regenerates the instructions a shard block's transactions produced.
pub trait InstructionReplayer: Send + Sync {
    /// Instructions derived from `block.transactions`, in emission order.
    /// `beacon_blocks` is the beacon window the shard block included.
    fn instructions_from_transactions(
        &self,
        block: &ShardBlock,
        beacon_blocks: &[BeaconBlock],
    ) -> Result<Vec<Instruction>>;
}

/// Where each burn was confirmed, keyed by its transaction id.
///
/// The node fills this as it processes blocks: burns signed on the beacon
/// chain alone are recorded at their beacon height, burns that pass through
/// the bridge shard at their bridge height.
pub trait BurningConfirmIndex: Send + Sync {
    /// `(height, on_beacon)` of the confirmation of `tx_id`, or `None` when
    /// the id is not indexed. A beacon entry wins over a shard entry.
    fn burning_confirm(&self, tx_id: &Hash) -> Result<Option<(u64, bool)>>;
}

impl<T: BlockStore + ?Sized> BlockStore for &T {
    fn final_view(&self, chain: ChainId) -> Result<ViewHandle> {
        (**self).final_view(chain)
    }

    fn beacon_block_by_height(&self, view: &ViewHandle, height: u64) -> Result<Option<BeaconBlock>> {
        (**self).beacon_block_by_height(view, height)
    }

    fn shard_blocks_by_height(&self, height: u64, shard_id: u8) -> Result<Vec<ShardBlock>> {
        (**self).shard_blocks_by_height(height, shard_id)
    }
}

impl<T: ConsensusEngine + ?Sized> ConsensusEngine for &T {
    fn extract_bridge_validation_data(&self, block: BlockRef<'_>) -> Result<ValidationData> {
        (**self).extract_bridge_validation_data(block)
    }
}

impl<T: BurningConfirmIndex + ?Sized> BurningConfirmIndex for &T {
    fn burning_confirm(&self, tx_id: &Hash) -> Result<Option<(u64, bool)>> {
        (**self).burning_confirm(tx_id)
    }
}

impl<T: InstructionReplayer + ?Sized> InstructionReplayer for &T {
    fn instructions_from_transactions(
        &self,
        block: &ShardBlock,
        beacon_blocks: &[BeaconBlock],
    ) -> Result<Vec<Instruction>> {
        (**self).instructions_from_transactions(block, beacon_blocks)
    }
}

/// Replayer for blocks whose transactions never emit instructions.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoReplay;

impl InstructionReplayer for NoReplay {
    fn instructions_from_transactions(
        &self,
        _block: &ShardBlock,
        _beacon_blocks: &[BeaconBlock],
    ) -> Result<Vec<Instruction>> {
        Ok(Vec::new())
    }
}

/// Index that holds no burns; pipelines without one need explicit heights.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoIndex;

impl BurningConfirmIndex for NoIndex {
    fn burning_confirm(&self, _tx_id: &Hash) -> Result<Option<(u64, bool)>> {
        Ok(None)
    }
}
