// crates/instproof-prover/src/traversal.rs

//! Resolving heights into finalized blocks.
//!
//! All reads go through the finalized view of the relevant chain: a height
//! above the finalized tip is "not found", even if the store already holds
//! a (still revertible) block there. When the store holds fork siblings at
//! one height, the block on the finalized branch wins; it is found by
//! walking `previous_hash` links down from the nearest height above that
//! pins the branch (a single stored block, or the finalized tip).

use instproof_core::{
    BeaconBlock, BlockStore, ChainId, Hash, Instruction, InstructionReplayer, ProofError,
    ShardBlock, ViewHandle,
};
use tracing::{debug, debug_span, Span};

/// Everything a 2-layer proof needs from the bridge side.
#[derive(Clone, Debug)]
pub struct BridgeContext {
    /// The finalized bridge-shard block.
    pub block: ShardBlock,
    /// Its full instruction list: replayed transaction instructions followed
    /// by the block's own protocol instructions.
    pub instructions: Vec<Instruction>,
    /// Beacon blocks the bridge block included, ascending by height.
    pub beacon_window: Vec<BeaconBlock>,
}

/// Height-to-block resolution over a [`BlockStore`].
#[derive(Debug)]
pub struct BlockChainTraversal<'a, S: ?Sized, R: ?Sized> {
    store: &'a S,
    replayer: &'a R,
    bridge_shard_id: u8,
    max_beacon_window: u64,
    span: Span,
}

impl<'a, S, R> BlockChainTraversal<'a, S, R>
where
    S: BlockStore + ?Sized,
    R: InstructionReplayer + ?Sized,
{
    /// Traversal logging under a child of `parent`.
    pub fn new(
        store: &'a S,
        replayer: &'a R,
        bridge_shard_id: u8,
        max_beacon_window: u64,
        parent: &Span,
    ) -> Self {
        Self {
            store,
            replayer,
            bridge_shard_id,
            max_beacon_window,
            span: debug_span!(parent: parent, "traversal", bridge_shard_id),
        }
    }

    /* ------------------------------- beacon ------------------------------- */

    fn final_view(&self, chain: ChainId) -> Result<ViewHandle, ProofError> {
        self.store
            .final_view(chain)
            .map_err(|e| ProofError::upstream("final_view", e))
    }

    /// The finalized beacon block at `height`.
    pub fn beacon_block(&self, height: u64) -> Result<BeaconBlock, ProofError> {
        check_height(height)?;
        let view = self.final_view(ChainId::Beacon)?;
        self.beacon_block_in(&view, height)
    }

    fn beacon_block_in(&self, view: &ViewHandle, height: u64) -> Result<BeaconBlock, ProofError> {
        if height > view.height {
            return Err(ProofError::not_found(format!(
                "beacon height {height} is beyond the finalized tip {}",
                view.height
            )));
        }
        self.store
            .beacon_block_by_height(view, height)
            .map_err(|e| ProofError::upstream("beacon_block_by_height", e))?
            .ok_or_else(|| ProofError::not_found(format!("no beacon block at height {height}")))
    }

    /// Finalized beacon blocks with heights in `from..=to`, ascending.
    ///
    /// An empty range (`to < from`) yields no blocks.
    pub fn beacon_range(&self, from: u64, to: u64) -> Result<Vec<BeaconBlock>, ProofError> {
        let from = from.max(1);
        if to < from {
            return Ok(Vec::new());
        }
        let width = to - from + 1;
        if width > self.max_beacon_window {
            return Err(ProofError::invalid(format!(
                "beacon window {from}..={to} spans {width} blocks, over max_beacon_window = {}",
                self.max_beacon_window
            )));
        }
        let view = self.final_view(ChainId::Beacon)?;
        (from..=to).map(|h| self.beacon_block_in(&view, h)).collect()
    }

    /* ------------------------------- bridge ------------------------------- */

    fn shard_blocks(&self, height: u64) -> Result<Vec<ShardBlock>, ProofError> {
        self.store
            .shard_blocks_by_height(height, self.bridge_shard_id)
            .map_err(|e| ProofError::upstream("shard_blocks_by_height", e))
    }

    /// The finalized bridge-shard block at `height`.
    pub fn bridge_block(&self, height: u64) -> Result<ShardBlock, ProofError> {
        check_height(height)?;
        let view = self.final_view(ChainId::Shard(self.bridge_shard_id))?;
        if height > view.height {
            return Err(ProofError::not_found(format!(
                "bridge height {height} is beyond the finalized tip {}",
                view.height
            )));
        }
        let mut candidates = self.shard_blocks(height)?;
        match candidates.len() {
            0 => Err(ProofError::not_found(format!(
                "no bridge block at height {height}"
            ))),
            1 => Ok(candidates.remove(0)),
            n => {
                debug!(parent: &self.span, height, candidates = n, "resolving fork siblings");
                self.canonical_block(&view, height, candidates)
            }
        }
    }

    /// Pick the finalized-branch block among `candidates` at `height`.
    ///
    /// Climbs to the first height above with a single stored block (or to the
    /// finalized tip, whose hash the view pins), then follows parent links
    /// back down through the heights it read on the way up.
    fn canonical_block(
        &self,
        view: &ViewHandle,
        height: u64,
        candidates: Vec<ShardBlock>,
    ) -> Result<ShardBlock, ProofError> {
        let mut want = view.hash;
        let mut above: Vec<(u64, Vec<ShardBlock>)> = Vec::new();
        for at in height + 1..=view.height {
            let level = self.shard_blocks(at)?;
            let pinned = match level.as_slice() {
                [only] if at < view.height => Some(only.header.hash),
                _ => None,
            };
            above.push((at, level));
            if let Some(hash) = pinned {
                want = hash;
                break;
            }
        }
        debug!(parent: &self.span, height, walked = above.len(), "fork walk");

        for (at, level) in above.iter().rev() {
            let block = level
                .iter()
                .find(|b| b.header.hash == want)
                .ok_or_else(|| broken_walk(want, *at))?;
            want = block.header.previous_hash;
        }
        candidates
            .into_iter()
            .find(|b| b.header.hash == want)
            .ok_or_else(|| broken_walk(want, height))
    }

    /// Parent of `block`, chosen by hash among the blocks one height below.
    fn parent_of(&self, block: &ShardBlock) -> Result<Option<ShardBlock>, ProofError> {
        let height = block.header.height;
        if height <= 1 {
            return Ok(None);
        }
        let parent = self
            .shard_blocks(height - 1)?
            .into_iter()
            .find(|b| b.header.hash == block.header.previous_hash)
            .ok_or_else(|| {
                ProofError::inconsistent(format!(
                    "bridge block {} at height {height} has no parent {} in the store",
                    block.header.hash, block.header.previous_hash
                ))
            })?;
        Ok(Some(parent))
    }

    /// Bridge block at `height` with its full instruction list and the
    /// beacon window it included.
    ///
    /// The window runs from the parent's beacon height + 1 through the
    /// block's own beacon height.
    pub fn bridge_context(&self, height: u64) -> Result<BridgeContext, ProofError> {
        let block = self.bridge_block(height)?;
        let prev_beacon = self
            .parent_of(&block)?
            .map_or(0, |p| p.beacon_height());
        let to = block.beacon_height();
        let beacon_window = self.beacon_range(prev_beacon + 1, to)?;

        let mut instructions = self
            .replayer
            .instructions_from_transactions(&block, &beacon_window)
            .map_err(|e| ProofError::upstream("instructions_from_transactions", e))?;
        let replayed = instructions.len();
        instructions.extend(block.instructions.iter().cloned());

        debug!(
            parent: &self.span,
            height,
            replayed,
            own = block.instructions.len(),
            window_from = prev_beacon + 1,
            window_to = to,
            "bridge block resolved"
        );
        Ok(BridgeContext {
            block,
            instructions,
            beacon_window,
        })
    }
}

fn broken_walk(want: Hash, at: u64) -> ProofError {
    ProofError::inconsistent(format!(
        "finalized bridge chain has no block {want} at height {at}"
    ))
}

fn check_height(height: u64) -> Result<(), ProofError> {
    if height == 0 {
        return Err(ProofError::invalid("block heights start at 1"));
    }
    Ok(())
}
