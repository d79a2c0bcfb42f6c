// crates/instproof-prover/src/memory.rs

//! In-memory chain backend.
//!
//! [`ChainFixture`] is a serializable snapshot of a beacon chain plus shard
//! chains; [`MemoryChain`] serves it through the collaborator traits,
//! including a burn index built from the snapshot's instructions.
//! [`ChainBuilder`] produces fixtures whose headers are sealed with the same
//! Merkle rule the chain uses, so proofs built against them verify.

use crate::registry::tags;
use anyhow::{anyhow, Result};
use instproof_core::{
    io, BeaconBlock, BlockHeader, BlockRef, BlockStore, BurningConfirmIndex, ChainId,
    ConsensusEngine, Hash, Instruction, InstructionReplayer, ShardBlock, Transaction,
    ValidationData, ViewHandle,
};
use instproof_crypto::{base58check, keccak256_concat};
use instproof_merkle::merkle_root;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Serializable chain snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainFixture {
    /// Beacon blocks (any order).
    pub beacon_blocks: Vec<BeaconBlock>,
    /// Shard blocks of every shard, fork siblings included.
    pub shard_blocks: Vec<ShardBlock>,
    /// Instructions each transaction generates when replayed.
    #[serde(default)]
    pub tx_instructions: BTreeMap<Hash, Vec<Instruction>>,
    /// Validation data keyed by block hash.
    #[serde(default)]
    pub validation: BTreeMap<Hash, ValidationData>,
    /// Finalized tip per chain.
    pub final_tips: Vec<ViewHandle>,
}

impl ChainFixture {
    /// Load from `.json` / `.cbor`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        io::read_auto(path)
    }

    /// Save as `.json` / `.cbor` (JSON for other extensions).
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        io::write_auto(path, self)
    }
}

/// [`ChainFixture`] served as a block store, consensus engine, replayer and
/// burn index.
#[derive(Clone, Debug, Default)]
pub struct MemoryChain {
    fixture: ChainFixture,
    beacon_burns: BTreeMap<Hash, u64>,
    shard_burns: BTreeMap<Hash, u64>,
}

impl MemoryChain {
    /// Serve `fixture`, indexing its burns.
    #[must_use]
    pub fn new(fixture: ChainFixture) -> Self {
        let mut beacon_burns = BTreeMap::new();
        for blk in &fixture.beacon_blocks {
            index_burns(&mut beacon_burns, &blk.instructions, blk.header.height, &tags::BEACON_BURNS);
        }
        let mut shard_burns = BTreeMap::new();
        for blk in &fixture.shard_blocks {
            let replayed = blk
                .transactions
                .iter()
                .filter_map(|tx| fixture.tx_instructions.get(&tx.hash))
                .flatten();
            index_burns(
                &mut shard_burns,
                replayed.chain(&blk.instructions),
                blk.header.height,
                &tags::SHARD_BURNS,
            );
        }
        Self {
            fixture,
            beacon_burns,
            shard_burns,
        }
    }

    /// Borrow the underlying snapshot.
    #[must_use]
    pub const fn fixture(&self) -> &ChainFixture {
        &self.fixture
    }
}

/// Record the lowest height at which each burn of `kinds` appears.
fn index_burns<'a>(
    index: &mut BTreeMap<Hash, u64>,
    instructions: impl IntoIterator<Item = &'a Instruction>,
    height: u64,
    kinds: &[u32],
) {
    for inst in instructions {
        if !inst.type_tag().is_some_and(|t| kinds.contains(&t)) {
            continue;
        }
        let Some(id) = inst
            .field(tags::BURN_ID_FIELD)
            .and_then(|f| f.parse::<Hash>().ok())
        else {
            continue;
        };
        index
            .entry(id)
            .and_modify(|h| *h = (*h).min(height))
            .or_insert(height);
    }
}

impl From<ChainFixture> for MemoryChain {
    fn from(fixture: ChainFixture) -> Self {
        Self::new(fixture)
    }
}

impl BlockStore for MemoryChain {
    fn final_view(&self, chain: ChainId) -> Result<ViewHandle> {
        self.fixture
            .final_tips
            .iter()
            .find(|v| v.chain == chain)
            .copied()
            .ok_or_else(|| anyhow!("no finalized view for {chain}"))
    }

    fn beacon_block_by_height(&self, view: &ViewHandle, height: u64) -> Result<Option<BeaconBlock>> {
        if view.chain != ChainId::Beacon {
            return Err(anyhow!("{} view used for a beacon lookup", view.chain));
        }
        if height > view.height {
            return Ok(None);
        }
        Ok(self
            .fixture
            .beacon_blocks
            .iter()
            .find(|b| b.header.height == height)
            .cloned())
    }

    fn shard_blocks_by_height(&self, height: u64, shard_id: u8) -> Result<Vec<ShardBlock>> {
        Ok(self
            .fixture
            .shard_blocks
            .iter()
            .filter(|b| b.header.height == height && b.shard_id() == shard_id)
            .cloned()
            .collect())
    }
}

impl ConsensusEngine for MemoryChain {
    fn extract_bridge_validation_data(&self, block: BlockRef<'_>) -> Result<ValidationData> {
        let hash = block.header().hash;
        self.fixture
            .validation
            .get(&hash)
            .cloned()
            .ok_or_else(|| anyhow!("no validation data for {} block {hash}", block.chain()))
    }
}

impl BurningConfirmIndex for MemoryChain {
    fn burning_confirm(&self, tx_id: &Hash) -> Result<Option<(u64, bool)>> {
        Ok(self
            .beacon_burns
            .get(tx_id)
            .map(|&h| (h, true))
            .or_else(|| self.shard_burns.get(tx_id).map(|&h| (h, false))))
    }
}

impl InstructionReplayer for MemoryChain {
    fn instructions_from_transactions(
        &self,
        block: &ShardBlock,
        _beacon_blocks: &[BeaconBlock],
    ) -> Result<Vec<Instruction>> {
        Ok(block
            .transactions
            .iter()
            .filter_map(|tx| self.fixture.tx_instructions.get(&tx.hash))
            .flatten()
            .cloned()
            .collect())
    }
}

/* --------------------------------- builder -------------------------------- */

/// Transaction for [`ChainBuilder::push_shard`] plus the instructions it
/// generates when replayed.
#[derive(Clone, Debug)]
pub struct ReplayedTx {
    /// The raw transaction.
    pub tx: Transaction,
    /// Its replay output.
    pub instructions: Vec<Instruction>,
}

/// Grows a consistent [`ChainFixture`] block by block.
///
/// Every pushed block gets a sealed header (instruction root over its full
/// instruction list) and validation data from a deterministic committee.
#[derive(Clone, Debug)]
pub struct ChainBuilder {
    fixture: ChainFixture,
    committee_size: usize,
    beacon_tip: Option<(u64, Hash)>,
    shard_tips: BTreeMap<u8, (u64, Hash, u64)>,
    salt: u64,
}

impl Default for ChainBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ChainBuilder {
    /// Empty chain with a committee of four signers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            fixture: ChainFixture::default(),
            committee_size: 4,
            beacon_tip: None,
            shard_tips: BTreeMap::new(),
            salt: 0,
        }
    }

    /// Signers per block (all of them sign).
    #[must_use]
    pub fn committee_size(mut self, n: usize) -> Self {
        self.committee_size = n;
        self
    }

    /// Current beacon tip height (0 before the first block).
    #[must_use]
    pub fn beacon_height(&self) -> u64 {
        self.beacon_tip.map_or(0, |(h, _)| h)
    }

    /// Current tip height of `shard_id` (0 before the first block).
    #[must_use]
    pub fn shard_height(&self, shard_id: u8) -> u64 {
        self.shard_tips.get(&shard_id).map_or(0, |t| t.0)
    }

    fn seal(
        &mut self,
        kind: &[u8],
        height: u64,
        shard_id: Option<u8>,
        beacon_height: Option<u64>,
        previous_hash: Hash,
        instructions: &[Instruction],
    ) -> BlockHeader {
        self.salt += 1;
        let leaves: Vec<Vec<u8>> = instructions.iter().map(Instruction::flatten).collect();
        let root = Hash(merkle_root(&leaves));
        let hash = Hash(keccak256_concat(&[
            kind,
            &height.to_be_bytes(),
            &previous_hash.0,
            &root.0,
            &self.salt.to_be_bytes(),
        ]));
        let meta_hash = Hash(keccak256_concat(&[b"meta", &hash.0]));
        let signatures = (0..self.committee_size)
            .map(|i| keccak256_concat(&[b"sig", &hash.0, &i.to_be_bytes()]).to_vec())
            .collect();
        self.fixture.validation.insert(
            hash,
            ValidationData {
                signatures,
                signer_indices: (0..self.committee_size).collect(),
            },
        );
        BlockHeader {
            height,
            shard_id,
            beacon_height,
            hash,
            previous_hash,
            instruction_merkle_root: root,
            meta_hash,
        }
    }

    /// Append a beacon block; returns its height.
    pub fn push_beacon(&mut self, instructions: Vec<Instruction>) -> u64 {
        let (prev_h, prev_hash) = self.beacon_tip.unwrap_or((0, Hash::ZERO));
        let height = prev_h + 1;
        let header = self.seal(b"beacon", height, None, None, prev_hash, &instructions);
        self.beacon_tip = Some((height, header.hash));
        self.fixture.beacon_blocks.push(BeaconBlock {
            header,
            instructions,
        });
        height
    }

    fn shard_block(
        &mut self,
        shard_id: u8,
        height: u64,
        previous_hash: Hash,
        beacon_height: u64,
        txs: Vec<ReplayedTx>,
        instructions: Vec<Instruction>,
    ) -> ShardBlock {
        let mut full: Vec<Instruction> = Vec::new();
        let mut transactions = Vec::with_capacity(txs.len());
        for t in txs {
            full.extend(t.instructions.iter().cloned());
            self.fixture.tx_instructions.insert(t.tx.hash, t.instructions);
            transactions.push(t.tx);
        }
        full.extend(instructions.iter().cloned());
        let header = self.seal(
            b"shard",
            height,
            Some(shard_id),
            Some(beacon_height),
            previous_hash,
            &full,
        );
        ShardBlock {
            header,
            transactions,
            instructions,
        }
    }

    /// Append a shard block built against the current beacon tip; returns its
    /// height.
    pub fn push_shard(
        &mut self,
        shard_id: u8,
        txs: Vec<ReplayedTx>,
        instructions: Vec<Instruction>,
    ) -> u64 {
        let (prev_h, prev_hash, _) = self
            .shard_tips
            .get(&shard_id)
            .copied()
            .unwrap_or((0, Hash::ZERO, 0));
        let height = prev_h + 1;
        let beacon_height = self.beacon_height();
        let block = self.shard_block(shard_id, height, prev_hash, beacon_height, txs, instructions);
        self.shard_tips
            .insert(shard_id, (height, block.header.hash, block.beacon_height()));
        self.fixture.shard_blocks.push(block);
        height
    }

    /// Add a side-branch sibling of the current shard tip. The tip itself is
    /// unchanged, so later [`push_shard`](Self::push_shard) calls extend the
    /// canonical branch.
    pub fn push_shard_sibling(&mut self, shard_id: u8, instructions: Vec<Instruction>) -> Option<Hash> {
        let (tip_h, tip_hash, tip_beacon) = self.shard_tips.get(&shard_id).copied()?;
        let parent_hash = self
            .fixture
            .shard_blocks
            .iter()
            .find(|b| b.shard_id() == shard_id && b.header.hash == tip_hash)
            .map(|b| b.header.previous_hash)?;
        let block = self.shard_block(shard_id, tip_h, parent_hash, tip_beacon, Vec::new(), instructions);
        let hash = block.header.hash;
        self.fixture.shard_blocks.push(block);
        Some(hash)
    }

    /// Snapshot with every chain finalized at its current tip.
    #[must_use]
    pub fn finish(self) -> ChainFixture {
        let beacon = self.beacon_height();
        let shards: Vec<(u8, u64)> = self.shard_tips.iter().map(|(&s, t)| (s, t.0)).collect();
        self.finish_at(beacon, &shards)
    }

    /// Snapshot with the beacon chain finalized at `beacon` and each listed
    /// shard at its height; blocks above stay in the store unfinalized.
    #[must_use]
    pub fn finish_at(mut self, beacon: u64, shards: &[(u8, u64)]) -> ChainFixture {
        let mut tips = Vec::new();
        if let Some(b) = self
            .fixture
            .beacon_blocks
            .iter()
            .find(|b| b.header.height == beacon)
        {
            tips.push(ViewHandle {
                chain: ChainId::Beacon,
                height: beacon,
                hash: b.header.hash,
            });
        }
        for &(shard_id, height) in shards {
            let Some(&(tip_h, tip_hash, _)) = self.shard_tips.get(&shard_id) else {
                continue;
            };
            // walk the canonical branch down from the tip
            let mut hash = tip_hash;
            let mut at = tip_h;
            while at > height {
                match self
                    .fixture
                    .shard_blocks
                    .iter()
                    .find(|b| b.shard_id() == shard_id && b.header.hash == hash)
                {
                    Some(b) => hash = b.header.previous_hash,
                    None => break,
                }
                at -= 1;
            }
            if at == height && height > 0 {
                tips.push(ViewHandle {
                    chain: ChainId::Shard(shard_id),
                    height,
                    hash,
                });
            }
        }
        self.fixture.final_tips = tips;
        self.fixture
    }
}

/* ------------------------------ sample chain ------------------------------ */

/// Deterministic id for sample transaction `n`.
#[must_use]
pub fn sample_tx_id(n: u64) -> Hash {
    Hash(keccak256_concat(&[b"sample-tx", &n.to_be_bytes()]))
}

/// A request against a sample chain and the proof type it exercises.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SampleRequest {
    /// Registered proof type.
    pub proof_type: &'static str,
    /// Height to prove at.
    pub height: u64,
    /// Whether the height is a beacon height.
    pub on_beacon_only: bool,
    /// Transaction id, when the type is id-keyed.
    pub tx_id: Option<Hash>,
}

/// Burn confirmation of type `tag` for `round`.
///
/// Field encodings follow the chain: token ids, amounts and committee heights
/// are Base58Check, remote addresses hex, tx ids hex.
#[must_use]
pub fn sample_burn(tag: u32, shard_id: u8, round: u64, id: &Hash, height: u64) -> Instruction {
    let mut token = [0u8; 32];
    token[24..].copy_from_slice(&(0xE7 + round).to_be_bytes());
    [
        tag.to_string(),
        shard_id.to_string(),
        base58check::encode(&token, 0),
        format!("{:040x}", 0xA11CE_u64 + round),
        base58check::encode_u64(1_000 + round),
        id.to_hex(),
        height.to_string(),
    ]
    .into_iter()
    .collect()
}

/// Beacon committee swap confirmation for `round`.
#[must_use]
pub fn sample_swap(round: u64, height: u64) -> Instruction {
    let committee = keccak256_concat(&[b"committee", &round.to_be_bytes()]);
    [
        tags::BEACON_SWAP_CONFIRM.to_string(),
        "-1".to_owned(),
        base58check::encode_u64(height),
        base58check::encode(&committee, 0),
        height.to_string(),
    ]
    .into_iter()
    .collect()
}

/// Finalized sample chain. Each round adds a beacon block (committee swap,
/// burn confirmation, v2 burn) and a bridge block that includes it and
/// carries the matching bridge-side burn.
#[must_use]
pub fn sample_chain(rounds: u64, bridge_shard_id: u8) -> (ChainFixture, Vec<SampleRequest>) {
    let mut b = ChainBuilder::new();
    let mut requests = Vec::new();

    b.push_beacon(vec![["1", "genesis"].into_iter().collect()]);
    let (legacy, v2) = (tags::BURNING_CONFIRM, tags::BURNING_CONFIRM_V2);
    for round in 0..rounds {
        let id = sample_tx_id(round);

        // beacon block: committee swap, burn confirmation, v2 burn
        let beacon_height = b.beacon_height() + 1;
        let v2_id = sample_tx_id(rounds + round);
        b.push_beacon(vec![
            sample_swap(round, beacon_height),
            sample_burn(legacy, bridge_shard_id, round, &id, beacon_height),
            sample_burn(v2, bridge_shard_id, round, &v2_id, beacon_height),
        ]);
        requests.push(SampleRequest {
            proof_type: "burn-v2",
            height: beacon_height,
            on_beacon_only: true,
            tx_id: Some(v2_id),
        });
        requests.push(SampleRequest {
            proof_type: "beacon-swap",
            height: beacon_height,
            on_beacon_only: true,
            tx_id: None,
        });

        // bridge block including that beacon block; the burn comes from tx replay
        let shard_height = b.shard_height(bridge_shard_id) + 1;
        let tx = Transaction {
            hash: id,
            payload: round.to_be_bytes().to_vec(),
        };
        b.push_shard(
            bridge_shard_id,
            vec![ReplayedTx {
                tx,
                instructions: vec![sample_burn(legacy, bridge_shard_id, round, &id, shard_height)],
            }],
            vec![["43", "reward", shard_height.to_string().as_str()].into_iter().collect()],
        );
        requests.push(SampleRequest {
            proof_type: "burn",
            height: shard_height,
            on_beacon_only: false,
            tx_id: Some(id),
        });
    }
    (b.finish(), requests)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sealed_roots_match_full_instruction_lists() {
        let (fixture, _) = sample_chain(3, 1);
        let chain = MemoryChain::new(fixture);
        for blk in &chain.fixture().shard_blocks {
            let mut full = chain.instructions_from_transactions(blk, &[]).unwrap();
            full.extend(blk.instructions.iter().cloned());
            let leaves: Vec<Vec<u8>> = full.iter().map(Instruction::flatten).collect();
            assert_eq!(Hash(merkle_root(&leaves)), blk.header.instruction_merkle_root);
        }
    }

    #[test]
    fn burns_are_indexed_by_where_they_were_signed() {
        let (fixture, requests) = sample_chain(3, 1);
        let chain = MemoryChain::new(fixture);
        for r in &requests {
            let Some(id) = r.tx_id else { continue };
            let got = chain.burning_confirm(&id).unwrap();
            match r.proof_type {
                // v2 burns are signed on the beacon chain only
                "burn-v2" => assert_eq!(got, Some((r.height, true))),
                // legacy burns are indexed at their bridge height
                "burn" => assert_eq!(got, Some((r.height, false))),
                other => panic!("unexpected sample type {other}"),
            }
        }
        assert_eq!(chain.burning_confirm(&Hash([0xAB; 32])).unwrap(), None);
    }

    #[test]
    fn beacon_entry_wins_over_shard_entry() {
        let id = Hash([3; 32]);
        let mut b = ChainBuilder::new();
        b.push_beacon(Vec::new());
        b.push_shard(1, Vec::new(), vec![sample_burn(72, 1, 0, &id, 1)]);
        b.push_beacon(vec![sample_burn(240, 1, 0, &id, 2)]);
        b.push_beacon(vec![sample_burn(240, 1, 0, &id, 3)]);
        let chain = MemoryChain::new(b.finish());
        assert_eq!(chain.burning_confirm(&id).unwrap(), Some((2, true)));
    }

    #[test]
    fn finish_at_finalizes_below_tip() {
        let mut b = ChainBuilder::new();
        for _ in 0..5 {
            b.push_beacon(Vec::new());
        }
        b.push_shard(1, Vec::new(), Vec::new());
        b.push_shard(1, Vec::new(), Vec::new());
        let fx = b.finish_at(3, &[(1, 1)]);
        let chain = MemoryChain::new(fx);
        assert_eq!(chain.final_view(ChainId::Beacon).unwrap().height, 3);
        assert_eq!(chain.final_view(ChainId::Shard(1)).unwrap().height, 1);
        assert!(chain.final_view(ChainId::Shard(2)).is_err());
    }

    #[test]
    fn committee_size_sets_signer_count() {
        let mut b = ChainBuilder::new().committee_size(2);
        b.push_beacon(Vec::new());
        let chain = MemoryChain::new(b.finish());
        let blk = &chain.fixture().beacon_blocks[0];
        let data = chain
            .extract_bridge_validation_data(BlockRef::Beacon(blk))
            .unwrap();
        assert_eq!(data.signer_indices, vec![0, 1]);
        assert_eq!(data.signatures.len(), 2);
    }

    #[test]
    fn fixture_round_trips_through_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chain.json");
        let (fixture, _) = sample_chain(2, 1);
        fixture.save(&path).unwrap();
        assert_eq!(ChainFixture::load(&path).unwrap(), fixture);
    }
}
