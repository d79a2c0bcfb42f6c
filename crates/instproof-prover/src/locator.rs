// crates/instproof-prover/src/locator.rs

//! Finding an instruction in a block.
//!
//! "Not found" is an ordinary outcome here (`None`); callers decide whether
//! it means "not confirmed yet" or a broken confirmation chain. The first
//! match in block order wins.

use instproof_core::{BeaconBlock, Hash, Instruction};

/// Match rule for one lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy<'a> {
    /// Field 0 equals `tag`.
    ExactType {
        /// Expected type tag.
        tag: u32,
        /// Minimum field count.
        min_fields: usize,
        /// `(offset, tx id)` the instruction must carry.
        id: Option<(usize, &'a Hash)>,
    },
    /// Field 0 is one of `tags`.
    TypeFamily {
        /// Accepted type tags.
        tags: &'a [u32],
        /// Minimum field count.
        min_fields: usize,
        /// `(offset, tx id)` the instruction must carry.
        id: Option<(usize, &'a Hash)>,
    },
    /// Every field but the trailing height equals the reference's.
    Prefix(&'a Instruction),
}

impl Strategy<'_> {
    /// Whether `inst` satisfies this strategy.
    #[must_use]
    pub fn matches(&self, inst: &Instruction) -> bool {
        match *self {
            Self::ExactType { tag, min_fields, id } => {
                inst.len() >= min_fields && inst.type_tag() == Some(tag) && id_matches(inst, id)
            }
            Self::TypeFamily {
                tags,
                min_fields,
                id,
            } => {
                inst.len() >= min_fields
                    && inst.type_tag().is_some_and(|t| tags.contains(&t))
                    && id_matches(inst, id)
            }
            Self::Prefix(reference) => {
                !reference.is_empty()
                    && inst.len() == reference.len()
                    && inst.without_height() == reference.without_height()
            }
        }
    }
}

fn id_matches(inst: &Instruction, id: Option<(usize, &Hash)>) -> bool {
    let Some((offset, want)) = id else {
        return true;
    };
    inst.field(offset)
        .and_then(|f| f.parse::<Hash>().ok())
        .is_some_and(|got| got == *want)
}

/// A matched instruction and its position in the block's instruction list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Located<'i> {
    /// The matched instruction.
    pub instruction: &'i Instruction,
    /// Leaf index in the block's instruction Merkle tree.
    pub index: usize,
}

/// First instruction in `instructions` matching `strategy`.
#[must_use]
pub fn locate<'i>(instructions: &'i [Instruction], strategy: &Strategy<'_>) -> Option<Located<'i>> {
    instructions
        .iter()
        .enumerate()
        .find(|(_, inst)| strategy.matches(inst))
        .map(|(index, instruction)| Located { instruction, index })
}

/// First match across `blocks`, scanning blocks in order.
#[must_use]
pub fn locate_in_blocks<'b>(
    blocks: &'b [BeaconBlock],
    strategy: &Strategy<'_>,
) -> Option<(&'b BeaconBlock, Located<'b>)> {
    blocks
        .iter()
        .find_map(|b| locate(&b.instructions, strategy).map(|found| (b, found)))
}
