// crates/instproof-core/src/types.rs

//! Canonical chain types used across the instproof workspace.
//!
//! Everything here is read-only historical data owned by the persisted
//! chain; the prover never mutates blocks or instructions. Hashes and raw
//! bytes serialize as lowercase hex strings so fixtures and results stay
//! readable.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/* ---------------------------------- Hash ---------------------------------- */

/// 32-byte chain hash (block hash, tx id, Merkle root, meta hash).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Hash(pub [u8; 32]);

/// Textual hash could not be decoded.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HashParseError {
    /// Not valid hex.
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
    /// Decoded to the wrong number of bytes.
    #[error("expected 32 bytes, got {0}")]
    InvalidLength(usize),
}

impl Hash {
    /// All-zero hash.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Borrow the raw bytes.
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex, no prefix.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl From<[u8; 32]> for Hash {
    fn from(b: [u8; 32]) -> Self {
        Self(b)
    }
}

impl FromStr for Hash {
    type Err = HashParseError;

    /// Accepts 64 hex chars with an optional `0x` prefix.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let s = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        let bytes = hex::decode(s)?;
        let arr: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| HashParseError::InvalidLength(bytes.len()))?;
        Ok(Self(arr))
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.to_hex())
    }
}

impl Serialize for Hash {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Serde adapters for raw bytes as hex strings.
pub mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize `Vec<u8>` as a hex string.
    pub fn serialize<S: Serializer>(v: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(v))
    }

    /// Deserialize a hex string into `Vec<u8>`.
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }

    /// Same, for a list of byte strings.
    pub mod vec {
        use serde::{Deserialize, Deserializer, Serializer};

        /// Serialize `Vec<Vec<u8>>` as a list of hex strings.
        pub fn serialize<S: Serializer>(v: &[Vec<u8>], s: S) -> Result<S::Ok, S::Error> {
            s.collect_seq(v.iter().map(hex::encode))
        }

        /// Deserialize a list of hex strings.
        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Vec<u8>>, D::Error> {
            let v = Vec::<String>::deserialize(d)?;
            v.iter()
                .map(|s| hex::decode(s).map_err(serde::de::Error::custom))
                .collect()
        }
    }
}

/* ------------------------------- Instruction ------------------------------ */

/// Ordered string fields emitted by block execution.
///
/// Field 0 is a stringified integer type tag. Confirming instructions carry
/// a height in their last field and mirror the originating instruction in
/// every earlier field.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Instruction(Vec<String>);

impl Instruction {
    /// Wrap an owned field list.
    #[inline]
    #[must_use]
    pub const fn new(fields: Vec<String>) -> Self {
        Self(fields)
    }

    /// All fields.
    #[inline]
    #[must_use]
    pub fn fields(&self) -> &[String] {
        &self.0
    }

    /// Field count.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` when the instruction has no fields.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Field at `i`.
    #[inline]
    #[must_use]
    pub fn field(&self, i: usize) -> Option<&str> {
        self.0.get(i).map(String::as_str)
    }

    /// Field 0 parsed as an integer type tag; `None` if absent or malformed.
    #[must_use]
    pub fn type_tag(&self) -> Option<u32> {
        self.field(0).and_then(|f| f.parse().ok())
    }

    /// Every field but the trailing height.
    #[must_use]
    pub fn without_height(&self) -> &[String] {
        match self.0.split_last() {
            Some((_, rest)) => rest,
            None => &[],
        }
    }

    /// The trailing height field.
    #[must_use]
    pub fn height_field(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Merkle leaf pre-image: UTF-8 fields concatenated without separators.
    #[must_use]
    pub fn flatten(&self) -> Vec<u8> {
        concat_fields(&self.0)
    }

    /// Flattened payload with the trailing height removed (the relayed bytes).
    #[must_use]
    pub fn flatten_without_height(&self) -> Vec<u8> {
        concat_fields(self.without_height())
    }
}

fn concat_fields(fields: &[String]) -> Vec<u8> {
    let mut out = Vec::with_capacity(fields.iter().map(String::len).sum());
    for f in fields {
        out.extend_from_slice(f.as_bytes());
    }
    out
}

impl From<Vec<String>> for Instruction {
    fn from(v: Vec<String>) -> Self {
        Self(v)
    }
}

impl<S: Into<String>> FromIterator<S> for Instruction {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/* --------------------------------- Blocks --------------------------------- */

/// Which chain a block or view belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainId {
    /// The beacon chain of record.
    Beacon,
    /// A shard chain by id.
    Shard(u8),
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Beacon => f.write_str("beacon"),
            Self::Shard(id) => write!(f, "shard-{id}"),
        }
    }
}

/// Handle on a chain's finalized view: the irreversible tip.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewHandle {
    /// Chain the view belongs to.
    pub chain: ChainId,
    /// Height of the finalized tip.
    pub height: u64,
    /// Hash of the finalized tip.
    pub hash: Hash,
}

/// Header fields the prover reads.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Block height (first block is 1).
    pub height: u64,
    /// Shard id; absent on beacon blocks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shard_id: Option<u8>,
    /// Beacon height the shard block was built against; absent on beacon blocks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beacon_height: Option<u64>,
    /// Block hash.
    pub hash: Hash,
    /// Parent block hash.
    pub previous_hash: Hash,
    /// Committed root over the block's full instruction list.
    pub instruction_merkle_root: Hash,
    /// Header meta hash (what validators sign over).
    pub meta_hash: Hash,
}

/// Opaque raw transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction id.
    pub hash: Hash,
    /// Encoded transaction body.
    #[serde(with = "hex_bytes", default)]
    pub payload: Vec<u8>,
}

/// Beacon block: the instruction list is persisted as-is.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeaconBlock {
    /// Header.
    pub header: BlockHeader,
    /// Ordered instructions.
    pub instructions: Vec<Instruction>,
}

/// Shard (bridge) block.
///
/// `instructions` holds only the block's own protocol instructions; the full
/// list committed by `instruction_merkle_root` is regenerated from
/// `transactions` first (see [`crate::InstructionReplayer`]).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardBlock {
    /// Header.
    pub header: BlockHeader,
    /// Raw transactions.
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    /// Protocol instructions appended after the transaction-generated ones.
    #[serde(default)]
    pub instructions: Vec<Instruction>,
}

impl ShardBlock {
    /// Shard id (0 if the header omits it).
    #[inline]
    #[must_use]
    pub fn shard_id(&self) -> u8 {
        self.header.shard_id.unwrap_or_default()
    }

    /// Beacon height the block was built against (0 if absent).
    #[inline]
    #[must_use]
    pub fn beacon_height(&self) -> u64 {
        self.header.beacon_height.unwrap_or_default()
    }
}

/// Borrowed view over either block kind.
#[derive(Clone, Copy, Debug)]
pub enum BlockRef<'a> {
    /// A beacon block.
    Beacon(&'a BeaconBlock),
    /// A shard block.
    Shard(&'a ShardBlock),
}

impl<'a> BlockRef<'a> {
    /// The block header.
    #[must_use]
    pub const fn header(&self) -> &'a BlockHeader {
        match self {
            Self::Beacon(b) => &b.header,
            Self::Shard(b) => &b.header,
        }
    }

    /// The chain the block belongs to.
    #[must_use]
    pub fn chain(&self) -> ChainId {
        match self {
            Self::Beacon(_) => ChainId::Beacon,
            Self::Shard(b) => ChainId::Shard(b.shard_id()),
        }
    }
}

/// Raw validator signatures over a block plus the committee indices that signed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationData {
    /// One raw signature per signer.
    #[serde(with = "hex_bytes::vec")]
    pub signatures: Vec<Vec<u8>>,
    /// Committee index of each signer, parallel to `signatures`.
    pub signer_indices: Vec<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_parse_accepts_prefix_and_rejects_bad_length() {
        let s = "ab".repeat(32);
        let h: Hash = s.parse().unwrap();
        assert_eq!(h.to_hex(), s);
        assert_eq!(format!("0x{s}").parse::<Hash>().unwrap(), h);
        assert_eq!(
            "abcd".parse::<Hash>(),
            Err(HashParseError::InvalidLength(2))
        );
        assert!(matches!(
            "zz".repeat(32).parse::<Hash>(),
            Err(HashParseError::InvalidHex(_))
        ));
    }

    #[test]
    fn instruction_views() {
        let inst: Instruction = ["101", "addr1", "amt1", "txAABB"].into_iter().collect();
        assert_eq!(inst.type_tag(), Some(101));
        assert_eq!(inst.flatten(), b"101addr1amt1txAABB");
        assert_eq!(inst.flatten_without_height(), b"101addr1amt1");
        assert_eq!(inst.height_field(), Some("txAABB"));

        let empty = Instruction::default();
        assert!(empty.without_height().is_empty());
        assert_eq!(empty.type_tag(), None);
    }

    #[test]
    fn hash_serializes_as_hex_string() {
        let h = Hash([7u8; 32]);
        let js = serde_json::to_string(&h).unwrap();
        assert_eq!(js, format!("\"{}\"", "07".repeat(32)));
        let back: Hash = serde_json::from_str(&js).unwrap();
        assert_eq!(back, h);
    }
}
