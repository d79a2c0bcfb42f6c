// crates/instproof-prover/src/payload.rs

//! Relayed payload encodings.
//!
//! Merkle leaves always commit to the raw UTF-8 fields. The payload handed to
//! the foreign contract is a different view of the same instruction (height
//! removed): fields the contract cannot parse (Base58Check numbers and keys,
//! hex addresses, tx ids) are decoded into fixed-width words first.

use instproof_core::{Hash, Instruction, ProofError};
use instproof_crypto::base58check;
use serde::{Deserialize, Serialize};

/// Width of an EVM word.
pub const WORD: usize = 32;

/// How an instruction is turned into relayed bytes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PayloadEncoding {
    /// Fields concatenated as UTF-8.
    #[default]
    Raw,
    /// `tag, shard, committee height (b58), pubkeys (b58)`:
    /// tag and shard raw, height as a word, pubkeys decoded when possible.
    SwapConfirm,
    /// `tag, shard, token (b58), remote address (hex), amount (b58), tx id`:
    /// tag and shard raw, then token, address and amount as words, then the
    /// 32 tx id bytes.
    BurningConfirm,
}

impl PayloadEncoding {
    /// Payload of `inst`, its trailing height excluded.
    pub fn encode(self, inst: &Instruction) -> Result<Vec<u8>, ProofError> {
        let fields = inst.without_height();
        match self {
            Self::Raw => Ok(inst.flatten_without_height()),
            Self::SwapConfirm => swap_confirm(fields),
            Self::BurningConfirm => burning_confirm(fields),
        }
    }

    /// Fields the encoding reads, height excluded.
    #[must_use]
    pub const fn min_fields(self) -> usize {
        match self {
            Self::Raw => 0,
            Self::SwapConfirm => 4,
            Self::BurningConfirm => 6,
        }
    }
}

fn fields_for<'a>(fields: &'a [String], n: usize, what: &str) -> Result<&'a [String], ProofError> {
    fields.get(..n).ok_or_else(|| {
        ProofError::inconsistent(format!(
            "{what} payload needs {n} fields before the height, instruction has {}",
            fields.len()
        ))
    })
}

/// Left-pad `bytes` to a big-endian word.
fn word(bytes: &[u8], what: &str) -> Result<[u8; WORD], ProofError> {
    let Some(pad) = WORD.checked_sub(bytes.len()) else {
        return Err(ProofError::inconsistent(format!(
            "{what} is {} bytes, wider than a {WORD} byte word",
            bytes.len()
        )));
    };
    let mut out = [0u8; WORD];
    out[pad..].copy_from_slice(bytes);
    Ok(out)
}

fn b58_word(field: &str, what: &str) -> Result<[u8; WORD], ProofError> {
    let (bytes, _) = base58check::decode(field)
        .map_err(|e| ProofError::inconsistent(format!("{what} {field:?}: {e}")))?;
    word(&bytes, what)
}

fn swap_confirm(fields: &[String]) -> Result<Vec<u8>, ProofError> {
    let f = fields_for(fields, 4, "swap confirmation")?;
    // committees are usually encoded; anything else is relayed as is
    let pubkeys = base58check::decode(&f[3]).map_or_else(|_| f[3].as_bytes().to_vec(), |(b, _)| b);

    let mut out = Vec::with_capacity(f[0].len() + f[1].len() + WORD + pubkeys.len());
    out.extend_from_slice(f[0].as_bytes());
    out.extend_from_slice(f[1].as_bytes());
    out.extend_from_slice(&b58_word(&f[2], "committee height")?);
    out.extend_from_slice(&pubkeys);
    Ok(out)
}

fn burning_confirm(fields: &[String]) -> Result<Vec<u8>, ProofError> {
    let f = fields_for(fields, 6, "burning confirmation")?;
    let addr = f[3].strip_prefix("0x").unwrap_or(&f[3]);
    let addr = hex::decode(addr)
        .map_err(|e| ProofError::inconsistent(format!("remote address {:?}: {e}", f[3])))?;
    let tx_id: Hash = f[5]
        .parse()
        .map_err(|e| ProofError::inconsistent(format!("tx id {:?}: {e}", f[5])))?;

    let mut out = Vec::with_capacity(f[0].len() + f[1].len() + 4 * WORD);
    out.extend_from_slice(f[0].as_bytes());
    out.extend_from_slice(f[1].as_bytes());
    out.extend_from_slice(&b58_word(&f[2], "token id")?);
    out.extend_from_slice(&word(&addr, "remote address")?);
    out.extend_from_slice(&b58_word(&f[4], "amount")?);
    out.extend_from_slice(tx_id.as_bytes());
    Ok(out)
}
