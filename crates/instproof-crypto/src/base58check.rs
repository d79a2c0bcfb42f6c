// crates/instproof-crypto/src/base58check.rs

//! Base58Check as the chain writes it into instruction fields.
//!
//! Layout before Base58 (Bitcoin alphabet): `payload || version || checksum`,
//! where `checksum` is the first four bytes of SHA3-256 applied twice to
//! `payload || version`. Note this is NIST SHA3-256, not the Keccak256 used
//! for Merkle nodes.

use sha3::{Digest, Sha3_256};

/// Bytes of checksum appended after the version byte.
pub const CHECKSUM_LEN: usize = 4;

/// Base58Check text that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Base58CheckError {
    /// Not valid Base58.
    #[error("invalid base58: {0}")]
    Base58(#[from] bs58::decode::Error),
    /// Too short to hold a version byte and checksum.
    #[error("decoded {0} bytes, version and checksum need 5")]
    TooShort(usize),
    /// Checksum does not match the payload.
    #[error("checksum mismatch")]
    Checksum,
}

fn checksum(data: &[u8]) -> [u8; CHECKSUM_LEN] {
    let once = Sha3_256::digest(data);
    let twice = Sha3_256::digest(once);
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&twice[..CHECKSUM_LEN]);
    out
}

/// Encode `payload` under `version`.
#[must_use]
pub fn encode(payload: &[u8], version: u8) -> String {
    let mut buf = Vec::with_capacity(payload.len() + 1 + CHECKSUM_LEN);
    buf.extend_from_slice(payload);
    buf.push(version);
    let sum = checksum(&buf);
    buf.extend_from_slice(&sum);
    bs58::encode(buf).into_string()
}

/// Decode into `(payload, version)`.
pub fn decode(s: &str) -> Result<(Vec<u8>, u8), Base58CheckError> {
    let mut raw = bs58::decode(s).into_vec()?;
    if raw.len() < CHECKSUM_LEN + 1 {
        return Err(Base58CheckError::TooShort(raw.len()));
    }
    let body = raw.len() - CHECKSUM_LEN;
    if checksum(&raw[..body]) != raw[body..] {
        return Err(Base58CheckError::Checksum);
    }
    let version = raw[body - 1];
    raw.truncate(body - 1);
    Ok((raw, version))
}

/// Encode an integer as its minimal big-endian bytes under version 0, the
/// form the chain uses for heights and amounts.
#[must_use]
pub fn encode_u64(n: u64) -> String {
    let bytes = n.to_be_bytes();
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    encode(&bytes[start..], 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vectors() {
        assert_eq!(encode_u64(1000), "9ayPDiLAM");
        assert_eq!(encode_u64(7), "4VDCN1qY");
        assert_eq!(encode(&[], 0), "13DzZmL");
        assert_eq!(encode(b"abc", 1), "HHkVk5CSo4g");

        let mut token = [0u8; 32];
        token[31] = 0xE7;
        assert_eq!(encode(&token, 0), "11111111111111111111111111111112z2pWXd26");
    }

    #[test]
    fn decode_inverts_encode() {
        assert_eq!(decode("9ayPDiLAM").unwrap(), (vec![0x03, 0xE8], 0));
        assert_eq!(decode("HHkVk5CSo4g").unwrap(), (b"abc".to_vec(), 1));
        assert_eq!(decode("13DzZmL").unwrap(), (Vec::new(), 0));
        let (token, _) = decode("11111111111111111111111111111112z2pWXd26").unwrap();
        assert_eq!(token.len(), 32);
        assert_eq!(token[31], 0xE7);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(decode("9ayPDiLAN"), Err(Base58CheckError::Checksum)));
        assert!(matches!(decode("0OIl"), Err(Base58CheckError::Base58(_))));
        assert!(matches!(decode("2"), Err(Base58CheckError::TooShort(1))));
    }
}
