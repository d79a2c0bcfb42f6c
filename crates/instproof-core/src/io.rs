// crates/instproof-core/src/io.rs

//! JSON and CBOR read/write helpers with extension-based auto-detection.
//!
//! Unknown or missing extensions are rejected for reads and default to JSON
//! for writes. The generic entry points work for any serde type (chain
//! fixtures, instruction lists); [`read_proof_result_auto`] and
//! [`write_proof_result_auto`] are the typed wrappers for relayer output.

use crate::result::ProofResult;
use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Cursor};
use std::path::Path;

/// Serialization format selected from a file extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    /// Pretty JSON.
    Json,
    /// CBOR.
    Cbor,
}

impl Format {
    /// Format for `path`, or `None` for unknown/missing extensions.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        match ext_lower(path).as_deref() {
            Some("json") => Some(Self::Json),
            Some("cbor") => Some(Self::Cbor),
            _ => None,
        }
    }
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating parent directory {}", display(path)))?;
        }
    }
    Ok(())
}

/* ---------------------------- explicit formats ---------------------------- */

/// Read a value from **JSON**.
pub fn read_json<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    let path_ref = path.as_ref();
    let f = File::open(path_ref).with_context(|| format!("open {}", display(path_ref)))?;
    serde_json::from_reader(BufReader::new(f))
        .with_context(|| format!("deserialize JSON {}", display(path_ref)))
}

/// Write a value to **JSON** (pretty).
pub fn write_json<T: Serialize + ?Sized, P: AsRef<Path>>(path: P, v: &T) -> Result<()> {
    let path_ref = path.as_ref();
    ensure_parent_dir(path_ref)?;
    let f = File::create(path_ref).with_context(|| format!("create {}", display(path_ref)))?;
    serde_json::to_writer_pretty(BufWriter::new(f), v)
        .with_context(|| format!("serialize JSON {}", display(path_ref)))
}

/// Read a value from **CBOR**.
pub fn read_cbor<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    let path_ref = path.as_ref();
    let f = File::open(path_ref).with_context(|| format!("open {}", display(path_ref)))?;
    let mut rdr = BufReader::new(f);
    ciborium::de::from_reader(&mut rdr)
        .with_context(|| format!("deserialize CBOR {}", display(path_ref)))
}

/// Write a value to **CBOR**.
pub fn write_cbor<T: Serialize + ?Sized, P: AsRef<Path>>(path: P, v: &T) -> Result<()> {
    let path_ref = path.as_ref();
    ensure_parent_dir(path_ref)?;
    let f = File::create(path_ref).with_context(|| format!("create {}", display(path_ref)))?;
    let mut w = BufWriter::new(f);
    ciborium::ser::into_writer(v, &mut w)
        .with_context(|| format!("serialize CBOR {}", display(path_ref)))
}

/* ------------------------------ auto-detect ------------------------------- */

/// Auto-detect read by extension `.json` / `.cbor` (case-insensitive).
pub fn read_auto<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    let path_ref = path.as_ref();
    match Format::from_path(path_ref) {
        Some(Format::Json) => read_json(path_ref),
        Some(Format::Cbor) => read_cbor(path_ref),
        None => match ext_lower(path_ref) {
            Some(other) => Err(anyhow!(
                "unsupported extension: {other} (supported: .json, .cbor)"
            )),
            None => Err(anyhow!(
                "{} has no extension (expected .json or .cbor)",
                display(path_ref)
            )),
        },
    }
}

/// Auto-detect write (defaults to **JSON** if unknown or missing).
pub fn write_auto<T: Serialize + ?Sized, P: AsRef<Path>>(path: P, v: &T) -> Result<()> {
    match Format::from_path(path.as_ref()) {
        Some(Format::Cbor) => write_cbor(path, v),
        _ => write_json(path, v),
    }
}

/// Read a [`ProofResult`] by extension.
pub fn read_proof_result_auto<P: AsRef<Path>>(path: P) -> Result<ProofResult> {
    read_auto(path).context("reading proof result")
}

/// Write a [`ProofResult`] by extension.
pub fn write_proof_result_auto<P: AsRef<Path>>(path: P, v: &ProofResult) -> Result<()> {
    write_auto(path, v).context("writing proof result")
}

/* -------------------------------- in-memory ------------------------------- */

/// Encode any serializable value to CBOR bytes.
pub fn to_cbor<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::ser::into_writer(value, &mut buf).context("serialize CBOR (in-memory)")?;
    Ok(buf)
}

/// Decode a CBOR byte slice.
pub fn from_cbor<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    ciborium::de::from_reader(Cursor::new(bytes)).context("deserialize CBOR (in-memory)")
}

fn ext_lower(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|s| s.to_str())
        .map(str::to_ascii_lowercase)
}

#[inline]
fn display(p: &Path) -> String {
    p.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ProofResult {
        ProofResult {
            instruction: "3732".into(),
            beacon_height: "10".into(),
            beacon_inst_path: vec!["00".repeat(32)],
            beacon_inst_path_is_left: vec![false],
            beacon_sig_idxs: vec![0, 2],
            ..ProofResult::default()
        }
    }

    #[test]
    fn proof_result_survives_both_formats() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["p.json", "nested/p.CBOR"] {
            let path = dir.path().join(name);
            write_proof_result_auto(&path, &sample()).unwrap();
            assert_eq!(read_proof_result_auto(&path).unwrap(), sample());
        }
    }

    #[test]
    fn unknown_extension_reads_fail_and_writes_default_to_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.txt");
        write_auto(&path, &sample()).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"BeaconHeight\""));
        let err = read_auto::<ProofResult, _>(&path).unwrap_err();
        assert!(err.to_string().contains("unsupported extension"), "{err}");
    }

    #[test]
    fn in_memory_cbor() {
        let bytes = to_cbor(&sample()).unwrap();
        let back: ProofResult = from_cbor(&bytes).unwrap();
        assert_eq!(back, sample());
    }
}
