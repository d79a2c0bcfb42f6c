// crates/instproof-prover/src/config.rs

//! Prover configuration (TOML).
//!
//! ```toml
//! bridge_shard_id = 1
//! verify_roots = true
//! max_beacon_window = 256
//!
//! [[proof_types]]
//! name = "burn-polygon"
//! min_fields = 7
//! topology = "one-layer"
//! payload = "burning-confirm"
//! predicate = { kind = "exact-type", tag = 259, id_field = 5 }
//! ```

use crate::registry::{ProofType, ProofTypeRegistry};
use anyhow::{Context, Result};
use instproof_core::ProofError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Shard that hosts bridge (2-layer) instructions.
pub const DEFAULT_BRIDGE_SHARD_ID: u8 = 1;
/// Largest beacon window a single bridge block may include.
pub const DEFAULT_MAX_BEACON_WINDOW: u64 = 256;

/// Runtime knobs for [`ProofPipeline`](crate::ProofPipeline).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProverConfig {
    /// Shard id of the bridge chain.
    pub bridge_shard_id: u8,
    /// Recompute each block's instruction root and refuse to emit a proof
    /// when it differs from the committed header root.
    pub verify_roots: bool,
    /// Upper bound on the beacon heights scanned for a 2-layer confirmation.
    pub max_beacon_window: u64,
    /// Extra registry entries; same-named entries replace builtins.
    pub proof_types: Vec<ProofType>,
}

impl Default for ProverConfig {
    fn default() -> Self {
        Self {
            bridge_shard_id: DEFAULT_BRIDGE_SHARD_ID,
            verify_roots: true,
            max_beacon_window: DEFAULT_MAX_BEACON_WINDOW,
            proof_types: Vec::new(),
        }
    }
}

impl ProverConfig {
    /// Parse from TOML text.
    pub fn from_toml_str(src: &str) -> Result<Self> {
        toml::from_str(src).context("parse prover config toml")
    }

    /// Read and parse a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let src = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        Self::from_toml_str(&src).with_context(|| format!("in {}", path.display()))
    }

    /// Builtin registry overlaid with the configured entries.
    pub fn registry(&self) -> Result<ProofTypeRegistry, ProofError> {
        if self.max_beacon_window == 0 {
            return Err(ProofError::invalid("max_beacon_window must be positive"));
        }
        self.proof_types
            .iter()
            .cloned()
            .try_fold(ProofTypeRegistry::builtin(), ProofTypeRegistry::with_entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::PayloadEncoding;
    use crate::registry::{Predicate, Topology};

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(ProverConfig::from_toml_str("").unwrap(), ProverConfig::default());
    }

    #[test]
    fn extra_types_extend_the_builtins() {
        let cfg = ProverConfig::from_toml_str(
            r#"
            bridge_shard_id = 2
            [[proof_types]]
            name = "burn-polygon"
            min_fields = 7
            topology = "one-layer"
            payload = "burning-confirm"
            predicate = { kind = "exact-type", tag = 259, id_field = 5 }

            [[proof_types]]
            name = "swap-any"
            min_fields = 5
            topology = "one-layer"
            predicate = { kind = "type-family", tags = [70, 71] }
            "#,
        )
        .unwrap();
        assert_eq!(cfg.bridge_shard_id, 2);
        assert!(cfg.verify_roots);

        let reg = cfg.registry().unwrap();
        assert_eq!(reg.len(), 12);
        let polygon = reg.get("burn-polygon").unwrap();
        assert_eq!(
            polygon.predicate,
            Predicate::ExactType {
                tag: 259,
                id_field: Some(5)
            }
        );
        assert_eq!(polygon.payload, PayloadEncoding::BurningConfirm);
        let swap_any = reg.get("swap-any").unwrap();
        assert_eq!(swap_any.topology, Topology::OneLayer);
        assert_eq!(swap_any.payload, PayloadEncoding::Raw);
    }

    #[test]
    fn bad_entries_and_unknown_keys_are_rejected() {
        assert!(ProverConfig::from_toml_str("bridge_shard = 1").is_err());
        let cfg = ProverConfig::from_toml_str(
            r#"
            [[proof_types]]
            name = "short"
            min_fields = 1
            topology = "two-layer"
            predicate = { kind = "exact-type", tag = 5 }
            "#,
        )
        .unwrap();
        assert!(cfg.registry().is_err());
    }
}
