// crates/instproof-prover/src/registry.rs

//! Data-driven table of proof types.
//!
//! Each entry owns its predicate, minimum field count, topology and payload
//! encoding. The pipeline never branches on a type name; supporting a new
//! bridged event is one more entry (builtin or from config).

use crate::locator::Strategy;
use crate::payload::PayloadEncoding;
use instproof_core::{Hash, ProofError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Instruction type tags of the builtin confirmations.
pub mod tags {
    /// Beacon committee swap confirmation.
    pub const BEACON_SWAP_CONFIRM: u32 = 70;
    /// Bridge committee swap confirmation.
    pub const BRIDGE_SWAP_CONFIRM: u32 = 71;
    /// Burn confirmation (legacy, relayed through the bridge shard).
    pub const BURNING_CONFIRM: u32 = 72;
    /// Burn for deposit to a smart contract.
    pub const BURNING_CONFIRM_FOR_DEPOSIT_TO_SC: u32 = 97;
    /// Burn confirmation, v2 layout.
    pub const BURNING_CONFIRM_V2: u32 = 240;
    /// Burn for deposit to a smart contract, v2 layout.
    pub const BURNING_CONFIRM_FOR_DEPOSIT_TO_SC_V2: u32 = 243;
    /// Burn confirmation for the BSC bridge.
    pub const BURNING_BSC_CONFIRM: u32 = 252;
    /// Portal custodian collateral withdrawal confirmation.
    pub const PORTAL_CUSTODIAN_WITHDRAW_CONFIRM: u32 = 171;
    /// Portal collateral withdrawal confirmation, v3.
    pub const PORTAL_WITHDRAW_COLLATERAL_CONFIRM: u32 = 173;
    /// Portal liquidation confirmation.
    pub const PORTAL_LIQUIDATE_CONFIRM: u32 = 175;

    /// Burns signed on the beacon chain only; indexed by beacon height.
    pub const BEACON_BURNS: [u32; 3] = [
        BURNING_CONFIRM_V2,
        BURNING_CONFIRM_FOR_DEPOSIT_TO_SC_V2,
        BURNING_BSC_CONFIRM,
    ];
    /// Burns signed on the bridge shard and again on the beacon chain;
    /// indexed by bridge height.
    pub const SHARD_BURNS: [u32; 2] = [BURNING_CONFIRM, BURNING_CONFIRM_FOR_DEPOSIT_TO_SC];
    /// Field holding the burn's tx id.
    pub const BURN_ID_FIELD: usize = 5;
}

/// How a block's instructions are matched.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Predicate {
    /// Field 0 equals `tag`.
    ExactType {
        /// Expected type tag.
        tag: u32,
        /// Offset of the field that must decode to the request's tx id.
        #[serde(default)]
        id_field: Option<usize>,
    },
    /// Field 0 is any of `tags`.
    TypeFamily {
        /// Accepted type tags.
        tags: Vec<u32>,
        /// Offset of the field that must decode to the request's tx id.
        #[serde(default)]
        id_field: Option<usize>,
    },
}

impl Predicate {
    /// Offset of the tx-id field, if the predicate keys on one.
    #[must_use]
    pub const fn id_field(&self) -> Option<usize> {
        match self {
            Self::ExactType { id_field, .. } | Self::TypeFamily { id_field, .. } => *id_field,
        }
    }
}

/// Where the instruction is proven.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Topology {
    /// A single beacon block.
    OneLayer,
    /// A bridge-shard block, confirmed again by a beacon block.
    TwoLayer,
}

/// One registry entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofType {
    /// Lookup key, e.g. `burn-v2`.
    pub name: String,
    /// Match rule.
    pub predicate: Predicate,
    /// Instructions with fewer fields never match.
    pub min_fields: usize,
    /// Layer layout.
    pub topology: Topology,
    /// How the proven instruction becomes the relayed payload.
    #[serde(default)]
    pub payload: PayloadEncoding,
}

impl ProofType {
    fn exact(name: &str, tag: u32, min_fields: usize, id_field: Option<usize>, topology: Topology) -> Self {
        Self {
            name: name.to_owned(),
            predicate: Predicate::ExactType { tag, id_field },
            min_fields,
            topology,
            payload: PayloadEncoding::Raw,
        }
    }

    fn family(name: &str, tags: &[u32], min_fields: usize, id_field: Option<usize>) -> Self {
        Self {
            name: name.to_owned(),
            predicate: Predicate::TypeFamily {
                tags: tags.to_vec(),
                id_field,
            },
            min_fields,
            topology: Topology::OneLayer,
            payload: PayloadEncoding::Raw,
        }
    }

    fn encoded(mut self, payload: PayloadEncoding) -> Self {
        self.payload = payload;
        self
    }

    /// Reject entries that could never match or that key on the height field.
    pub fn validate(&self) -> Result<(), ProofError> {
        if self.name.trim().is_empty() {
            return Err(ProofError::invalid("proof type name is empty"));
        }
        // type tag plus trailing height
        if self.min_fields < 2 {
            return Err(ProofError::invalid(format!(
                "proof type {}: min_fields must be at least 2, got {}",
                self.name, self.min_fields
            )));
        }
        if let Some(i) = self.predicate.id_field() {
            if i == 0 || i + 1 >= self.min_fields {
                return Err(ProofError::invalid(format!(
                    "proof type {}: id_field {i} must lie strictly between the type tag and the height field",
                    self.name
                )));
            }
        }
        if self.min_fields <= self.payload.min_fields() {
            return Err(ProofError::invalid(format!(
                "proof type {}: {:?} payload reads {} fields before the height, min_fields is {}",
                self.name,
                self.payload,
                self.payload.min_fields(),
                self.min_fields
            )));
        }
        if let Predicate::TypeFamily { tags, .. } = &self.predicate {
            if tags.is_empty() {
                return Err(ProofError::invalid(format!(
                    "proof type {}: empty type family",
                    self.name
                )));
            }
        }
        Ok(())
    }

    /// Locator strategy for a request against this type.
    ///
    /// Id-keyed types require `tx_id`; other types ignore it.
    pub fn strategy<'a>(&'a self, tx_id: Option<&'a Hash>) -> Result<Strategy<'a>, ProofError> {
        let id = match self.predicate.id_field() {
            Some(field) => {
                let id = tx_id.ok_or_else(|| {
                    ProofError::invalid(format!("proof type {} requires a transaction id", self.name))
                })?;
                Some((field, id))
            }
            None => None,
        };
        Ok(match &self.predicate {
            Predicate::ExactType { tag, .. } => Strategy::ExactType {
                tag: *tag,
                min_fields: self.min_fields,
                id,
            },
            Predicate::TypeFamily { tags, .. } => Strategy::TypeFamily {
                tags,
                min_fields: self.min_fields,
                id,
            },
        })
    }
}

/// Closed set of proof types keyed by name.
#[derive(Clone, Debug, Default)]
pub struct ProofTypeRegistry {
    entries: BTreeMap<String, ProofType>,
}

impl ProofTypeRegistry {
    /// Registry without entries.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// The builtin confirmation types.
    #[must_use]
    pub fn builtin() -> Self {
        use tags::*;
        use PayloadEncoding::{BurningConfirm, SwapConfirm};
        use Topology::{OneLayer, TwoLayer};

        let id = Some(BURN_ID_FIELD);
        let entries = [
            ProofType::exact("beacon-swap", BEACON_SWAP_CONFIRM, 5, None, OneLayer).encoded(SwapConfirm),
            ProofType::exact("bridge-swap", BRIDGE_SWAP_CONFIRM, 5, None, TwoLayer).encoded(SwapConfirm),
            ProofType::exact("burn", BURNING_CONFIRM, 7, id, TwoLayer).encoded(BurningConfirm),
            ProofType::exact("burn-deposit-sc", BURNING_CONFIRM_FOR_DEPOSIT_TO_SC, 8, id, TwoLayer),
            ProofType::exact("burn-v2", BURNING_CONFIRM_V2, 7, id, OneLayer).encoded(BurningConfirm),
            ProofType::exact("burn-deposit-sc-v2", BURNING_CONFIRM_FOR_DEPOSIT_TO_SC_V2, 8, id, OneLayer),
            ProofType::exact("burn-bsc", BURNING_BSC_CONFIRM, 7, id, OneLayer).encoded(BurningConfirm),
            ProofType::family(
                "burn-any",
                &[BURNING_CONFIRM, BURNING_CONFIRM_V2, BURNING_BSC_CONFIRM],
                7,
                id,
            )
            .encoded(BurningConfirm),
            ProofType::exact(
                "portal-withdraw-collateral",
                PORTAL_CUSTODIAN_WITHDRAW_CONFIRM,
                8,
                Some(6),
                OneLayer,
            ),
            ProofType::family(
                "portal-confirm-any",
                &[
                    PORTAL_CUSTODIAN_WITHDRAW_CONFIRM,
                    PORTAL_WITHDRAW_COLLATERAL_CONFIRM,
                    PORTAL_LIQUIDATE_CONFIRM,
                ],
                8,
                Some(6),
            ),
        ];
        Self {
            entries: entries.into_iter().map(|e| (e.name.clone(), e)).collect(),
        }
    }

    /// Add or replace an entry.
    pub fn insert(&mut self, entry: ProofType) -> Result<(), ProofError> {
        entry.validate()?;
        self.entries.insert(entry.name.clone(), entry);
        Ok(())
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with_entry(mut self, entry: ProofType) -> Result<Self, ProofError> {
        self.insert(entry)?;
        Ok(self)
    }

    /// Entry for `name`; unknown names are invalid input.
    pub fn get(&self, name: &str) -> Result<&ProofType, ProofError> {
        self.entries
            .get(name)
            .ok_or_else(|| ProofError::invalid(format!("unknown proof type {name:?}")))
    }

    /// All entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = &ProofType> {
        self.entries.values()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when no entries are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use instproof_core::ErrorKind;

    #[test]
    fn builtins_are_valid_and_named_uniquely() {
        let reg = ProofTypeRegistry::builtin();
        assert_eq!(reg.len(), 10);
        for entry in reg.iter() {
            entry.validate().unwrap();
        }
        assert_eq!(reg.get("burn").unwrap().topology, Topology::TwoLayer);
        assert_eq!(reg.get("burn-v2").unwrap().topology, Topology::OneLayer);
        assert_eq!(reg.get("burn-deposit-sc").unwrap().topology, Topology::TwoLayer);
        assert_eq!(reg.get("burn-any").unwrap().payload, PayloadEncoding::BurningConfirm);
        assert_eq!(reg.get("bridge-swap").unwrap().payload, PayloadEncoding::SwapConfirm);
        assert_eq!(reg.get("portal-confirm-any").unwrap().payload, PayloadEncoding::Raw);
    }

    #[test]
    fn payload_must_fit_before_the_height() {
        let short = ProofType::exact("short", 72, 6, None, Topology::OneLayer)
            .encoded(PayloadEncoding::BurningConfirm);
        assert_eq!(short.validate().unwrap_err().kind(), ErrorKind::InvalidInput);
        let swap = ProofType::exact("swap", 70, 4, None, Topology::OneLayer).encoded(PayloadEncoding::SwapConfirm);
        assert!(swap.validate().is_err());
    }

    #[test]
    fn unknown_type_is_invalid_input() {
        let err = ProofTypeRegistry::builtin().get("mint").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn id_keyed_types_need_a_tx_id() {
        let reg = ProofTypeRegistry::builtin();
        let err = reg.get("burn-bsc").unwrap().strategy(None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(reg.get("beacon-swap").unwrap().strategy(None).is_ok());
    }

    #[test]
    fn id_field_on_height_is_rejected() {
        let bad = ProofType::exact("bad", 9, 4, Some(3), Topology::OneLayer);
        assert!(ProofTypeRegistry::empty().with_entry(bad).is_err());
        let family = ProofType::family("none", &[], 4, None);
        assert!(family.validate().is_err());
    }

    #[test]
    fn entries_replace_by_name() {
        let mut reg = ProofTypeRegistry::builtin();
        reg.insert(ProofType::exact("burn", 72, 7, Some(5), Topology::OneLayer))
            .unwrap();
        assert_eq!(reg.len(), 10);
        assert_eq!(reg.get("burn").unwrap().topology, Topology::OneLayer);
    }
}
