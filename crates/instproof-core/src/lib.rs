// crates/instproof-core/src/lib.rs

//! instproof-core: chain types, collaborator traits, errors and wire shapes.
//!
//! This crate defines the **stable boundary** used across instproof crates:
//! - canonical chain data types (`Instruction`, `BeaconBlock`, `ShardBlock`, …),
//! - the traits through which the prover reads the host node (block store,
//!   consensus engine, instruction replay),
//! - the typed error taxonomy returned by the proof pipeline, and
//! - the `ProofResult` shape relayers consume, plus JSON/CBOR I/O helpers.
//!
//! ```no_run
//! use instproof_core::{Hash, Instruction};
//! let inst: Instruction = ["72", "1", "token", "0xabc", "100", "txid", "9"].into_iter().collect();
//! assert_eq!(inst.type_tag(), Some(72));
//! let _leaf = inst.flatten();
//! let _id: Hash = "00".repeat(32).parse()?;
//! # Ok::<(), instproof_core::HashParseError>(())
//! ```

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
// Small, explicit allowlist to keep docs readable and APIs ergonomic.
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::doc_markdown
)]

/// Traits for the external collaborators (block store, consensus, replay,
/// burn index).
pub mod chain;
/// Typed error taxonomy and request annotation.
pub mod error;
/// JSON/CBOR helpers and auto-detecting read/write APIs.
pub mod io;
/// Per-layer proofs and the `ProofResult` wire shape.
pub mod result;
/// Canonical chain data types.
pub mod types;

// ---- Re-exports for workspace compatibility ----
pub use chain::*;
pub use error::*;
pub use result::*;
pub use types::*;

/// Commonly-used items for quick imports.
///
/// ```rust
/// use instproof_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        chain::{BlockStore, BurningConfirmIndex, ConsensusEngine, InstructionReplayer},
        error::{ErrorKind, ProofError, RequestError},
        result::{ProofResult, SwapProof},
        types::*,
    };
}
