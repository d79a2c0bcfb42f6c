// crates/instproof-prover/src/lib.rs

//! Instruction proof pipeline.
//!
//! A request names a registered proof type, a height and (for id-keyed
//! types) a transaction id; with a burn index attached the height may be
//! left out and is looked up by tx id. The pipeline then
//!
//! 1. looks the type up in the [`ProofTypeRegistry`] (predicate, minimum
//!    field count, 1- or 2-layer topology),
//! 2. fetches finalized blocks through [`BlockChainTraversal`],
//! 3. finds the instruction with the [`locator`],
//! 4. builds one [`SwapProof`](instproof_core::SwapProof) per layer with the
//!    [`ProofAssembler`], chaining the beacon layer to the bridge layer by
//!    prefix match,
//!
//! and packs the layers into a [`ProofResult`](instproof_core::ProofResult),
//! with the relayed instruction in the type's [`PayloadEncoding`].
//!
//! Every request is a stateless read over finalized chain data; pipelines
//! can be shared across threads. Logging goes through `tracing` spans
//! derived from the parent span handed to [`ProofPipeline::new`].

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

pub mod assembler;
pub mod config;
pub mod locator;
pub mod memory;
pub mod payload;
pub mod pipeline;
pub mod registry;
pub mod signatures;
pub mod traversal;

pub use assembler::ProofAssembler;
pub use config::ProverConfig;
pub use locator::{locate, locate_in_blocks, Located, Strategy};
pub use memory::{ChainBuilder, ChainFixture, MemoryChain};
pub use payload::PayloadEncoding;
pub use pipeline::{ProofLayers, ProofPipeline, ProofRequest};
pub use registry::{Predicate, ProofType, ProofTypeRegistry, Topology};
pub use signatures::{ConsensusSignatureExtractor, EncodedSignatures};
pub use traversal::{BlockChainTraversal, BridgeContext};
