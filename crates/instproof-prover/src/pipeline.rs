// crates/instproof-prover/src/pipeline.rs

//! Request entry point.
//!
//! [`ProofPipeline::build_proof`] runs one request to completion or to the
//! first typed error. It never returns a partial result and never retries:
//! "not confirmed yet" comes back as [`ErrorKind::NotFound`](instproof_core::ErrorKind)
//! immediately.
//!
//! A request without a height is resolved by tx id through the
//! [`BurningConfirmIndex`] attached with [`ProofPipeline::with_index`].

use crate::assembler::ProofAssembler;
use crate::config::ProverConfig;
use crate::locator::{locate, locate_in_blocks, Strategy};
use crate::registry::{ProofType, ProofTypeRegistry, Topology};
use crate::traversal::BlockChainTraversal;
use instproof_core::{
    BlockRef, BlockStore, BurningConfirmIndex, ConsensusEngine, Hash, InstructionReplayer,
    NoIndex, ProofError, ProofResult, RequestContext, RequestError, SwapProof,
};
use instproof_crypto::keccak256;
use instproof_merkle::MerkleProof;
use tracing::{debug, info, info_span, warn, Span};

/// One proof request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProofRequest {
    /// Registered proof type name.
    pub proof_type: String,
    /// Prove against a beacon block at `height` instead of a bridge block.
    pub on_beacon_only: bool,
    /// Block height (beacon or bridge, see `on_beacon_only`); `None` looks
    /// both up by `tx_id`.
    pub height: Option<u64>,
    /// Transaction id for id-keyed proof types.
    pub tx_id: Option<Hash>,
}

impl ProofRequest {
    /// Request from already-typed parts.
    pub fn new(proof_type: impl Into<String>, on_beacon_only: bool, height: u64, tx_id: Option<Hash>) -> Self {
        Self {
            proof_type: proof_type.into(),
            on_beacon_only,
            height: Some(height),
            tx_id,
        }
    }

    /// Request whose height and chain come from the burn index.
    pub fn by_tx_id(proof_type: impl Into<String>, tx_id: Hash) -> Self {
        Self {
            proof_type: proof_type.into(),
            on_beacon_only: false,
            height: None,
            tx_id: Some(tx_id),
        }
    }

    /// Request from textual parts (RPC / CLI input).
    ///
    /// A blank height leaves it to the burn index. A malformed height or
    /// transaction id is [`ProofError::InvalidInput`].
    pub fn parse(
        proof_type: &str,
        on_beacon_only: bool,
        height: &str,
        tx_id: Option<&str>,
    ) -> Result<Self, RequestError> {
        let mut req = Self::new(proof_type, on_beacon_only, 0, None);
        let fail = |req: &Self, source| RequestError {
            request: req.context(),
            source,
        };
        req.height = match height.trim() {
            "" => None,
            h => Some(h.parse().map_err(|e| {
                fail(&req, ProofError::invalid(format!("height {height:?}: {e}")))
            })?),
        };
        if let Some(s) = tx_id.filter(|s| !s.trim().is_empty()) {
            req.tx_id = Some(
                s.parse()
                    .map_err(|e| fail(&req, ProofError::invalid(format!("tx id {s:?}: {e}"))))?,
            );
        }
        Ok(req)
    }

    /// Error annotation for this request.
    #[must_use]
    pub fn context(&self) -> RequestContext {
        RequestContext {
            proof_type: self.proof_type.clone(),
            height: self.height,
            tx_id: self.tx_id,
            on_beacon_only: self.on_beacon_only,
        }
    }
}

/// Per-layer proofs of one request, before wire encoding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProofLayers {
    /// Beacon layer (always present).
    pub beacon: SwapProof,
    /// Bridge layer of a 2-layer proof.
    pub bridge: Option<SwapProof>,
    /// Relayed bytes: the proven instruction without its height, in the
    /// proof type's payload encoding.
    pub payload: Vec<u8>,
}

impl ProofLayers {
    /// Hex of [`payload`](Self::payload).
    #[must_use]
    pub fn instruction_hex(&self) -> String {
        hex::encode(&self.payload)
    }

    /// Wire form.
    #[must_use]
    pub fn into_result(self) -> ProofResult {
        let instruction = self.instruction_hex();
        match self.bridge {
            Some(bridge) => ProofResult::two_layer(instruction, self.beacon, bridge),
            None => ProofResult::one_layer(instruction, self.beacon),
        }
    }

    /// Recombine every layer's path locally and compare with its root; for
    /// 2-layer proofs also re-check that the layers agree on the payload.
    pub fn self_check(&self) -> Result<(), ProofError> {
        check_layer("beacon", &self.beacon)?;
        if let Some(bridge) = &self.bridge {
            check_layer("bridge", bridge)?;
            if bridge.instruction.without_height() != self.beacon.instruction.without_height() {
                return Err(ProofError::inconsistent(
                    "beacon instruction does not confirm the bridge instruction",
                ));
            }
        }
        Ok(())
    }
}

fn decode_digest(layer: &str, s: &str) -> Result<[u8; 32], ProofError> {
    let bytes = hex::decode(s)
        .map_err(|e| ProofError::inconsistent(format!("{layer} layer: bad hex {s:?}: {e}")))?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| ProofError::inconsistent(format!("{layer} layer: {} byte digest", bytes.len())))
}

fn check_layer(layer: &str, p: &SwapProof) -> Result<(), ProofError> {
    let path = p
        .inst_path
        .iter()
        .map(|s| decode_digest(layer, s))
        .collect::<Result<Vec<_>, _>>()?;
    let proof = MerkleProof {
        path,
        is_left: p.inst_path_is_left.clone(),
    };
    let root = decode_digest(layer, &p.inst_root)?;
    let got = proof
        .recombine(keccak256(&p.instruction.flatten()))
        .map_err(|e| ProofError::inconsistent(format!("{layer} layer: {e}")))?;
    if got != root {
        return Err(ProofError::inconsistent(format!(
            "{layer} layer at height {} does not recombine to its root",
            p.block_height
        )));
    }
    Ok(())
}

/// Proof construction over borrowed chain collaborators.
///
/// Stateless between requests; share it freely across threads.
#[derive(Debug)]
pub struct ProofPipeline<S, C, R, I = NoIndex> {
    store: S,
    consensus: C,
    replayer: R,
    index: Option<I>,
    registry: ProofTypeRegistry,
    config: ProverConfig,
    span: Span,
}

impl<S, C, R> ProofPipeline<S, C, R>
where
    S: BlockStore,
    C: ConsensusEngine,
    R: InstructionReplayer,
{
    /// Pipeline with the registry described by `config`, logging under a
    /// child of `parent`. Requests must carry a height until an index is
    /// attached.
    pub fn new(
        store: S,
        consensus: C,
        replayer: R,
        config: ProverConfig,
        parent: &Span,
    ) -> Result<Self, ProofError> {
        let registry = config.registry()?;
        Ok(Self {
            store,
            consensus,
            replayer,
            index: None,
            registry,
            config,
            span: info_span!(parent: parent, "instproof"),
        })
    }

    /// Resolve height-less requests through `index`.
    pub fn with_index<I: BurningConfirmIndex>(self, index: I) -> ProofPipeline<S, C, R, I> {
        ProofPipeline {
            store: self.store,
            consensus: self.consensus,
            replayer: self.replayer,
            index: Some(index),
            registry: self.registry,
            config: self.config,
            span: self.span,
        }
    }
}

impl<S, C, R, I> ProofPipeline<S, C, R, I>
where
    S: BlockStore,
    C: ConsensusEngine,
    R: InstructionReplayer,
    I: BurningConfirmIndex,
{
    /// Build a relayer proof.
    pub fn build_proof(&self, req: &ProofRequest) -> Result<ProofResult, RequestError> {
        self.build_layers(req).map(ProofLayers::into_result)
    }

    /// Build the per-layer proofs of `req`.
    pub fn build_layers(&self, req: &ProofRequest) -> Result<ProofLayers, RequestError> {
        let span = info_span!(
            parent: &self.span,
            "request",
            proof_type = %req.proof_type,
            height = ?req.height,
            on_beacon_only = req.on_beacon_only
        );
        let out = self.run(req, &span);
        match &out {
            Ok(layers) => info!(
                parent: &span,
                beacon_height = layers.beacon.block_height,
                bridge_height = layers.bridge.as_ref().map(|b| b.block_height),
                "proof built"
            ),
            Err(e) => warn!(parent: &span, kind = %e.kind(), error = %e, "proof failed"),
        }
        out.map_err(|source| RequestError {
            request: req.context(),
            source,
        })
    }

    /// `(height, on_beacon_only)` of `req`, from the index when it has no
    /// height.
    fn resolve(&self, req: &ProofRequest, entry: &ProofType, span: &Span) -> Result<(u64, bool), ProofError> {
        if let Some(height) = req.height {
            return Ok((height, req.on_beacon_only));
        }
        let id = req
            .tx_id
            .as_ref()
            .ok_or_else(|| ProofError::invalid("a request without a height needs a transaction id"))?;
        let index = self
            .index
            .as_ref()
            .ok_or_else(|| ProofError::invalid("no burn index attached; the request needs a height"))?;
        let (height, on_beacon) = index
            .burning_confirm(id)
            .map_err(|e| ProofError::upstream("burning_confirm", e))?
            .ok_or_else(|| ProofError::not_found(format!("no burn confirmation indexed for tx {id}")))?;
        if !on_beacon && entry.topology == Topology::OneLayer {
            return Err(ProofError::invalid(format!(
                "tx {id} is confirmed on the bridge shard at height {height}, {} proofs are beacon-only",
                entry.name
            )));
        }
        debug!(parent: span, height, on_beacon, "height resolved from burn index");
        Ok((height, on_beacon))
    }

    fn run(&self, req: &ProofRequest, span: &Span) -> Result<ProofLayers, ProofError> {
        let entry = self.registry.get(&req.proof_type)?;
        let strategy = entry.strategy(req.tx_id.as_ref())?;
        let (height, on_beacon_only) = self.resolve(req, entry, span)?;
        let assembler = ProofAssembler::new(&self.consensus, self.config.verify_roots, span);
        let traversal = BlockChainTraversal::new(
            &self.store,
            &self.replayer,
            self.config.bridge_shard_id,
            self.config.max_beacon_window,
            span,
        );

        if on_beacon_only || entry.topology == Topology::OneLayer {
            let block = traversal.beacon_block(height)?;
            let found = locate(&block.instructions, &strategy)
                .ok_or_else(|| missing(entry, "beacon", height))?;
            debug!(parent: span, index = found.index, "beacon instruction located");
            let payload = entry.payload.encode(found.instruction)?;
            let beacon = assembler.assemble(BlockRef::Beacon(&block), &block.instructions, found.index)?;
            return Ok(ProofLayers {
                beacon,
                bridge: None,
                payload,
            });
        }

        let ctx = traversal.bridge_context(height)?;
        let found = locate(&ctx.instructions, &strategy)
            .ok_or_else(|| missing(entry, "bridge", height))?;
        debug!(parent: span, index = found.index, "bridge instruction located");
        let payload = entry.payload.encode(found.instruction)?;
        let bridge = assembler.assemble(BlockRef::Shard(&ctx.block), &ctx.instructions, found.index)?;

        let (beacon_block, confirm) =
            locate_in_blocks(&ctx.beacon_window, &Strategy::Prefix(found.instruction)).ok_or_else(|| {
                let from = ctx.beacon_window.first().map_or(0, |b| b.header.height);
                let to = ctx.beacon_window.last().map_or(0, |b| b.header.height);
                ProofError::inconsistent(format!(
                    "bridge instruction at height {height} has no beacon confirmation in beacon heights {from}..={to}"
                ))
            })?;
        debug!(
            parent: span,
            beacon_height = beacon_block.header.height,
            index = confirm.index,
            "beacon confirmation located"
        );
        let beacon = assembler.assemble(
            BlockRef::Beacon(beacon_block),
            &beacon_block.instructions,
            confirm.index,
        )?;
        Ok(ProofLayers {
            beacon,
            bridge: Some(bridge),
            payload,
        })
    }
}

fn missing(entry: &ProofType, chain: &str, height: u64) -> ProofError {
    ProofError::not_found(format!(
        "no {} instruction in {chain} block {height}",
        entry.name
    ))
}

/// One-shot form of [`ProofPipeline::build_proof`] with default config.
pub fn build_proof<S, C, R>(
    store: S,
    consensus: C,
    replayer: R,
    proof_type: &str,
    on_beacon_only: bool,
    height: u64,
    tx_id: Option<Hash>,
) -> Result<ProofResult, RequestError>
where
    S: BlockStore,
    C: ConsensusEngine,
    R: InstructionReplayer,
{
    let req = ProofRequest::new(proof_type, on_beacon_only, height, tx_id);
    let pipeline = ProofPipeline::new(store, consensus, replayer, ProverConfig::default(), &Span::current())
        .map_err(|source| RequestError {
            request: req.context(),
            source,
        })?;
    pipeline.build_proof(&req)
}
