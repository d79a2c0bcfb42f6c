// crates/instproof-cli/src/main.rs

#![forbid(unsafe_code)]
#![deny(
    rust_2018_idioms,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo
)]

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use instproof_core::{
    io::{read_auto, write_proof_result_auto},
    Instruction,
};
use instproof_prover::{
    memory::sample_chain, ChainFixture, MemoryChain, PayloadEncoding, ProofPipeline, ProofRequest,
    ProverConfig, Topology,
};
use std::path::PathBuf;
use tracing::{info, Span};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(
    name = "instproof",
    about = "Bridge instruction proof CLI",
    long_about = "Bridge instruction proof CLI.\n\nBuild relayer proofs (Merkle paths plus consensus signatures) for instructions committed in finalized beacon and bridge blocks.",
    version = env!("CARGO_PKG_VERSION"),
    disable_help_subcommand = true
)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Write a synthetic finalized chain with burn and committee-swap confirmations
    Simulate {
        /// Number of rounds (one beacon block and one bridge block each)
        #[arg(long, default_value_t = 4, value_parser = clap::value_parser!(u64).range(1..))]
        rounds: u64,

        /// Shard id of the bridge chain
        #[arg(long, default_value_t = 1)]
        bridge_shard: u8,

        /// Output path for the chain fixture (JSON/CBOR)
        #[arg(long, default_value = "chain.json")]
        out: PathBuf,
    },

    /// Build a proof against a chain fixture
    Prove {
        /// Chain fixture (JSON/CBOR)
        #[arg(long)]
        chain: PathBuf,

        /// Registered proof type, e.g. `burn` or `beacon-swap`
        #[arg(long = "type")]
        proof_type: String,

        /// Block height (bridge height unless --on-beacon); looked up by
        /// --tx-id in the fixture's burn index when absent
        #[arg(long)]
        height: Option<String>,

        /// Transaction id (hex) for id-keyed proof types
        #[arg(long)]
        tx_id: Option<String>,

        /// Prove against the beacon block at --height
        #[arg(long, default_value_t = false)]
        on_beacon: bool,

        /// Prover config (TOML)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Recombine every layer locally before writing
        #[arg(long, default_value_t = false)]
        self_check: bool,

        /// Output path for the proof (JSON/CBOR); prints JSON when absent
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Compute the instruction Merkle root of a JSON/CBOR instruction list
    InstRoot {
        /// Input path (list of string lists)
        #[arg(long)]
        input: PathBuf,
    },

    /// List registered proof types
    Types {
        /// Prover config (TOML) with extra types
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Simulate {
            rounds,
            bridge_shard,
            out,
        } => simulate(rounds, bridge_shard, out),

        Cmd::Prove {
            chain,
            proof_type,
            height,
            tx_id,
            on_beacon,
            config,
            self_check,
            out,
        } => prove(ProveArgs {
            chain,
            proof_type,
            height,
            tx_id,
            on_beacon,
            config,
            self_check,
            out,
        }),

        Cmd::InstRoot { input } => inst_root(input),

        Cmd::Types { config } => list_types(config),
    }
}

/// Initialize tracing with an env-driven filter (default INFO).
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .compact();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

fn load_config(path: Option<&PathBuf>) -> Result<ProverConfig> {
    path.map_or_else(|| Ok(ProverConfig::default()), ProverConfig::load)
}

fn simulate(rounds: u64, bridge_shard: u8, out: PathBuf) -> Result<()> {
    info!(rounds, bridge_shard, "generating sample chain");
    let (fixture, requests) = sample_chain(rounds, bridge_shard);
    fixture
        .save(&out)
        .with_context(|| format!("writing chain fixture to {}", out.display()))?;

    println!(
        "Simulated chain: {} beacon blocks, {} shard blocks → {}",
        fixture.beacon_blocks.len(),
        fixture.shard_blocks.len(),
        out.display()
    );
    for r in requests {
        let mut line = format!(
            "  instproof prove --chain {} --type {} --height {}",
            out.display(),
            r.proof_type,
            r.height
        );
        if r.on_beacon_only {
            line.push_str(" --on-beacon");
        }
        if let Some(id) = r.tx_id {
            line.push_str(&format!(" --tx-id {id}"));
        }
        println!("{line}");
    }
    Ok(())
}

struct ProveArgs {
    chain: PathBuf,
    proof_type: String,
    height: Option<String>,
    tx_id: Option<String>,
    on_beacon: bool,
    config: Option<PathBuf>,
    self_check: bool,
    out: Option<PathBuf>,
}

fn prove(args: ProveArgs) -> Result<()> {
    let cfg = load_config(args.config.as_ref())?;
    let fixture = ChainFixture::load(&args.chain)
        .with_context(|| format!("loading chain fixture {}", args.chain.display()))?;
    let chain = MemoryChain::new(fixture);
    let pipeline =
        ProofPipeline::new(&chain, &chain, &chain, cfg, &Span::current())?.with_index(&chain);

    let req = ProofRequest::parse(
        &args.proof_type,
        args.on_beacon,
        args.height.as_deref().unwrap_or_default(),
        args.tx_id.as_deref(),
    )?;
    let layers = pipeline.build_layers(&req)?;
    if args.self_check {
        layers
            .self_check()
            .context("proof failed local self-check")?;
        info!("self-check passed");
    }
    let result = layers.into_result();

    match &args.out {
        Some(path) => {
            write_proof_result_auto(path, &result)
                .with_context(|| format!("writing proof to {}", path.display()))?;
            let (layout, height) = if result.is_two_layer() {
                ("2-layer", &result.bridge_height)
            } else {
                ("1-layer", &result.beacon_height)
            };
            println!(
                "Proof ({layout}) for {} at height {height} → {}",
                req.proof_type,
                path.display()
            );
        }
        None => {
            let js = serde_json::to_string_pretty(&result).context("serialize proof")?;
            println!("{js}");
        }
    }
    Ok(())
}

fn inst_root(input: PathBuf) -> Result<()> {
    let insts: Vec<Instruction> = read_auto(&input)
        .with_context(|| format!("reading instructions from {}", input.display()))?;
    if insts.is_empty() {
        bail!("{} holds no instructions", input.display());
    }
    let leaves: Vec<Vec<u8>> = insts.iter().map(Instruction::flatten).collect();
    let root = instproof_merkle::merkle_root(&leaves);
    info!(leaves = leaves.len(), "computed instruction root");
    println!("{}", hex::encode(root));
    Ok(())
}

fn list_types(config: Option<PathBuf>) -> Result<()> {
    let cfg = load_config(config.as_ref())?;
    let registry = cfg.registry()?;
    for t in registry.iter() {
        let topology = match t.topology {
            Topology::OneLayer => "1-layer",
            Topology::TwoLayer => "2-layer",
        };
        let payload = match t.payload {
            PayloadEncoding::Raw => "raw",
            PayloadEncoding::SwapConfirm => "swap-confirm",
            PayloadEncoding::BurningConfirm => "burning-confirm",
        };
        println!(
            "{:<28} {:<8} min_fields={:<2} payload={:<16} {:?}",
            t.name, topology, t.min_fields, payload, t.predicate
        );
    }
    Ok(())
}
