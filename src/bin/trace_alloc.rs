//! Trace register allocation of the built-in sample functions.
//!
//! # Usage
//!
//! ```bash
//! # All samples with the full register file
//! cargo run --bin trace_alloc
//!
//! # One sample, three registers, spill the heaviest colors, with the graph dump
//! RUST_LOG=debug cargo run --bin trace_alloc -- --sample pressure --budget 3 \
//!     --spill-policy most-used --dump-graph
//! ```

use bumpalo::Bump;
use clap::{Parser, ValueEnum};
use ssacolor::core::CompilationSession;
use ssacolor::ir::print;
use ssacolor::pipeline::{compile_function, CompiledFunction, PipelineConfig};
use ssacolor::regalloc::SpillPolicy;
use ssacolor::tree::{samples, Function};
use ssacolor::x64::ALLOCATABLE;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "trace_alloc")]
#[command(about = "Build SSA graphs for sample functions and show how they are allocated", long_about = None)]
struct Cli {
    /// Only compile the sample with this function name
    #[arg(short, long)]
    sample: Option<String>,

    /// List the sample names and exit
    #[arg(long)]
    list: bool,

    /// Number of physical registers available to colors
    #[arg(short, long, default_value_t = ALLOCATABLE.len())]
    budget: usize,

    /// Which colors go to the stack when there are too many
    #[arg(long, value_enum, default_value_t = Policy::LeastUsed)]
    spill_policy: Policy,

    /// Fold arithmetic on constants while building
    #[arg(long)]
    fold_constants: bool,

    /// Skip the SSA verifier
    #[arg(long)]
    no_verify: bool,

    /// Print every block and node of the graph
    #[arg(long)]
    dump_graph: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Policy {
    LeastUsed,
    MostUsed,
}

impl From<Policy> for SpillPolicy {
    fn from(policy: Policy) -> Self {
        match policy {
            Policy::LeastUsed => SpillPolicy::LeastUsed,
            Policy::MostUsed => SpillPolicy::MostUsed,
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    if cli.list {
        for function in samples::all() {
            println!("{}", function.name);
        }
        return ExitCode::SUCCESS;
    }

    let functions: Vec<Function> = match &cli.sample {
        Some(name) => match samples::by_name(name) {
            Some(function) => vec![function],
            None => {
                eprintln!("unknown sample `{}` (try --list)", name);
                return ExitCode::FAILURE;
            }
        },
        None => samples::all(),
    };

    let config = PipelineConfig {
        register_budget: cli.budget,
        spill_policy: cli.spill_policy.into(),
        fold_constants: cli.fold_constants,
        verify: !cli.no_verify,
    };

    let arena = Bump::new();
    let session = CompilationSession::new(&arena);
    let mut failed = false;

    for function in &functions {
        match compile_function(function, &config, &session) {
            Ok(compiled) => report(&compiled, cli.dump_graph),
            Err(err) => {
                eprintln!("{}: {}", function.name, err);
                failed = true;
            }
        }
    }

    println!("{}", session.stats());
    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn report(compiled: &CompiledFunction<'_>, dump_graph: bool) {
    let graph = &compiled.graph;
    println!("=== {} ===", compiled.name());

    if dump_graph {
        print!("{}", print::dump(graph));
    }

    println!("liveness:");
    for record in compiled.liveness.records() {
        let mut live: Vec<_> = record.live_in.iter().copied().collect();
        live.sort_unstable();
        let live: Vec<String> = live.iter().map(ToString::to_string).collect();
        println!(
            "  {:>5} {:<20} live-in {{{}}}",
            record.node,
            graph.node(record.node).kind.to_string(),
            live.join(", ")
        );
    }

    println!(
        "interference: {} nodes, {} edges",
        compiled.interference.node_count(),
        compiled.interference.edge_count()
    );

    println!("registers:");
    for (node, location) in compiled.registers.assignments() {
        let color = compiled
            .coloring
            .color(node)
            .map(|c| c.to_string())
            .unwrap_or_default();
        println!("  {:>5} {:>4} -> {}", node, color, location);
    }

    for edge in &compiled.phi_moves {
        if edge.moves.is_empty() {
            continue;
        }
        println!("moves {} -> {} (before {}):", edge.predecessor, edge.target, edge.jump);
        for m in &edge.moves {
            println!("  {} <- {}", m.to, m.from);
        }
    }

    println!(
        "frame: {} bytes ({} aligned), {} spilled colors\n",
        compiled.frame_size(),
        compiled.registers.frame().aligned_frame_size(),
        compiled.spills.spilled_count()
    );
}
