// This module drives one function through every stage: tree translation with the value
// numbering hook, optional SSA verification, node ordering, liveness, interference, the
// elimination order, greedy coloring (checked against the interference graph), spill
// selection and register materialization, and finally the phi resolution moves for the
// emitter. PipelineConfig carries the knobs (register budget, spill policy, constant folding,
// verification); CompiledFunction keeps every intermediate result so diagnostics and tests can
// look at any stage. Each function is compiled independently; the only thing shared between
// runs is the CompilationSession with its arena, interner and statistics.

//! Pipeline driver.

use crate::core::error::{CompileError, CompileResult};
use crate::core::session::CompilationSession;
use crate::ir::{self, IrGraph, NodeId, ValueNumbering};
use crate::regalloc::{
    self, coloring, interference, liveness, order, Coloring, InterferenceGraph, Liveness, NodeOrder,
    SpillDecision, SpillPolicy,
};
use crate::tree::Function;
use crate::x64::{self, EdgeMoves, Location, RegisterMap, ALLOCATABLE};
use log::{debug, info};

/// Knobs of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Physical registers available to colors, at most [`ALLOCATABLE`]`.len()`.
    pub register_budget: usize,
    pub spill_policy: SpillPolicy,
    /// Fold pure arithmetic on constants while building.
    pub fold_constants: bool,
    /// Run the SSA verifier on the finished graph.
    pub verify: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            register_budget: ALLOCATABLE.len(),
            spill_policy: SpillPolicy::default(),
            fold_constants: false,
            verify: true,
        }
    }
}

/// Every stage's output for one function.
#[derive(Debug)]
pub struct CompiledFunction<'arena> {
    pub graph: IrGraph,
    pub order: NodeOrder,
    pub liveness: Liveness,
    pub interference: InterferenceGraph,
    pub elimination_order: Vec<NodeId>,
    pub coloring: Coloring,
    pub spills: SpillDecision,
    pub registers: RegisterMap<'arena>,
    pub phi_moves: Vec<EdgeMoves>,
}

impl CompiledFunction<'_> {
    pub fn name(&self) -> &str {
        self.graph.name()
    }

    pub fn location(&self, node: NodeId) -> Option<Location> {
        self.registers.location(node)
    }

    /// Spilled slot count times the word size.
    pub fn frame_size(&self) -> u32 {
        self.registers.frame_size()
    }
}

pub fn compile_function<'arena>(
    function: &Function,
    config: &PipelineConfig,
    session: &CompilationSession<'arena>,
) -> CompileResult<CompiledFunction<'arena>> {
    if config.register_budget > ALLOCATABLE.len() {
        return Err(CompileError::BudgetExceedsRegisterFile {
            budget: config.register_budget,
            available: ALLOCATABLE.len(),
        });
    }

    session.set_current_function(&function.name);
    let result = run_stages(function, config, session);
    session.clear_function_state();

    let compiled = result?;
    session.record_function_compiled(compiled.name(), compiled.graph.live_node_count());
    session.record_allocation(
        compiled.coloring.distinct_colors(),
        compiled.spills.spilled_count(),
    );
    info!(
        "compiled `{}`: {} colors, {} spilled, frame {} bytes",
        compiled.name(),
        compiled.coloring.distinct_colors(),
        compiled.spills.spilled_count(),
        compiled.frame_size()
    );
    Ok(compiled)
}

fn run_stages<'arena>(
    function: &Function,
    config: &PipelineConfig,
    session: &CompilationSession<'arena>,
) -> CompileResult<CompiledFunction<'arena>> {
    let optimizer = ValueNumbering::new().with_constant_folding(config.fold_constants);
    let graph = ir::build_graph(session, function, optimizer)?;
    if config.verify {
        ir::verify(&graph)?;
    }

    let order = order::generate(&graph);
    let liveness = liveness::analyze(&graph, &order);
    let interference = interference::build(&graph, &order, &liveness);
    let elimination_order = regalloc::elimination_order(&interference);
    let coloring = coloring::color(&interference, &elimination_order, &liveness);
    coloring.validate(&interference)?;
    debug!(
        "coloring for `{}`: {} colors, max pressure {}",
        graph.name(),
        coloring.distinct_colors(),
        liveness.max_pressure()
    );

    let spills = regalloc::select_spills(&coloring, config.register_budget as u32, config.spill_policy);
    let registers = x64::materialize(session.arena(), &coloring, &spills)?;
    let phi_moves = x64::resolve_phi_moves(&graph, &order, &registers)?;

    Ok(CompiledFunction {
        graph,
        order,
        liveness,
        interference,
        elimination_order,
        coloring,
        spills,
        registers,
        phi_moves,
    })
}

/// Compile independent functions one after the other. Stops at the first failure.
pub fn compile_functions<'arena>(
    functions: &[Function],
    config: &PipelineConfig,
    session: &CompilationSession<'arena>,
) -> CompileResult<Vec<CompiledFunction<'arena>>> {
    functions
        .iter()
        .map(|function| compile_function(function, config, session))
        .collect()
}
