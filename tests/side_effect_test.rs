//! Side-effect token threading.
//!
//! Trapping operations and returns are ordered through the side-effect
//! chain even when no data dependency connects them.

use bumpalo::Bump;
use ssacolor::core::CompilationSession;
use ssacolor::ir::{
    build_graph, IrGraph, LocalOptimizer, NoOptimizer, NodeId, NodeKind, PhiKind, ProjectionKind,
    ValueNumbering,
};
use ssacolor::pipeline::{compile_function, PipelineConfig};
use ssacolor::tree::samples;
use ssacolor::tree::Function;

fn build<O: LocalOptimizer>(function: &Function, optimizer: O) -> IrGraph {
    let arena = Bump::new();
    let session = CompilationSession::new(&arena);
    build_graph(&session, function, optimizer).unwrap()
}

fn live_of_kind(graph: &IrGraph, kind: NodeKind) -> Vec<NodeId> {
    graph
        .live_nodes()
        .filter(|&n| graph.node(n).kind == kind)
        .collect()
}

/// The `SideEffect` projection of `op`.
fn token_of(graph: &IrGraph, op: NodeId) -> NodeId {
    graph
        .users(op)
        .iter()
        .copied()
        .find(|&n| graph.node(n).kind == NodeKind::Projection(ProjectionKind::SideEffect))
        .unwrap_or_else(|| panic!("{} has no side-effect projection", op))
}

fn assert_divisions_chained(graph: &IrGraph) {
    let divs = live_of_kind(graph, NodeKind::Div);
    assert_eq!(divs.len(), 2, "the two divisions must stay distinct");
    let (first, second) = (divs[0], divs[1]);

    assert_eq!(graph.node(first).operands[0], graph.start());
    assert_eq!(graph.node(second).operands[0], token_of(graph, first));

    let ret = live_of_kind(graph, NodeKind::Return)[0];
    assert_eq!(graph.node(ret).operands[0], token_of(graph, second));
}

#[test]
fn test_second_division_consumes_first_divisions_token() {
    let _ = env_logger::builder().is_test(true).try_init();

    assert_divisions_chained(&build(&samples::sequential_divisions(), NoOptimizer));
}

#[test]
fn test_value_numbering_keeps_identical_divisions_apart() {
    let _ = env_logger::builder().is_test(true).try_init();

    assert_divisions_chained(&build(&samples::sequential_divisions(), ValueNumbering::new()));
}

#[test]
fn test_division_chain_survives_the_pipeline() {
    let _ = env_logger::builder().is_test(true).try_init();

    let arena = Bump::new();
    let session = CompilationSession::new(&arena);
    let compiled = compile_function(
        &samples::sequential_divisions(),
        &PipelineConfig::default(),
        &session,
    )
    .unwrap();
    assert_divisions_chained(&compiled.graph);

    // Both results are unused; each gets a discardable location.
    for result in live_of_kind(&compiled.graph, NodeKind::Projection(ProjectionKind::Result)) {
        assert_eq!(compiled.location(result), Some(ssacolor::Location::Scratch));
    }
}

#[test]
fn test_returns_without_effects_consume_start() {
    let _ = env_logger::builder().is_test(true).try_init();

    let graph = build(&samples::early_return(), NoOptimizer);
    let returns = live_of_kind(&graph, NodeKind::Return);
    assert_eq!(returns.len(), 2);
    for ret in returns {
        assert_eq!(graph.node(ret).operands[0], graph.start());
    }
}

#[test]
fn test_loop_with_modulo_merges_tokens_in_header() {
    let _ = env_logger::builder().is_test(true).try_init();

    let graph = build(&samples::for_loop(), NoOptimizer);
    let modulo = live_of_kind(&graph, NodeKind::Mod)[0];

    let incoming = graph.node(graph.node(modulo).operands[0]);
    assert_eq!(incoming.kind, NodeKind::Phi(PhiKind::SideEffect));
    assert_eq!(graph.block(incoming.block).name, "for.header");

    // Entry token first, then the token carried around the loop by the modulo.
    assert_eq!(incoming.operands[0], graph.start());
    assert_eq!(incoming.operands[1], token_of(&graph, modulo));
}
