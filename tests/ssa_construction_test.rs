//! SSA construction through the public constructor and translator.
//!
//! Covers phi arity, the sealing protocol (single-predecessor reads, incomplete
//! phis in unsealed loop headers) and the phis of the if and loop samples.

use bumpalo::Bump;
use ssacolor::core::{CompilationSession, CompileError};
use ssacolor::ir::{
    build_graph, verify, BranchKind, GraphConstructor, IrGraph, JumpKind, NoOptimizer, NodeId,
    NodeKind, PhiKind, ValueNumbering,
};
use ssacolor::tree::{samples, BinaryOp, Expr, Function, Stmt};

fn build(function: &Function) -> IrGraph {
    let arena = Bump::new();
    let session = CompilationSession::new(&arena);
    build_graph(&session, function, NoOptimizer).unwrap()
}

fn block_named(graph: &IrGraph, name: &str) -> ssacolor::ir::BlockId {
    graph
        .block_ids()
        .find(|&b| graph.block(b).name == name)
        .unwrap_or_else(|| panic!("no block named {}", name))
}

fn scheduled_phis(graph: &IrGraph) -> Vec<NodeId> {
    graph
        .block_ids()
        .flat_map(|block| graph.phis(block))
        .collect()
}

#[test]
fn test_phi_arity_matches_predecessors_in_every_sample() {
    let _ = env_logger::builder().is_test(true).try_init();

    for function in samples::all() {
        for graph in [
            build(&function),
            {
                let arena = Bump::new();
                let session = CompilationSession::new(&arena);
                build_graph(&session, &function, ValueNumbering::new()).unwrap()
            },
        ] {
            for phi in scheduled_phis(&graph) {
                let node = graph.node(phi);
                assert_eq!(
                    node.operands.len(),
                    graph.block(node.block).predecessors.len(),
                    "phi {} in `{}`",
                    phi,
                    function.name
                );
            }
            verify(&graph).unwrap();
        }
    }
}

#[test]
fn test_phi_operands_are_live_nodes() {
    let _ = env_logger::builder().is_test(true).try_init();

    for function in samples::all() {
        let graph = build(&function);
        for phi in scheduled_phis(&graph) {
            let node = graph.node(phi);
            for &operand in &node.operands {
                assert!(graph.node(operand).is_live(), "dead operand {} of {}", operand, phi);
            }
        }
    }
}

#[test]
fn test_if_without_else_merges_then_and_entry_definitions() {
    let _ = env_logger::builder().is_test(true).try_init();

    let graph = build(&samples::if_without_else());
    let join = block_named(&graph, "if.join");
    let ret = graph.terminator(join).unwrap();
    assert_eq!(graph.node(ret).kind, NodeKind::Return);

    let value = graph.node(ret).operands[1];
    let phi = graph.node(value);
    assert_eq!(phi.kind, NodeKind::Phi(PhiKind::Value));
    assert_eq!(phi.block, join);

    let kinds: Vec<NodeKind> = phi.operands.iter().map(|&n| graph.node(n).kind).collect();
    assert_eq!(kinds, vec![NodeKind::ConstInt(1), NodeKind::ConstInt(0)]);
}

#[test]
fn test_loop_condition_reads_header_phi() {
    let _ = env_logger::builder().is_test(true).try_init();

    let graph = build(&samples::counting_loop());
    let header = block_named(&graph, "while.header");

    let compare = graph
        .live_nodes()
        .find(|&n| graph.node(n).kind == NodeKind::Binary(BinaryOp::Lt))
        .unwrap();
    let i = graph.node(graph.node(compare).operands[0]);
    assert_eq!(i.kind, NodeKind::Phi(PhiKind::Value));
    assert_eq!(i.block, header);

    // Entry value first, then the value carried by the back edge.
    assert_eq!(graph.node(i.operands[0]).kind, NodeKind::ConstInt(0));
    assert_eq!(graph.node(i.operands[1]).kind, NodeKind::Binary(BinaryOp::Add));
}

#[test]
fn test_header_phi_is_completed_when_header_is_sealed() {
    let _ = env_logger::builder().is_test(true).try_init();

    let arena = Bump::new();
    let session = CompilationSession::new(&arena);
    let mut c = GraphConstructor::new(&session, "loop", NoOptimizer);

    let i = c.variable("i");
    let entry = c.current_block();
    let zero = c.new_const_int(0);
    c.write_variable(i, entry, zero);

    let header = c.new_block("header");
    c.new_jump(JumpKind::Fallthrough, header);
    c.set_current_block(header);

    let phi = c.read_variable(i, header).unwrap();
    assert_eq!(c.graph().node(phi).kind, NodeKind::Phi(PhiKind::Value));
    assert!(c.graph().node(phi).operands.is_empty());
    assert_eq!(c.incomplete_phis(header), vec![phi]);

    let ten = c.new_const_int(10);
    let cond = c.new_binary(BinaryOp::Lt, phi, ten).unwrap();
    let (if_true, if_false) = c.new_branch(BranchKind::While, cond);

    let body = c.new_block("body");
    c.add_predecessor(body, if_true);
    c.seal_block(body).unwrap();
    c.set_current_block(body);

    // Single sealed predecessor: the header's definition, no new phi.
    let phis_before = session.stats().phis_created;
    let current = c.read_variable(i, body).unwrap();
    assert_eq!(current, phi);
    assert_eq!(session.stats().phis_created, phis_before);

    let one = c.new_const_int(1);
    let next = c.new_binary(BinaryOp::Add, current, one).unwrap();
    c.write_variable(i, body, next);
    c.new_jump(JumpKind::BackEdge, header);

    c.seal_block(header).unwrap();
    assert!(c.incomplete_phis(header).is_empty());
    assert_eq!(c.graph().node(phi).operands, vec![zero, next]);

    let exit = c.new_block("exit");
    c.add_predecessor(exit, if_false);
    c.seal_block(exit).unwrap();
    c.set_current_block(exit);
    let result = c.read_variable(i, exit).unwrap();
    assert_eq!(result, phi);
    c.new_return(result).unwrap();

    let graph = c.finish().unwrap();
    verify(&graph).unwrap();
}

#[test]
fn test_loop_invariant_phi_collapses_to_entry_value() {
    let _ = env_logger::builder().is_test(true).try_init();

    let arena = Bump::new();
    let session = CompilationSession::new(&arena);
    let mut c = GraphConstructor::new(&session, "invariant", NoOptimizer);

    let n = c.variable("n");
    let param = c.new_param(0, "n");

    let header = c.new_block("header");
    c.new_jump(JumpKind::Fallthrough, header);
    c.set_current_block(header);
    let phi = c.read_variable(n, header).unwrap();
    assert_ne!(phi, param);

    // The back edge carries the phi itself, so the phi is trivial once sealed.
    c.new_jump(JumpKind::BackEdge, header);
    c.seal_block(header).unwrap();

    assert_eq!(c.read_variable(n, header).unwrap(), param);
    assert!(!c.graph().node(phi).is_live());
    assert_eq!(session.stats().phis_collapsed, 1);
}

#[test]
fn test_sealing_twice_is_reported() {
    let _ = env_logger::builder().is_test(true).try_init();

    let arena = Bump::new();
    let session = CompilationSession::new(&arena);
    let mut c = GraphConstructor::new(&session, "twice", NoOptimizer);

    let block = c.new_block("next");
    c.new_jump(JumpKind::Fallthrough, block);
    c.seal_block(block).unwrap();
    assert_eq!(
        c.seal_block(block),
        Err(CompileError::BlockAlreadySealed { block })
    );
}

#[test]
fn test_reading_an_unbound_name_is_reported() {
    let _ = env_logger::builder().is_test(true).try_init();

    let arena = Bump::new();
    let session = CompilationSession::new(&arena);
    let mut c = GraphConstructor::new(&session, "unbound", NoOptimizer);

    let ghost = c.variable("ghost");
    let start = c.current_block();
    assert!(matches!(
        c.read_variable(ghost, start),
        Err(CompileError::UndefinedVariable { .. })
    ));
}

#[test]
fn test_value_numbering_shares_constants_across_blocks() {
    let _ = env_logger::builder().is_test(true).try_init();

    let arena = Bump::new();
    let session = CompilationSession::new(&arena);
    let graph = build_graph(&session, &samples::for_loop(), ValueNumbering::new()).unwrap();

    // `s = 0`, `i = 0` and `i % 2 == 0` share one node.
    let zeros = graph
        .live_nodes()
        .filter(|&n| graph.node(n).kind == NodeKind::ConstInt(0))
        .count();
    assert_eq!(zeros, 1);
    for node in graph.live_nodes() {
        if graph.node(node).kind.is_constant() {
            assert_eq!(graph.node(node).block, graph.start_block());
        }
    }
}

#[test]
fn test_nested_loop_phis_are_complete() {
    let _ = env_logger::builder().is_test(true).try_init();

    let graph = build(&samples::nested_loops());
    for name in ["while.header", "for.header", "for.step"] {
        let block = block_named(&graph, name);
        assert_eq!(graph.block(block).predecessors.len(), 2, "{}", name);

        let phis = graph.phis(block);
        assert!(!phis.is_empty(), "{} has no phis", name);
        for phi in phis {
            assert_eq!(graph.node(phi).operands.len(), 2, "phi {} in {}", phi, name);
        }
    }

    // `keep` is never redefined, so every phi built for it collapsed.
    let keep = graph
        .live_nodes()
        .find(|&n| graph.node(n).kind == NodeKind::Binary(BinaryOp::Mul))
        .unwrap();
    for phi in scheduled_phis(&graph) {
        assert!(!graph.node(phi).operands.contains(&keep), "{} merges keep", phi);
    }
    verify(&graph).unwrap();
}

/// `if (p > 0) { y = 1; }` repeated `count` times, then `return x;`.
fn chain_of_joins(count: usize) -> Function {
    let mut body = vec![Stmt::declare("y", Expr::int(0))];
    for _ in 0..count {
        body.push(Stmt::If {
            cond: Expr::binary(BinaryOp::Gt, Expr::var("p"), Expr::int(0)),
            then: vec![Stmt::assign("y", Expr::int(1))],
            otherwise: None,
        });
    }
    body.push(Stmt::Return(Expr::var("x")));
    Function::new("chain", &["x", "p"], body)
}

#[test]
fn test_long_chain_of_joins_builds() {
    let _ = env_logger::builder().is_test(true).try_init();

    let count = 5000;
    let arena = Bump::new();
    let session = CompilationSession::new(&arena);
    let graph = build_graph(&session, &chain_of_joins(count), NoOptimizer).unwrap();

    // The reads of `x` and of the side-effect token walk back through every join.
    assert!(scheduled_phis(&graph).is_empty());
    assert!(session.stats().phis_collapsed >= count);

    let ret = graph
        .live_nodes()
        .find(|&n| graph.node(n).kind == NodeKind::Return)
        .unwrap();
    assert_eq!(graph.node(ret).operands[0], graph.start());
    assert_eq!(graph.node(graph.node(ret).operands[1]).kind, NodeKind::Param(0));
    verify(&graph).unwrap();
}
