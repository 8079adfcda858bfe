//! Structural checks on a finished graph.

use super::graph::IrGraph;
use super::node::{NodeId, NodeKind, PhiKind, ProjectionKind};
use crate::core::error::{CompileError, CompileResult};

/// Check the invariants later stages rely on.
///
/// - every block is sealed
/// - every operand names a live node of this graph
/// - every phi has one operand per control predecessor of its block
/// - `Div`, `Mod` and `Return` take a side-effect token as operand 0
pub fn verify(graph: &IrGraph) -> CompileResult<()> {
    for block in graph.block_ids() {
        if !graph.block(block).is_sealed() {
            return Err(CompileError::UnsealedBlock { block });
        }
    }

    for id in graph.live_nodes() {
        let node = graph.node(id);

        for &operand in &node.operands {
            if !graph.contains(operand) || !graph.node(operand).is_live() {
                return Err(CompileError::InvalidOperand { node: id, operand });
            }
        }

        match node.kind {
            NodeKind::Phi(kind) => {
                let predecessors = graph.block(node.block).predecessors.len();
                if node.operands.len() != predecessors {
                    return Err(match kind {
                        PhiKind::Value => CompileError::PhiArity {
                            phi: id,
                            block: node.block,
                            operands: node.operands.len(),
                            predecessors,
                        },
                        PhiKind::SideEffect => CompileError::SideEffectPhiArity {
                            phi: id,
                            values: node.operands.len(),
                            jumps: predecessors,
                        },
                    });
                }
            }
            kind if kind.consumes_side_effect() => {
                let token = node.operands.first().copied();
                if !token.is_some_and(|token| is_side_effect(graph, token)) {
                    return Err(CompileError::MissingSideEffect { node: id });
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn is_side_effect(graph: &IrGraph, node: NodeId) -> bool {
    matches!(
        graph.node(node).kind,
        NodeKind::Start
            | NodeKind::Projection(ProjectionKind::SideEffect)
            | NodeKind::Phi(PhiKind::SideEffect)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::node::JumpKind;

    fn sealed_graph() -> IrGraph {
        let mut graph = IrGraph::new("f");
        graph.mark_sealed(graph.end_block());
        graph
    }

    #[test]
    fn test_unsealed_block_is_reported() {
        let graph = IrGraph::new("f");
        assert_eq!(
            verify(&graph),
            Err(CompileError::UnsealedBlock {
                block: graph.end_block()
            })
        );
    }

    #[test]
    fn test_phi_arity_mismatch() {
        let mut graph = sealed_graph();
        let start = graph.start_block();
        let join = graph.add_block("join");
        let jump = graph.add_node(NodeKind::Jump(JumpKind::Fallthrough), start, vec![]);
        graph.add_block_predecessor(join, jump);
        graph.mark_sealed(join);

        let zero = graph.add_node(NodeKind::ConstInt(0), start, vec![]);
        let phi = graph.add_node(NodeKind::Phi(PhiKind::Value), join, vec![zero, zero]);
        assert_eq!(
            verify(&graph),
            Err(CompileError::PhiArity {
                phi,
                block: join,
                operands: 2,
                predecessors: 1
            })
        );

        graph.detach(phi);
        let token = graph.add_node(NodeKind::Phi(PhiKind::SideEffect), join, vec![]);
        assert_eq!(
            verify(&graph),
            Err(CompileError::SideEffectPhiArity {
                phi: token,
                values: 0,
                jumps: 1
            })
        );
    }

    #[test]
    fn test_return_needs_side_effect() {
        let mut graph = sealed_graph();
        let start = graph.start_block();
        let zero = graph.add_node(NodeKind::ConstInt(0), start, vec![]);
        let ret = graph.add_node(NodeKind::Return, start, vec![zero, zero]);
        assert_eq!(
            verify(&graph),
            Err(CompileError::MissingSideEffect { node: ret })
        );
    }

    #[test]
    fn test_dead_operand_is_reported() {
        let mut graph = sealed_graph();
        let start = graph.start_block();
        let zero = graph.add_node(NodeKind::ConstInt(0), start, vec![]);
        let ret = graph.add_node(NodeKind::Return, start, vec![graph.start(), zero]);
        assert_eq!(verify(&graph), Ok(()));

        graph.detach(zero);
        assert_eq!(
            verify(&graph),
            Err(CompileError::InvalidOperand {
                node: ret,
                operand: zero
            })
        );
    }
}
