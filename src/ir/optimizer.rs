//! Local optimizer hook applied to every freshly built value node.
//!
//! The constructor hands each new node to [`LocalOptimizer::transform`] and
//! continues with whatever node comes back. Returning a different node means
//! the new one is redundant; the optimizer detaches it from its block.

use super::graph::IrGraph;
use super::node::{BlockId, NodeId, NodeKind};
use crate::tree::{BinaryOp, UnaryOp};
use hashbrown::HashMap;
use log::trace;

pub trait LocalOptimizer {
    /// Return the node to use in place of `node`.
    fn transform(&mut self, graph: &mut IrGraph, node: NodeId) -> NodeId;
}

/// Keeps every node as built.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOptimizer;

impl LocalOptimizer for NoOptimizer {
    fn transform(&mut self, _graph: &mut IrGraph, node: NodeId) -> NodeId {
        node
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct NodeKey {
    kind: NodeKind,
    block: Option<BlockId>,
    operands: Vec<NodeId>,
}

/// Hash-consing of pure nodes, with optional constant folding.
///
/// Non-constant keys include the block, so a hit is always in the same block
/// as the node it replaces and no dominance check is needed. Division and
/// modulo are never numbered or folded: two of them are distinct even with
/// identical operands, and a constant division by zero must still trap.
#[derive(Debug, Default)]
pub struct ValueNumbering {
    table: HashMap<NodeKey, NodeId>,
    fold_constants: bool,
}

impl ValueNumbering {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_constant_folding(mut self, enabled: bool) -> Self {
        self.fold_constants = enabled;
        self
    }

    fn key(kind: NodeKind, block: BlockId, operands: Vec<NodeId>) -> NodeKey {
        NodeKey {
            kind,
            block: if kind.is_block_independent() {
                None
            } else {
                Some(block)
            },
            operands,
        }
    }
}

impl LocalOptimizer for ValueNumbering {
    fn transform(&mut self, graph: &mut IrGraph, node: NodeId) -> NodeId {
        let built = graph.node(node);
        if !built.kind.is_value_numbered() {
            return node;
        }

        let folded = if self.fold_constants {
            fold(graph, built.kind, &built.operands)
        } else {
            None
        };

        let key = match folded {
            Some(kind) => Self::key(kind, graph.start_block(), Vec::new()),
            None => Self::key(built.kind, built.block, built.operands.clone()),
        };

        if let Some(&existing) = self.table.get(&key) {
            if existing != node {
                trace!("value numbering: {} is {}", node, existing);
                graph.detach(node);
            }
            return existing;
        }

        let result = match folded {
            Some(kind) => {
                let constant = graph.add_node(kind, graph.start_block(), Vec::new());
                trace!("folded {} into {} ({})", node, constant, kind);
                graph.detach(node);
                constant
            }
            None => node,
        };
        self.table.insert(key, result);
        result
    }
}

#[derive(Debug, Clone, Copy)]
enum Constant {
    Int(i64),
    Bool(bool),
}

fn constant(graph: &IrGraph, node: NodeId) -> Option<Constant> {
    match graph.node(node).kind {
        NodeKind::ConstInt(value) => Some(Constant::Int(value)),
        NodeKind::ConstBool(value) => Some(Constant::Bool(value)),
        _ => None,
    }
}

fn fold(graph: &IrGraph, kind: NodeKind, operands: &[NodeId]) -> Option<NodeKind> {
    match (kind, operands) {
        (NodeKind::Unary(op), &[operand]) => fold_unary(op, constant(graph, operand)?),
        (NodeKind::Binary(op), &[lhs, rhs]) => {
            fold_binary(op, constant(graph, lhs)?, constant(graph, rhs)?)
        }
        _ => None,
    }
}

fn fold_unary(op: UnaryOp, value: Constant) -> Option<NodeKind> {
    match (op, value) {
        (UnaryOp::Neg, Constant::Int(v)) => Some(NodeKind::ConstInt(v.wrapping_neg())),
        (UnaryOp::BitNot, Constant::Int(v)) => Some(NodeKind::ConstInt(!v)),
        (UnaryOp::Not, Constant::Bool(v)) => Some(NodeKind::ConstBool(!v)),
        _ => None,
    }
}

fn fold_binary(op: BinaryOp, lhs: Constant, rhs: Constant) -> Option<NodeKind> {
    use NodeKind::{ConstBool, ConstInt};

    match (lhs, rhs) {
        (Constant::Int(a), Constant::Int(b)) => match op {
            BinaryOp::Add => Some(ConstInt(a.wrapping_add(b))),
            BinaryOp::Sub => Some(ConstInt(a.wrapping_sub(b))),
            BinaryOp::Mul => Some(ConstInt(a.wrapping_mul(b))),
            BinaryOp::BitAnd => Some(ConstInt(a & b)),
            BinaryOp::BitOr => Some(ConstInt(a | b)),
            BinaryOp::BitXor => Some(ConstInt(a ^ b)),
            BinaryOp::Shl => Some(ConstInt(a.wrapping_shl(b as u32))),
            BinaryOp::Shr => Some(ConstInt(a.wrapping_shr(b as u32))),
            BinaryOp::Lt => Some(ConstBool(a < b)),
            BinaryOp::Le => Some(ConstBool(a <= b)),
            BinaryOp::Gt => Some(ConstBool(a > b)),
            BinaryOp::Ge => Some(ConstBool(a >= b)),
            BinaryOp::Eq => Some(ConstBool(a == b)),
            BinaryOp::Ne => Some(ConstBool(a != b)),
            BinaryOp::Div | BinaryOp::Mod | BinaryOp::LogicalAnd | BinaryOp::LogicalOr => None,
        },
        (Constant::Bool(a), Constant::Bool(b)) => match op {
            BinaryOp::LogicalAnd | BinaryOp::BitAnd => Some(ConstBool(a && b)),
            BinaryOp::LogicalOr | BinaryOp::BitOr => Some(ConstBool(a || b)),
            BinaryOp::BitXor | BinaryOp::Ne => Some(ConstBool(a != b)),
            BinaryOp::Eq => Some(ConstBool(a == b)),
            _ => None,
        },
        _ => None,
    }
}
