//! Node and block identities plus the closed set of node kinds.

use crate::tree::{BinaryOp, UnaryOp};
use std::fmt;

/// Index of a node in its graph's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

/// Index of a block in its graph's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(u32);

impl NodeId {
    pub fn new(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl BlockId {
    pub fn new(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProjectionKind {
    /// Arithmetic result of a division or modulo.
    Result,
    /// Side-effect token produced by a division or modulo.
    SideEffect,
    IfTrue,
    IfFalse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhiKind {
    Value,
    SideEffect,
}

/// Statement that produced a conditional branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BranchKind {
    If,
    While,
    For,
    Ternary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JumpKind {
    Fallthrough,
    Break,
    Continue,
    BackEdge,
}

/// Operation tag of a node.
///
/// Operand layouts:
/// - `Unary`: `[operand]`
/// - `Binary`: `[lhs, rhs]`
/// - `Div` / `Mod`: `[side_effect, lhs, rhs]`
/// - `Projection`: `[tuple]` (the divide, or the branch)
/// - `Phi`: one operand per control predecessor of the block
/// - `Branch`: `[cond]`
/// - `Return`: `[side_effect, value]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Start,
    Param(u32),
    ConstInt(i64),
    ConstBool(bool),
    Unary(UnaryOp),
    Binary(BinaryOp),
    Div,
    Mod,
    Projection(ProjectionKind),
    Phi(PhiKind),
    Branch(BranchKind),
    Jump(JumpKind),
    Return,
}

impl NodeKind {
    pub fn is_constant(self) -> bool {
        matches!(self, NodeKind::ConstInt(_) | NodeKind::ConstBool(_))
    }

    /// Pure kinds that may be merged with a structurally identical node.
    pub fn is_value_numbered(self) -> bool {
        matches!(
            self,
            NodeKind::ConstInt(_) | NodeKind::ConstBool(_) | NodeKind::Unary(_) | NodeKind::Binary(_)
        )
    }

    /// Kinds whose identity does not depend on the block they were built in.
    pub fn is_block_independent(self) -> bool {
        self.is_constant()
    }

    /// Whether the node produces a value that has to live somewhere.
    pub fn needs_register(self) -> bool {
        matches!(
            self,
            NodeKind::Param(_)
                | NodeKind::ConstInt(_)
                | NodeKind::ConstBool(_)
                | NodeKind::Unary(_)
                | NodeKind::Binary(_)
                | NodeKind::Projection(ProjectionKind::Result)
                | NodeKind::Phi(PhiKind::Value)
        )
    }

    /// Nodes that end a block.
    pub fn is_control(self) -> bool {
        matches!(
            self,
            NodeKind::Branch(_) | NodeKind::Jump(_) | NodeKind::Return
        )
    }

    pub fn is_phi(self) -> bool {
        matches!(self, NodeKind::Phi(_))
    }

    /// Kinds whose operand 0 must be a side-effect token.
    pub fn consumes_side_effect(self) -> bool {
        matches!(self, NodeKind::Div | NodeKind::Mod | NodeKind::Return)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Start => write!(f, "start"),
            NodeKind::Param(index) => write!(f, "param {}", index),
            NodeKind::ConstInt(value) => write!(f, "const {}", value),
            NodeKind::ConstBool(value) => write!(f, "const {}", value),
            NodeKind::Unary(op) => write!(f, "unary {}", op.symbol()),
            NodeKind::Binary(op) => write!(f, "binary {}", op.symbol()),
            NodeKind::Div => write!(f, "div"),
            NodeKind::Mod => write!(f, "mod"),
            NodeKind::Projection(kind) => write!(f, "proj {:?}", kind),
            NodeKind::Phi(PhiKind::Value) => write!(f, "phi"),
            NodeKind::Phi(PhiKind::SideEffect) => write!(f, "phi side-effect"),
            NodeKind::Branch(kind) => write!(f, "branch {:?}", kind),
            NodeKind::Jump(kind) => write!(f, "jump {:?}", kind),
            NodeKind::Return => write!(f, "return"),
        }
    }
}
