// This module defines the internal error type of the ssacolor pipeline using the thiserror
// crate. Nothing reported here is a language diagnostic: the front end has already validated
// the function, so every variant signals a broken invariant inside graph construction or
// allocation (sealing a block twice, a phi whose operand count disagrees with its block's
// predecessors, a side-effect phi merging the wrong number of tokens, an operand pointing
// outside the arena, a coloring that puts interfering nodes on the same color) or a
// configuration the register model cannot satisfy. Each variant carries the offending node
// or block so the message identifies where construction went wrong. CompileResult<T> is the
// alias every fallible stage returns; errors abort the compilation of the current function.

//! Error types for the ssacolor pipeline.
//!
//! Using thiserror for more idiomatic error handling.

use crate::ir::{BlockId, NodeId};
use thiserror::Error;

/// Internal-error signal raised by graph construction and allocation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("Block {block} sealed twice")]
    BlockAlreadySealed { block: BlockId },

    #[error("Block {block} was never sealed")]
    UnsealedBlock { block: BlockId },

    #[error("No reaching definition of `{name}` in block {block}")]
    UndefinedVariable { name: String, block: BlockId },

    #[error("Phi {phi} has {operands} operands but block {block} has {predecessors} predecessors")]
    PhiArity {
        phi: NodeId,
        block: BlockId,
        operands: usize,
        predecessors: usize,
    },

    #[error("Side-effect phi {phi} merges {values} values over {jumps} jumps")]
    SideEffectPhiArity {
        phi: NodeId,
        values: usize,
        jumps: usize,
    },

    #[error("Node {node} does not consume a side-effect token")]
    MissingSideEffect { node: NodeId },

    #[error("Node {node} refers to unknown operand {operand}")]
    InvalidOperand { node: NodeId, operand: NodeId },

    #[error("Register budget {budget} exceeds the {available} allocatable registers")]
    BudgetExceedsRegisterFile { budget: usize, available: usize },

    #[error("Interfering nodes {a} and {b} share color {color}")]
    ColoringConflict { a: NodeId, b: NodeId, color: u32 },

    #[error("Unsupported input shape: {reason}")]
    Unsupported { reason: String },
}

/// Result type alias for compile operations.
pub type CompileResult<T> = Result<T, CompileError>;
