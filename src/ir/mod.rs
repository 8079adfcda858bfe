//! Graph-based SSA intermediate representation.
//!
//! - [`node`]: ids and the closed set of node kinds
//! - [`graph`]: the arena holding nodes and blocks
//! - [`constructor`]: SSA renaming with block sealing
//! - [`translate`]: syntax tree to graph
//! - [`optimizer`]: the per-node transform hook
//! - [`verify`] and [`print`]: checking and dumping a finished graph

pub mod constructor;
pub mod graph;
pub mod node;
pub mod optimizer;
pub mod print;
pub mod translate;
pub mod verify;

pub use constructor::{GraphConstructor, Variable};
pub use graph::{Block, IrGraph, Node};
pub use node::{BlockId, BranchKind, JumpKind, NodeId, NodeKind, PhiKind, ProjectionKind};
pub use optimizer::{LocalOptimizer, NoOptimizer, ValueNumbering};
pub use translate::build_graph;
pub use verify::verify;
