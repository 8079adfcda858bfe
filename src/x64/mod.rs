//! x86-64 hand-off to the emitter.
//!
//! This module contains the target specific end of the pipeline:
//! - The register table and materialization of placements ([`registers`])
//! - The spill-slot stack frame ([`frame`])
//! - Phi resolution moves per control edge ([`phi_moves`])

pub mod frame;
pub mod phi_moves;
pub mod registers;

pub use frame::StackFrame;
pub use phi_moves::{resolve_phi_moves, sequentialize, EdgeMoves, Move};
pub use registers::{materialize, Location, RegisterMap, ALLOCATABLE, WORD_SIZE};
