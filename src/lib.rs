//! ssacolor - SSA construction and graph-coloring register allocation.
//!
//! ssacolor is the middle and back end of a compiler for a small C-like
//! language. It takes a type-checked syntax tree, builds a graph-based SSA IR
//! on the fly (Braun-style renaming with block sealing, plus a side-effect
//! token that keeps trapping operations in order), and allocates registers by
//! coloring the interference graph along an elimination ordering. The result
//! is a location per value, a stack frame size and the phi resolution moves
//! an x86-64 emitter needs.
//!
//! # Primary Usage
//!
//! ```ignore
//! use ssacolor::core::CompilationSession;
//! use ssacolor::pipeline::{compile_function, PipelineConfig};
//! use ssacolor::tree::samples;
//! use bumpalo::Bump;
//!
//! let arena = Bump::new();
//! let session = CompilationSession::new(&arena);
//!
//! let compiled = compile_function(&samples::counting_loop(), &PipelineConfig::default(), &session)?;
//! println!("frame size: {}", compiled.frame_size());
//! ```
//!
//! # Architecture
//!
//! - [`tree`] - Typed syntax tree handed over by the front end
//! - [`ir`] - Node/block graph, SSA constructor, optimizer hook, verifier
//! - [`regalloc`] - Order, liveness, interference, elimination order, coloring, spills
//! - [`x64`] - Register table, stack frame and phi moves for the emitter
//! - [`pipeline`] - Runs all stages for one function
//! - [`core`] - Session, errors and test utilities

pub mod core;
pub mod ir;
pub mod pipeline;
pub mod regalloc;
pub mod tree;
pub mod x64;

pub use crate::core::{CompilationSession, CompileError, CompileResult, SessionStats};
pub use ir::{IrGraph, NodeId, NodeKind};
pub use pipeline::{compile_function, compile_functions, CompiledFunction, PipelineConfig};
pub use regalloc::SpillPolicy;
pub use x64::Location;
