// This module collects the infrastructure every stage of ssacolor shares: the internal error
// type (a thiserror enum of broken construction and allocation invariants, plus the
// CompileResult alias), the arena-backed CompilationSession that interns variable names for
// the renaming tables, backs the stack frames of compiled functions and counts what the
// pipeline did, and the test utilities unit tests use to own an arena for the length of a
// test.

//! Core infrastructure shared by all pipeline stages.
//!
//! ## Session Management (`session`)
//! - Arena-based memory allocation using `bumpalo`
//! - Name interning for the SSA renaming tables
//! - Compilation statistics
//!
//! ## Errors (`error`)
//! - Internal-error signals raised by construction and allocation

pub mod error;
pub mod session;
pub mod test_utils;

pub use error::{CompileError, CompileResult};
pub use session::{CompilationSession, SessionStats};
