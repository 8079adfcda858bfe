// This module provides arena-based compilation session management using the bumpalo crate.
// CompilationSession owns (a borrow of) the arena for one compilation run and everything that
// outlives a single function: interned variable and block names handed out as &'arena str so
// the SSA renaming tables can key on cheap copyable names, the arena backing each function's
// stack frame slot list, and compilation statistics. The session is single-threaded: every
// function pipeline borrows it immutably and records progress through interior mutability.
// SessionStats tracks functions compiled, nodes built, phis created and collapsed by the
// trivial-phi rule, colors used and colors spilled to the stack.

//! Arena-based compilation session management.
//!
//! All per-run objects that must outlive one function (interned names, stack
//! frame slot lists) are allocated in the session arena.

use bumpalo::Bump;
use hashbrown::HashMap;
use std::cell::RefCell;
use std::fmt;

/// Arena-based compilation session.
pub struct CompilationSession<'arena> {
    /// Arena allocator for compilation objects.
    arena: &'arena Bump,

    /// Session statistics for debugging and tuning.
    stats: RefCell<SessionStats>,

    /// String interning for renaming-table keys and block names.
    interned_strings: RefCell<HashMap<String, &'arena str>>,

    /// Current function being compiled.
    current_function: RefCell<Option<String>>,
}

impl<'arena> CompilationSession<'arena> {
    /// Create a new compilation session with the given arena.
    pub fn new(arena: &'arena Bump) -> Self {
        Self {
            arena,
            stats: RefCell::new(SessionStats::default()),
            interned_strings: RefCell::new(HashMap::new()),
            current_function: RefCell::new(None),
        }
    }

    /// Get access to the arena allocator.
    pub fn arena(&self) -> &'arena Bump {
        self.arena
    }

    /// Intern a string in the arena.
    pub fn intern_str(&self, s: &str) -> &'arena str {
        let mut strings = self.interned_strings.borrow_mut();
        if let Some(&interned) = strings.get(s) {
            return interned;
        }

        let interned: &'arena str = self.arena.alloc_str(s);
        strings.insert(s.to_string(), interned);
        interned
    }

    /// Set current function being compiled.
    pub fn set_current_function(&self, name: &str) {
        *self.current_function.borrow_mut() = Some(name.to_string());
    }

    /// Name of the function currently being compiled, if any.
    pub fn current_function(&self) -> Option<String> {
        self.current_function.borrow().clone()
    }

    /// Forget the per-function state once a function is done.
    pub fn clear_function_state(&self) {
        *self.current_function.borrow_mut() = None;
    }

    /// Record that a function went through the whole pipeline.
    pub fn record_function_compiled(&self, name: &str, node_count: usize) {
        let mut stats = self.stats.borrow_mut();
        stats.functions_compiled += 1;

        if stats.largest_function_nodes < node_count {
            stats.largest_function_nodes = node_count;
            stats.largest_function_name = name.to_string();
        }
    }

    pub fn record_node_built(&self) {
        self.stats.borrow_mut().nodes_built += 1;
    }

    pub fn record_phi_created(&self) {
        self.stats.borrow_mut().phis_created += 1;
    }

    pub fn record_phi_collapsed(&self) {
        self.stats.borrow_mut().phis_collapsed += 1;
    }

    /// Record the outcome of coloring and spill selection for one function.
    pub fn record_allocation(&self, colors: usize, spilled: usize) {
        let mut stats = self.stats.borrow_mut();
        stats.colors_used += colors;
        stats.colors_spilled += spilled;
    }

    /// Get compilation statistics.
    pub fn stats(&self) -> SessionStats {
        self.stats.borrow().clone()
    }
}

/// Compilation session statistics.
#[derive(Debug, Default, Clone)]
pub struct SessionStats {
    /// Number of functions compiled.
    pub functions_compiled: usize,

    /// Nodes created by graph construction (including ones later deduplicated).
    pub nodes_built: usize,

    /// Phis created by the renaming protocol.
    pub phis_created: usize,

    /// Phis replaced by their single distinct operand.
    pub phis_collapsed: usize,

    /// Sum of distinct colors over all functions.
    pub colors_used: usize,

    /// Sum of colors placed on the stack over all functions.
    pub colors_spilled: usize,

    /// Largest function compiled, in nodes.
    pub largest_function_nodes: usize,

    /// Name of largest function.
    pub largest_function_name: String,
}

impl fmt::Display for SessionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Compilation Session Statistics:")?;
        writeln!(f, "  Functions compiled: {}", self.functions_compiled)?;
        writeln!(f, "  Nodes built: {}", self.nodes_built)?;
        writeln!(
            f,
            "  Phis created: {} ({} collapsed)",
            self.phis_created, self.phis_collapsed
        )?;
        writeln!(f, "  Colors used: {}", self.colors_used)?;
        writeln!(f, "  Colors spilled: {}", self.colors_spilled)?;

        if !self.largest_function_name.is_empty() {
            writeln!(
                f,
                "  Largest function: {} ({} nodes)",
                self.largest_function_name, self.largest_function_nodes
            )?;
        }

        Ok(())
    }
}
