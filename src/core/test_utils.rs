//! Test utilities for arena-based testing.
//!
//! Unit tests build graphs and run the pipeline through a [`TestContext`]
//! that owns the arena, so sessions and register maps borrow from something
//! that lives for the whole test.

#[cfg(test)]
pub mod test {
    use super::super::error::CompileResult;
    use super::super::session::CompilationSession;
    use crate::ir::{build_graph, BlockId, IrGraph, NoOptimizer, NodeId, NodeKind};
    use crate::pipeline::{compile_function, CompiledFunction, PipelineConfig};
    use crate::tree::Function;
    use bumpalo::Bump;

    /// Test context that manages arena lifetime for tests.
    pub struct TestContext {
        arena: Bump,
    }

    impl TestContext {
        pub fn new() -> Self {
            Self { arena: Bump::new() }
        }

        pub fn arena(&self) -> &Bump {
            &self.arena
        }

        /// Create a compilation session using this context's arena.
        pub fn create_session(&self) -> CompilationSession<'_> {
            CompilationSession::new(&self.arena)
        }

        /// Build the graph of `function` without value numbering.
        pub fn build(&self, function: &Function) -> IrGraph {
            let session = self.create_session();
            match build_graph(&session, function, NoOptimizer) {
                Ok(graph) => graph,
                Err(err) => panic!("building `{}` failed: {}", function.name, err),
            }
        }

        /// Run the whole pipeline on `function` with `config`.
        pub fn compile(
            &self,
            function: &Function,
            config: &PipelineConfig,
        ) -> CompileResult<CompiledFunction<'_>> {
            let session = self.create_session();
            compile_function(function, config, &session)
        }
    }

    impl Default for TestContext {
        fn default() -> Self {
            Self::new()
        }
    }

    /// Run a test with a temporary arena context.
    pub fn with_test_context<F, R>(f: F) -> R
    where
        F: FnOnce(&TestContext) -> R,
    {
        let ctx = TestContext::new();
        f(&ctx)
    }

    /// The block called `name`. Panics if there is none.
    pub fn block_named(graph: &IrGraph, name: &str) -> BlockId {
        graph
            .block_ids()
            .find(|&b| graph.block(b).name == name)
            .unwrap_or_else(|| panic!("no block named {}", name))
    }

    /// Live nodes of `kind`, in id order.
    pub fn nodes_of_kind(graph: &IrGraph, kind: NodeKind) -> Vec<NodeId> {
        graph
            .live_nodes()
            .filter(|&n| graph.node(n).kind == kind)
            .collect()
    }
}
