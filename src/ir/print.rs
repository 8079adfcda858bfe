//! Textual dump of a graph, one block per paragraph.
//!
//! ```text
//! b2 while.header <- [b0, b3] sealed
//!   n9 = phi [n4, n12]
//!   n10 = binary < [n9, n5]
//!   n11 = branch While [n10]
//! ```

use super::graph::IrGraph;
use std::fmt;

/// Renders a graph through `Display`.
pub struct GraphDump<'g>(pub &'g IrGraph);

pub fn dump(graph: &IrGraph) -> String {
    GraphDump(graph).to_string()
}

impl fmt::Display for GraphDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let graph = self.0;
        writeln!(f, "graph {}", graph.name())?;
        for block_id in graph.block_ids() {
            let block = graph.block(block_id);
            let predecessors: Vec<String> = graph
                .predecessor_blocks(block_id)
                .iter()
                .map(ToString::to_string)
                .collect();
            writeln!(
                f,
                "{} {} <- [{}]{}",
                block_id,
                block.name,
                predecessors.join(", "),
                if block.is_sealed() { " sealed" } else { "" }
            )?;

            for &id in &block.schedule {
                let node = graph.node(id);
                let operands: Vec<String> = node.operands.iter().map(ToString::to_string).collect();
                if operands.is_empty() {
                    writeln!(f, "  {} = {}", id, node.kind)?;
                } else {
                    writeln!(f, "  {} = {} [{}]", id, node.kind, operands.join(", "))?;
                }
            }
        }
        Ok(())
    }
}
