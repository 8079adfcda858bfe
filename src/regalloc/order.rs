// This module linearizes a finished graph for the analyses that follow. Blocks are laid out in
// reverse post-order starting at the start block, computed with the usual iterative DFS over a
// (block, processed) stack so deep nesting cannot overflow the call stack; blocks that no path
// from the start reaches (the join after an if whose branches both return, a loop step nothing
// continues to) are left out. Inside a block the order is: phis first, since they conceptually
// execute on block entry; then every pure or trapping node after all of its same-block operands,
// visiting roots in construction order; and finally the control node ending the block, followed
// by the IfTrue/IfFalse projections of a branch.

//! Node order generation.

use crate::ir::{BlockId, IrGraph, NodeId, NodeKind, ProjectionKind};
use hashbrown::{HashMap, HashSet};

/// Execution order of a graph's reachable blocks and nodes.
#[derive(Debug, Clone, Default)]
pub struct NodeOrder {
    blocks: Vec<BlockId>,
    nodes: HashMap<BlockId, Vec<NodeId>>,
}

impl NodeOrder {
    /// Reachable blocks in reverse post-order.
    pub fn blocks(&self) -> &[BlockId] {
        &self.blocks
    }

    /// Nodes of `block` in execution order. Empty for unreachable blocks.
    pub fn block_nodes(&self, block: BlockId) -> &[NodeId] {
        self.nodes.get(&block).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_reachable(&self, block: BlockId) -> bool {
        self.nodes.contains_key(&block)
    }

    /// Every ordered node, block after block.
    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.blocks
            .iter()
            .flat_map(move |&block| self.block_nodes(block).iter().copied())
    }

    pub fn len(&self) -> usize {
        self.nodes.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Compute the order of `graph`.
pub fn generate(graph: &IrGraph) -> NodeOrder {
    let blocks = reverse_post_order(graph);
    let nodes = blocks
        .iter()
        .map(|&block| (block, order_block(graph, block)))
        .collect();
    NodeOrder { blocks, nodes }
}

fn reverse_post_order(graph: &IrGraph) -> Vec<BlockId> {
    let mut post = Vec::new();
    let mut stack = vec![(graph.start_block(), false)];
    let mut visited = HashSet::new();
    while let Some((block, processed)) = stack.pop() {
        if processed {
            post.push(block);
            continue;
        }
        if !visited.insert(block) {
            continue;
        }
        stack.push((block, true));
        // Reversed so the first successor is visited first.
        for &succ in graph.successor_blocks(block).iter().rev() {
            if !visited.contains(&succ) {
                stack.push((succ, false));
            }
        }
    }
    post.reverse();
    post
}

fn is_branch_projection(kind: NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::Projection(ProjectionKind::IfTrue | ProjectionKind::IfFalse)
    )
}

fn order_block(graph: &IrGraph, block: BlockId) -> Vec<NodeId> {
    let schedule = &graph.block(block).schedule;
    let mut order = graph.phis(block);
    let mut placed: HashSet<NodeId> = order.iter().copied().collect();

    let in_body = |node: NodeId| {
        let n = graph.node(node);
        n.block == block && !n.kind.is_phi() && !n.kind.is_control() && !is_branch_projection(n.kind)
    };

    for &root in schedule {
        if !in_body(root) {
            continue;
        }
        let mut stack = vec![(root, false)];
        while let Some((node, processed)) = stack.pop() {
            if processed {
                order.push(node);
                continue;
            }
            if !placed.insert(node) {
                continue;
            }
            stack.push((node, true));
            for &operand in graph.node(node).operands.iter().rev() {
                if in_body(operand) && !placed.contains(&operand) {
                    stack.push((operand, false));
                }
            }
        }
    }

    if let Some(terminator) = graph.terminator(block) {
        order.push(terminator);
    }
    order.extend(
        schedule
            .iter()
            .copied()
            .filter(|&n| is_branch_projection(graph.node(n).kind)),
    );
    order
}
