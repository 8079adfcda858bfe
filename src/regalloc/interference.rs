//! Interference graph: two values interfere when some live-in set holds both.

use super::liveness::Liveness;
use super::order::NodeOrder;
use crate::ir::{IrGraph, NodeId};
use hashbrown::{HashMap, HashSet};
use log::debug;

/// Undirected adjacency over register-needing nodes.
#[derive(Debug, Clone, Default)]
pub struct InterferenceGraph {
    adjacency: HashMap<NodeId, HashSet<NodeId>>,
}

impl InterferenceGraph {
    /// Every node with an entry, sorted by id.
    pub fn nodes(&self) -> Vec<NodeId> {
        let mut nodes: Vec<NodeId> = self.adjacency.keys().copied().collect();
        nodes.sort_unstable();
        nodes
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.adjacency.contains_key(&node)
    }

    pub fn neighbors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.adjacency.get(&node).into_iter().flatten().copied()
    }

    pub fn degree(&self, node: NodeId) -> usize {
        self.adjacency.get(&node).map_or(0, HashSet::len)
    }

    pub fn interferes(&self, a: NodeId, b: NodeId) -> bool {
        self.adjacency
            .get(&a)
            .is_some_and(|neighbors| neighbors.contains(&b))
    }

    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(HashSet::len).sum::<usize>() / 2
    }

    /// Every edge once, as `(smaller, larger)`, sorted.
    pub fn edges(&self) -> Vec<(NodeId, NodeId)> {
        let mut edges: Vec<(NodeId, NodeId)> = self
            .adjacency
            .iter()
            .flat_map(|(&a, neighbors)| neighbors.iter().map(move |&b| (a, b)))
            .filter(|(a, b)| a < b)
            .collect();
        edges.sort_unstable();
        edges
    }

    pub fn add_node(&mut self, node: NodeId) {
        self.adjacency.entry(node).or_default();
    }

    pub fn add_edge(&mut self, a: NodeId, b: NodeId) {
        if a == b {
            return;
        }
        self.adjacency.entry(a).or_default().insert(b);
        self.adjacency.entry(b).or_default().insert(a);
    }
}

/// Build the interference graph: every live-in set becomes a clique, and
/// every ordered register-needing node gets an entry even without edges.
pub fn build(graph: &IrGraph, order: &NodeOrder, liveness: &Liveness) -> InterferenceGraph {
    let mut interference = InterferenceGraph::default();

    for node in order.iter() {
        if graph.node(node).kind.needs_register() {
            interference.add_node(node);
        }
    }

    for record in liveness.records() {
        let mut members: Vec<NodeId> = record.live_in.iter().copied().collect();
        members.sort_unstable();
        for (i, &a) in members.iter().enumerate() {
            interference.add_node(a);
            for &b in &members[i + 1..] {
                interference.add_edge(a, b);
            }
        }
    }

    debug!(
        "interference for `{}`: {} nodes, {} edges",
        graph.name(),
        interference.node_count(),
        interference.edge_count()
    );
    interference
}
