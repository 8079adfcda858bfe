//! Elimination ordering for greedy coloring.
//!
//! Repeatedly takes the remaining node of smallest weight and bumps the
//! weight of its remaining neighbors. Ties go to the smaller node id so the
//! order is reproducible.

use super::interference::InterferenceGraph;
use crate::ir::NodeId;
use hashbrown::HashMap;
use std::collections::BTreeSet;

pub fn elimination_order(interference: &InterferenceGraph) -> Vec<NodeId> {
    let nodes = interference.nodes();
    let mut weights: HashMap<NodeId, u32> = nodes.iter().map(|&n| (n, 0)).collect();
    let mut queue: BTreeSet<(u32, NodeId)> = nodes.iter().map(|&n| (0, n)).collect();
    let mut order = Vec::with_capacity(nodes.len());

    while let Some((_, node)) = queue.pop_first() {
        weights.remove(&node);
        order.push(node);

        for neighbor in interference.neighbors(node) {
            if let Some(weight) = weights.get_mut(&neighbor) {
                queue.remove(&(*weight, neighbor));
                *weight += 1;
                queue.insert((*weight, neighbor));
            }
        }
    }
    order
}
