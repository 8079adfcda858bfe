// This module computes which register-needing values are live immediately before each node.
// It runs in two steps. First a backward dataflow over blocks iterates to a fixed point: a
// block's live-out set is the union over its successors of their live-in set without their
// phis, plus the phi operands that flow in along the edge from this block; its live-in set is
// the live-out set pushed backward through the block's nodes. Iterating until nothing changes
// makes loop-carried values live across every back edge, no matter how loops nest. Second,
// each block is scanned backward once more from its final live-out set to record the live-in
// set of every node. A node removes itself from the running set and, unless it is a phi, adds
// every register-needing operand it consumes. Phis take their operands from the end of the
// matching predecessor instead.

//! Liveness analysis over the node order.

use super::order::NodeOrder;
use crate::ir::{BlockId, IrGraph, NodeId};
use hashbrown::{HashMap, HashSet};
use log::debug;

/// Values live immediately before `node` executes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LivelinessInformation {
    pub node: NodeId,
    pub live_in: HashSet<NodeId>,
}

/// Result of the analysis: one record per ordered node plus per-block sets.
#[derive(Debug, Clone, Default)]
pub struct Liveness {
    records: Vec<LivelinessInformation>,
    /// Position of each node's record.
    positions: HashMap<NodeId, usize>,
    block_live_in: HashMap<BlockId, HashSet<NodeId>>,
    block_live_out: HashMap<BlockId, HashSet<NodeId>>,
    ever_live: HashSet<NodeId>,
}

impl Liveness {
    /// Records in node order.
    pub fn records(&self) -> &[LivelinessInformation] {
        &self.records
    }

    pub fn live_in(&self, node: NodeId) -> Option<&HashSet<NodeId>> {
        self.positions
            .get(&node)
            .map(|&position| &self.records[position].live_in)
    }

    pub fn block_live_in(&self, block: BlockId) -> Option<&HashSet<NodeId>> {
        self.block_live_in.get(&block)
    }

    pub fn block_live_out(&self, block: BlockId) -> Option<&HashSet<NodeId>> {
        self.block_live_out.get(&block)
    }

    /// Whether `node` appears in any live-in set.
    pub fn is_ever_live(&self, node: NodeId) -> bool {
        self.ever_live.contains(&node)
    }

    /// Largest live-in set, a lower bound on the colors needed.
    pub fn max_pressure(&self) -> usize {
        self.records
            .iter()
            .map(|record| record.live_in.len())
            .max()
            .unwrap_or(0)
    }
}

/// Register-needing operands `node` reads where it executes.
fn uses(graph: &IrGraph, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
    let n = graph.node(node);
    let consumes = !n.kind.is_phi();
    n.operands
        .iter()
        .copied()
        .filter(move |&operand| consumes && graph.node(operand).kind.needs_register())
}

/// Phi operands that flow from `block` into `successor`.
fn phi_inputs(graph: &IrGraph, block: BlockId, successor: BlockId) -> Vec<NodeId> {
    let edges: Vec<usize> = graph
        .predecessor_blocks(successor)
        .iter()
        .enumerate()
        .filter(|(_, &pred)| pred == block)
        .map(|(index, _)| index)
        .collect();

    let mut inputs = Vec::new();
    for phi in graph.phis(successor) {
        let node = graph.node(phi);
        if !node.kind.needs_register() {
            continue;
        }
        for &index in &edges {
            if let Some(&operand) = node.operands.get(index) {
                if graph.node(operand).kind.needs_register() {
                    inputs.push(operand);
                }
            }
        }
    }
    inputs
}

/// Walk `nodes` backward from `live`, calling `record` with each node's live-in set.
fn transfer(
    graph: &IrGraph,
    nodes: &[NodeId],
    live: &mut HashSet<NodeId>,
    mut record: impl FnMut(NodeId, &HashSet<NodeId>),
) {
    for &node in nodes.iter().rev() {
        live.remove(&node);
        live.extend(uses(graph, node));
        record(node, live);
    }
}

pub fn analyze(graph: &IrGraph, order: &NodeOrder) -> Liveness {
    let blocks = order.blocks();
    let mut live_in: HashMap<BlockId, HashSet<NodeId>> =
        blocks.iter().map(|&b| (b, HashSet::new())).collect();
    let mut live_out: HashMap<BlockId, HashSet<NodeId>> = live_in.clone();

    let mut rounds = 0;
    let mut changed = true;
    while changed {
        changed = false;
        rounds += 1;
        for &block in blocks.iter().rev() {
            let mut out = HashSet::new();
            for &succ in graph.successor_blocks(block) {
                if let Some(succ_in) = live_in.get(&succ) {
                    out.extend(succ_in.iter().copied());
                }
                out.extend(phi_inputs(graph, block, succ));
            }

            let mut inside = out.clone();
            transfer(graph, order.block_nodes(block), &mut inside, |_, _| {});

            if live_out.get(&block) != Some(&out) {
                live_out.insert(block, out);
                changed = true;
            }
            if live_in.get(&block) != Some(&inside) {
                live_in.insert(block, inside);
                changed = true;
            }
        }
    }

    let mut records = Vec::with_capacity(order.len());
    let mut ever_live = HashSet::new();
    for &block in blocks {
        let mut live = live_out.get(&block).cloned().unwrap_or_default();
        let mut block_records = Vec::new();
        transfer(graph, order.block_nodes(block), &mut live, |node, live| {
            ever_live.extend(live.iter().copied());
            block_records.push(LivelinessInformation {
                node,
                live_in: live.clone(),
            });
        });
        block_records.reverse();
        records.extend(block_records);
    }

    debug!(
        "liveness for `{}`: {} records after {} rounds",
        graph.name(),
        records.len(),
        rounds
    );

    let positions = records
        .iter()
        .enumerate()
        .map(|(position, record)| (record.node, position))
        .collect();

    Liveness {
        records,
        positions,
        block_live_in: live_in,
        block_live_out: live_out,
        ever_live,
    }
}
