//! Arena-backed node/block graph of one function.
//!
//! Nodes and blocks live in two vectors and refer to each other by index, so
//! the cycles SSA construction creates (a loop phi using itself, a back edge
//! entering its own header) are plain index values. Operand edges are stored
//! on the user, and every node keeps the list of its users, updated as edges
//! are added and redirected. Block-level edges (which blocks a block flows
//! into) are derived on demand and cached until the next control edge.

use super::node::{BlockId, NodeId, NodeKind};
use hashbrown::HashMap;
use std::cell::OnceCell;

/// One operation or control point.
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    /// Block the node is scheduled in.
    pub block: BlockId,
    /// Ordered operand edges. Only phis grow after construction.
    pub operands: Vec<NodeId>,
    /// Cleared when the node is replaced by another one.
    live: bool,
}

impl Node {
    pub fn is_live(&self) -> bool {
        self.live
    }
}

/// Control-flow container.
#[derive(Debug, Clone)]
pub struct Block {
    pub name: String,
    /// Control nodes (jumps, branch projections, returns) entering this block,
    /// in the order they were wired.
    pub predecessors: Vec<NodeId>,
    /// Live nodes owned by the block, in construction order.
    pub schedule: Vec<NodeId>,
    sealed: bool,
}

impl Block {
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }
}

/// Block-level reverse edges, rebuilt lazily.
#[derive(Debug, Default)]
struct BlockEdges {
    successors: HashMap<BlockId, Vec<BlockId>>,
    entered: HashMap<NodeId, BlockId>,
}

/// The graph of one function: a start block holding the `Start` node and the
/// block-independent constants, an end block collecting every `Return`, and
/// everything built in between.
#[derive(Debug)]
pub struct IrGraph {
    name: String,
    nodes: Vec<Node>,
    /// One entry per operand edge into the node, so a user appears once per use.
    users: Vec<Vec<NodeId>>,
    blocks: Vec<Block>,
    start_block: BlockId,
    end_block: BlockId,
    start: NodeId,
    edges: OnceCell<BlockEdges>,
}

impl IrGraph {
    /// Create a graph with its start block (already sealed) and end block.
    pub fn new(name: &str) -> Self {
        let mut graph = Self {
            name: name.to_string(),
            nodes: Vec::new(),
            users: Vec::new(),
            blocks: Vec::new(),
            start_block: BlockId::new(0),
            end_block: BlockId::new(0),
            start: NodeId::new(0),
            edges: OnceCell::new(),
        };
        graph.start_block = graph.add_block("start");
        graph.blocks[graph.start_block.index()].sealed = true;
        graph.start = graph.add_node(NodeKind::Start, graph.start_block, Vec::new());
        graph.end_block = graph.add_block("end");
        graph
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start(&self) -> NodeId {
        self.start
    }

    pub fn start_block(&self) -> BlockId {
        self.start_block
    }

    pub fn end_block(&self) -> BlockId {
        self.end_block
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.index()]
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    /// Number of nodes ever created, dead ones included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn block_ids(&self) -> impl Iterator<Item = BlockId> + '_ {
        (0..self.blocks.len()).map(BlockId::new)
    }

    /// Ids of every node that is still scheduled somewhere.
    pub fn live_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.live)
            .map(|(index, _)| NodeId::new(index))
    }

    pub fn live_node_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.live).count()
    }

    pub fn add_block(&mut self, name: &str) -> BlockId {
        let id = BlockId::new(self.blocks.len());
        self.blocks.push(Block {
            name: name.to_string(),
            predecessors: Vec::new(),
            schedule: Vec::new(),
            sealed: false,
        });
        self.invalidate();
        id
    }

    /// Append a node to `block`'s schedule.
    pub fn add_node(&mut self, kind: NodeKind, block: BlockId, operands: Vec<NodeId>) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        for &operand in &operands {
            self.users[operand.index()].push(id);
        }
        self.nodes.push(Node {
            kind,
            block,
            operands,
            live: true,
        });
        self.users.push(Vec::new());
        self.blocks[block.index()].schedule.push(id);
        id
    }

    /// Wire `control` as the next control predecessor of `block`.
    pub fn add_block_predecessor(&mut self, block: BlockId, control: NodeId) {
        self.blocks[block.index()].predecessors.push(control);
        self.invalidate();
    }

    pub fn append_operand(&mut self, node: NodeId, operand: NodeId) {
        self.nodes[node.index()].operands.push(operand);
        self.users[operand.index()].push(node);
    }

    pub(crate) fn mark_sealed(&mut self, block: BlockId) {
        self.blocks[block.index()].sealed = true;
    }

    /// Redirect every operand edge pointing at `old` to `new`.
    ///
    /// Only the users of `old` are visited.
    pub fn replace_all_uses(&mut self, old: NodeId, new: NodeId) {
        if old == new {
            return;
        }
        let mut users = std::mem::take(&mut self.users[old.index()]);
        users.sort_unstable();
        users.dedup();
        for user in users {
            for operand in &mut self.nodes[user.index()].operands {
                if *operand == old {
                    *operand = new;
                    self.users[new.index()].push(user);
                }
            }
        }
    }

    /// Remove a node from its block. The slot stays allocated so ids remain stable.
    pub fn detach(&mut self, id: NodeId) {
        let node = &mut self.nodes[id.index()];
        if !node.live {
            return;
        }
        node.live = false;
        let block = node.block;
        for &operand in &node.operands {
            let users = &mut self.users[operand.index()];
            if let Some(position) = users.iter().position(|&user| user == id) {
                users.swap_remove(position);
            }
        }
        self.blocks[block.index()].schedule.retain(|&n| n != id);
    }

    /// Live nodes that use `id` as an operand, in id order, without duplicates.
    pub fn users(&self, id: NodeId) -> Vec<NodeId> {
        let mut users = self.users[id.index()].clone();
        users.sort_unstable();
        users.dedup();
        users
    }

    /// Block owning the `index`-th control predecessor of `block`.
    pub fn predecessor_block(&self, block: BlockId, index: usize) -> BlockId {
        let control = self.blocks[block.index()].predecessors[index];
        self.nodes[control.index()].block
    }

    /// Block owning each control predecessor, in predecessor order.
    pub fn predecessor_blocks(&self, block: BlockId) -> Vec<BlockId> {
        self.blocks[block.index()]
            .predecessors
            .iter()
            .map(|&control| self.nodes[control.index()].block)
            .collect()
    }

    /// Blocks this block's control nodes flow into.
    pub fn successor_blocks(&self, block: BlockId) -> &[BlockId] {
        self.block_edges()
            .successors
            .get(&block)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Block a control node enters, if it was wired as a predecessor.
    pub fn entered_block(&self, control: NodeId) -> Option<BlockId> {
        self.block_edges().entered.get(&control).copied()
    }

    /// Live phis of `block`, in schedule order.
    pub fn phis(&self, block: BlockId) -> Vec<NodeId> {
        self.blocks[block.index()]
            .schedule
            .iter()
            .copied()
            .filter(|&n| self.nodes[n.index()].kind.is_phi())
            .collect()
    }

    /// The `Branch`, `Jump` or `Return` ending `block`.
    pub fn terminator(&self, block: BlockId) -> Option<NodeId> {
        self.blocks[block.index()]
            .schedule
            .iter()
            .copied()
            .find(|&n| self.nodes[n.index()].kind.is_control())
    }

    fn invalidate(&mut self) {
        self.edges.take();
    }

    fn block_edges(&self) -> &BlockEdges {
        self.edges.get_or_init(|| {
            let mut index = BlockEdges::default();
            for (i, block) in self.blocks.iter().enumerate() {
                let id = BlockId::new(i);
                for &control in &block.predecessors {
                    index.entered.insert(control, id);
                    let from = self.nodes[control.index()].block;
                    let successors = index.successors.entry(from).or_default();
                    if !successors.contains(&id) {
                        successors.push(id);
                    }
                }
            }
            index
        })
    }
}
