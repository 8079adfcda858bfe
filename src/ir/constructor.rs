// This module implements on-the-fly SSA construction in the style of Braun et al., "Simple and
// Efficient Construction of Static Single Assignment Form". The GraphConstructor owns the
// renaming tables for one function: the reaching definition of every (variable, block) pair,
// the phis created in blocks that were not sealed yet, and a forwarding map for phis that
// collapsed into their single distinct operand. The side-effect token is just another
// variable in the same tables (Variable::SideEffect), so trapping operations and returns are
// chained exactly like user variables. Every value-producing node is passed through the
// LocalOptimizer hook right after it is built; phis only once all their operands are known.
// Control-flow shape (which blocks exist and when they are sealed) is decided by the
// translator in translate.rs; this module only provides the building blocks.

//! SSA graph constructor with block sealing.

use super::graph::IrGraph;
use super::node::{BlockId, BranchKind, JumpKind, NodeId, NodeKind, PhiKind, ProjectionKind};
use super::optimizer::LocalOptimizer;
use crate::core::error::{CompileError, CompileResult};
use crate::core::session::CompilationSession;
use crate::tree::{BinaryOp, UnaryOp};
use hashbrown::HashMap;
use log::trace;
use std::fmt;

/// Key of the renaming tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variable<'arena> {
    Named(&'arena str),
    SideEffect,
}

impl Variable<'_> {
    fn phi_kind(self) -> PhiKind {
        match self {
            Variable::Named(_) => PhiKind::Value,
            Variable::SideEffect => PhiKind::SideEffect,
        }
    }
}

impl fmt::Display for Variable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variable::Named(name) => write!(f, "{}", name),
            Variable::SideEffect => write!(f, "<side effect>"),
        }
    }
}

/// One pending step of a variable lookup.
#[derive(Debug, Clone, Copy)]
enum Lookup {
    /// Find the reaching definition at the end of a block.
    Read(BlockId),
    /// Record the value just found as the definition in a block.
    Bind(BlockId),
    /// Append the value just found (unless `next` is 0) and read the operand
    /// for predecessor `next`. With `bind`, the finished phi's value becomes
    /// the definition in its block.
    Operand { phi: NodeId, next: usize, bind: bool },
}

pub struct GraphConstructor<'s, 'arena, O: LocalOptimizer> {
    session: &'s CompilationSession<'arena>,
    graph: IrGraph,
    optimizer: O,
    current_def: HashMap<(Variable<'arena>, BlockId), NodeId>,
    incomplete_phis: HashMap<BlockId, Vec<(Variable<'arena>, NodeId)>>,
    /// Collapsed phi -> the value that replaced it.
    replaced: HashMap<NodeId, NodeId>,
    current_block: BlockId,
}

impl<'s, 'arena, O: LocalOptimizer> GraphConstructor<'s, 'arena, O> {
    /// Start a new function graph. The start node seeds the side-effect chain.
    pub fn new(session: &'s CompilationSession<'arena>, name: &str, optimizer: O) -> Self {
        let graph = IrGraph::new(name);
        let start_block = graph.start_block();
        let start = graph.start();
        let mut constructor = Self {
            session,
            graph,
            optimizer,
            current_def: HashMap::new(),
            incomplete_phis: HashMap::new(),
            replaced: HashMap::new(),
            current_block: start_block,
        };
        constructor.write_variable(Variable::SideEffect, start_block, start);
        constructor
    }

    pub fn graph(&self) -> &IrGraph {
        &self.graph
    }

    pub fn current_block(&self) -> BlockId {
        self.current_block
    }

    pub fn set_current_block(&mut self, block: BlockId) {
        self.current_block = block;
    }

    pub fn new_block(&mut self, name: &str) -> BlockId {
        let block = self.graph.add_block(name);
        trace!("new block {} ({})", block, name);
        block
    }

    pub fn add_predecessor(&mut self, block: BlockId, control: NodeId) {
        self.graph.add_block_predecessor(block, control);
    }

    pub fn is_sealed(&self, block: BlockId) -> bool {
        self.graph.block(block).is_sealed()
    }

    /// Phis created in `block` that are still waiting for it to be sealed.
    pub fn incomplete_phis(&self, block: BlockId) -> Vec<NodeId> {
        self.incomplete_phis
            .get(&block)
            .map(|pending| pending.iter().map(|&(_, phi)| phi).collect())
            .unwrap_or_default()
    }

    pub fn variable(&self, name: &str) -> Variable<'arena> {
        Variable::Named(self.session.intern_str(name))
    }

    pub fn write_variable(&mut self, variable: Variable<'arena>, block: BlockId, value: NodeId) {
        self.current_def.insert((variable, block), value);
    }

    /// Reaching definition of `variable` at the end of `block`.
    pub fn read_variable(&mut self, variable: Variable<'arena>, block: BlockId) -> CompileResult<NodeId> {
        self.run_lookup(variable, vec![Lookup::Read(block)])
    }

    pub fn write_side_effect(&mut self, block: BlockId, value: NodeId) {
        self.write_variable(Variable::SideEffect, block, value);
    }

    pub fn read_side_effect(&mut self, block: BlockId) -> CompileResult<NodeId> {
        self.read_variable(Variable::SideEffect, block)
    }

    /// Drive a lookup to completion on an explicit stack.
    ///
    /// Each step either produces a value into `last` or pushes the steps it
    /// waits for, so walking back through a long chain of blocks costs heap,
    /// not native stack.
    fn run_lookup(
        &mut self,
        variable: Variable<'arena>,
        mut pending: Vec<Lookup>,
    ) -> CompileResult<NodeId> {
        let mut last = None;
        while let Some(step) = pending.pop() {
            match step {
                Lookup::Read(block) => {
                    if let Some(&value) = self.current_def.get(&(variable, block)) {
                        let resolved = self.resolve(value);
                        if resolved != value {
                            self.write_variable(variable, block, resolved);
                        }
                        last = Some(resolved);
                    } else if !self.is_sealed(block) {
                        let phi = self.new_phi(variable.phi_kind(), block);
                        trace!("incomplete phi {} for {} in {}", phi, variable, block);
                        self.incomplete_phis
                            .entry(block)
                            .or_default()
                            .push((variable, phi));
                        self.write_variable(variable, block, phi);
                        last = Some(phi);
                    } else {
                        match self.graph.block(block).predecessors.len() {
                            0 => {
                                return Err(CompileError::UndefinedVariable {
                                    name: variable.to_string(),
                                    block,
                                })
                            }
                            1 => {
                                pending.push(Lookup::Bind(block));
                                pending.push(Lookup::Read(self.graph.predecessor_block(block, 0)));
                            }
                            _ => {
                                let phi = self.new_phi(variable.phi_kind(), block);
                                self.write_variable(variable, block, phi);
                                pending.push(Lookup::Operand {
                                    phi,
                                    next: 0,
                                    bind: true,
                                });
                            }
                        }
                    }
                }
                Lookup::Bind(block) => {
                    let value = last.ok_or_else(|| CompileError::UndefinedVariable {
                        name: variable.to_string(),
                        block,
                    })?;
                    self.write_variable(variable, block, value);
                }
                Lookup::Operand { phi, next, bind } => {
                    if next > 0 {
                        if let Some(value) = last {
                            self.graph.append_operand(phi, value);
                        }
                    }
                    let block = self.graph.node(phi).block;
                    if next < self.graph.block(block).predecessors.len() {
                        pending.push(Lookup::Operand {
                            phi,
                            next: next + 1,
                            bind,
                        });
                        pending.push(Lookup::Read(self.graph.predecessor_block(block, next)));
                    } else {
                        let value = self.complete_phi(phi);
                        if bind {
                            self.write_variable(variable, block, value);
                        }
                        last = Some(value);
                    }
                }
            }
        }
        let value = last.ok_or_else(|| CompileError::Unsupported {
            reason: format!("lookup of {} produced no value", variable),
        })?;
        Ok(self.resolve(value))
    }

    fn new_phi(&mut self, kind: PhiKind, block: BlockId) -> NodeId {
        let phi = self.graph.add_node(NodeKind::Phi(kind), block, Vec::new());
        self.session.record_node_built();
        self.session.record_phi_created();
        phi
    }

    /// Collapse `phi` if it is trivial, otherwise hand it to the optimizer.
    fn complete_phi(&mut self, phi: NodeId) -> NodeId {
        let value = self.try_remove_trivial_phi(phi);
        if value == phi {
            return self.optimizer.transform(&mut self.graph, phi);
        }
        value
    }

    /// Replace phis whose operands are all themselves or one other value.
    ///
    /// Phis still collecting operands are left alone. After a collapse every
    /// phi that used the removed one is re-examined, since it may have become
    /// trivial in turn. Returns what `phi` now stands for.
    fn try_remove_trivial_phi(&mut self, phi: NodeId) -> NodeId {
        let mut worklist = vec![phi];
        while let Some(candidate) = worklist.pop() {
            let Some(same) = self.trivial_operand(candidate) else {
                continue;
            };

            let users = self.graph.users(candidate);
            self.graph.replace_all_uses(candidate, same);
            self.graph.detach(candidate);
            self.replaced.insert(candidate, same);
            self.session.record_phi_collapsed();
            trace!("trivial phi {} collapsed into {}", candidate, same);

            worklist.extend(
                users
                    .into_iter()
                    .filter(|&user| user != candidate && self.graph.node(user).kind.is_phi()),
            );
        }
        self.resolve(phi)
    }

    /// The single distinct non-self operand of a complete, live phi.
    fn trivial_operand(&self, phi: NodeId) -> Option<NodeId> {
        let node = self.graph.node(phi);
        if !node.is_live() || node.operands.len() != self.graph.block(node.block).predecessors.len()
        {
            return None;
        }

        let mut same = None;
        for &operand in &node.operands {
            if Some(operand) == same || operand == phi {
                continue;
            }
            if same.is_some() {
                return None;
            }
            same = Some(operand);
        }
        // None here means only self references: unreachable, or reached from the entry alone.
        same
    }

    fn resolve(&self, mut value: NodeId) -> NodeId {
        while let Some(&next) = self.replaced.get(&value) {
            value = next;
        }
        value
    }

    /// Declare that `block` will gain no more predecessors and complete its pending phis.
    pub fn seal_block(&mut self, block: BlockId) -> CompileResult<()> {
        if self.is_sealed(block) {
            return Err(CompileError::BlockAlreadySealed { block });
        }

        let pending = self.incomplete_phis.remove(&block).unwrap_or_default();
        trace!("sealing {} ({} pending phis)", block, pending.len());
        for (variable, phi) in pending {
            let step = Lookup::Operand {
                phi,
                next: 0,
                bind: false,
            };
            self.run_lookup(variable, vec![step])?;
        }
        self.graph.mark_sealed(block);
        Ok(())
    }

    fn build(&mut self, kind: NodeKind, operands: Vec<NodeId>) -> NodeId {
        let block = if kind.is_block_independent() {
            self.graph.start_block()
        } else {
            self.current_block
        };
        let node = self.graph.add_node(kind, block, operands);
        self.session.record_node_built();
        trace!("built {} = {} in {}", node, kind, block);
        node
    }

    fn build_value(&mut self, kind: NodeKind, operands: Vec<NodeId>) -> NodeId {
        let node = self.build(kind, operands);
        self.optimizer.transform(&mut self.graph, node)
    }

    pub fn new_const_int(&mut self, value: i64) -> NodeId {
        self.build_value(NodeKind::ConstInt(value), Vec::new())
    }

    pub fn new_const_bool(&mut self, value: bool) -> NodeId {
        self.build_value(NodeKind::ConstBool(value), Vec::new())
    }

    /// Materialise parameter `index` in the start block and bind it to `name`.
    pub fn new_param(&mut self, index: u32, name: &str) -> NodeId {
        let start_block = self.graph.start_block();
        let saved = std::mem::replace(&mut self.current_block, start_block);
        let param = self.build_value(NodeKind::Param(index), Vec::new());
        self.current_block = saved;

        let variable = self.variable(name);
        self.write_variable(variable, start_block, param);
        param
    }

    pub fn new_unary(&mut self, op: UnaryOp, operand: NodeId) -> NodeId {
        self.build_value(NodeKind::Unary(op), vec![operand])
    }

    /// Division and modulo can trap, so they are ordered through the side-effect token.
    pub fn new_binary(&mut self, op: BinaryOp, lhs: NodeId, rhs: NodeId) -> CompileResult<NodeId> {
        match op {
            BinaryOp::Div => self.new_div_mod(NodeKind::Div, lhs, rhs),
            BinaryOp::Mod => self.new_div_mod(NodeKind::Mod, lhs, rhs),
            _ => Ok(self.build_value(NodeKind::Binary(op), vec![lhs, rhs])),
        }
    }

    /// Build a trapping division and thread the side-effect token through it.
    /// Returns the result projection.
    fn new_div_mod(&mut self, kind: NodeKind, lhs: NodeId, rhs: NodeId) -> CompileResult<NodeId> {
        let block = self.current_block;
        let side_effect = self.read_side_effect(block)?;
        let op = self.build_value(kind, vec![side_effect, lhs, rhs]);
        let result = self.build(NodeKind::Projection(ProjectionKind::Result), vec![op]);
        let token = self.build(NodeKind::Projection(ProjectionKind::SideEffect), vec![op]);
        self.write_side_effect(block, token);
        Ok(result)
    }

    /// Return `value`, after every effect that precedes it.
    pub fn new_return(&mut self, value: NodeId) -> CompileResult<NodeId> {
        let side_effect = self.read_side_effect(self.current_block)?;
        let ret = self.build(NodeKind::Return, vec![side_effect, value]);
        let end = self.graph.end_block();
        self.graph.add_block_predecessor(end, ret);
        Ok(ret)
    }

    /// End the current block with a jump into `target`.
    pub fn new_jump(&mut self, kind: JumpKind, target: BlockId) -> NodeId {
        let jump = self.build(NodeKind::Jump(kind), Vec::new());
        self.graph.add_block_predecessor(target, jump);
        jump
    }

    /// End the current block with a conditional branch.
    /// Returns the `IfTrue` and `IfFalse` projections for the caller to wire.
    pub fn new_branch(&mut self, kind: BranchKind, cond: NodeId) -> (NodeId, NodeId) {
        let branch = self.build(NodeKind::Branch(kind), vec![cond]);
        let if_true = self.build(NodeKind::Projection(ProjectionKind::IfTrue), vec![branch]);
        let if_false = self.build(NodeKind::Projection(ProjectionKind::IfFalse), vec![branch]);
        (if_true, if_false)
    }

    /// Merge one value per predecessor of the current (sealed) block.
    pub fn new_merge_phi(&mut self, values: &[NodeId]) -> CompileResult<NodeId> {
        let block = self.current_block;
        let predecessors = self.graph.block(block).predecessors.len();
        if values.len() != predecessors {
            return Err(CompileError::Unsupported {
                reason: format!(
                    "merge of {} values into block {} with {} predecessors",
                    values.len(),
                    block,
                    predecessors
                ),
            });
        }

        let phi = self.new_phi(PhiKind::Value, block);
        for &value in values {
            self.graph.append_operand(phi, value);
        }
        Ok(self.complete_phi(phi))
    }

    /// Seal the end block and hand the graph over.
    pub fn finish(mut self) -> CompileResult<IrGraph> {
        let end = self.graph.end_block();
        if !self.is_sealed(end) {
            self.seal_block(end)?;
        }
        if let Some(block) = self.graph.block_ids().find(|&b| !self.graph.block(b).is_sealed()) {
            return Err(CompileError::UnsealedBlock { block });
        }
        Ok(self.graph)
    }
}
