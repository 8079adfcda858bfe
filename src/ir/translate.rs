//! Tree to graph translation.
//!
//! Walks a [`Function`] and drives the [`GraphConstructor`]. Joins are always
//! entered through `Jump` nodes, and each block is sealed as soon as its last
//! predecessor has been wired:
//!
//! ```text
//! if:     cond --IfTrue--> then --jump--> join
//!              --IfFalse-> else --jump--> join
//!
//! while:  pre --jump--> header --IfTrue--> body --back edge--> header
//!                              --IfFalse-> exit --jump--> after
//!         (break jumps to after, continue to header)
//!
//! for:    like while; body --jump--> step --back edge--> header,
//!         continue jumps to step
//! ```

use super::constructor::GraphConstructor;
use super::graph::IrGraph;
use super::node::{BlockId, BranchKind, JumpKind, NodeId};
use super::optimizer::LocalOptimizer;
use crate::core::error::{CompileError, CompileResult};
use crate::core::session::CompilationSession;
use crate::tree::{Expr, ExprKind, Function, Stmt};
use log::debug;

#[derive(Debug, Clone, Copy)]
struct LoopTargets {
    continue_target: BlockId,
    break_target: BlockId,
}

struct Translator<'s, 'arena, O: LocalOptimizer> {
    constructor: GraphConstructor<'s, 'arena, O>,
    loops: Vec<LoopTargets>,
    /// False after `return`, `break` or `continue` until control joins again.
    reachable: bool,
}

/// Build the SSA graph of `function`.
pub fn build_graph<O: LocalOptimizer>(
    session: &CompilationSession<'_>,
    function: &Function,
    optimizer: O,
) -> CompileResult<IrGraph> {
    let mut translator = Translator {
        constructor: GraphConstructor::new(session, &function.name, optimizer),
        loops: Vec::new(),
        reachable: true,
    };

    for (index, param) in function.params.iter().enumerate() {
        translator.constructor.new_param(index as u32, &param.name);
    }
    translator.statements(&function.body)?;

    if translator.reachable {
        return Err(CompileError::Unsupported {
            reason: format!("control reaches the end of `{}` without a return", function.name),
        });
    }

    let graph = translator.constructor.finish()?;
    debug!(
        "built graph for `{}`: {} blocks, {} live nodes",
        graph.name(),
        graph.block_count(),
        graph.live_node_count()
    );
    Ok(graph)
}

impl<O: LocalOptimizer> Translator<'_, '_, O> {
    fn statements(&mut self, statements: &[Stmt]) -> CompileResult<()> {
        for statement in statements {
            if !self.reachable {
                break;
            }
            self.statement(statement)?;
        }
        Ok(())
    }

    fn statement(&mut self, statement: &Stmt) -> CompileResult<()> {
        match statement {
            Stmt::Declare { name, init, .. } => {
                if let Some(init) = init {
                    let value = self.expr(init)?;
                    self.write(name, value);
                }
            }
            Stmt::Assign { name, op, value } => {
                let value = match op {
                    Some(op) => {
                        let current = self.read(name)?;
                        let rhs = self.expr(value)?;
                        self.constructor.new_binary(*op, current, rhs)?
                    }
                    None => self.expr(value)?,
                };
                self.write(name, value);
            }
            Stmt::Expr(expr) => {
                self.expr(expr)?;
            }
            Stmt::Block(statements) => self.statements(statements)?,
            Stmt::If {
                cond,
                then,
                otherwise,
            } => self.if_statement(cond, then, otherwise.as_deref())?,
            Stmt::While { cond, body } => self.loop_statement(BranchKind::While, Some(cond), None, body)?,
            Stmt::For {
                init,
                cond,
                step,
                body,
            } => {
                if let Some(init) = init {
                    self.statement(init)?;
                }
                self.loop_statement(BranchKind::For, cond.as_ref(), Some(step.as_deref()), body)?;
            }
            Stmt::Break => {
                let target = self.innermost_loop("break")?.break_target;
                self.constructor.new_jump(JumpKind::Break, target);
                self.reachable = false;
            }
            Stmt::Continue => {
                let target = self.innermost_loop("continue")?.continue_target;
                self.constructor.new_jump(JumpKind::Continue, target);
                self.reachable = false;
            }
            Stmt::Return(value) => {
                let value = self.expr(value)?;
                self.constructor.new_return(value)?;
                self.reachable = false;
            }
        }
        Ok(())
    }

    fn innermost_loop(&self, what: &str) -> CompileResult<LoopTargets> {
        self.loops
            .last()
            .copied()
            .ok_or_else(|| CompileError::Unsupported {
                reason: format!("`{}` outside of a loop", what),
            })
    }

    fn read(&mut self, name: &str) -> CompileResult<NodeId> {
        let variable = self.constructor.variable(name);
        let block = self.constructor.current_block();
        self.constructor.read_variable(variable, block)
    }

    fn write(&mut self, name: &str, value: NodeId) {
        let variable = self.constructor.variable(name);
        let block = self.constructor.current_block();
        self.constructor.write_variable(variable, block, value);
    }

    /// Blocks entered by the two projections of a branch, both sealed.
    fn split(&mut self, kind: BranchKind, cond: NodeId, names: (&str, &str)) -> CompileResult<(BlockId, BlockId)> {
        let (if_true, if_false) = self.constructor.new_branch(kind, cond);
        let taken = self.constructor.new_block(names.0);
        self.constructor.add_predecessor(taken, if_true);
        self.constructor.seal_block(taken)?;
        let not_taken = self.constructor.new_block(names.1);
        self.constructor.add_predecessor(not_taken, if_false);
        self.constructor.seal_block(not_taken)?;
        Ok((taken, not_taken))
    }

    fn if_statement(&mut self, cond: &Expr, then: &[Stmt], otherwise: Option<&[Stmt]>) -> CompileResult<()> {
        let cond = self.expr(cond)?;
        let (then_block, else_block) = self.split(BranchKind::If, cond, ("if.then", "if.else"))?;
        let join = self.constructor.new_block("if.join");

        self.constructor.set_current_block(then_block);
        self.reachable = true;
        self.statements(then)?;
        let then_reaches = self.fall_through(join);

        self.constructor.set_current_block(else_block);
        self.reachable = true;
        if let Some(otherwise) = otherwise {
            self.statements(otherwise)?;
        }
        let else_reaches = self.fall_through(join);

        self.constructor.seal_block(join)?;
        self.constructor.set_current_block(join);
        self.reachable = then_reaches || else_reaches;
        Ok(())
    }

    /// Jump to `target` if the current block is still reachable.
    fn fall_through(&mut self, target: BlockId) -> bool {
        if self.reachable {
            self.constructor.new_jump(JumpKind::Fallthrough, target);
        }
        self.reachable
    }

    /// `while` when `step` is `None`, `for` otherwise.
    fn loop_statement(
        &mut self,
        kind: BranchKind,
        cond: Option<&Expr>,
        step: Option<Option<&Stmt>>,
        body: &[Stmt],
    ) -> CompileResult<()> {
        let prefix = match kind {
            BranchKind::For => "for",
            _ => "while",
        };
        let header = self.constructor.new_block(&format!("{}.header", prefix));
        self.constructor.new_jump(JumpKind::Fallthrough, header);
        self.constructor.set_current_block(header);

        let cond = match cond {
            Some(cond) => self.expr(cond)?,
            None => self.constructor.new_const_bool(true),
        };
        let body_name = format!("{}.body", prefix);
        let exit_name = format!("{}.exit", prefix);
        let (body_block, exit_block) = self.split(kind, cond, (&body_name, &exit_name))?;
        let step_block = step.map(|_| self.constructor.new_block("for.step"));
        let after = self.constructor.new_block(&format!("{}.after", prefix));

        self.loops.push(LoopTargets {
            continue_target: step_block.unwrap_or(header),
            break_target: after,
        });
        self.constructor.set_current_block(body_block);
        self.reachable = true;
        self.statements(body)?;
        self.loops.pop();

        if let Some(step_block) = step_block {
            self.fall_through(step_block);
            self.constructor.seal_block(step_block)?;
            self.constructor.set_current_block(step_block);
            self.reachable = !self.constructor.graph().block(step_block).predecessors.is_empty();
            if let Some(Some(step)) = step {
                if self.reachable {
                    self.statement(step)?;
                }
            }
        }
        if self.reachable {
            self.constructor.new_jump(JumpKind::BackEdge, header);
        }
        self.constructor.seal_block(header)?;

        self.constructor.set_current_block(exit_block);
        self.constructor.new_jump(JumpKind::Fallthrough, after);
        self.constructor.seal_block(after)?;
        self.constructor.set_current_block(after);
        self.reachable = true;
        Ok(())
    }

    fn expr(&mut self, expr: &Expr) -> CompileResult<NodeId> {
        match &expr.kind {
            ExprKind::Int(value) => Ok(self.constructor.new_const_int(*value)),
            ExprKind::Bool(value) => Ok(self.constructor.new_const_bool(*value)),
            ExprKind::Var(name) => self.read(name),
            ExprKind::Unary { op, operand } => {
                let operand = self.expr(operand)?;
                Ok(self.constructor.new_unary(*op, operand))
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let lhs = self.expr(lhs)?;
                let rhs = self.expr(rhs)?;
                self.constructor.new_binary(*op, lhs, rhs)
            }
            ExprKind::Ternary {
                cond,
                then,
                otherwise,
            } => {
                let cond = self.expr(cond)?;
                let (then_block, else_block) =
                    self.split(BranchKind::Ternary, cond, ("ternary.then", "ternary.else"))?;
                let join = self.constructor.new_block("ternary.join");

                self.constructor.set_current_block(then_block);
                let then_value = self.expr(then)?;
                self.constructor.new_jump(JumpKind::Fallthrough, join);

                self.constructor.set_current_block(else_block);
                let else_value = self.expr(otherwise)?;
                self.constructor.new_jump(JumpKind::Fallthrough, join);

                self.constructor.seal_block(join)?;
                self.constructor.set_current_block(join);
                self.constructor.new_merge_phi(&[then_value, else_value])
            }
        }
    }
}
