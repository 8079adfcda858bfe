//! Phi resolution moves.
//!
//! Phis have no instruction of their own. For every control edge into a
//! block with value phis, the emitter copies each phi's incoming operand into
//! the phi's location right before the predecessor's jump. All copies on an
//! edge happen at once, so they are sequentialised here: a move goes as soon
//! as no other pending move still reads its destination, and when every
//! destination is still needed (a cycle, e.g. swapping two loop variables)
//! one destination is first saved into the cycle temporary.

use super::registers::{Location, RegisterMap, CYCLE_TEMP};
use crate::core::error::{CompileError, CompileResult};
use crate::ir::{BlockId, IrGraph, NodeId, NodeKind};
use crate::regalloc::NodeOrder;
use log::trace;

/// `to <- from`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    pub from: Location,
    pub to: Location,
}

/// Ordered moves to emit before `jump`, which leaves `predecessor` for `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeMoves {
    pub predecessor: BlockId,
    pub jump: NodeId,
    pub target: BlockId,
    pub moves: Vec<Move>,
}

/// Compute the resolving moves of every reachable edge into a block with value phis.
pub fn resolve_phi_moves(
    graph: &IrGraph,
    order: &NodeOrder,
    registers: &RegisterMap<'_>,
) -> CompileResult<Vec<EdgeMoves>> {
    let mut edges = Vec::new();

    for &block in order.blocks() {
        let phis: Vec<NodeId> = graph
            .phis(block)
            .into_iter()
            .filter(|&phi| graph.node(phi).kind.needs_register())
            .collect();
        if phis.is_empty() {
            continue;
        }

        for (index, &control) in graph.block(block).predecessors.iter().enumerate() {
            let predecessor = graph.node(control).block;
            if !order.is_reachable(predecessor) {
                continue;
            }
            if !matches!(graph.node(control).kind, NodeKind::Jump(_)) {
                return Err(CompileError::Unsupported {
                    reason: format!(
                        "block {} has phis but is entered by {} ({})",
                        block,
                        control,
                        graph.node(control).kind
                    ),
                });
            }

            let mut parallel = Vec::with_capacity(phis.len());
            for &phi in &phis {
                let to = location(registers, phi)?;
                let operand = graph.node(phi).operands.get(index).copied().ok_or(
                    CompileError::PhiArity {
                        phi,
                        block,
                        operands: graph.node(phi).operands.len(),
                        predecessors: graph.block(block).predecessors.len(),
                    },
                )?;
                let from = location(registers, operand)?;
                if to != Location::Scratch && to != from {
                    parallel.push(Move { from, to });
                }
            }

            let moves = sequentialize(parallel);
            for m in &moves {
                trace!("{} -> {}: {} <- {}", predecessor, block, m.to, m.from);
            }
            edges.push(EdgeMoves {
                predecessor,
                jump: control,
                target: block,
                moves,
            });
        }
    }
    Ok(edges)
}

fn location(registers: &RegisterMap<'_>, node: NodeId) -> CompileResult<Location> {
    registers.location(node).ok_or_else(|| CompileError::Unsupported {
        reason: format!("node {} has no location", node),
    })
}

/// Order a parallel copy so that no source is overwritten before it is read.
///
/// Destinations must be distinct. The cycle temporary must not appear in `pending`.
pub fn sequentialize(mut pending: Vec<Move>) -> Vec<Move> {
    let temp = Location::Register(CYCLE_TEMP);
    let mut sequence = Vec::with_capacity(pending.len() + 1);

    while !pending.is_empty() {
        let ready = pending
            .iter()
            .position(|m| !pending.iter().any(|other| other.from == m.to));
        if let Some(index) = ready {
            sequence.push(pending.remove(index));
            continue;
        }

        // Every destination is still read: break the cycle at the first move.
        let blocked = pending[0].to;
        trace!("breaking move cycle at {}", blocked);
        sequence.push(Move {
            from: blocked,
            to: temp,
        });
        for m in &mut pending {
            if m.from == blocked {
                m.from = temp;
            }
        }
    }
    sequence
}

#[cfg(test)]
mod tests {
    use super::*;
    use iced_x86::Register;
    use hashbrown::HashMap;

    fn reg(register: Register) -> Location {
        Location::Register(register)
    }

    /// Run `moves` on a register file where each location starts holding its own name.
    fn simulate(moves: &[Move], initial: &[Location]) -> HashMap<Location, Location> {
        let mut state: HashMap<Location, Location> = initial.iter().map(|&l| (l, l)).collect();
        for m in moves {
            let value = state.get(&m.from).copied().unwrap_or(m.from);
            state.insert(m.to, value);
        }
        state
    }

    #[test]
    fn test_chain_is_ordered_back_to_front() {
        // rbx <- rcx, rcx <- rsi
        let moves = sequentialize(vec![
            Move { from: reg(Register::RCX), to: reg(Register::RBX) },
            Move { from: reg(Register::RSI), to: reg(Register::RCX) },
        ]);
        assert_eq!(moves[0].to, reg(Register::RBX));
        assert_eq!(moves[1].to, reg(Register::RCX));

        let state = simulate(&moves, &[reg(Register::RBX), reg(Register::RCX), reg(Register::RSI)]);
        assert_eq!(state[&reg(Register::RBX)], reg(Register::RCX));
        assert_eq!(state[&reg(Register::RCX)], reg(Register::RSI));
    }

    #[test]
    fn test_swap_goes_through_temporary() {
        let a = reg(Register::RBX);
        let b = Location::Stack { offset: 8 };
        let moves = sequentialize(vec![Move { from: b, to: a }, Move { from: a, to: b }]);

        assert_eq!(moves.len(), 3);
        assert!(moves.iter().any(|m| m.to == reg(CYCLE_TEMP)));
        let state = simulate(&moves, &[a, b]);
        assert_eq!(state[&a], b);
        assert_eq!(state[&b], a);
    }

    #[test]
    fn test_rotation_and_fan_out() {
        let (x, y, z, w) = (
            reg(Register::R8),
            reg(Register::R9),
            reg(Register::R10),
            reg(Register::R11),
        );
        // x <- y <- z <- x, plus w <- x
        let moves = sequentialize(vec![
            Move { from: y, to: x },
            Move { from: z, to: y },
            Move { from: x, to: z },
            Move { from: x, to: w },
        ]);
        let state = simulate(&moves, &[x, y, z, w]);
        assert_eq!(state[&x], y);
        assert_eq!(state[&y], z);
        assert_eq!(state[&z], x);
        assert_eq!(state[&w], x);
    }
}
