// This module maps the allocator's abstract placements onto the x86-64 register file. Placement
// ids below the register budget index into a fixed table of eleven allocatable general purpose
// registers; the remaining six are reserved: rax carries the return value and doubles as the
// temporary that breaks phi move cycles (nothing is ever live in it across a jump), rdx
// receives the remainder of a division, rbp and rsp hold the frame, and r15 is the "free hand"
// the emitter stages stack operands through, since two-operand encodings need at least one
// register. Placement ids at or above the budget become word-sized slots in the function's
// StackFrame at rsp + (id - budget) * 8. Nodes colored NeverLive are routed to Scratch.

//! Register materialization.

use super::frame::StackFrame;
use crate::core::error::{CompileError, CompileResult};
use crate::ir::NodeId;
use crate::regalloc::{Color, Coloring, Placement, SpillDecision};
use bumpalo::Bump;
use hashbrown::HashMap;
use iced_x86::Register;
use std::fmt;

/// Target word width in bytes.
pub const WORD_SIZE: u32 = 8;

/// Registers handed out by placement id.
pub const ALLOCATABLE: [Register; 11] = [
    Register::RBX,
    Register::RCX,
    Register::RSI,
    Register::RDI,
    Register::R8,
    Register::R9,
    Register::R10,
    Register::R11,
    Register::R12,
    Register::R13,
    Register::R14,
];

pub const RETURN_VALUE: Register = Register::RAX;
pub const CYCLE_TEMP: Register = Register::RAX;
pub const REMAINDER: Register = Register::RDX;
pub const FRAME_POINTER: Register = Register::RBP;
pub const STACK_POINTER: Register = Register::RSP;
pub const FREE_HAND: Register = Register::R15;

/// Where a value lives for the emitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Location {
    Register(Register),
    /// `[rsp + offset]`
    Stack { offset: u32 },
    /// The value is never read; its result may be discarded.
    Scratch,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Register(register) => write!(f, "{}", format!("{:?}", register).to_lowercase()),
            Location::Stack { offset } => write!(f, "[rsp+{}]", offset),
            Location::Scratch => write!(f, "scratch"),
        }
    }
}

/// Location of every register-needing node plus the frame holding the spills.
#[derive(Debug)]
pub struct RegisterMap<'arena> {
    locations: HashMap<NodeId, Location>,
    frame: StackFrame<'arena>,
}

impl<'arena> RegisterMap<'arena> {
    pub fn location(&self, node: NodeId) -> Option<Location> {
        self.locations.get(&node).copied()
    }

    /// All assignments, sorted by node.
    pub fn assignments(&self) -> Vec<(NodeId, Location)> {
        let mut assignments: Vec<(NodeId, Location)> =
            self.locations.iter().map(|(&n, &l)| (n, l)).collect();
        assignments.sort_unstable_by_key(|&(node, _)| node);
        assignments
    }

    pub fn frame(&self) -> &StackFrame<'arena> {
        &self.frame
    }

    pub fn frame_size(&self) -> u32 {
        self.frame.frame_size()
    }
}

/// Turn a coloring and its spill decision into concrete locations.
pub fn materialize<'arena>(
    arena: &'arena Bump,
    coloring: &Coloring,
    spills: &SpillDecision,
) -> CompileResult<RegisterMap<'arena>> {
    let budget = spills.budget();
    if budget as usize > ALLOCATABLE.len() {
        return Err(CompileError::BudgetExceedsRegisterFile {
            budget: budget as usize,
            available: ALLOCATABLE.len(),
        });
    }

    let mut frame = StackFrame::new(arena);
    for _ in 0..spills.spilled_count() {
        frame.allocate_spill_slot();
    }

    let mut locations = HashMap::with_capacity(coloring.len());
    for (node, color) in coloring.iter() {
        let location = match (color, spills.placement(color)) {
            (Color::NeverLive, _) => Location::Scratch,
            (_, Some(Placement::Register(id))) => Location::Register(ALLOCATABLE[id as usize]),
            (_, Some(Placement::StackSlot(id))) => {
                let offset = frame.slot_offset((id - budget) as usize).ok_or_else(|| {
                    CompileError::Unsupported {
                        reason: format!("stack id {} outside the frame of node {}", id, node),
                    }
                })?;
                Location::Stack { offset }
            }
            (Color::Index(index), None) => {
                return Err(CompileError::Unsupported {
                    reason: format!("color {} of node {} has no placement", index, node),
                })
            }
        };
        locations.insert(node, location);
    }

    Ok(RegisterMap { locations, frame })
}
