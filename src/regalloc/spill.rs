//! Spill selection against a fixed register budget.
//!
//! Colors are ranked by pressure (how many nodes carry them), ascending, ties
//! by color. When there are more colors than registers the ranking is cut at
//! the budget; [`SpillPolicy`] decides which side of the cut goes to the stack.
//! Kept colors get dense register ids `0..budget` and spilled colors get dense
//! stack ids `budget..`, both in ascending color order.

use super::coloring::{Color, Coloring};
use log::debug;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpillPolicy {
    /// Spill the colors with the fewest nodes.
    #[default]
    LeastUsed,
    /// Keep the `budget` least used colors and spill the rest.
    MostUsed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placement {
    /// Physical register id, below the budget.
    Register(u32),
    /// Stack id, at or above the budget.
    StackSlot(u32),
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Placement::Register(id) => write!(f, "r{}", id),
            Placement::StackSlot(id) => write!(f, "s{}", id),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpillDecision {
    budget: u32,
    placements: BTreeMap<u32, Placement>,
    pressure: BTreeMap<u32, usize>,
}

impl SpillDecision {
    pub fn budget(&self) -> u32 {
        self.budget
    }

    pub fn placement(&self, color: Color) -> Option<Placement> {
        match color {
            Color::Index(index) => self.placements.get(&index).copied(),
            Color::NeverLive => None,
        }
    }

    /// Nodes carrying `color`.
    pub fn pressure(&self, color: u32) -> usize {
        self.pressure.get(&color).copied().unwrap_or(0)
    }

    pub fn kept_colors(&self) -> Vec<u32> {
        self.colors_where(|p| matches!(p, Placement::Register(_)))
    }

    pub fn spilled_colors(&self) -> Vec<u32> {
        self.colors_where(|p| matches!(p, Placement::StackSlot(_)))
    }

    pub fn spilled_count(&self) -> usize {
        self.spilled_colors().len()
    }

    fn colors_where(&self, keep: impl Fn(&Placement) -> bool) -> Vec<u32> {
        self.placements
            .iter()
            .filter(|(_, placement)| keep(placement))
            .map(|(&color, _)| color)
            .collect()
    }
}

pub fn select_spills(coloring: &Coloring, budget: u32, policy: SpillPolicy) -> SpillDecision {
    let pressure: BTreeMap<u32, usize> = coloring.pressure().into_iter().collect();

    let mut ranked: Vec<u32> = pressure.keys().copied().collect();
    ranked.sort_by_key(|&color| (pressure[&color], color));

    let excess = ranked.len().saturating_sub(budget as usize);
    let (mut kept, mut spilled) = match policy {
        SpillPolicy::LeastUsed => {
            let (spilled, kept) = ranked.split_at(excess);
            (kept.to_vec(), spilled.to_vec())
        }
        SpillPolicy::MostUsed => {
            let (kept, spilled) = ranked.split_at(ranked.len() - excess);
            (kept.to_vec(), spilled.to_vec())
        }
    };
    kept.sort_unstable();
    spilled.sort_unstable();

    let mut placements = BTreeMap::new();
    for (id, &color) in kept.iter().enumerate() {
        placements.insert(color, Placement::Register(id as u32));
    }
    for (slot, &color) in spilled.iter().enumerate() {
        placements.insert(color, Placement::StackSlot(budget + slot as u32));
    }

    debug!(
        "spill selection: {} colors, budget {}, {} spilled ({:?})",
        ranked.len(),
        budget,
        spilled.len(),
        policy
    );

    SpillDecision {
        budget,
        placements,
        pressure,
    }
}
