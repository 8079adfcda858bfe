//! Greedy coloring along an elimination order.

use super::interference::InterferenceGraph;
use super::liveness::Liveness;
use crate::core::error::{CompileError, CompileResult};
use crate::ir::NodeId;
use hashbrown::{HashMap, HashSet};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Color {
    /// Computed but never read; its result can go to a scratch location.
    NeverLive,
    Index(u32),
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::NeverLive => write!(f, "-"),
            Color::Index(index) => write!(f, "c{}", index),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Coloring {
    colors: HashMap<NodeId, Color>,
}

impl Coloring {
    pub fn color(&self, node: NodeId) -> Option<Color> {
        self.colors.get(&node).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, Color)> + '_ {
        self.colors.iter().map(|(&node, &color)| (node, color))
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Number of distinct non-sentinel colors.
    pub fn distinct_colors(&self) -> usize {
        self.colors
            .values()
            .filter_map(|color| match color {
                Color::Index(index) => Some(*index),
                Color::NeverLive => None,
            })
            .collect::<HashSet<u32>>()
            .len()
    }

    /// Nodes per color.
    pub fn pressure(&self) -> HashMap<u32, usize> {
        let mut pressure = HashMap::new();
        for color in self.colors.values() {
            if let Color::Index(index) = color {
                *pressure.entry(*index).or_insert(0) += 1;
            }
        }
        pressure
    }

    /// Check that no edge joins two nodes of the same color.
    pub fn validate(&self, interference: &InterferenceGraph) -> CompileResult<()> {
        for (a, b) in interference.edges() {
            if let (Some(Color::Index(x)), Some(Color::Index(y))) = (self.color(a), self.color(b)) {
                if x == y {
                    return Err(CompileError::ColoringConflict { a, b, color: x });
                }
            }
        }
        Ok(())
    }
}

/// Give each node, in `order`, the smallest color none of its neighbors has.
pub fn color(interference: &InterferenceGraph, order: &[NodeId], liveness: &Liveness) -> Coloring {
    let mut coloring = Coloring::default();

    for &node in order {
        if interference.degree(node) == 0 && !liveness.is_ever_live(node) {
            coloring.colors.insert(node, Color::NeverLive);
            continue;
        }

        let taken: HashSet<u32> = interference
            .neighbors(node)
            .filter_map(|neighbor| match coloring.color(neighbor) {
                Some(Color::Index(index)) => Some(index),
                _ => None,
            })
            .collect();
        let free = (0..).find(|candidate| !taken.contains(candidate)).unwrap_or(0);
        coloring.colors.insert(node, Color::Index(free));
    }
    coloring
}
