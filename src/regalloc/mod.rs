//! Register allocation by graph coloring.
//!
//! The stages run in this order, each consuming the previous one's output:
//!
//! 1. [`order`]: blocks in reverse post-order, nodes in execution order
//! 2. [`liveness`]: live-in set of every node
//! 3. [`interference`]: cliques over the live-in sets
//! 4. [`elimination`]: smallest-weight-first vertex order
//! 5. [`coloring`]: greedy coloring along that order
//! 6. [`spill`]: register or stack placement per color

pub mod coloring;
pub mod elimination;
pub mod interference;
pub mod liveness;
pub mod order;
pub mod spill;

pub use coloring::{Color, Coloring};
pub use elimination::elimination_order;
pub use interference::InterferenceGraph;
pub use liveness::{Liveness, LivelinessInformation};
pub use order::NodeOrder;
pub use spill::{select_spills, Placement, SpillDecision, SpillPolicy};
