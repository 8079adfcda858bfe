//! Coloring validity and spill placement under tight register budgets.

use bumpalo::Bump;
use hashbrown::{HashMap, HashSet};
use ssacolor::core::{CompilationSession, CompileError};
use ssacolor::pipeline::{compile_function, PipelineConfig};
use ssacolor::regalloc::{Color, Placement, SpillPolicy};
use ssacolor::tree::samples;
use ssacolor::x64::{ALLOCATABLE, WORD_SIZE};
use ssacolor::Location;

fn config(budget: usize, policy: SpillPolicy) -> PipelineConfig {
    PipelineConfig {
        register_budget: budget,
        spill_policy: policy,
        ..PipelineConfig::default()
    }
}

#[test]
fn test_neighbors_never_share_a_color() {
    let _ = env_logger::builder().is_test(true).try_init();

    let arena = Bump::new();
    let session = CompilationSession::new(&arena);
    for function in samples::all() {
        let compiled = compile_function(&function, &PipelineConfig::default(), &session).unwrap();
        for (a, b) in compiled.interference.edges() {
            let (ca, cb) = (compiled.coloring.color(a), compiled.coloring.color(b));
            assert!(ca.is_some() && cb.is_some());
            if ca != Some(Color::NeverLive) {
                assert_ne!(ca, cb, "{} and {} in `{}`", a, b, function.name);
            }
        }
        for node in compiled.interference.nodes() {
            assert!(compiled.coloring.color(node).is_some(), "{} uncolored", node);
        }
    }
}

#[test]
fn test_elimination_order_is_a_permutation() {
    let _ = env_logger::builder().is_test(true).try_init();

    let arena = Bump::new();
    let session = CompilationSession::new(&arena);
    for function in samples::all() {
        let compiled = compile_function(&function, &PipelineConfig::default(), &session).unwrap();
        let mut ordered = compiled.elimination_order.clone();
        ordered.sort_unstable();
        assert_eq!(ordered, compiled.interference.nodes());
    }
}

#[test]
fn test_colors_match_the_largest_live_set() {
    let _ = env_logger::builder().is_test(true).try_init();

    let arena = Bump::new();
    let session = CompilationSession::new(&arena);
    let compiled =
        compile_function(&samples::high_pressure(), &PipelineConfig::default(), &session).unwrap();

    // Six parameters are live together at the multiplication.
    assert!(compiled.liveness.max_pressure() >= 6);
    assert!(compiled.coloring.distinct_colors() >= compiled.liveness.max_pressure());
    assert_eq!(compiled.spills.spilled_count(), 0);
    assert_eq!(compiled.frame_size(), 0);
}

#[test]
fn test_pressure_above_budget_spills() {
    let _ = env_logger::builder().is_test(true).try_init();

    for policy in [SpillPolicy::LeastUsed, SpillPolicy::MostUsed] {
        for budget in [2, 3] {
            let arena = Bump::new();
            let session = CompilationSession::new(&arena);
            let compiled =
                compile_function(&samples::high_pressure(), &config(budget, policy), &session)
                    .unwrap();

            let spilled = compiled.spills.spilled_count();
            assert!(spilled >= 1);
            assert_eq!(
                spilled,
                compiled.coloring.distinct_colors() - budget,
                "{:?} with {} registers",
                policy,
                budget
            );
            assert_eq!(compiled.frame_size(), spilled as u32 * WORD_SIZE);
            assert_eq!(compiled.registers.frame().slot_count(), spilled);
            assert_eq!(session.stats().colors_spilled, spilled);
        }
    }
}

#[test]
fn test_kept_and_spilled_colors_get_distinct_homes() {
    let _ = env_logger::builder().is_test(true).try_init();

    let arena = Bump::new();
    let session = CompilationSession::new(&arena);
    let compiled = compile_function(
        &samples::high_pressure(),
        &config(3, SpillPolicy::LeastUsed),
        &session,
    )
    .unwrap();

    let mut home: HashMap<u32, Location> = HashMap::new();
    for (node, color) in compiled.coloring.iter() {
        let location = compiled.location(node).unwrap();
        match color {
            Color::NeverLive => assert_eq!(location, Location::Scratch),
            Color::Index(index) => {
                let previous = home.insert(index, location);
                assert!(previous.is_none() || previous == Some(location), "color c{} split", index);
            }
        }
    }

    let distinct: HashSet<Location> = home.values().copied().collect();
    assert_eq!(distinct.len(), home.len(), "two colors share a home");

    let registers = home
        .values()
        .filter(|l| matches!(l, Location::Register(_)))
        .count();
    let slots = home
        .values()
        .filter(|l| matches!(l, Location::Stack { .. }))
        .count();
    assert_eq!(registers, 3);
    assert_eq!(slots, compiled.spills.spilled_count());
}

#[test]
fn test_placement_ids_are_dense() {
    let _ = env_logger::builder().is_test(true).try_init();

    let arena = Bump::new();
    let session = CompilationSession::new(&arena);
    let budget = 2;
    let compiled = compile_function(
        &samples::high_pressure(),
        &config(budget, SpillPolicy::MostUsed),
        &session,
    )
    .unwrap();

    let mut registers = Vec::new();
    let mut slots = Vec::new();
    for color in compiled.spills.kept_colors() {
        match compiled.spills.placement(Color::Index(color)) {
            Some(Placement::Register(id)) => registers.push(id),
            other => panic!("kept color c{} placed at {:?}", color, other),
        }
    }
    for color in compiled.spills.spilled_colors() {
        match compiled.spills.placement(Color::Index(color)) {
            Some(Placement::StackSlot(id)) => slots.push(id),
            other => panic!("spilled color c{} placed at {:?}", color, other),
        }
    }
    registers.sort_unstable();
    slots.sort_unstable();

    assert_eq!(registers, (0..budget as u32).collect::<Vec<_>>());
    let first = budget as u32;
    assert_eq!(slots, (first..first + slots.len() as u32).collect::<Vec<_>>());
}

#[test]
fn test_spill_policies_pick_opposite_ends() {
    let _ = env_logger::builder().is_test(true).try_init();

    let arena = Bump::new();
    let session = CompilationSession::new(&arena);
    let least = compile_function(
        &samples::high_pressure(),
        &config(3, SpillPolicy::LeastUsed),
        &session,
    )
    .unwrap();
    let most = compile_function(
        &samples::high_pressure(),
        &config(3, SpillPolicy::MostUsed),
        &session,
    )
    .unwrap();

    let heaviest = |spills: &ssacolor::regalloc::SpillDecision, colors: Vec<u32>| {
        colors.iter().map(|&c| spills.pressure(c)).max().unwrap_or(0)
    };
    let lightest = |spills: &ssacolor::regalloc::SpillDecision, colors: Vec<u32>| {
        colors
            .iter()
            .map(|&c| spills.pressure(c))
            .min()
            .unwrap_or(usize::MAX)
    };

    assert!(
        heaviest(&least.spills, least.spills.spilled_colors())
            <= lightest(&least.spills, least.spills.kept_colors())
    );
    assert!(
        lightest(&most.spills, most.spills.spilled_colors())
            >= heaviest(&most.spills, most.spills.kept_colors())
    );
}

#[test]
fn test_reserved_registers_stay_free() {
    let _ = env_logger::builder().is_test(true).try_init();

    let arena = Bump::new();
    let session = CompilationSession::new(&arena);
    for function in samples::all() {
        let compiled = compile_function(&function, &PipelineConfig::default(), &session).unwrap();
        for (_, location) in compiled.registers.assignments() {
            if let Location::Register(register) = location {
                assert!(ALLOCATABLE.contains(&register), "{:?} is reserved", register);
            }
        }
    }
}

#[test]
fn test_budget_larger_than_register_file_is_rejected() {
    let _ = env_logger::builder().is_test(true).try_init();

    let arena = Bump::new();
    let session = CompilationSession::new(&arena);
    let result = compile_function(
        &samples::straight_line(),
        &config(ALLOCATABLE.len() + 1, SpillPolicy::LeastUsed),
        &session,
    );
    assert!(matches!(
        result,
        Err(CompileError::BudgetExceedsRegisterFile { .. })
    ));
    assert_eq!(session.stats().functions_compiled, 0);
}
