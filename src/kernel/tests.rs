#![cfg(test)]

use std::collections::VecDeque;

use crate::config::SchedulerConfig;
use crate::error::KernelError;
use crate::geom::Geometry;
use crate::kernel::core::{Scheduler, SchedulerStatus, StepOutcome};
use crate::kernel::runtime::{seeded_rng, RandomSource};
use crate::kproc::KProc;
use crate::model::{Model, Stoichiometry};
use crate::solver::compile;
use crate::state::SimState;
use crate::types::Region;

// --- Test Utilities ---

const CYT: Region = Region::Comp(0);
const A: usize = 0;

/// Replays a fixed list of uniform draws. Each event consumes two: the
/// waiting time first, then the selection value.
#[derive(Debug, Clone, Default)]
struct ScriptedRng {
    draws: VecDeque<f64>,
}

impl ScriptedRng {
    fn new(draws: &[f64]) -> Self {
        ScriptedRng { draws: draws.iter().copied().collect() }
    }
}

impl RandomSource for ScriptedRng {
    fn uniform(&mut self) -> f64 {
        self.draws.pop_front().expect("scripted draws exhausted")
    }
}

/// One compartment `cyt` with species A, B and a volume system `vsys`.
fn cyt_model(build: impl FnOnce(&mut Model)) -> (Model, Geometry) {
    let mut m = Model::new();
    m.add_species("A").unwrap();
    m.add_species("B").unwrap();
    m.add_volsys("vsys").unwrap();
    build(&mut m);
    let mut g = Geometry::new();
    g.add_comp("cyt", 1.0e-18).unwrap();
    g.add_volsys("cyt", "vsys").unwrap();
    (m, g)
}

/// Zeroth-order sources of A, one per rate constant; propensity equals the constant.
fn channels(kcsts: &[f64]) -> (Model, Geometry) {
    cyt_model(|m| {
        let a = m.species("A").unwrap();
        for (i, &k) in kcsts.iter().enumerate() {
            m.create_reaction("vsys", &format!("src{}", i), Stoichiometry::volume(vec![], vec![a]), k).unwrap();
        }
    })
}

/// A -> (rate k).
fn decay(k: f64) -> (Model, Geometry) {
    cyt_model(|m| {
        let a = m.species("A").unwrap();
        m.create_reaction("vsys", "decay", Stoichiometry::volume(vec![a], vec![]), k).unwrap();
    })
}

/// -> A (birth), A -> (death).
fn birth_death(birth: f64, death: f64) -> (Model, Geometry) {
    cyt_model(|m| {
        let a = m.species("A").unwrap();
        m.create_reaction("vsys", "birth", Stoichiometry::volume(vec![], vec![a]), birth).unwrap();
        m.create_reaction("vsys", "death", Stoichiometry::volume(vec![a], vec![]), death).unwrap();
    })
}

fn scheduler<R: RandomSource>(model: &(Model, Geometry), config: SchedulerConfig, rng: R) -> Scheduler<R> {
    let compiled = compile(&model.0, &model.1).unwrap();
    let mut sched = Scheduler::new(config, rng).unwrap();
    sched.initialize(compiled.state, compiled.procs, compiled.graph).unwrap();
    sched
}

fn fired(outcome: StepOutcome) -> usize {
    match outcome {
        StepOutcome::Fired(ev) => ev.sched_idx,
        StepOutcome::Halted => panic!("expected an event, got a halt"),
    }
}

// --- Selection ---

#[test]
fn test_zero_propensity_processes_are_never_selected() {
    let sys = channels(&[0.0, 1.0, 0.0, 3.0]);
    // Selection draws: 0.0 -> a zero-width interval at the front must be
    // skipped; 0.25 * 4 = 1.0 lands exactly on the end of process 1's
    // interval and belongs to the next non-zero process.
    let rng = ScriptedRng::new(&[0.5, 0.0, 0.5, 0.25, 0.5, 0.999]);
    let mut s = scheduler(&sys, SchedulerConfig::default(), rng);
    assert_eq!(s.total_propensity(), 4.0);
    assert_eq!(fired(s.step().unwrap()), 1);
    assert_eq!(fired(s.step().unwrap()), 3);
    assert_eq!(fired(s.step().unwrap()), 3);
    assert_eq!(s.extent(0).unwrap(), 0);
    assert_eq!(s.extent(2).unwrap(), 0);
}

#[test]
fn test_waiting_time_is_exponential_in_total() {
    let sys = channels(&[1.0, 3.0]);
    let rng = ScriptedRng::new(&[0.5, 0.1]);
    let mut s = scheduler(&sys, SchedulerConfig::default(), rng);
    let StepOutcome::Fired(ev) = s.step().unwrap() else { panic!("expected an event") };
    let expected = std::f64::consts::LN_2 / 4.0;
    assert!((ev.time - expected).abs() < 1e-15);
    assert_eq!(s.time(), ev.time);
    assert_eq!(ev.sched_idx, 0);
    assert_eq!(ev.extent, 1);
    assert_eq!(s.count(CYT, A), 1);
}

// --- Termination ---

#[test]
fn test_halts_once_reactants_are_exhausted() {
    let sys = decay(2.0);
    let rng = ScriptedRng::new(&[0.3, 0.5, 0.3, 0.5]);
    let mut s = scheduler(&sys, SchedulerConfig::default(), rng);
    s.set_count(CYT, A, 2).unwrap();
    assert_eq!(s.total_propensity(), 4.0);
    fired(s.step().unwrap());
    assert_eq!(s.total_propensity(), 2.0);
    fired(s.step().unwrap());
    assert_eq!(s.total_propensity(), 0.0);
    let t = s.time();

    // No draws remain in the script; halting must not consume any.
    assert_eq!(s.step().unwrap(), StepOutcome::Halted);
    assert_eq!(s.status(), SchedulerStatus::Halted);
    assert_eq!(s.step().unwrap(), StepOutcome::Halted);
    assert_eq!(s.time(), t);
    assert_eq!(s.nsteps(), 2);
}

#[test]
fn test_halted_scheduler_wakes_on_count_change() {
    let sys = decay(1.0);
    let mut s = scheduler(&sys, SchedulerConfig::default(), seeded_rng(3));
    assert_eq!(s.step().unwrap(), StepOutcome::Halted);
    s.set_count(CYT, A, 1).unwrap();
    assert_eq!(s.status(), SchedulerStatus::Ready);
    assert_eq!(s.propensity(0).unwrap(), 1.0);
    fired(s.step().unwrap());
    assert_eq!(s.step().unwrap(), StepOutcome::Halted);
}

#[test]
fn test_run_until_leaves_time_at_end() {
    let sys = decay(1.0);
    let mut s = scheduler(&sys, SchedulerConfig::default(), seeded_rng(17));
    s.set_count(CYT, A, 5).unwrap();
    let summary = s.run_until(1.0e6).unwrap();
    assert_eq!(summary.events, 5);
    assert_eq!(summary.status, SchedulerStatus::Halted);
    assert_eq!(summary.time, 1.0e6);
    assert_eq!(s.count(CYT, A), 0);

    assert!(matches!(s.run_until(10.0), Err(KernelError::InvalidArgument(_))));
}

#[test]
fn test_run_until_stops_before_next_event() {
    let sys = channels(&[1.0]);
    // First wait is ln(2), the second would end past t = 1.
    let rng = ScriptedRng::new(&[0.5, 0.0, 0.5]);
    let mut s = scheduler(&sys, SchedulerConfig::default(), rng);
    let summary = s.run_until(1.0).unwrap();
    assert_eq!(summary.events, 1);
    assert_eq!(s.time(), 1.0);
    assert_eq!(s.status(), SchedulerStatus::Running);
    assert_eq!(s.count(CYT, A), 1);
}

#[test]
fn test_event_cap_bounds_run_until() {
    let sys = channels(&[10.0]);
    let config = SchedulerConfig { max_events_per_run: Some(25), ..SchedulerConfig::with_seed(4) };
    let mut s = scheduler(&sys, config, seeded_rng(4));
    let summary = s.run_until(1.0e9).unwrap();
    assert_eq!(summary.events, 25);
    assert!(s.time() < 1.0e9);
    assert_eq!(s.count(CYT, A), 25);
}

// --- Faults and lifecycle ---

#[test]
fn test_lifecycle_errors() {
    let mut s: Scheduler<ScriptedRng> = Scheduler::new(SchedulerConfig::default(), ScriptedRng::default()).unwrap();
    assert_eq!(s.status(), SchedulerStatus::Uninitialized);
    assert_eq!(s.step().unwrap_err(), KernelError::NotInitialized);
    assert_eq!(s.reset().unwrap_err(), KernelError::NotInitialized);

    let sys = decay(1.0);
    let compiled = compile(&sys.0, &sys.1).unwrap();
    let again = compiled.clone();
    s.initialize(compiled.state, compiled.procs, compiled.graph).unwrap();
    assert_eq!(s.status(), SchedulerStatus::Ready);
    assert_eq!(
        s.initialize(again.state, again.procs, again.graph).unwrap_err(),
        KernelError::AlreadyInitialized
    );

    let bad = SchedulerConfig { recompute_interval: 0, ..Default::default() };
    assert!(matches!(Scheduler::new(bad, ScriptedRng::default()), Err(KernelError::Config(_))));
}

#[test]
fn test_initialize_rejects_foreign_graph() {
    let sys = birth_death(1.0, 1.0);
    let other = decay(1.0);
    let compiled = compile(&sys.0, &sys.1).unwrap();
    let foreign = compile(&other.0, &other.1).unwrap();
    let mut s = Scheduler::new(SchedulerConfig::default(), seeded_rng(0)).unwrap();
    let err = s.initialize(compiled.state, compiled.procs, foreign.graph).unwrap_err();
    assert!(matches!(err, KernelError::GraphMismatch(_)));
    assert_eq!(s.status(), SchedulerStatus::Uninitialized);
}

#[test]
fn test_invalid_propensity_faults_the_scheduler() {
    let sys = decay(f64::MAX);
    let mut s = scheduler(&sys, SchedulerConfig::default(), seeded_rng(1));
    // c * n overflows to infinity.
    let err = s.set_count(CYT, A, 2).unwrap_err();
    assert!(matches!(err, KernelError::InvariantViolation(_)));
    assert_eq!(s.status(), SchedulerStatus::Faulted);
    assert_eq!(s.step().unwrap_err(), KernelError::Faulted);
    assert_eq!(s.run_events(1).unwrap_err(), KernelError::Faulted);
    assert_eq!(s.reset().unwrap_err(), KernelError::Faulted);
}

#[test]
fn test_failed_firing_faults_without_partial_writes() {
    // A -> B compiled against a state that only holds A.
    let sys = cyt_model(|m| {
        let a = m.species("A").unwrap();
        let b = m.species("B").unwrap();
        m.create_reaction("vsys", "convert", Stoichiometry::volume(vec![a], vec![b]), 1.0).unwrap();
    });
    let compiled = compile(&sys.0, &sys.1).unwrap();
    let mut s = Scheduler::new(SchedulerConfig::default(), seeded_rng(9)).unwrap();
    s.initialize(SimState::new(&sys.1, 1), compiled.procs, compiled.graph).unwrap();
    s.set_count(CYT, A, 5).unwrap();

    let err = s.step().unwrap_err();
    assert!(matches!(err, KernelError::InvariantViolation(_)));
    assert_eq!(s.status(), SchedulerStatus::Faulted);
    assert_eq!(s.count(CYT, A), 5);
    assert_eq!(s.time(), 0.0);
    assert_eq!(s.nsteps(), 0);
    assert_eq!(s.extent(0).unwrap(), 0);
    assert_eq!(s.step().unwrap_err(), KernelError::Faulted);
}

#[test]
fn test_reset_restores_initial_state() {
    let sys = birth_death(5.0, 1.0);
    let config = SchedulerConfig { record_events: true, ..SchedulerConfig::with_seed(2) };
    let mut s = scheduler(&sys, config, seeded_rng(2));
    let initial = s.state().clone();
    s.run_events(50).unwrap();
    assert!(s.time() > 0.0);
    assert_eq!(s.event_log().len(), 50);

    s.reset().unwrap();
    assert_eq!(s.time(), 0.0);
    assert_eq!(s.nsteps(), 0);
    assert_eq!(s.state(), &initial);
    assert!(s.event_log().is_empty());
    assert_eq!(s.extent(0).unwrap(), 0);
    assert_eq!(s.extent(1).unwrap(), 0);
    assert_eq!(s.total_propensity(), 5.0);
    assert_eq!(s.status(), SchedulerStatus::Ready);
}

// --- Between-event control ---

#[test]
fn test_deactivated_process_never_fires() {
    let sys = channels(&[1.0, 1.0]);
    let mut s = scheduler(&sys, SchedulerConfig::default(), seeded_rng(8));
    s.set_active(0, false).unwrap();
    assert_eq!(s.propensity(0).unwrap(), 0.0);
    assert_eq!(s.total_propensity(), 1.0);
    s.run_events(200).unwrap();
    assert_eq!(s.extent(0).unwrap(), 0);
    assert_eq!(s.extent(1).unwrap(), 200);

    s.set_active(0, true).unwrap();
    assert_eq!(s.total_propensity(), 2.0);
    assert!(matches!(s.set_active(9, true), Err(KernelError::Unknown { .. })));
}

#[test]
fn test_volume_change_rescales_second_order() {
    let sys = cyt_model(|m| {
        let (a, b) = (m.species("A").unwrap(), m.species("B").unwrap());
        m.create_reaction("vsys", "dimer", Stoichiometry::volume(vec![a, a], vec![b]), 1.0e6).unwrap();
    });
    let mut s = scheduler(&sys, SchedulerConfig::default(), seeded_rng(0));
    s.set_count(CYT, A, 10).unwrap();
    let before = s.propensity(0).unwrap();
    s.set_comp_vol(0, 2.0e-18).unwrap();
    let after = s.propensity(0).unwrap();
    assert!((after - before / 2.0).abs() < 1e-12 * before);
    assert!(s.set_comp_vol(0, 0.0).is_err());
}

// --- Drift control ---

#[test]
fn test_incremental_propensities_match_full_recompute() {
    let sys = birth_death(20.0, 0.5);
    let config = SchedulerConfig { recompute_interval: u64::MAX, ..SchedulerConfig::with_seed(12) };
    let mut s = scheduler(&sys, config, seeded_rng(12));
    for _ in 0..2_000 {
        fired(s.step().unwrap());
        let mut total = 0.0;
        for (i, p) in s.processes().iter().enumerate() {
            let full = p.rate(s.state());
            assert_eq!(s.propensity(i).unwrap(), full);
            total += full;
        }
        assert!((s.total_propensity() - total).abs() < 1e-9 * total.max(1.0));
    }
}

#[test]
fn test_periodic_recompute_resets_running_total() {
    let sys = birth_death(3.0, 0.7);
    let config = SchedulerConfig { recompute_interval: 1, ..SchedulerConfig::with_seed(5) };
    let mut s = scheduler(&sys, config, seeded_rng(5));
    for _ in 0..100 {
        fired(s.step().unwrap());
    }
    // The next step starts with a full recompute; the total after it is
    // the plain sum of the cached propensities plus one incremental update.
    let sum: f64 = s.propensities().iter().sum();
    assert!((s.total_propensity() - sum).abs() < 1e-12 * sum);
}

#[test]
fn test_same_seed_same_trajectory() {
    let sys = birth_death(4.0, 0.3);
    let config = SchedulerConfig { record_events: true, ..SchedulerConfig::with_seed(77) };
    let mut a = scheduler(&sys, config.clone(), seeded_rng(77));
    let mut b = scheduler(&sys, config, seeded_rng(77));
    a.run_until(20.0).unwrap();
    b.run_until(20.0).unwrap();
    assert_eq!(a.event_log(), b.event_log());
    assert_eq!(a.state(), b.state());
}

#[test]
fn test_replicates_can_move_between_threads() {
    fn assert_send<T: Send>() {}
    assert_send::<Scheduler<crate::kernel::DefaultRng>>();
    assert_send::<crate::solver::Simulation>();
}
