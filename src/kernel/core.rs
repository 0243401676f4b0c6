//!
//! Direct-method event scheduler.
//!
//! The scheduler owns, for one replicate, the region counts, the kinetic
//! processes, their dependency graph and the random stream. Each `step()`
//! selects one process with probability proportional to its propensity,
//! advances time by an exponential wait, fires the process and recomputes
//! only the propensities named by its dependency row.

use crate::config::SchedulerConfig;
use crate::deps::DependencyGraph;
use crate::error::KernelError;
use crate::kernel::runtime::RandomSource;
use crate::kproc::{KProc, Process};
use crate::state::SimState;
use crate::types::{CompIdx, PatchIdx, Region, SchedIdx, SpecIdx};

/// Lifecycle of a scheduler.
#[derive(Debug, Copy, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SchedulerStatus {
    Uninitialized,
    Ready,
    Running,
    /// Total propensity reached zero; no further events are possible.
    Halted,
    /// An invariant violation stopped the replicate.
    Faulted,
}

/// One fired event.
#[derive(Debug, Copy, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FiredEvent {
    /// Simulation time at which the event occurred.
    pub time: f64,
    pub sched_idx: SchedIdx,
    /// Extent of the process after firing.
    pub extent: u64,
}

/// Result of a single `step()`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum StepOutcome {
    Fired(FiredEvent),
    /// Total propensity is zero. This is a normal termination.
    Halted,
}

/// Summary of a `run_until` / `run_events` call.
#[derive(Debug, Copy, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RunSummary {
    /// Events fired during this call.
    pub events: u64,
    /// Simulation time when the call returned.
    pub time: f64,
    pub status: SchedulerStatus,
}

enum Advance {
    Fired(FiredEvent),
    Halted,
    /// The next event would fall after the time limit; nothing was fired.
    Limit,
}

/// The direct-method kernel for a single replicate.
#[derive(Debug, Clone)]
pub struct Scheduler<R: RandomSource> {
    config: SchedulerConfig,
    status: SchedulerStatus,
    time: f64,
    nsteps: u64,
    steps_since_recompute: u64,
    state: SimState,
    /// Counts at `initialize`, restored by `reset`.
    initial_state: SimState,
    procs: Vec<Process>,
    graph: DependencyGraph,
    propensities: Vec<f64>,
    /// Running total of `propensities`.
    a0: f64,
    /// Processes with non-zero propensity; zero means the system is exhausted.
    n_nonzero: usize,
    rng: R,
    event_log: Vec<FiredEvent>,
    scratch: Vec<SchedIdx>,
}

impl<R: RandomSource> Scheduler<R> {
    pub fn new(config: SchedulerConfig, rng: R) -> Result<Self, KernelError> {
        config.validate()?;
        Ok(Scheduler {
            config,
            status: SchedulerStatus::Uninitialized,
            time: 0.0,
            nsteps: 0,
            steps_since_recompute: 0,
            state: SimState::default(),
            initial_state: SimState::default(),
            procs: Vec::new(),
            graph: DependencyGraph::default(),
            propensities: Vec::new(),
            a0: 0.0,
            n_nonzero: 0,
            rng,
            event_log: Vec::new(),
            scratch: Vec::new(),
        })
    }

    /// Takes ownership of the replicate's counts, processes and dependency
    /// graph, and computes every initial propensity. Uninitialized → Ready.
    pub fn initialize(&mut self, state: SimState, procs: Vec<Process>, graph: DependencyGraph) -> Result<(), KernelError> {
        if self.status != SchedulerStatus::Uninitialized {
            return Err(KernelError::AlreadyInitialized);
        }
        graph.verify(&procs)?;
        self.initial_state = state.clone();
        self.state = state;
        self.propensities = vec![0.0; procs.len()];
        self.procs = procs;
        self.graph = graph;
        self.recompute_all()?;
        self.status = SchedulerStatus::Ready;
        tracing::debug!(
            processes = self.procs.len(),
            edges = self.graph.edge_count(),
            a0 = self.a0,
            "scheduler initialized"
        );
        Ok(())
    }

    // --- Event loop --------------------------------------------------------

    /// Fires the next event, or reports a normal halt when no event is possible.
    pub fn step(&mut self) -> Result<StepOutcome, KernelError> {
        self.check_runnable()?;
        match self.advance(f64::INFINITY)? {
            Advance::Fired(ev) => Ok(StepOutcome::Fired(ev)),
            Advance::Halted | Advance::Limit => Ok(StepOutcome::Halted),
        }
    }

    /// Fires events until simulation time reaches `end_time`, the system is
    /// exhausted or `max_events_per_run` events have fired. Time is left at
    /// `end_time` unless the event cap stopped the run first.
    pub fn run_until(&mut self, end_time: f64) -> Result<RunSummary, KernelError> {
        self.check_runnable()?;
        if end_time.is_nan() || end_time < self.time {
            return Err(KernelError::InvalidArgument(format!(
                "end time {} is before current time {}",
                end_time, self.time
            )));
        }
        let mut events = 0u64;
        loop {
            if self.config.max_events_per_run.is_some_and(|max| events >= max) {
                break;
            }
            match self.advance(end_time)? {
                Advance::Fired(_) => events += 1,
                Advance::Halted | Advance::Limit => {
                    self.time = end_time;
                    break;
                }
            }
        }
        Ok(self.summary(events))
    }

    /// Fires up to `count` events, stopping early on a normal halt.
    pub fn run_events(&mut self, count: u64) -> Result<RunSummary, KernelError> {
        self.check_runnable()?;
        let mut events = 0u64;
        while events < count {
            match self.advance(f64::INFINITY)? {
                Advance::Fired(_) => events += 1,
                Advance::Halted | Advance::Limit => break,
            }
        }
        Ok(self.summary(events))
    }

    fn summary(&self, events: u64) -> RunSummary {
        RunSummary { events, time: self.time, status: self.status }
    }

    fn check_runnable(&self) -> Result<(), KernelError> {
        match self.status {
            SchedulerStatus::Uninitialized => Err(KernelError::NotInitialized),
            SchedulerStatus::Faulted => Err(KernelError::Faulted),
            _ => Ok(()),
        }
    }

    fn advance(&mut self, limit: f64) -> Result<Advance, KernelError> {
        if self.status == SchedulerStatus::Halted {
            return Ok(Advance::Halted);
        }
        if self.steps_since_recompute >= self.config.recompute_interval {
            self.guarded(|s| s.recompute_all())?;
        }
        if self.n_nonzero == 0 {
            self.status = SchedulerStatus::Halted;
            tracing::info!(time = self.time, events = self.nsteps, "total propensity is zero, halting");
            return Ok(Advance::Halted);
        }
        if self.a0.is_nan() || self.a0 <= 0.0 {
            tracing::warn!(a0 = self.a0, "running total drifted to non-positive, recomputing");
            self.guarded(|s| s.recompute_all())?;
        }

        let a0 = self.a0;
        let dt = self.rng.exponential(a0);
        let next_time = self.time + dt;
        if next_time > limit {
            return Ok(Advance::Limit);
        }

        let draw = self.rng.uniform() * a0;
        let chosen = self.select(draw);
        let Some(chosen) = chosen else {
            // n_nonzero > 0 guarantees a candidate; reaching here means the
            // cached propensities are corrupt.
            return self.fault(KernelError::InvariantViolation(format!(
                "no process selected with a0 = {} and {} non-zero propensities",
                a0, self.n_nonzero
            )));
        };

        // Any failure while firing leaves the cached propensities unusable.
        if let Err(e) = self.fire(chosen) {
            return self.fault(e);
        }
        self.time = next_time;
        self.nsteps += 1;
        self.steps_since_recompute += 1;
        self.status = SchedulerStatus::Running;

        let ev = FiredEvent { time: self.time, sched_idx: chosen, extent: self.procs[chosen].extent() };
        tracing::trace!(time = ev.time, process = chosen, a0 = self.a0, "fired");
        if self.config.record_events {
            self.event_log.push(ev);
        }
        Ok(Advance::Fired(ev))
    }

    /// First process whose cumulative propensity interval `[cum_prev, cum)`
    /// contains `draw`. Zero-propensity processes own empty intervals and
    /// are never chosen. Rounding that pushes `draw` past the final sum
    /// selects the last non-zero process.
    fn select(&self, draw: f64) -> Option<SchedIdx> {
        let mut cum = 0.0;
        let mut last_nonzero = None;
        for (i, &a) in self.propensities.iter().enumerate() {
            if a > 0.0 {
                cum += a;
                last_nonzero = Some(i);
                if draw < cum {
                    return Some(i);
                }
            }
        }
        last_nonzero
    }

    fn fire(&mut self, chosen: SchedIdx) -> Result<(), KernelError> {
        let mut upd = std::mem::take(&mut self.scratch);
        upd.clear();
        {
            let deps = self.procs[chosen].apply(&mut self.state)?;
            upd.extend_from_slice(deps);
        }
        let result = self.update_propensities(&upd);
        self.scratch = upd;
        result?;
        if self.a0 < 0.0 {
            tracing::warn!(a0 = self.a0, "running total went negative, recomputing");
            self.recompute_all()?;
        }
        Ok(())
    }

    fn update_propensities(&mut self, idxs: &[SchedIdx]) -> Result<(), KernelError> {
        for &j in idxs {
            let proc = self.procs.get(j).ok_or_else(|| {
                KernelError::InvariantViolation(format!("dependency on unknown process {}", j))
            })?;
            let new = checked_rate(proc, &self.state)?;
            let old = self.propensities[j];
            match (old > 0.0, new > 0.0) {
                (false, true) => self.n_nonzero += 1,
                (true, false) => self.n_nonzero -= 1,
                _ => {}
            }
            self.a0 += new - old;
            self.propensities[j] = new;
        }
        Ok(())
    }

    /// Recomputes every propensity and the total from scratch.
    fn recompute_all(&mut self) -> Result<(), KernelError> {
        let mut a0 = 0.0;
        let mut n_nonzero = 0;
        for (i, p) in self.procs.iter().enumerate() {
            let a = checked_rate(p, &self.state)?;
            if a > 0.0 {
                n_nonzero += 1;
            }
            a0 += a;
            self.propensities[i] = a;
        }
        self.a0 = a0;
        self.n_nonzero = n_nonzero;
        self.steps_since_recompute = 0;
        Ok(())
    }

    /// Runs `f`; an invariant violation faults the scheduler.
    fn guarded<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, KernelError>) -> Result<T, KernelError> {
        match f(self) {
            Ok(v) => Ok(v),
            Err(e) if e.is_fatal() => self.fault(e),
            Err(e) => Err(e),
        }
    }

    fn fault<T>(&mut self, err: KernelError) -> Result<T, KernelError> {
        tracing::error!(time = self.time, events = self.nsteps, error = %err, "scheduler faulted");
        self.status = SchedulerStatus::Faulted;
        Err(err)
    }

    // --- Control between events --------------------------------------------

    /// Restores the counts captured at `initialize`, zeroes time and every
    /// extent and recomputes all propensities. The random stream continues;
    /// use `set_rng` to start a fresh one.
    pub fn reset(&mut self) -> Result<(), KernelError> {
        self.check_runnable()?;
        for p in self.procs.iter_mut() {
            p.reset();
        }
        self.state = self.initial_state.clone();
        // Geometry may have changed since initialize.
        for p in self.procs.iter_mut() {
            p.reset_ccst(&self.state)?;
        }
        self.time = 0.0;
        self.nsteps = 0;
        self.event_log.clear();
        self.guarded(|s| s.recompute_all())?;
        self.status = SchedulerStatus::Ready;
        tracing::debug!("scheduler reset");
        Ok(())
    }

    pub fn set_rng(&mut self, rng: R) {
        self.rng = rng;
    }

    /// Sets a count between events and refreshes the propensities that read it.
    pub fn set_count(&mut self, region: Region, spec: SpecIdx, n: u32) -> Result<(), KernelError> {
        self.check_runnable()?;
        self.state.set_count(region, spec, n)?;
        let readers = self.graph.readers(region, spec).to_vec();
        self.guarded(|s| s.update_propensities(&readers))?;
        self.wake();
        Ok(())
    }

    /// Changes a compartment volume and rescales every stochastic constant.
    pub fn set_comp_vol(&mut self, comp: CompIdx, vol: f64) -> Result<(), KernelError> {
        self.check_runnable()?;
        self.state.set_comp_vol(comp, vol)?;
        self.rescale()
    }

    /// Changes a patch area and rescales every stochastic constant.
    pub fn set_patch_area(&mut self, patch: PatchIdx, area: f64) -> Result<(), KernelError> {
        self.check_runnable()?;
        self.state.set_patch_area(patch, area)?;
        self.rescale()
    }

    fn rescale(&mut self) -> Result<(), KernelError> {
        for p in self.procs.iter_mut() {
            p.reset_ccst(&self.state)?;
        }
        self.guarded(|s| s.recompute_all())?;
        self.wake();
        Ok(())
    }

    /// Enables or disables a process. A disabled process has zero propensity.
    pub fn set_active(&mut self, idx: SchedIdx, active: bool) -> Result<(), KernelError> {
        self.check_runnable()?;
        let p = self.procs.get_mut(idx).ok_or_else(|| unknown_process(idx))?;
        p.set_active(active);
        self.guarded(|s| s.update_propensities(&[idx]))?;
        self.wake();
        Ok(())
    }

    /// A halted system whose counts were changed from outside may run again.
    fn wake(&mut self) {
        if self.status == SchedulerStatus::Halted && self.n_nonzero > 0 {
            self.status = SchedulerStatus::Ready;
        }
    }

    // --- Read-only accessors -----------------------------------------------

    pub fn status(&self) -> SchedulerStatus {
        self.status
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    /// Events fired since `initialize` or the last `reset`.
    pub fn nsteps(&self) -> u64 {
        self.nsteps
    }

    pub fn total_propensity(&self) -> f64 {
        self.a0
    }

    pub fn propensity(&self, idx: SchedIdx) -> Result<f64, KernelError> {
        self.propensities.get(idx).copied().ok_or_else(|| unknown_process(idx))
    }

    pub fn propensities(&self) -> &[f64] {
        &self.propensities
    }

    pub fn extent(&self, idx: SchedIdx) -> Result<u64, KernelError> {
        self.procs.get(idx).map(|p| p.extent()).ok_or_else(|| unknown_process(idx))
    }

    pub fn state(&self) -> &SimState {
        &self.state
    }

    pub fn processes(&self) -> &[Process] {
        &self.procs
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn event_log(&self) -> &[FiredEvent] {
        &self.event_log
    }

    pub fn count(&self, region: Region, spec: SpecIdx) -> u32 {
        self.state.count(region, spec)
    }
}

fn checked_rate(p: &Process, state: &SimState) -> Result<f64, KernelError> {
    let a = p.rate(state);
    if !a.is_finite() || a < 0.0 {
        return Err(KernelError::InvariantViolation(format!(
            "process {} ('{}') has invalid propensity {}",
            p.sched_idx(),
            p.reaction_id(),
            a
        )));
    }
    Ok(a)
}

fn unknown_process(idx: SchedIdx) -> KernelError {
    KernelError::Unknown { kind: "process", id: format!("#{}", idx) }
}
