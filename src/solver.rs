//!
//! Compilation of a model and geometry into a runnable simulation.
//!
//! `compile` instantiates one kinetic process per (reaction × region the
//! reaction's set is attached to), compartments first and then patches, in
//! declaration order. `Simulation` wraps the resulting scheduler with
//! lookups by id, so callers never handle schedule indices directly.

use std::collections::HashMap;

use crate::config::SchedulerConfig;
use crate::deps::DependencyGraph;
use crate::error::{KernelError, ModelError};
use crate::geom::Geometry;
use crate::kernel::{seeded_rng, DefaultRng, FiredEvent, RandomSource, RunSummary, Scheduler, SchedulerStatus, StepOutcome};
use crate::kproc::{KProc, Process, Reac, SReac};
use crate::model::{Model, ReactionSetKind};
use crate::state::SimState;
use crate::types::{CompIdx, ModelId, PatchIdx, Region, SchedIdx, SpecIdx};

/// Output of `compile`: everything `Scheduler::initialize` needs, plus the
/// id table of the processes.
#[derive(Debug, Clone)]
pub struct Compiled {
    pub state: SimState,
    pub procs: Vec<Process>,
    pub graph: DependencyGraph,
    index: HashMap<(Region, String), SchedIdx>,
}

impl Compiled {
    /// Schedule index of reaction `reaction` in `region`.
    pub fn process(&self, region: Region, reaction: &str) -> Option<SchedIdx> {
        self.index.get(&(region, reaction.to_string())).copied()
    }
}

/// Instantiates the processes of `model` over `geom` and builds their
/// dependency graph. All counts start at zero.
pub fn compile(model: &Model, geom: &Geometry) -> Result<Compiled, KernelError> {
    let state = SimState::new(geom, model.species_count());
    let mut procs: Vec<Process> = Vec::new();
    let mut index: HashMap<(Region, String), SchedIdx> = HashMap::new();

    let mut register = |region: Region, region_id: &str, reaction: &str, next: SchedIdx| {
        if index.insert((region, reaction.to_string()), next).is_some() {
            return Err(KernelError::from(ModelError::DuplicateId(format!("{}.{}", region_id, reaction))));
        }
        Ok(())
    };

    for (ci, comp) in geom.comps().iter().enumerate() {
        for set_id in comp.volsys() {
            let set = model
                .reaction_set(set_id)
                .ok_or_else(|| ModelError::UnknownReactionSet(set_id.clone()))?;
            if set.kind() != ReactionSetKind::Volume {
                return Err(ModelError::InvalidGeometry(format!(
                    "surface system '{}' attached to compartment '{}'",
                    set_id,
                    comp.id()
                ))
                .into());
            }
            for def in set.reactions() {
                register(Region::Comp(ci), comp.id(), def.id(), procs.len())?;
                let reac = Reac::new(procs.len(), def, ci, &state)?;
                procs.push(Process::Reac(reac));
            }
        }
    }

    for (pi, patch) in geom.patches().iter().enumerate() {
        for set_id in patch.surfsys() {
            let set = model
                .reaction_set(set_id)
                .ok_or_else(|| ModelError::UnknownReactionSet(set_id.clone()))?;
            if set.kind() != ReactionSetKind::Surface {
                return Err(ModelError::InvalidGeometry(format!(
                    "volume system '{}' attached to patch '{}'",
                    set_id,
                    patch.id()
                ))
                .into());
            }
            for def in set.reactions() {
                register(Region::Patch(pi), patch.id(), def.id(), procs.len())?;
                let sreac = SReac::new(procs.len(), def, pi, patch.id(), &state)?;
                procs.push(Process::SReac(sreac));
            }
        }
    }

    let graph = DependencyGraph::build(&mut procs)?;
    tracing::debug!(
        comps = geom.comps().len(),
        patches = geom.patches().len(),
        processes = procs.len(),
        "compiled model"
    );
    Ok(Compiled { state, procs, graph, index })
}

/// A compiled, initialized replicate addressed by entity ids.
#[derive(Debug, Clone)]
pub struct Simulation<R: RandomSource = DefaultRng> {
    model_id: ModelId,
    generation: u64,
    species: HashMap<String, SpecIdx>,
    comps: HashMap<String, CompIdx>,
    patches: HashMap<String, PatchIdx>,
    procs: HashMap<(Region, String), SchedIdx>,
    sched: Scheduler<R>,
}

impl Simulation<DefaultRng> {
    /// Uses the default generator seeded from `config.seed`.
    pub fn seeded(model: &Model, geom: &Geometry, config: SchedulerConfig) -> Result<Self, KernelError> {
        let rng = seeded_rng(config.seed);
        Simulation::new(model, geom, config, rng)
    }
}

impl<R: RandomSource> Simulation<R> {
    pub fn new(model: &Model, geom: &Geometry, config: SchedulerConfig, rng: R) -> Result<Self, KernelError> {
        let compiled = compile(model, geom)?;
        let mut sched = Scheduler::new(config, rng)?;
        let Compiled { state, procs, graph, index } = compiled;
        sched.initialize(state, procs, graph)?;

        let species = model.all_species().iter().map(|s| (s.id().to_string(), s.idx())).collect();
        let comps = geom.comps().iter().enumerate().map(|(i, c)| (c.id().to_string(), i)).collect();
        let patches = geom.patches().iter().enumerate().map(|(i, p)| (p.id().to_string(), i)).collect();
        Ok(Simulation {
            model_id: model.id(),
            generation: model.generation(),
            species,
            comps,
            patches,
            procs: index,
            sched,
        })
    }

    /// True when `model` is not the model this simulation was compiled from,
    /// or has been mutated since.
    pub fn is_stale(&self, model: &Model) -> bool {
        model.id() != self.model_id || model.generation() != self.generation
    }

    pub fn scheduler(&self) -> &Scheduler<R> {
        &self.sched
    }

    // --- Control ---

    pub fn step(&mut self) -> Result<StepOutcome, KernelError> {
        self.sched.step()
    }

    pub fn run_until(&mut self, end_time: f64) -> Result<RunSummary, KernelError> {
        self.sched.run_until(end_time)
    }

    pub fn run_events(&mut self, count: u64) -> Result<RunSummary, KernelError> {
        self.sched.run_events(count)
    }

    pub fn reset(&mut self) -> Result<(), KernelError> {
        self.sched.reset()
    }

    pub fn time(&self) -> f64 {
        self.sched.time()
    }

    pub fn status(&self) -> SchedulerStatus {
        self.sched.status()
    }

    pub fn event_log(&self) -> &[FiredEvent] {
        self.sched.event_log()
    }

    // --- Counts ---

    pub fn comp_count(&self, comp: &str, spec: &str) -> Result<u32, KernelError> {
        let region = Region::Comp(self.comp_idx(comp)?);
        Ok(self.sched.count(region, self.spec_idx(spec)?))
    }

    pub fn set_comp_count(&mut self, comp: &str, spec: &str, n: u32) -> Result<(), KernelError> {
        let region = Region::Comp(self.comp_idx(comp)?);
        let spec = self.spec_idx(spec)?;
        self.sched.set_count(region, spec, n)
    }

    pub fn patch_count(&self, patch: &str, spec: &str) -> Result<u32, KernelError> {
        let region = Region::Patch(self.patch_idx(patch)?);
        Ok(self.sched.count(region, self.spec_idx(spec)?))
    }

    pub fn set_patch_count(&mut self, patch: &str, spec: &str, n: u32) -> Result<(), KernelError> {
        let region = Region::Patch(self.patch_idx(patch)?);
        let spec = self.spec_idx(spec)?;
        self.sched.set_count(region, spec, n)
    }

    // --- Geometry ---

    pub fn comp_vol(&self, comp: &str) -> Result<f64, KernelError> {
        Ok(self.sched.state().comp(self.comp_idx(comp)?)?.vol())
    }

    pub fn set_comp_vol(&mut self, comp: &str, vol: f64) -> Result<(), KernelError> {
        let idx = self.comp_idx(comp)?;
        self.sched.set_comp_vol(idx, vol)
    }

    pub fn patch_area(&self, patch: &str) -> Result<f64, KernelError> {
        Ok(self.sched.state().patch(self.patch_idx(patch)?)?.area())
    }

    pub fn set_patch_area(&mut self, patch: &str, area: f64) -> Result<(), KernelError> {
        let idx = self.patch_idx(patch)?;
        self.sched.set_patch_area(idx, area)
    }

    // --- Reactions ---

    pub fn comp_reac_extent(&self, comp: &str, reac: &str) -> Result<u64, KernelError> {
        let idx = self.proc_idx(Region::Comp(self.comp_idx(comp)?), comp, reac)?;
        self.sched.extent(idx)
    }

    pub fn patch_reac_extent(&self, patch: &str, reac: &str) -> Result<u64, KernelError> {
        let idx = self.proc_idx(Region::Patch(self.patch_idx(patch)?), patch, reac)?;
        self.sched.extent(idx)
    }

    pub fn comp_reac_propensity(&self, comp: &str, reac: &str) -> Result<f64, KernelError> {
        let idx = self.proc_idx(Region::Comp(self.comp_idx(comp)?), comp, reac)?;
        self.sched.propensity(idx)
    }

    pub fn patch_reac_propensity(&self, patch: &str, reac: &str) -> Result<f64, KernelError> {
        let idx = self.proc_idx(Region::Patch(self.patch_idx(patch)?), patch, reac)?;
        self.sched.propensity(idx)
    }

    /// Stochastic rate constant `c` of a compartment reaction.
    pub fn comp_reac_c(&self, comp: &str, reac: &str) -> Result<f64, KernelError> {
        let idx = self.proc_idx(Region::Comp(self.comp_idx(comp)?), comp, reac)?;
        Ok(self.sched.processes()[idx].c())
    }

    pub fn patch_reac_c(&self, patch: &str, reac: &str) -> Result<f64, KernelError> {
        let idx = self.proc_idx(Region::Patch(self.patch_idx(patch)?), patch, reac)?;
        Ok(self.sched.processes()[idx].c())
    }

    pub fn set_comp_reac_active(&mut self, comp: &str, reac: &str, active: bool) -> Result<(), KernelError> {
        let idx = self.proc_idx(Region::Comp(self.comp_idx(comp)?), comp, reac)?;
        self.sched.set_active(idx, active)
    }

    pub fn set_patch_reac_active(&mut self, patch: &str, reac: &str, active: bool) -> Result<(), KernelError> {
        let idx = self.proc_idx(Region::Patch(self.patch_idx(patch)?), patch, reac)?;
        self.sched.set_active(idx, active)
    }

    fn spec_idx(&self, id: &str) -> Result<SpecIdx, KernelError> {
        self.species.get(id).copied().ok_or_else(|| unknown("species", id))
    }

    fn comp_idx(&self, id: &str) -> Result<CompIdx, KernelError> {
        self.comps.get(id).copied().ok_or_else(|| unknown("compartment", id))
    }

    fn patch_idx(&self, id: &str) -> Result<PatchIdx, KernelError> {
        self.patches.get(id).copied().ok_or_else(|| unknown("patch", id))
    }

    fn proc_idx(&self, region: Region, region_id: &str, reac: &str) -> Result<SchedIdx, KernelError> {
        self.procs
            .get(&(region, reac.to_string()))
            .copied()
            .ok_or_else(|| unknown("reaction", &format!("{}.{}", region_id, reac)))
    }
}

fn unknown(kind: &'static str, id: &str) -> KernelError {
    KernelError::Unknown { kind, id: id.to_string() }
}
