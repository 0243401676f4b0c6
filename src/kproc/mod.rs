//!
//! Kinetic processes: one runtime instance per (reaction definition × region).
//!
//! Every process exposes the same capability set through `KProc` (propensity,
//! firing, dependency predicates). The concrete kinds form a closed enum,
//! `Process`, so the scheduler treats them uniformly without open-ended
//! dynamic dispatch.

pub mod reac;
pub mod sreac;

pub use reac::Reac;
pub use sreac::SReac;

use crate::deps::DepIndex;
use crate::error::KernelError;
use crate::state::SimState;
use crate::types::{CompIdx, PatchIdx, Region, SchedIdx, SpecIdx, AVOGADRO};

/// Capability interface shared by every kind of kinetic process.
pub trait KProc {
    /// Position in the global process list; fixed for the process's lifetime.
    fn sched_idx(&self) -> SchedIdx;

    /// Id of the reaction definition this process instantiates.
    fn reaction_id(&self) -> &str;

    /// The region whose reaction set produced this process.
    fn region(&self) -> Region;

    /// Called once after every process exists. Caches the schedule indices
    /// whose propensity must be recomputed after this process fires.
    /// Never touches counts.
    fn setup_deps(&mut self, index: &DepIndex);

    /// True iff a change of `spec` in compartment `comp` changes this
    /// process's propensity.
    fn dep_spec_comp(&self, spec: SpecIdx, comp: CompIdx) -> bool;

    /// True iff a change of `spec` on patch `patch` changes this process's
    /// propensity.
    fn dep_spec_patch(&self, spec: SpecIdx, patch: PatchIdx) -> bool;

    /// Restores the extent to zero. Schedule index and dependencies are kept.
    fn reset(&mut self);

    /// Recomputes the stochastic rate constant from current region sizes.
    fn reset_ccst(&mut self, state: &SimState) -> Result<(), KernelError>;

    /// Stochastic rate constant.
    fn c(&self) -> f64;

    /// Number of distinct reactant combinations available in `state`.
    fn h(&self, state: &SimState) -> f64;

    /// Propensity, `c() * h()`. Side-effect free.
    fn rate(&self, state: &SimState) -> f64;

    /// Fires one event: updates counts, bumps the extent and returns the
    /// schedule indices whose propensities are now stale.
    fn apply(&mut self, state: &mut SimState) -> Result<&[SchedIdx], KernelError>;

    fn extent(&self) -> u64;

    /// Cached dependency list (empty before `setup_deps`).
    fn deps(&self) -> &[SchedIdx];

    /// (region, species) pairs the propensity reads.
    fn reads(&self) -> Vec<(Region, SpecIdx)>;

    /// (region, species) pairs whose count changes when the process fires.
    fn writes(&self) -> Vec<(Region, SpecIdx)>;

    /// A reaction with no reactants and no products. Never fires.
    fn is_noop(&self) -> bool;

    fn is_active(&self) -> bool;

    fn set_active(&mut self, active: bool);

    fn depends_on(&self, spec: SpecIdx, region: Region) -> bool {
        match region {
            Region::Comp(c) => self.dep_spec_comp(spec, c),
            Region::Patch(p) => self.dep_spec_patch(spec, p),
        }
    }
}

/// A process of one of the supported kinds.
#[derive(Debug, Clone)]
pub enum Process {
    /// Volume reaction inside one compartment.
    Reac(Reac),
    /// Surface reaction on a patch, possibly moving molecules across it.
    SReac(SReac),
}

impl Process {
    fn inner(&self) -> &dyn KProc {
        match self {
            Process::Reac(r) => r,
            Process::SReac(s) => s,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn KProc {
        match self {
            Process::Reac(r) => r,
            Process::SReac(s) => s,
        }
    }
}

impl KProc for Process {
    fn sched_idx(&self) -> SchedIdx {
        self.inner().sched_idx()
    }

    fn reaction_id(&self) -> &str {
        self.inner().reaction_id()
    }

    fn region(&self) -> Region {
        self.inner().region()
    }

    fn setup_deps(&mut self, index: &DepIndex) {
        self.inner_mut().setup_deps(index)
    }

    fn dep_spec_comp(&self, spec: SpecIdx, comp: CompIdx) -> bool {
        self.inner().dep_spec_comp(spec, comp)
    }

    fn dep_spec_patch(&self, spec: SpecIdx, patch: PatchIdx) -> bool {
        self.inner().dep_spec_patch(spec, patch)
    }

    fn reset(&mut self) {
        self.inner_mut().reset()
    }

    fn reset_ccst(&mut self, state: &SimState) -> Result<(), KernelError> {
        self.inner_mut().reset_ccst(state)
    }

    fn c(&self) -> f64 {
        self.inner().c()
    }

    fn h(&self, state: &SimState) -> f64 {
        self.inner().h(state)
    }

    fn rate(&self, state: &SimState) -> f64 {
        self.inner().rate(state)
    }

    fn apply(&mut self, state: &mut SimState) -> Result<&[SchedIdx], KernelError> {
        self.inner_mut().apply(state)
    }

    fn extent(&self) -> u64 {
        self.inner().extent()
    }

    fn deps(&self) -> &[SchedIdx] {
        self.inner().deps()
    }

    fn reads(&self) -> Vec<(Region, SpecIdx)> {
        self.inner().reads()
    }

    fn writes(&self) -> Vec<(Region, SpecIdx)> {
        self.inner().writes()
    }

    fn is_noop(&self) -> bool {
        self.inner().is_noop()
    }

    fn is_active(&self) -> bool {
        self.inner().is_active()
    }

    fn set_active(&mut self, active: bool) {
        self.inner_mut().set_active(active)
    }
}

// --- Shared process machinery ----------------------------------------------

/// State and arithmetic common to every process kind. The kinds differ in
/// how they lay out reactant/product terms over regions and in how the
/// stochastic constant is scaled.
#[derive(Debug, Clone)]
pub(crate) struct ProcCore {
    sched_idx: SchedIdx,
    reaction: String,
    /// Reactant species with multiplicities, per region.
    lhs: Vec<(Region, SpecIdx, u32)>,
    /// Net count change per firing; zero entries removed.
    upd: Vec<(Region, SpecIdx, i64)>,
    noop: bool,
    pub(crate) kcst: f64,
    pub(crate) order: usize,
    pub(crate) ccst: f64,
    extent: u64,
    deps: Vec<SchedIdx>,
    active: bool,
}

impl ProcCore {
    pub(crate) fn new(
        sched_idx: SchedIdx,
        reaction: &str,
        kcst: f64,
        order: usize,
        lhs: Vec<(Region, SpecIdx, u32)>,
        terms: Vec<(Region, SpecIdx, i64)>,
        noop: bool,
    ) -> Self {
        let mut upd: Vec<(Region, SpecIdx, i64)> = Vec::new();
        for (region, spec, delta) in terms {
            match upd.iter_mut().find(|(r, s, _)| *r == region && *s == spec) {
                Some((_, _, d)) => *d += delta,
                None => upd.push((region, spec, delta)),
            }
        }
        upd.retain(|&(_, _, d)| d != 0);
        ProcCore {
            sched_idx,
            reaction: reaction.to_string(),
            lhs,
            upd,
            noop,
            kcst,
            order,
            ccst: 0.0,
            extent: 0,
            deps: Vec::new(),
            active: true,
        }
    }

    pub(crate) fn sched_idx(&self) -> SchedIdx {
        self.sched_idx
    }

    pub(crate) fn reaction(&self) -> &str {
        &self.reaction
    }

    pub(crate) fn h(&self, state: &SimState) -> f64 {
        self.lhs
            .iter()
            .map(|&(region, spec, n)| falling_factorial(state.count(region, spec), n))
            .product()
    }

    pub(crate) fn rate(&self, state: &SimState) -> f64 {
        if self.noop || !self.active {
            return 0.0;
        }
        self.ccst * self.h(state)
    }

    pub(crate) fn apply(&mut self, state: &mut SimState) -> Result<&[SchedIdx], KernelError> {
        // Validate every term before writing any, so a failure leaves counts untouched.
        for &(region, spec, delta) in &self.upd {
            state.check_delta(region, spec, delta).map_err(|e| self.context(e))?;
        }
        for &(region, spec, delta) in &self.upd {
            state.add_delta(region, spec, delta).map_err(|e| self.context(e))?;
        }
        self.extent += 1;
        Ok(&self.deps)
    }

    fn context(&self, err: KernelError) -> KernelError {
        match err {
            KernelError::InvariantViolation(msg) => KernelError::InvariantViolation(format!(
                "firing '{}' (process {}): {}",
                self.reaction, self.sched_idx, msg
            )),
            other => other,
        }
    }

    pub(crate) fn setup_deps(&mut self, index: &DepIndex) {
        let mut deps: Vec<SchedIdx> = Vec::new();
        if !self.noop {
            deps.push(self.sched_idx);
        }
        for &(region, spec, _) in &self.upd {
            deps.extend_from_slice(index.readers(region, spec));
        }
        deps.sort_unstable();
        deps.dedup();
        self.deps = deps;
    }

    pub(crate) fn reads_spec(&self, spec: SpecIdx, region: Region) -> bool {
        self.lhs.iter().any(|&(r, s, _)| r == region && s == spec)
    }

    pub(crate) fn reads(&self) -> Vec<(Region, SpecIdx)> {
        self.lhs.iter().map(|&(r, s, _)| (r, s)).collect()
    }

    pub(crate) fn writes(&self) -> Vec<(Region, SpecIdx)> {
        self.upd.iter().map(|&(r, s, _)| (r, s)).collect()
    }

    pub(crate) fn reset(&mut self) {
        self.extent = 0;
    }

    pub(crate) fn extent(&self) -> u64 {
        self.extent
    }

    pub(crate) fn deps(&self) -> &[SchedIdx] {
        &self.deps
    }

    pub(crate) fn is_noop(&self) -> bool {
        self.noop
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active
    }

    pub(crate) fn set_active(&mut self, active: bool) {
        self.active = active;
    }
}

/// `n · (n-1) · … · (n-k+1)`, or 0 when fewer than `k` molecules are present.
#[inline]
pub fn falling_factorial(n: u32, k: u32) -> f64 {
    if n < k {
        return 0.0;
    }
    (0..k).map(|i| f64::from(n - i)).product()
}

/// Mass-action scaling of a macroscopic constant to a stochastic one for a
/// reaction whose reactants live in a volume of `vol` m³.
///
/// Orders 0 and 1 are used as given. For order `n ≥ 2` the constant (in
/// `M^(1-n)·s⁻¹`) is divided by `(N_A · V_litres)^(n-1)`.
pub fn vol_ccst(kcst: f64, vol: f64, order: usize) -> f64 {
    if order <= 1 {
        return kcst;
    }
    let vscale = 1.0e3 * vol * AVOGADRO;
    kcst / vscale.powi(order as i32 - 1)
}

/// As `vol_ccst` for purely surface reactions on a patch of `area` m², with
/// the constant in `(mol·m⁻²)^(1-n)·s⁻¹`.
pub fn area_ccst(kcst: f64, area: f64, order: usize) -> f64 {
    if order <= 1 {
        return kcst;
    }
    let ascale = area * AVOGADRO;
    kcst / ascale.powi(order as i32 - 1)
}

/// Multiplicities of a multiset placed in a single region.
pub(crate) fn lhs_terms(region: Region, specs: &[crate::model::SpeciesRef]) -> Vec<(Region, SpecIdx, u32)> {
    crate::model::species::multiplicities(specs)
        .into_iter()
        .map(|(spec, n)| (region, spec, n))
        .collect()
}

/// One `(region, species, ±1)` term per multiset entry.
pub(crate) fn upd_terms(region: Region, specs: &[crate::model::SpeciesRef], sign: i64) -> impl Iterator<Item = (Region, SpecIdx, i64)> + '_ {
    specs.iter().map(move |s| (region, s.idx(), sign))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_falling_factorial() {
        assert_eq!(falling_factorial(5, 0), 1.0);
        assert_eq!(falling_factorial(5, 1), 5.0);
        assert_eq!(falling_factorial(5, 2), 20.0);
        assert_eq!(falling_factorial(5, 3), 60.0);
        assert_eq!(falling_factorial(1, 2), 0.0);
        assert_eq!(falling_factorial(0, 1), 0.0);
        assert_eq!(falling_factorial(2, 2), 2.0);
    }

    #[test]
    fn test_ccst_scaling() {
        assert_eq!(vol_ccst(3.0, 1.0e-18, 0), 3.0);
        assert_eq!(vol_ccst(3.0, 1.0e-18, 1), 3.0);
        let vscale = 1.0e3 * 1.0e-18 * AVOGADRO;
        let c2 = vol_ccst(1.0e6, 1.0e-18, 2);
        assert!((c2 - 1.0e6 / vscale).abs() < 1e-12 * c2.abs());
        let c3 = vol_ccst(1.0e6, 1.0e-18, 3);
        assert!((c3 - 1.0e6 / (vscale * vscale)).abs() < 1e-12 * c3.abs());
        let a2 = area_ccst(2.0, 1.0e-12, 2);
        assert!((a2 - 2.0 / (1.0e-12 * AVOGADRO)).abs() < 1e-12 * a2.abs());
    }

    #[test]
    fn test_update_terms_merge_and_drop_zero() {
        let r = Region::Comp(0);
        let core = ProcCore::new(
            0,
            "cat",
            1.0,
            2,
            vec![(r, 0, 1), (r, 1, 1)],
            vec![(r, 0, -1), (r, 1, -1), (r, 0, 1), (r, 2, 1)],
            false,
        );
        assert_eq!(core.writes(), vec![(r, 1), (r, 2)]);
        assert_eq!(core.reads(), vec![(r, 0), (r, 1)]);
    }
}
