//! Volume reaction inside a single compartment.

use crate::deps::DepIndex;
use crate::error::{KernelError, ModelError};
use crate::kproc::{lhs_terms, upd_terms, vol_ccst, KProc, ProcCore};
use crate::model::{Reaction, ReactionSetKind};
use crate::state::SimState;
use crate::types::{CompIdx, PatchIdx, Region, SchedIdx, SpecIdx};

#[derive(Debug, Clone)]
pub struct Reac {
    core: ProcCore,
    comp: CompIdx,
}

impl Reac {
    pub fn new(sched_idx: SchedIdx, def: &Reaction, comp: CompIdx, state: &SimState) -> Result<Self, KernelError> {
        if def.kind() != ReactionSetKind::Volume {
            return Err(ModelError::InvalidGeometry(format!(
                "surface reaction '{}' cannot be placed in a compartment",
                def.id()
            ))
            .into());
        }
        let region = Region::Comp(comp);
        let lhs = lhs_terms(region, def.vlhs());
        let terms = upd_terms(region, def.vlhs(), -1)
            .chain(upd_terms(region, def.irhs(), 1))
            .collect();
        let noop = def.vlhs().is_empty() && def.irhs().is_empty();
        let mut reac = Reac {
            core: ProcCore::new(sched_idx, def.id(), def.kcst(), def.order(), lhs, terms, noop),
            comp,
        };
        reac.reset_ccst(state)?;
        Ok(reac)
    }

    pub fn comp(&self) -> CompIdx {
        self.comp
    }

    pub fn kcst(&self) -> f64 {
        self.core.kcst
    }

    pub fn order(&self) -> usize {
        self.core.order
    }
}

impl KProc for Reac {
    fn sched_idx(&self) -> SchedIdx {
        self.core.sched_idx()
    }

    fn reaction_id(&self) -> &str {
        self.core.reaction()
    }

    fn region(&self) -> Region {
        Region::Comp(self.comp)
    }

    fn setup_deps(&mut self, index: &DepIndex) {
        self.core.setup_deps(index)
    }

    fn dep_spec_comp(&self, spec: SpecIdx, comp: CompIdx) -> bool {
        comp == self.comp && self.core.reads_spec(spec, Region::Comp(comp))
    }

    fn dep_spec_patch(&self, _spec: SpecIdx, _patch: PatchIdx) -> bool {
        false
    }

    fn reset(&mut self) {
        self.core.reset()
    }

    fn reset_ccst(&mut self, state: &SimState) -> Result<(), KernelError> {
        let vol = state.comp(self.comp)?.vol();
        self.core.ccst = vol_ccst(self.core.kcst, vol, self.core.order);
        Ok(())
    }

    fn c(&self) -> f64 {
        self.core.ccst
    }

    fn h(&self, state: &SimState) -> f64 {
        self.core.h(state)
    }

    fn rate(&self, state: &SimState) -> f64 {
        self.core.rate(state)
    }

    fn apply(&mut self, state: &mut SimState) -> Result<&[SchedIdx], KernelError> {
        self.core.apply(state)
    }

    fn extent(&self) -> u64 {
        self.core.extent()
    }

    fn deps(&self) -> &[SchedIdx] {
        self.core.deps()
    }

    fn reads(&self) -> Vec<(Region, SpecIdx)> {
        self.core.reads()
    }

    fn writes(&self) -> Vec<(Region, SpecIdx)> {
        self.core.writes()
    }

    fn is_noop(&self) -> bool {
        self.core.is_noop()
    }

    fn is_active(&self) -> bool {
        self.core.is_active()
    }

    fn set_active(&mut self, active: bool) {
        self.core.set_active(active)
    }
}
