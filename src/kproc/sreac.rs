//! Surface reaction on a patch.
//!
//! Volume reactants come from the outer compartment (outer orientation) or
//! the inner one (inner orientation). Inner products go to the inner
//! compartment and outer products to the outer compartment regardless.

use crate::deps::DepIndex;
use crate::error::{KernelError, ModelError};
use crate::kproc::{area_ccst, lhs_terms, upd_terms, vol_ccst, KProc, ProcCore};
use crate::model::{Reaction, ReactionSetKind};
use crate::state::SimState;
use crate::types::{CompIdx, Orientation, PatchIdx, Region, SchedIdx, SpecIdx};

#[derive(Debug, Clone)]
pub struct SReac {
    core: ProcCore,
    patch: PatchIdx,
    /// Compartment supplying the volume reactants, if any.
    rcomp: Option<CompIdx>,
}

impl SReac {
    pub fn new(
        sched_idx: SchedIdx,
        def: &Reaction,
        patch: PatchIdx,
        patch_id: &str,
        state: &SimState,
    ) -> Result<Self, KernelError> {
        if def.kind() != ReactionSetKind::Surface {
            return Err(ModelError::InvalidGeometry(format!(
                "volume reaction '{}' cannot be placed on a patch",
                def.id()
            ))
            .into());
        }
        let p = state.patch(patch)?;
        let icomp = p.icomp();
        let missing_outer = || ModelError::MissingOuterCompartment {
            reaction: def.id().to_string(),
            patch: patch_id.to_string(),
        };

        let rcomp = if def.vlhs().is_empty() {
            None
        } else {
            match def.orientation() {
                Orientation::Inner => Some(icomp),
                Orientation::Outer => Some(p.ocomp().ok_or_else(missing_outer)?),
            }
        };
        let ocomp = if def.orhs().is_empty() { None } else { Some(p.ocomp().ok_or_else(missing_outer)?) };

        let sregion = Region::Patch(patch);
        let mut lhs = Vec::new();
        let mut terms = Vec::new();
        if let Some(rc) = rcomp {
            lhs.extend(lhs_terms(Region::Comp(rc), def.vlhs()));
            terms.extend(upd_terms(Region::Comp(rc), def.vlhs(), -1));
        }
        lhs.extend(lhs_terms(sregion, def.slhs()));
        terms.extend(upd_terms(sregion, def.slhs(), -1));
        terms.extend(upd_terms(Region::Comp(icomp), def.irhs(), 1));
        terms.extend(upd_terms(sregion, def.srhs(), 1));
        if let Some(oc) = ocomp {
            terms.extend(upd_terms(Region::Comp(oc), def.orhs(), 1));
        }

        let noop = def.all_species().is_empty();
        let mut sreac = SReac {
            core: ProcCore::new(sched_idx, def.id(), def.kcst(), def.order(), lhs, terms, noop),
            patch,
            rcomp,
        };
        sreac.reset_ccst(state)?;
        Ok(sreac)
    }

    pub fn patch(&self) -> PatchIdx {
        self.patch
    }

    /// Compartment the volume reactants are drawn from.
    pub fn reactant_comp(&self) -> Option<CompIdx> {
        self.rcomp
    }

    pub fn kcst(&self) -> f64 {
        self.core.kcst
    }

    pub fn order(&self) -> usize {
        self.core.order
    }
}

impl KProc for SReac {
    fn sched_idx(&self) -> SchedIdx {
        self.core.sched_idx()
    }

    fn reaction_id(&self) -> &str {
        self.core.reaction()
    }

    fn region(&self) -> Region {
        Region::Patch(self.patch)
    }

    fn setup_deps(&mut self, index: &DepIndex) {
        self.core.setup_deps(index)
    }

    fn dep_spec_comp(&self, spec: SpecIdx, comp: CompIdx) -> bool {
        self.rcomp == Some(comp) && self.core.reads_spec(spec, Region::Comp(comp))
    }

    fn dep_spec_patch(&self, spec: SpecIdx, patch: PatchIdx) -> bool {
        patch == self.patch && self.core.reads_spec(spec, Region::Patch(patch))
    }

    fn reset(&mut self) {
        self.core.reset()
    }

    /// Reactions with volume reactants scale by the reactant compartment's
    /// volume; purely surface reactions scale by the patch area.
    fn reset_ccst(&mut self, state: &SimState) -> Result<(), KernelError> {
        self.core.ccst = match self.rcomp {
            Some(rc) => vol_ccst(self.core.kcst, state.comp(rc)?.vol(), self.core.order),
            None => area_ccst(self.core.kcst, state.patch(self.patch)?.area(), self.core.order),
        };
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Geometry;
    use crate::model::{Model, Stoichiometry};
    use crate::types::AVOGADRO;

    const CYT: Region = Region::Comp(0);
    const EXT: Region = Region::Comp(1);
    const MEMB: Region = Region::Patch(0);

    // Species: 0 = L (ligand), 1 = R (receptor), 2 = LR (complex).
    fn setup(with_outer: bool) -> (Model, SimState) {
        let mut m = Model::new();
        for s in ["L", "R", "LR"] {
            m.add_species(s).unwrap();
        }
        m.add_surfsys("ssys").unwrap();
        let mut g = Geometry::new();
        g.add_comp("cyt", 1.0e-18).unwrap();
        g.add_comp("ext", 2.0e-18).unwrap();
        g.add_patch("memb", 1.0e-12, "cyt", if with_outer { Some("ext") } else { None }).unwrap();
        let state = SimState::new(&g, m.species_count());
        (m, state)
    }

    fn binding(m: &mut Model) -> Reaction {
        let (l, r, lr) = (m.species("L").unwrap(), m.species("R").unwrap(), m.species("LR").unwrap());
        let stoich = Stoichiometry::default().vlhs(vec![l]).slhs(vec![r]).srhs(vec![lr]);
        m.create_reaction("ssys", "bind", stoich, 1.0e6).unwrap().clone()
    }

    #[test]
    fn test_outer_binding_draws_from_outer_comp() {
        let (mut m, mut state) = setup(true);
        let def = binding(&mut m);
        let mut s = SReac::new(0, &def, 0, "memb", &state).unwrap();
        assert_eq!(s.reactant_comp(), Some(1));
        state.set_count(EXT, 0, 10).unwrap();
        state.set_count(CYT, 0, 1000).unwrap();
        state.set_count(MEMB, 1, 3).unwrap();
        assert_eq!(s.h(&state), 30.0);

        let expected_c = 1.0e6 / (1.0e3 * 2.0e-18 * AVOGADRO);
        assert!((s.c() - expected_c).abs() < 1e-12 * expected_c);

        s.apply(&mut state).unwrap();
        assert_eq!(state.count(EXT, 0), 9);
        assert_eq!(state.count(CYT, 0), 1000);
        assert_eq!(state.count(MEMB, 1), 2);
        assert_eq!(state.count(MEMB, 2), 1);
    }

    #[test]
    fn test_inner_orientation_draws_from_inner_comp() {
        let (mut m, mut state) = setup(true);
        binding(&mut m);
        m.reaction_mut("ssys", "bind").unwrap().set_inner(true).unwrap();
        let def = m.reaction("ssys", "bind").unwrap().clone();
        let s = SReac::new(0, &def, 0, "memb", &state).unwrap();
        assert_eq!(s.reactant_comp(), Some(0));
        state.set_count(CYT, 0, 4).unwrap();
        state.set_count(MEMB, 1, 2).unwrap();
        assert_eq!(s.h(&state), 8.0);
        assert!(s.dep_spec_comp(0, 0));
        assert!(!s.dep_spec_comp(0, 1));
    }

    #[test]
    fn test_transport_crosses_patch() {
        // Outer L is carried through the membrane into the inner compartment.
        let (mut m, mut state) = setup(true);
        let l = m.species("L").unwrap();
        let stoich = Stoichiometry::default().vlhs(vec![l]).irhs(vec![l]);
        let def = m.create_reaction("ssys", "influx", stoich, 2.0).unwrap().clone();
        let mut s = SReac::new(0, &def, 0, "memb", &state).unwrap();
        state.set_count(EXT, 0, 1).unwrap();
        assert_eq!(s.rate(&state), 2.0);
        s.apply(&mut state).unwrap();
        assert_eq!(state.count(EXT, 0), 0);
        assert_eq!(state.count(CYT, 0), 1);
        assert_eq!(s.writes(), vec![(EXT, 0), (CYT, 0)]);
    }

    #[test]
    fn test_outer_side_requires_outer_comp() {
        let (mut m, state) = setup(false);
        let def = binding(&mut m);
        let err = SReac::new(0, &def, 0, "memb", &state).unwrap_err();
        assert_eq!(
            err,
            KernelError::Model(ModelError::MissingOuterCompartment { reaction: "bind".into(), patch: "memb".into() })
        );
    }

    #[test]
    fn test_surface_only_scales_by_area() {
        let (mut m, mut state) = setup(false);
        let (r, lr) = (m.species("R").unwrap(), m.species("LR").unwrap());
        let stoich = Stoichiometry::default().slhs(vec![r, r]).srhs(vec![lr]);
        let def = m.create_reaction("ssys", "dimer", stoich, 1.0e-6).unwrap().clone();
        let mut s = SReac::new(0, &def, 0, "memb", &state).unwrap();
        let expected = 1.0e-6 / (1.0e-12 * AVOGADRO);
        assert!((s.c() - expected).abs() < 1e-12 * expected);

        state.set_patch_area(0, 2.0e-12).unwrap();
        s.reset_ccst(&state).unwrap();
        assert!((s.c() - expected / 2.0).abs() < 1e-12 * expected);
        assert!(s.dep_spec_patch(1, 0));
        assert!(!s.dep_spec_patch(2, 0));
    }
}
