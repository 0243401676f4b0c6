//! Reaction definitions: stoichiometry, rate constant and membrane orientation.
//!
//! A single `Reaction` type covers both kinds. Reactions owned by a volume
//! system only use `vlhs` (reactants) and `irhs` (products); reactions owned
//! by a surface system may use all five multisets.

use crate::error::ModelError;
use crate::model::reaction_set::ReactionSetKind;
use crate::model::species::SpeciesRef;
use crate::types::{ModelId, Orientation};

/// The five stoichiometry multisets of a reaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Stoichiometry {
    /// Volume reactants.
    pub vlhs: Vec<SpeciesRef>,
    /// Surface reactants.
    pub slhs: Vec<SpeciesRef>,
    /// Products released into the inner compartment.
    pub irhs: Vec<SpeciesRef>,
    /// Products placed on the surface.
    pub srhs: Vec<SpeciesRef>,
    /// Products released into the outer compartment.
    pub orhs: Vec<SpeciesRef>,
}

impl Stoichiometry {
    /// Stoichiometry of a volume reaction `lhs -> rhs`.
    pub fn volume(lhs: Vec<SpeciesRef>, rhs: Vec<SpeciesRef>) -> Self {
        Stoichiometry { vlhs: lhs, irhs: rhs, ..Default::default() }
    }

    pub fn vlhs(mut self, specs: Vec<SpeciesRef>) -> Self {
        self.vlhs = specs;
        self
    }

    pub fn slhs(mut self, specs: Vec<SpeciesRef>) -> Self {
        self.slhs = specs;
        self
    }

    pub fn irhs(mut self, specs: Vec<SpeciesRef>) -> Self {
        self.irhs = specs;
        self
    }

    pub fn srhs(mut self, specs: Vec<SpeciesRef>) -> Self {
        self.srhs = specs;
        self
    }

    pub fn orhs(mut self, specs: Vec<SpeciesRef>) -> Self {
        self.orhs = specs;
        self
    }
}

/// A reaction definition owned by exactly one reaction set.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Reaction {
    id: String,
    model: ModelId,
    /// Owning set id; cleared on teardown.
    set: Option<String>,
    kind: ReactionSetKind,
    orientation: Orientation,
    vlhs: Vec<SpeciesRef>,
    slhs: Vec<SpeciesRef>,
    irhs: Vec<SpeciesRef>,
    srhs: Vec<SpeciesRef>,
    orhs: Vec<SpeciesRef>,
    order: usize,
    kcst: f64,
    /// Size of the owning model's species registry; handles at or past it
    /// are unknown. Refreshed by `Model` before every mutation.
    #[serde(skip)]
    species_bound: usize,
}

impl Reaction {
    /// Builds a reaction for the given owner. Registration with the owner is
    /// done by the caller (`ReactionSet::register`). `species_bound` is the
    /// number of species registered with `model`.
    pub(crate) fn new(
        id: &str,
        model: ModelId,
        species_bound: usize,
        set_id: &str,
        kind: ReactionSetKind,
        stoich: Stoichiometry,
        kcst: f64,
    ) -> Result<Self, ModelError> {
        check_kcst(kcst)?;
        let mut reac = Reaction {
            id: id.to_string(),
            model,
            set: Some(set_id.to_string()),
            kind,
            orientation: Orientation::Outer,
            vlhs: Vec::new(),
            slhs: Vec::new(),
            irhs: Vec::new(),
            srhs: Vec::new(),
            orhs: Vec::new(),
            order: 0,
            kcst,
            species_bound,
        };
        reac.set_vlhs(stoich.vlhs)?;
        reac.set_slhs(stoich.slhs)?;
        reac.set_irhs(stoich.irhs)?;
        reac.set_srhs(stoich.srhs)?;
        reac.set_orhs(stoich.orhs)?;
        Ok(reac)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn model(&self) -> ModelId {
        self.model
    }

    /// Id of the owning set, or `None` once torn down.
    pub fn set_id(&self) -> Option<&str> {
        self.set.as_deref()
    }

    pub fn kind(&self) -> ReactionSetKind {
        self.kind
    }

    pub fn is_detached(&self) -> bool {
        self.set.is_none()
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn is_inner(&self) -> bool {
        self.orientation == Orientation::Inner
    }

    pub fn is_outer(&self) -> bool {
        self.orientation == Orientation::Outer
    }

    pub fn vlhs(&self) -> &[SpeciesRef] {
        &self.vlhs
    }

    pub fn slhs(&self) -> &[SpeciesRef] {
        &self.slhs
    }

    pub fn irhs(&self) -> &[SpeciesRef] {
        &self.irhs
    }

    pub fn srhs(&self) -> &[SpeciesRef] {
        &self.srhs
    }

    pub fn orhs(&self) -> &[SpeciesRef] {
        &self.orhs
    }

    /// Number of reactant molecules consumed per firing: `|vlhs| + |slhs|`.
    pub fn order(&self) -> usize {
        self.order
    }

    pub fn kcst(&self) -> f64 {
        self.kcst
    }

    pub fn set_inner(&mut self, inner: bool) -> Result<(), ModelError> {
        self.check_attached()?;
        self.orientation = if inner { Orientation::Inner } else { Orientation::Outer };
        Ok(())
    }

    pub fn set_outer(&mut self, outer: bool) -> Result<(), ModelError> {
        self.set_inner(!outer)
    }

    pub fn set_vlhs(&mut self, specs: Vec<SpeciesRef>) -> Result<(), ModelError> {
        self.check_attached()?;
        self.check_species(&specs)?;
        self.vlhs = specs;
        self.order = self.vlhs.len() + self.slhs.len();
        Ok(())
    }

    pub fn set_slhs(&mut self, specs: Vec<SpeciesRef>) -> Result<(), ModelError> {
        self.check_attached()?;
        self.check_surface_term(&specs)?;
        self.check_species(&specs)?;
        self.slhs = specs;
        self.order = self.vlhs.len() + self.slhs.len();
        Ok(())
    }

    pub fn set_irhs(&mut self, specs: Vec<SpeciesRef>) -> Result<(), ModelError> {
        self.check_attached()?;
        self.check_species(&specs)?;
        self.irhs = specs;
        Ok(())
    }

    pub fn set_srhs(&mut self, specs: Vec<SpeciesRef>) -> Result<(), ModelError> {
        self.check_attached()?;
        self.check_surface_term(&specs)?;
        self.check_species(&specs)?;
        self.srhs = specs;
        Ok(())
    }

    pub fn set_orhs(&mut self, specs: Vec<SpeciesRef>) -> Result<(), ModelError> {
        self.check_attached()?;
        self.check_surface_term(&specs)?;
        self.check_species(&specs)?;
        self.orhs = specs;
        Ok(())
    }

    /// Sets the macroscopic rate constant. Zero is allowed, negatives are not.
    pub fn set_kcst(&mut self, kcst: f64) -> Result<(), ModelError> {
        self.check_attached()?;
        check_kcst(kcst)?;
        self.kcst = kcst;
        Ok(())
    }

    /// Every species the reaction touches, each once, in first-occurrence
    /// order across vlhs, slhs, irhs, srhs, orhs.
    ///
    /// External consumers index by this ordering; it must stay stable.
    pub fn all_species(&self) -> Vec<SpeciesRef> {
        let mut specs: Vec<SpeciesRef> = Vec::new();
        let sides = [&self.vlhs, &self.slhs, &self.irhs, &self.srhs, &self.orhs];
        for s in sides.into_iter().flatten() {
            if !specs.contains(s) {
                specs.push(*s);
            }
        }
        specs
    }

    /// Second phase of a rename; the owning set has already accepted `new_id`.
    pub(crate) fn commit_id(&mut self, new_id: &str) {
        self.id = new_id.to_string();
    }

    /// Detaches the reaction from its owner and zeroes it so a retained
    /// instance is inert. Returns `false` if it was already detached.
    pub(crate) fn teardown(&mut self) -> bool {
        if self.set.is_none() {
            return false;
        }
        self.kcst = 0.0;
        self.order = 0;
        self.orhs.clear();
        self.srhs.clear();
        self.irhs.clear();
        self.slhs.clear();
        self.vlhs.clear();
        self.set = None;
        true
    }

    fn check_attached(&self) -> Result<(), ModelError> {
        if self.set.is_none() {
            return Err(ModelError::Detached(self.id.clone()));
        }
        Ok(())
    }

    pub(crate) fn set_species_bound(&mut self, bound: usize) {
        self.species_bound = bound;
    }

    fn check_species(&self, specs: &[SpeciesRef]) -> Result<(), ModelError> {
        if let Some(foreign) = specs.iter().find(|s| s.model != self.model) {
            return Err(ModelError::ForeignSpecies(foreign.describe()));
        }
        match specs.iter().find(|s| s.idx >= self.species_bound) {
            Some(unknown) => Err(ModelError::UnknownSpecies(unknown.describe())),
            None => Ok(()),
        }
    }

    fn check_surface_term(&self, specs: &[SpeciesRef]) -> Result<(), ModelError> {
        if self.kind == ReactionSetKind::Volume && !specs.is_empty() {
            return Err(ModelError::SurfaceTermInVolumeReaction(self.id.clone()));
        }
        Ok(())
    }
}

fn check_kcst(kcst: f64) -> Result<(), ModelError> {
    if kcst.is_nan() || kcst < 0.0 {
        return Err(ModelError::NegativeRateConstant(kcst));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUND: usize = 8;

    fn refs(model: ModelId, idxs: &[usize]) -> Vec<SpeciesRef> {
        idxs.iter().map(|&idx| SpeciesRef { model, idx }).collect()
    }

    fn surface(model: ModelId, stoich: Stoichiometry) -> Reaction {
        Reaction::new("r", model, BOUND, "ss", ReactionSetKind::Surface, stoich, 1.0).unwrap()
    }

    #[test]
    fn test_order_tracks_both_reactant_sides() {
        let m = ModelId::new_v4();
        let mut r = surface(m, Stoichiometry::default().vlhs(refs(m, &[0, 0])).slhs(refs(m, &[1])));
        assert_eq!(r.order(), 3);
        r.set_slhs(Vec::new()).unwrap();
        assert_eq!(r.order(), 2);
        r.set_vlhs(refs(m, &[2])).unwrap();
        assert_eq!(r.order(), 1);
        // Products never count towards order.
        r.set_orhs(refs(m, &[0, 1, 2])).unwrap();
        assert_eq!(r.order(), 1);
    }

    #[test]
    fn test_negative_kcst_rejected_zero_accepted() {
        let m = ModelId::new_v4();
        let err = Reaction::new("r", m, BOUND, "vs", ReactionSetKind::Volume, Stoichiometry::default(), -1.0);
        assert_eq!(err.unwrap_err(), ModelError::NegativeRateConstant(-1.0));

        let mut r = Reaction::new("r", m, BOUND, "vs", ReactionSetKind::Volume, Stoichiometry::default(), 0.0).unwrap();
        assert_eq!(r.kcst(), 0.0);
        assert!(r.set_kcst(-0.5).is_err());
        assert_eq!(r.kcst(), 0.0);
        assert!(r.set_kcst(f64::NAN).is_err());
        r.set_kcst(3.5).unwrap();
        assert_eq!(r.kcst(), 3.5);
    }

    #[test]
    fn test_foreign_species_rejected_and_state_kept() {
        let m = ModelId::new_v4();
        let other = ModelId::new_v4();
        let mut r = surface(m, Stoichiometry::default().vlhs(refs(m, &[0])));
        let err = r.set_vlhs(refs(other, &[0])).unwrap_err();
        assert!(matches!(err, ModelError::ForeignSpecies(_)));
        assert_eq!(r.vlhs(), refs(m, &[0]).as_slice());
        assert_eq!(r.order(), 1);
    }

    #[test]
    fn test_volume_reaction_rejects_surface_terms() {
        let m = ModelId::new_v4();
        let stoich = Stoichiometry::volume(refs(m, &[0]), refs(m, &[1])).orhs(refs(m, &[2]));
        let err = Reaction::new("r", m, BOUND, "vs", ReactionSetKind::Volume, stoich, 1.0).unwrap_err();
        assert_eq!(err, ModelError::SurfaceTermInVolumeReaction("r".into()));
    }

    #[test]
    fn test_all_species_first_occurrence_order() {
        let m = ModelId::new_v4();
        let r = surface(
            m,
            Stoichiometry::default()
                .vlhs(refs(m, &[4, 2, 4]))
                .slhs(refs(m, &[1, 2]))
                .irhs(refs(m, &[0]))
                .srhs(refs(m, &[1, 5]))
                .orhs(refs(m, &[3, 0])),
        );
        assert_eq!(r.all_species(), refs(m, &[4, 2, 1, 0, 5, 3]));
    }

    #[test]
    fn test_orientation_setters() {
        let m = ModelId::new_v4();
        let mut r = surface(m, Stoichiometry::default());
        assert!(r.is_outer());
        r.set_inner(true).unwrap();
        assert!(r.is_inner());
        r.set_outer(true).unwrap();
        assert_eq!(r.orientation(), Orientation::Outer);
    }

    #[test]
    fn test_teardown_is_idempotent_and_inert() {
        let m = ModelId::new_v4();
        let mut r = surface(m, Stoichiometry::default().vlhs(refs(m, &[0])).srhs(refs(m, &[1])));
        assert!(r.teardown());
        assert!(r.is_detached());
        assert_eq!(r.order(), 0);
        assert_eq!(r.kcst(), 0.0);
        assert!(r.all_species().is_empty());
        assert!(!r.teardown());
        assert_eq!(r.set_kcst(1.0), Err(ModelError::Detached("r".into())));
    }
}
