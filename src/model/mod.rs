//!
//! Model-construction layer: the species registry and the reaction sets
//! that own reaction definitions.
//!
//! Ownership runs strictly model → set → reaction. Reactions refer back to
//! their owner by id only, and species are referred to by `SpeciesRef`
//! handles stamped with the owning model's id.

pub mod reaction;
pub mod reaction_set;
pub mod species;

pub use reaction::{Reaction, Stoichiometry};
pub use reaction_set::{ReactionSet, ReactionSetKind};
pub use species::{Species, SpeciesRef};

use std::collections::HashMap;

use crate::error::ModelError;
use crate::types::{is_valid_id, ModelId};

/// A reaction-network model.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Model {
    id: ModelId,
    species: Vec<Species>,
    species_index: HashMap<String, usize>,
    sets: Vec<ReactionSet>,
    /// Bumped on every structural change; compiled simulations compare it to
    /// detect that they were built from an older model.
    generation: u64,
}

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}

impl Model {
    pub fn new() -> Self {
        Model {
            id: ModelId::new_v4(),
            species: Vec::new(),
            species_index: HashMap::new(),
            sets: Vec::new(),
            generation: 0,
        }
    }

    pub fn id(&self) -> ModelId {
        self.id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    // --- Species registry --------------------------------------------------

    pub fn add_species(&mut self, id: &str) -> Result<SpeciesRef, ModelError> {
        self.check_new_species_id(id)?;
        let idx = self.species.len();
        self.species.push(Species { id: id.to_string(), idx });
        self.species_index.insert(id.to_string(), idx);
        self.generation += 1;
        Ok(SpeciesRef { model: self.id, idx })
    }

    pub fn species(&self, id: &str) -> Option<SpeciesRef> {
        self.species_index.get(id).map(|&idx| SpeciesRef { model: self.id, idx })
    }

    pub fn all_species(&self) -> &[Species] {
        &self.species
    }

    pub fn species_count(&self) -> usize {
        self.species.len()
    }

    /// Resolves a handle to its species, rejecting handles from other models.
    pub fn resolve(&self, spec: SpeciesRef) -> Result<&Species, ModelError> {
        if spec.model != self.id {
            return Err(ModelError::ForeignSpecies(spec.describe()));
        }
        self.species.get(spec.idx).ok_or_else(|| ModelError::UnknownSpecies(spec.describe()))
    }

    pub fn contains(&self, spec: SpeciesRef) -> bool {
        self.resolve(spec).is_ok()
    }

    pub fn rename_species(&mut self, old_id: &str, new_id: &str) -> Result<(), ModelError> {
        let idx = *self
            .species_index
            .get(old_id)
            .ok_or_else(|| ModelError::UnknownSpecies(old_id.to_string()))?;
        if old_id == new_id {
            return Ok(());
        }
        self.check_new_species_id(new_id)?;
        self.species_index.remove(old_id);
        self.species_index.insert(new_id.to_string(), idx);
        self.species[idx].id = new_id.to_string();
        self.generation += 1;
        Ok(())
    }

    fn check_new_species_id(&self, id: &str) -> Result<(), ModelError> {
        if !is_valid_id(id) {
            return Err(ModelError::InvalidId(id.to_string()));
        }
        if self.species_index.contains_key(id) {
            return Err(ModelError::DuplicateId(id.to_string()));
        }
        Ok(())
    }

    // --- Reaction sets -----------------------------------------------------

    pub fn add_volsys(&mut self, id: &str) -> Result<&ReactionSet, ModelError> {
        self.add_set(id, ReactionSetKind::Volume)
    }

    pub fn add_surfsys(&mut self, id: &str) -> Result<&ReactionSet, ModelError> {
        self.add_set(id, ReactionSetKind::Surface)
    }

    fn add_set(&mut self, id: &str, kind: ReactionSetKind) -> Result<&ReactionSet, ModelError> {
        if !is_valid_id(id) {
            return Err(ModelError::InvalidId(id.to_string()));
        }
        if self.reaction_set(id).is_some() {
            return Err(ModelError::DuplicateId(id.to_string()));
        }
        self.sets.push(ReactionSet::new(id, kind));
        self.generation += 1;
        let last = self.sets.len() - 1;
        Ok(&self.sets[last])
    }

    pub fn reaction_set(&self, id: &str) -> Option<&ReactionSet> {
        self.sets.iter().find(|s| s.id() == id)
    }

    pub fn reaction_sets(&self) -> &[ReactionSet] {
        &self.sets
    }

    fn set_mut(&mut self, id: &str) -> Result<&mut ReactionSet, ModelError> {
        self.sets
            .iter_mut()
            .find(|s| s.id() == id)
            .ok_or_else(|| ModelError::UnknownReactionSet(id.to_string()))
    }

    // --- Reactions ---------------------------------------------------------

    /// Creates a reaction and registers it with the set `set_id`.
    ///
    /// Fails if the set does not exist, the rate constant is negative, a
    /// species belongs to another model, the id is invalid or taken, or a
    /// volume reaction references surface/outer terms.
    pub fn create_reaction(
        &mut self,
        set_id: &str,
        id: &str,
        stoich: Stoichiometry,
        kcst: f64,
    ) -> Result<&Reaction, ModelError> {
        let model = self.id;
        let bound = self.species.len();
        let set = self.set_mut(set_id)?;
        set.check_new_id(id)?;
        let reac = Reaction::new(id, model, bound, set_id, set.kind(), stoich, kcst)?;
        tracing::debug!(set = set_id, reaction = id, order = reac.order(), "registered reaction");
        set.register(reac)?;
        self.generation += 1;
        self.reaction(set_id, id).ok_or_else(|| ModelError::UnknownReaction {
            set: set_id.to_string(),
            reaction: id.to_string(),
        })
    }

    pub fn reaction(&self, set_id: &str, id: &str) -> Option<&Reaction> {
        self.reaction_set(set_id).and_then(|s| s.reaction(id))
    }

    /// Mutable access for rate/stoichiometry/orientation changes. A successful
    /// lookup counts as a structural change of the model.
    pub fn reaction_mut(&mut self, set_id: &str, id: &str) -> Result<&mut Reaction, ModelError> {
        let bound = self.species.len();
        let reac = self
            .sets
            .iter_mut()
            .find(|s| s.id() == set_id)
            .ok_or_else(|| ModelError::UnknownReactionSet(set_id.to_string()))?
            .reaction_mut(id)?;
        reac.set_species_bound(bound);
        self.generation += 1;
        Ok(reac)
    }

    pub fn rename_reaction(&mut self, set_id: &str, old_id: &str, new_id: &str) -> Result<(), ModelError> {
        self.set_mut(set_id)?.rename(old_id, new_id)?;
        self.generation += 1;
        Ok(())
    }

    /// Deregisters and tears down a reaction; the returned instance is inert.
    pub fn remove_reaction(&mut self, set_id: &str, id: &str) -> Result<Reaction, ModelError> {
        let reac = self.set_mut(set_id)?.remove(id)?;
        self.generation += 1;
        tracing::debug!(set = set_id, reaction = id, "removed reaction");
        Ok(reac)
    }
}
