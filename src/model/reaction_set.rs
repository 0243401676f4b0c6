//! Reaction sets (volume systems and surface systems) own reaction
//! definitions and enforce id uniqueness among them.

use crate::error::ModelError;
use crate::model::reaction::Reaction;
use crate::types::is_valid_id;

/// Whether a set holds volume reactions or surface reactions.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ReactionSetKind {
    /// Attached to compartments.
    Volume,
    /// Attached to patches.
    Surface,
}

/// An owning container of reactions, kept in insertion order.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ReactionSet {
    id: String,
    kind: ReactionSetKind,
    reactions: Vec<Reaction>,
}

impl ReactionSet {
    pub(crate) fn new(id: &str, kind: ReactionSetKind) -> Self {
        ReactionSet { id: id.to_string(), kind, reactions: Vec::new() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> ReactionSetKind {
        self.kind
    }

    pub fn reactions(&self) -> &[Reaction] {
        &self.reactions
    }

    pub fn reaction(&self, id: &str) -> Option<&Reaction> {
        self.reactions.iter().find(|r| r.id() == id)
    }

    pub(crate) fn reaction_mut(&mut self, id: &str) -> Result<&mut Reaction, ModelError> {
        let set = self.id.clone();
        self.reactions
            .iter_mut()
            .find(|r| r.id() == id)
            .ok_or(ModelError::UnknownReaction { set, reaction: id.to_string() })
    }

    pub fn len(&self) -> usize {
        self.reactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reactions.is_empty()
    }

    /// Checks that `id` could be used for a new or renamed reaction.
    pub(crate) fn check_new_id(&self, id: &str) -> Result<(), ModelError> {
        if !is_valid_id(id) {
            return Err(ModelError::InvalidId(id.to_string()));
        }
        if self.reaction(id).is_some() {
            return Err(ModelError::DuplicateId(id.to_string()));
        }
        Ok(())
    }

    pub(crate) fn register(&mut self, reac: Reaction) -> Result<&Reaction, ModelError> {
        self.check_new_id(reac.id())?;
        self.reactions.push(reac);
        let last = self.reactions.len() - 1;
        Ok(&self.reactions[last])
    }

    /// Two-phase rename: the set validates `new_id` first and only then does
    /// the reaction commit it. On rejection nothing changes.
    pub(crate) fn rename(&mut self, old_id: &str, new_id: &str) -> Result<(), ModelError> {
        if old_id == new_id {
            // Still has to exist.
            self.reaction_mut(old_id)?;
            return Ok(());
        }
        self.check_new_id(new_id)?;
        self.reaction_mut(old_id)?.commit_id(new_id);
        Ok(())
    }

    /// Deregisters a reaction, then tears it down. The returned instance is inert.
    pub(crate) fn remove(&mut self, id: &str) -> Result<Reaction, ModelError> {
        let pos = self
            .reactions
            .iter()
            .position(|r| r.id() == id)
            .ok_or_else(|| ModelError::UnknownReaction { set: self.id.clone(), reaction: id.to_string() })?;
        let mut reac = self.reactions.remove(pos);
        reac.teardown();
        Ok(reac)
    }
}
