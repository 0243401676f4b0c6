//! Shared identifiers and constants used across the model and kernel layers.
//!
//! Model-side entities are addressed by string ids (checked by their owning
//! container); runtime entities are addressed by dense indices assigned once
//! when a simulation is compiled.

/// Avogadro's constant (mol⁻¹).
pub const AVOGADRO: f64 = 6.022_140_76e23;

/// Identity of a `Model`. Species handles carry this so that a handle from
/// one model is rejected by another without a registry lookup.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ModelId(pub uuid::Uuid);

impl ModelId {
    pub fn new_v4() -> Self {
        ModelId(uuid::Uuid::new_v4())
    }
}

/// Position of a kinetic process in the global process list.
/// Used as the address space for dependency edges.
pub type SchedIdx = usize;

/// Dense index of a species within its model's registry.
pub type SpecIdx = usize;

/// Dense index of a compartment in a compiled geometry.
pub type CompIdx = usize;

/// Dense index of a patch in a compiled geometry.
pub type PatchIdx = usize;

/// A well-mixed region holding molecule counts.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub enum Region {
    Comp(CompIdx),
    Patch(PatchIdx),
}

/// Which compartment supplies the volume reactants of a surface reaction.
///
/// Inner and outer products always land in the inner and outer compartment
/// respectively, whatever the orientation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
pub enum Orientation {
    /// Volume reactants are drawn from the outer compartment.
    #[default]
    Outer,
    /// Volume reactants are drawn from the inner compartment.
    Inner,
}

/// Checks the model-wide id syntax: a letter followed by letters, digits or `_`.
pub fn is_valid_id(id: &str) -> bool {
    let mut chars = id.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
