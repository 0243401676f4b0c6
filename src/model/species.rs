//! Species identities and the handles reactions use to refer to them.

use crate::types::{ModelId, SpecIdx};

/// A chemical species. Carries identity only.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Species {
    pub(crate) id: String,
    pub(crate) idx: SpecIdx,
}

impl Species {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn idx(&self) -> SpecIdx {
        self.idx
    }
}

/// Non-owning handle to a species in a particular model.
///
/// Handles are only minted by `Model::add_species` / `Model::species`.
/// Clones of a model share its id, so a handle minted by a clone may point
/// past the registry of the original; `Model::resolve` rejects those.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct SpeciesRef {
    pub(crate) model: ModelId,
    pub(crate) idx: SpecIdx,
}

impl SpeciesRef {
    pub fn model(&self) -> ModelId {
        self.model
    }

    pub fn idx(&self) -> SpecIdx {
        self.idx
    }

    pub(crate) fn describe(&self) -> String {
        format!("#{} of model {}", self.idx, self.model.0)
    }
}

/// Multiplicity of each distinct species in a multiset, in first-occurrence order.
pub(crate) fn multiplicities(specs: &[SpeciesRef]) -> Vec<(SpecIdx, u32)> {
    let mut out: Vec<(SpecIdx, u32)> = Vec::new();
    for s in specs {
        match out.iter_mut().find(|(idx, _)| *idx == s.idx) {
            Some((_, n)) => *n += 1,
            None => out.push((s.idx, 1)),
        }
    }
    out
}
