//! Well-mixed geometry: compartments (volumes) and patches (surfaces
//! between an inner and an optional outer compartment).

use crate::error::ModelError;
use crate::types::{is_valid_id, CompIdx, PatchIdx};

/// A well-mixed volume.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Comp {
    id: String,
    /// Volume in m³.
    vol: f64,
    volsys: Vec<String>,
}

impl Comp {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn vol(&self) -> f64 {
        self.vol
    }

    pub fn volsys(&self) -> &[String] {
        &self.volsys
    }
}

/// A well-mixed surface.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Patch {
    id: String,
    /// Area in m².
    area: f64,
    surfsys: Vec<String>,
    icomp: CompIdx,
    ocomp: Option<CompIdx>,
}

impl Patch {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn area(&self) -> f64 {
        self.area
    }

    pub fn surfsys(&self) -> &[String] {
        &self.surfsys
    }

    pub fn icomp(&self) -> CompIdx {
        self.icomp
    }

    pub fn ocomp(&self) -> Option<CompIdx> {
        self.ocomp
    }
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Geometry {
    comps: Vec<Comp>,
    patches: Vec<Patch>,
}

impl Geometry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_comp(&mut self, id: &str, vol: f64) -> Result<CompIdx, ModelError> {
        self.check_new_id(id)?;
        check_size("volume", id, vol)?;
        self.comps.push(Comp { id: id.to_string(), vol, volsys: Vec::new() });
        Ok(self.comps.len() - 1)
    }

    /// Adds a patch on the boundary of `icomp` (and `ocomp`, if any).
    pub fn add_patch(&mut self, id: &str, area: f64, icomp: &str, ocomp: Option<&str>) -> Result<PatchIdx, ModelError> {
        self.check_new_id(id)?;
        check_size("area", id, area)?;
        let icomp_idx = self.comp_idx(icomp).ok_or_else(|| {
            ModelError::InvalidGeometry(format!("patch '{}' refers to unknown inner compartment '{}'", id, icomp))
        })?;
        let ocomp_idx = match ocomp {
            Some(o) => {
                let idx = self.comp_idx(o).ok_or_else(|| {
                    ModelError::InvalidGeometry(format!("patch '{}' refers to unknown outer compartment '{}'", id, o))
                })?;
                if idx == icomp_idx {
                    return Err(ModelError::InvalidGeometry(format!(
                        "patch '{}' has the same inner and outer compartment",
                        id
                    )));
                }
                Some(idx)
            }
            None => None,
        };
        self.patches.push(Patch {
            id: id.to_string(),
            area,
            surfsys: Vec::new(),
            icomp: icomp_idx,
            ocomp: ocomp_idx,
        });
        Ok(self.patches.len() - 1)
    }

    /// Attaches a volume system by id. Existence is checked at compile time.
    pub fn add_volsys(&mut self, comp: &str, volsys: &str) -> Result<(), ModelError> {
        let c = self.comp_mut(comp)?;
        if !c.volsys.iter().any(|v| v == volsys) {
            c.volsys.push(volsys.to_string());
        }
        Ok(())
    }

    /// Attaches a surface system by id. Existence is checked at compile time.
    pub fn add_surfsys(&mut self, patch: &str, surfsys: &str) -> Result<(), ModelError> {
        let idx = self
            .patch_idx(patch)
            .ok_or_else(|| ModelError::InvalidGeometry(format!("unknown patch '{}'", patch)))?;
        let p = &mut self.patches[idx];
        if !p.surfsys.iter().any(|s| s == surfsys) {
            p.surfsys.push(surfsys.to_string());
        }
        Ok(())
    }

    pub fn comps(&self) -> &[Comp] {
        &self.comps
    }

    pub fn patches(&self) -> &[Patch] {
        &self.patches
    }

    pub fn comp_idx(&self, id: &str) -> Option<CompIdx> {
        self.comps.iter().position(|c| c.id == id)
    }

    pub fn patch_idx(&self, id: &str) -> Option<PatchIdx> {
        self.patches.iter().position(|p| p.id == id)
    }

    fn comp_mut(&mut self, id: &str) -> Result<&mut Comp, ModelError> {
        self.comps
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| ModelError::InvalidGeometry(format!("unknown compartment '{}'", id)))
    }

    // Compartments and patches share one namespace.
    fn check_new_id(&self, id: &str) -> Result<(), ModelError> {
        if !is_valid_id(id) {
            return Err(ModelError::InvalidId(id.to_string()));
        }
        if self.comp_idx(id).is_some() || self.patch_idx(id).is_some() {
            return Err(ModelError::DuplicateId(id.to_string()));
        }
        Ok(())
    }
}

pub(crate) fn check_size(what: &str, id: &str, value: f64) -> Result<(), ModelError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ModelError::InvalidGeometry(format!("{} of '{}' must be positive, got {}", what, id, value)));
    }
    Ok(())
}
