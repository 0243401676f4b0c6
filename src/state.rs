//! Runtime molecule counts for every compartment and patch.
//!
//! Counts are stored densely per region, indexed by the model's species
//! index. Only kinetic processes (via `apply`) and the scheduler's explicit
//! setters write to them.

use crate::error::KernelError;
use crate::geom::Geometry;
use crate::types::{CompIdx, PatchIdx, Region, SpecIdx};

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CompState {
    pub(crate) vol: f64,
    pub(crate) counts: Vec<u32>,
}

impl CompState {
    pub fn vol(&self) -> f64 {
        self.vol
    }

    pub fn counts(&self) -> &[u32] {
        &self.counts
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PatchState {
    pub(crate) area: f64,
    pub(crate) icomp: CompIdx,
    pub(crate) ocomp: Option<CompIdx>,
    pub(crate) counts: Vec<u32>,
}

impl PatchState {
    pub fn area(&self) -> f64 {
        self.area
    }

    pub fn icomp(&self) -> CompIdx {
        self.icomp
    }

    pub fn ocomp(&self) -> Option<CompIdx> {
        self.ocomp
    }

    pub fn counts(&self) -> &[u32] {
        &self.counts
    }
}

/// Counts and sizes of all regions of one replicate.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SimState {
    n_species: usize,
    comps: Vec<CompState>,
    patches: Vec<PatchState>,
}

impl SimState {
    /// Zero counts for every species in every region of `geom`.
    pub fn new(geom: &Geometry, n_species: usize) -> Self {
        SimState {
            n_species,
            comps: geom
                .comps()
                .iter()
                .map(|c| CompState { vol: c.vol(), counts: vec![0; n_species] })
                .collect(),
            patches: geom
                .patches()
                .iter()
                .map(|p| PatchState {
                    area: p.area(),
                    icomp: p.icomp(),
                    ocomp: p.ocomp(),
                    counts: vec![0; n_species],
                })
                .collect(),
        }
    }

    pub fn n_species(&self) -> usize {
        self.n_species
    }

    pub fn comps(&self) -> &[CompState] {
        &self.comps
    }

    pub fn patches(&self) -> &[PatchState] {
        &self.patches
    }

    pub fn comp(&self, idx: CompIdx) -> Result<&CompState, KernelError> {
        self.comps.get(idx).ok_or_else(|| unknown("compartment", idx))
    }

    pub fn patch(&self, idx: PatchIdx) -> Result<&PatchState, KernelError> {
        self.patches.get(idx).ok_or_else(|| unknown("patch", idx))
    }

    pub fn contains(&self, region: Region) -> bool {
        match region {
            Region::Comp(c) => c < self.comps.len(),
            Region::Patch(p) => p < self.patches.len(),
        }
    }

    /// Count of `spec` in `region`. Out-of-range lookups read as zero; the
    /// kernel only asks for regions and species it compiled.
    #[inline]
    pub fn count(&self, region: Region, spec: SpecIdx) -> u32 {
        let counts = match region {
            Region::Comp(c) => self.comps.get(c).map(|c| &c.counts),
            Region::Patch(p) => self.patches.get(p).map(|p| &p.counts),
        };
        counts.and_then(|c| c.get(spec)).copied().unwrap_or(0)
    }

    pub fn set_count(&mut self, region: Region, spec: SpecIdx, n: u32) -> Result<(), KernelError> {
        let slot = self.slot_mut(region, spec)?;
        *slot = n;
        Ok(())
    }

    pub(crate) fn set_comp_vol(&mut self, idx: CompIdx, vol: f64) -> Result<(), KernelError> {
        crate::geom::check_size("volume", &idx.to_string(), vol)?;
        let comp = self.comps.get_mut(idx).ok_or_else(|| unknown("compartment", idx))?;
        comp.vol = vol;
        Ok(())
    }

    pub(crate) fn set_patch_area(&mut self, idx: PatchIdx, area: f64) -> Result<(), KernelError> {
        crate::geom::check_size("area", &idx.to_string(), area)?;
        let patch = self.patches.get_mut(idx).ok_or_else(|| unknown("patch", idx))?;
        patch.area = area;
        Ok(())
    }

    /// Checks that the count exists and that adding `delta` would stay within
    /// `0..=u32::MAX`.
    pub(crate) fn check_delta(&self, region: Region, spec: SpecIdx, delta: i64) -> Result<(), KernelError> {
        let counts = match region {
            Region::Comp(c) => self.comps.get(c).map(|c| &c.counts),
            Region::Patch(p) => self.patches.get(p).map(|p| &p.counts),
        };
        let current = match counts.and_then(|c| c.get(spec)) {
            Some(&n) => i64::from(n),
            None => {
                return Err(KernelError::InvariantViolation(format!(
                    "no count of species #{} in {:?}",
                    spec, region
                )))
            }
        };
        let next = current + delta;
        if next < 0 {
            return Err(KernelError::InvariantViolation(format!(
                "count of species #{} in {:?} would become negative ({} {:+})",
                spec, region, current, delta
            )));
        }
        if next > i64::from(u32::MAX) {
            return Err(KernelError::InvariantViolation(format!(
                "count of species #{} in {:?} overflows ({} {:+})",
                spec, region, current, delta
            )));
        }
        Ok(())
    }

    /// Adds `delta` to a count. Callers run `check_delta` first for every
    /// term of an update so that a rejected update leaves no partial write.
    pub(crate) fn add_delta(&mut self, region: Region, spec: SpecIdx, delta: i64) -> Result<(), KernelError> {
        self.check_delta(region, spec, delta)?;
        let slot = self.slot_mut(region, spec)?;
        // In range after check_delta.
        *slot = (i64::from(*slot) + delta) as u32;
        Ok(())
    }

    fn slot_mut(&mut self, region: Region, spec: SpecIdx) -> Result<&mut u32, KernelError> {
        let counts = match region {
            Region::Comp(c) => &mut self.comps.get_mut(c).ok_or_else(|| unknown("compartment", c))?.counts,
            Region::Patch(p) => &mut self.patches.get_mut(p).ok_or_else(|| unknown("patch", p))?.counts,
        };
        counts.get_mut(spec).ok_or_else(|| unknown("species", spec))
    }
}

fn unknown(kind: &'static str, idx: usize) -> KernelError {
    KernelError::Unknown { kind, id: format!("#{}", idx) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> SimState {
        let mut g = Geometry::new();
        g.add_comp("cyt", 1.0e-18).unwrap();
        g.add_comp("ext", 1.0e-18).unwrap();
        g.add_patch("memb", 1.0e-12, "cyt", Some("ext")).unwrap();
        SimState::new(&g, 3)
    }

    #[test]
    fn test_counts_start_at_zero() {
        let s = state();
        assert_eq!(s.comps().len(), 2);
        assert_eq!(s.patches().len(), 1);
        assert_eq!(s.count(Region::Comp(1), 2), 0);
        assert_eq!(s.patch(0).unwrap().ocomp(), Some(1));
    }

    #[test]
    fn test_set_and_add() {
        let mut s = state();
        s.set_count(Region::Patch(0), 1, 10).unwrap();
        s.add_delta(Region::Patch(0), 1, -3).unwrap();
        assert_eq!(s.count(Region::Patch(0), 1), 7);
        assert!(s.set_count(Region::Comp(5), 0, 1).is_err());
        assert!(s.set_count(Region::Comp(0), 3, 1).is_err());
    }

    #[test]
    fn test_negative_count_is_invariant_violation() {
        let mut s = state();
        s.set_count(Region::Comp(0), 0, 1).unwrap();
        let err = s.add_delta(Region::Comp(0), 0, -2).unwrap_err();
        assert!(matches!(err, KernelError::InvariantViolation(_)));
        assert_eq!(s.count(Region::Comp(0), 0), 1);
    }

    #[test]
    fn test_delta_on_missing_count_is_invariant_violation() {
        let s = state();
        for (region, spec) in [(Region::Comp(0), 3), (Region::Comp(2), 0), (Region::Patch(1), 0)] {
            let err = s.check_delta(region, spec, 1).unwrap_err();
            assert!(matches!(err, KernelError::InvariantViolation(_)), "{:?}", region);
        }
    }

    #[test]
    fn test_geometry_setters_validate() {
        let mut s = state();
        assert!(s.set_comp_vol(0, -1.0).is_err());
        s.set_comp_vol(0, 2.0e-18).unwrap();
        assert_eq!(s.comp(0).unwrap().vol(), 2.0e-18);
        assert!(s.set_patch_area(3, 1.0).is_err());
    }
}
