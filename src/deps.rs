//!
//! Dependency graph between kinetic processes.
//!
//! An edge P → Q exists iff firing P changes a count that Q's propensity
//! reads. Construction goes through a (region, species) → readers index so
//! its cost is proportional to the number of processes times the species
//! they touch, rather than quadratic in the number of processes.

use std::collections::HashMap;

use crate::error::KernelError;
use crate::kproc::KProc;
use crate::types::{Region, SchedIdx, SpecIdx};

/// Maps every (region, species) pair to the processes whose propensity reads it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DepIndex {
    readers: HashMap<(Region, SpecIdx), Vec<SchedIdx>>,
}

impl DepIndex {
    pub fn build<P: KProc>(procs: &[P]) -> Self {
        let mut readers: HashMap<(Region, SpecIdx), Vec<SchedIdx>> = HashMap::new();
        for p in procs {
            for (region, spec) in p.reads() {
                debug_assert!(p.depends_on(spec, region));
                let entry = readers.entry((region, spec)).or_default();
                if entry.last() != Some(&p.sched_idx()) {
                    entry.push(p.sched_idx());
                }
            }
        }
        DepIndex { readers }
    }

    /// Processes whose propensity reads `spec` in `region`, ascending.
    pub fn readers(&self, region: Region, spec: SpecIdx) -> &[SchedIdx] {
        self.readers.get(&(region, spec)).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// For each process, the schedule indices to recompute after it fires.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    rows: Vec<Vec<SchedIdx>>,
    index: DepIndex,
}

impl DependencyGraph {
    /// Builds the reader index, lets every process cache its dependencies
    /// (`setup_deps`) and collects the cached rows.
    pub fn build<P: KProc>(procs: &mut [P]) -> Result<Self, KernelError> {
        for (i, p) in procs.iter().enumerate() {
            if p.sched_idx() != i {
                return Err(KernelError::GraphMismatch(format!(
                    "process at position {} carries schedule index {}",
                    i,
                    p.sched_idx()
                )));
            }
        }
        let index = DepIndex::build(procs);
        for p in procs.iter_mut() {
            p.setup_deps(&index);
        }
        let rows: Vec<Vec<SchedIdx>> = procs.iter().map(|p| p.deps().to_vec()).collect();
        let graph = DependencyGraph { rows, index };
        tracing::debug!(processes = graph.len(), edges = graph.edge_count(), "built dependency graph");
        Ok(graph)
    }

    /// Reference construction by exhaustive pairwise predicate calls.
    /// Quadratic; meant for checking `build` on small systems.
    pub fn exhaustive<P: KProc>(procs: &[P]) -> Vec<Vec<SchedIdx>> {
        procs
            .iter()
            .map(|p| {
                let writes = p.writes();
                let mut row: Vec<SchedIdx> = procs
                    .iter()
                    .filter(|q| writes.iter().any(|&(region, spec)| q.depends_on(spec, region)))
                    .map(|q| q.sched_idx())
                    .collect();
                if !p.is_noop() {
                    row.push(p.sched_idx());
                }
                row.sort_unstable();
                row.dedup();
                row
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }

    pub fn dependents(&self, idx: SchedIdx) -> Option<&[SchedIdx]> {
        self.rows.get(idx).map(Vec::as_slice)
    }

    pub fn rows(&self) -> &[Vec<SchedIdx>] {
        &self.rows
    }

    /// Processes to recompute when `spec` in `region` is changed from outside.
    pub fn readers(&self, region: Region, spec: SpecIdx) -> &[SchedIdx] {
        self.index.readers(region, spec)
    }

    /// Checks the graph against a process list it is about to drive.
    pub fn verify<P: KProc>(&self, procs: &[P]) -> Result<(), KernelError> {
        if self.rows.len() != procs.len() {
            return Err(KernelError::GraphMismatch(format!(
                "graph has {} rows for {} processes",
                self.rows.len(),
                procs.len()
            )));
        }
        for (i, p) in procs.iter().enumerate() {
            if p.sched_idx() != i {
                return Err(KernelError::GraphMismatch(format!(
                    "process at position {} carries schedule index {}",
                    i,
                    p.sched_idx()
                )));
            }
            if p.deps() != self.rows[i].as_slice() {
                return Err(KernelError::GraphMismatch(format!(
                    "process {} ('{}') has not cached its dependencies",
                    i,
                    p.reaction_id()
                )));
            }
            if !p.is_noop() && !self.rows[i].contains(&i) {
                return Err(KernelError::GraphMismatch(format!("process {} is missing from its own row", i)));
            }
            if let Some(&bad) = self.rows[i].iter().find(|&&j| j >= procs.len()) {
                return Err(KernelError::GraphMismatch(format!("process {} depends on unknown process {}", i, bad)));
            }
        }
        Ok(())
    }
}
