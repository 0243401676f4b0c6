#![no_main]

use libfuzzer_sys::fuzz_target;
use wellmixed_core::kernel::SchedulerStatus;
use wellmixed_core::model::{Model, Stoichiometry};
use wellmixed_core::{Geometry, SchedulerConfig, Simulation};

const N_SPECIES: usize = 4;

// Species indices are taken modulo N_SPECIES so every input builds a model.
#[derive(Debug, Clone, arbitrary::Arbitrary)]
struct FuzzReaction {
    surface: bool,
    inner: bool,
    vlhs: Vec<u8>,
    slhs: Vec<u8>,
    irhs: Vec<u8>,
    srhs: Vec<u8>,
    orhs: Vec<u8>,
    kcst: f64,
}

#[derive(Debug, Clone, arbitrary::Arbitrary)]
struct FuzzInput {
    reactions: Vec<FuzzReaction>,
    counts: Vec<(u8, u8, u16)>,
    outer: bool,
    seed: u64,
    events: u16,
}

fuzz_target!(|data: FuzzInput| {
    let mut m = Model::new();
    let refs: Vec<_> = (0..N_SPECIES).filter_map(|i| m.add_species(&format!("S{}", i)).ok()).collect();
    let pick = |idxs: &[u8]| -> Vec<_> {
        idxs.iter().take(3).map(|&i| refs[usize::from(i) % N_SPECIES]).collect()
    };
    let (Ok(_), Ok(_)) = (m.add_volsys("vsys"), m.add_surfsys("ssys")) else { return };

    for (i, r) in data.reactions.iter().take(12).enumerate() {
        let id = format!("r{}", i);
        let set = if r.surface { "ssys" } else { "vsys" };
        let stoich = Stoichiometry::default()
            .vlhs(pick(&r.vlhs))
            .slhs(pick(&r.slhs))
            .irhs(pick(&r.irhs))
            .srhs(pick(&r.srhs))
            .orhs(pick(&r.orhs));
        // Invalid constants and surface terms in volume reactions are rejected, not panics.
        if m.create_reaction(set, &id, stoich, r.kcst.abs().min(1.0e3)).is_ok() && r.surface {
            if let Ok(reac) = m.reaction_mut(set, &id) {
                let _ = reac.set_inner(r.inner);
            }
        }
    }

    let mut g = Geometry::new();
    let built = g.add_comp("cyt", 1.0e-18).is_ok()
        && g.add_comp("ext", 1.0e-18).is_ok()
        && g.add_patch("memb", 1.0e-12, "cyt", if data.outer { Some("ext") } else { None }).is_ok()
        && g.add_volsys("cyt", "vsys").is_ok()
        && g.add_surfsys("memb", "ssys").is_ok();
    if !built {
        return;
    }

    let config = SchedulerConfig::with_seed(data.seed);
    let Ok(mut sim) = Simulation::seeded(&m, &g, config) else { return };
    for &(region, spec, n) in data.counts.iter().take(16) {
        let spec = format!("S{}", usize::from(spec) % N_SPECIES);
        let _ = match region % 3 {
            0 => sim.set_comp_count("cyt", &spec, u32::from(n)),
            1 => sim.set_comp_count("ext", &spec, u32::from(n)),
            _ => sim.set_patch_count("memb", &spec, u32::from(n)),
        };
    }

    // Propensities are exact and non-negative, so a valid model never faults.
    let summary = sim.run_events(u64::from(data.events % 2048)).expect("run_events failed");
    assert_ne!(summary.status, SchedulerStatus::Faulted);
    assert!(sim.scheduler().total_propensity() >= 0.0);
});
