//! Fixture models for tests, benches and fuzzing (`test-utils` feature).
//!
//! Every fixture builds a fresh `Model` and a `Geometry` with its reaction
//! systems attached. All counts start at zero once compiled.

use crate::error::ModelError;
use crate::geom::Geometry;
use crate::model::{Model, SpeciesRef, Stoichiometry};

/// A model together with the geometry it is placed in.
pub type Fixture = Result<(Model, Geometry), ModelError>;

/// Volume of the default compartment, in m³ (one femtolitre).
pub const FEMTOLITRE: f64 = 1.0e-18;

/// Membrane area of the default patch, in m².
pub const MEMBRANE_AREA: f64 = 1.0e-12;

fn single_comp(m: Model) -> Fixture {
    let mut g = Geometry::new();
    g.add_comp("cyt", FEMTOLITRE)?;
    g.add_volsys("cyt", "vsys")?;
    Ok((m, g))
}

fn volume_model(species: &[&str]) -> Result<(Model, Vec<SpeciesRef>), ModelError> {
    let mut m = Model::new();
    let refs = species.iter().map(|s| m.add_species(s)).collect::<Result<Vec<_>, _>>()?;
    m.add_volsys("vsys")?;
    Ok((m, refs))
}

/// Three zeroth-order sources of `X` in `cyt`, named `r1`, `r2`, `r3`, with
/// propensities in the ratio 1 : 2 : 7 (total 10 s⁻¹). Propensities never
/// change, which makes the fixture suited to selection statistics.
pub fn three_channels() -> Fixture {
    let (mut m, refs) = volume_model(&["X"])?;
    for (id, k) in [("r1", 1.0), ("r2", 2.0), ("r3", 7.0)] {
        m.create_reaction("vsys", id, Stoichiometry::volume(vec![], vec![refs[0]]), k)?;
    }
    single_comp(m)
}

/// Birth-death process in `cyt`: `birth` (→ A) and `death` (A →).
/// The stationary mean of A is `birth / death`.
pub fn birth_death(birth: f64, death: f64) -> Fixture {
    let (mut m, refs) = volume_model(&["A"])?;
    let a = refs[0];
    m.create_reaction("vsys", "birth", Stoichiometry::volume(vec![], vec![a]), birth)?;
    m.create_reaction("vsys", "death", Stoichiometry::volume(vec![a], vec![]), death)?;
    single_comp(m)
}

/// First-order decay `decay` (A →) in `cyt`. Halts once A is gone.
pub fn decay(k: f64) -> Fixture {
    let (mut m, refs) = volume_model(&["A"])?;
    m.create_reaction("vsys", "decay", Stoichiometry::volume(vec![refs[0]], vec![]), k)?;
    single_comp(m)
}

/// Reversible dimerisation in `cyt`: `dimerise` (A + A → A2, second order,
/// `kf` in M⁻¹s⁻¹) and `split` (A2 → A + A, `kb` in s⁻¹).
pub fn dimerisation(kf: f64, kb: f64) -> Fixture {
    let (mut m, refs) = volume_model(&["A", "A2"])?;
    let (a, a2) = (refs[0], refs[1]);
    m.create_reaction("vsys", "dimerise", Stoichiometry::volume(vec![a, a], vec![a2]), kf)?;
    m.create_reaction("vsys", "split", Stoichiometry::volume(vec![a2], vec![a, a]), kb)?;
    single_comp(m)
}

/// Ligand/receptor system across a membrane.
///
/// Compartments `cyt` (inner) and `ext` (outer), patch `memb` between them.
/// Species: `L` ligand, `R` receptor, `LR` complex.
///
/// * `memb.bind`: L(ext) + R → LR, second order
/// * `memb.unbind`: LR → R + L(ext)
/// * `memb.endocytose`: LR → R + L(cyt)
/// * `cyt.degrade`: L →
pub fn membrane() -> Fixture {
    let mut m = Model::new();
    let l = m.add_species("L")?;
    let r = m.add_species("R")?;
    let lr = m.add_species("LR")?;
    m.add_volsys("cytsys")?;
    m.add_surfsys("membsys")?;
    let bind = Stoichiometry::default().vlhs(vec![l]).slhs(vec![r]).srhs(vec![lr]);
    let unbind = Stoichiometry::default().slhs(vec![lr]).srhs(vec![r]).orhs(vec![l]);
    let endocytose = Stoichiometry::default().slhs(vec![lr]).srhs(vec![r]).irhs(vec![l]);
    m.create_reaction("membsys", "bind", bind, 1.0e6)?;
    m.create_reaction("membsys", "unbind", unbind, 0.5)?;
    m.create_reaction("membsys", "endocytose", endocytose, 0.1)?;
    m.create_reaction("cytsys", "degrade", Stoichiometry::volume(vec![l], vec![]), 0.2)?;

    let mut g = Geometry::new();
    g.add_comp("cyt", FEMTOLITRE)?;
    g.add_comp("ext", 4.0 * FEMTOLITRE)?;
    g.add_patch("memb", MEMBRANE_AREA, "cyt", Some("ext"))?;
    g.add_volsys("cyt", "cytsys")?;
    g.add_surfsys("memb", "membsys")?;
    Ok((m, g))
}

/// Installs a `tracing` subscriber that writes through the test harness.
/// Safe to call from several tests; only the first call takes effect.
#[cfg(feature = "tracing-subscriber")]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}
