#![no_main]

use libfuzzer_sys::fuzz_target;
use wellmixed_core::model::{Model, Stoichiometry};

#[derive(Debug, Clone, arbitrary::Arbitrary)]
enum Op {
    SetVlhs(Vec<u8>),
    SetSlhs(Vec<u8>),
    SetIrhs(Vec<u8>),
    SetKcst(f64),
    SetInner(bool),
    Rename(String),
    Remove,
}

fuzz_target!(|ops: Vec<Op>| {
    let mut m = Model::new();
    let refs: Vec<_> = ["A", "B", "C"].iter().filter_map(|s| m.add_species(s).ok()).collect();
    if refs.len() != 3 || m.add_surfsys("ssys").is_err() {
        return;
    }
    let pick = |idxs: &[u8]| -> Vec<_> { idxs.iter().take(4).map(|&i| refs[usize::from(i) % 3]).collect() };
    if m.create_reaction("ssys", "r", Stoichiometry::default(), 1.0).is_err() {
        return;
    }

    let mut id = String::from("r");
    for op in ops.into_iter().take(64) {
        match op {
            Op::Rename(new_id) => {
                if m.rename_reaction("ssys", &id, &new_id).is_ok() {
                    id = new_id;
                }
            }
            Op::Remove => {
                if let Ok(removed) = m.remove_reaction("ssys", &id) {
                    assert!(removed.is_detached());
                    assert_eq!(removed.order(), 0);
                    assert!(m.reaction("ssys", &id).is_none());
                }
                return;
            }
            op => {
                let Ok(r) = m.reaction_mut("ssys", &id) else { return };
                let before = r.kcst();
                let _ = match op {
                    Op::SetVlhs(s) => r.set_vlhs(pick(&s)),
                    Op::SetSlhs(s) => r.set_slhs(pick(&s)),
                    Op::SetIrhs(s) => r.set_irhs(pick(&s)),
                    Op::SetKcst(k) => r.set_kcst(k),
                    Op::SetInner(b) => r.set_inner(b),
                    Op::Rename(_) | Op::Remove => Ok(()),
                };
                assert_eq!(r.order(), r.vlhs().len() + r.slhs().len());
                assert!(r.kcst() >= 0.0 || r.kcst() == before);
            }
        }
    }
});
