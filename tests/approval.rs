use serde::Deserialize;

use chemical_perception::{Molecule, ToolkitMol, build_molecule, search_smarts};

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

fn load(smiles: &str, explicit_h: bool) -> Molecule {
    let mut tk = ToolkitMol::from_smiles(smiles)
        .unwrap_or_else(|e| panic!("failed to read {smiles:?}: {e}"));
    if explicit_h {
        tk.add_explicit_hydrogens();
    }
    build_molecule(&mut tk).unwrap()
}

// ---------------------------------------------------------------------------
// 1. Match counts
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct MatchCountEntry {
    smiles: String,
    explicit_h: bool,
    smarts: String,
    count: usize,
}

#[test]
fn approval_match_counts() {
    let data: Vec<MatchCountEntry> =
        serde_json::from_str(include_str!("approval_data/match_counts.json")).unwrap();

    let mut failures = Vec::new();
    for entry in &data {
        let mol = load(&entry.smiles, entry.explicit_h);
        let got = search_smarts(&mol, &entry.smarts).unwrap().len();
        if got != entry.count {
            failures.push(format!(
                "{} / {}: expected {}, got {got}",
                entry.smiles, entry.smarts, entry.count
            ));
        }
    }
    assert!(failures.is_empty(), "match count mismatches:\n{}", failures.join("\n"));
}

// ---------------------------------------------------------------------------
// 2. Atom properties
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct PropertyEntry {
    smiles: String,
    explicit_h: bool,
    atom: usize,
    degree: u8,
    connectivity: u8,
    valence: u8,
    hydrogen_count: u8,
    ring_connectivity: u8,
    min_ring_size: u8,
    is_aromatic: bool,
}

#[test]
fn approval_atom_properties() {
    let data: Vec<PropertyEntry> =
        serde_json::from_str(include_str!("approval_data/properties.json")).unwrap();

    let mut failures = Vec::new();
    for entry in &data {
        let mol = load(&entry.smiles, entry.explicit_h);
        let atom = mol.atom_at(entry.atom).unwrap();
        let got = (
            atom.degree(),
            atom.connectivity(),
            atom.valence(),
            atom.hydrogen_count(),
            atom.ring_connectivity(),
            atom.min_ring_size(),
            atom.is_aromatic(),
        );
        let expected = (
            entry.degree,
            entry.connectivity,
            entry.valence,
            entry.hydrogen_count,
            entry.ring_connectivity,
            entry.min_ring_size,
            entry.is_aromatic,
        );
        if got != expected {
            failures.push(format!(
                "{} atom {}: expected {expected:?}, got {got:?}",
                entry.smiles, entry.atom
            ));
        }
    }
    assert!(failures.is_empty(), "property mismatches:\n{}", failures.join("\n"));
}

// ---------------------------------------------------------------------------
// 3. Serialized results
// ---------------------------------------------------------------------------

#[test]
fn approval_serialized_results() {
    let mol = load("CC(=O)O", false);
    let results = search_smarts(&mol, "[#6:1](=[#8:2])-[#8:3]").unwrap();
    let json = serde_json::to_string(&results).unwrap();
    assert_eq!(json, r#"[{"1":1,"2":2,"3":3}]"#);
}
