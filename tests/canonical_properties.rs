use chemical_perception::{ToolkitAtom, ToolkitMol, build_molecule};

fn canonical(smiles: &str) -> String {
    ToolkitMol::from_smiles(smiles).unwrap().to_canonical_smiles()
}

/// Rebuilds `mol` with atom `i` moved to position `order[i]`.
fn renumber_atoms(mol: &ToolkitMol, order: &[usize]) -> ToolkitMol {
    let mut placed: Vec<(usize, ToolkitAtom)> = (0..mol.atom_count())
        .map(|i| (order[i], mol.atom(i).unwrap().clone()))
        .collect();
    placed.sort_by_key(|&(pos, _)| pos);

    let mut out = ToolkitMol::new();
    for (_, atom) in placed {
        out.add_atom(atom);
    }
    for b in (0..mol.bond_count()).rev() {
        let (a, c) = mol.bond_endpoints(b).unwrap();
        out.add_bond(order[c], order[a], mol.bond(b).unwrap().order)
            .unwrap();
    }
    out
}

fn reversed(n: usize) -> Vec<usize> {
    (0..n).rev().collect()
}

fn rotated(n: usize, by: usize) -> Vec<usize> {
    (0..n).map(|i| (i + by) % n).collect()
}

#[test]
fn fragment_ordering_nacl() {
    let a = canonical("[Na+].[Cl-]");
    let b = canonical("[Cl-].[Na+]");
    assert_eq!(a, b, "fragment ordering: '{a}' vs '{b}'");
}

#[test]
fn fragment_ordering_three() {
    let a = canonical("[Na+].[Cl-].O");
    let b = canonical("O.[Na+].[Cl-]");
    assert_eq!(a, b, "fragment ordering: '{a}' vs '{b}'");
}

#[test]
fn renumbering_does_not_change_canonical_smiles() {
    for smiles in [
        "CCO",
        "CC(C)C",
        "CC(=O)O",
        "c1ccncc1",
        "Cc1ccccc1",
        "OC1CCCCC1",
        "C#N",
        "C[NH3+]",
        "C1=CC=CC=C1",
        "CC1=CC=CC=C1",
        "C=CC=C",
    ] {
        let mol = ToolkitMol::from_smiles(smiles).unwrap();
        let expected = mol.to_canonical_smiles();
        let n = mol.atom_count();
        for order in [reversed(n), rotated(n, 1), rotated(n, n / 2)] {
            let renum = renumber_atoms(&mol, &order);
            assert_eq!(
                renum.to_canonical_smiles(),
                expected,
                "{smiles} renumbered by {order:?}"
            );
        }
    }
}

#[test]
fn explicit_and_implicit_hydrogens_agree() {
    for smiles in ["C", "CCO", "c1ccccc1", "CC(=O)[O-]", "C[NH3+]"] {
        let implicit = ToolkitMol::from_smiles(smiles).unwrap();
        let mut explicit = implicit.clone();
        explicit.add_explicit_hydrogens();
        assert_eq!(
            explicit.to_canonical_smiles(),
            implicit.to_canonical_smiles(),
            "{smiles}"
        );
    }
}

#[test]
fn canonical_survives_snapshot() {
    let mut tk = ToolkitMol::from_smiles("OCC(=O)N").unwrap();
    let expected = tk.to_canonical_smiles();
    let mol = build_molecule(&mut tk).unwrap();
    assert_eq!(mol.canonical_string(), expected);
}

#[test]
fn round_trip_idempotence() {
    for smiles in [
        "OC[C@H]1OC(O)[C@H](O)[C@@H](O)[C@@H]1O",
        "Cn1cnc2c1c(=O)n(C)c(=O)n2C",
        "c1ccc(cc1)-c1ccccc1",
        "C1CC2CCC1CC2",
    ] {
        let once = canonical(smiles);
        let twice = canonical(&once);
        assert_eq!(once, twice, "{smiles}: '{once}' vs '{twice}'");
    }
}

#[test]
fn kekule_rings_are_idempotent() {
    let a = canonical("C1=CC=CC=C1");
    let b = canonical("C=1C=CC=CC=1");
    assert_eq!(a, b, "'{a}' vs '{b}'");
    assert_eq!(canonical(&a), a);

    let toluene = canonical("CC1=CC=CC=C1");
    assert_eq!(canonical("C1=CC=C(C)C=C1"), toluene);
    assert_eq!(canonical(&toluene), toluene);
}
