use crate::*;

fn explicit_methane() -> Molecule {
    let mut tk = ToolkitMol::from_smiles("C").unwrap();
    tk.add_explicit_hydrogens();
    build_molecule(&mut tk).unwrap()
}

fn heavy(smiles: &str) -> Molecule {
    build_molecule(&mut ToolkitMol::from_smiles(smiles).unwrap()).unwrap()
}

#[test]
fn methane_counts_and_carbon_properties() {
    let mol = explicit_methane();
    assert_eq!(mol.atom_count(), 5);
    assert_eq!(mol.bond_count(), 4);

    let c = mol.atom_at(0).unwrap();
    assert_eq!(c.atomic_number(), 6);
    assert_eq!(c.degree(), 4);
    assert_eq!(c.connectivity(), 4);
    assert_eq!(c.valence(), 4);
    assert_eq!(c.formal_charge(), 0);
    assert_eq!(c.hydrogen_count(), 4);
    assert_eq!(c.ring_connectivity(), 0);
    assert_eq!(c.min_ring_size(), 0);
    assert!(!c.is_aromatic());
    assert!(!c.is_in_ring());
}

#[test]
fn methane_bonds() {
    let mol = explicit_methane();
    for bond in mol.bonds() {
        assert_eq!(bond.order(), BondOrder::Single);
        assert_eq!(bond.order().as_int(), Some(1));
        assert!(bond.is_single());
        assert!(!bond.is_double());
        assert!(!bond.is_triple());
        assert!(!bond.is_ring());
        assert!(!bond.is_aromatic());
        let [a, b] = bond.endpoints();
        assert_eq!(a.index(), 0);
        assert_eq!(b.atomic_number(), 1);
    }
}

#[test]
fn methane_c_h_search() {
    let mol = explicit_methane();
    let pattern: QueryGraph = "[#6:1]-[#1:2]".parse().unwrap();
    let results = search(&mol, &pattern).unwrap();
    assert_eq!(results.len(), 4);

    let mut hydrogens: Vec<usize> = results
        .iter()
        .map(|r| {
            assert_eq!(r.map_numbers().collect::<Vec<_>>(), [1, 2]);
            assert_eq!(r.get(1), Some(0));
            r.get(2).unwrap()
        })
        .collect();
    hydrogens.sort_unstable();
    hydrogens.dedup();
    assert_eq!(hydrogens, [1, 2, 3, 4]);
}

#[test]
fn atom_at_bounds() {
    let mol = explicit_methane();
    for i in 0..mol.atom_count() {
        assert_eq!(mol.atom_at(i).unwrap().index(), i);
    }
    assert!(matches!(
        mol.atom_at(mol.atom_count()),
        Err(PerceptionError::IndexOutOfRange {
            kind: IndexKind::Atom,
            index: 5,
            len: 5
        })
    ));
    assert!(matches!(
        mol.bond_at(4),
        Err(PerceptionError::IndexOutOfRange {
            kind: IndexKind::Bond,
            ..
        })
    ));
}

#[test]
fn canonical_string_is_stable() {
    let mol = explicit_methane();
    assert_eq!(mol.canonical_string(), "C");
    assert_eq!(mol.canonical_string(), mol.canonical_string());
    assert_eq!(heavy("OCC").canonical_string(), heavy("CCO").canonical_string());
}

#[test]
fn search_is_deterministic() {
    let mol = heavy("c1ccc2ccccc2c1");
    let pattern = from_smarts("[#6:1]~[#6:2]~[#6:3]").unwrap();
    let first = search(&mol, &pattern).unwrap();
    let second = search(&mol, &pattern).unwrap();
    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn is_connected_to_is_symmetric() {
    let mol = heavy("CC(C)O");
    for a in mol.atoms() {
        for b in mol.atoms() {
            assert_eq!(
                a.is_connected_to(&b).unwrap(),
                b.is_connected_to(&a).unwrap()
            );
        }
    }
    let other = mol.clone();
    assert!(matches!(
        mol.atom_at(0).unwrap().is_connected_to(&other.atom_at(1).unwrap()),
        Err(PerceptionError::CrossMoleculeComparison)
    ));
}

#[test]
fn snapshot_survives_toolkit_mutation() {
    let mut tk = ToolkitMol::from_smiles("CO").unwrap();
    let mol = build_molecule(&mut tk).unwrap();
    tk.atom_mut(1).unwrap().atomic_num = 7;
    tk.add_explicit_hydrogens();
    assert_eq!(mol.atom_count(), 2);
    assert_eq!(mol.atom_at(1).unwrap().atomic_number(), 8);
    assert_eq!(mol.canonical_string(), "CO");
}

#[test]
fn ring_predicates_on_benzene_and_cyclohexane() {
    let benzene = heavy("c1ccccc1");
    let cyclohexane = heavy("C1CCCCC1");

    let aromatic_ring = from_smarts("[a;r6:1]:[a:2]").unwrap();
    assert_eq!(search(&benzene, &aromatic_ring).unwrap().len(), 12);
    assert!(search(&cyclohexane, &aromatic_ring).unwrap().is_empty());

    let aliphatic_ring = from_smarts("[C;R;x2:1]@[C:2]").unwrap();
    assert_eq!(search(&cyclohexane, &aliphatic_ring).unwrap().len(), 12);
    assert!(!has_match(&benzene, &aliphatic_ring).unwrap());
}

#[test]
fn force_field_style_environments() {
    let acetic_acid = heavy("CC(=O)O");
    let carbonyl = from_smarts("[#6X3:1](=[#8X1:2])-[#8X2H1:3]").unwrap();
    let hits = search(&acetic_acid, &carbonyl).unwrap();
    assert_eq!(hits, [MatchResult::from_pairs([(1, 1), (2, 2), (3, 3)])]);

    let methyl = from_smarts("[#6X4:1]-[#6X3]").unwrap();
    let hits = search(&acetic_acid, &methyl).unwrap();
    assert_eq!(hits, [MatchResult::from_pairs([(1, 0)])]);
}

#[test]
fn partially_mapped_pattern_collapses() {
    let mol = explicit_methane();
    let pattern = from_smarts("[#1:1]-[#6]-[#1]").unwrap();
    let results = search(&mol, &pattern).unwrap();
    assert_eq!(results.len(), 4);
}

#[test]
fn search_options_deserialize() {
    let options: SearchOptions =
        serde_json::from_str(r#"{"step_budget": 50, "max_matches": 2}"#).unwrap();
    assert_eq!(
        options,
        SearchOptions::new().with_step_budget(50).with_max_matches(2)
    );
    let mol = explicit_methane();
    let pattern = from_smarts("[#6:1]-[#1:2]").unwrap();
    assert_eq!(search_with(&mol, &pattern, &options).unwrap().len(), 2);
}

#[test]
fn pattern_syntax_errors_propagate() {
    let mol = explicit_methane();
    assert!(matches!(
        search_smarts(&mol, "[#6:1"),
        Err(PerceptionError::PatternSyntax(SmartsError::UnclosedBracket { .. }))
    ));
    assert!(matches!(
        mol.smirks_search("[#6:1]>>[#6:1]"),
        Err(PerceptionError::PatternSyntax(SmartsError::Unsupported { .. }))
    ));
}

#[test]
fn capability_traits_are_generic() {
    fn heavy_neighbors<A: AtomCapabilities>(atom: &A) -> u8 {
        atom.connectivity() - atom.hydrogen_count()
    }
    let mol = heavy("CC(C)(C)O");
    let center = mol.atom_at(1).unwrap();
    assert_eq!(heavy_neighbors(&center), 4);
    assert_eq!(heavy_neighbors(center.properties()), 4);
}

#[test]
fn shared_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Molecule>();
    assert_send_sync::<QueryGraph>();
    assert_send_sync::<MatchResult>();
}
