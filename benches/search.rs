use criterion::{Criterion, black_box, criterion_group, criterion_main};

use chemical_perception::{
    Molecule, QueryGraph, SearchOptions, ToolkitMol, build_molecule, from_smarts, search,
    search_batch,
};

const METHANE: &str = "C";
const CAFFEINE: &str = "Cn1cnc2c1c(=O)n(C)c(=O)n2C";
const ATORVASTATIN: &str =
    "CC(C)c1c(C(=O)Nc2ccccc2)c(-c2ccccc2)c(-c2ccc(F)cc2)n1CC[C@@H](O)C[C@@H](O)CC(=O)O";

const BOND: &str = "[#6X4:1]-[#1:2]";
const TORSION: &str = "[*:1]~[#6X3:2]-[#6X3:3]~[*:4]";
const AMIDE: &str = "[#6X3:1](=[#8X1:2])-[#7X3:3]-[$([#6]);!$([#6]=*):4]";

fn load(smiles: &str) -> Molecule {
    let mut tk = ToolkitMol::from_smiles(smiles).unwrap();
    tk.add_explicit_hydrogens();
    build_molecule(&mut tk).unwrap()
}

fn pattern(smarts: &str) -> QueryGraph {
    from_smarts(smarts).unwrap()
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");

    for (name, smiles) in [("methane", METHANE), ("caffeine", CAFFEINE), ("atorvastatin", ATORVASTATIN)] {
        group.bench_function(name, |b| b.iter(|| black_box(load(black_box(smiles)))));
    }

    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let methane = load(METHANE);
    let caffeine = load(CAFFEINE);
    let atorvastatin = load(ATORVASTATIN);

    let bond = pattern(BOND);
    let torsion = pattern(TORSION);
    let amide = pattern(AMIDE);

    let mut group = c.benchmark_group("search");

    group.bench_function("methane/bond", |b| {
        b.iter(|| black_box(search(black_box(&methane), &bond).unwrap()))
    });
    group.bench_function("caffeine/torsion", |b| {
        b.iter(|| black_box(search(black_box(&caffeine), &torsion).unwrap()))
    });
    group.bench_function("atorvastatin/torsion", |b| {
        b.iter(|| black_box(search(black_box(&atorvastatin), &torsion).unwrap()))
    });
    group.bench_function("atorvastatin/amide", |b| {
        b.iter(|| black_box(search(black_box(&atorvastatin), &amide).unwrap()))
    });

    group.finish();
}

fn bench_batch(c: &mut Criterion) {
    let mols: Vec<Molecule> = (0..64)
        .map(|i| load([METHANE, CAFFEINE, ATORVASTATIN][i % 3]))
        .collect();
    let torsion = pattern(TORSION);
    let options = SearchOptions::default();

    c.bench_function("batch/torsion", |b| {
        b.iter(|| black_box(search_batch(black_box(&mols), &torsion, &options)))
    });
}

fn bench_parse_smarts(c: &mut Criterion) {
    let mut group = c.benchmark_group("smarts");

    group.bench_function("torsion", |b| b.iter(|| black_box(pattern(black_box(TORSION)))));
    group.bench_function("amide", |b| b.iter(|| black_box(pattern(black_box(AMIDE)))));

    group.finish();
}

criterion_group!(benches, bench_build, bench_search, bench_batch, bench_parse_smarts);
criterion_main!(benches);
