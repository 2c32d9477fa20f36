//! Periodic table lookups used by the SMILES/SMARTS readers and writers.

const SYMBOLS: [&str; 118] = [
    "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne", //
    "Na", "Mg", "Al", "Si", "P", "S", "Cl", "Ar", "K", "Ca", //
    "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn", //
    "Ga", "Ge", "As", "Se", "Br", "Kr", "Rb", "Sr", "Y", "Zr", //
    "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd", "In", "Sn", //
    "Sb", "Te", "I", "Xe", "Cs", "Ba", "La", "Ce", "Pr", "Nd", //
    "Pm", "Sm", "Eu", "Gd", "Tb", "Dy", "Ho", "Er", "Tm", "Yb", //
    "Lu", "Hf", "Ta", "W", "Re", "Os", "Ir", "Pt", "Au", "Hg", //
    "Tl", "Pb", "Bi", "Po", "At", "Rn", "Fr", "Ra", "Ac", "Th", //
    "Pa", "U", "Np", "Pu", "Am", "Cm", "Bk", "Cf", "Es", "Fm", //
    "Md", "No", "Lr", "Rf", "Db", "Sg", "Bh", "Hs", "Mt", "Ds", //
    "Rg", "Cn", "Nh", "Fl", "Mc", "Lv", "Ts", "Og",
];

/// Element symbols that may be written in lowercase (aromatic) form inside
/// brackets, longest first so `se` wins over `s`.
pub const AROMATIC_SYMBOLS: [(&str, u8); 9] = [
    ("se", 34),
    ("as", 33),
    ("te", 52),
    ("b", 5),
    ("c", 6),
    ("n", 7),
    ("o", 8),
    ("p", 15),
    ("s", 16),
];

pub fn symbol(atomic_num: u8) -> Option<&'static str> {
    SYMBOLS.get((atomic_num as usize).checked_sub(1)?).copied()
}

pub fn atomic_num(symbol: &str) -> Option<u8> {
    SYMBOLS
        .iter()
        .position(|&s| s == symbol)
        .map(|i| (i + 1) as u8)
}

pub fn aromatic_atomic_num(symbol: &str) -> Option<u8> {
    AROMATIC_SYMBOLS
        .iter()
        .find(|(s, _)| *s == symbol)
        .map(|&(_, n)| n)
}

/// Normal valences used to derive implicit hydrogens for organic-subset atoms.
pub fn default_valences(atomic_num: u8) -> &'static [u8] {
    match atomic_num {
        1 => &[1],
        5 => &[3],
        6 => &[4],
        7 => &[3, 5],
        8 => &[2],
        9 | 17 | 35 | 85 => &[1],
        14 | 32 => &[4],
        15 | 33 => &[3, 5],
        16 | 34 | 52 => &[2, 4, 6],
        53 => &[1, 3, 5, 7],
        _ => &[],
    }
}

/// Elements that SMILES allows outside brackets.
pub fn is_organic_subset(atomic_num: u8) -> bool {
    matches!(atomic_num, 5 | 6 | 7 | 8 | 9 | 15 | 16 | 17 | 35 | 53)
}
