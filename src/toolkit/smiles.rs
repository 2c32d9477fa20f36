//! SMILES reader for the reference toolkit.
//!
//! Stereo marks (`@`, `/`, `\`) and atom classes are accepted and dropped;
//! the toolkit does not carry stereochemistry.

use std::collections::BTreeMap;

use crate::bond::BondOrder;
use crate::element;

use super::error::SmilesError;
use super::{ToolkitAtom, ToolkitBond, ToolkitMol};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Atom(AtomToken),
    Bond(BondToken),
    RingClosure { digit: u16, pos: usize },
    OpenParen(usize),
    CloseParen(usize),
    Dot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AtomToken {
    atomic_num: u8,
    is_aromatic: bool,
    isotope: u16,
    /// `Some` for bracket atoms, whose hydrogens are never implicit.
    hcount: Option<u8>,
    charge: i8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BondToken {
    Single,
    Double,
    Triple,
    Aromatic,
}

fn tokenize(input: &str) -> Result<Vec<Token>, SmilesError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        match ch {
            '[' => {
                let (tok, next) = parse_bracket_atom(&chars, i)?;
                tokens.push(Token::Atom(tok));
                i = next;
            }
            'B' | 'C' if chars.get(i + 1) == Some(&if ch == 'B' { 'r' } else { 'l' }) => {
                let symbol: String = chars[i..i + 2].iter().collect();
                tokens.push(Token::Atom(bare_atom(&symbol, false, i)?));
                i += 2;
            }
            'B' | 'C' | 'N' | 'O' | 'P' | 'S' | 'F' | 'I' => {
                tokens.push(Token::Atom(bare_atom(&ch.to_string(), false, i)?));
                i += 1;
            }
            'b' | 'c' | 'n' | 'o' | 'p' | 's' => {
                tokens.push(Token::Atom(bare_atom(&ch.to_string(), true, i)?));
                i += 1;
            }
            '-' | '/' | '\\' => {
                tokens.push(Token::Bond(BondToken::Single));
                i += 1;
            }
            '=' => {
                tokens.push(Token::Bond(BondToken::Double));
                i += 1;
            }
            '#' => {
                tokens.push(Token::Bond(BondToken::Triple));
                i += 1;
            }
            ':' => {
                tokens.push(Token::Bond(BondToken::Aromatic));
                i += 1;
            }
            '(' => {
                tokens.push(Token::OpenParen(i));
                i += 1;
            }
            ')' => {
                tokens.push(Token::CloseParen(i));
                i += 1;
            }
            '.' => {
                tokens.push(Token::Dot);
                i += 1;
            }
            '%' => {
                let (digit, next) = parse_percent_ring(&chars, i)?;
                tokens.push(Token::RingClosure { digit, pos: i });
                i = next;
            }
            d @ '0'..='9' => {
                tokens.push(Token::RingClosure {
                    digit: (d as u16) - b'0' as u16,
                    pos: i,
                });
                i += 1;
            }
            ch => return Err(SmilesError::UnexpectedChar { pos: i, ch }),
        }
    }

    Ok(tokens)
}

fn bare_atom(symbol: &str, aromatic: bool, pos: usize) -> Result<AtomToken, SmilesError> {
    let atomic_num = if aromatic {
        element::aromatic_atomic_num(symbol)
    } else {
        element::atomic_num(symbol)
    };
    let atomic_num = atomic_num.ok_or_else(|| SmilesError::InvalidElement {
        pos,
        text: symbol.to_string(),
    })?;
    Ok(AtomToken {
        atomic_num,
        is_aromatic: aromatic,
        isotope: 0,
        hcount: None,
        charge: 0,
    })
}

/// `%nn` or `%(n...)`.
fn parse_percent_ring(chars: &[char], start: usize) -> Result<(u16, usize), SmilesError> {
    let bad = SmilesError::UnexpectedChar { pos: start, ch: '%' };
    let mut i = start + 1;
    if chars.get(i) == Some(&'(') {
        i += 1;
        let mut value: u16 = 0;
        let digits_start = i;
        while let Some(d) = chars.get(i).and_then(|c| c.to_digit(10)) {
            value = value
                .checked_mul(10)
                .and_then(|v| v.checked_add(d as u16))
                .ok_or_else(|| bad.clone())?;
            i += 1;
        }
        if i == digits_start || chars.get(i) != Some(&')') {
            return Err(bad);
        }
        return Ok((value, i + 1));
    }
    match (
        chars.get(i).and_then(|c| c.to_digit(10)),
        chars.get(i + 1).and_then(|c| c.to_digit(10)),
    ) {
        (Some(d1), Some(d2)) => Ok(((d1 * 10 + d2) as u16, i + 2)),
        _ => Err(bad),
    }
}

fn parse_bracket_atom(chars: &[char], start: usize) -> Result<(AtomToken, usize), SmilesError> {
    let mut i = start + 1;

    let isotope = parse_isotope(chars, &mut i)?;
    let (atomic_num, is_aromatic) = parse_bracket_element(chars, &mut i, start)?;
    skip_chirality(chars, &mut i);
    let hcount = parse_hcount(chars, &mut i);
    let charge = parse_charge(chars, &mut i, start)?;
    skip_atom_class(chars, &mut i);

    if chars.get(i) != Some(&']') {
        return Err(SmilesError::UnclosedBracket { pos: start });
    }
    i += 1;

    Ok((
        AtomToken {
            atomic_num,
            is_aromatic,
            isotope,
            hcount: Some(hcount.unwrap_or(0)),
            charge,
        },
        i,
    ))
}

fn parse_isotope(chars: &[char], i: &mut usize) -> Result<u16, SmilesError> {
    let start = *i;
    let mut val: u16 = 0;
    while let Some(d) = chars.get(*i).and_then(|c| c.to_digit(10)) {
        val = val
            .checked_mul(10)
            .and_then(|v| v.checked_add(d as u16))
            .ok_or(SmilesError::InvalidIsotope { pos: start })?;
        *i += 1;
    }
    Ok(val)
}

fn parse_bracket_element(
    chars: &[char],
    i: &mut usize,
    bracket_start: usize,
) -> Result<(u8, bool), SmilesError> {
    let Some(&first) = chars.get(*i) else {
        return Err(SmilesError::UnclosedBracket { pos: bracket_start });
    };

    let two: Option<String> = chars
        .get(*i + 1)
        .filter(|c| c.is_ascii_lowercase())
        .map(|&second| [first, second].iter().collect());

    if first.is_ascii_lowercase() {
        if let Some(num) = two.as_deref().and_then(element::aromatic_atomic_num) {
            *i += 2;
            return Ok((num, true));
        }
        if let Some(num) = element::aromatic_atomic_num(&first.to_string()) {
            *i += 1;
            return Ok((num, true));
        }
    } else if first.is_ascii_uppercase() {
        if let Some(num) = two.as_deref().and_then(element::atomic_num) {
            *i += 2;
            return Ok((num, false));
        }
        if let Some(num) = element::atomic_num(&first.to_string()) {
            *i += 1;
            return Ok((num, false));
        }
    }

    Err(SmilesError::InvalidElement {
        pos: *i,
        text: first.to_string(),
    })
}

fn skip_chirality(chars: &[char], i: &mut usize) {
    while chars.get(*i) == Some(&'@') {
        *i += 1;
    }
}

fn parse_hcount(chars: &[char], i: &mut usize) -> Option<u8> {
    if chars.get(*i) != Some(&'H') {
        return None;
    }
    *i += 1;
    match chars.get(*i).and_then(|c| c.to_digit(10)) {
        Some(d) => {
            *i += 1;
            Some(d as u8)
        }
        None => Some(1),
    }
}

fn parse_charge(chars: &[char], i: &mut usize, bracket_start: usize) -> Result<i8, SmilesError> {
    let sign: i8 = match chars.get(*i) {
        Some('+') => 1,
        Some('-') => -1,
        _ => return Ok(0),
    };
    let sign_char = chars[*i];
    *i += 1;
    let invalid = SmilesError::InvalidCharge { pos: bracket_start };

    if chars.get(*i).is_some_and(|c| c.is_ascii_digit()) {
        let mut val: i8 = 0;
        while let Some(d) = chars.get(*i).and_then(|c| c.to_digit(10)) {
            val = val
                .checked_mul(10)
                .and_then(|v| v.checked_add(d as i8))
                .ok_or_else(|| invalid.clone())?;
            *i += 1;
        }
        return Ok(sign * val);
    }

    let mut count: i8 = 1;
    while chars.get(*i) == Some(&sign_char) {
        count = count.checked_add(1).ok_or_else(|| invalid.clone())?;
        *i += 1;
    }
    Ok(sign * count)
}

fn skip_atom_class(chars: &[char], i: &mut usize) {
    if chars.get(*i) == Some(&':') {
        *i += 1;
        while chars.get(*i).is_some_and(|c| c.is_ascii_digit()) {
            *i += 1;
        }
    }
}

struct ParsedBond {
    a: usize,
    b: usize,
    token: Option<BondToken>,
}

struct OpenRing {
    atom: usize,
    bond: Option<BondToken>,
}

/// Reads a SMILES string. Bare organic-subset atoms get implicit hydrogens
/// from their lowest default valence that fits the bonds written; aromatic
/// bare atoms give one of those up to the pi system.
pub fn from_smiles(input: &str) -> Result<ToolkitMol, SmilesError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(SmilesError::EmptyInput);
    }
    let tokens = tokenize(trimmed)?;

    let mut atoms: Vec<AtomToken> = Vec::new();
    let mut bonds: Vec<ParsedBond> = Vec::new();
    let mut stack: Vec<usize> = Vec::new();
    let mut current: Option<usize> = None;
    let mut pending_bond: Option<BondToken> = None;
    let mut rings: BTreeMap<u16, OpenRing> = BTreeMap::new();

    for token in tokens {
        match token {
            Token::Atom(atom) => {
                let idx = atoms.len();
                atoms.push(atom);
                if let Some(cur) = current {
                    bonds.push(ParsedBond {
                        a: cur,
                        b: idx,
                        token: pending_bond.take(),
                    });
                }
                pending_bond = None;
                current = Some(idx);
            }
            Token::Bond(b) => pending_bond = Some(b),
            Token::RingClosure { digit, pos } => {
                let cur = current.ok_or(SmilesError::InvalidRingBond { digit, pos })?;
                match rings.remove(&digit) {
                    Some(open) => {
                        let token = match (pending_bond.take(), open.bond) {
                            (Some(b1), Some(b2)) if b1 != b2 => {
                                return Err(SmilesError::RingBondConflict { digit });
                            }
                            (b1, b2) => b1.or(b2),
                        };
                        let duplicate = bonds.iter().any(|pb| {
                            (pb.a == cur && pb.b == open.atom) || (pb.a == open.atom && pb.b == cur)
                        });
                        if open.atom == cur || duplicate {
                            return Err(SmilesError::InvalidRingBond { digit, pos });
                        }
                        bonds.push(ParsedBond {
                            a: open.atom,
                            b: cur,
                            token,
                        });
                    }
                    None => {
                        rings.insert(
                            digit,
                            OpenRing {
                                atom: cur,
                                bond: pending_bond.take(),
                            },
                        );
                    }
                }
            }
            Token::OpenParen(pos) => {
                let cur = current.ok_or(SmilesError::UnmatchedParen { pos })?;
                stack.push(cur);
            }
            Token::CloseParen(pos) => {
                current = Some(stack.pop().ok_or(SmilesError::UnmatchedParen { pos })?);
                pending_bond = None;
            }
            Token::Dot => {
                current = None;
                pending_bond = None;
            }
        }
    }

    if !stack.is_empty() {
        return Err(SmilesError::UnmatchedParen {
            pos: trimmed.chars().count(),
        });
    }
    if let Some((&digit, _)) = rings.iter().next() {
        return Err(SmilesError::UnclosedRing { digit });
    }

    let orders: Vec<BondOrder> = bonds
        .iter()
        .map(|pb| resolve_bond_order(pb.token, atoms[pb.a].is_aromatic, atoms[pb.b].is_aromatic))
        .collect();

    let mut bond_sums = vec![0u8; atoms.len()];
    for (pb, order) in bonds.iter().zip(&orders) {
        let contribution = reader_contribution(*order);
        bond_sums[pb.a] = bond_sums[pb.a].saturating_add(contribution);
        bond_sums[pb.b] = bond_sums[pb.b].saturating_add(contribution);
    }

    let mut mol = ToolkitMol::new();
    for (atom, bond_sum) in atoms.iter().zip(bond_sums) {
        let implicit_hydrogens = match atom.hcount {
            Some(h) => h,
            None => implicit_h_for_bare_atom(atom.atomic_num, atom.is_aromatic, bond_sum),
        };
        mol.add_atom(ToolkitAtom {
            atomic_num: atom.atomic_num,
            formal_charge: atom.charge,
            isotope: atom.isotope,
            implicit_hydrogens,
            is_aromatic: atom.is_aromatic,
        });
    }
    for (pb, order) in bonds.iter().zip(orders) {
        mol.push_bond(pb.a, pb.b, ToolkitBond { order });
    }

    Ok(mol)
}

fn resolve_bond_order(token: Option<BondToken>, from_aromatic: bool, to_aromatic: bool) -> BondOrder {
    match token {
        Some(BondToken::Single) => BondOrder::Single,
        Some(BondToken::Double) => BondOrder::Double,
        Some(BondToken::Triple) => BondOrder::Triple,
        Some(BondToken::Aromatic) => BondOrder::Aromatic,
        None if from_aromatic && to_aromatic => BondOrder::Aromatic,
        None => BondOrder::Single,
    }
}

/// Bond order as counted when assigning implicit hydrogens to bare atoms:
/// aromatic bonds count one.
pub(crate) fn reader_contribution(order: BondOrder) -> u8 {
    match order {
        BondOrder::Single | BondOrder::Aromatic => 1,
        BondOrder::Double => 2,
        BondOrder::Triple => 3,
    }
}

pub(crate) fn implicit_h_for_bare_atom(atomic_num: u8, is_aromatic: bool, bond_sum: u8) -> u8 {
    let Some(&target) = element::default_valences(atomic_num)
        .iter()
        .find(|&&v| v >= bond_sum)
    else {
        return 0;
    };
    let h = target - bond_sum;
    if is_aromatic && h > 0 { h - 1 } else { h }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn implicit_hs(smiles: &str) -> Vec<u8> {
        let mol = from_smiles(smiles).unwrap();
        (0..mol.atom_count())
            .map(|i| mol.atom(i).unwrap().implicit_hydrogens)
            .collect()
    }

    #[test]
    fn organic_subset_hydrogens() {
        assert_eq!(implicit_hs("C"), vec![4]);
        assert_eq!(implicit_hs("CC"), vec![3, 3]);
        assert_eq!(implicit_hs("C=C"), vec![2, 2]);
        assert_eq!(implicit_hs("C#N"), vec![1, 0]);
        assert_eq!(implicit_hs("CCl"), vec![3, 0]);
        assert_eq!(implicit_hs("CS(=O)(=O)C"), vec![3, 0, 0, 0, 3]);
    }

    #[test]
    fn aromatic_hydrogens() {
        assert_eq!(implicit_hs("c1ccccc1"), vec![1; 6]);
        assert_eq!(implicit_hs("n1ccccc1"), vec![0, 1, 1, 1, 1, 1]);
        assert_eq!(implicit_hs("c1cc[nH]c1"), vec![1, 1, 1, 1, 1]);
    }

    #[test]
    fn bracket_atoms() {
        let mol = from_smiles("[NH4+]").unwrap();
        let n = mol.atom(0).unwrap();
        assert_eq!(n.atomic_num, 7);
        assert_eq!(n.implicit_hydrogens, 4);
        assert_eq!(n.formal_charge, 1);

        let mol = from_smiles("[13CH3][O-]").unwrap();
        assert_eq!(mol.atom(0).unwrap().isotope, 13);
        assert_eq!(mol.atom(1).unwrap().formal_charge, -1);
        assert_eq!(mol.atom(1).unwrap().implicit_hydrogens, 0);

        assert_eq!(from_smiles("[Fe++]").unwrap().atom(0).unwrap().formal_charge, 2);
        assert_eq!(from_smiles("[se]1cccc1").unwrap().atom(0).unwrap().atomic_num, 34);
    }

    #[test]
    fn bond_orders() {
        let mol = from_smiles("c1ccccc1-c1ccccc1").unwrap();
        assert_eq!(mol.bond_count(), 13);
        assert_eq!(mol.bond(0).unwrap().order, BondOrder::Aromatic);
        assert_eq!(mol.bond(6).unwrap().order, BondOrder::Single);

        let ring_closure = from_smiles("C=1CCCCC=1").unwrap();
        assert_eq!(ring_closure.bond(5).unwrap().order, BondOrder::Double);
    }

    #[test]
    fn ring_closure_forms() {
        let mol = from_smiles("C%10CC%10").unwrap();
        assert_eq!(mol.bond_count(), 3);
        let mol = from_smiles("C%(123)CC%(123)").unwrap();
        assert_eq!(mol.bond_count(), 3);
    }

    #[test]
    fn stereo_marks_are_dropped() {
        let mol = from_smiles("F/C=C/[C@@H](Cl)Br").unwrap();
        assert_eq!(mol.atom_count(), 6);
        assert_eq!(mol.atom(3).unwrap().implicit_hydrogens, 1);
    }

    #[test]
    fn errors() {
        assert_eq!(from_smiles(""), Err(SmilesError::EmptyInput));
        assert_eq!(from_smiles("C1CC"), Err(SmilesError::UnclosedRing { digit: 1 }));
        assert_eq!(from_smiles("[CH4"), Err(SmilesError::UnclosedBracket { pos: 0 }));
        assert!(matches!(from_smiles("C(C"), Err(SmilesError::UnmatchedParen { .. })));
        assert!(matches!(from_smiles("CX"), Err(SmilesError::UnexpectedChar { pos: 1, ch: 'X' })));
        assert!(matches!(from_smiles("[Xx]"), Err(SmilesError::InvalidElement { .. })));
        assert_eq!(
            from_smiles("C=1CC-1"),
            Err(SmilesError::RingBondConflict { digit: 1 })
        );
        assert!(matches!(from_smiles("CC11"), Err(SmilesError::InvalidRingBond { .. })));
    }
}
