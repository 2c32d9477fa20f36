//! The structured pattern a substructure search runs against.
//!
//! A [`QueryGraph`] mirrors a molecule, but its atoms carry [`AtomExpr`]
//! predicate trees instead of fixed properties and its bonds carry
//! [`BondExpr`] trees. Atoms that should be reported in match results carry a
//! map-number. Patterns are usually produced by
//! [`from_smarts`](crate::smarts::from_smarts) but can be assembled by hand.

use std::collections::HashMap;
use std::str::FromStr;

use petgraph::graph::{NodeIndex, UnGraph};

use crate::error::{IndexKind, PerceptionError, Result};
use crate::molecule::{Atom, Bond, Molecule};
use crate::smarts::SmartsError;
use crate::traits::{AtomCapabilities, BondCapabilities};

/// Identifies the property being tested in a range expression `{low-high}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RangeKind {
    /// Explicit degree (`D`).
    Degree,
    /// Total connectivity (`X`).
    Connectivity,
    /// Total valence (`v`).
    Valence,
    /// Total hydrogen count (`H`).
    TotalHCount,
    /// Number of ring bonds (`x`).
    RingConnectivity,
    /// Smallest ring size (`r`).
    SmallestRingSize,
}

/// Predicate tree evaluated against a molecule atom.
#[derive(Debug, Clone, PartialEq)]
pub enum AtomExpr {
    /// Matches any atom (`*`).
    True,
    /// Matches by element. `aromatic` is `None` for `#n` (either), `Some(true)`
    /// for lowercase symbols and `Some(false)` for uppercase ones.
    Element {
        atomic_num: u8,
        aromatic: Option<bool>,
    },
    /// Any aromatic atom (`a`).
    Aromatic,
    /// Any aliphatic atom (`A`).
    Aliphatic,
    /// Explicit degree (`D<n>`).
    Degree(u8),
    /// Total connectivity (`X<n>`).
    Connectivity(u8),
    /// Total valence (`v<n>`).
    Valence(u8),
    /// Total hydrogen count (`H<n>`).
    TotalHCount(u8),
    /// Number of incident ring bonds (`x<n>`).
    RingConnectivity(u8),
    /// Smallest ring containing the atom (`r<n>`).
    SmallestRingSize(u8),
    /// Member of at least one ring (`R`, `r`).
    InRing,
    /// Not a ring member (`R0`).
    NotInRing,
    /// Formal charge (`+`, `-2`, ...).
    Charge(i8),
    /// Numeric property within an inclusive range (`D{1-3}`, `x{1-}`).
    Range {
        kind: RangeKind,
        low: Option<u8>,
        high: Option<u8>,
    },
    /// Recursive pattern (`$(...)`): the atom must be able to play the
    /// sub-pattern's first atom.
    Recursive(Box<QueryGraph>),
    And(Vec<AtomExpr>),
    Or(Vec<AtomExpr>),
    Not(Box<AtomExpr>),
}

/// Predicate tree evaluated against a molecule bond.
///
/// Implicit pattern bonds default to [`BondExpr::SingleOrAromatic`].
#[derive(Debug, Clone, PartialEq)]
pub enum BondExpr {
    /// Any bond (`~`).
    True,
    /// Non-aromatic single bond (`-`).
    Single,
    /// Non-aromatic double bond (`=`).
    Double,
    /// Triple bond (`#`).
    Triple,
    /// Aromatic bond (`:`).
    Aromatic,
    /// Ring bond (`@`).
    Ring,
    /// Implicit bond: single or aromatic.
    SingleOrAromatic,
    And(Vec<BondExpr>),
    Or(Vec<BondExpr>),
    Not(Box<BondExpr>),
}

/// One pattern atom.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryAtom {
    pub expr: AtomExpr,
    /// Positive map-number marking the atom for reporting.
    pub map_number: Option<u16>,
}

/// A pattern graph: predicate atoms joined by predicate bonds.
///
/// Map-numbers are unique within one graph.
#[derive(Debug, Clone, Default)]
pub struct QueryGraph {
    graph: UnGraph<QueryAtom, BondExpr>,
}

impl PartialEq for QueryGraph {
    fn eq(&self, other: &Self) -> bool {
        if self.atom_count() != other.atom_count() || self.bond_count() != other.bond_count() {
            return false;
        }
        let atoms_equal = self
            .graph
            .node_indices()
            .all(|i| self.graph[i] == other.graph[i]);
        let bonds_equal = self.graph.edge_indices().all(|e| {
            self.graph[e] == other.graph[e]
                && self.graph.edge_endpoints(e) == other.graph.edge_endpoints(e)
        });
        atoms_equal && bonds_equal
    }
}

impl QueryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an atom and returns its index. A map-number of `0` counts as no
    /// map-number.
    pub fn add_atom(&mut self, expr: AtomExpr, map_number: Option<u16>) -> Result<usize> {
        let map_number = map_number.filter(|&m| m != 0);
        if let Some(map) = map_number {
            if self.atom_with_map_number(map).is_some() {
                return Err(PerceptionError::DuplicateMapNumber(map));
            }
        }
        let idx = self.graph.add_node(QueryAtom { expr, map_number });
        Ok(idx.index())
    }

    /// Joins two pattern atoms and returns the bond index.
    ///
    /// # Errors
    ///
    /// [`PerceptionError::IndexOutOfRange`] for an unknown atom, and
    /// [`PerceptionError::InvalidPatternBond`] for a self-bond or a pair that
    /// is already bonded. Combine predicates on one bond with
    /// [`BondExpr::And`] instead.
    pub fn add_bond(&mut self, a: usize, b: usize, expr: BondExpr) -> Result<usize> {
        for index in [a, b] {
            if index >= self.atom_count() {
                return Err(PerceptionError::IndexOutOfRange {
                    kind: IndexKind::Atom,
                    index,
                    len: self.atom_count(),
                });
            }
        }
        if a == b || self.bond_between(a, b).is_some() {
            return Err(PerceptionError::InvalidPatternBond { a, b });
        }
        let edge = self
            .graph
            .add_edge(NodeIndex::new(a), NodeIndex::new(b), expr);
        Ok(edge.index())
    }

    pub fn atom_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn bond_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.atom_count() == 0
    }

    pub fn atom(&self, index: usize) -> Option<&QueryAtom> {
        self.graph.node_weight(NodeIndex::new(index))
    }

    /// Atom at an index the caller already knows to be valid.
    pub(crate) fn query_atom(&self, index: usize) -> &QueryAtom {
        &self.graph[NodeIndex::new(index)]
    }

    /// Neighboring pattern atoms in ascending index order.
    pub fn neighbors(&self, index: usize) -> Vec<usize> {
        let mut out: Vec<usize> = self
            .graph
            .neighbors(NodeIndex::new(index))
            .map(|n| n.index())
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    pub fn bond_between(&self, a: usize, b: usize) -> Option<&BondExpr> {
        self.graph
            .find_edge(NodeIndex::new(a), NodeIndex::new(b))
            .map(|e| &self.graph[e])
    }

    /// Map-numbers present in the pattern, ascending.
    pub fn map_numbers(&self) -> Vec<u16> {
        let mut maps: Vec<u16> = self
            .graph
            .node_weights()
            .filter_map(|a| a.map_number)
            .collect();
        maps.sort_unstable();
        maps
    }

    pub fn atom_with_map_number(&self, map: u16) -> Option<usize> {
        self.graph
            .node_indices()
            .find(|&i| self.graph[i].map_number == Some(map))
            .map(|i| i.index())
    }
}

impl FromStr for QueryGraph {
    type Err = SmartsError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        crate::smarts::from_smarts(s)
    }
}

/// Per-search evaluation state: pre-computed recursive sub-pattern results,
/// keyed by the address of the boxed sub-pattern.
pub(crate) struct MatchContext<'a> {
    pub mol: &'a Molecule,
    pub recursive: HashMap<*const QueryGraph, Vec<bool>>,
}

fn in_range(val: u8, low: Option<u8>, high: Option<u8>) -> bool {
    low.is_none_or(|lo| val >= lo) && high.is_none_or(|hi| val <= hi)
}

fn range_value<A: AtomCapabilities>(kind: RangeKind, atom: &A) -> u8 {
    match kind {
        RangeKind::Degree => atom.degree(),
        RangeKind::Connectivity => atom.connectivity(),
        RangeKind::Valence => atom.valence(),
        RangeKind::TotalHCount => atom.hydrogen_count(),
        RangeKind::RingConnectivity => atom.ring_connectivity(),
        RangeKind::SmallestRingSize => atom.min_ring_size(),
    }
}

impl AtomExpr {
    /// Evaluates the expression on a molecule atom during a search.
    pub(crate) fn matches(&self, atom: Atom<'_>, ctx: &MatchContext<'_>) -> bool {
        match self {
            AtomExpr::Recursive(inner) => ctx
                .recursive
                .get(&(inner.as_ref() as *const QueryGraph))
                .and_then(|hits| hits.get(atom.index()).copied())
                .unwrap_or(false),
            AtomExpr::And(exprs) => exprs.iter().all(|e| e.matches(atom, ctx)),
            AtomExpr::Or(exprs) => exprs.iter().any(|e| e.matches(atom, ctx)),
            AtomExpr::Not(expr) => !expr.matches(atom, ctx),
            primitive => primitive.matches_properties(&atom).unwrap_or(false),
        }
    }

    /// Evaluates the expression against any atom exposing the capability
    /// traits. Returns `None` when the answer needs a molecule context
    /// (recursive sub-patterns).
    pub fn matches_properties<A: AtomCapabilities>(&self, atom: &A) -> Option<bool> {
        let hit = match self {
            AtomExpr::True => true,
            AtomExpr::Element {
                atomic_num,
                aromatic,
            } => {
                atom.atomic_number() == *atomic_num
                    && aromatic.is_none_or(|a| atom.is_aromatic() == a)
            }
            AtomExpr::Aromatic => atom.is_aromatic(),
            AtomExpr::Aliphatic => !atom.is_aromatic(),
            AtomExpr::Degree(d) => atom.degree() == *d,
            AtomExpr::Connectivity(x) => atom.connectivity() == *x,
            AtomExpr::Valence(v) => atom.valence() == *v,
            AtomExpr::TotalHCount(h) => atom.hydrogen_count() == *h,
            AtomExpr::RingConnectivity(x) => atom.ring_connectivity() == *x,
            AtomExpr::SmallestRingSize(r) => atom.min_ring_size() == *r,
            AtomExpr::InRing => atom.ring_connectivity() > 0,
            AtomExpr::NotInRing => atom.ring_connectivity() == 0,
            AtomExpr::Charge(c) => atom.formal_charge() == *c,
            AtomExpr::Range { kind, low, high } => in_range(range_value(*kind, atom), *low, *high),
            AtomExpr::Recursive(_) => return None,
            AtomExpr::And(exprs) => {
                for e in exprs {
                    if !e.matches_properties(atom)? {
                        return Some(false);
                    }
                }
                true
            }
            AtomExpr::Or(exprs) => {
                for e in exprs {
                    if e.matches_properties(atom)? {
                        return Some(true);
                    }
                }
                false
            }
            AtomExpr::Not(expr) => !expr.matches_properties(atom)?,
        };
        Some(hit)
    }

    /// Rough count of constraints, used to pick a search root.
    pub(crate) fn specificity(&self) -> usize {
        match self {
            AtomExpr::True => 0,
            AtomExpr::Element { aromatic, .. } => 2 + usize::from(aromatic.is_some()),
            AtomExpr::Recursive(inner) => 1 + inner.atom_count(),
            AtomExpr::And(exprs) => exprs.iter().map(AtomExpr::specificity).sum(),
            AtomExpr::Or(exprs) => exprs.iter().map(AtomExpr::specificity).min().unwrap_or(0),
            _ => 1,
        }
    }

    /// Visits every recursive sub-pattern in this expression tree.
    pub(crate) fn for_each_recursive<'q>(&'q self, f: &mut impl FnMut(&'q QueryGraph)) {
        match self {
            AtomExpr::Recursive(inner) => f(inner.as_ref()),
            AtomExpr::And(exprs) | AtomExpr::Or(exprs) => {
                for e in exprs {
                    e.for_each_recursive(f);
                }
            }
            AtomExpr::Not(expr) => expr.for_each_recursive(f),
            _ => {}
        }
    }
}

impl BondExpr {
    /// Evaluates the expression against any bond exposing the capability
    /// traits.
    pub fn matches<B: BondCapabilities>(&self, bond: &B) -> bool {
        use crate::bond::BondOrder;
        match self {
            BondExpr::True => true,
            BondExpr::Single => bond.order() == BondOrder::Single && !bond.is_aromatic(),
            BondExpr::Double => bond.order() == BondOrder::Double && !bond.is_aromatic(),
            BondExpr::Triple => bond.order() == BondOrder::Triple,
            BondExpr::Aromatic => bond.is_aromatic(),
            BondExpr::Ring => bond.is_ring(),
            BondExpr::SingleOrAromatic => {
                (bond.order() == BondOrder::Single) || bond.is_aromatic()
            }
            BondExpr::And(exprs) => exprs.iter().all(|e| e.matches(bond)),
            BondExpr::Or(exprs) => exprs.iter().any(|e| e.matches(bond)),
            BondExpr::Not(expr) => !expr.matches(bond),
        }
    }

    pub(crate) fn matches_bond(&self, bond: Bond<'_>) -> bool {
        self.matches(&bond)
    }
}
