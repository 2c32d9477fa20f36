//! A small built-in chemistry toolkit.
//!
//! [`ToolkitMol`] stores a molecule as a petgraph graph and perceives rings,
//! aromatic bonds, valences and a canonical SMILES on demand. It implements
//! [`ToolkitAdapter`], so it can feed [`build_molecule`](crate::build_molecule)
//! directly:
//!
//! ```
//! use chemical_perception::{build_molecule, ToolkitMol};
//!
//! let mut methane = ToolkitMol::from_smiles("C").unwrap();
//! methane.add_explicit_hydrogens();
//! let mol = build_molecule(&mut methane).unwrap();
//! assert_eq!(mol.atom_count(), 5);
//! assert_eq!(mol.canonical_string(), "C");
//! ```
//!
//! Ring perception uses the shortest cycle through each bond. A bond is
//! reported aromatic only when it was read as aromatic and lies in a ring;
//! an aromatic-looking bond outside any ring (the biphenyl link) is reported
//! as single.

mod canonical;
mod error;
mod rings;
mod smiles;

pub use error::SmilesError;

use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::adapter::ToolkitAdapter;
use crate::atom::AtomProperties;
use crate::bond::{BondOrder, BondProperties};
use crate::error::{IndexKind, PerceptionError, Result};

use canonical::{CanonAtom, CanonGraph};
use rings::RingInfo;

/// One toolkit atom. Hydrogens are either implicit (counted here) or
/// explicit graph atoms, never both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolkitAtom {
    pub atomic_num: u8,
    pub formal_charge: i8,
    /// Mass number, `0` for natural abundance.
    pub isotope: u16,
    pub implicit_hydrogens: u8,
    pub is_aromatic: bool,
}

impl ToolkitAtom {
    pub fn new(atomic_num: u8) -> Self {
        Self {
            atomic_num,
            ..Self::default()
        }
    }

    pub fn with_charge(mut self, charge: i8) -> Self {
        self.formal_charge = charge;
        self
    }

    pub fn with_hydrogens(mut self, count: u8) -> Self {
        self.implicit_hydrogens = count;
        self
    }

    pub fn aromatic(mut self) -> Self {
        self.is_aromatic = true;
        self
    }
}

/// One toolkit bond as written. [`BondOrder::Aromatic`] here means "read as
/// aromatic"; the perceived order may differ (see the module docs).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolkitBond {
    pub order: BondOrder,
}

/// Mutable molecule of the built-in toolkit.
#[derive(Debug, Clone, Default)]
pub struct ToolkitMol {
    graph: UnGraph<ToolkitAtom, ToolkitBond>,
    rings: Option<RingInfo>,
}

impl ToolkitMol {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a SMILES string.
    ///
    /// # Errors
    ///
    /// [`SmilesError`] for malformed input.
    pub fn from_smiles(smiles: &str) -> std::result::Result<Self, SmilesError> {
        smiles::from_smiles(smiles)
    }

    pub fn atom_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn bond_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn add_atom(&mut self, atom: ToolkitAtom) -> usize {
        self.invalidate();
        self.graph.add_node(atom).index()
    }

    /// Bonds two existing atoms and returns the bond index.
    ///
    /// # Errors
    ///
    /// [`PerceptionError::IndexOutOfRange`] for an unknown atom, and
    /// [`PerceptionError::AdapterInconsistency`] for a self-bond or an atom
    /// pair that is already bonded.
    pub fn add_bond(&mut self, a: usize, b: usize, order: BondOrder) -> Result<usize> {
        for index in [a, b] {
            if index >= self.atom_count() {
                return Err(PerceptionError::IndexOutOfRange {
                    kind: IndexKind::Atom,
                    index,
                    len: self.atom_count(),
                });
            }
        }
        if a == b {
            return Err(PerceptionError::AdapterInconsistency(format!(
                "atom {a} cannot bond to itself"
            )));
        }
        if self
            .graph
            .find_edge(NodeIndex::new(a), NodeIndex::new(b))
            .is_some()
        {
            return Err(PerceptionError::AdapterInconsistency(format!(
                "atoms {a} and {b} are already bonded"
            )));
        }
        Ok(self.push_bond(a, b, ToolkitBond { order }))
    }

    /// Adds a bond the caller has already validated.
    pub(crate) fn push_bond(&mut self, a: usize, b: usize, bond: ToolkitBond) -> usize {
        self.invalidate();
        self.graph
            .add_edge(NodeIndex::new(a), NodeIndex::new(b), bond)
            .index()
    }

    pub fn atom(&self, index: usize) -> Option<&ToolkitAtom> {
        self.graph.node_weight(NodeIndex::new(index))
    }

    /// Mutable access to an atom. Cached perception is discarded.
    pub fn atom_mut(&mut self, index: usize) -> Option<&mut ToolkitAtom> {
        self.invalidate();
        self.graph.node_weight_mut(NodeIndex::new(index))
    }

    pub fn bond(&self, index: usize) -> Option<&ToolkitBond> {
        self.graph.edge_weight(EdgeIndex::new(index))
    }

    pub fn bond_endpoints(&self, index: usize) -> Option<(usize, usize)> {
        self.graph
            .edge_endpoints(EdgeIndex::new(index))
            .map(|(a, b)| (a.index(), b.index()))
    }

    /// Turns every implicit hydrogen into an explicit hydrogen atom bonded to
    /// its parent. New atoms are appended in parent atom order. Returns the
    /// number of atoms added.
    pub fn add_explicit_hydrogens(&mut self) -> usize {
        let mut added = 0;
        for parent in 0..self.atom_count() {
            let node = NodeIndex::new(parent);
            let count = std::mem::take(&mut self.graph[node].implicit_hydrogens);
            for _ in 0..count {
                let h = self.graph.add_node(ToolkitAtom::new(1));
                self.graph.add_edge(node, h, ToolkitBond::default());
                added += 1;
            }
        }
        if added > 0 {
            self.invalidate();
        }
        trace!(added, "Added explicit hydrogens.");
        added
    }

    /// Canonical SMILES with explicit hydrogens folded into their heavy atom.
    pub fn to_canonical_smiles(&self) -> String {
        canonical::to_canonical_smiles(&self.canon_graph())
    }

    fn invalidate(&mut self) {
        self.rings = None;
    }

    /// Runs `f` against the cached ring perception, perceiving first if the
    /// cache is empty.
    fn with_rings<T>(&mut self, f: impl FnOnce(&Self, &RingInfo) -> T) -> T {
        let rings = self
            .rings
            .take()
            .unwrap_or_else(|| RingInfo::perceive(&self.graph));
        let out = f(self, &rings);
        self.rings = Some(rings);
        out
    }

    /// Order as perceived: aromatic only inside rings.
    fn perceived_order(&self, rings: &RingInfo, edge: EdgeIndex) -> BondOrder {
        match self.graph[edge].order {
            BondOrder::Aromatic if !rings.is_ring_bond(edge.index()) => BondOrder::Single,
            order => order,
        }
    }

    fn perceive_atom(&self, rings: &RingInfo, index: usize) -> AtomProperties {
        let node = NodeIndex::new(index);
        let atom = &self.graph[node];

        let mut degree = 0u8;
        let mut explicit_h = 0u8;
        let mut doubled_valence = 0u16;
        for edge in self.graph.edges(node) {
            degree = degree.saturating_add(1);
            let other = if edge.source() == node {
                edge.target()
            } else {
                edge.source()
            };
            if self.graph[other].atomic_num == 1 {
                explicit_h = explicit_h.saturating_add(1);
            }
            doubled_valence += u16::from(self.perceived_order(rings, edge.id()).doubled_valence());
        }

        let implicit = atom.implicit_hydrogens;
        let valence = (doubled_valence / 2).min(u16::from(u8::MAX)) as u8;
        AtomProperties {
            atomic_number: atom.atomic_num,
            formal_charge: atom.formal_charge,
            hydrogen_count: implicit.saturating_add(explicit_h),
            degree,
            connectivity: degree.saturating_add(implicit),
            valence: valence.saturating_add(implicit),
            ring_connectivity: rings.ring_bond_count(index).min(u8::MAX as usize) as u8,
            min_ring_size: rings
                .smallest_ring_size(index)
                .map_or(0, |s| s.min(u8::MAX as usize) as u8),
            is_aromatic: atom.is_aromatic,
        }
    }

    fn perceive_bond(&self, rings: &RingInfo, index: usize) -> BondProperties {
        let edge = EdgeIndex::new(index);
        let (a, b) = self
            .graph
            .edge_endpoints(edge)
            .map_or((0, 0), |(a, b)| (a.index(), b.index()));
        let order = self.perceived_order(rings, edge);
        BondProperties {
            begin: a,
            end: b,
            order,
            is_ring: rings.is_ring_bond(index),
            is_aromatic: order == BondOrder::Aromatic,
        }
    }

    /// Hydrogen-suppressed graph for canonicalization: a neutral, unlabelled
    /// hydrogen with a single non-hydrogen neighbor becomes a hydrogen count
    /// on that neighbor.
    pub(crate) fn canon_graph(&self) -> CanonGraph {
        let rings = RingInfo::perceive(&self.graph);
        let n = self.atom_count();

        let foldable = |node: NodeIndex| -> Option<NodeIndex> {
            let atom = &self.graph[node];
            if atom.atomic_num != 1
                || atom.formal_charge != 0
                || atom.isotope != 0
                || atom.implicit_hydrogens != 0
            {
                return None;
            }
            let mut neighbors = self.graph.neighbors(node);
            let parent = neighbors.next()?;
            if neighbors.next().is_some() || self.graph[parent].atomic_num == 1 {
                return None;
            }
            Some(parent)
        };

        let mut new_index: Vec<Option<usize>> = vec![None; n];
        let mut folded = vec![0u8; n];
        let mut atoms = Vec::new();
        for node in self.graph.node_indices() {
            match foldable(node) {
                Some(parent) => {
                    folded[parent.index()] = folded[parent.index()].saturating_add(1);
                }
                None => {
                    new_index[node.index()] = Some(atoms.len());
                    let atom = &self.graph[node];
                    atoms.push(CanonAtom {
                        atomic_num: atom.atomic_num,
                        formal_charge: atom.formal_charge,
                        isotope: atom.isotope,
                        hydrogens: atom.implicit_hydrogens,
                        is_aromatic: atom.is_aromatic,
                    });
                }
            }
        }
        for (old, count) in folded.into_iter().enumerate() {
            if let Some(new) = new_index[old] {
                atoms[new].hydrogens = atoms[new].hydrogens.saturating_add(count);
            }
        }

        let mut neighbors = vec![Vec::new(); atoms.len()];
        for edge in self.graph.edge_references() {
            let (Some(a), Some(b)) = (new_index[edge.source().index()], new_index[edge.target().index()])
            else {
                continue;
            };
            let order = self.perceived_order(&rings, edge.id());
            neighbors[a].push((b, order));
            neighbors[b].push((a, order));
        }

        CanonGraph { atoms, neighbors }
    }
}

impl ToolkitAdapter for ToolkitMol {
    fn atom_count(&self) -> usize {
        ToolkitMol::atom_count(self)
    }

    fn bond_count(&self) -> usize {
        ToolkitMol::bond_count(self)
    }

    /// # Panics
    ///
    /// Panics if `index` is not an atom of this molecule.
    fn atom_properties(&mut self, index: usize) -> AtomProperties {
        self.with_rings(|mol, rings| mol.perceive_atom(rings, index))
    }

    /// # Panics
    ///
    /// Panics if `index` is not a bond of this molecule.
    fn bond_properties(&mut self, index: usize) -> BondProperties {
        self.with_rings(|mol, rings| mol.perceive_bond(rings, index))
    }

    fn canonical_string(&mut self) -> String {
        self.to_canonical_smiles()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn explicit_methane() -> ToolkitMol {
        let mut mol = ToolkitMol::from_smiles("C").unwrap();
        assert_eq!(mol.add_explicit_hydrogens(), 4);
        mol
    }

    #[test]
    fn explicit_hydrogens_are_appended() {
        let mol = explicit_methane();
        assert_eq!(mol.atom_count(), 5);
        assert_eq!(mol.bond_count(), 4);
        assert_eq!(mol.atom(0).unwrap().implicit_hydrogens, 0);
        for h in 1..5 {
            assert_eq!(mol.atom(h).unwrap().atomic_num, 1);
            assert_eq!(mol.bond_endpoints(h - 1), Some((0, h)));
        }
    }

    #[test]
    fn methane_properties() {
        let mut mol = explicit_methane();
        let c = mol.atom_properties(0);
        assert_eq!(c.degree, 4);
        assert_eq!(c.connectivity, 4);
        assert_eq!(c.valence, 4);
        assert_eq!(c.hydrogen_count, 4);
        assert_eq!(c.ring_connectivity, 0);
        assert_eq!(c.min_ring_size, 0);

        let h = mol.atom_properties(1);
        assert_eq!((h.degree, h.connectivity, h.valence, h.hydrogen_count), (1, 1, 1, 0));

        let bond = mol.bond_properties(0);
        assert_eq!(bond.order, BondOrder::Single);
        assert!(!bond.is_ring);
        assert!(!bond.is_aromatic);
        assert_eq!((bond.begin, bond.end), (0, 1));
    }

    #[test]
    fn implicit_methane_properties() {
        let mut mol = ToolkitMol::from_smiles("C").unwrap();
        let c = mol.atom_properties(0);
        assert_eq!(c.degree, 0);
        assert_eq!(c.connectivity, 4);
        assert_eq!(c.valence, 4);
        assert_eq!(c.hydrogen_count, 4);
    }

    #[test]
    fn explicit_methane_canonicalizes_to_c() {
        assert_eq!(explicit_methane().to_canonical_smiles(), "C");
        assert_eq!(explicit_methane().canonical_string(), "C");
    }

    #[test]
    fn benzene_ring_perception() {
        let mut mol = ToolkitMol::from_smiles("c1ccccc1").unwrap();
        for i in 0..6 {
            let atom = mol.atom_properties(i);
            assert!(atom.is_aromatic);
            assert_eq!(atom.min_ring_size, 6);
            assert_eq!(atom.ring_connectivity, 2);
            assert_eq!(atom.hydrogen_count, 1);
            assert_eq!(atom.connectivity, 3);
            assert_eq!(atom.valence, 4);
            let bond = mol.bond_properties(i);
            assert_eq!(bond.order, BondOrder::Aromatic);
            assert!(bond.is_ring && bond.is_aromatic);
        }
    }

    #[test]
    fn biphenyl_link_is_single() {
        let mut mol = ToolkitMol::from_smiles("c1ccc(cc1)c1ccccc1").unwrap();
        let link = (0..mol.bond_count())
            .find(|&b| mol.bond_endpoints(b) == Some((3, 6)))
            .unwrap();
        let bond = mol.bond_properties(link);
        assert_eq!(bond.order, BondOrder::Single);
        assert!(!bond.is_ring);
        assert!(!bond.is_aromatic);
        assert_eq!(mol.atom_properties(3).valence, 4);
    }

    #[test]
    fn double_bond_valence() {
        let mut mol = ToolkitMol::from_smiles("C=O").unwrap();
        let o = mol.atom_properties(1);
        assert_eq!(o.valence, 2);
        assert_eq!(o.hydrogen_count, 0);
        assert_eq!(o.connectivity, 1);
    }

    #[test]
    fn add_bond_validates() {
        let mut mol = ToolkitMol::new();
        let c = mol.add_atom(ToolkitAtom::new(6).with_hydrogens(3));
        let o = mol.add_atom(ToolkitAtom::new(8).with_hydrogens(1));
        assert_eq!(mol.add_bond(c, o, BondOrder::Single).unwrap(), 0);
        assert!(matches!(
            mol.add_bond(c, 9, BondOrder::Single),
            Err(PerceptionError::IndexOutOfRange { index: 9, .. })
        ));
        assert!(matches!(
            mol.add_bond(o, c, BondOrder::Double),
            Err(PerceptionError::AdapterInconsistency(_))
        ));
        assert!(matches!(
            mol.add_bond(c, c, BondOrder::Single),
            Err(PerceptionError::AdapterInconsistency(_))
        ));
        assert_eq!(mol.to_canonical_smiles(), "CO");
    }

    #[test]
    fn mutation_discards_cached_rings() {
        let mut mol = ToolkitMol::from_smiles("CCCC").unwrap();
        assert!(!mol.bond_properties(0).is_ring);
        mol.add_bond(0, 3, BondOrder::Single).unwrap();
        assert!(mol.bond_properties(0).is_ring);
        assert_eq!(mol.atom_properties(0).min_ring_size, 4);
    }
}
