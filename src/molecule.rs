use std::fmt;
use std::hash::{Hash, Hasher};

use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};
use tracing::{debug, instrument};

use crate::adapter::ToolkitAdapter;
use crate::atom::AtomProperties;
use crate::bond::{BondOrder, BondProperties};
use crate::error::{IndexKind, PerceptionError, Result};

/// An immutable molecular graph built from a toolkit adapter snapshot.
///
/// Atoms and bonds are indexed `0..atom_count()` and `0..bond_count()` in the
/// order the adapter enumerated them. Nothing can be added or removed after
/// construction, so the indices are stable for the molecule's lifetime and the
/// molecule can be shared freely between threads.
///
/// Atoms and bonds are handed out as lightweight [`Atom`] and [`Bond`] views
/// that borrow the molecule.
#[derive(Clone)]
pub struct Molecule {
    graph: UnGraph<AtomProperties, BondProperties>,
    // (neighbor atom, bond) pairs per atom, in bond index order.
    adjacency: Vec<Vec<(usize, usize)>>,
    canonical: String,
}

/// Builds a [`Molecule`] from a toolkit adapter. See [`Molecule::from_adapter`].
pub fn build_molecule<T: ToolkitAdapter + ?Sized>(adapter: &mut T) -> Result<Molecule> {
    Molecule::from_adapter(adapter)
}

impl Molecule {
    /// Snapshots every atom, bond and the canonical string from `adapter`.
    ///
    /// Each atom and bond is requested exactly once. A bond whose endpoints
    /// are not atoms of the molecule, that joins an atom to itself, or that
    /// duplicates an existing atom pair aborts construction with
    /// [`PerceptionError::AdapterInconsistency`]; no partial molecule is
    /// returned.
    #[instrument(skip_all, name = "build_molecule")]
    pub fn from_adapter<T: ToolkitAdapter + ?Sized>(adapter: &mut T) -> Result<Self> {
        let atom_count = adapter.atom_count();
        let bond_count = adapter.bond_count();

        let mut graph = UnGraph::with_capacity(atom_count, bond_count);
        for index in 0..atom_count {
            graph.add_node(adapter.atom_properties(index));
        }

        let mut adjacency: Vec<Vec<(usize, usize)>> = vec![Vec::new(); atom_count];
        for index in 0..bond_count {
            let bond = adapter.bond_properties(index);
            let (begin, end) = (bond.begin, bond.end);
            if begin >= atom_count || end >= atom_count {
                return Err(PerceptionError::AdapterInconsistency(format!(
                    "bond {index} joins atoms {begin} and {end} but the molecule has {atom_count} atoms"
                )));
            }
            if begin == end {
                return Err(PerceptionError::AdapterInconsistency(format!(
                    "bond {index} joins atom {begin} to itself"
                )));
            }
            if adjacency[begin].iter().any(|&(nb, _)| nb == end) {
                return Err(PerceptionError::AdapterInconsistency(format!(
                    "atoms {begin} and {end} are bonded more than once"
                )));
            }
            graph.add_edge(NodeIndex::new(begin), NodeIndex::new(end), bond);
            adjacency[begin].push((end, index));
            adjacency[end].push((begin, index));
        }

        let canonical = adapter.canonical_string();
        debug!(
            atoms = atom_count,
            bonds = bond_count,
            canonical = %canonical,
            "Built molecule snapshot."
        );

        Ok(Self {
            graph,
            adjacency,
            canonical,
        })
    }

    pub fn atom_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn bond_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// All atoms in index order. Call again to restart.
    pub fn atoms(&self) -> impl ExactSizeIterator<Item = Atom<'_>> + Clone {
        (0..self.atom_count()).map(move |index| Atom { mol: self, index })
    }

    /// All bonds in index order. Call again to restart.
    pub fn bonds(&self) -> impl ExactSizeIterator<Item = Bond<'_>> + Clone {
        (0..self.bond_count()).map(move |index| Bond { mol: self, index })
    }

    pub fn atom_at(&self, index: usize) -> Result<Atom<'_>> {
        if index < self.atom_count() {
            Ok(Atom { mol: self, index })
        } else {
            Err(PerceptionError::IndexOutOfRange {
                kind: IndexKind::Atom,
                index,
                len: self.atom_count(),
            })
        }
    }

    pub fn bond_at(&self, index: usize) -> Result<Bond<'_>> {
        if index < self.bond_count() {
            Ok(Bond { mol: self, index })
        } else {
            Err(PerceptionError::IndexOutOfRange {
                kind: IndexKind::Bond,
                index,
                len: self.bond_count(),
            })
        }
    }

    /// The toolkit's canonical identifier (canonical SMILES for the built-in
    /// toolkit). Computed once at construction.
    pub fn canonical_string(&self) -> &str {
        &self.canonical
    }

    /// The bond joining atoms `a` and `b`, if any. Out-of-range indices yield
    /// `None`.
    pub fn bond_between(&self, a: usize, b: usize) -> Option<Bond<'_>> {
        self.adjacency
            .get(a)?
            .iter()
            .find(|&&(nb, _)| nb == b)
            .map(|&(_, index)| Bond { mol: self, index })
    }

    /// Neighbor atom indices of atom `index` in adjacency order.
    pub fn neighbor_indices(&self, index: usize) -> Result<impl Iterator<Item = usize> + '_> {
        self.atom_at(index)?;
        Ok(self.adjacent_atoms(index))
    }

    /// [`neighbor_indices`](Self::neighbor_indices) for an index the caller
    /// already knows to be valid.
    pub(crate) fn adjacent_atoms(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        self.adjacency[index].iter().map(|&(nb, _)| nb)
    }

    /// View of an index the caller already knows to be valid.
    pub(crate) fn atom_view(&self, index: usize) -> Atom<'_> {
        debug_assert!(index < self.atom_count());
        Atom { mol: self, index }
    }

    pub(crate) fn atom_properties(&self, index: usize) -> &AtomProperties {
        &self.graph[NodeIndex::new(index)]
    }

    pub(crate) fn bond_properties(&self, index: usize) -> &BondProperties {
        &self.graph[EdgeIndex::new(index)]
    }

    fn same_as(&self, other: &Molecule) -> bool {
        std::ptr::eq(self, other)
    }
}

impl fmt::Debug for Molecule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Molecule")
            .field("atom_count", &self.atom_count())
            .field("bond_count", &self.bond_count())
            .field("canonical", &self.canonical)
            .finish()
    }
}

/// A borrowed view of one atom of a [`Molecule`].
///
/// Two views are equal when they address the same index of the same molecule
/// instance. A clone of a molecule is a different instance.
#[derive(Clone, Copy)]
pub struct Atom<'m> {
    mol: &'m Molecule,
    index: usize,
}

impl<'m> Atom<'m> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn properties(&self) -> &'m AtomProperties {
        self.mol.atom_properties(self.index)
    }

    pub fn atomic_number(&self) -> u8 {
        self.properties().atomic_number
    }

    pub fn degree(&self) -> u8 {
        self.properties().degree
    }

    pub fn connectivity(&self) -> u8 {
        self.properties().connectivity
    }

    pub fn valence(&self) -> u8 {
        self.properties().valence
    }

    pub fn formal_charge(&self) -> i8 {
        self.properties().formal_charge
    }

    pub fn hydrogen_count(&self) -> u8 {
        self.properties().hydrogen_count
    }

    pub fn ring_connectivity(&self) -> u8 {
        self.properties().ring_connectivity
    }

    pub fn min_ring_size(&self) -> u8 {
        self.properties().min_ring_size
    }

    pub fn is_aromatic(&self) -> bool {
        self.properties().is_aromatic
    }

    pub fn is_in_ring(&self) -> bool {
        self.properties().ring_connectivity > 0
    }

    /// Adjacent atoms in adjacency-table order (the order their bonds were
    /// enumerated by the toolkit).
    pub fn neighbors(&self) -> impl ExactSizeIterator<Item = Atom<'m>> + Clone + use<'m> {
        let mol = self.mol;
        mol.adjacency[self.index]
            .iter()
            .map(move |&(index, _)| Atom { mol, index })
    }

    /// Incident bonds in the same order as [`Atom::neighbors`].
    pub fn bonds(&self) -> impl ExactSizeIterator<Item = Bond<'m>> + Clone + use<'m> {
        let mol = self.mol;
        mol.adjacency[self.index]
            .iter()
            .map(move |&(_, index)| Bond { mol, index })
    }

    /// Whether a bond joins this atom and `other`.
    ///
    /// Fails with [`PerceptionError::CrossMoleculeComparison`] when the atoms
    /// belong to different molecule instances.
    pub fn is_connected_to(&self, other: &Atom<'_>) -> Result<bool> {
        if !self.mol.same_as(other.mol) {
            return Err(PerceptionError::CrossMoleculeComparison);
        }
        Ok(self.mol.bond_between(self.index, other.index).is_some())
    }

    pub fn owning_molecule(&self) -> &'m Molecule {
        self.mol
    }
}

impl PartialEq for Atom<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.mol.same_as(other.mol) && self.index == other.index
    }
}

impl Eq for Atom<'_> {}

impl Hash for Atom<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(self.mol, state);
        self.index.hash(state);
    }
}

impl fmt::Debug for Atom<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Atom")
            .field("index", &self.index)
            .field("atomic_number", &self.atomic_number())
            .finish()
    }
}

impl crate::traits::HasAtomicNum for Atom<'_> {
    fn atomic_number(&self) -> u8 {
        self.properties().atomic_number
    }
}

impl crate::traits::HasFormalCharge for Atom<'_> {
    fn formal_charge(&self) -> i8 {
        self.properties().formal_charge
    }
}

impl crate::traits::HasHydrogenCount for Atom<'_> {
    fn hydrogen_count(&self) -> u8 {
        self.properties().hydrogen_count
    }
}

impl crate::traits::HasAromaticity for Atom<'_> {
    fn is_aromatic(&self) -> bool {
        self.properties().is_aromatic
    }
}

impl crate::traits::HasDegree for Atom<'_> {
    fn degree(&self) -> u8 {
        self.properties().degree
    }
}

impl crate::traits::HasConnectivity for Atom<'_> {
    fn connectivity(&self) -> u8 {
        self.properties().connectivity
    }
}

impl crate::traits::HasValence for Atom<'_> {
    fn valence(&self) -> u8 {
        self.properties().valence
    }
}

impl crate::traits::HasRingConnectivity for Atom<'_> {
    fn ring_connectivity(&self) -> u8 {
        self.properties().ring_connectivity
    }
}

impl crate::traits::HasMinRingSize for Atom<'_> {
    fn min_ring_size(&self) -> u8 {
        self.properties().min_ring_size
    }
}

/// A borrowed view of one bond of a [`Molecule`].
#[derive(Clone, Copy)]
pub struct Bond<'m> {
    mol: &'m Molecule,
    index: usize,
}

impl<'m> Bond<'m> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn properties(&self) -> &'m BondProperties {
        self.mol.bond_properties(self.index)
    }

    pub fn order(&self) -> BondOrder {
        self.properties().order
    }

    pub fn is_ring(&self) -> bool {
        self.properties().is_ring
    }

    pub fn is_aromatic(&self) -> bool {
        self.properties().is_aromatic
    }

    pub fn is_single(&self) -> bool {
        self.order() == BondOrder::Single
    }

    pub fn is_double(&self) -> bool {
        self.order() == BondOrder::Double
    }

    pub fn is_triple(&self) -> bool {
        self.order() == BondOrder::Triple
    }

    pub fn begin(&self) -> Atom<'m> {
        Atom {
            mol: self.mol,
            index: self.properties().begin,
        }
    }

    pub fn end(&self) -> Atom<'m> {
        Atom {
            mol: self.mol,
            index: self.properties().end,
        }
    }

    /// Both endpoints in the toolkit's begin/end order.
    pub fn endpoints(&self) -> [Atom<'m>; 2] {
        [self.begin(), self.end()]
    }

    /// The endpoint opposite `atom`, or `None` if `atom` is not on this bond.
    pub fn other_end(&self, atom: &Atom<'_>) -> Option<Atom<'m>> {
        if !self.mol.same_as(atom.mol) {
            return None;
        }
        let props = self.properties();
        let index = if atom.index == props.begin {
            props.end
        } else if atom.index == props.end {
            props.begin
        } else {
            return None;
        };
        Some(Atom {
            mol: self.mol,
            index,
        })
    }

    pub fn owning_molecule(&self) -> &'m Molecule {
        self.mol
    }
}

impl PartialEq for Bond<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.mol.same_as(other.mol) && self.index == other.index
    }
}

impl Eq for Bond<'_> {}

impl fmt::Debug for Bond<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let props = self.properties();
        f.debug_struct("Bond")
            .field("index", &self.index)
            .field("begin", &props.begin)
            .field("end", &props.end)
            .field("order", &props.order)
            .finish()
    }
}

impl crate::traits::HasBondOrder for Bond<'_> {
    fn order(&self) -> BondOrder {
        self.properties().order
    }
}

impl crate::traits::HasRingMembership for Bond<'_> {
    fn is_ring(&self) -> bool {
        self.properties().is_ring
    }
}

impl crate::traits::HasAromaticity for Bond<'_> {
    fn is_aromatic(&self) -> bool {
        self.properties().is_aromatic
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Hand-filled adapter standing in for an external toolkit.
    struct FixedAdapter {
        atoms: Vec<AtomProperties>,
        bonds: Vec<BondProperties>,
        atom_calls: usize,
        bond_calls: usize,
        canonical_calls: usize,
    }

    impl FixedAdapter {
        fn new(atoms: Vec<AtomProperties>, bonds: Vec<BondProperties>) -> Self {
            Self {
                atoms,
                bonds,
                atom_calls: 0,
                bond_calls: 0,
                canonical_calls: 0,
            }
        }
    }

    impl ToolkitAdapter for FixedAdapter {
        fn atom_count(&self) -> usize {
            self.atoms.len()
        }

        fn bond_count(&self) -> usize {
            self.bonds.len()
        }

        fn atom_properties(&mut self, index: usize) -> AtomProperties {
            self.atom_calls += 1;
            self.atoms[index].clone()
        }

        fn bond_properties(&mut self, index: usize) -> BondProperties {
            self.bond_calls += 1;
            self.bonds[index].clone()
        }

        fn canonical_string(&mut self) -> String {
            self.canonical_calls += 1;
            "CO".to_string()
        }
    }

    fn methanol_heavy() -> FixedAdapter {
        FixedAdapter::new(
            vec![
                AtomProperties {
                    atomic_number: 6,
                    hydrogen_count: 3,
                    degree: 1,
                    connectivity: 4,
                    valence: 4,
                    ..AtomProperties::default()
                },
                AtomProperties {
                    atomic_number: 8,
                    hydrogen_count: 1,
                    degree: 1,
                    connectivity: 2,
                    valence: 2,
                    ..AtomProperties::default()
                },
            ],
            vec![BondProperties {
                begin: 0,
                end: 1,
                ..BondProperties::default()
            }],
        )
    }

    #[test]
    fn adapter_is_queried_once_per_item() {
        let mut adapter = methanol_heavy();
        let mol = build_molecule(&mut adapter).unwrap();
        assert_eq!(mol.atom_count(), 2);
        assert_eq!(mol.bond_count(), 1);
        assert_eq!(adapter.atom_calls, 2);
        assert_eq!(adapter.bond_calls, 1);
        assert_eq!(adapter.canonical_calls, 1);
        assert_eq!(mol.canonical_string(), "CO");
    }

    #[test]
    fn snapshot_ignores_later_adapter_changes() {
        let mut adapter = methanol_heavy();
        let mol = Molecule::from_adapter(&mut adapter).unwrap();
        adapter.atoms[0].atomic_number = 7;
        assert_eq!(mol.atom_at(0).unwrap().atomic_number(), 6);
    }

    #[test]
    fn endpoint_outside_molecule_is_rejected() {
        let mut adapter = methanol_heavy();
        adapter.bonds[0].end = 5;
        let err = build_molecule(&mut adapter).unwrap_err();
        assert!(matches!(err, PerceptionError::AdapterInconsistency(_)));
    }

    #[test]
    fn self_bond_is_rejected() {
        let mut adapter = methanol_heavy();
        adapter.bonds[0].end = 0;
        assert!(matches!(
            build_molecule(&mut adapter),
            Err(PerceptionError::AdapterInconsistency(_))
        ));
    }

    #[test]
    fn duplicate_bond_is_rejected() {
        let mut adapter = methanol_heavy();
        adapter.bonds.push(BondProperties {
            begin: 1,
            end: 0,
            ..BondProperties::default()
        });
        assert!(matches!(
            build_molecule(&mut adapter),
            Err(PerceptionError::AdapterInconsistency(_))
        ));
    }

    #[test]
    fn lookups_out_of_range() {
        let mol = build_molecule(&mut methanol_heavy()).unwrap();
        assert_eq!(
            mol.atom_at(2).unwrap_err(),
            PerceptionError::IndexOutOfRange {
                kind: IndexKind::Atom,
                index: 2,
                len: 2
            }
        );
        assert!(matches!(
            mol.bond_at(1),
            Err(PerceptionError::IndexOutOfRange {
                kind: IndexKind::Bond,
                ..
            })
        ));
        assert!(mol.bond_between(0, 9).is_none());
        assert!(mol.bond_between(9, 0).is_none());
        assert!(matches!(
            mol.neighbor_indices(2),
            Err(PerceptionError::IndexOutOfRange { index: 2, .. })
        ));
        assert_eq!(mol.neighbor_indices(0).unwrap().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn views_navigate_the_graph() {
        let mol = build_molecule(&mut methanol_heavy()).unwrap();
        let c = mol.atom_at(0).unwrap();
        let o = mol.atom_at(1).unwrap();
        assert_eq!(c.neighbors().collect::<Vec<_>>(), vec![o]);
        let bond = c.bonds().next().unwrap();
        assert_eq!(bond.endpoints(), [c, o]);
        assert_eq!(bond.other_end(&c), Some(o));
        assert_eq!(bond.other_end(&o), Some(c));
        assert!(std::ptr::eq(bond.owning_molecule(), &mol));
        assert!(c.is_connected_to(&o).unwrap());
    }

    #[test]
    fn atoms_from_different_instances_do_not_compare() {
        let first = build_molecule(&mut methanol_heavy()).unwrap();
        let second = first.clone();
        let a = first.atom_at(0).unwrap();
        let b = second.atom_at(1).unwrap();
        assert_eq!(
            a.is_connected_to(&b),
            Err(PerceptionError::CrossMoleculeComparison)
        );
        assert_ne!(a, second.atom_at(0).unwrap());
        assert!(first.bond_at(0).unwrap().other_end(&b).is_none());
    }

    #[test]
    fn iterators_restart() {
        let mol = build_molecule(&mut methanol_heavy()).unwrap();
        let atoms = mol.atoms();
        assert_eq!(atoms.clone().count(), 2);
        assert_eq!(atoms.map(|a| a.index()).collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(mol.bonds().len(), 1);
    }

    #[test]
    fn molecule_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Molecule>();
        assert_send_sync::<Atom<'static>>();
    }
}
