use serde::{Deserialize, Serialize};

/// Snapshot of one atom's perceived properties as supplied by a toolkit
/// adapter.
///
/// These are the values the toolkit computed at the time the
/// [`Molecule`](crate::Molecule) was built; nothing here is recomputed by the
/// core.
///
/// # Examples
///
/// ```
/// use chemical_perception::AtomProperties;
///
/// let carbon = AtomProperties {
///     atomic_number: 6,
///     hydrogen_count: 4,
///     connectivity: 4,
///     valence: 4,
///     ..AtomProperties::default()
/// };
/// assert_eq!(carbon.min_ring_size, 0);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtomProperties {
    /// Atomic number (1 = H, 6 = C, ...).
    pub atomic_number: u8,
    /// Formal charge in elementary charge units.
    pub formal_charge: i8,
    /// Total hydrogens: implicit plus explicit hydrogen neighbors.
    pub hydrogen_count: u8,
    /// Explicit graph neighbors, hydrogens included when they are graph atoms.
    pub degree: u8,
    /// Degree plus implicit hydrogens.
    pub connectivity: u8,
    /// Sum of bond orders plus implicit hydrogens.
    pub valence: u8,
    /// Number of incident ring bonds.
    pub ring_connectivity: u8,
    /// Smallest ring containing the atom, `0` when acyclic.
    pub min_ring_size: u8,
    pub is_aromatic: bool,
}

impl crate::traits::HasAtomicNum for AtomProperties {
    fn atomic_number(&self) -> u8 {
        self.atomic_number
    }
}

impl crate::traits::HasFormalCharge for AtomProperties {
    fn formal_charge(&self) -> i8 {
        self.formal_charge
    }
}

impl crate::traits::HasHydrogenCount for AtomProperties {
    fn hydrogen_count(&self) -> u8 {
        self.hydrogen_count
    }
}

impl crate::traits::HasAromaticity for AtomProperties {
    fn is_aromatic(&self) -> bool {
        self.is_aromatic
    }
}

impl crate::traits::HasDegree for AtomProperties {
    fn degree(&self) -> u8 {
        self.degree
    }
}

impl crate::traits::HasConnectivity for AtomProperties {
    fn connectivity(&self) -> u8 {
        self.connectivity
    }
}

impl crate::traits::HasValence for AtomProperties {
    fn valence(&self) -> u8 {
        self.valence
    }
}

impl crate::traits::HasRingConnectivity for AtomProperties {
    fn ring_connectivity(&self) -> u8 {
        self.ring_connectivity
    }
}

impl crate::traits::HasMinRingSize for AtomProperties {
    fn min_ring_size(&self) -> u8 {
        self.min_ring_size
    }
}
