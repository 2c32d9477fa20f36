use crate::bond::BondOrder;

pub trait HasAtomicNum {
    fn atomic_number(&self) -> u8;
}

pub trait HasFormalCharge {
    fn formal_charge(&self) -> i8;
}

/// Total hydrogens on an atom: implicit ones plus explicit hydrogen neighbors.
pub trait HasHydrogenCount {
    fn hydrogen_count(&self) -> u8;
}

pub trait HasAromaticity {
    fn is_aromatic(&self) -> bool;
}

/// Number of explicit graph neighbors.
pub trait HasDegree {
    fn degree(&self) -> u8;
}

/// Degree plus implicit hydrogens.
pub trait HasConnectivity {
    fn connectivity(&self) -> u8;
}

/// Bond order sum plus implicit hydrogens.
pub trait HasValence {
    fn valence(&self) -> u8;
}

pub trait HasRingConnectivity {
    fn ring_connectivity(&self) -> u8;
}

/// Size of the smallest ring through the atom, `0` outside rings.
pub trait HasMinRingSize {
    fn min_ring_size(&self) -> u8;
}

pub trait HasBondOrder {
    fn order(&self) -> BondOrder;
}

pub trait HasRingMembership {
    fn is_ring(&self) -> bool;
}

/// Everything a pattern atom predicate can ask of an atom.
pub trait AtomCapabilities:
    HasAtomicNum
    + HasFormalCharge
    + HasHydrogenCount
    + HasAromaticity
    + HasDegree
    + HasConnectivity
    + HasValence
    + HasRingConnectivity
    + HasMinRingSize
{
}

impl<T> AtomCapabilities for T where
    T: HasAtomicNum
        + HasFormalCharge
        + HasHydrogenCount
        + HasAromaticity
        + HasDegree
        + HasConnectivity
        + HasValence
        + HasRingConnectivity
        + HasMinRingSize
{
}

/// Everything a pattern bond predicate can ask of a bond.
pub trait BondCapabilities: HasBondOrder + HasRingMembership + HasAromaticity {}

impl<T> BondCapabilities for T where T: HasBondOrder + HasRingMembership + HasAromaticity {}
