//! The boundary between the core and a concrete chemistry engine.
//!
//! A [`ToolkitAdapter`] wraps whatever object an external toolkit uses to
//! represent a molecule. The core reads every value through this trait exactly
//! once while building a [`Molecule`](crate::Molecule) and never calls it
//! again, so adapters are free to perceive lazily and cache internally.

use crate::atom::AtomProperties;
use crate::bond::BondProperties;

/// Supplies perceived chemistry for one molecule.
///
/// Methods take `&mut self` because many toolkits perceive rings, aromaticity
/// or canonical labels lazily and are not safe to share while doing so;
/// construction therefore requires exclusive access to the adapter.
///
/// Contract:
/// - atoms are enumerated `0..atom_count()` and bonds `0..bond_count()` in a
///   deterministic order;
/// - [`BondProperties::begin`] and [`BondProperties::end`] must be atom
///   indices of this molecule, distinct from each other, and no atom pair may
///   be bonded twice;
/// - `canonical_string` must depend only on the molecular structure.
pub trait ToolkitAdapter {
    fn atom_count(&self) -> usize;

    fn bond_count(&self) -> usize;

    fn atom_properties(&mut self, index: usize) -> AtomProperties;

    fn bond_properties(&mut self, index: usize) -> BondProperties;

    fn canonical_string(&mut self) -> String;
}

impl<T: ToolkitAdapter + ?Sized> ToolkitAdapter for &mut T {
    fn atom_count(&self) -> usize {
        (**self).atom_count()
    }

    fn bond_count(&self) -> usize {
        (**self).bond_count()
    }

    fn atom_properties(&mut self, index: usize) -> AtomProperties {
        (**self).atom_properties(index)
    }

    fn bond_properties(&mut self, index: usize) -> BondProperties {
        (**self).bond_properties(index)
    }

    fn canonical_string(&mut self) -> String {
        (**self).canonical_string()
    }
}
