//! Toolkit-agnostic chemical environment perception.
//!
//! A [`Molecule`] is an immutable snapshot of whatever a chemistry toolkit
//! perceived, read once through a [`ToolkitAdapter`]. SMARTS/SMIRKS patterns
//! parse into a [`QueryGraph`] and are matched with [`search`], which reports
//! map-number → atom index assignments.
//!
//! ```
//! use chemical_perception::{build_molecule, search_smarts, ToolkitMol};
//!
//! let mut ethanol = ToolkitMol::from_smiles("CCO").unwrap();
//! let mol = build_molecule(&mut ethanol).unwrap();
//! let hits = search_smarts(&mol, "[#6:1]-[#8:2]").unwrap();
//! assert_eq!(hits.len(), 1);
//! assert_eq!(hits[0].get(2), Some(2));
//! ```

pub mod adapter;
pub mod atom;
pub mod bond;
pub mod config;
pub mod element;
pub mod error;
pub mod molecule;
pub mod parallel;
pub mod pattern;
pub mod smarts;
pub mod substruct;
pub mod toolkit;
pub mod traits;

pub use adapter::ToolkitAdapter;
pub use atom::AtomProperties;
pub use bond::{BondOrder, BondProperties};
pub use config::SearchOptions;
pub use error::{IndexKind, PerceptionError, Result};
pub use molecule::{Atom, Bond, Molecule, build_molecule};
pub use parallel::search_batch;
pub use pattern::{AtomExpr, BondExpr, QueryAtom, QueryGraph, RangeKind};
pub use smarts::{SmartsError, from_smarts};
pub use substruct::{MatchResult, has_match, search, search_smarts, search_with};
pub use toolkit::{SmilesError, ToolkitAtom, ToolkitBond, ToolkitMol};
pub use traits::{
    AtomCapabilities, BondCapabilities, HasAromaticity, HasAtomicNum, HasBondOrder,
    HasConnectivity, HasDegree, HasFormalCharge, HasHydrogenCount, HasMinRingSize,
    HasRingConnectivity, HasRingMembership, HasValence,
};

#[cfg(test)]
mod tests;
