use serde::{Deserialize, Serialize};

/// Order of a bond as reported by the toolkit.
///
/// `Aromatic` is a marker, not an integer order: a bond reporting it is
/// neither single, double nor triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum BondOrder {
    #[default]
    Single,
    Double,
    Triple,
    Aromatic,
}

impl BondOrder {
    pub fn from_int(order: u8) -> Option<Self> {
        match order {
            1 => Some(Self::Single),
            2 => Some(Self::Double),
            3 => Some(Self::Triple),
            _ => None,
        }
    }

    /// Integer order, `None` for aromatic bonds.
    pub fn as_int(self) -> Option<u8> {
        match self {
            Self::Single => Some(1),
            Self::Double => Some(2),
            Self::Triple => Some(3),
            Self::Aromatic => None,
        }
    }

    /// Twice the valence contribution; aromatic bonds count 1.5.
    pub(crate) fn doubled_valence(self) -> u8 {
        match self {
            Self::Single => 2,
            Self::Double => 4,
            Self::Triple => 6,
            Self::Aromatic => 3,
        }
    }
}

/// Snapshot of one bond as supplied by a toolkit adapter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BondProperties {
    /// Index of the adapter-reported begin atom.
    pub begin: usize,
    /// Index of the adapter-reported end atom.
    pub end: usize,
    pub order: BondOrder,
    pub is_ring: bool,
    pub is_aromatic: bool,
}

impl crate::traits::HasBondOrder for BondProperties {
    fn order(&self) -> BondOrder {
        self.order
    }
}

impl crate::traits::HasRingMembership for BondProperties {
    fn is_ring(&self) -> bool {
        self.is_ring
    }
}

impl crate::traits::HasAromaticity for BondProperties {
    fn is_aromatic(&self) -> bool {
        self.is_aromatic
    }
}
