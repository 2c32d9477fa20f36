use std::fmt;

use thiserror::Error;

use crate::smarts::SmartsError;

/// Which indexed collection of a molecule or pattern a lookup addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexKind {
    Atom,
    Bond,
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Atom => write!(f, "atom"),
            Self::Bond => write!(f, "bond"),
        }
    }
}

/// Errors surfaced by molecule construction, lookups and substructure search.
///
/// Finding no substructure match is never an error: searches return an empty
/// vector instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PerceptionError {
    #[error("{kind} index {index} is out of range (count is {len})")]
    IndexOutOfRange {
        kind: IndexKind,
        index: usize,
        len: usize,
    },

    #[error("cannot compare atoms that belong to different molecules")]
    CrossMoleculeComparison,

    #[error("pattern has no atoms")]
    EmptyQuery,

    #[error("invalid pattern: {0}")]
    PatternSyntax(#[from] SmartsError),

    #[error("substructure search exceeded its budget of {budget} steps")]
    SearchBudgetExceeded { budget: u64 },

    #[error("toolkit adapter reported inconsistent data: {0}")]
    AdapterInconsistency(String),

    #[error("pattern atoms {a} and {b} cannot be bonded: self-bond or already bonded")]
    InvalidPatternBond { a: usize, b: usize },

    #[error("map number {0} is used by more than one pattern atom")]
    DuplicateMapNumber(u16),
}

pub type Result<T, E = PerceptionError> = std::result::Result<T, E>;
