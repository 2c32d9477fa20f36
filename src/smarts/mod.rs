//! SMARTS/SMIRKS text front end producing [`QueryGraph`] patterns.
//!
//! Supported: bare organic-subset atoms, bracket atoms combining the
//! primitives of [`AtomExpr`](crate::pattern::AtomExpr) with `!`, `&`, `,` and
//! `;`, atom map-numbers (`:n`), bond expressions built the same way,
//! branches, ring closures, `.` separated components and recursive `$(...)`
//! environments. Reaction arrows, isotopes, stereo, `h` and `R<n>` are
//! rejected with [`SmartsError::Unsupported`].
//!
//! A bracket atom that opens with a two-letter element symbol whose first
//! letter is also a primitive (`[Rb]`, `[Hg]`, `[Xe]`, `[Dy]`) is read as that
//! element. The same letters later in the bracket are rejected as ambiguous.

mod error;
mod parser;

pub use error::SmartsError;

use crate::pattern::QueryGraph;

/// Parses SMARTS or single-molecule SMIRKS text into a pattern.
///
/// ```
/// use chemical_perception::smarts::from_smarts;
///
/// let pattern = from_smarts("[#6:1]-[#1:2]").unwrap();
/// assert_eq!(pattern.atom_count(), 2);
/// assert_eq!(pattern.map_numbers(), vec![1, 2]);
/// ```
pub fn from_smarts(s: &str) -> Result<QueryGraph, SmartsError> {
    parser::parse(s)
}
