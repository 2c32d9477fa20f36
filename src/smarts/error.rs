use thiserror::Error;

/// Errors produced when parsing SMARTS/SMIRKS pattern text.
///
/// Positions are character offsets into the (trimmed) pattern string. For
/// recursive sub-patterns they are offsets into the sub-pattern text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SmartsError {
    #[error("empty SMARTS string")]
    EmptyInput,

    #[error("unexpected character '{ch}' at position {pos}")]
    UnexpectedChar { pos: usize, ch: char },

    #[error("unclosed bracket starting at position {pos}")]
    UnclosedBracket { pos: usize },

    #[error("unclosed ring {digit}")]
    UnclosedRing { digit: u16 },

    #[error("unmatched parenthesis at position {pos}")]
    UnmatchedParen { pos: usize },

    #[error("invalid atomic number at position {pos}")]
    InvalidAtomicNum { pos: usize },

    #[error("unclosed recursive SMARTS at position {pos}")]
    UnclosedRecursive { pos: usize },

    #[error("invalid map number at position {pos}")]
    InvalidMapNumber { pos: usize },

    #[error("map number {map} at position {pos} is already in use")]
    DuplicateMapNumber { pos: usize, map: u16 },

    /// Valid SMARTS that this crate cannot evaluate, such as reactions,
    /// isotopes or stereo.
    #[error("unsupported SMARTS feature '{primitive}' at position {pos}")]
    Unsupported { pos: usize, primitive: String },

    #[error("invalid SMARTS at position {pos}: {msg}")]
    InvalidSmarts { pos: usize, msg: String },
}
