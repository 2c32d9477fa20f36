use std::collections::BTreeMap;

use crate::element;
use crate::pattern::{AtomExpr, BondExpr, QueryGraph, RangeKind};

use super::error::SmartsError;

const BOND_CHARS: &[char] = &['-', '=', '#', '~', ':', '@', '!', '&', ',', ';', '/', '\\'];

struct Parser<'a> {
    chars: Vec<char>,
    pos: usize,
    input: &'a str,
    /// Position just past the `[` of the bracket atom being parsed.
    bracket_start: usize,
}

struct OpenRing {
    atom: usize,
    bond: Option<BondExpr>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
            input,
            bracket_start: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        Some(ch)
    }

    fn expect(&mut self, ch: char) -> Result<(), SmartsError> {
        match self.advance() {
            Some(c) if c == ch => Ok(()),
            Some(c) => Err(SmartsError::UnexpectedChar {
                pos: self.pos - 1,
                ch: c,
            }),
            None => Err(SmartsError::InvalidSmarts {
                pos: self.pos,
                msg: format!("expected '{ch}', got end of input"),
            }),
        }
    }

    fn parse_number(&mut self) -> Option<u32> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.pos > start {
            let s: String = self.chars[start..self.pos].iter().collect();
            s.parse().ok()
        } else {
            None
        }
    }

    /// Optional small count following a primitive letter.
    fn parse_count(&mut self) -> Result<Option<u8>, SmartsError> {
        let start = self.pos;
        match self.parse_number() {
            None if self.pos > start => Err(out_of_range(start)),
            None => Ok(None),
            Some(n) => u8::try_from(n).map(Some).map_err(|_| out_of_range(start)),
        }
    }

    fn unsupported(&self, pos: usize, primitive: &str) -> SmartsError {
        SmartsError::Unsupported {
            pos,
            primitive: primitive.to_string(),
        }
    }

    fn parse_smarts(&mut self) -> Result<QueryGraph, SmartsError> {
        let mut graph = QueryGraph::new();
        let mut stack: Vec<(usize, Option<BondExpr>)> = Vec::new();
        let mut current: Option<usize> = None;
        let mut pending_bond: Option<BondExpr> = None;
        let mut rings: BTreeMap<u16, OpenRing> = BTreeMap::new();

        while let Some(ch) = self.peek() {
            let start = self.pos;
            match ch {
                '(' => {
                    self.pos += 1;
                    let Some(cur) = current else {
                        return Err(SmartsError::UnmatchedParen { pos: start });
                    };
                    stack.push((cur, pending_bond.take()));
                }
                ')' => {
                    self.pos += 1;
                    if pending_bond.is_some() {
                        return Err(dangling_bond(start));
                    }
                    let Some((prev, saved_bond)) = stack.pop() else {
                        return Err(SmartsError::UnmatchedParen { pos: start });
                    };
                    current = Some(prev);
                    pending_bond = saved_bond;
                }
                '.' => {
                    self.pos += 1;
                    if pending_bond.is_some() {
                        return Err(dangling_bond(start));
                    }
                    current = None;
                }
                '>' => {
                    return Err(self.unsupported(start, "reaction"));
                }
                c if BOND_CHARS.contains(&c) => {
                    if pending_bond.is_some() {
                        return Err(SmartsError::InvalidSmarts {
                            pos: start,
                            msg: "consecutive bond expressions".into(),
                        });
                    }
                    if current.is_none() {
                        return Err(SmartsError::InvalidSmarts {
                            pos: start,
                            msg: "bond without preceding atom".into(),
                        });
                    }
                    pending_bond = Some(self.parse_bond_expr()?);
                }
                '0'..='9' | '%' => {
                    let digit = self.parse_ring_closure()?;
                    let Some(cur) = current else {
                        return Err(SmartsError::InvalidSmarts {
                            pos: start,
                            msg: "ring closure without preceding atom".into(),
                        });
                    };
                    match rings.remove(&digit) {
                        Some(open) => {
                            let bond = match (pending_bond.take(), open.bond) {
                                (Some(close), Some(opened)) if close != opened => {
                                    return Err(SmartsError::InvalidSmarts {
                                        pos: start,
                                        msg: format!("ring closure {digit} has conflicting bonds"),
                                    });
                                }
                                (close, opened) => {
                                    close.or(opened).unwrap_or(BondExpr::SingleOrAromatic)
                                }
                            };
                            if open.atom == cur || graph.bond_between(open.atom, cur).is_some() {
                                return Err(SmartsError::InvalidSmarts {
                                    pos: start,
                                    msg: format!("ring closure {digit} duplicates a bond"),
                                });
                            }
                            connect(&mut graph, open.atom, cur, bond, start)?;
                        }
                        None => {
                            rings.insert(
                                digit,
                                OpenRing {
                                    atom: cur,
                                    bond: pending_bond.take(),
                                },
                            );
                        }
                    }
                }
                _ => {
                    let (expr, map) = if ch == '[' {
                        self.parse_bracket_atom()?
                    } else {
                        (self.parse_bare_atom()?, None)
                    };
                    if let Some(map) = map.filter(|&m| m != 0) {
                        if graph.atom_with_map_number(map).is_some() {
                            return Err(SmartsError::DuplicateMapNumber { pos: start, map });
                        }
                    }
                    let idx = graph.add_atom(expr, map).map_err(|e| SmartsError::InvalidSmarts {
                        pos: start,
                        msg: e.to_string(),
                    })?;
                    if let Some(prev) = current {
                        let bond = pending_bond.take().unwrap_or(BondExpr::SingleOrAromatic);
                        connect(&mut graph, prev, idx, bond, start)?;
                    }
                    current = Some(idx);
                }
            }
        }

        if pending_bond.is_some() {
            return Err(dangling_bond(self.pos));
        }
        if !stack.is_empty() {
            return Err(SmartsError::UnmatchedParen { pos: self.pos });
        }
        if let Some((&digit, _)) = rings.iter().next() {
            return Err(SmartsError::UnclosedRing { digit });
        }

        Ok(graph)
    }

    fn parse_ring_closure(&mut self) -> Result<u16, SmartsError> {
        let start = self.pos;
        match self.advance() {
            Some('%') => {
                let d1 = self.advance().and_then(|c| c.to_digit(10));
                let d2 = self.advance().and_then(|c| c.to_digit(10));
                match (d1, d2) {
                    (Some(d1), Some(d2)) => Ok((d1 * 10 + d2) as u16),
                    _ => Err(SmartsError::InvalidSmarts {
                        pos: start,
                        msg: "expected two digits after %".into(),
                    }),
                }
            }
            Some(c) => c
                .to_digit(10)
                .map(|d| d as u16)
                .ok_or(SmartsError::UnexpectedChar { pos: start, ch: c }),
            None => Err(SmartsError::InvalidSmarts {
                pos: start,
                msg: "expected ring closure".into(),
            }),
        }
    }

    fn parse_bond_expr(&mut self) -> Result<BondExpr, SmartsError> {
        let mut parts = vec![self.parse_bond_comma_expr()?];
        while self.peek() == Some(';') {
            self.pos += 1;
            parts.push(self.parse_bond_comma_expr()?);
        }
        Ok(flatten_bond_and(parts))
    }

    fn parse_bond_comma_expr(&mut self) -> Result<BondExpr, SmartsError> {
        let mut parts = vec![self.parse_bond_high_and_expr()?];
        while self.peek() == Some(',') {
            self.pos += 1;
            parts.push(self.parse_bond_high_and_expr()?);
        }
        Ok(flatten_bond_or(parts))
    }

    fn parse_bond_high_and_expr(&mut self) -> Result<BondExpr, SmartsError> {
        let mut parts = Vec::new();
        while let Some(ch) = self.peek() {
            match ch {
                '&' => self.pos += 1,
                '-' | '=' | '#' | '~' | ':' | '@' | '!' | '/' | '\\' => {
                    parts.push(self.parse_bond_not_expr()?)
                }
                _ => break,
            }
        }
        if parts.is_empty() {
            return Err(SmartsError::InvalidSmarts {
                pos: self.pos,
                msg: "expected bond primitive".into(),
            });
        }
        Ok(flatten_bond_and(parts))
    }

    fn parse_bond_not_expr(&mut self) -> Result<BondExpr, SmartsError> {
        if self.peek() == Some('!') {
            self.pos += 1;
            let inner = self.parse_bond_not_expr()?;
            Ok(BondExpr::Not(Box::new(inner)))
        } else {
            self.parse_bond_primitive()
        }
    }

    fn parse_bond_primitive(&mut self) -> Result<BondExpr, SmartsError> {
        let start = self.pos;
        match self.advance() {
            Some('-') => Ok(BondExpr::Single),
            Some('=') => Ok(BondExpr::Double),
            Some('#') => Ok(BondExpr::Triple),
            Some('~') => Ok(BondExpr::True),
            Some(':') => Ok(BondExpr::Aromatic),
            Some('@') => Ok(BondExpr::Ring),
            Some('/') | Some('\\') => Err(self.unsupported(start, "directional bond")),
            Some(ch) => Err(SmartsError::UnexpectedChar { pos: start, ch }),
            None => Err(SmartsError::InvalidSmarts {
                pos: start,
                msg: "expected bond primitive".into(),
            }),
        }
    }

    fn parse_bare_atom(&mut self) -> Result<AtomExpr, SmartsError> {
        let start = self.pos;
        let Some(ch) = self.advance() else {
            return Err(SmartsError::InvalidSmarts {
                pos: start,
                msg: "expected atom".into(),
            });
        };

        match ch {
            '*' => return Ok(AtomExpr::True),
            'A' => return Ok(AtomExpr::Aliphatic),
            'a' => return Ok(AtomExpr::Aromatic),
            _ => {}
        }

        if ch.is_ascii_lowercase() {
            let aromatic = element::aromatic_atomic_num(&ch.to_string())
                .filter(|&n| element::is_organic_subset(n));
            if let Some(atomic_num) = aromatic {
                return Ok(AtomExpr::Element {
                    atomic_num,
                    aromatic: Some(true),
                });
            }
        } else if ch.is_ascii_uppercase() {
            if let Some(next) = self.peek().filter(|c| c.is_ascii_lowercase()) {
                let two: String = [ch, next].iter().collect();
                if let Some(atomic_num) =
                    element::atomic_num(&two).filter(|&n| element::is_organic_subset(n))
                {
                    self.pos += 1;
                    return Ok(AtomExpr::Element {
                        atomic_num,
                        aromatic: Some(false),
                    });
                }
            }
            if let Some(atomic_num) =
                element::atomic_num(&ch.to_string()).filter(|&n| element::is_organic_subset(n))
            {
                return Ok(AtomExpr::Element {
                    atomic_num,
                    aromatic: Some(false),
                });
            }
        }

        Err(SmartsError::UnexpectedChar { pos: start, ch })
    }

    fn parse_bracket_atom(&mut self) -> Result<(AtomExpr, Option<u16>), SmartsError> {
        let bracket_start = self.pos;
        self.expect('[')?;
        self.bracket_start = self.pos;

        let expr = self.parse_semicolon_expr()?;

        let map = if self.peek() == Some(':') {
            self.pos += 1;
            let map_pos = self.pos;
            let n = self
                .parse_number()
                .ok_or(SmartsError::InvalidMapNumber { pos: map_pos })?;
            Some(u16::try_from(n).map_err(|_| SmartsError::InvalidMapNumber { pos: map_pos })?)
        } else {
            None
        };

        if self.peek() != Some(']') {
            return Err(SmartsError::UnclosedBracket { pos: bracket_start });
        }
        self.pos += 1;

        Ok((expr, map))
    }

    fn parse_semicolon_expr(&mut self) -> Result<AtomExpr, SmartsError> {
        let mut parts = vec![self.parse_comma_expr()?];
        while self.peek() == Some(';') {
            self.pos += 1;
            parts.push(self.parse_comma_expr()?);
        }
        Ok(flatten_and(parts))
    }

    fn parse_comma_expr(&mut self) -> Result<AtomExpr, SmartsError> {
        let mut parts = vec![self.parse_high_and_expr()?];
        while self.peek() == Some(',') {
            self.pos += 1;
            parts.push(self.parse_high_and_expr()?);
        }
        Ok(flatten_or(parts))
    }

    fn parse_high_and_expr(&mut self) -> Result<AtomExpr, SmartsError> {
        let mut parts = Vec::new();
        while let Some(ch) = self.peek() {
            match ch {
                ']' | ',' | ';' | ':' => break,
                '&' => self.pos += 1,
                _ => parts.push(self.parse_not_expr()?),
            }
        }
        if parts.is_empty() {
            return Err(SmartsError::InvalidSmarts {
                pos: self.pos,
                msg: "expected atom primitive".into(),
            });
        }
        Ok(flatten_and(parts))
    }

    fn parse_not_expr(&mut self) -> Result<AtomExpr, SmartsError> {
        if self.peek() == Some('!') {
            self.pos += 1;
            let inner = self.parse_not_expr()?;
            Ok(AtomExpr::Not(Box::new(inner)))
        } else {
            self.parse_primitive()
        }
    }

    fn parse_primitive(&mut self) -> Result<AtomExpr, SmartsError> {
        let start = self.pos;
        let Some(ch) = self.peek() else {
            return Err(SmartsError::InvalidSmarts {
                pos: start,
                msg: "expected atom primitive".into(),
            });
        };

        match ch {
            '*' => {
                self.pos += 1;
                Ok(AtomExpr::True)
            }
            'A' => {
                if self.chars.get(self.pos + 1).is_some_and(|c| c.is_ascii_lowercase()) {
                    self.parse_bracket_element()
                } else {
                    self.pos += 1;
                    Ok(AtomExpr::Aliphatic)
                }
            }
            'a' => {
                if self.chars.get(self.pos + 1) == Some(&'s') {
                    self.parse_bracket_element()
                } else {
                    self.pos += 1;
                    Ok(AtomExpr::Aromatic)
                }
            }
            '#' => {
                self.pos += 1;
                let num = self
                    .parse_number()
                    .ok_or(SmartsError::InvalidAtomicNum { pos: self.pos })?;
                if num == 0 || num > 118 {
                    return Err(SmartsError::InvalidAtomicNum { pos: start });
                }
                Ok(AtomExpr::Element {
                    atomic_num: num as u8,
                    aromatic: None,
                })
            }
            'D' | 'H' | 'R' | 'X' if self.names_two_letter_element() => {
                if self.pos == self.bracket_start {
                    self.parse_bracket_element()
                } else {
                    Err(self.unsupported(start, "element symbol after primitives"))
                }
            }
            'D' => self.parse_counted(RangeKind::Degree, AtomExpr::Degree),
            'X' => self.parse_counted(RangeKind::Connectivity, AtomExpr::Connectivity),
            'v' => self.parse_counted(RangeKind::Valence, AtomExpr::Valence),
            'H' => {
                if self.is_hydrogen_element_context() {
                    self.pos += 1;
                    Ok(AtomExpr::Element {
                        atomic_num: 1,
                        aromatic: Some(false),
                    })
                } else {
                    self.parse_counted(RangeKind::TotalHCount, AtomExpr::TotalHCount)
                }
            }
            'h' => Err(self.unsupported(start, "h")),
            'R' => {
                self.pos += 1;
                match self.parse_count()? {
                    None => Ok(AtomExpr::InRing),
                    Some(0) => Ok(AtomExpr::NotInRing),
                    Some(_) => Err(self.unsupported(start, "R<n>")),
                }
            }
            'r' => {
                self.pos += 1;
                if self.peek() == Some('{') {
                    return self.parse_range(RangeKind::SmallestRingSize);
                }
                match self.parse_count()? {
                    None => Ok(AtomExpr::InRing),
                    Some(0) => Ok(AtomExpr::NotInRing),
                    Some(n) => Ok(AtomExpr::SmallestRingSize(n)),
                }
            }
            'x' => {
                self.pos += 1;
                if self.peek() == Some('{') {
                    return self.parse_range(RangeKind::RingConnectivity);
                }
                match self.parse_count()? {
                    None => Ok(AtomExpr::Range {
                        kind: RangeKind::RingConnectivity,
                        low: Some(1),
                        high: None,
                    }),
                    Some(n) => Ok(AtomExpr::RingConnectivity(n)),
                }
            }
            '@' => Err(self.unsupported(start, "chirality")),
            '+' | '-' => {
                self.pos += 1;
                let magnitude = match self.parse_number() {
                    Some(n) => n,
                    None => {
                        let mut n = 1;
                        while self.peek() == Some(ch) {
                            self.pos += 1;
                            n += 1;
                        }
                        n
                    }
                };
                let magnitude = i8::try_from(magnitude).map_err(|_| out_of_range(start))?;
                Ok(AtomExpr::Charge(if ch == '+' { magnitude } else { -magnitude }))
            }
            '$' => {
                self.pos += 1;
                if self.peek() != Some('(') {
                    return Err(SmartsError::UnclosedRecursive { pos: self.pos });
                }
                self.pos += 1;
                let inner = self.extract_balanced_parens()?;
                let inner_graph = parse(inner)?;
                Ok(AtomExpr::Recursive(Box::new(inner_graph)))
            }
            _ if ch.is_ascii_digit() => Err(self.unsupported(start, "isotope")),
            _ if ch.is_ascii_alphabetic() => self.parse_bracket_element(),
            _ => Err(SmartsError::UnexpectedChar { pos: start, ch }),
        }
    }

    /// A primitive letter followed by an optional count (default 1) or a
    /// `{low-high}` range.
    fn parse_counted(
        &mut self,
        kind: RangeKind,
        exact: fn(u8) -> AtomExpr,
    ) -> Result<AtomExpr, SmartsError> {
        self.pos += 1;
        if self.peek() == Some('{') {
            return self.parse_range(kind);
        }
        Ok(exact(self.parse_count()?.unwrap_or(1)))
    }

    fn parse_range(&mut self, kind: RangeKind) -> Result<AtomExpr, SmartsError> {
        self.expect('{')?;
        let low = self.parse_count()?;
        self.expect('-')?;
        let high = self.parse_count()?;
        self.expect('}')?;
        Ok(AtomExpr::Range { kind, low, high })
    }

    /// `H` is the element only as the sole primitive of a bracket atom
    /// (`[H]`, `[H+]`, `[H:1]`); anywhere else it is a hydrogen count.
    /// True when the uppercase letter under the cursor and the lowercase one
    /// after it spell an element, as in `[Rb]` or `[Hg]`.
    fn names_two_letter_element(&self) -> bool {
        match (self.chars.get(self.pos), self.chars.get(self.pos + 1)) {
            (Some(&first), Some(&second)) if second.is_ascii_lowercase() => {
                let two: String = [first, second].iter().collect();
                element::atomic_num(&two).is_some()
            }
            _ => false,
        }
    }

    fn is_hydrogen_element_context(&self) -> bool {
        if self.pos != self.bracket_start {
            return false;
        }
        matches!(
            self.chars.get(self.pos + 1),
            Some(']') | Some(':') | Some('+') | Some('-')
        )
    }

    fn parse_bracket_element(&mut self) -> Result<AtomExpr, SmartsError> {
        let start = self.pos;
        let Some(ch) = self.advance() else {
            return Err(SmartsError::InvalidSmarts {
                pos: start,
                msg: "expected element".into(),
            });
        };

        if ch.is_ascii_lowercase() {
            if let Some(&next) = self.chars.get(self.pos) {
                let two: String = [ch, next].iter().collect();
                if let Some(atomic_num) = element::aromatic_atomic_num(&two) {
                    self.pos += 1;
                    return Ok(AtomExpr::Element {
                        atomic_num,
                        aromatic: Some(true),
                    });
                }
            }
            if let Some(atomic_num) = element::aromatic_atomic_num(&ch.to_string()) {
                return Ok(AtomExpr::Element {
                    atomic_num,
                    aromatic: Some(true),
                });
            }
            self.pos = start;
            return Err(SmartsError::UnexpectedChar { pos: start, ch });
        }

        if let Some(next) = self.peek().filter(|c| c.is_ascii_lowercase()) {
            let two: String = [ch, next].iter().collect();
            if let Some(atomic_num) = element::atomic_num(&two) {
                self.pos += 1;
                return Ok(AtomExpr::Element {
                    atomic_num,
                    aromatic: Some(false),
                });
            }
        }

        if let Some(atomic_num) = element::atomic_num(&ch.to_string()) {
            return Ok(AtomExpr::Element {
                atomic_num,
                aromatic: Some(false),
            });
        }

        self.pos = start;
        Err(SmartsError::UnexpectedChar { pos: start, ch })
    }

    /// Returns the text up to the `)` closing a `$(` whose `(` was just
    /// consumed, and moves past it.
    fn extract_balanced_parens(&mut self) -> Result<&'a str, SmartsError> {
        let input = self.input;
        let start_pos = self.pos;
        let begin_byte: usize = self.chars[..self.pos].iter().map(|c| c.len_utf8()).sum();
        let mut depth = 1;

        while let Some(ch) = self.peek() {
            match ch {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        let len: usize = self.chars[start_pos..self.pos]
                            .iter()
                            .map(|c| c.len_utf8())
                            .sum();
                        self.pos += 1;
                        return Ok(&input[begin_byte..begin_byte + len]);
                    }
                }
                _ => {}
            }
            self.pos += 1;
        }

        Err(SmartsError::UnclosedRecursive { pos: start_pos })
    }
}

fn connect(
    graph: &mut QueryGraph,
    a: usize,
    b: usize,
    bond: BondExpr,
    pos: usize,
) -> Result<(), SmartsError> {
    graph
        .add_bond(a, b, bond)
        .map(|_| ())
        .map_err(|e| SmartsError::InvalidSmarts {
            pos,
            msg: e.to_string(),
        })
}

fn dangling_bond(pos: usize) -> SmartsError {
    SmartsError::InvalidSmarts {
        pos,
        msg: "bond without following atom".into(),
    }
}

fn out_of_range(pos: usize) -> SmartsError {
    SmartsError::InvalidSmarts {
        pos,
        msg: "value out of range".into(),
    }
}

fn flatten_and(parts: Vec<AtomExpr>) -> AtomExpr {
    let mut flattened = Vec::new();
    for p in parts {
        match p {
            AtomExpr::And(inner) => flattened.extend(inner),
            other => flattened.push(other),
        }
    }
    match <[AtomExpr; 1]>::try_from(flattened) {
        Ok([single]) => single,
        Err(many) => AtomExpr::And(many),
    }
}

fn flatten_or(parts: Vec<AtomExpr>) -> AtomExpr {
    let mut flattened = Vec::new();
    for p in parts {
        match p {
            AtomExpr::Or(inner) => flattened.extend(inner),
            other => flattened.push(other),
        }
    }
    match <[AtomExpr; 1]>::try_from(flattened) {
        Ok([single]) => single,
        Err(many) => AtomExpr::Or(many),
    }
}

fn flatten_bond_and(parts: Vec<BondExpr>) -> BondExpr {
    let mut flattened = Vec::new();
    for p in parts {
        match p {
            BondExpr::And(inner) => flattened.extend(inner),
            other => flattened.push(other),
        }
    }
    match <[BondExpr; 1]>::try_from(flattened) {
        Ok([single]) => single,
        Err(many) => BondExpr::And(many),
    }
}

fn flatten_bond_or(parts: Vec<BondExpr>) -> BondExpr {
    let mut flattened = Vec::new();
    for p in parts {
        match p {
            BondExpr::Or(inner) => flattened.extend(inner),
            other => flattened.push(other),
        }
    }
    match <[BondExpr; 1]>::try_from(flattened) {
        Ok([single]) => single,
        Err(many) => BondExpr::Or(many),
    }
}

pub fn parse(input: &str) -> Result<QueryGraph, SmartsError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(SmartsError::EmptyInput);
    }
    let mut parser = Parser::new(trimmed);
    parser.parse_smarts()
}
