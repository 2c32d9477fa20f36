//! Backtracking substructure search of a [`QueryGraph`] over a [`Molecule`].
//!
//! The search walks pattern atoms in a fixed plan: each connected pattern
//! component starts at its most constrained atom and grows breadth-first, so
//! every non-root atom is tried only against molecule neighbors of its
//! already-placed parent. Backtracking uses an explicit frame stack over an
//! assignment array indexed by pattern atom; nothing recurses.

use std::collections::{HashMap, HashSet};
use std::ops::ControlFlow;

use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::{debug, instrument, warn};

use crate::config::SearchOptions;
use crate::error::{PerceptionError, Result};
use crate::molecule::Molecule;
use crate::pattern::{MatchContext, QueryGraph};
use crate::smarts::from_smarts;

/// One reported match: map-number → molecule atom index, ordered by
/// map-number.
///
/// Only pattern atoms carrying a map-number are reported. A pattern without
/// map-numbers produces an empty mapping when it matches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct MatchResult {
    entries: Vec<(u16, usize)>,
}

impl MatchResult {
    /// Builds a result from `(map_number, atom_index)` pairs in any order.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (u16, usize)>) -> Self {
        let mut entries: Vec<(u16, usize)> = pairs.into_iter().collect();
        entries.sort_unstable_by_key(|&(map, _)| map);
        Self { entries }
    }

    /// Molecule atom index matched by the pattern atom with map-number `map`.
    pub fn get(&self, map: u16) -> Option<usize> {
        self.entries
            .binary_search_by_key(&map, |&(m, _)| m)
            .ok()
            .map(|i| self.entries[i].1)
    }

    pub fn contains(&self, map: u16) -> bool {
        self.get(map).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(map_number, atom_index)` pairs in map-number order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (u16, usize)> + '_ {
        self.entries.iter().copied()
    }

    pub fn map_numbers(&self) -> impl Iterator<Item = u16> + '_ {
        self.entries.iter().map(|&(m, _)| m)
    }

    /// Matched atom indices in map-number order.
    pub fn atom_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries.iter().map(|&(_, a)| a)
    }

    pub fn as_slice(&self) -> &[(u16, usize)] {
        &self.entries
    }
}

impl Serialize for MatchResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Finds every match of `pattern` in `mol` with default options.
///
/// Results come back in discovery order and are deterministic for identical
/// inputs. Two full assignments are reported separately whenever they differ
/// on at least one map-numbered pattern atom; assignments that only differ on
/// unmapped atoms are reported once.
///
/// # Errors
///
/// [`PerceptionError::EmptyQuery`] if the pattern has no atoms. No match is
/// not an error.
pub fn search(mol: &Molecule, pattern: &QueryGraph) -> Result<Vec<MatchResult>> {
    search_with(mol, pattern, &SearchOptions::default())
}

/// [`search`] with explicit [`SearchOptions`].
#[instrument(skip_all, fields(atoms = mol.atom_count(), pattern_atoms = pattern.atom_count()))]
pub fn search_with(
    mol: &Molecule,
    pattern: &QueryGraph,
    options: &SearchOptions,
) -> Result<Vec<MatchResult>> {
    if pattern.is_empty() {
        return Err(PerceptionError::EmptyQuery);
    }
    if options.max_matches == Some(0) {
        return Ok(Vec::new());
    }

    let mut budget = Budget::new(options.step_budget);
    let ctx = build_context(mol, pattern, &mut budget)?;
    let plan = traversal_order(pattern, None);

    let mut mapped: Vec<(u16, usize)> = (0..pattern.atom_count())
        .filter_map(|q| pattern.query_atom(q).map_number.map(|m| (m, q)))
        .collect();
    mapped.sort_unstable();

    let mut seen: HashSet<MatchResult> = HashSet::new();
    let mut results: Vec<MatchResult> = Vec::new();
    Matcher::new(&ctx, pattern, &plan, None).run(&mut budget, |assignment| {
        let result = MatchResult {
            entries: mapped
                .iter()
                .filter_map(|&(map, q)| assignment[q].map(|t| (map, t)))
                .collect(),
        };
        if seen.insert(result.clone()) {
            results.push(result);
        }
        match options.max_matches {
            Some(max) if results.len() >= max => ControlFlow::Break(()),
            _ => ControlFlow::Continue(()),
        }
    })?;

    debug!(
        matches = results.len(),
        steps = budget.used,
        "Substructure search complete."
    );
    Ok(results)
}

/// Whether `pattern` occurs in `mol` at all. Stops at the first match.
pub fn has_match(mol: &Molecule, pattern: &QueryGraph) -> Result<bool> {
    let options = SearchOptions::new().with_max_matches(1);
    Ok(!search_with(mol, pattern, &options)?.is_empty())
}

/// Parses a SMARTS/SMIRKS pattern and searches for it.
///
/// # Errors
///
/// [`PerceptionError::PatternSyntax`] for malformed pattern text, otherwise
/// as [`search`].
pub fn search_smarts(mol: &Molecule, smarts: &str) -> Result<Vec<MatchResult>> {
    let pattern = from_smarts(smarts)?;
    search(mol, &pattern)
}

impl Molecule {
    /// Finds every match of a SMIRKS/SMARTS pattern in this molecule. See
    /// [`search_smarts`].
    pub fn smirks_search(&self, smirks: &str) -> Result<Vec<MatchResult>> {
        search_smarts(self, smirks)
    }
}

struct Budget {
    limit: Option<u64>,
    used: u64,
}

impl Budget {
    fn new(limit: Option<u64>) -> Self {
        Self { limit, used: 0 }
    }

    fn tick(&mut self) -> Result<()> {
        self.used += 1;
        match self.limit {
            Some(budget) if self.used > budget => {
                warn!(budget, "Substructure search budget exhausted.");
                Err(PerceptionError::SearchBudgetExceeded { budget })
            }
            _ => Ok(()),
        }
    }
}

/// Pre-evaluates every recursive sub-pattern of `pattern` against all atoms.
fn build_context<'a>(
    mol: &'a Molecule,
    pattern: &QueryGraph,
    budget: &mut Budget,
) -> Result<MatchContext<'a>> {
    let mut subs: Vec<&QueryGraph> = Vec::new();
    for q in 0..pattern.atom_count() {
        pattern
            .query_atom(q)
            .expr
            .for_each_recursive(&mut |sub| subs.push(sub));
    }

    let mut recursive = HashMap::new();
    for sub in subs {
        let key = sub as *const QueryGraph;
        if recursive.contains_key(&key) {
            continue;
        }
        let hits = anchored_hits(mol, sub, budget)?;
        recursive.insert(key, hits);
    }
    Ok(MatchContext { mol, recursive })
}

/// For every molecule atom, whether `sub` matches with its first atom placed
/// there.
fn anchored_hits(mol: &Molecule, sub: &QueryGraph, budget: &mut Budget) -> Result<Vec<bool>> {
    let mut hits = vec![false; mol.atom_count()];
    if sub.is_empty() {
        return Ok(hits);
    }
    let ctx = build_context(mol, sub, budget)?;
    let plan = traversal_order(sub, Some(0));
    for (anchor, hit) in hits.iter_mut().enumerate() {
        Matcher::new(&ctx, sub, &plan, Some(anchor)).run(budget, |_| {
            *hit = true;
            ControlFlow::Break(())
        })?;
    }
    Ok(hits)
}

struct PlanStep {
    atom: usize,
    /// Earlier pattern atom bonded to `atom`; `None` for component roots.
    parent: Option<usize>,
}

/// Orders pattern atoms for the search. Each component is rooted at its
/// highest-degree atom (then most specific, then lowest index) unless `anchor`
/// forces the first root, and continues breadth-first.
fn traversal_order(pattern: &QueryGraph, anchor: Option<usize>) -> Vec<PlanStep> {
    let n = pattern.atom_count();
    let neighbors: Vec<Vec<usize>> = (0..n).map(|i| pattern.neighbors(i)).collect();
    let score = |i: usize| (neighbors[i].len(), pattern.query_atom(i).expr.specificity());

    let mut placed = vec![false; n];
    let mut order: Vec<PlanStep> = Vec::with_capacity(n);
    let mut forced = anchor;

    loop {
        let root = forced.take().or_else(|| {
            (0..n)
                .filter(|&i| !placed[i])
                .max_by(|&a, &b| score(a).cmp(&score(b)).then(b.cmp(&a)))
        });
        let Some(root) = root else {
            break;
        };

        placed[root] = true;
        let mut head = order.len();
        order.push(PlanStep {
            atom: root,
            parent: None,
        });
        while head < order.len() {
            let current = order[head].atom;
            head += 1;
            for &nb in &neighbors[current] {
                if !placed[nb] {
                    placed[nb] = true;
                    order.push(PlanStep {
                        atom: nb,
                        parent: Some(current),
                    });
                }
            }
        }
    }

    order
}

struct Frame {
    candidates: Vec<usize>,
    next: usize,
}

struct Matcher<'c, 'q> {
    ctx: &'c MatchContext<'c>,
    pattern: &'q QueryGraph,
    plan: &'q [PlanStep],
    anchor: Option<usize>,
    pattern_neighbors: Vec<Vec<usize>>,
}

impl<'c, 'q> Matcher<'c, 'q> {
    fn new(
        ctx: &'c MatchContext<'c>,
        pattern: &'q QueryGraph,
        plan: &'q [PlanStep],
        anchor: Option<usize>,
    ) -> Self {
        let pattern_neighbors = (0..pattern.atom_count())
            .map(|i| pattern.neighbors(i))
            .collect();
        Self {
            ctx,
            pattern,
            plan,
            anchor,
            pattern_neighbors,
        }
    }

    /// Enumerates full assignments, handing each to `on_match` (indexed by
    /// pattern atom) until it breaks or the space is exhausted.
    fn run(
        &self,
        budget: &mut Budget,
        mut on_match: impl FnMut(&[Option<usize>]) -> ControlFlow<()>,
    ) -> Result<()> {
        let mol = self.ctx.mol;
        let depth_count = self.plan.len();
        if depth_count == 0 {
            return Ok(());
        }

        let mut assignment: Vec<Option<usize>> = vec![None; self.pattern.atom_count()];
        let mut used = vec![false; mol.atom_count()];
        let mut frames = vec![Frame {
            candidates: self.candidates(0, &assignment),
            next: 0,
        }];

        while let Some(depth) = frames.len().checked_sub(1) {
            let q = self.plan[depth].atom;
            if let Some(previous) = assignment[q].take() {
                used[previous] = false;
            }

            let frame = &mut frames[depth];
            let Some(&candidate) = frame.candidates.get(frame.next) else {
                frames.pop();
                continue;
            };
            frame.next += 1;
            budget.tick()?;

            if used[candidate] || !self.feasible(q, candidate, &assignment) {
                continue;
            }
            assignment[q] = Some(candidate);
            used[candidate] = true;

            if depth + 1 == depth_count {
                if on_match(&assignment).is_break() {
                    return Ok(());
                }
            } else {
                let candidates = self.candidates(depth + 1, &assignment);
                frames.push(Frame {
                    candidates,
                    next: 0,
                });
            }
        }

        Ok(())
    }

    fn candidates(&self, depth: usize, assignment: &[Option<usize>]) -> Vec<usize> {
        let mol = self.ctx.mol;
        match self.plan[depth].parent {
            Some(parent) => match assignment[parent] {
                Some(target) => mol.adjacent_atoms(target).collect(),
                None => Vec::new(),
            },
            None => match self.anchor {
                Some(anchor) if depth == 0 => vec![anchor],
                _ => (0..mol.atom_count()).collect(),
            },
        }
    }

    fn feasible(&self, q: usize, target: usize, assignment: &[Option<usize>]) -> bool {
        let mol = self.ctx.mol;
        if !self
            .pattern
            .query_atom(q)
            .expr
            .matches(mol.atom_view(target), self.ctx)
        {
            return false;
        }

        for &q_neighbor in &self.pattern_neighbors[q] {
            let Some(t_mapped) = assignment[q_neighbor] else {
                continue;
            };
            let Some(bond) = mol.bond_between(target, t_mapped) else {
                return false;
            };
            match self.pattern.bond_between(q, q_neighbor) {
                Some(expr) if expr.matches_bond(bond) => {}
                _ => return false,
            }
        }

        true
    }
}
