//! Canonical ranking and canonical SMILES output for the reference toolkit.
//!
//! Ranks start from hashed atom invariants, are refined Morgan-style by
//! neighbor ranks, and remaining ties are broken by promoting each tied atom
//! in turn and keeping the promotion whose invariant trace is smallest. The
//! writer walks each component depth-first from its lowest-ranked atom,
//! visiting neighbors in rank order.

use std::collections::HashSet;
use std::hash::{Hash, Hasher};

use crate::bond::BondOrder;
use crate::element;

use super::smiles::{implicit_h_for_bare_atom, reader_contribution};

/// Hydrogen-suppressed view of a toolkit molecule with perceived bond orders.
#[derive(Debug, Clone, Default)]
pub(crate) struct CanonGraph {
    pub atoms: Vec<CanonAtom>,
    pub neighbors: Vec<Vec<(usize, BondOrder)>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CanonAtom {
    pub atomic_num: u8,
    pub formal_charge: i8,
    pub isotope: u16,
    pub hydrogens: u8,
    pub is_aromatic: bool,
}

impl CanonGraph {
    fn atom_count(&self) -> usize {
        self.atoms.len()
    }
}

struct Fnv1aHasher(u64);

impl Fnv1aHasher {
    fn new() -> Self {
        Self(0xcbf29ce484222325)
    }
}

impl Hasher for Fnv1aHasher {
    fn finish(&self) -> u64 {
        self.0
    }

    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(0x100000001b3);
        }
    }
}

#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct AtomInvariant {
    atomic_num: u8,
    degree: u8,
    hydrogens: u8,
    formal_charge: i8,
    is_aromatic: bool,
    isotope: u16,
    singles: u8,
    doubles: u8,
    triples: u8,
    aromatic_bonds: u8,
}

fn atom_invariant(graph: &CanonGraph, idx: usize) -> AtomInvariant {
    let atom = &graph.atoms[idx];
    let mut singles = 0u8;
    let mut doubles = 0u8;
    let mut triples = 0u8;
    let mut aromatic_bonds = 0u8;
    for &(_, order) in &graph.neighbors[idx] {
        match order {
            BondOrder::Single => singles += 1,
            BondOrder::Double => doubles += 1,
            BondOrder::Triple => triples += 1,
            BondOrder::Aromatic => aromatic_bonds += 1,
        }
    }
    AtomInvariant {
        atomic_num: atom.atomic_num,
        degree: graph.neighbors[idx].len() as u8,
        hydrogens: atom.hydrogens,
        formal_charge: atom.formal_charge,
        is_aromatic: atom.is_aromatic,
        isotope: atom.isotope,
        singles,
        doubles,
        triples,
        aromatic_bonds,
    }
}

fn hash_invariant(inv: &AtomInvariant) -> u64 {
    let mut h = Fnv1aHasher::new();
    inv.hash(&mut h);
    h.finish()
}

fn ranks_from_values(values: &[u64]) -> Vec<usize> {
    let n = values.len();
    let mut indices: Vec<usize> = (0..n).collect();
    indices.sort_by_key(|&i| values[i]);
    let mut ranks = vec![0usize; n];
    for i in 1..n {
        ranks[indices[i]] = if values[indices[i]] == values[indices[i - 1]] {
            ranks[indices[i - 1]]
        } else {
            i
        };
    }
    ranks
}

fn count_distinct(ranks: &[usize]) -> usize {
    let mut sorted: Vec<usize> = ranks.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    sorted.len()
}

fn morgan_refine(graph: &CanonGraph, ranks: &mut Vec<usize>) {
    let mut prev_distinct = count_distinct(ranks);

    loop {
        let new_values: Vec<u64> = (0..graph.atom_count())
            .map(|i| {
                let mut neighbor_ranks: Vec<(usize, BondOrder)> = graph.neighbors[i]
                    .iter()
                    .map(|&(nb, order)| (ranks[nb], order))
                    .collect();
                neighbor_ranks.sort_unstable();

                let mut h = Fnv1aHasher::new();
                ranks[i].hash(&mut h);
                neighbor_ranks.hash(&mut h);
                h.finish()
            })
            .collect();
        let new_ranks = ranks_from_values(&new_values);
        let distinct = count_distinct(&new_ranks);
        if distinct <= prev_distinct {
            return;
        }
        *ranks = new_ranks;
        prev_distinct = distinct;
    }
}

/// A rank for every atom, `0..n`, independent of input atom order.
pub(crate) fn canonical_ordering(graph: &CanonGraph) -> Vec<usize> {
    let n = graph.atom_count();
    if n == 0 {
        return Vec::new();
    }

    let invariants: Vec<AtomInvariant> = (0..n).map(|i| atom_invariant(graph, i)).collect();
    let initial_values: Vec<u64> = invariants.iter().map(hash_invariant).collect();
    let mut ranks = ranks_from_values(&initial_values);

    morgan_refine(graph, &mut ranks);
    if count_distinct(&ranks) < n {
        break_ties(graph, &mut ranks, &invariants);
    }

    let mut indices: Vec<usize> = (0..n).collect();
    indices.sort_by_key(|&i| ranks[i]);
    let mut final_ranks = vec![0usize; n];
    for (rank, &atom_idx) in indices.iter().enumerate() {
        final_ranks[atom_idx] = rank;
    }
    final_ranks
}

fn break_ties(graph: &CanonGraph, ranks: &mut Vec<usize>, invariants: &[AtomInvariant]) {
    let n = ranks.len();

    while count_distinct(ranks) < n {
        let Some(min_tied_rank) = lowest_tied_rank(ranks) else {
            return;
        };
        let tied_atoms: Vec<usize> = (0..n).filter(|&i| ranks[i] == min_tied_rank).collect();
        let max_rank = ranks.iter().copied().max().unwrap_or(0);

        let mut best: Option<(Vec<u64>, Vec<usize>)> = None;
        for &candidate in &tied_atoms {
            let mut trial = ranks.clone();
            trial[candidate] = max_rank + 1;
            morgan_refine(graph, &mut trial);

            let mut ordered: Vec<usize> = (0..n).collect();
            ordered.sort_by_key(|&i| trial[i]);
            let trace: Vec<u64> = ordered
                .iter()
                .map(|&atom_i| {
                    let mut h = Fnv1aHasher::new();
                    invariants[atom_i].hash(&mut h);
                    let mut nb_ranks: Vec<(usize, BondOrder)> = graph.neighbors[atom_i]
                        .iter()
                        .map(|&(nb, order)| (trial[nb], order))
                        .collect();
                    nb_ranks.sort_unstable();
                    nb_ranks.hash(&mut h);
                    h.finish()
                })
                .collect();
            if best.as_ref().is_none_or(|(best_trace, _)| trace < *best_trace) {
                best = Some((trace, trial));
            }
        }

        match best {
            Some((_, trial)) => *ranks = trial,
            None => return,
        }
    }
}

fn lowest_tied_rank(ranks: &[usize]) -> Option<usize> {
    let mut sorted = ranks.to_vec();
    sorted.sort_unstable();
    sorted.windows(2).find(|w| w[0] == w[1]).map(|w| w[0])
}

struct RingClosure {
    ring_id: usize,
    order: BondOrder,
    other: usize,
}

struct DfsContext {
    children: Vec<Vec<(usize, BondOrder)>>,
    ring_opens: Vec<Vec<RingClosure>>,
    ring_closes: Vec<Vec<RingClosure>>,
}

/// Writes canonical SMILES. Components are emitted in order of their
/// lowest-ranked atom and joined with `.`.
pub(crate) fn to_canonical_smiles(graph: &CanonGraph) -> String {
    let ranks = canonical_ordering(graph);
    let mut components = connected_components(graph);
    for component in &mut components {
        component.sort_by_key(|&i| ranks[i]);
    }
    components.sort_by_key(|component| component.first().map(|&i| ranks[i]));

    let parts: Vec<String> = components
        .iter()
        .filter_map(|component| component.first())
        .map(|&start| write_fragment(graph, start, &ranks))
        .collect();
    parts.join(".")
}

fn connected_components(graph: &CanonGraph) -> Vec<Vec<usize>> {
    let n = graph.atom_count();
    let mut seen = vec![false; n];
    let mut components = Vec::new();
    for root in 0..n {
        if seen[root] {
            continue;
        }
        seen[root] = true;
        let mut component = vec![root];
        let mut head = 0;
        while head < component.len() {
            let node = component[head];
            head += 1;
            for &(nb, _) in &graph.neighbors[node] {
                if !seen[nb] {
                    seen[nb] = true;
                    component.push(nb);
                }
            }
        }
        components.push(component);
    }
    components
}

fn write_fragment(graph: &CanonGraph, start: usize, ranks: &[usize]) -> String {
    let n = graph.atom_count();
    let mut visited = vec![false; n];
    let mut parent = vec![None::<usize>; n];
    let mut children: Vec<Vec<(usize, BondOrder)>> = vec![Vec::new(); n];
    let mut ring_opens: Vec<Vec<RingClosure>> = (0..n).map(|_| Vec::new()).collect();
    let mut ring_closes: Vec<Vec<RingClosure>> = (0..n).map(|_| Vec::new()).collect();
    let mut closed: HashSet<(usize, usize)> = HashSet::new();
    let mut next_ring_id: usize = 1;

    let neighbor_lists: Vec<Vec<(usize, BondOrder)>> = graph
        .neighbors
        .iter()
        .map(|list| {
            let mut sorted = list.clone();
            sorted.sort_by_key(|&(nb, _)| ranks[nb]);
            sorted
        })
        .collect();

    let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
    visited[start] = true;

    while let Some(&mut (node, ref mut ni)) = stack.last_mut() {
        let neighbors = &neighbor_lists[node];
        let Some(&(neighbor, order)) = neighbors.get(*ni) else {
            stack.pop();
            continue;
        };
        *ni += 1;

        if !visited[neighbor] {
            visited[neighbor] = true;
            parent[neighbor] = Some(node);
            children[node].push((neighbor, order));
            stack.push((neighbor, 0));
        } else if parent[node] != Some(neighbor) {
            let key = (node.min(neighbor), node.max(neighbor));
            if closed.insert(key) {
                let ring_id = next_ring_id;
                next_ring_id += 1;
                ring_opens[neighbor].push(RingClosure {
                    ring_id,
                    order,
                    other: node,
                });
                ring_closes[node].push(RingClosure {
                    ring_id,
                    order,
                    other: neighbor,
                });
            }
        }
    }

    let ctx = DfsContext {
        children,
        ring_opens,
        ring_closes,
    };
    let mut out = String::new();
    write_node(graph, start, &ctx, &mut out);
    out
}

fn write_node(graph: &CanonGraph, node: usize, ctx: &DfsContext, out: &mut String) {
    write_atom(graph, node, out);

    for rc in ctx.ring_opens[node].iter().chain(&ctx.ring_closes[node]) {
        write_bond(graph, rc.order, node, rc.other, out);
        write_ring_digit(rc.ring_id, out);
    }

    let kids = &ctx.children[node];
    let Some(last) = kids.len().checked_sub(1) else {
        return;
    };
    for (i, &(child, order)) in kids.iter().enumerate() {
        let is_branch = i < last;
        if is_branch {
            out.push('(');
        }
        write_bond(graph, order, node, child, out);
        write_node(graph, child, ctx, out);
        if is_branch {
            out.push(')');
        }
    }
}

fn write_bond(graph: &CanonGraph, order: BondOrder, from: usize, to: usize, out: &mut String) {
    let both_aromatic = graph.atoms[from].is_aromatic && graph.atoms[to].is_aromatic;
    match order {
        BondOrder::Single if both_aromatic => out.push('-'),
        BondOrder::Single => {}
        BondOrder::Double => out.push('='),
        BondOrder::Triple => out.push('#'),
        BondOrder::Aromatic if both_aromatic => {}
        BondOrder::Aromatic => out.push(':'),
    }
}

fn write_ring_digit(id: usize, out: &mut String) {
    match id {
        0..=9 => out.push_str(&id.to_string()),
        10..=99 => {
            out.push('%');
            out.push_str(&id.to_string());
        }
        _ => {
            out.push_str("%(");
            out.push_str(&id.to_string());
            out.push(')');
        }
    }
}

fn write_atom(graph: &CanonGraph, node: usize, out: &mut String) {
    let atom = &graph.atoms[node];
    let symbol = element::symbol(atom.atomic_num);

    match symbol {
        Some(symbol) if can_write_bare(graph, node) => push_symbol(symbol, atom.is_aromatic, out),
        _ => write_bracket_atom(atom, symbol, out),
    }
}

fn push_symbol(symbol: &str, aromatic: bool, out: &mut String) {
    if aromatic {
        out.extend(symbol.chars().map(|c| c.to_ascii_lowercase()));
    } else {
        out.push_str(symbol);
    }
}

fn can_write_bare(graph: &CanonGraph, node: usize) -> bool {
    let atom = &graph.atoms[node];
    if !element::is_organic_subset(atom.atomic_num) || atom.isotope != 0 || atom.formal_charge != 0
    {
        return false;
    }
    if atom.is_aromatic && element::symbol(atom.atomic_num).is_none_or(|s| {
        element::aromatic_atomic_num(&s.to_ascii_lowercase()).is_none()
    }) {
        return false;
    }

    let bond_sum = graph.neighbors[node]
        .iter()
        .fold(0u8, |sum, &(_, order)| sum.saturating_add(reader_contribution(order)));
    atom.hydrogens == implicit_h_for_bare_atom(atom.atomic_num, atom.is_aromatic, bond_sum)
}

fn write_bracket_atom(atom: &CanonAtom, symbol: Option<&str>, out: &mut String) {
    out.push('[');

    if atom.isotope != 0 {
        out.push_str(&atom.isotope.to_string());
    }

    match symbol {
        Some(symbol) => push_symbol(symbol, atom.is_aromatic, out),
        None => out.push('*'),
    }

    if atom.hydrogens > 0 {
        out.push('H');
        if atom.hydrogens > 1 {
            out.push_str(&atom.hydrogens.to_string());
        }
    }

    if atom.formal_charge > 0 {
        out.push('+');
        if atom.formal_charge > 1 {
            out.push_str(&atom.formal_charge.to_string());
        }
    } else if atom.formal_charge < 0 {
        out.push('-');
        if atom.formal_charge < -1 {
            out.push_str(&atom.formal_charge.unsigned_abs().to_string());
        }
    }

    out.push(']');
}
