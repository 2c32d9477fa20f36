use std::collections::VecDeque;

use petgraph::algo::connected_components;
use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;

/// Ring membership perceived from the shortest cycle through every bond.
#[derive(Debug, Clone)]
pub(crate) struct RingInfo {
    bond_ring_size: Vec<Option<usize>>,
    atom_min_ring: Vec<Option<usize>>,
    atom_ring_bonds: Vec<usize>,
}

impl RingInfo {
    pub fn perceive<N, E>(graph: &UnGraph<N, E>) -> Self {
        let n = graph.node_count();
        let mut info = Self {
            bond_ring_size: vec![None; graph.edge_count()],
            atom_min_ring: vec![None; n],
            atom_ring_bonds: vec![0; n],
        };
        if expected_ring_count(graph) == 0 {
            return info;
        }

        for edge in graph.edge_references() {
            let (a, b) = (edge.source(), edge.target());
            let Some(path) = shortest_path_avoiding(graph, a, b, edge.id()) else {
                continue;
            };
            let size = path + 1;
            info.bond_ring_size[edge.id().index()] = Some(size);
            for atom in [a.index(), b.index()] {
                info.atom_ring_bonds[atom] += 1;
                let current = &mut info.atom_min_ring[atom];
                *current = Some(current.map_or(size, |s| s.min(size)));
            }
        }

        info
    }

    pub fn is_ring_bond(&self, bond: usize) -> bool {
        self.bond_ring_size[bond].is_some()
    }

    /// Smallest ring containing the atom, if any.
    pub fn smallest_ring_size(&self, atom: usize) -> Option<usize> {
        self.atom_min_ring[atom]
    }

    pub fn ring_bond_count(&self, atom: usize) -> usize {
        self.atom_ring_bonds[atom]
    }
}

/// Cyclomatic number `E - V + C`.
fn expected_ring_count<N, E>(graph: &UnGraph<N, E>) -> usize {
    let v = graph.node_count();
    let e = graph.edge_count();
    let c = connected_components(graph);
    (e + c).saturating_sub(v)
}

/// Number of bonds on the shortest path from `from` to `to` that does not use
/// `skip`.
fn shortest_path_avoiding<N, E>(
    graph: &UnGraph<N, E>,
    from: NodeIndex,
    to: NodeIndex,
    skip: EdgeIndex,
) -> Option<usize> {
    let mut dist: Vec<Option<usize>> = vec![None; graph.node_count()];
    let mut queue = VecDeque::new();
    dist[from.index()] = Some(0);
    queue.push_back(from);

    while let Some(node) = queue.pop_front() {
        let d = dist[node.index()]?;
        for edge in graph.edges(node) {
            if edge.id() == skip {
                continue;
            }
            let next = if edge.source() == node {
                edge.target()
            } else {
                edge.source()
            };
            if dist[next.index()].is_some() {
                continue;
            }
            if next == to {
                return Some(d + 1);
            }
            dist[next.index()] = Some(d + 1);
            queue.push_back(next);
        }
    }

    None
}
