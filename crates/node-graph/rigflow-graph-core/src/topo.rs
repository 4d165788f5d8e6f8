use hashbrown::{HashMap, HashSet};
use log::warn;
use std::collections::VecDeque;

use crate::types::Vertex;

/// Kahn's algorithm over `vertices`, considering only edges whose both ends
/// are in the set. Ties are broken by vertex order, so the result is stable
/// for a given graph.
///
/// Vertices caught in a cycle are left out of the result.
pub fn topo_order<F>(vertices: &[Vertex], upstream: F) -> Vec<Vertex>
where
    F: Fn(Vertex) -> Vec<Vertex>,
{
    let mut sorted = vertices.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    let members: HashSet<Vertex> = sorted.iter().copied().collect();

    let mut indeg: HashMap<Vertex, usize> = HashMap::new();
    let mut adj: HashMap<Vertex, Vec<Vertex>> = HashMap::new();
    for &v in &sorted {
        indeg.entry(v).or_insert(0);
        for u in upstream(v) {
            if u != v && members.contains(&u) {
                adj.entry(u).or_default().push(v);
                *indeg.entry(v).or_default() += 1;
            }
        }
    }

    let mut q: VecDeque<Vertex> = sorted
        .iter()
        .copied()
        .filter(|v| indeg.get(v).copied() == Some(0))
        .collect();

    let mut order = Vec::with_capacity(sorted.len());
    while let Some(u) = q.pop_front() {
        order.push(u);
        if let Some(vs) = adj.get(&u) {
            for v in vs {
                if let Some(d) = indeg.get_mut(v) {
                    *d -= 1;
                    if *d == 0 {
                        q.push_back(*v);
                    }
                }
            }
        }
    }

    if order.len() != sorted.len() {
        warn!(
            "cycle among {} dirty vertices; they were not scheduled",
            sorted.len() - order.len()
        );
    }
    order
}
