//! Greedy clique construction
//!
//! From every start vertex, neighbors are added in descending degree order
//! whenever they are adjacent to the whole clique built so far. The largest
//! of these cliques is returned. Start vertices are processed in parallel.

use crate::graph::{Graph, VertexId};
use rayon::prelude::*;
use std::cmp::Reverse;

fn grow_from(graph: &Graph, start: VertexId, by_degree: &[VertexId]) -> Vec<VertexId> {
    let mut clique = vec![start];
    for &v in by_degree {
        if v != start && clique.iter().all(|&u| graph.adj(u, v)) {
            clique.push(v);
        }
    }
    clique
}

/// Largest greedily built clique. Empty only for a graph with no vertices.
pub fn greedy_clique(graph: &Graph) -> Vec<VertexId> {
    let mut by_degree: Vec<VertexId> = (0..graph.n()).collect();
    by_degree.sort_by_key(|&v| (Reverse(graph.degree(v)), v));

    by_degree
        .par_iter()
        .map(|&start| grow_from(graph, start, &by_degree))
        .max_by_key(|clique| clique.len())
        .unwrap_or_default()
}
