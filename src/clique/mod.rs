//! Maximum clique lower bound
//!
//! Any clique of size k forces k colors, so the coordinator runs this engine
//! next to the distributed search and publishes the result as the global
//! lower bound. The engine is a pivoting Bron–Kerbosch enumeration whose
//! top `task_depth` recursion levels fork onto the rayon pool. A greedy
//! clique optionally seeds the best size so pruning starts tight.
//!
//! The search can be cancelled through an `AtomicBool`. A cancelled run
//! still returns the largest clique seen so far, which is a valid (but not
//! necessarily tight) lower bound.

pub mod greedy;

use crate::graph::{Graph, VertexId};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Tunables for the clique engine
#[derive(Debug, Clone, Copy)]
pub struct CliqueSettings {
    /// Recursion depth below which branches are forked onto the rayon pool
    pub task_depth: usize,
    /// Seed the best size with a greedy clique before enumerating
    pub greedy_seed: bool,
}

impl Default for CliqueSettings {
    fn default() -> Self {
        Self {
            task_depth: 2,
            greedy_seed: true,
        }
    }
}

/// Size of the largest clique found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CliqueBound {
    pub size: usize,
    /// True iff the enumeration ran to completion (the size is the clique number)
    pub exhaustive: bool,
}

struct Enumeration<'a> {
    graph: &'a Graph,
    best: AtomicUsize,
    task_depth: usize,
    cancel: &'a AtomicBool,
    interrupted: AtomicBool,
}

impl Enumeration<'_> {
    fn cancelled(&self) -> bool {
        if self.cancel.load(Ordering::Relaxed) {
            self.interrupted.store(true, Ordering::Relaxed);
            return true;
        }
        false
    }

    /// Vertex of `p ∪ x` with the most neighbors in `p`
    fn pivot(&self, p: &[VertexId], x: &[VertexId]) -> Option<VertexId> {
        p.iter()
            .chain(x)
            .copied()
            .max_by_key(|&u| p.iter().filter(|&&v| self.graph.adj(u, v)).count())
    }

    fn expand(&self, clique_len: usize, p: Vec<VertexId>, x: Vec<VertexId>, depth: usize) {
        if self.cancelled() {
            return;
        }
        if p.is_empty() {
            if x.is_empty() {
                self.best.fetch_max(clique_len, Ordering::AcqRel);
            }
            return;
        }
        if clique_len + p.len() <= self.best.load(Ordering::Acquire) {
            return;
        }

        let Some(u) = self.pivot(&p, &x) else {
            return;
        };
        let candidates: Vec<VertexId> = p.iter().copied().filter(|&v| !self.graph.adj(u, v)).collect();

        // Each branch sees P minus the earlier candidates and X plus them.
        let mut p = p;
        let mut x = x;
        let mut branches = Vec::with_capacity(candidates.len());
        for v in candidates {
            let new_p: Vec<VertexId> = p.iter().copied().filter(|&w| self.graph.adj(v, w)).collect();
            let new_x: Vec<VertexId> = x.iter().copied().filter(|&w| self.graph.adj(v, w)).collect();
            branches.push((new_p, new_x));
            p.retain(|&w| w != v);
            x.push(v);
        }

        if depth < self.task_depth {
            rayon::scope(|s| {
                for (new_p, new_x) in branches {
                    s.spawn(move |_| self.expand(clique_len + 1, new_p, new_x, depth + 1));
                }
            });
        } else {
            for (new_p, new_x) in branches {
                self.expand(clique_len + 1, new_p, new_x, depth + 1);
            }
        }
    }
}

/// Find the size of a maximum clique of `graph`.
///
/// Stops early when `cancel` is raised; the returned bound then has
/// `exhaustive == false`.
pub fn max_clique(graph: &Graph, settings: CliqueSettings, cancel: &AtomicBool) -> CliqueBound {
    let seed = if settings.greedy_seed {
        greedy::greedy_clique(graph).len()
    } else {
        0
    };
    tracing::debug!(seed, "starting clique enumeration");

    let enumeration = Enumeration {
        graph,
        best: AtomicUsize::new(seed),
        task_depth: settings.task_depth,
        cancel,
        interrupted: AtomicBool::new(false),
    };
    enumeration.expand(0, (0..graph.n()).collect(), Vec::new(), 0);

    CliqueBound {
        size: enumeration.best.load(Ordering::Acquire),
        exhaustive: !enumeration.interrupted.load(Ordering::Acquire),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::tests::{complete, cycle};

    fn exact(graph: &Graph, settings: CliqueSettings) -> usize {
        let bound = max_clique(graph, settings, &AtomicBool::new(false));
        assert!(bound.exhaustive);
        bound.size
    }

    #[test]
    fn test_known_clique_numbers() {
        let settings = CliqueSettings::default();
        assert_eq!(exact(&complete(4), settings), 4);
        assert_eq!(exact(&cycle(4), settings), 2);
        assert_eq!(exact(&cycle(3), settings), 3);
        assert_eq!(exact(&Graph::empty(5), settings), 1);
        assert_eq!(exact(&Graph::empty(0), settings), 0);
    }

    #[test]
    fn test_embedded_clique() {
        // K4 on {2,4,6,8} plus a path through the rest
        let mut edges = vec![(2, 4), (2, 6), (2, 8), (4, 6), (4, 8), (6, 8)];
        edges.extend([(0, 1), (1, 3), (3, 5), (5, 7), (7, 9)]);
        let g = Graph::from_edges(10, edges).unwrap();
        assert_eq!(exact(&g, CliqueSettings::default()), 4);
    }

    #[test]
    fn test_settings_do_not_change_result() {
        let g = crate::graph::random::random_graph(40, 0.5, 21).unwrap();
        let reference = exact(&g, CliqueSettings { task_depth: 0, greedy_seed: false });
        for task_depth in [0, 1, 2, 4] {
            for greedy_seed in [false, true] {
                assert_eq!(exact(&g, CliqueSettings { task_depth, greedy_seed }), reference);
            }
        }
    }

    #[test]
    fn test_cancelled_search_is_not_exhaustive() {
        let g = crate::graph::random::random_graph(30, 0.5, 2).unwrap();
        let cancel = AtomicBool::new(true);
        let bound = max_clique(&g, CliqueSettings::default(), &cancel);
        assert!(!bound.exhaustive);
        // The greedy seed still stands as a valid bound.
        assert_eq!(bound.size, greedy::greedy_clique(&g).len());
    }
}
