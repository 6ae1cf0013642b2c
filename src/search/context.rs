//! Per-run search context
//!
//! Each rank owns exactly one [`SearchContext`] for the duration of a run.
//! The search loop and the broadcast listener both write the bounds, so they
//! live behind atomics. Bounds only move one way (`upper` down, `lower` up),
//! so a stale read costs a missed pruning opportunity and nothing else.

use super::{Color, SearchNode};
use crate::graph::Graph;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

/// Global color bounds as seen by one rank
#[derive(Debug)]
pub struct SharedBounds {
    /// Fewest colors known to suffice (non-increasing)
    upper: AtomicU32,
    /// Largest clique known (non-decreasing)
    lower: AtomicU32,
}

impl SharedBounds {
    /// Bounds for a graph with `n` vertices: upper `n + 1`, lower `0`
    pub fn new(n: usize) -> Self {
        Self {
            upper: AtomicU32::new(n as u32 + 1),
            lower: AtomicU32::new(0),
        }
    }

    #[inline]
    pub fn upper(&self) -> Color {
        self.upper.load(Ordering::Acquire)
    }

    #[inline]
    pub fn lower(&self) -> Color {
        self.lower.load(Ordering::Acquire)
    }

    /// Lower the upper bound to `value`. Returns true iff it strictly improved.
    pub fn improve_upper(&self, value: Color) -> bool {
        self.upper.fetch_min(value, Ordering::AcqRel) > value
    }

    /// Raise the lower bound to `value`. Returns true iff it strictly improved.
    pub fn raise_lower(&self, value: Color) -> bool {
        self.lower.fetch_max(value, Ordering::AcqRel) < value
    }

    /// True once the bounds meet: no coloring with fewer colors exists
    #[inline]
    pub fn proven_optimal(&self) -> bool {
        self.lower() == self.upper()
    }
}

/// Tunables for node expansion
#[derive(Debug, Clone, Copy)]
pub struct SearchSettings {
    /// Vertex count from which the saturation scan runs on the rayon pool
    pub parallel_saturation_threshold: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            parallel_saturation_threshold: 512,
        }
    }
}

/// Graph, bounds and cancellation flag shared by one rank's tasks
#[derive(Debug, Clone)]
pub struct SearchContext {
    graph: Arc<Graph>,
    bounds: Arc<SharedBounds>,
    time_limit: Arc<AtomicBool>,
    settings: SearchSettings,
}

impl SearchContext {
    pub fn new(graph: Arc<Graph>, settings: SearchSettings) -> Self {
        let bounds = Arc::new(SharedBounds::new(graph.n()));
        Self {
            graph,
            bounds,
            time_limit: Arc::new(AtomicBool::new(false)),
            settings,
        }
    }

    #[inline]
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn shared_graph(&self) -> Arc<Graph> {
        self.graph.clone()
    }

    #[inline]
    pub fn bounds(&self) -> &SharedBounds {
        &self.bounds
    }

    /// Raise the time-limit flag (set by the listener on `TimeLimit`)
    pub fn signal_time_limit(&self) {
        self.time_limit.store(true, Ordering::Release);
    }

    #[inline]
    pub fn time_limit_reached(&self) -> bool {
        self.time_limit.load(Ordering::Acquire)
    }

    /// Children of `node` against the current upper bound
    pub fn children(&self, node: &SearchNode) -> Vec<SearchNode> {
        node.children(
            &self.graph,
            self.bounds.upper(),
            self.settings.parallel_saturation_threshold,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_bounds() {
        let bounds = SharedBounds::new(7);
        assert_eq!(bounds.upper(), 8);
        assert_eq!(bounds.lower(), 0);
        assert!(!bounds.proven_optimal());
    }

    #[test]
    fn test_upper_bound_is_monotone() {
        let bounds = SharedBounds::new(10);
        assert!(bounds.improve_upper(6));
        assert!(!bounds.improve_upper(6));
        assert!(!bounds.improve_upper(9));
        assert_eq!(bounds.upper(), 6);
        assert!(bounds.improve_upper(4));
        assert_eq!(bounds.upper(), 4);
    }

    #[test]
    fn test_lower_bound_is_monotone() {
        let bounds = SharedBounds::new(10);
        assert!(bounds.raise_lower(3));
        assert!(!bounds.raise_lower(2));
        assert_eq!(bounds.lower(), 3);
    }

    #[test]
    fn test_proven_optimal_when_bounds_meet() {
        let bounds = SharedBounds::new(5);
        bounds.raise_lower(3);
        bounds.improve_upper(3);
        assert!(bounds.proven_optimal());
    }

    #[test]
    fn test_time_limit_flag_is_shared_between_clones() {
        let ctx = SearchContext::new(Arc::new(Graph::empty(3)), SearchSettings::default());
        let listener_view = ctx.clone();
        assert!(!ctx.time_limit_reached());
        listener_view.signal_time_limit();
        assert!(ctx.time_limit_reached());
    }

    #[test]
    fn test_concurrent_upper_bound_updates() {
        let bounds = Arc::new(SharedBounds::new(100));
        let handles: Vec<_> = (1..=8u32)
            .map(|i| {
                let bounds = bounds.clone();
                std::thread::spawn(move || {
                    for v in (i * 5..=100).rev() {
                        bounds.improve_upper(v);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(bounds.upper(), 5);
    }
}
