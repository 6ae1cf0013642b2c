//! Branch-and-bound search over partial colorings
//!
//! A [`SearchNode`] is a partial coloring: one slot per vertex, `0` meaning
//! uncolored. Children are produced by picking the uncolored vertex with the
//! highest saturation degree and trying every color `1..=tot_colors + 1` on
//! it, keeping only proper colorings that do not exceed the current upper
//! bound.
//!
//! # Modules
//!
//! - `context`: per-run shared bounds and cancellation flag
//! - `frontier`: bounded breadth-first expansion used by the coordinator
//! - `dfs`: explicit-stack depth-first search used by workers

pub mod context;
pub mod dfs;
pub mod frontier;

pub use context::{SearchContext, SearchSettings, SharedBounds};
pub use dfs::{depth_first, DfsOutcome, StopReason};
pub use frontier::{build_frontier, Frontier};

use crate::graph::{Graph, VertexId};
use rayon::prelude::*;
use std::cmp::Reverse;
use thiserror::Error;

/// Color index. `0` is "uncolored", real colors start at `1`.
pub type Color = u32;

/// Errors raised when rebuilding a node from its packed form
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NodeError {
    #[error("packed node has {actual} words, expected {expected}")]
    WrongLength { expected: usize, actual: usize },

    #[error("tot_colors {tot_colors} exceeds the {vertices} vertices of the graph")]
    TooManyColors { tot_colors: Color, vertices: usize },

    #[error("vertex {vertex} has color {color} above tot_colors {tot_colors}")]
    ColorOutOfRange { vertex: usize, color: Color, tot_colors: Color },

    #[error("next is {next} but {colored} vertices are colored")]
    DepthMismatch { next: usize, colored: usize },
}

/// Partial coloring (branch-and-bound tree node)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchNode {
    /// color[v]: color of vertex v, 0 if uncolored
    color: Vec<Color>,
    /// Number of distinct colors committed so far
    tot_colors: Color,
    /// Number of colored vertices (search depth)
    next: usize,
}

impl SearchNode {
    /// Empty root node for a graph with `n` vertices
    pub fn root(n: usize) -> Self {
        Self {
            color: vec![0; n],
            tot_colors: 0,
            next: 0,
        }
    }

    #[inline]
    pub fn colors(&self) -> &[Color] {
        &self.color
    }

    #[inline]
    pub fn tot_colors(&self) -> Color {
        self.tot_colors
    }

    #[inline]
    pub fn next(&self) -> usize {
        self.next
    }

    /// True iff every vertex is colored
    #[inline]
    pub fn is_final(&self) -> bool {
        self.next == self.color.len()
    }

    /// True iff no neighbor of `v` shares its color
    pub fn is_valid_for(&self, graph: &Graph, v: VertexId) -> bool {
        self.fits(graph, v, self.color[v])
    }

    /// True iff giving `v` color `c` would not clash with a colored neighbor
    #[inline]
    fn fits(&self, graph: &Graph, v: VertexId, c: Color) -> bool {
        graph.neighbors(v).iter().all(|&u| self.color[u] != c)
    }

    /// Number of distinct colors among the colored neighbors of `v`.
    ///
    /// `seen` must hold `tot_colors + 1` cleared slots; it is cleared again
    /// before returning.
    fn saturation(&self, graph: &Graph, v: VertexId, seen: &mut [bool]) -> usize {
        let mut distinct = 0;
        for &u in graph.neighbors(v) {
            let c = self.color[u] as usize;
            if c != 0 && !seen[c] {
                seen[c] = true;
                distinct += 1;
            }
        }
        for &u in graph.neighbors(v) {
            seen[self.color[u] as usize] = false;
        }
        distinct
    }

    /// Saturation-degree choice: the uncolored vertex with the most distinct
    /// neighbor colors, lowest index on ties. `None` for a final node.
    ///
    /// The candidate scan is split over the rayon pool once the graph has at
    /// least `parallel_threshold` vertices.
    pub fn vertex_to_color_next(&self, graph: &Graph, parallel_threshold: usize) -> Option<VertexId> {
        if self.is_final() {
            return None;
        }
        let slots = self.tot_colors as usize + 1;

        if self.color.len() >= parallel_threshold {
            return (0..self.color.len())
                .into_par_iter()
                .filter(|&v| self.color[v] == 0)
                .map_init(
                    || vec![false; slots],
                    |seen, v| (self.saturation(graph, v, seen), Reverse(v)),
                )
                .max()
                .map(|(_, Reverse(v))| v);
        }

        let mut seen = vec![false; slots];
        let mut best: Option<(usize, VertexId)> = None;
        for v in (0..self.color.len()).filter(|&v| self.color[v] == 0) {
            let sat = self.saturation(graph, v, &mut seen);
            if best.map_or(true, |(best_sat, _)| sat > best_sat) {
                best = Some((sat, v));
            }
        }
        best.map(|(_, v)| v)
    }

    /// Child obtained by giving vertex `v` color `c`
    fn child(&self, v: VertexId, c: Color) -> SearchNode {
        let mut color = self.color.clone();
        color[v] = c;
        SearchNode {
            color,
            tot_colors: self.tot_colors.max(c),
            next: self.next + 1,
        }
    }

    /// Children of a non-final node, in ascending trial-color order.
    ///
    /// A child is kept only if it is a proper coloring and uses at most
    /// `upper_bound` colors. The bound is read by the caller at generation
    /// time, so this is advisory pruning only.
    pub fn children(&self, graph: &Graph, upper_bound: Color, parallel_threshold: usize) -> Vec<SearchNode> {
        debug_assert!(!self.is_final(), "cannot expand a complete coloring");
        let Some(v) = self.vertex_to_color_next(graph, parallel_threshold) else {
            return Vec::new();
        };

        (1..=self.tot_colors + 1)
            .filter(|&c| self.tot_colors.max(c) <= upper_bound && self.fits(graph, v, c))
            .map(|c| self.child(v, c))
            .collect()
    }

    /// Complete this node greedily: saturation order, smallest fitting color.
    /// Used as a fallback when the search was stopped before any complete
    /// coloring was found.
    pub fn greedy_completion(&self, graph: &Graph) -> SearchNode {
        let mut node = self.clone();
        while let Some(v) = node.vertex_to_color_next(graph, usize::MAX) {
            let c = (1..=node.tot_colors)
                .find(|&c| node.fits(graph, v, c))
                .unwrap_or(node.tot_colors + 1);
            node.color[v] = c;
            node.tot_colors = node.tot_colors.max(c);
            node.next += 1;
        }
        node
    }

    /// Wire layout: `n` colors in vertex order, then `tot_colors`, then `next`
    pub fn pack(&self) -> Vec<u32> {
        let mut words = Vec::with_capacity(self.color.len() + 2);
        words.extend_from_slice(&self.color);
        words.push(self.tot_colors);
        words.push(self.next as u32);
        words
    }

    /// Rebuild a node packed by [`SearchNode::pack`] for a graph of `n` vertices
    pub fn unpack(words: &[u32], n: usize) -> Result<Self, NodeError> {
        if words.len() != n + 2 {
            return Err(NodeError::WrongLength { expected: n + 2, actual: words.len() });
        }
        let color = words[..n].to_vec();
        let tot_colors = words[n];
        let next = words[n + 1] as usize;

        if tot_colors as usize > n {
            return Err(NodeError::TooManyColors { tot_colors, vertices: n });
        }
        if let Some(vertex) = color.iter().position(|&c| c > tot_colors) {
            return Err(NodeError::ColorOutOfRange { vertex, color: color[vertex], tot_colors });
        }
        let colored = color.iter().filter(|&&c| c != 0).count();
        if colored != next {
            return Err(NodeError::DepthMismatch { next, colored });
        }

        Ok(Self { color, tot_colors, next })
    }
}
