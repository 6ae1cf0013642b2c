//! Bounded breadth-first frontier construction
//!
//! The coordinator expands the tree level by level from the root until one
//! more expansion would leave more nodes queued than there are workers. Complete
//! colorings met on the way improve the upper bound immediately and are not
//! queued. If the queue runs dry the whole tree was small enough to solve here
//! and no worker is needed.

use super::{SearchContext, SearchNode};
use std::collections::VecDeque;

/// Result of frontier construction
#[derive(Debug, Clone)]
pub struct Frontier {
    /// Subtree roots to dispatch, at most `max_nodes` of them
    pub nodes: VecDeque<SearchNode>,
    /// Best complete coloring met during expansion
    pub best: Option<SearchNode>,
    /// Nodes expanded into children
    pub expanded: u64,
}

impl Frontier {
    /// True iff the tree was exhausted without needing any worker
    pub fn is_exhausted(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Expand from the root, keeping at most `max_nodes` queued nodes
pub fn build_frontier(ctx: &SearchContext, max_nodes: usize) -> Frontier {
    let bounds = ctx.bounds();
    let mut queue = VecDeque::from([SearchNode::root(ctx.graph().n())]);
    let mut best = None;
    let mut expanded = 0;

    while let Some(node) = queue.pop_front() {
        if node.is_final() {
            if bounds.improve_upper(node.tot_colors()) {
                tracing::debug!(colors = node.tot_colors(), "frontier found a complete coloring");
                best = Some(node);
            }
            continue;
        }
        if node.tot_colors() >= bounds.upper() {
            continue;
        }

        let children = ctx.children(&node);
        if queue.len() + children.len() > max_nodes {
            queue.push_front(node);
            break;
        }
        expanded += 1;
        queue.extend(children);
    }

    Frontier {
        nodes: queue,
        best,
        expanded,
    }
}
