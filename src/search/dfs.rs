//! Explicit-stack depth-first branch and bound
//!
//! Children are pushed in descending color order so the smallest color is
//! popped first. The loop checks, once per iteration and in this order:
//! bounds met (proven optimal), time-limit flag raised, stack empty.

use super::{SearchContext, SearchNode};

/// Why the search loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The stack ran empty: the subtree is fully explored
    Exhausted,
    /// Lower and upper bound met
    ProvenOptimal,
    /// The time-limit flag was raised
    TimeLimit,
}

/// Outcome of one depth-first search
#[derive(Debug, Clone)]
pub struct DfsOutcome {
    pub stop: StopReason,
    /// Last improving complete coloring found by this search
    pub local_best: Option<SearchNode>,
    /// Nodes expanded into children
    pub expanded: u64,
    /// Number of improvements reported
    pub improvements: u64,
}

/// Search the subtree rooted at `root`, calling `report` for every complete
/// coloring that strictly improves the context's upper bound.
pub fn depth_first<F>(ctx: &SearchContext, root: SearchNode, mut report: F) -> DfsOutcome
where
    F: FnMut(&SearchNode),
{
    let bounds = ctx.bounds();
    let mut stack = vec![root];
    let mut local_best = None;
    let mut expanded = 0;
    let mut improvements = 0;

    let stop = loop {
        if bounds.proven_optimal() {
            break StopReason::ProvenOptimal;
        }
        if ctx.time_limit_reached() {
            break StopReason::TimeLimit;
        }
        let Some(node) = stack.pop() else {
            break StopReason::Exhausted;
        };

        if node.is_final() {
            if bounds.improve_upper(node.tot_colors()) {
                improvements += 1;
                report(&node);
                local_best = Some(node);
            }
            continue;
        }
        if node.tot_colors() >= bounds.upper() {
            continue;
        }

        expanded += 1;
        stack.extend(ctx.children(&node).into_iter().rev());
    };

    DfsOutcome {
        stop,
        local_best,
        expanded,
        improvements,
    }
}
