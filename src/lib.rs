//! chromabound - exact distributed graph coloring
//!
//! chromabound finds a minimum vertex coloring with a branch-and-bound search
//! spread over a group of cooperating processes. The coordinator splits the
//! search tree into one subtree per worker, workers search depth-first and
//! share every improved upper bound, and a parallel maximum-clique search
//! supplies the lower bound that lets the search stop as soon as it is met.
//!
//! # Architecture
//!
//! - **Graph**: immutable adjacency matrix plus neighbor lists (DIMACS or random)
//! - **Search**: partial colorings, saturation-degree branching, BFS frontier, DFS
//! - **Clique**: parallel Bron–Kerbosch lower bound
//! - **Distributed mode**: coordinator/worker roles over channels or TCP
//! - **Output**: console summary, text and JSON result records

pub mod clique;
pub mod config;
pub mod distributed;
pub mod graph;
pub mod output;
pub mod search;

// Re-export commonly used types
pub use config::SolverConfig;
pub use graph::Graph;
pub use search::SearchNode;

/// Result type used throughout chromabound
pub type Result<T> = anyhow::Result<T>;
