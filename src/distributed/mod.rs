//! Process group and role implementation
//!
//! # Architecture
//!
//! A run is carried out by a group of P >= 2 ranks:
//!
//! - **Coordinator** (rank 0): distributes the graph, builds the frontier,
//!   dispatches subtrees, aggregates solutions, relays bounds, enforces the
//!   time budget
//! - **Workers** (ranks 1..P-1): depth-first search over one subtree each
//!
//! Ranks only ever exchange encoded [`Message`] frames. The same roles run
//! inside one process (`local_group`, one tokio task per rank) or across
//! machines (`tcp`).
//!
//! # Modules
//!
//! - `protocol`: message definitions and framing
//! - `transport`: channel links between ranks, in-process group
//! - `tcp`: socket handshake and frame pumps
//! - `coordinator`: rank 0
//! - `worker`: ranks 1..P-1

pub mod coordinator;
pub mod protocol;
pub mod tcp;
pub mod transport;
pub mod worker;

pub use coordinator::{Coordinator, RunOutcome, RunSettings};
pub use protocol::{ErrorMessage, Message, PackedNode, Rank, PROTOCOL_VERSION};
pub use transport::{local_group, CoordinatorLink, WorkerLink};
pub use worker::{Worker, WorkerSummary};

use crate::graph::Graph;
use anyhow::{Context, Result};
use std::sync::Arc;

/// Run a whole group of `group_size` ranks inside this process
pub async fn run_local_group(
    graph: Arc<Graph>,
    instance: &str,
    group_size: usize,
    settings: RunSettings,
) -> Result<RunOutcome> {
    let (coordinator_link, worker_links) = local_group(group_size)?;

    let workers: Vec<_> = worker_links
        .into_iter()
        .map(|link| tokio::spawn(Worker::new(link, settings.search).run()))
        .collect();

    let outcome = Coordinator::new(coordinator_link, graph, instance, settings).run().await;

    let mut worker_error = None;
    for handle in workers {
        match handle.await.context("Worker task panicked")? {
            Ok(summary) => tracing::debug!(?summary, "worker finished"),
            Err(e) => {
                worker_error.get_or_insert(e);
            }
        }
    }

    let outcome = outcome?;
    if let Some(e) = worker_error {
        return Err(e.context("Worker failed"));
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clique::CliqueSettings;
    use crate::graph::tests::{complete, cycle};
    use crate::search::SearchSettings;
    use std::time::Duration;

    fn settings(time_limit: Duration) -> RunSettings {
        RunSettings {
            time_limit,
            search: SearchSettings::default(),
            clique: CliqueSettings::default(),
        }
    }

    async fn solve(graph: Graph, group_size: usize) -> RunOutcome {
        let graph = Arc::new(graph);
        run_local_group(graph, "test", group_size, settings(Duration::from_secs(600)))
            .await
            .unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_cycle_of_four() {
        let g = cycle(4);
        let outcome = solve(g.clone(), 3).await;
        assert_eq!(outcome.colors_used(), 2);
        assert!(outcome.within_time_limit);
        assert!(g.is_proper_coloring(outcome.coloring.colors()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_complete_graph_solved_without_dispatch() {
        let outcome = solve(complete(4), 3).await;
        assert_eq!(outcome.colors_used(), 4);
        assert_eq!(outcome.lower_bound.size, 4);
        assert!(outcome.lower_bound.exhaustive);
        assert!(outcome.solved_during_frontier);
        assert_eq!(outcome.dispatched, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_empty_graph_needs_one_color() {
        let outcome = solve(Graph::empty(5), 4).await;
        assert_eq!(outcome.colors_used(), 1);
        assert_eq!(outcome.coloring.colors(), &[1, 1, 1, 1, 1]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_same_color_count_for_every_group_size() {
        let g = crate::graph::random::random_graph(22, 0.45, 17).unwrap();
        let mut counts = Vec::new();
        for group_size in [2, 3, 5, 8] {
            let outcome = solve(g.clone(), group_size).await;
            assert!(g.is_proper_coloring(outcome.coloring.colors()));
            assert!(outcome.lower_bound.size as u32 <= outcome.colors_used());
            counts.push(outcome.colors_used());
        }
        assert!(counts.windows(2).all(|w| w[0] == w[1]), "{:?}", counts);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_zero_budget_stops_early_with_proper_coloring() {
        let g = Arc::new(crate::graph::random::random_graph(250, 0.5, 1).unwrap());
        let outcome = run_local_group(g.clone(), "random", 4, settings(Duration::ZERO))
            .await
            .unwrap();
        assert!(!outcome.within_time_limit);
        assert!(!outcome.solved_during_frontier);
        assert!(g.is_proper_coloring(outcome.coloring.colors()));
        assert!(outcome.colors_used() as usize <= g.n());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_worker_error_aborts_run() {
        let (coordinator_link, mut worker_links) = local_group(2).unwrap();
        let link = worker_links.remove(0);
        let rogue = tokio::spawn(async move {
            let sender = link.sender();
            sender
                .send(&Message::Error(ErrorMessage {
                    rank: 1,
                    error: "disk on fire".to_string(),
                }))
                .unwrap();
            // Keep the link open until the coordinator gives up.
            let mut link = link;
            while link.recv().await.is_ok() {}
        });

        let graph = Arc::new(crate::graph::random::random_graph(30, 0.5, 4).unwrap());
        let err = Coordinator::new(coordinator_link, graph, "rogue", settings(Duration::from_secs(600)))
            .run()
            .await
            .unwrap_err();
        assert!(err.to_string().contains("disk on fire"));
        rogue.await.unwrap();
    }
}
