//! Coordinator role (rank 0)
//!
//! The coordinator owns the run from start to finish:
//!
//! 1. Start the wall-clock timer and distribute the graph
//! 2. Start the clique engine on the blocking pool
//! 3. Build a breadth-first frontier of at most P-1 nodes
//! 4. Dispatch one node per worker, `NoTask` to the rest
//! 5. Aggregate solutions and relay tightened bounds until every worker
//!    has signed off
//! 6. Broadcast `Terminate` and return the outcome

use super::protocol::{Message, PackedNode, Rank, PROTOCOL_VERSION};
use super::transport::{Broadcaster, CoordinatorLink};
use crate::clique::{self, CliqueBound, CliqueSettings};
use crate::graph::Graph;
use crate::search::{build_frontier, SearchContext, SearchNode, SearchSettings};
use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// Run parameters shared by every rank
#[derive(Debug, Clone, Copy)]
pub struct RunSettings {
    pub time_limit: Duration,
    pub search: SearchSettings,
    pub clique: CliqueSettings,
}

/// What the coordinator knows once the run is over
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Best complete coloring (a greedy one if the search found none)
    pub coloring: SearchNode,
    pub lower_bound: CliqueBound,
    pub elapsed: Duration,
    /// False iff some worker stopped on the time limit
    pub within_time_limit: bool,
    /// True iff the frontier exhausted the tree and no worker got a task
    pub solved_during_frontier: bool,
    /// Workers that received a subtree
    pub dispatched: usize,
}

impl RunOutcome {
    pub fn colors_used(&self) -> u32 {
        self.coloring.tot_colors()
    }
}

/// Sleep for `budget`, then tell every worker to stop. Aborted at finalize
/// when the run ends first.
fn spawn_timer(budget: Duration, broadcaster: Broadcaster) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(budget).await;
        tracing::info!("time limit of {:?} reached", budget);
        if let Err(e) = broadcaster.broadcast(&Message::TimeLimit) {
            tracing::warn!("failed to broadcast time limit: {:#}", e);
        }
    })
}

/// Rank 0 of a process group
pub struct Coordinator {
    link: CoordinatorLink,
    ctx: SearchContext,
    instance: String,
    settings: RunSettings,
    best: Option<SearchNode>,
}

impl Coordinator {
    pub fn new(link: CoordinatorLink, graph: Arc<Graph>, instance: impl Into<String>, settings: RunSettings) -> Self {
        Self {
            link,
            ctx: SearchContext::new(graph, settings.search),
            instance: instance.into(),
            settings,
            best: None,
        }
    }

    /// Drive the whole run
    pub async fn run(mut self) -> Result<RunOutcome> {
        let start = Instant::now();
        let timer = spawn_timer(self.settings.time_limit, self.link.broadcaster().clone());
        let cancel = Arc::new(AtomicBool::new(false));

        let result = self.solve(start, &cancel).await;

        cancel.store(true, Ordering::Release);
        timer.abort();
        let _ = timer.await;
        if result.is_ok() {
            if let Err(e) = self.link.broadcaster().broadcast(&Message::Terminate) {
                tracing::warn!("failed to broadcast terminate: {:#}", e);
            }
        }
        self.link.close().await;
        result
    }

    async fn solve(&mut self, start: Instant, cancel: &Arc<AtomicBool>) -> Result<RunOutcome> {
        let workers = self.link.worker_count();

        self.distribute_graph()?;

        let mut clique_task = {
            let graph = self.ctx.shared_graph();
            let cancel = cancel.clone();
            let settings = self.settings.clique;
            tokio::task::spawn_blocking(move || clique::max_clique(&graph, settings, &cancel))
        };

        // BUILDING_FRONTIER
        let frontier = {
            let ctx = self.ctx.clone();
            tokio::task::spawn_blocking(move || build_frontier(&ctx, workers))
                .await
                .context("Frontier construction panicked")?
        };
        tracing::info!(
            nodes = frontier.nodes.len(),
            expanded = frontier.expanded,
            upper = self.ctx.bounds().upper(),
            "frontier built"
        );
        let frontier_improved = frontier.best.is_some();
        self.best = frontier.best.clone();

        if frontier.is_exhausted() {
            tracing::info!("tree exhausted while building the frontier, no dispatch");
            let lower_bound = clique_task.await.context("Clique engine panicked")?;
            self.ctx.bounds().raise_lower(lower_bound.size as u32);
            return Ok(self.finish(start, lower_bound, false, true, 0));
        }

        // DISPATCHING
        let broadcaster = self.link.broadcaster().clone();
        if frontier_improved {
            broadcaster.broadcast(&Message::NewUpperBound(self.ctx.bounds().upper()))?;
        }
        let dispatched = frontier.nodes.len();
        for (idx, node) in frontier.nodes.iter().enumerate() {
            broadcaster.send(idx + 1, &Message::InitialNode(PackedNode::from(node)))?;
        }
        let empty = PackedNode::from(&SearchNode::root(self.ctx.graph().n()));
        for rank in (dispatched + 1)..=workers {
            broadcaster.send(rank, &Message::NoTask(empty.clone()))?;
        }
        tracing::info!(dispatched, idle = workers - dispatched, "subtrees dispatched");

        // AGGREGATING
        let mut signed_off = 0;
        let mut time_limited = false;
        let mut lower_bound: Option<CliqueBound> = None;
        while signed_off < workers {
            tokio::select! {
                received = self.link.recv() => {
                    let (rank, msg) = received?;
                    match msg {
                        Message::SolutionFromWorker(packed) => self.accept_solution(rank, &packed)?,
                        Message::Return => signed_off += 1,
                        Message::ReturnTimeLimit => {
                            signed_off += 1;
                            time_limited = true;
                        }
                        Message::Error(err) => {
                            anyhow::bail!("Worker {} reported error: {}", err.rank, err.error);
                        }
                        other => tracing::warn!(rank, kind = other.kind(), "unexpected message ignored"),
                    }
                }
                joined = &mut clique_task, if lower_bound.is_none() => {
                    let bound = joined.context("Clique engine panicked")?;
                    tracing::info!(size = bound.size, "clique lower bound ready");
                    self.ctx.bounds().raise_lower(bound.size as u32);
                    broadcaster.broadcast(&Message::NewLowerBound(bound.size as u32))?;
                    lower_bound = Some(bound);
                }
            }
        }

        // FINALIZING
        let lower_bound = match lower_bound {
            Some(bound) => bound,
            None => {
                cancel.store(true, Ordering::Release);
                let bound = clique_task.await.context("Clique engine panicked")?;
                self.ctx.bounds().raise_lower(bound.size as u32);
                bound
            }
        };

        Ok(self.finish(start, lower_bound, time_limited, false, dispatched))
    }

    fn distribute_graph(&self) -> Result<()> {
        let graph = self.ctx.graph();
        let broadcaster = self.link.broadcaster();
        broadcaster.broadcast(&Message::GraphHeader {
            protocol_version: PROTOCOL_VERSION,
            vertices: graph.n(),
            instance: self.instance.clone(),
        })?;
        broadcaster.broadcast(&Message::GraphMatrix(graph.to_matrix_bytes()))?;
        tracing::info!(vertices = graph.n(), workers = self.link.worker_count(), "graph distributed");
        Ok(())
    }

    /// Check a reported coloring and, if it beats the global bound, keep it
    /// and relay the new bound.
    fn accept_solution(&mut self, rank: Rank, packed: &PackedNode) -> Result<()> {
        let graph = self.ctx.graph();
        let node = match packed.unpack(graph.n()) {
            Ok(node) => node,
            Err(e) => {
                tracing::warn!(rank, "malformed solution rejected: {}", e);
                return Ok(());
            }
        };
        if !node.is_final() || !graph.is_proper_coloring(node.colors()) {
            tracing::warn!(rank, "improper solution rejected");
            return Ok(());
        }

        if self.ctx.bounds().improve_upper(node.tot_colors()) {
            tracing::info!(rank, colors = node.tot_colors(), "new upper bound");
            self.link
                .broadcaster()
                .broadcast(&Message::NewUpperBound(node.tot_colors()))?;
            self.best = Some(node);
        } else {
            tracing::debug!(rank, colors = node.tot_colors(), "solution does not improve");
        }
        Ok(())
    }

    fn finish(
        &mut self,
        start: Instant,
        lower_bound: CliqueBound,
        time_limited: bool,
        solved_during_frontier: bool,
        dispatched: usize,
    ) -> RunOutcome {
        let coloring = match self.best.take() {
            Some(best) => best,
            None => {
                tracing::warn!("no complete coloring found, falling back to greedy");
                SearchNode::root(self.ctx.graph().n()).greedy_completion(self.ctx.graph())
            }
        };
        RunOutcome {
            coloring,
            lower_bound,
            elapsed: start.elapsed(),
            within_time_limit: !time_limited,
            solved_during_frontier,
            dispatched,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributed::transport::{local_group, WorkerLink};
    use crate::graph::tests::cycle;

    fn settings() -> RunSettings {
        RunSettings {
            time_limit: Duration::from_secs(600),
            search: SearchSettings::default(),
            clique: CliqueSettings::default(),
        }
    }

    /// Complete coloring in wire form
    fn solution(colors: &[u32]) -> PackedNode {
        let mut words = colors.to_vec();
        words.push(colors.iter().copied().max().unwrap_or(0));
        words.push(colors.iter().filter(|&&c| c != 0).count() as u32);
        PackedNode(words)
    }

    async fn recv_until(link: &mut WorkerLink, seen: &mut Vec<Message>, stop: fn(&Message) -> bool) {
        loop {
            let msg = link.recv().await.unwrap();
            let done = stop(&msg);
            seen.push(msg);
            if done {
                return;
            }
        }
    }

    /// Rank 1 reports a 2-coloring once the clique bound is known, then a
    /// duplicate and an improper coloring, and stops on the time limit.
    async fn searching_rank(mut link: WorkerLink, best: Vec<u32>) -> Vec<Message> {
        let sender = link.sender();
        let mut seen = Vec::new();
        recv_until(&mut link, &mut seen, |m| matches!(m, Message::NewLowerBound(_))).await;
        assert!(seen.iter().any(|m| matches!(m, Message::InitialNode(_))));

        sender.send(&Message::SolutionFromWorker(solution(&best))).unwrap();
        recv_until(&mut link, &mut seen, |m| matches!(m, Message::NewUpperBound(_))).await;

        sender.send(&Message::SolutionFromWorker(solution(&best))).unwrap();
        sender
            .send(&Message::SolutionFromWorker(solution(&vec![1; best.len()])))
            .unwrap();
        sender.send(&Message::ReturnTimeLimit).unwrap();
        recv_until(&mut link, &mut seen, |m| matches!(m, Message::Terminate)).await;
        seen
    }

    /// Any other rank signs off as soon as it has its task
    async fn quiet_rank(mut link: WorkerLink) -> Vec<Message> {
        let sender = link.sender();
        let mut seen = Vec::new();
        recv_until(&mut link, &mut seen, |m| {
            matches!(m, Message::InitialNode(_) | Message::NoTask(_))
        })
        .await;
        sender.send(&Message::Return).unwrap();
        recv_until(&mut link, &mut seen, |m| matches!(m, Message::Terminate)).await;
        seen
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_bounds_relayed_to_every_rank() {
        let graph = Arc::new(cycle(10));
        let best: Vec<u32> = (0..10).map(|v| v % 2 + 1).collect();
        let (coordinator_link, worker_links) = local_group(5).unwrap();

        let mut ranks = Vec::new();
        for link in worker_links {
            if link.rank() == 1 {
                ranks.push(tokio::spawn(searching_rank(link, best.clone())));
            } else {
                ranks.push(tokio::spawn(quiet_rank(link)));
            }
        }

        let outcome = Coordinator::new(coordinator_link, graph.clone(), "c10", settings())
            .run()
            .await
            .unwrap();

        assert_eq!(outcome.colors_used(), 2);
        assert_eq!(outcome.coloring.colors(), best.as_slice());
        assert_eq!(outcome.lower_bound.size, 2);
        assert!(!outcome.within_time_limit);
        assert!(!outcome.solved_during_frontier);
        assert!(outcome.dispatched >= 1 && outcome.dispatched < 4);

        let mut idle = 0;
        for handle in ranks {
            let seen = handle.await.unwrap();
            assert!(matches!(seen[0], Message::GraphHeader { vertices: 10, .. }));
            assert!(matches!(seen[1], Message::GraphMatrix(_)));
            assert_eq!(seen.last(), Some(&Message::Terminate));
            if seen.iter().any(|m| matches!(m, Message::NoTask(_))) {
                idle += 1;
            }

            let upper: Vec<usize> = (0..seen.len())
                .filter(|&i| matches!(seen[i], Message::NewUpperBound(_)))
                .collect();
            assert_eq!(upper.len(), 1, "{:?}", seen);
            assert_eq!(seen[upper[0]], Message::NewUpperBound(2));

            let lower = seen.iter().position(|m| *m == Message::NewLowerBound(2));
            assert!(lower.is_some_and(|i| i < upper[0]), "{:?}", seen);
        }
        assert_eq!(idle, 4 - outcome.dispatched);
    }
}
