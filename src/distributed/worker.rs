//! Worker role (ranks 1..P-1)
//!
//! A worker receives the graph, then at most one subtree. The depth-first
//! search runs on the blocking pool while a listener task applies bound
//! broadcasts and the time-limit signal to the shared context. Once the
//! search stops, the worker re-reports its best coloring, signs off and
//! waits for `Terminate`.

use super::protocol::{ErrorMessage, Message, PackedNode, Rank, PROTOCOL_VERSION};
use super::transport::WorkerLink;
use crate::graph::Graph;
use crate::search::{depth_first, SearchContext, SearchNode, SearchSettings, StopReason};
use anyhow::{Context, Result};
use std::sync::Arc;

/// Per-worker statistics returned when the worker exits
#[derive(Debug, Clone, Default)]
pub struct WorkerSummary {
    pub rank: Rank,
    /// Why the search stopped; `None` if the worker had no task
    pub stop: Option<StopReason>,
    pub expanded: u64,
    pub improvements: u64,
}

/// Graph or early termination, whichever the coordinator sends
enum Setup {
    Ready(SearchContext),
    Terminated,
}

/// Task or early termination
enum Assignment {
    Subtree(SearchNode),
    Idle,
    Terminated,
}

pub struct Worker {
    link: WorkerLink,
    settings: SearchSettings,
}

impl Worker {
    pub fn new(link: WorkerLink, settings: SearchSettings) -> Self {
        Self { link, settings }
    }

    /// Serve one run. A fatal error is reported to the coordinator before
    /// it is returned.
    pub async fn run(self) -> Result<WorkerSummary> {
        let rank = self.link.rank();
        let sender = self.link.sender();
        match self.serve().await {
            Ok(summary) => Ok(summary),
            Err(e) => {
                let report = Message::Error(ErrorMessage {
                    rank,
                    error: format!("{:#}", e),
                });
                if sender.send(&report).is_err() {
                    tracing::debug!(rank, "coordinator gone, error not reported");
                }
                Err(e)
            }
        }
    }

    async fn serve(mut self) -> Result<WorkerSummary> {
        let rank = self.link.rank();
        let mut summary = WorkerSummary {
            rank,
            ..Default::default()
        };

        let ctx = match self.receive_graph().await? {
            Setup::Ready(ctx) => ctx,
            Setup::Terminated => return Ok(summary),
        };

        let root = match self.receive_task(&ctx).await? {
            Assignment::Subtree(root) => root,
            Assignment::Idle => {
                tracing::debug!(rank, "no task");
                self.link.sender().send(&Message::Return)?;
                wait_for_terminate(&mut self.link, None).await?;
                return Ok(summary);
            }
            Assignment::Terminated => return Ok(summary),
        };

        let sender = self.link.sender();
        let listener = tokio::spawn(listen(self.link, ctx.clone()));

        let outcome = {
            let ctx = ctx.clone();
            let sender = sender.clone();
            tokio::task::spawn_blocking(move || {
                depth_first(&ctx, root, |node| {
                    if let Err(e) = sender.send(&Message::SolutionFromWorker(PackedNode::from(node))) {
                        tracing::warn!(rank = sender.rank(), "failed to report solution: {:#}", e);
                    }
                })
            })
            .await
            .context("Search task panicked")?
        };
        tracing::info!(
            rank,
            stop = ?outcome.stop,
            expanded = outcome.expanded,
            improvements = outcome.improvements,
            "search finished"
        );

        if let Some(best) = &outcome.local_best {
            sender.send(&Message::SolutionFromWorker(PackedNode::from(best)))?;
        }
        let sign_off = match outcome.stop {
            StopReason::TimeLimit => Message::ReturnTimeLimit,
            StopReason::Exhausted | StopReason::ProvenOptimal => Message::Return,
        };
        sender.send(&sign_off)?;

        listener.await.context("Listener task panicked")??;

        summary.stop = Some(outcome.stop);
        summary.expanded = outcome.expanded;
        summary.improvements = outcome.improvements;
        Ok(summary)
    }

    /// Receive `GraphHeader` then `GraphMatrix`. A time limit that arrives
    /// first is remembered and applied to the new context.
    async fn receive_graph(&mut self) -> Result<Setup> {
        let mut vertices = None;
        let mut time_limited = false;
        loop {
            match self.link.recv().await? {
                Message::GraphHeader {
                    protocol_version,
                    vertices: n,
                    instance,
                } => {
                    if protocol_version != PROTOCOL_VERSION {
                        anyhow::bail!(
                            "Protocol version mismatch: expected {}, got {}",
                            PROTOCOL_VERSION,
                            protocol_version
                        );
                    }
                    tracing::debug!(rank = self.link.rank(), n, instance = %instance, "graph header");
                    vertices = Some(n);
                }
                Message::GraphMatrix(cells) => {
                    let n = vertices.context("GRAPH_MATRIX received before GRAPH_HEADER")?;
                    let graph = Graph::from_matrix_bytes(n, &cells).context("Invalid adjacency matrix")?;
                    let ctx = SearchContext::new(Arc::new(graph), self.settings);
                    if time_limited {
                        ctx.signal_time_limit();
                    }
                    return Ok(Setup::Ready(ctx));
                }
                Message::TimeLimit => time_limited = true,
                Message::Terminate => return Ok(Setup::Terminated),
                other => anyhow::bail!("Expected GRAPH_HEADER or GRAPH_MATRIX, got {}", other.kind()),
            }
        }
    }

    /// Wait for `InitialNode` or `NoTask`, applying broadcasts on the way
    async fn receive_task(&mut self, ctx: &SearchContext) -> Result<Assignment> {
        let n = ctx.graph().n();
        loop {
            let msg = self.link.recv().await?;
            if apply_broadcast(ctx, &msg) {
                continue;
            }
            match msg {
                Message::InitialNode(packed) => {
                    let root = packed.unpack(n).context("Invalid INITIAL_NODE")?;
                    return Ok(Assignment::Subtree(root));
                }
                Message::NoTask(_) => return Ok(Assignment::Idle),
                Message::Terminate => return Ok(Assignment::Terminated),
                other => anyhow::bail!("Expected INITIAL_NODE or NO_TASK, got {}", other.kind()),
            }
        }
    }
}

/// Apply a bound or time-limit broadcast. Returns false for any other message.
fn apply_broadcast(ctx: &SearchContext, msg: &Message) -> bool {
    match *msg {
        Message::NewUpperBound(value) => {
            ctx.bounds().improve_upper(value);
        }
        Message::NewLowerBound(value) => {
            ctx.bounds().raise_lower(value);
        }
        Message::TimeLimit => ctx.signal_time_limit(),
        _ => return false,
    }
    true
}

/// Listener loop: apply broadcasts until `Terminate`. If the coordinator
/// goes away the search is stopped through the time-limit flag.
async fn wait_for_terminate(link: &mut WorkerLink, ctx: Option<&SearchContext>) -> Result<()> {
    loop {
        let msg = match link.recv().await {
            Ok(msg) => msg,
            Err(e) => {
                if let Some(ctx) = ctx {
                    ctx.signal_time_limit();
                }
                return Err(e);
            }
        };
        if matches!(msg, Message::Terminate) {
            return Ok(());
        }
        match ctx {
            Some(ctx) if apply_broadcast(ctx, &msg) => {}
            _ => tracing::debug!(rank = link.rank(), kind = msg.kind(), "ignored"),
        }
    }
}

async fn listen(mut link: WorkerLink, ctx: SearchContext) -> Result<()> {
    wait_for_terminate(&mut link, Some(&ctx)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributed::transport::{local_group, CoordinatorLink};
    use crate::graph::tests::cycle;

    fn send_graph(coordinator: &CoordinatorLink, graph: &Graph) {
        let broadcaster = coordinator.broadcaster();
        broadcaster
            .send(
                1,
                &Message::GraphHeader {
                    protocol_version: PROTOCOL_VERSION,
                    vertices: graph.n(),
                    instance: "test".to_string(),
                },
            )
            .unwrap();
        broadcaster
            .send(1, &Message::GraphMatrix(graph.to_matrix_bytes()))
            .unwrap();
    }

    fn spawn_worker() -> (CoordinatorLink, tokio::task::JoinHandle<Result<WorkerSummary>>) {
        let (coordinator, mut workers) = local_group(2).unwrap();
        let worker = Worker::new(workers.remove(0), SearchSettings::default());
        (coordinator, tokio::spawn(worker.run()))
    }

    /// Messages from rank 1 up to and including its sign-off
    async fn until_sign_off(coordinator: &mut CoordinatorLink) -> Vec<Message> {
        let mut seen = Vec::new();
        loop {
            let (rank, msg) = coordinator.recv().await.unwrap();
            assert_eq!(rank, 1);
            let done = matches!(msg, Message::Return | Message::ReturnTimeLimit);
            seen.push(msg);
            if done {
                return seen;
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_idle_worker_signs_off() {
        let (mut coordinator, worker) = spawn_worker();
        let g = cycle(4);
        send_graph(&coordinator, &g);
        coordinator
            .broadcaster()
            .send(1, &Message::NoTask(PackedNode::from(&SearchNode::root(g.n()))))
            .unwrap();

        assert_eq!(until_sign_off(&mut coordinator).await, vec![Message::Return]);

        coordinator.broadcaster().broadcast(&Message::Terminate).unwrap();
        let summary = worker.await.unwrap().unwrap();
        assert_eq!(summary.rank, 1);
        assert!(summary.stop.is_none());
        assert_eq!(summary.expanded, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_final_report_precedes_sign_off() {
        let (mut coordinator, worker) = spawn_worker();
        let g = cycle(6);
        send_graph(&coordinator, &g);
        let broadcaster = coordinator.broadcaster().clone();
        broadcaster
            .send(1, &Message::InitialNode(PackedNode::from(&SearchNode::root(g.n()))))
            .unwrap();
        broadcaster.send(1, &Message::NewUpperBound(3)).unwrap();

        let seen = until_sign_off(&mut coordinator).await;
        assert_eq!(seen.last(), Some(&Message::Return));

        let solutions: Vec<SearchNode> = seen
            .iter()
            .filter_map(|m| match m {
                Message::SolutionFromWorker(packed) => Some(packed.unpack(g.n()).unwrap()),
                _ => None,
            })
            .collect();
        // At least one improvement during the search plus the final copy
        assert!(solutions.len() >= 2, "{:?}", seen);
        let Message::SolutionFromWorker(last) = &seen[seen.len() - 2] else {
            panic!("expected a final report before sign-off: {:?}", seen);
        };
        let last = last.unpack(g.n()).unwrap();
        assert_eq!(last.tot_colors(), 2);
        assert!(g.is_proper_coloring(last.colors()));
        assert_eq!(solutions.iter().map(|s| s.tot_colors()).min(), Some(2));

        broadcaster.broadcast(&Message::Terminate).unwrap();
        let summary = worker.await.unwrap().unwrap();
        assert_eq!(summary.stop, Some(StopReason::Exhausted));
        assert!(summary.improvements >= 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_early_time_limit_is_remembered() {
        let (mut coordinator, worker) = spawn_worker();
        let g = cycle(6);
        coordinator.broadcaster().broadcast(&Message::TimeLimit).unwrap();
        send_graph(&coordinator, &g);
        coordinator
            .broadcaster()
            .send(1, &Message::InitialNode(PackedNode::from(&SearchNode::root(g.n()))))
            .unwrap();

        assert_eq!(until_sign_off(&mut coordinator).await, vec![Message::ReturnTimeLimit]);

        coordinator.broadcaster().broadcast(&Message::Terminate).unwrap();
        let summary = worker.await.unwrap().unwrap();
        assert_eq!(summary.stop, Some(StopReason::TimeLimit));
        assert_eq!(summary.expanded, 0);
    }
}
