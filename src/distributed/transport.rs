//! Channel-shaped links between ranks
//!
//! Every rank talks through the same two link types regardless of where its
//! peers live. Messages always cross as encoded frames, so a rank never
//! shares memory with another one: it decodes its own copy of every value.
//!
//! - `local_group` wires P ranks inside one process with tokio mpsc channels
//! - `tcp` pumps the same frames between sockets and these channels

use super::protocol::{deserialize_message, serialize_message, Message, Rank};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

/// One length-prefixed encoded message
pub type Frame = Vec<u8>;

/// Coordinator-side sender to every worker. Cheap to clone (the timer task
/// holds its own copy).
#[derive(Debug, Clone)]
pub struct Broadcaster {
    /// peers[r - 1] delivers to rank r
    peers: Arc<Vec<UnboundedSender<Frame>>>,
}

impl Broadcaster {
    pub fn new(peers: Vec<UnboundedSender<Frame>>) -> Self {
        Self { peers: Arc::new(peers) }
    }

    /// Number of workers (P - 1)
    pub fn worker_count(&self) -> usize {
        self.peers.len()
    }

    /// Send a message to one worker
    pub fn send(&self, rank: Rank, msg: &Message) -> Result<()> {
        let peer = rank
            .checked_sub(1)
            .and_then(|idx| self.peers.get(idx))
            .with_context(|| format!("No worker with rank {}", rank))?;
        let frame = serialize_message(msg)?;
        peer.send(frame)
            .map_err(|_| anyhow::anyhow!("Worker {} disconnected", rank))?;
        tracing::debug!(rank, kind = msg.kind(), "sent");
        Ok(())
    }

    /// Send a message to every worker. The frame is encoded once; workers
    /// that already left are skipped.
    pub fn broadcast(&self, msg: &Message) -> Result<()> {
        let frame = serialize_message(msg)?;
        for (idx, peer) in self.peers.iter().enumerate() {
            if peer.send(frame.clone()).is_err() {
                tracing::warn!(rank = idx + 1, kind = msg.kind(), "worker gone, broadcast skipped");
            }
        }
        tracing::debug!(kind = msg.kind(), "broadcast");
        Ok(())
    }
}

/// Rank 0 end of the group
#[derive(Debug)]
pub struct CoordinatorLink {
    broadcaster: Broadcaster,
    inbox: UnboundedReceiver<(Rank, Frame)>,
    /// Socket writer pumps (TCP only), drained on close
    writers: Vec<JoinHandle<()>>,
}

impl CoordinatorLink {
    pub fn new(
        broadcaster: Broadcaster,
        inbox: UnboundedReceiver<(Rank, Frame)>,
        writers: Vec<JoinHandle<()>>,
    ) -> Self {
        Self {
            broadcaster,
            inbox,
            writers,
        }
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    pub fn worker_count(&self) -> usize {
        self.broadcaster.worker_count()
    }

    /// Next message from any worker
    pub async fn recv(&mut self) -> Result<(Rank, Message)> {
        let (rank, frame) = self
            .inbox
            .recv()
            .await
            .context("All workers disconnected")?;
        let (msg, _) = deserialize_message(&frame)
            .with_context(|| format!("Bad frame from worker {}", rank))?;
        tracing::debug!(rank, kind = msg.kind(), "received");
        Ok((rank, msg))
    }

    /// Drop the senders and wait for queued frames to reach the sockets.
    ///
    /// Clones of the broadcaster held elsewhere keep the writers alive, so
    /// the wait is bounded.
    pub async fn close(self) {
        let Self { broadcaster, inbox, writers } = self;
        drop(broadcaster);
        drop(inbox);
        for writer in writers {
            if tokio::time::timeout(Duration::from_secs(5), writer).await.is_err() {
                tracing::warn!("timed out flushing a worker connection");
            }
        }
    }
}

/// Worker-side sender, usable from blocking code
#[derive(Debug, Clone)]
pub struct WorkerSender {
    rank: Rank,
    outbox: UnboundedSender<(Rank, Frame)>,
}

impl WorkerSender {
    pub fn rank(&self) -> Rank {
        self.rank
    }

    pub fn send(&self, msg: &Message) -> Result<()> {
        let frame = serialize_message(msg)?;
        self.outbox
            .send((self.rank, frame))
            .map_err(|_| anyhow::anyhow!("Coordinator disconnected"))?;
        tracing::debug!(rank = self.rank, kind = msg.kind(), "sent");
        Ok(())
    }
}

/// Rank r (r >= 1) end of the group
#[derive(Debug)]
pub struct WorkerLink {
    sender: WorkerSender,
    inbox: UnboundedReceiver<Frame>,
}

impl WorkerLink {
    pub fn new(rank: Rank, outbox: UnboundedSender<(Rank, Frame)>, inbox: UnboundedReceiver<Frame>) -> Self {
        Self {
            sender: WorkerSender { rank, outbox },
            inbox,
        }
    }

    pub fn rank(&self) -> Rank {
        self.sender.rank
    }

    pub fn sender(&self) -> WorkerSender {
        self.sender.clone()
    }

    /// Next message from the coordinator
    pub async fn recv(&mut self) -> Result<Message> {
        let frame = self.inbox.recv().await.context("Coordinator disconnected")?;
        let (msg, _) = deserialize_message(&frame).context("Bad frame from coordinator")?;
        tracing::debug!(rank = self.rank(), kind = msg.kind(), "received");
        Ok(msg)
    }
}

/// Wire a group of `group_size` ranks inside this process
pub fn local_group(group_size: usize) -> Result<(CoordinatorLink, Vec<WorkerLink>)> {
    if group_size < 2 {
        anyhow::bail!("Process group needs at least 2 ranks, got {}", group_size);
    }

    let (to_coordinator, inbox) = mpsc::unbounded_channel();
    let mut peers = Vec::with_capacity(group_size - 1);
    let mut workers = Vec::with_capacity(group_size - 1);
    for rank in 1..group_size {
        let (tx, rx) = mpsc::unbounded_channel();
        peers.push(tx);
        workers.push(WorkerLink::new(rank, to_coordinator.clone(), rx));
    }

    let coordinator = CoordinatorLink::new(Broadcaster::new(peers), inbox, Vec::new());
    Ok((coordinator, workers))
}
