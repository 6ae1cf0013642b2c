//! TCP process group
//!
//! The coordinator listens and accepts exactly P-1 workers. Each worker
//! opens with `Hello` and is answered with `Welcome` carrying its rank in
//! connection order. After the handshake every socket is split and two pump
//! tasks move frames between it and the channel links from `transport`, so
//! the roles run unchanged over TCP.

use super::protocol::{
    read_frame, read_message, write_frame, write_message, ErrorMessage, Message, Rank, COORDINATOR_RANK,
    PROTOCOL_VERSION,
};
use super::transport::{Broadcaster, CoordinatorLink, Frame, WorkerLink};
use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

fn spawn_writer<W, T, F>(mut writer: W, mut outbox: UnboundedReceiver<T>, unwrap: F) -> JoinHandle<()>
where
    W: AsyncWrite + Unpin + Send + 'static,
    T: Send + 'static,
    F: Fn(T) -> Frame + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(item) = outbox.recv().await {
            let frame = unwrap(item);
            if let Err(e) = write_frame(&mut writer, &frame).await {
                tracing::warn!("connection write failed: {:#}", e);
                break;
            }
        }
    })
}

fn spawn_reader<R, T, F>(mut reader: R, inbox: UnboundedSender<T>, wrap: F) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
    T: Send + 'static,
    F: Fn(Frame) -> T + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            match read_frame(&mut reader).await {
                Ok(frame) => {
                    if inbox.send(wrap(frame)).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::debug!("connection closed: {:#}", e);
                    break;
                }
            }
        }
    })
}

/// Accept `worker_count` workers and build the coordinator's link
pub async fn accept_workers(listener: &TcpListener, worker_count: usize) -> Result<CoordinatorLink> {
    let group_size = worker_count + 1;
    let (to_coordinator, inbox) = mpsc::unbounded_channel();
    let mut peers = Vec::with_capacity(worker_count);
    let mut writers = Vec::with_capacity(worker_count);

    println!("Waiting for {} workers...", worker_count);
    for rank in 1..=worker_count {
        let (mut stream, addr) = listener.accept().await.context("Failed to accept worker connection")?;
        stream.set_nodelay(true).ok();

        let node_id = match read_message(&mut stream)
            .await
            .with_context(|| format!("Failed to read HELLO from {}", addr))?
        {
            Message::Hello { protocol_version, node_id } => {
                if protocol_version != PROTOCOL_VERSION {
                    let error = format!(
                        "Protocol version mismatch: expected {}, got {}",
                        PROTOCOL_VERSION, protocol_version
                    );
                    let reply = Message::Error(ErrorMessage { rank: COORDINATOR_RANK, error: error.clone() });
                    write_message(&mut stream, &reply).await.ok();
                    anyhow::bail!("Worker {} ({}): {}", addr, node_id, error);
                }
                node_id
            }
            other => anyhow::bail!("Expected HELLO from {}, got {}", addr, other.kind()),
        };

        write_message(&mut stream, &Message::Welcome { rank, group_size })
            .await
            .with_context(|| format!("Failed to welcome worker {}", addr))?;
        println!("  ✅ Worker {} connected from {} ({})", rank, addr, node_id);

        let (reader, writer) = stream.into_split();
        let (tx, rx) = mpsc::unbounded_channel();
        peers.push(tx);
        writers.push(spawn_writer(writer, rx, |frame| frame));
        spawn_reader(reader, to_coordinator.clone(), move |frame| (rank, frame));
    }
    println!("All {} workers connected!", worker_count);

    Ok(CoordinatorLink::new(Broadcaster::new(peers), inbox, writers))
}

/// Connect to the coordinator at `addr` and build this worker's link
pub async fn connect_worker<A: ToSocketAddrs>(addr: A) -> Result<WorkerLink> {
    let mut stream = TcpStream::connect(addr).await.context("Failed to connect to coordinator")?;
    stream.set_nodelay(true).ok();

    let node_id = hostname::get()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "unknown".to_string());
    let hello = Message::Hello {
        protocol_version: PROTOCOL_VERSION,
        node_id,
    };
    write_message(&mut stream, &hello).await?;

    let rank: Rank = match read_message(&mut stream).await.context("Failed to read WELCOME")? {
        Message::Welcome { rank, group_size } => {
            println!("Joined group as rank {} of {}", rank, group_size);
            rank
        }
        Message::Error(err) => anyhow::bail!("Coordinator rejected connection: {}", err.error),
        other => anyhow::bail!("Expected WELCOME, got {}", other.kind()),
    };

    let (reader, writer) = stream.into_split();
    let (outbox, outgoing) = mpsc::unbounded_channel::<(Rank, Frame)>();
    let (incoming, inbox) = mpsc::unbounded_channel();
    spawn_writer(writer, outgoing, |(_, frame)| frame);
    spawn_reader(reader, incoming, |frame| frame);

    Ok(WorkerLink::new(rank, outbox, inbox))
}
