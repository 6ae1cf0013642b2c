//! Process-group protocol
//!
//! Every frame exchanged between ranks is one [`Message`], encoded with
//! MessagePack (rmp-serde) and prefixed with its length.
//!
//! # Message Flow
//!
//! ```text
//! Coordinator (rank 0)                  Worker (rank r)
//!     |                                    |
//!     |<------- HELLO (TCP only) ----------|
//!     |-------- WELCOME (TCP only) ------->|
//!     |                                    |
//!     |-------- GRAPH_HEADER ------------->|
//!     |-------- GRAPH_MATRIX ------------->|
//!     |                                    |
//!     |-------- INITIAL_NODE / NO_TASK --->|
//!     |                                    |
//!     |<------- SOLUTION_FROM_WORKER ------|   (any number of times)
//!     |-------- NEW_UB / NEW_LB ---------->|   (broadcast)
//!     |-------- TIME_LIMIT --------------->|   (timer, at most once)
//!     |                                    |
//!     |<------- RETURN[_TIME_LIMIT] -------|
//!     |-------- TERMINATE ---------------->|
//! ```
//!
//! # Message Framing
//!
//! ```text
//! [4 bytes: message length (little-endian u32)][N bytes: MessagePack message]
//! ```

use crate::search::{NodeError, SearchNode};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Protocol version
///
/// Coordinator and workers must have matching protocol versions.
pub const PROTOCOL_VERSION: u32 = 1;

/// Frames larger than this are rejected
pub const MAX_FRAME_LEN: usize = 100 * 1024 * 1024;

/// Process rank. `0` is the coordinator.
pub type Rank = usize;

pub const COORDINATOR_RANK: Rank = 0;

/// Wire form of a [`SearchNode`]: `n` colors, `tot_colors`, `next`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackedNode(pub Vec<u32>);

impl PackedNode {
    pub fn unpack(&self, n: usize) -> Result<SearchNode, NodeError> {
        SearchNode::unpack(&self.0, n)
    }
}

impl From<&SearchNode> for PackedNode {
    fn from(node: &SearchNode) -> Self {
        PackedNode(node.pack())
    }
}

/// Protocol message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Message {
    /// First frame on a TCP connection (Worker → Coordinator)
    Hello {
        protocol_version: u32,
        node_id: String,
    },

    /// Rank assignment (Coordinator → Worker, TCP only)
    Welcome { rank: Rank, group_size: usize },

    /// Graph size, sent before the matrix (Coordinator → Worker)
    GraphHeader {
        protocol_version: u32,
        vertices: usize,
        instance: String,
    },

    /// Flattened row-major adjacency matrix (Coordinator → Worker)
    GraphMatrix(Vec<u8>),

    /// Subtree root to search (Coordinator → Worker)
    InitialNode(PackedNode),

    /// No subtree for this worker (Coordinator → Worker)
    NoTask(PackedNode),

    /// Complete coloring that improved the worker's upper bound
    /// (Worker → Coordinator)
    SolutionFromWorker(PackedNode),

    /// Subtree exhausted or bounds met (Worker → Coordinator)
    Return,

    /// Search stopped by the time limit (Worker → Coordinator)
    ReturnTimeLimit,

    /// Tightened upper bound (Coordinator → all)
    NewUpperBound(u32),

    /// Clique lower bound (Coordinator → all)
    NewLowerBound(u32),

    /// Run is over (Coordinator → all)
    Terminate,

    /// Time budget spent (Coordinator timer → all)
    TimeLimit,

    /// Fatal worker error (Worker → Coordinator)
    Error(ErrorMessage),
}

impl Message {
    /// Short tag for log lines
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Hello { .. } => "HELLO",
            Message::Welcome { .. } => "WELCOME",
            Message::GraphHeader { .. } => "GRAPH_HEADER",
            Message::GraphMatrix(_) => "GRAPH_MATRIX",
            Message::InitialNode(_) => "INITIAL_NODE",
            Message::NoTask(_) => "NO_TASK",
            Message::SolutionFromWorker(_) => "SOLUTION_FROM_WORKER",
            Message::Return => "RETURN",
            Message::ReturnTimeLimit => "RETURN_TIME_LIMIT",
            Message::NewUpperBound(_) => "NEW_UB",
            Message::NewLowerBound(_) => "NEW_LB",
            Message::Terminate => "TERMINATE",
            Message::TimeLimit => "TIME_LIMIT",
            Message::Error(_) => "ERROR",
        }
    }
}

/// Error message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMessage {
    /// Rank of the failing worker
    pub rank: Rank,

    /// Error description
    pub error: String,
}

/// Serialize a message to a length-prefixed frame
pub fn serialize_message(msg: &Message) -> Result<Vec<u8>> {
    let msg_bytes = rmp_serde::to_vec(msg).context("Failed to serialize message")?;
    if msg_bytes.len() > MAX_FRAME_LEN {
        anyhow::bail!("Message too large: {} bytes (max 100MB)", msg_bytes.len());
    }

    let msg_len = msg_bytes.len() as u32;
    let mut framed = Vec::with_capacity(4 + msg_bytes.len());
    framed.extend_from_slice(&msg_len.to_le_bytes());
    framed.extend_from_slice(&msg_bytes);

    Ok(framed)
}

/// Deserialize a message from a length-prefixed frame
///
/// Returns (message, bytes_consumed) where bytes_consumed includes the length prefix.
pub fn deserialize_message(buf: &[u8]) -> Result<(Message, usize)> {
    if buf.len() < 4 {
        anyhow::bail!("Buffer too small for message length (need 4 bytes, got {})", buf.len());
    }

    let msg_len = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
    if msg_len > MAX_FRAME_LEN {
        anyhow::bail!("Message too large: {} bytes (max 100MB)", msg_len);
    }
    if buf.len() < 4 + msg_len {
        anyhow::bail!("Incomplete message (need {} bytes, got {})", 4 + msg_len, buf.len());
    }

    let msg = rmp_serde::from_slice(&buf[4..4 + msg_len]).context("Failed to deserialize message")?;

    Ok((msg, 4 + msg_len))
}

/// Read one complete frame (length prefix included) from a stream
pub async fn read_frame<R>(reader: &mut R) -> Result<Vec<u8>>
where
    R: tokio::io::AsyncRead + Unpin,
{
    use tokio::io::AsyncReadExt;

    let mut len_buf = [0u8; 4];
    reader
        .read_exact(&mut len_buf)
        .await
        .context("Failed to read message length")?;

    let msg_len = u32::from_le_bytes(len_buf) as usize;
    if msg_len > MAX_FRAME_LEN {
        anyhow::bail!("Message too large: {} bytes (max 100MB)", msg_len);
    }

    let mut frame = vec![0u8; 4 + msg_len];
    frame[..4].copy_from_slice(&len_buf);
    reader
        .read_exact(&mut frame[4..])
        .await
        .context("Failed to read message body")?;

    Ok(frame)
}

/// Read and decode one message from a stream
pub async fn read_message<R>(reader: &mut R) -> Result<Message>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let frame = read_frame(reader).await?;
    let (msg, _) = deserialize_message(&frame)?;
    Ok(msg)
}

/// Write an already framed message and flush
pub async fn write_frame<W>(writer: &mut W, frame: &[u8]) -> Result<()>
where
    W: tokio::io::AsyncWrite + Unpin,
{
    use tokio::io::AsyncWriteExt;

    writer.write_all(frame).await.context("Failed to write message")?;
    writer.flush().await.context("Failed to flush stream")?;
    Ok(())
}

/// Encode and write one message
pub async fn write_message<W>(writer: &mut W, msg: &Message) -> Result<()>
where
    W: tokio::io::AsyncWrite + Unpin,
{
    let framed = serialize_message(msg)?;
    write_frame(writer, &framed).await
}
