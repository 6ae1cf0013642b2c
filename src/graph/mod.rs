//! Graph representation
//!
//! The graph is built once (from a DIMACS file, a random generator or the
//! coordinator's distribution frames) and is immutable afterwards. Every rank
//! owns its own copy and shares it read-only between its tasks via `Arc`.
//!
//! Both representations the search needs are kept side by side:
//! - a row-major boolean matrix for O(1) `adj(i, j)` queries
//! - adjacency lists for neighbor scans in child generation

pub mod dimacs;
pub mod random;

use thiserror::Error;

/// Vertex identifier (0-based)
pub type VertexId = usize;

/// Errors raised while building or parsing a graph
#[derive(Debug, Error, PartialEq)]
pub enum GraphError {
    #[error("vertex {vertex} out of range (graph has {n} vertices)")]
    VertexOutOfRange { vertex: usize, n: usize },

    #[error("self loop on vertex {0}")]
    SelfLoop(VertexId),

    #[error("adjacency matrix has {actual} cells, expected {expected}")]
    MatrixSize { expected: usize, actual: usize },

    #[error("adjacency matrix cell ({row}, {col}) holds {value}, expected 0 or 1")]
    InvalidCell { row: usize, col: usize, value: u8 },

    #[error("adjacency matrix is not symmetric at ({row}, {col})")]
    Asymmetric { row: usize, col: usize },

    #[error("edge density {0} is outside [0, 1]")]
    InvalidDensity(f64),

    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("missing 'p edge <n> <m>' problem line")]
    MissingProblemLine,
}

/// Undirected simple graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Graph {
    /// Number of vertices
    n: usize,
    /// matrix[i * n + j]: true iff i and j are adjacent
    matrix: Vec<bool>,
    /// neighbors[i]: vertices adjacent to i, ascending
    neighbors: Vec<Vec<VertexId>>,
    /// Number of undirected edges
    edge_count: usize,
}

impl Graph {
    /// Graph with `n` vertices and no edges
    pub fn empty(n: usize) -> Self {
        Self {
            n,
            matrix: vec![false; n * n],
            neighbors: vec![Vec::new(); n],
            edge_count: 0,
        }
    }

    /// Build a graph from an edge list. Duplicate edges collapse into one.
    pub fn from_edges<I>(n: usize, edges: I) -> Result<Self, GraphError>
    where
        I: IntoIterator<Item = (VertexId, VertexId)>,
    {
        let mut matrix = vec![false; n * n];
        for (u, v) in edges {
            for vertex in [u, v] {
                if vertex >= n {
                    return Err(GraphError::VertexOutOfRange { vertex, n });
                }
            }
            if u == v {
                return Err(GraphError::SelfLoop(u));
            }
            matrix[u * n + v] = true;
            matrix[v * n + u] = true;
        }
        Ok(Self::from_matrix(n, matrix))
    }

    /// Rebuild a graph from the flattened row-major byte matrix sent by the
    /// coordinator (one byte per cell, 0 or 1).
    pub fn from_matrix_bytes(n: usize, cells: &[u8]) -> Result<Self, GraphError> {
        let expected = n * n;
        if cells.len() != expected {
            return Err(GraphError::MatrixSize { expected, actual: cells.len() });
        }

        let mut matrix = Vec::with_capacity(expected);
        for (idx, &value) in cells.iter().enumerate() {
            let (row, col) = (idx / n, idx % n);
            match value {
                0 => matrix.push(false),
                1 if row == col => return Err(GraphError::SelfLoop(row)),
                1 => matrix.push(true),
                _ => return Err(GraphError::InvalidCell { row, col, value }),
            }
        }

        for row in 0..n {
            for col in (row + 1)..n {
                if matrix[row * n + col] != matrix[col * n + row] {
                    return Err(GraphError::Asymmetric { row, col });
                }
            }
        }

        Ok(Self::from_matrix(n, matrix))
    }

    fn from_matrix(n: usize, matrix: Vec<bool>) -> Self {
        let neighbors: Vec<Vec<VertexId>> = (0..n)
            .map(|i| (0..n).filter(|&j| matrix[i * n + j]).collect())
            .collect();
        let edge_count = neighbors.iter().map(Vec::len).sum::<usize>() / 2;
        Self {
            n,
            matrix,
            neighbors,
            edge_count,
        }
    }

    /// Flattened row-major adjacency matrix, one byte per cell
    pub fn to_matrix_bytes(&self) -> Vec<u8> {
        self.matrix.iter().map(|&adjacent| adjacent as u8).collect()
    }

    /// Number of vertices
    #[inline]
    pub fn n(&self) -> usize {
        self.n
    }

    /// Number of undirected edges
    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// True iff `i` and `j` are adjacent
    #[inline]
    pub fn adj(&self, i: VertexId, j: VertexId) -> bool {
        self.matrix[i * self.n + j]
    }

    /// Vertices adjacent to `v`, ascending
    #[inline]
    pub fn neighbors(&self, v: VertexId) -> &[VertexId] {
        &self.neighbors[v]
    }

    #[inline]
    pub fn degree(&self, v: VertexId) -> usize {
        self.neighbors[v].len()
    }

    /// Check that `colors` assigns a non-zero color to every vertex and that
    /// no edge joins two vertices of the same color.
    pub fn is_proper_coloring(&self, colors: &[u32]) -> bool {
        if colors.len() != self.n || colors.iter().any(|&c| c == 0) {
            return false;
        }
        (0..self.n).all(|u| {
            self.neighbors[u]
                .iter()
                .all(|&v| colors[u] != colors[v])
        })
    }
}
