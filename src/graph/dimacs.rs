//! DIMACS edge-format reader
//!
//! ```text
//! c comment line
//! p edge <vertices> <edges>
//! e <u> <v>          (1-based vertex ids)
//! ```
//!
//! The edge count on the problem line is informational; the graph is built
//! from the `e` lines actually present. Other line types (`n`, `x`, ...) are
//! skipped.

use super::{Graph, GraphError, VertexId};
use crate::Result;
use anyhow::Context;
use std::fs;
use std::path::Path;

/// Read a DIMACS file from disk
pub fn read_dimacs(path: &Path) -> Result<Graph> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read graph file: {}", path.display()))?;

    parse_dimacs(&contents)
        .with_context(|| format!("Failed to parse graph file: {}", path.display()))
}

/// Parse DIMACS text
pub fn parse_dimacs(contents: &str) -> std::result::Result<Graph, GraphError> {
    let mut n: Option<usize> = None;
    let mut edges: Vec<(VertexId, VertexId)> = Vec::new();

    for (idx, raw) in contents.lines().enumerate() {
        let line_no = idx + 1;
        let mut fields = raw.split_whitespace();
        let Some(kind) = fields.next() else {
            continue;
        };

        match kind {
            "c" => continue,
            "p" => {
                if n.is_some() {
                    return Err(parse_error(line_no, "duplicate problem line"));
                }
                let format = fields.next().unwrap_or_default();
                if format != "edge" && format != "col" {
                    return Err(parse_error(line_no, format!("unsupported format '{}'", format)));
                }
                n = Some(parse_number(fields.next(), line_no, "vertex count")?);
            }
            "e" => {
                let Some(vertices) = n else {
                    return Err(GraphError::MissingProblemLine);
                };
                let u = parse_number(fields.next(), line_no, "edge endpoint")?;
                let v = parse_number(fields.next(), line_no, "edge endpoint")?;
                for vertex in [u, v] {
                    if vertex == 0 || vertex > vertices {
                        return Err(parse_error(
                            line_no,
                            format!("vertex {} outside 1..={}", vertex, vertices),
                        ));
                    }
                }
                edges.push((u - 1, v - 1));
            }
            other => {
                tracing::debug!(line = line_no, kind = other, "skipping DIMACS line");
            }
        }
    }

    let n = n.ok_or(GraphError::MissingProblemLine)?;
    Graph::from_edges(n, edges)
}

/// Instance name derived from a graph file path (file stem)
pub fn instance_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "graph".to_string())
}

fn parse_number(field: Option<&str>, line: usize, what: &str) -> std::result::Result<usize, GraphError> {
    let field = field.ok_or_else(|| parse_error(line, format!("missing {}", what)))?;
    field
        .parse()
        .map_err(|_| parse_error(line, format!("invalid {} '{}'", what, field)))
}

fn parse_error(line: usize, message: impl Into<String>) -> GraphError {
    GraphError::Parse {
        line,
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SQUARE: &str = "c 4-cycle\np edge 4 4\ne 1 2\ne 2 3\ne 3 4\ne 4 1\n";

    #[test]
    fn test_parse_square() {
        let g = parse_dimacs(SQUARE).unwrap();
        assert_eq!(g.n(), 4);
        assert_eq!(g.edge_count(), 4);
        assert!(g.adj(0, 1) && g.adj(3, 0));
        assert!(!g.adj(0, 2));
    }

    #[test]
    fn test_blank_lines_and_isolated_vertices() {
        let g = parse_dimacs("\np edge 5 0\n\n").unwrap();
        assert_eq!(g.n(), 5);
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn test_missing_problem_line() {
        assert_eq!(parse_dimacs("e 1 2\n"), Err(GraphError::MissingProblemLine));
        assert_eq!(parse_dimacs("c nothing\n"), Err(GraphError::MissingProblemLine));
    }

    #[test]
    fn test_out_of_range_vertex() {
        let err = parse_dimacs("p edge 2 1\ne 1 3\n").unwrap_err();
        assert!(matches!(err, GraphError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_malformed_number() {
        let err = parse_dimacs("p edge two 1\n").unwrap_err();
        assert!(matches!(err, GraphError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_unknown_lines_skipped() {
        let g = parse_dimacs("p col 3 1\nn 1 5\nn 2 7\ne 1 2\nx 9\n").unwrap();
        assert_eq!(g.n(), 3);
        assert_eq!(g.edge_count(), 1);
        assert!(g.adj(0, 1));
    }

    #[test]
    fn test_self_loop_rejected() {
        assert_eq!(parse_dimacs("p edge 2 1\ne 2 2\n"), Err(GraphError::SelfLoop(1)));
    }

    #[test]
    fn test_read_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SQUARE.as_bytes()).unwrap();
        let g = read_dimacs(file.path()).unwrap();
        assert_eq!(g.edge_count(), 4);
    }

    #[test]
    fn test_read_missing_file_has_context() {
        let err = read_dimacs(Path::new("/nonexistent/graph.col")).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to read graph file"));
    }

    #[test]
    fn test_instance_name() {
        assert_eq!(instance_name(Path::new("inputs/queen5_5.col")), "queen5_5");
    }
}
