//! Result records
//!
//! Every finished run produces one [`RunReport`]. It is printed to the
//! console and persisted as a text record (plus an optional JSON copy)
//! under `<output_dir>/optimal/` or `<output_dir>/time_limit/`.

pub mod json;
pub mod text;

use crate::config::OutputConfig;
use crate::distributed::RunOutcome;
use crate::graph::Graph;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Solver version tag written into every record
pub fn solver_version() -> String {
    format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

/// Run parameters that are not part of the coordinator's outcome
#[derive(Debug, Clone)]
pub struct RunMetadata {
    pub instance: String,
    /// Command line as typed
    pub invocation: String,
    pub time_limit_secs: u64,
    pub processes: usize,
}

/// Final record of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub instance: String,
    pub invocation: String,
    pub solver_version: String,
    pub vertices: usize,
    pub edges: usize,
    pub time_limit_secs: u64,
    pub processes: usize,
    pub elapsed_secs: f64,
    pub within_time_limit: bool,
    pub colors_used: u32,
    pub lower_bound: u32,
    /// True iff the clique search ran to completion
    pub lower_bound_exhaustive: bool,
    pub solved_during_frontier: bool,
    /// coloring[v]: color of vertex v (0-based vertex, colors from 1)
    pub coloring: Vec<u32>,
}

impl RunReport {
    pub fn new(graph: &Graph, outcome: &RunOutcome, metadata: RunMetadata) -> Self {
        Self {
            instance: metadata.instance,
            invocation: metadata.invocation,
            solver_version: solver_version(),
            vertices: graph.n(),
            edges: graph.edge_count(),
            time_limit_secs: metadata.time_limit_secs,
            processes: metadata.processes,
            elapsed_secs: outcome.elapsed.as_secs_f64(),
            within_time_limit: outcome.within_time_limit,
            colors_used: outcome.colors_used(),
            lower_bound: outcome.lower_bound.size as u32,
            lower_bound_exhaustive: outcome.lower_bound.exhaustive,
            solved_during_frontier: outcome.solved_during_frontier,
            coloring: outcome.coloring.colors().to_vec(),
        }
    }

    /// True iff the color count matches the clique bound
    pub fn proven_optimal(&self) -> bool {
        self.colors_used == self.lower_bound
    }
}

/// Files written for one record
#[derive(Debug, Clone)]
pub struct PersistedRecord {
    pub text: PathBuf,
    pub json: Option<PathBuf>,
}

/// `<output_dir>/optimal` for runs that finished within the time limit,
/// `<output_dir>/time_limit` otherwise
pub fn result_dir(output_dir: &Path, within_time_limit: bool) -> PathBuf {
    output_dir.join(if within_time_limit { "optimal" } else { "time_limit" })
}

/// Write the text record (and the JSON copy if enabled), creating the
/// result directory if needed.
pub fn persist(report: &RunReport, output: &OutputConfig) -> Result<PersistedRecord> {
    let dir = result_dir(&output.output_dir, report.within_time_limit);
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create result directory: {}", dir.display()))?;

    let stem = format!(
        "{}_{}",
        report.instance,
        chrono::Local::now().format("%Y%m%d_%H%M%S_%3f")
    );

    let text = dir.join(format!("{}.txt", stem));
    text::write_record(&text, report)?;

    let json = if output.json {
        let path = dir.join(format!("{}.json", stem));
        json::write_json_output(&path, report, true)?;
        Some(path)
    } else {
        None
    };

    Ok(PersistedRecord { text, json })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_report(within_time_limit: bool) -> RunReport {
        RunReport {
            instance: "myciel3".to_string(),
            invocation: "chromabound myciel3.col -t 60".to_string(),
            solver_version: solver_version(),
            vertices: 4,
            edges: 4,
            time_limit_secs: 60,
            processes: 3,
            elapsed_secs: 0.25,
            within_time_limit,
            colors_used: 2,
            lower_bound: 2,
            lower_bound_exhaustive: true,
            solved_during_frontier: false,
            coloring: vec![1, 2, 1, 2],
        }
    }

    #[test]
    fn test_result_dir() {
        let root = Path::new("results");
        assert_eq!(result_dir(root, true), PathBuf::from("results/optimal"));
        assert_eq!(result_dir(root, false), PathBuf::from("results/time_limit"));
    }

    #[test]
    fn test_persist_creates_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let output = OutputConfig {
            output_dir: tmp.path().join("nested"),
            json: true,
        };

        let record = persist(&sample_report(false), &output).unwrap();
        assert!(record.text.starts_with(tmp.path().join("nested/time_limit")));
        assert!(record.text.exists());
        let name = record.text.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("myciel3_") && name.ends_with(".txt"));

        let json = record.json.unwrap();
        assert!(json.exists());
        let parsed: RunReport = serde_json::from_str(&fs::read_to_string(json).unwrap()).unwrap();
        assert_eq!(parsed, sample_report(false));
    }

    #[test]
    fn test_persist_without_json() {
        let tmp = tempfile::tempdir().unwrap();
        let output = OutputConfig {
            output_dir: tmp.path().to_path_buf(),
            json: false,
        };
        let record = persist(&sample_report(true), &output).unwrap();
        assert!(record.text.starts_with(tmp.path().join("optimal")));
        assert!(record.json.is_none());
    }
}
