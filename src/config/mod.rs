//! Configuration module
//!
//! Handles CLI argument parsing, TOML configuration files, and validation.
//! A TOML file (`--config`) provides the base configuration; CLI flags
//! override it field by field.

pub mod cli;
pub mod cli_convert;
pub mod toml;
pub mod validator;

use crate::clique::CliqueSettings;
use crate::distributed::RunSettings;
use crate::search::SearchSettings;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Complete solver configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Wall-clock budget in seconds (required, from file or `--time-limit`)
    #[serde(default)]
    pub time_limit_secs: Option<u64>,
    /// Group size P (coordinator plus P-1 workers)
    #[serde(default = "default_processes")]
    pub processes: usize,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Search and clique engine tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Clique recursion depth below which branches fork onto the rayon pool
    #[serde(default = "default_clique_task_depth")]
    pub clique_task_depth: usize,
    /// Vertex count from which the saturation scan runs in parallel
    #[serde(default = "default_parallel_saturation_threshold")]
    pub parallel_saturation_threshold: usize,
    /// Seed the clique search with a greedy clique
    #[serde(default = "default_true")]
    pub greedy_clique_seed: bool,
}

/// Result persistence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Root directory for `optimal/` and `time_limit/` records
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Also write a JSON copy of each record
    #[serde(default)]
    pub json: bool,
}

fn default_processes() -> usize {
    num_cpus::get().max(2)
}

fn default_clique_task_depth() -> usize {
    2
}

fn default_parallel_saturation_threshold() -> usize {
    512
}

fn default_true() -> bool {
    true
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("results")
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            time_limit_secs: None,
            processes: default_processes(),
            search: SearchConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            clique_task_depth: default_clique_task_depth(),
            parallel_saturation_threshold: default_parallel_saturation_threshold(),
            greedy_clique_seed: default_true(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            json: false,
        }
    }
}

impl SolverConfig {
    pub fn search_settings(&self) -> SearchSettings {
        SearchSettings {
            parallel_saturation_threshold: self.search.parallel_saturation_threshold,
        }
    }

    pub fn clique_settings(&self) -> CliqueSettings {
        CliqueSettings {
            task_depth: self.search.clique_task_depth,
            greedy_seed: self.search.greedy_clique_seed,
        }
    }

    /// Settings handed to the coordinator. Fails if no time limit is set.
    pub fn run_settings(&self) -> Result<RunSettings> {
        let secs = self.time_limit_secs.context("A time limit is required (--time-limit)")?;
        Ok(RunSettings {
            time_limit: Duration::from_secs(secs),
            search: self.search_settings(),
            clique: self.clique_settings(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SolverConfig::default();
        assert!(config.processes >= 2);
        assert_eq!(config.search.clique_task_depth, 2);
        assert_eq!(config.search.parallel_saturation_threshold, 512);
        assert!(config.search.greedy_clique_seed);
        assert_eq!(config.output.output_dir, PathBuf::from("results"));
        assert!(!config.output.json);
    }

    #[test]
    fn test_run_settings_requires_time_limit() {
        let mut config = SolverConfig::default();
        assert!(config.run_settings().is_err());

        config.time_limit_secs = Some(90);
        config.search.clique_task_depth = 0;
        let settings = config.run_settings().unwrap();
        assert_eq!(settings.time_limit, Duration::from_secs(90));
        assert_eq!(settings.clique.task_depth, 0);
        assert!(settings.clique.greedy_seed);
        assert_eq!(settings.search.parallel_saturation_threshold, 512);
    }
}
