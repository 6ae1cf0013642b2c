//! TOML configuration file parsing

use super::*;
use crate::config::cli::Cli;
use crate::config::cli_convert::parse_time_limit;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Parse TOML configuration file
pub fn parse_toml_file(path: &Path) -> Result<SolverConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_toml_string(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse TOML configuration from string
pub fn parse_toml_string(contents: &str) -> Result<SolverConfig> {
    let config: SolverConfig = ::toml::from_str(contents).context("Failed to parse TOML configuration")?;

    Ok(config)
}

/// Merge CLI arguments with TOML configuration (CLI takes precedence)
pub fn merge_cli_with_config(cli: &Cli, mut config: SolverConfig) -> Result<SolverConfig> {
    if let Some(limit) = &cli.time_limit {
        config.time_limit_secs = Some(parse_time_limit(limit)?);
    }
    if let Some(processes) = cli.processes {
        config.processes = processes;
    }

    if let Some(depth) = cli.clique_task_depth {
        config.search.clique_task_depth = depth;
    }
    if let Some(threshold) = cli.parallel_threshold {
        config.search.parallel_saturation_threshold = threshold;
    }
    if cli.no_greedy_clique {
        config.search.greedy_clique_seed = false;
    }

    if let Some(dir) = &cli.output_dir {
        config.output.output_dir = dir.clone();
    }
    if cli.json {
        config.output.json = true;
    }

    Ok(config)
}

/// Load the configuration file named by `--config` (or defaults) and apply
/// the CLI overrides.
pub fn load_config(cli: &Cli) -> Result<SolverConfig> {
    let base = match &cli.config {
        Some(path) => parse_toml_file(path)?,
        None => SolverConfig::default(),
    };
    merge_cli_with_config(cli, base)
}
