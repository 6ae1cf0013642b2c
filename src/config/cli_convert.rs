//! CLI to configuration conversion utilities

use crate::config::cli::Cli;
use crate::graph::{dimacs, random, Graph};
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Parse a time limit (e.g., "600", "90s", "10m", "1h") to whole seconds.
///
/// Negative and fractional values are rejected.
pub fn parse_time_limit(s: &str) -> Result<u64> {
    let s = s.trim().to_lowercase();
    if s.is_empty() {
        anyhow::bail!("Empty time limit");
    }

    let (num_str, multiplier) = if let Some(num) = s.strip_suffix("s") {
        (num, 1u64)
    } else if let Some(num) = s.strip_suffix("m") {
        (num, 60)
    } else if let Some(num) = s.strip_suffix("h") {
        (num, 3600)
    } else {
        (s.as_str(), 1)
    };

    let num: u64 = num_str
        .parse()
        .with_context(|| format!("Invalid time limit: {} (expected a non-negative integer)", s))?;

    num.checked_mul(multiplier)
        .with_context(|| format!("Time limit out of range: {}", s))
}

/// Where the graph comes from
#[derive(Debug, Clone, PartialEq)]
pub enum GraphSource {
    File(PathBuf),
    Random { n: usize, density: f64, seed: u64 },
}

impl GraphSource {
    /// Pick the graph source named on the command line
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        match (&cli.input, cli.random) {
            (Some(path), None) => Ok(GraphSource::File(path.clone())),
            (None, Some(n)) => Ok(GraphSource::Random {
                n,
                density: cli.density,
                seed: cli.seed,
            }),
            (Some(_), Some(_)) => anyhow::bail!("INPUT and --random are mutually exclusive"),
            (None, None) => anyhow::bail!("must specify an INPUT graph file or --random <N>"),
        }
    }

    /// Instance name used in logs and result file names
    pub fn instance_name(&self) -> String {
        match self {
            GraphSource::File(path) => dimacs::instance_name(path),
            GraphSource::Random { n, density, seed } => random::instance_name(*n, *density, *seed),
        }
    }

    pub fn load(&self) -> Result<Graph> {
        match self {
            GraphSource::File(path) => dimacs::read_dimacs(path),
            GraphSource::Random { n, density, seed } => {
                random::random_graph(*n, *density, *seed).context("Failed to generate random graph")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_parse_time_limit() {
        assert_eq!(parse_time_limit("600").unwrap(), 600);
        assert_eq!(parse_time_limit("90s").unwrap(), 90);
        assert_eq!(parse_time_limit("10m").unwrap(), 600);
        assert_eq!(parse_time_limit("1H").unwrap(), 3600);
        assert_eq!(parse_time_limit("0").unwrap(), 0);
    }

    #[test]
    fn test_parse_time_limit_rejects_bad_values() {
        assert!(parse_time_limit("-5").is_err());
        assert!(parse_time_limit("1.5").is_err());
        assert!(parse_time_limit("").is_err());
        assert!(parse_time_limit("abc").is_err());
        assert!(parse_time_limit("5d").is_err());
    }

    #[test]
    fn test_graph_source_from_cli() {
        let cli = Cli::try_parse_from(["chromabound", "data/queen5_5.col"]).unwrap();
        let source = GraphSource::from_cli(&cli).unwrap();
        assert_eq!(source, GraphSource::File(PathBuf::from("data/queen5_5.col")));
        assert_eq!(source.instance_name(), "queen5_5");

        let cli = Cli::try_parse_from(["chromabound", "--random", "12", "--seed", "3"]).unwrap();
        let source = GraphSource::from_cli(&cli).unwrap();
        assert_eq!(source, GraphSource::Random { n: 12, density: 0.5, seed: 3 });
        assert_eq!(source.load().unwrap().n(), 12);
    }
}
