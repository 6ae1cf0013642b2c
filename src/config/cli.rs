//! CLI argument parsing using clap

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Execution mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExecutionMode {
    /// Local mode (default) - every rank runs in this process
    Local,
    /// Coordinator mode - rank 0, waits for workers over TCP
    Coordinator,
    /// Worker mode - joins a coordinator over TCP
    Worker,
}

/// chromabound - exact distributed graph coloring
#[derive(Parser, Debug)]
#[command(name = "chromabound")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Execution mode: local, coordinator, or worker
    #[arg(long, value_enum, default_value = "local")]
    pub mode: ExecutionMode,

    /// Graph file in DIMACS edge format
    ///
    /// Not used in worker mode (the coordinator sends the graph)
    #[arg(value_name = "INPUT", conflicts_with = "random")]
    pub input: Option<PathBuf>,

    /// Wall-clock budget (e.g., 600, 90s, 10m, 1h)
    #[arg(short = 't', long)]
    pub time_limit: Option<String>,

    /// Group size: coordinator plus workers (at least 2)
    #[arg(short = 'p', long)]
    pub processes: Option<usize>,

    /// Address to accept workers on (coordinator mode only)
    #[arg(long, default_value = "0.0.0.0:7070")]
    pub listen: String,

    /// Coordinator address (worker mode only)
    #[arg(long)]
    pub connect: Option<String>,

    // === Random instances ===
    /// Generate a random G(n, p) graph with this many vertices
    #[arg(long, value_name = "N")]
    pub random: Option<usize>,

    /// Edge probability for --random
    #[arg(long, default_value = "0.5")]
    pub density: f64,

    /// Seed for --random
    #[arg(long, default_value = "1")]
    pub seed: u64,

    // === Output ===
    /// Root directory for result records
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Also write a JSON copy of the result record
    #[arg(long)]
    pub json: bool,

    /// TOML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    // === Tuning ===
    /// Clique recursion depth that still forks parallel tasks
    #[arg(long)]
    pub clique_task_depth: Option<usize>,

    /// Vertex count from which the saturation scan runs in parallel
    #[arg(long)]
    pub parallel_threshold: Option<usize>,

    /// Skip the greedy clique seed
    #[arg(long)]
    pub no_greedy_clique: bool,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate CLI arguments
    pub fn validate(&self) -> anyhow::Result<()> {
        // Worker mode gets everything else from the coordinator
        if self.mode == ExecutionMode::Worker {
            if self.connect.is_none() {
                anyhow::bail!("worker mode requires --connect <ADDR>");
            }
            return Ok(());
        }

        if self.input.is_none() && self.random.is_none() {
            anyhow::bail!("must specify an INPUT graph file or --random <N>");
        }

        if self.random.is_some() && !(0.0..=1.0).contains(&self.density) {
            anyhow::bail!("density must be between 0.0 and 1.0");
        }

        Ok(())
    }
}
