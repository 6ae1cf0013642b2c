//! Human-readable text output

use super::RunReport;
use anyhow::{Context, Result};
use std::fmt;
use std::fs;
use std::path::Path;

/// Text record: one `key: value` line per field, then one
/// `vertex color` line per vertex (1-based vertex ids, as in DIMACS).
pub fn format_record(report: &RunReport) -> String {
    Record(report).to_string()
}

struct Record<'a>(&'a RunReport);

impl fmt::Display for Record<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        writeln!(f, "instance: {}", report.instance)?;
        writeln!(f, "invocation: {}", report.invocation)?;
        writeln!(f, "solver_version: {}", report.solver_version)?;
        writeln!(f, "vertices: {}", report.vertices)?;
        writeln!(f, "edges: {}", report.edges)?;
        writeln!(f, "time_limit_secs: {}", report.time_limit_secs)?;
        writeln!(f, "processes: {}", report.processes)?;
        writeln!(f, "elapsed_secs: {:.3}", report.elapsed_secs)?;
        writeln!(f, "within_time_limit: {}", report.within_time_limit)?;
        writeln!(f, "colors_used: {}", report.colors_used)?;
        for (v, color) in report.coloring.iter().enumerate() {
            writeln!(f, "{} {}", v + 1, color)?;
        }
        Ok(())
    }
}

/// Write the text record to `path`
pub fn write_record(path: &Path, report: &RunReport) -> Result<()> {
    fs::write(path, format_record(report))
        .with_context(|| format!("Failed to write result file: {}", path.display()))
}

/// Print run results to console
pub fn print_summary(report: &RunReport) {
    println!("═══════════════════════════════════════════════════════════");
    println!("                    RUN RESULTS");
    println!("═══════════════════════════════════════════════════════════");
    println!();
    println!("Instance:     {} ({} vertices, {} edges)", report.instance, report.vertices, report.edges);
    println!("Processes:    {}", report.processes);
    println!("Elapsed Time: {:.3}s (limit {}s)", report.elapsed_secs, report.time_limit_secs);
    println!();
    println!("Colors used:  {}", report.colors_used);
    println!(
        "Lower bound:  {}{}",
        report.lower_bound,
        if report.lower_bound_exhaustive { "" } else { " (clique search interrupted)" }
    );
    if report.within_time_limit {
        println!("Status:       ✅ search completed within the time limit");
    } else {
        println!("Status:       ⚠️  time limit reached, best coloring found so far");
    }
    if report.proven_optimal() {
        println!("              optimal (matches the clique bound)");
    }
    if report.solved_during_frontier {
        println!("              solved while building the frontier");
    }
    println!();
}
