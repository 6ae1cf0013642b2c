//! chromabound CLI entry point

use anyhow::{Context, Result};
use chromabound::config::cli::{Cli, ExecutionMode};
use chromabound::config::cli_convert::GraphSource;
use chromabound::config::toml::load_config;
use chromabound::config::{validator, SolverConfig};
use chromabound::distributed::{self, tcp, Coordinator, RunOutcome, Worker};
use chromabound::graph::Graph;
use chromabound::output::{self, text, RunMetadata, RunReport};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    let cli = Cli::parse_args();
    init_tracing(cli.debug);
    cli.validate()?;

    println!("chromabound v{}", env!("CARGO_PKG_VERSION"));
    println!("Exact distributed graph coloring");
    println!();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start tokio runtime")?;

    match cli.mode {
        ExecutionMode::Local => runtime.block_on(run_local(cli)),
        ExecutionMode::Coordinator => runtime.block_on(run_coordinator(cli)),
        ExecutionMode::Worker => runtime.block_on(run_worker(cli)),
    }
}

/// `RUST_LOG` wins; otherwise `info`, or `debug` with `--debug`
fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default.into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Everything the coordinator side needs before the group starts
struct Prepared {
    config: SolverConfig,
    graph: Arc<Graph>,
    instance: String,
}

fn prepare(cli: &Cli) -> Result<Prepared> {
    let config = load_config(cli)?;
    validator::validate_config(&config).context("Configuration validation failed")?;

    let source = GraphSource::from_cli(cli)?;
    let instance = source.instance_name();
    let graph = source.load()?;

    println!("Instance:   {}", instance);
    println!("  Vertices: {}, Edges: {}", graph.n(), graph.edge_count());
    println!("Processes:  {} (1 coordinator + {} workers)", config.processes, config.processes - 1);
    if let Some(limit) = config.time_limit_secs {
        println!("Time limit: {}s", limit);
    }
    println!();

    Ok(Prepared {
        config,
        graph: Arc::new(graph),
        instance,
    })
}

fn report(prepared: &Prepared, outcome: &RunOutcome) -> Result<()> {
    let metadata = RunMetadata {
        instance: prepared.instance.clone(),
        invocation: std::env::args().collect::<Vec<_>>().join(" "),
        time_limit_secs: prepared.config.time_limit_secs.unwrap_or_default(),
        processes: prepared.config.processes,
    };
    let report = RunReport::new(&prepared.graph, outcome, metadata);
    text::print_summary(&report);

    let record = output::persist(&report, &prepared.config.output)?;
    println!("Result written to: {}", record.text.display());
    if let Some(json) = record.json {
        println!("JSON written to:   {}", json.display());
    }
    Ok(())
}

/// Run every rank inside this process
async fn run_local(cli: Cli) -> Result<()> {
    let prepared = prepare(&cli)?;
    let settings = prepared.config.run_settings()?;

    let outcome = distributed::run_local_group(
        prepared.graph.clone(),
        &prepared.instance,
        prepared.config.processes,
        settings,
    )
    .await?;

    report(&prepared, &outcome)
}

/// Rank 0 of a TCP group
async fn run_coordinator(cli: Cli) -> Result<()> {
    let prepared = prepare(&cli)?;
    let settings = prepared.config.run_settings()?;

    let listener = tokio::net::TcpListener::bind(&cli.listen)
        .await
        .with_context(|| format!("Failed to listen on {}", cli.listen))?;
    println!("Coordinator listening on {}", cli.listen);
    let link = tcp::accept_workers(&listener, prepared.config.processes - 1).await?;
    println!();

    let outcome = Coordinator::new(link, prepared.graph.clone(), prepared.instance.clone(), settings)
        .run()
        .await?;

    report(&prepared, &outcome)
}

/// Rank r of a TCP group
async fn run_worker(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    validator::validate_search(&config.search)?;

    let addr = cli.connect.as_deref().context("worker mode requires --connect <ADDR>")?;
    println!("Connecting to coordinator at {}...", addr);
    let link = tcp::connect_worker(addr).await?;

    let summary = Worker::new(link, config.search_settings()).run().await?;
    println!(
        "Worker {} done: {} nodes expanded, {} improvements",
        summary.rank, summary.expanded, summary.improvements
    );
    Ok(())
}
