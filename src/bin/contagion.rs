//! Default Cascade Simulation Binary
//!
//! Builds balance sheets for one or more interbank networks and reports how
//! many banks default after a shock.
//!
//! ## Usage
//! ```bash
//! # shock bank 0 of one network
//! cargo run --bin contagion --release -- --graph network.json --node 0
//!
//! # average over every origin, several networks in parallel
//! cargo run --bin contagion --release -- --graph a.json --graph b.json --gamma 0.03
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use interbank_contagion::batch::{BatchConfig, BatchRunner};
use interbank_contagion::config::ContagionRequest;
use interbank_contagion::io::{load_graph, read_json};

#[derive(Parser, Debug)]
#[command(name = "contagion")]
struct Cli {
    /// Network in the graph exchange format; repeat for a batch.
    #[arg(long = "graph", required = true)]
    graphs: Vec<PathBuf>,

    /// JSON contagion request; flags below override its fields.
    #[arg(long)]
    request: Option<PathBuf>,

    /// Total external assets E.
    #[arg(long)]
    external_assets: Option<f64>,

    /// Net-worth fraction of total assets.
    #[arg(long)]
    gamma: Option<f64>,

    /// Interbank fraction of total assets.
    #[arg(long)]
    theta: Option<f64>,

    #[arg(long)]
    shock: Option<f64>,

    /// Bank hit by the shock; every bank in turn when omitted.
    #[arg(long)]
    node: Option<usize>,

    #[arg(long)]
    epsilon: Option<f64>,

    #[arg(long)]
    threads: Option<usize>,
}

fn build_request(cli: &Cli) -> interbank_contagion::Result<ContagionRequest> {
    let mut request: ContagionRequest = match &cli.request {
        Some(path) => read_json(path)?,
        None => ContagionRequest::default(),
    };
    if let Some(e) = cli.external_assets {
        request.params.external_assets = e;
    }
    if let Some(gamma) = cli.gamma {
        request.params.gamma = gamma;
    }
    if let Some(theta) = cli.theta {
        request.params.theta = theta;
    }
    if let Some(shock) = cli.shock {
        request.shock_size = shock;
    }
    if cli.node.is_some() {
        request.shock_node = cli.node;
    }
    if let Some(epsilon) = cli.epsilon {
        request.cascade.epsilon = epsilon;
    }
    Ok(request)
}

fn main() -> interbank_contagion::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let request = build_request(&cli)?;
    let graphs = cli
        .graphs
        .iter()
        .map(|path| load_graph(path))
        .collect::<interbank_contagion::Result<Vec<_>>>()?;

    println!("=======================================================");
    println!("  Interbank Default Cascade");
    println!("=======================================================");
    println!();
    println!("Parameters:");
    println!(
        "  E: {:.0}, gamma: {}, theta: {}",
        request.params.external_assets, request.params.gamma, request.params.theta
    );
    match request.shock_node {
        Some(node) => println!("  Shock: {:.0} on bank {}", request.shock_size, node),
        None => println!("  Shock: {:.0} on every bank in turn", request.shock_size),
    }
    println!();

    let runner = BatchRunner::new(BatchConfig { threads: cli.threads });
    let reports = request.run_batch(&runner, &graphs)?;

    let mut failure = None;
    println!("| Network                  | Banks | Defaults | Fraction |");
    println!("|--------------------------|-------|----------|----------|");
    for (path, report) in cli.graphs.iter().zip(reports) {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match report {
            Some(Ok(report)) => println!(
                "| {:24} | {:5} | {:8.2} | {:7.1}% |",
                name,
                report.banks,
                report.defaults,
                report.default_fraction * 100.0
            ),
            Some(Err(e)) => {
                error!(graph = %path.display(), error = %e, "contagion run failed");
                println!("| {:24} | {:>5} | {:>8} | {:>8} |", name, "-", "failed", "-");
                failure.get_or_insert(e);
            }
            None => println!("| {:24} | {:>5} | {:>8} | {:>8} |", name, "-", "skipped", "-"),
        }
    }

    match failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
