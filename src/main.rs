//! convgraph: compile a layer definition file and a parameter file and
//! report the resulting graph.
//!
//! This is the CLI binary entry point.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use convgraph::layer_types;
use convgraph::{CompileOptions, GraphBuilder, LayerGraph, LayerKindRegistry};

/// Layer-graph compiler CLI.
#[derive(Parser, Debug)]
#[command(
    name = "convgraph",
    about = "Compile convolutional-network layer files into a checked layer graph",
    version
)]
struct Cli {
    /// Layer definition file.
    #[arg(long)]
    layer_def: PathBuf,

    /// Layer parameter file.
    #[arg(long)]
    layer_params: PathBuf,

    /// Width of each data channel, in data-index order.
    #[arg(long, value_delimiter = ',', required = true)]
    data_dims: Vec<usize>,

    /// Seed for weight initialization.
    #[arg(long)]
    seed: Option<u64>,

    /// Logistic regression cost layer to check for, e.g. for multiview testing.
    #[arg(long)]
    logreg_name: Option<String>,
}

fn main() {
    // Initialise tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    tracing::info!("convgraph v{}", env!("CARGO_PKG_VERSION"));

    if let Err(err) = run(&cli) {
        tracing::error!("{:#}", err);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let registry = LayerKindRegistry::with_builtin_kinds();
    let options = CompileOptions { seed: cli.seed };
    let graph = GraphBuilder::new(&registry)
        .with_options(options)
        .build_files(&cli.layer_def, &cli.layer_params, &cli.data_dims, None)
        .with_context(|| format!("failed to compile '{}'", cli.layer_def.display()))?;

    if let Some(name) = &cli.logreg_name {
        check_logreg(&graph, name)?;
    }

    report(&graph);
    Ok(())
}

fn check_logreg(graph: &LayerGraph, name: &str) -> anyhow::Result<()> {
    match graph.get(name) {
        Some(layer) if layer.layer_type == layer_types::LOGREG_COST => Ok(()),
        Some(layer) => bail!(
            "layer '{}' is of type '{}', not a logistic regression cost",
            name,
            layer.layer_type
        ),
        None => bail!("no logistic regression cost layer called '{}'", name),
    }
}

fn report(graph: &LayerGraph) {
    tracing::info!("{} layers, {} parameters", graph.len(), graph.param_count());
    for layer in graph {
        let inputs: Vec<&str> = layer
            .inputs
            .iter()
            .map(|&i| graph[i].name.as_str())
            .collect();
        tracing::info!(
            "  {} ({}) <- [{}]: {} outputs",
            layer.name,
            layer.layer_type,
            inputs.join(", "),
            layer.num_outputs,
        );
        for (i, stats) in layer.weight_stats().iter().enumerate() {
            tracing::info!(
                "    weights[{}]: mean |w| {:.6e}, mean |inc| {:.6e}",
                i,
                stats.mean_abs,
                stats.inc_mean_abs,
            );
        }
    }
    tracing::info!("Done.");
}
