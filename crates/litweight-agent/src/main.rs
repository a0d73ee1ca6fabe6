//! litweight — Literature-support edge weights for biomedical subgraphs.
//! Entry point for the command-line binary.

mod config;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use litweight_ingestion::sources::pubmed::EntrezClient;
use litweight_kg::Subgraph;
use litweight_ranker::calculate_edge_weights;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Weight every edge of a knowledge-graph subgraph by the literature behind it.
#[derive(Debug, Parser)]
#[command(name = "litweight", version)]
struct Cli {
    /// Subgraph JSON document (`nodes`, `links`, optional `categories`).
    subgraph: PathBuf,

    /// Run name used for output files; defaults to the subgraph file stem.
    #[arg(long)]
    name: Option<String>,

    /// Configuration file.
    #[arg(long, env = "LITWEIGHT_CONFIG", default_value = config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Overrides `[output].dir`.
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

impl Cli {
    fn run_name(&self) -> anyhow::Result<String> {
        if let Some(name) = &self.name {
            return Ok(name.clone());
        }
        self.subgraph
            .file_stem()
            .and_then(|s| s.to_str())
            .map(String::from)
            .with_context(|| format!("cannot derive a run name from {}", self.subgraph.display()))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Initialise structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("litweight=debug,info")),
        )
        .init();

    info!("litweight {} starting", env!("CARGO_PKG_VERSION"));

    let mut config = config::Config::load(&cli.config)?;
    if let Some(dir) = &cli.output_dir {
        config.output.dir = dir.clone();
    }
    let name = cli.run_name()?;

    let subgraph = Subgraph::from_path(&cli.subgraph)
        .with_context(|| format!("loading subgraph {}", cli.subgraph.display()))?;
    info!(
        subgraph = %cli.subgraph.display(),
        name = %name,
        nodes = subgraph.nodes.len(),
        links = subgraph.links.len(),
        categories = ?subgraph.category_counts(),
        "Subgraph loaded"
    );

    let client = EntrezClient::new(config.entrez.clone())?;
    let output = calculate_edge_weights(&client, &subgraph, &name, &config.pipeline()).await?;

    info!(
        edges = output.rows.len(),
        weights = %output.csv_path.display(),
        records = %output.record_cache_path.display(),
        "Done"
    );
    Ok(())
}
