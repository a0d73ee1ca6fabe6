//! Edge-weight pipeline.
//!
//! Stages:
//!   1. Build the run context from the subgraph
//!   2. Collect citation metadata (record cache)
//!   3. Score author authority (author cache)
//!   4. Compute the five edge weights
//!   5. Join and write the weight table

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Instant;

use litweight_common::Result;
use litweight_ingestion::sources::LiteratureApi;
use litweight_ingestion::MetadataCollector;
use litweight_kg::{RunContext, Subgraph};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::aggregate::{write_csv, EdgeWeightRow, EdgeWeightSet};
use crate::hindex::{AuthorityScorer, AuthoritySearchConfig};
use crate::scorer::ScoringInputs;
use crate::weights::WeightConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Root under which `{name}/` holds the record cache and weight table.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub authors: AuthoritySearchConfig,
    #[serde(default)]
    pub weights: WeightConfig,
}

fn default_output_dir() -> PathBuf { PathBuf::from("output") }

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            authors: AuthoritySearchConfig::default(),
            weights: WeightConfig::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub rows: Vec<EdgeWeightRow>,
    pub weights: EdgeWeightSet,
    pub csv_path: PathBuf,
    pub record_cache_path: PathBuf,
}

/// Compute and persist the literature-support weights of every edge in
/// `subgraph`, fetching whatever metadata the caches do not hold yet.
#[instrument(skip(api, subgraph, config))]
pub async fn calculate_edge_weights<A: LiteratureApi + ?Sized>(
    api: &A,
    subgraph: &Subgraph,
    name: &str,
    config: &PipelineConfig,
) -> Result<PipelineOutput> {
    let start = Instant::now();
    config.weights.validate()?;

    let ctx = RunContext::new(name, subgraph)?;
    info!(
        edges = ctx.edges().len(),
        identifiers = ctx.total_identifiers(),
        "Starting edge weight calculation"
    );

    // ── Stage 2: citation metadata ──
    let record_cache_path = ctx.record_cache_path(&config.output_dir);
    let records = MetadataCollector::new(api, &record_cache_path)
        .collect(ctx.identifiers())
        .await?;
    info!(records = records.len(), "Metadata collection complete");

    // ── Stage 3: author authority ──
    let mut authors = BTreeSet::new();
    for id in ctx.identifiers() {
        authors.extend(records.require(id)?.authors.iter().cloned());
    }
    let authors: Vec<String> = authors.into_iter().collect();
    let h_indices = AuthorityScorer::new(api, &config.authors).score(&authors).await?;
    info!(authors = h_indices.len(), "Authority scoring complete");

    // ── Stage 4: edge weights ──
    let inputs = ScoringInputs::new(&ctx, &records, &h_indices, &config.weights);
    let weights = EdgeWeightSet {
        density: inputs.density()?,
        citation: inputs.citation()?,
        recency: inputs.recency()?,
        combined: inputs.combined()?,
        authority: inputs.authority()?,
    };
    info!(
        edges = weights.combined.len(),
        reference_year = config.weights.reference_year(),
        "Edge weights computed"
    );

    // ── Stage 5: weight table ──
    let rows = weights.join()?;
    let csv_path = ctx.weights_path(&config.output_dir);
    write_csv(&csv_path, &rows)?;

    info!(
        rows = rows.len(),
        path = %csv_path.display(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Edge weight calculation complete"
    );

    Ok(PipelineOutput {
        rows,
        weights,
        csv_path,
        record_cache_path,
    })
}
