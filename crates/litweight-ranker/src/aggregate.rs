//! Weight table: joins the five per-edge mappings and writes them as CSV.

use std::fs;
use std::path::Path;

use litweight_common::{LitweightError, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::scorer::EdgeWeights;

/// Column names read by the graph plotting tooling.
pub const CSV_HEADER: [&str; 6] = [
    "Edge",
    "Original_Weight",
    "Boltzmann_Citation_Weight",
    "Publication_Year_Weight",
    "Publication_Year_and_Citation_Weight",
    "H_Index_Weight",
];

/// One row of the weight table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeWeightRow {
    #[serde(rename = "Edge")]
    pub edge: String,
    /// Identifier density.
    #[serde(rename = "Original_Weight")]
    pub density: f64,
    #[serde(rename = "Boltzmann_Citation_Weight")]
    pub citation: f64,
    #[serde(rename = "Publication_Year_Weight")]
    pub recency: f64,
    #[serde(rename = "Publication_Year_and_Citation_Weight")]
    pub combined: f64,
    #[serde(rename = "H_Index_Weight")]
    pub authority: f64,
}

/// The five scorer outputs for one subgraph.
#[derive(Debug, Clone, Default)]
pub struct EdgeWeightSet {
    pub density: EdgeWeights,
    pub citation: EdgeWeights,
    pub recency: EdgeWeights,
    pub combined: EdgeWeights,
    pub authority: EdgeWeights,
}

impl EdgeWeightSet {
    /// One row per key of the combined mapping, sorted by key.
    ///
    /// A key the combined mapping has but another mapping lacks is a
    /// `Pipeline` error rather than a dropped row.
    pub fn join(&self) -> Result<Vec<EdgeWeightRow>> {
        self.combined
            .iter()
            .map(|(edge, &combined)| {
                Ok(EdgeWeightRow {
                    edge: edge.clone(),
                    density: lookup(&self.density, "density", edge)?,
                    citation: lookup(&self.citation, "citation", edge)?,
                    recency: lookup(&self.recency, "recency", edge)?,
                    combined,
                    authority: lookup(&self.authority, "authority", edge)?,
                })
            })
            .collect()
    }
}

fn lookup(weights: &EdgeWeights, scorer: &str, edge: &str) -> Result<f64> {
    weights.get(edge).copied().ok_or_else(|| {
        LitweightError::Pipeline(format!("{} weights have no entry for edge {}", scorer, edge))
    })
}

/// Write `rows` to `path`, replacing any previous table.
pub fn write_csv(path: &Path, rows: &[EdgeWeightRow]) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }

    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    wtr.write_record(CSV_HEADER)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;

    info!(path = %path.display(), rows = rows.len(), "Wrote edge weight table");
    Ok(())
}
