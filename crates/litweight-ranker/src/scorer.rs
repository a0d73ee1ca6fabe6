//! The five edge-weight scorers.
//!
//! Every scorer walks the same [`RunContext::edges`], reads only from the
//! populated caches and returns one weight per edge identity. An edge with no
//! citation identifiers always weighs 0. A later edge with the same identity
//! overwrites an earlier one.

use std::collections::{BTreeMap, HashMap};

use litweight_common::{LitweightError, Result};
use litweight_ingestion::{CitationRecord, RecordCache};
use litweight_kg::{EdgeEvidence, RunContext};

use crate::hindex::normalise_author_name;
use crate::normalise::{authority_curve, citation_curve, recency_curve};
use crate::weights::WeightConfig;

/// Edge identity → weight.
pub type EdgeWeights = BTreeMap<String, f64>;

/// Everything the scorers read, gathered once after collection and authority scoring.
pub struct ScoringInputs<'a> {
    pub ctx: &'a RunContext,
    pub records: &'a RecordCache,
    pub h_indices: &'a HashMap<String, i64>,
    pub config: &'a WeightConfig,
}

impl<'a> ScoringInputs<'a> {
    pub fn new(
        ctx: &'a RunContext,
        records: &'a RecordCache,
        h_indices: &'a HashMap<String, i64>,
        config: &'a WeightConfig,
    ) -> Self {
        Self { ctx, records, h_indices, config }
    }

    /// Share of the subgraph's distinct identifiers cited by each edge.
    pub fn density(&self) -> Result<EdgeWeights> {
        let total = self.ctx.total_identifiers();
        per_edge(self.ctx, |edge| {
            if total == 0 {
                return Ok(0.0);
            }
            Ok(edge.citation_ids.len() as f64 / total as f64)
        })
    }

    /// Σ forward citations of the edge, relative to the most-cited identifier
    /// in the subgraph.
    pub fn citation(&self) -> Result<EdgeWeights> {
        let mut max_count = 0usize;
        for id in self.ctx.identifiers() {
            max_count = max_count.max(self.records.require(id)?.citation_count());
        }
        let denom = (max_count + 1) as f64;

        per_edge(self.ctx, |edge| {
            Ok(self.citation_sum(edge)? as f64 / denom)
        })
    }

    /// Decayed age of the newest paper on the edge.
    pub fn recency(&self) -> Result<EdgeWeights> {
        let reference_year = self.config.reference_year();
        per_edge(self.ctx, |edge| self.recency_of(edge, reference_year))
    }

    /// Mix of recency and the citation curve over `1 + Σ citations`.
    pub fn combined(&self) -> Result<EdgeWeights> {
        let cfg = self.config;
        let reference_year = cfg.reference_year();
        per_edge(self.ctx, |edge| {
            let recency = self.recency_of(edge, reference_year)?;
            let citations = 1.0 + self.citation_sum(edge)? as f64;
            Ok(cfg.recency_mix * recency
                + cfg.citation_mix * citation_curve(citations, cfg.citation_xmid, cfg.citation_tau))
        })
    }

    /// Sigmoid of the largest h-index among all authors on the edge.
    pub fn authority(&self) -> Result<EdgeWeights> {
        let cfg = self.config;
        per_edge(self.ctx, |edge| {
            let mut max_h = -1i64;
            for record in self.records_of(edge)? {
                for author in &record.authors {
                    let name = normalise_author_name(author);
                    let h = self
                        .h_indices
                        .get(name)
                        .ok_or_else(|| LitweightError::MissingAuthor(name.to_string()))?;
                    max_h = max_h.max(*h);
                }
            }
            Ok(authority_curve(max_h as f64, cfg.authority_xmid, cfg.authority_tau))
        })
    }

    fn records_of(&self, edge: &EdgeEvidence) -> Result<Vec<&'a CitationRecord>> {
        edge.citation_ids.iter().map(|id| self.records.require(id)).collect()
    }

    fn citation_sum(&self, edge: &EdgeEvidence) -> Result<usize> {
        Ok(self.records_of(edge)?.iter().map(|r| r.citation_count()).sum())
    }

    fn recency_of(&self, edge: &EdgeEvidence, reference_year: i32) -> Result<f64> {
        let newest = self.records_of(edge)?.iter().filter_map(|r| r.pub_year).max();
        let Some(year) = newest else {
            return Ok(0.0); // no known year
        };
        let age = (reference_year - year) as f64;
        Ok(recency_curve(age, self.config.recency_xmid, self.config.recency_tau))
    }
}

/// Apply `weigh` to every non-empty edge; empty edges get 0.
fn per_edge<F>(ctx: &RunContext, mut weigh: F) -> Result<EdgeWeights>
where
    F: FnMut(&EdgeEvidence) -> Result<f64>,
{
    let mut weights = EdgeWeights::new();
    for edge in ctx.edges() {
        let w = if edge.citation_ids.is_empty() { 0.0 } else { weigh(edge)? };
        weights.insert(edge.key.clone(), w);
    }
    Ok(weights)
}
