//! Curve parameters and mixing weights for the edge-weight scorers.

use chrono::{Datelike, Utc};
use litweight_common::{LitweightError, Result};
use serde::{Deserialize, Serialize};

/// Parameters of every scoring curve.
/// Each curve is a Boltzmann sigmoid with midpoint `*_xmid` and width `*_tau`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightConfig {
    /// Year publication ages are measured from. Current UTC year when unset.
    #[serde(default)]
    pub reference_year: Option<i32>,

    #[serde(default = "default_recency_xmid")]
    pub recency_xmid: f64,
    #[serde(default = "default_recency_tau")]
    pub recency_tau: f64,

    /// Applied to `1 + Σ citations` in the combined weight.
    #[serde(default = "default_citation_xmid")]
    pub citation_xmid: f64,
    #[serde(default = "default_citation_tau")]
    pub citation_tau: f64,

    /// Applied to the largest author h-index on an edge.
    #[serde(default = "default_authority_xmid")]
    pub authority_xmid: f64,
    #[serde(default = "default_authority_tau")]
    pub authority_tau: f64,

    /// Share of the combined weight taken by recency.
    #[serde(default = "default_half")]
    pub recency_mix: f64,
    /// Share of the combined weight taken by the citation curve.
    #[serde(default = "default_half")]
    pub citation_mix: f64,
}

fn default_recency_xmid()   -> f64 { 10.0 }
fn default_recency_tau()    -> f64 { 3.0 }
fn default_citation_xmid()  -> f64 { 15.0 }
fn default_citation_tau()   -> f64 { 3.0 }
fn default_authority_xmid() -> f64 { 20.0 }
fn default_authority_tau()  -> f64 { 2.0 }
fn default_half()           -> f64 { 0.5 }

impl Default for WeightConfig {
    fn default() -> Self {
        Self {
            reference_year: None,
            recency_xmid:   default_recency_xmid(),
            recency_tau:    default_recency_tau(),
            citation_xmid:  default_citation_xmid(),
            citation_tau:   default_citation_tau(),
            authority_xmid: default_authority_xmid(),
            authority_tau:  default_authority_tau(),
            recency_mix:    default_half(),
            citation_mix:   default_half(),
        }
    }
}

impl WeightConfig {
    /// Mixing weights must sum to 1.0 and every width must be positive.
    pub fn validate(&self) -> Result<()> {
        let sum = self.recency_mix + self.citation_mix;
        if (sum - 1.0).abs() > 1e-6 {
            return Err(LitweightError::Config(format!(
                "recency_mix + citation_mix must be 1.0, got {}",
                sum
            )));
        }
        for (name, tau) in [
            ("recency_tau", self.recency_tau),
            ("citation_tau", self.citation_tau),
            ("authority_tau", self.authority_tau),
        ] {
            if !(tau.is_finite() && tau > 0.0) {
                return Err(LitweightError::Config(format!("{} must be positive, got {}", name, tau)));
            }
        }
        Ok(())
    }

    pub fn reference_year(&self) -> i32 {
        self.reference_year.unwrap_or_else(|| Utc::now().year())
    }
}
