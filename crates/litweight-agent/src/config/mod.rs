//! Configuration loading for litweight.
//! Reads litweight.toml from the current directory or the path in LITWEIGHT_CONFIG.

use anyhow::Context;
use litweight_ingestion::sources::pubmed::EntrezConfig;
use litweight_ranker::hindex::AuthoritySearchConfig;
use litweight_ranker::{PipelineConfig, WeightConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "litweight.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub entrez: EntrezConfig,
    #[serde(default)]
    pub authors: AuthoritySearchConfig,
    #[serde(default)]
    pub scoring: WeightConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

fn default_output_dir() -> PathBuf { PathBuf::from("output") }

impl Default for OutputConfig {
    fn default() -> Self {
        Self { dir: default_output_dir() }
    }
}


impl Config {
    /// Load configuration from `path`, falling back to defaults when the file
    /// does not exist. `NCBI_EMAIL` and `NCBI_API_KEY` override the file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            Self::from_toml_str(&content)
                .with_context(|| format!("parsing {}", path.display()))?
        } else {
            tracing::warn!(
                "Config file not found: {}; using defaults. Copy litweight.example.toml to litweight.toml to customise.",
                path.display()
            );
            Self::default()
        };

        config.apply_overrides(
            std::env::var("NCBI_EMAIL").ok(),
            std::env::var("NCBI_API_KEY").ok(),
        );
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Non-empty values replace the configured contact email and API key.
    pub fn apply_overrides(&mut self, email: Option<String>, api_key: Option<String>) {
        if let Some(email) = email.filter(|e| !e.trim().is_empty()) {
            self.entrez.email = email;
        }
        if let Some(key) = api_key.filter(|k| !k.trim().is_empty()) {
            self.entrez.api_key = Some(key);
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.entrez.email.trim().is_empty() {
            anyhow::bail!(
                "NCBI requires a contact email: set entrez.email in {} or NCBI_EMAIL",
                DEFAULT_CONFIG_PATH
            );
        }
        if self.authors.min_year > self.authors.max_year {
            anyhow::bail!(
                "authors.min_year ({}) is after authors.max_year ({})",
                self.authors.min_year,
                self.authors.max_year
            );
        }
        if self.authors.citation_batch_size == 0 {
            anyhow::bail!("authors.citation_batch_size must be at least 1");
        }
        self.entrez.retry.validate()?;
        self.scoring.validate()?;
        Ok(())
    }

    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            output_dir: self.output.dir.clone(),
            authors: self.authors.clone(),
            weights: self.scoring.clone(),
        }
    }
}
