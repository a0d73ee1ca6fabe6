//! Per-subgraph run context.
//!
//! Built once from a [`Subgraph`] and passed by reference into every phase
//! (collection, authority scoring, weighting, aggregation), so nothing about
//! the current subgraph lives in shared state.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use litweight_common::Result;
use tracing::{debug, warn};

use crate::subgraph::{invalid, Subgraph};

/// Evidence attached to one link of the subgraph.
#[derive(Debug, Clone)]
pub struct EdgeEvidence {
    /// `"{source.name}-->{target.name}"`
    pub key: String,
    pub source: i64,
    pub target: i64,
    pub citation_ids: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RunContext {
    name: String,
    edges: Vec<EdgeEvidence>,
    /// Distinct identifiers in first-seen order.
    identifiers: Vec<String>,
}

impl RunContext {
    /// Resolve every link of `subgraph` against its nodes.
    ///
    /// Fails with `InvalidSubgraph` when a link points at an unknown node id
    /// or two nodes share an id.
    pub fn new(name: &str, subgraph: &Subgraph) -> Result<Self> {
        if name.trim().is_empty() {
            return Err(invalid("subgraph name must not be empty"));
        }

        let mut nodes: HashMap<i64, &str> = HashMap::with_capacity(subgraph.nodes.len());
        for node in &subgraph.nodes {
            if nodes.insert(node.id, node.name.as_str()).is_some() {
                return Err(invalid(format!("duplicate node id {}", node.id)));
            }
        }

        let mut edges = Vec::with_capacity(subgraph.links.len());
        let mut identifiers = Vec::new();
        let mut seen_ids = HashSet::new();
        let mut seen_keys = HashSet::new();

        for (idx, link) in subgraph.links.iter().enumerate() {
            let source = nodes
                .get(&link.source)
                .ok_or_else(|| invalid(format!("link {} has unknown source node {}", idx, link.source)))?;
            let target = nodes
                .get(&link.target)
                .ok_or_else(|| invalid(format!("link {} has unknown target node {}", idx, link.target)))?;

            let key = edge_key(source, target);
            if !seen_keys.insert(key.clone()) {
                warn!(edge = %key, link = idx, "Edge identity collision; later link overwrites earlier weights");
            }

            let citation_ids = link.citation_ids();
            for id in &citation_ids {
                if seen_ids.insert(id.clone()) {
                    identifiers.push(id.clone());
                }
            }

            edges.push(EdgeEvidence {
                key,
                source: link.source,
                target: link.target,
                citation_ids,
            });
        }

        debug!(
            subgraph = name,
            nodes = nodes.len(),
            edges = edges.len(),
            identifiers = identifiers.len(),
            "Built run context"
        );

        Ok(Self {
            name: name.to_string(),
            edges,
            identifiers,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn edges(&self) -> &[EdgeEvidence] {
        &self.edges
    }

    /// Distinct citation identifiers referenced anywhere in the subgraph.
    pub fn identifiers(&self) -> &[String] {
        &self.identifiers
    }

    pub fn total_identifiers(&self) -> usize {
        self.identifiers.len()
    }

    /// Directory holding this subgraph's record cache and weight table.
    pub fn run_dir(&self, output_dir: &Path) -> PathBuf {
        output_dir.join(&self.name)
    }

    pub fn record_cache_path(&self, output_dir: &Path) -> PathBuf {
        self.run_dir(output_dir).join(format!("{}_records.json", self.name))
    }

    pub fn weights_path(&self, output_dir: &Path) -> PathBuf {
        self.run_dir(output_dir).join(format!("{}.csv", self.name))
    }
}

pub fn edge_key(source: &str, target: &str) -> String {
    format!("{}-->{}", source, target)
}
