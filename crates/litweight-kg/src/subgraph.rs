//! Subgraph documents as exported from the knowledge-graph explorer.
//!
//! ```json
//! { "nodes": [{"id": 0, "name": "candesartan", "category": 1}],
//!   "links": [{"source": 0, "target": 1, "edgetype": "chem_gene:32142651,32217835"}],
//!   "categories": [{"name": "Disease"}, {"name": "Chemical"}] }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use litweight_common::{LitweightError, Result};
use serde::{Deserialize, Serialize};

/// Separates the relation label from the citation payload in `edgetype`.
pub const CITATION_DELIMITER: char = ':';

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subgraph {
    pub nodes: Vec<Node>,
    pub links: Vec<Link>,
    /// Category table that integer node categories index into.
    #[serde(default)]
    pub categories: Vec<CategoryEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: i64,
    pub name: String,
    pub category: Category,
}

/// Node category: exports use either an index into `categories` or the label itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Category {
    Index(i64),
    Label(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryEntry {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub source: i64,
    pub target: i64,
    pub edgetype: String,
}

impl Subgraph {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Human-readable category label for a node.
    pub fn category_label(&self, node: &Node) -> String {
        match &node.category {
            Category::Label(label) => label.clone(),
            Category::Index(idx) => usize::try_from(*idx)
                .ok()
                .and_then(|i| self.categories.get(i))
                .map(|c| c.name.clone())
                .unwrap_or_else(|| idx.to_string()),
        }
    }

    /// Number of nodes per category label.
    pub fn category_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for node in &self.nodes {
            *counts.entry(self.category_label(node)).or_insert(0) += 1;
        }
        counts
    }
}

impl Link {
    pub fn citation_ids(&self) -> Vec<String> {
        citation_ids(&self.edgetype)
    }
}

/// Extract the citation identifiers carried in an `edgetype` payload.
/// `"chem_gene:1,2,"` yields `["1", "2"]`; a payload without the delimiter yields nothing.
pub fn citation_ids(edgetype: &str) -> Vec<String> {
    let Some((_, payload)) = edgetype.split_once(CITATION_DELIMITER) else {
        return vec![];
    };
    payload
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(String::from)
        .collect()
}

pub(crate) fn invalid(msg: impl Into<String>) -> LitweightError {
    LitweightError::InvalidSubgraph(msg.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_citation_ids_basic() {
        assert_eq!(citation_ids("chem_gene:100,200"), vec!["100", "200"]);
    }

    #[test]
    fn test_citation_ids_empty_payload() {
        assert!(citation_ids("chem_gene:").is_empty());
        assert!(citation_ids("chem_gene").is_empty());
        assert_eq!(citation_ids("gene_disease: 7 ,,8,"), vec!["7", "8"]);
    }

    #[test]
    fn test_parse_subgraph_with_mixed_categories() {
        let json = r#"{
            "nodes": [
                {"id": 0, "name": "candesartan", "category": 1},
                {"id": 1, "name": "COVID-19", "category": "Disease"}
            ],
            "links": [{"source": 0, "target": 1, "edgetype": "chem_disease:32142651", "value": 3}],
            "categories": [{"name": "Disease"}, {"name": "Chemical"}]
        }"#;
        let sg = Subgraph::from_json_str(json).unwrap();
        assert_eq!(sg.nodes.len(), 2);
        assert_eq!(sg.category_label(&sg.nodes[0]), "Chemical");
        assert_eq!(sg.category_label(&sg.nodes[1]), "Disease");
        assert_eq!(
            sg.category_counts(),
            BTreeMap::from([("Chemical".to_string(), 1), ("Disease".to_string(), 1)])
        );
        assert_eq!(sg.links[0].citation_ids(), vec!["32142651"]);
    }

    #[test]
    fn test_category_index_out_of_range_falls_back_to_number() {
        let sg = Subgraph::from_json_str(
            r#"{"nodes": [{"id": 3, "name": "ACE2", "category": 4}], "links": []}"#,
        )
        .unwrap();
        assert_eq!(sg.category_label(&sg.nodes[0]), "4");
    }
}
