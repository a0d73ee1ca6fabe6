//! PubMed E-utilities client.
//!
//! Endpoints used:
//!   efetch:  https://eutils.ncbi.nlm.nih.gov/entrez/eutils/efetch.fcgi  (PubMed / PMC XML)
//!   elink:   https://eutils.ncbi.nlm.nih.gov/entrez/eutils/elink.fcgi   (pubmed_pmc_refs)
//!   esearch: https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi (author search)
//!
//! Every request passes through one shared [`RequestBudget`] and is retried
//! with bounded backoff.

use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use litweight_common::sandbox::SandboxClient as Client;
use litweight_common::{LitweightError, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::models::{ArticleRecord, RawRecord};
use super::efetch_xml::parse_efetch_xml;
use super::retry::{with_retry, RetryPolicy};
use super::throttle::RequestBudget;
use super::{AuthorQuery, LiteratureApi};

const EFETCH_URL:  &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/efetch.fcgi";
const ELINK_URL:   &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/elink.fcgi";
const ESEARCH_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi";

/// Link name for "PMC articles citing this PubMed article".
const CITED_BY_LINK: &str = "pubmed_pmc_refs";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntrezConfig {
    /// Contact address NCBI requires on every request.
    #[serde(default)]
    pub email: String,
    #[serde(default = "default_tool")]
    pub tool: String,
    /// Raises the NCBI request allowance when present.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    #[serde(default = "default_max_calls")]
    pub max_calls: u32,
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_tool()        -> String { "litweight".to_string() }
fn default_max_calls()   -> u32    { 30 }
fn default_window_secs() -> u64    { 10 }
fn default_timeout_secs() -> u64   { 30 }

impl Default for EntrezConfig {
    fn default() -> Self {
        Self {
            email: String::new(),
            tool: default_tool(),
            api_key: None,
            max_calls: default_max_calls(),
            window_secs: default_window_secs(),
            timeout_secs: default_timeout_secs(),
            retry: RetryConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Record fetches and author searches.
    #[serde(default)]
    pub lookup: RetryPolicy,
    /// Forward-citation and batched citation-count lookups.
    #[serde(default = "RetryPolicy::citations")]
    pub citations: RetryPolicy,
}

impl RetryConfig {
    pub fn validate(&self) -> Result<()> {
        self.lookup.validate("lookup")?;
        self.citations.validate("citations")
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            lookup: RetryPolicy::default(),
            citations: RetryPolicy::citations(),
        }
    }
}

pub struct EntrezClient {
    client: Client,
    config: EntrezConfig,
    api_key: Option<SecretString>,
    budget: RequestBudget,
}

impl EntrezClient {
    pub fn new(config: EntrezConfig) -> Result<Self> {
        if config.email.trim().is_empty() {
            return Err(LitweightError::Config(
                "NCBI requires a contact email (entrez.email or NCBI_EMAIL)".to_string(),
            ));
        }
        config.retry.validate()?;

        let client = Client::new(Duration::from_secs(config.timeout_secs))?;
        let budget = RequestBudget::new(config.max_calls, Duration::from_secs(config.window_secs))?;
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .map(SecretString::from);

        Ok(Self { client, config, api_key, budget })
    }

    fn base_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("tool", self.config.tool.clone()),
            ("email", self.config.email.clone()),
        ];
        if let Some(key) = &self.api_key {
            params.push(("api_key", key.expose_secret().to_string()));
        }
        params
    }

    /// One budgeted GET returning the response body.
    async fn get_text(&self, url: &str, params: &[(&'static str, String)]) -> Result<String> {
        self.budget.acquire().await;
        let body = self.client
            .get(url)?
            .query(params)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(body)
    }

    /// Fetch article records for one identifier from `db` (`pubmed` or `pmc`).
    /// A body that is not a complete efetch document is retried.
    #[instrument(skip(self))]
    async fn efetch_articles(&self, db: &str, id: &str) -> Result<Vec<ArticleRecord>> {
        let mut params = self.base_params();
        params.push(("db", db.to_string()));
        params.push(("id", id.to_string()));
        params.push(("rettype", "xml".to_string()));
        params.push(("retmode", "xml".to_string()));
        let params = &params;

        let records = with_retry(&self.config.retry.lookup, "efetch", move || async move {
            let xml = self.get_text(EFETCH_URL, params).await?;
            parse_efetch_xml(&xml)
        })
        .await?;

        debug!(count = records.len(), "efetch returned article records");
        Ok(records)
    }

    async fn elink(&self, ids: &[String], scored: bool) -> Result<Vec<LinkSetResult>> {
        let mut params = self.base_params();
        params.push(("dbfrom", "pubmed".to_string()));
        params.push(("linkname", CITED_BY_LINK.to_string()));
        params.push(("retmode", "json".to_string()));
        if scored {
            params.push(("cmd", "neighbor_score".to_string()));
        }
        // One `id` parameter per identifier keeps the link sets one-to-one.
        for id in ids {
            params.push(("id", id.clone()));
        }
        let params = &params;

        with_retry(&self.config.retry.citations, "elink", move || async move {
            let body = self.get_text(ELINK_URL, params).await?;
            parse_link_sets(&body)
        })
        .await
    }
}

#[async_trait]
impl LiteratureApi for EntrezClient {
    #[instrument(skip(self))]
    async fn fetch_record(&self, id: &str) -> Result<Option<RawRecord>> {
        let Some(primary) = self.efetch_articles("pubmed", id).await?.into_iter().next() else {
            return Ok(None);
        };

        let canonical = match primary.canonical_id() {
            Some(pmc_id) => {
                let found = self.efetch_articles("pmc", &pmc_id).await?.into_iter().next();
                if found.is_none() {
                    debug!(pmc_id = %pmc_id, "Cross-referenced PMC record not returned");
                }
                found
            }
            None => None,
        };

        Ok(Some(RawRecord { primary, canonical }))
    }

    #[instrument(skip(self))]
    async fn fetch_forward_citations(&self, id: &str) -> Result<Vec<String>> {
        let sets = self.elink(&[id.to_string()], false).await?;
        let citing: Vec<String> = sets.into_iter().flat_map(|s| s.links).collect();
        debug!(count = citing.len(), "elink returned citing papers");
        Ok(citing)
    }

    #[instrument(skip(self, ids), fields(n_ids = ids.len()))]
    async fn fetch_citation_counts(&self, ids: &[String]) -> Result<HashMap<String, Vec<String>>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let sets = self.elink(ids, true).await?;
        let merged = merge_link_sets(ids, sets);
        if merged.mismatch {
            warn!(
                requested = ids.len(),
                returned = merged.returned,
                "elink identifier set does not match the request; continuing with returned data"
            );
        }
        Ok(merged.citations)
    }

    #[instrument(skip(self))]
    async fn search_author(&self, query: &AuthorQuery) -> Result<Vec<String>> {
        let mut params = self.base_params();
        params.push(("db", "pubmed".to_string()));
        params.push(("term", query.name.clone()));
        params.push(("datetype", "pdat".to_string()));
        params.push(("mindate", query.min_year.to_string()));
        params.push(("maxdate", query.max_year.to_string()));
        params.push(("retmax", query.max_results.to_string()));
        params.push(("retmode", "json".to_string()));
        let params = &params;

        let ids = with_retry(&self.config.retry.lookup, "esearch", move || async move {
            let body = self.get_text(ESEARCH_URL, params).await?;
            parse_esearch_ids(&body)
        })
        .await?;

        debug!(count = ids.len(), "PubMed esearch returned PMIDs");
        Ok(ids)
    }
}

// ── Response parsing ────────────────────────────────────────────────────────

/// Citing identifiers for one queried identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkSetResult {
    pub id: Option<String>,
    pub links: Vec<String>,
}

#[derive(Deserialize)]
struct ElinkResponse {
    #[serde(rename = "ERROR")]
    error: Option<String>,
    #[serde(default)]
    linksets: Vec<LinkSet>,
}

#[derive(Deserialize)]
struct LinkSet {
    #[serde(default)]
    ids: Vec<IdValue>,
    #[serde(default)]
    linksetdbs: Vec<LinkSetDb>,
}

#[derive(Deserialize)]
struct LinkSetDb {
    #[serde(default)]
    linkname: String,
    #[serde(default)]
    links: Vec<LinkValue>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IdValue {
    Text(String),
    Number(u64),
}

impl IdValue {
    fn into_string(self) -> String {
        match self {
            IdValue::Text(s) => s,
            IdValue::Number(n) => n.to_string(),
        }
    }
}

/// `cmd=neighbor` returns bare ids, `cmd=neighbor_score` returns `{id, score}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum LinkValue {
    Plain(IdValue),
    Scored { id: IdValue },
}

impl LinkValue {
    fn into_string(self) -> String {
        match self {
            LinkValue::Plain(id) | LinkValue::Scored { id } => id.into_string(),
        }
    }
}

/// Parse an elink JSON response into per-identifier citing lists.
/// Link sets without a `pubmed_pmc_refs` database yield an empty list.
pub fn parse_link_sets(body: &str) -> Result<Vec<LinkSetResult>> {
    let resp: ElinkResponse = serde_json::from_str(body)
        .map_err(|e| LitweightError::Parse(format!("elink response: {}", e)))?;
    if let Some(err) = resp.error {
        return Err(LitweightError::Parse(format!("elink error: {}", err)));
    }

    Ok(resp
        .linksets
        .into_iter()
        .map(|set| {
            let id = set.ids.into_iter().next().map(IdValue::into_string);
            let links = set
                .linksetdbs
                .into_iter()
                .filter(|db| db.linkname.is_empty() || db.linkname == CITED_BY_LINK)
                .flat_map(|db| db.links.into_iter().map(LinkValue::into_string))
                .collect();
            LinkSetResult { id, links }
        })
        .collect())
}

/// One batched elink response keyed by identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedLinkSets {
    /// Every requested identifier, plus any extra one the response claims.
    pub citations: HashMap<String, Vec<String>>,
    /// Distinct identifiers the response claims.
    pub returned: usize,
    /// The claimed identifiers differ from the requested ones.
    pub mismatch: bool,
}

/// Key link sets by the identifier each one claims. Requested identifiers the
/// response leaves out map to an empty list; link sets without an id are dropped.
pub fn merge_link_sets(requested: &[String], sets: Vec<LinkSetResult>) -> MergedLinkSets {
    let wanted: BTreeSet<&str> = requested.iter().map(String::as_str).collect();
    let claimed: BTreeSet<&str> = sets.iter().filter_map(|s| s.id.as_deref()).collect();
    let returned = claimed.len();
    let mismatch = wanted != claimed;

    let mut citations: HashMap<String, Vec<String>> = HashMap::with_capacity(requested.len());
    for set in sets {
        if let Some(id) = set.id {
            citations.entry(id).or_default().extend(set.links);
        }
    }
    for id in requested {
        citations.entry(id.clone()).or_default();
    }

    MergedLinkSets { citations, returned, mismatch }
}

/// Parse the id list out of an esearch JSON response.
pub fn parse_esearch_ids(body: &str) -> Result<Vec<String>> {
    let resp: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| LitweightError::Parse(format!("esearch response: {}", e)))?;

    if let Some(err) = resp.get("ERROR").and_then(|e| e.as_str()) {
        return Err(LitweightError::Parse(format!("esearch error: {}", err)));
    }

    let ids = resp["esearchresult"]["idlist"]
        .as_array()
        .ok_or_else(|| LitweightError::Parse("esearch response without idlist".to_string()))?
        .iter()
        .filter_map(|v| v.as_str().map(String::from))
        .collect();
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_plain_links() {
        let body = r#"{"header":{"type":"elink","version":"0.3"},"linksets":[{
            "dbfrom":"pubmed","ids":["32142651"],
            "linksetdbs":[{"dbto":"pmc","linkname":"pubmed_pmc_refs","links":["7250001","7250002"]}]}]}"#;
        let sets = parse_link_sets(body).unwrap();
        assert_eq!(
            sets,
            vec![LinkSetResult {
                id: Some("32142651".into()),
                links: vec!["7250001".into(), "7250002".into()],
            }]
        );
    }

    #[test]
    fn test_parse_scored_links_and_missing_linksetdbs() {
        let body = r#"{"linksets":[
            {"dbfrom":"pubmed","ids":[100],
             "linksetdbs":[{"dbto":"pmc","linkname":"pubmed_pmc_refs","links":[{"id":"1","score":"0"},{"id":2}]}]},
            {"dbfrom":"pubmed","ids":["200"]}]}"#;
        let sets = parse_link_sets(body).unwrap();
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0].id.as_deref(), Some("100"));
        assert_eq!(sets[0].links, vec!["1", "2"]);
        assert!(sets[1].links.is_empty());
    }

    #[test]
    fn test_parse_elink_error_is_transient() {
        let err = parse_link_sets(r#"{"ERROR":"API rate limit exceeded"}"#).unwrap_err();
        assert!(err.is_transient());
        assert!(parse_link_sets("<html>502</html>").unwrap_err().is_transient());
    }

    fn link_set(id: Option<&str>, links: &[&str]) -> LinkSetResult {
        LinkSetResult {
            id: id.map(String::from),
            links: links.iter().map(|l| l.to_string()).collect(),
        }
    }

    fn requested(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|i| i.to_string()).collect()
    }

    #[test]
    fn test_merge_link_sets_matching_response() {
        let merged = merge_link_sets(
            &requested(&["1", "2"]),
            vec![link_set(Some("1"), &["a", "b"]), link_set(Some("2"), &[])],
        );
        assert!(!merged.mismatch);
        assert_eq!(merged.returned, 2);
        assert_eq!(merged.citations["1"], vec!["a", "b"]);
        assert!(merged.citations["2"].is_empty());
    }

    #[test]
    fn test_merge_link_sets_missing_id_maps_to_empty() {
        let merged = merge_link_sets(&requested(&["1", "2"]), vec![link_set(Some("1"), &["a"])]);
        assert!(merged.mismatch);
        assert_eq!(merged.returned, 1);
        assert_eq!(merged.citations.len(), 2);
        assert!(merged.citations["2"].is_empty());
    }

    #[test]
    fn test_merge_link_sets_extra_id_is_kept() {
        let merged = merge_link_sets(
            &requested(&["1"]),
            vec![link_set(Some("1"), &["a"]), link_set(Some("9"), &["z"])],
        );
        assert!(merged.mismatch);
        assert_eq!(merged.citations["1"], vec!["a"]);
        assert_eq!(merged.citations["9"], vec!["z"]);
    }

    #[test]
    fn test_merge_link_sets_drops_sets_without_id() {
        let merged = merge_link_sets(&requested(&["1"]), vec![link_set(None, &["a", "b"])]);
        assert!(merged.mismatch);
        assert_eq!(merged.returned, 0);
        assert_eq!(merged.citations.len(), 1);
        assert!(merged.citations["1"].is_empty());
    }

    #[test]
    fn test_client_rejects_infinite_retry_budget() {
        let mut config = EntrezConfig { email: "lab@example.org".into(), ..Default::default() };
        config.retry.citations.max_elapsed_secs = f64::INFINITY;
        let err = EntrezClient::new(config).err().unwrap();
        assert!(matches!(err, LitweightError::Config(_)));
    }

    #[test]
    fn test_parse_esearch_ids() {
        let body = r#"{"header":{},"esearchresult":{"count":"2","retmax":"2","idlist":["111","222"]}}"#;
        assert_eq!(parse_esearch_ids(body).unwrap(), vec!["111", "222"]);
        assert!(parse_esearch_ids(r#"{"esearchresult":{}}"#).is_err());
    }

    #[test]
    fn test_client_requires_email() {
        let err = EntrezClient::new(EntrezConfig::default()).err().unwrap();
        assert!(matches!(err, LitweightError::Config(_)));
    }

    #[test]
    fn test_config_defaults_from_empty_toml_fields() {
        let cfg: EntrezConfig = serde_json::from_str(r#"{"email": "lab@example.org"}"#).unwrap();
        assert_eq!(cfg.max_calls, 30);
        assert_eq!(cfg.window_secs, 10);
        assert_eq!(cfg.tool, "litweight");
        assert!(cfg.retry.citations.max_interval_secs > cfg.retry.lookup.max_interval_secs);
    }
}
