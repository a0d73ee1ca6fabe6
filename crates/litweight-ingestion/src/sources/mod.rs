//! Literature source clients.

pub mod efetch_xml;
pub mod pubmed;
pub mod retry;
pub mod throttle;

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use litweight_common::{LitweightError, Result};

use crate::models::{ArticleRecord, RawRecord};

/// Author-name search restricted to a publication-date window.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorQuery {
    pub name: String,
    pub min_year: i32,
    pub max_year: i32,
    pub max_results: usize,
}

/// Interface to the external literature database.
///
/// Calls are awaited one at a time by the collector and the authority scorer;
/// implementations handle rate limiting and retries themselves.
#[async_trait]
pub trait LiteratureApi: Send + Sync {
    /// Fetch the record for `id`, plus its canonical record when cross-referenced.
    /// `None` when the database has no record for the identifier.
    async fn fetch_record(&self, id: &str) -> Result<Option<RawRecord>>;

    /// Identifiers of papers citing `id`.
    async fn fetch_forward_citations(&self, id: &str) -> Result<Vec<String>>;

    /// Citing-paper identifiers for many identifiers in one batched request.
    /// Every requested identifier is present in the result, possibly with an
    /// empty list. Callers split large id lists into batches themselves.
    async fn fetch_citation_counts(&self, ids: &[String]) -> Result<HashMap<String, Vec<String>>>;

    /// Identifiers of papers matching an author name.
    async fn search_author(&self, query: &AuthorQuery) -> Result<Vec<String>>;
}

// ── Mock Implementation for Testing ────────────────────────────────────────

/// In-memory literature database with call counters, for tests.
#[derive(Default)]
pub struct MockLiteratureApi {
    records: HashMap<String, RawRecord>,
    citations: HashMap<String, Vec<String>>,
    authors: HashMap<String, Vec<String>>,
    unavailable: Option<String>,
    calls: AtomicUsize,
    searches: AtomicUsize,
}

impl MockLiteratureApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a primary record with the given authors and completion year.
    pub fn with_record(mut self, id: &str, authors: &[&str], year: Option<i32>) -> Self {
        let primary = ArticleRecord {
            pmid: Some(id.to_string()),
            authors: authors.iter().map(|a| a.to_string()).collect(),
            published_year: year,
            ..Default::default()
        };
        self.records.insert(id.to_string(), RawRecord::primary(primary));
        self
    }

    pub fn with_raw_record(mut self, id: &str, raw: RawRecord) -> Self {
        self.records.insert(id.to_string(), raw);
        self
    }

    /// Give `id` the listed citing papers.
    pub fn with_citations(mut self, id: &str, citing: &[&str]) -> Self {
        self.citations
            .insert(id.to_string(), citing.iter().map(|c| c.to_string()).collect());
        self
    }

    /// Give `id` `n` synthetic citing papers.
    pub fn with_citation_count(mut self, id: &str, n: usize) -> Self {
        let citing = (0..n).map(|i| format!("{}-c{}", id, i)).collect();
        self.citations.insert(id.to_string(), citing);
        self
    }

    /// Register the identifiers an author search for `name` returns.
    pub fn with_author(mut self, name: &str, ids: &[&str]) -> Self {
        self.authors
            .insert(name.to_string(), ids.iter().map(|i| i.to_string()).collect());
        self
    }

    /// Make every call touching `id` fail with `Unavailable`.
    pub fn unavailable_for(mut self, id: &str) -> Self {
        self.unavailable = Some(id.to_string());
        self
    }

    /// Total number of calls made against the mock.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of author searches performed.
    pub fn searches(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }

    fn check(&self, id: &str, operation: &str) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.as_deref() == Some(id) {
            return Err(LitweightError::Unavailable {
                operation: operation.to_string(),
                reason: format!("mock outage for {}", id),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl LiteratureApi for MockLiteratureApi {
    async fn fetch_record(&self, id: &str) -> Result<Option<RawRecord>> {
        self.check(id, "efetch")?;
        Ok(self.records.get(id).cloned())
    }

    async fn fetch_forward_citations(&self, id: &str) -> Result<Vec<String>> {
        self.check(id, "elink")?;
        Ok(self.citations.get(id).cloned().unwrap_or_default())
    }

    async fn fetch_citation_counts(&self, ids: &[String]) -> Result<HashMap<String, Vec<String>>> {
        for id in ids {
            self.check(id, "elink")?;
        }
        Ok(ids
            .iter()
            .map(|id| (id.clone(), self.citations.get(id).cloned().unwrap_or_default()))
            .collect())
    }

    async fn search_author(&self, query: &AuthorQuery) -> Result<Vec<String>> {
        self.check(&query.name, "esearch")?;
        self.searches.fetch_add(1, Ordering::SeqCst);
        Ok(self.authors.get(&query.name).cloned().unwrap_or_default())
    }
}
