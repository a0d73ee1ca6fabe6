//! Author authority via the h-index.
//!
//! Authors are scored from their own publication list inside a fixed
//! publication-date window. Results are kept in the global [`AuthorCache`] so
//! that only authors without a usable score ever reach the literature API.

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

use litweight_common::Result;
use litweight_ingestion::sources::{AuthorQuery, LiteratureApi};
use litweight_ingestion::AuthorCache;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

/// h-index of an author too short-named to search for reliably.
pub const UNSCORED: i64 = -1;

/// Largest `h` such that `h` of the counts are at least `h`.
pub fn h_index(counts: &[usize]) -> i64 {
    let mut sorted = counts.to_vec();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    sorted
        .iter()
        .enumerate()
        .take_while(|&(i, &c)| c > i)
        .count() as i64
}

/// Author names in records may carry one leading space.
pub fn normalise_author_name(name: &str) -> &str {
    name.strip_prefix(' ').unwrap_or(name)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthoritySearchConfig {
    /// Publication-date window of the author search.
    #[serde(default = "default_min_year")]
    pub min_year: i32,
    #[serde(default = "default_max_year")]
    pub max_year: i32,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    /// Names this short or shorter are never searched.
    #[serde(default = "default_min_name_len")]
    pub min_name_len: usize,
    /// Identifiers per batched citation-count request.
    #[serde(default = "default_citation_batch_size")]
    pub citation_batch_size: usize,
    #[serde(default = "default_cache_path")]
    pub cache_path: PathBuf,
}

fn default_min_year()     -> i32     { 1990 }
fn default_max_year()     -> i32     { 2020 }
fn default_max_results()  -> usize   { 500 }
fn default_min_name_len() -> usize   { 5 }
fn default_citation_batch_size() -> usize { 100 }
fn default_cache_path()   -> PathBuf { PathBuf::from("data/author_h_indexes.json") }

impl Default for AuthoritySearchConfig {
    fn default() -> Self {
        Self {
            min_year: default_min_year(),
            max_year: default_max_year(),
            max_results: default_max_results(),
            min_name_len: default_min_name_len(),
            citation_batch_size: default_citation_batch_size(),
            cache_path: default_cache_path(),
        }
    }
}

pub struct AuthorityScorer<'a, A: LiteratureApi + ?Sized> {
    api: &'a A,
    config: &'a AuthoritySearchConfig,
}

impl<'a, A: LiteratureApi + ?Sized> AuthorityScorer<'a, A> {
    pub fn new(api: &'a A, config: &'a AuthoritySearchConfig) -> Self {
        Self { api, config }
    }

    /// h-index for every distinct (normalised) author name in `authors`.
    ///
    /// The author cache is rewritten once after the batch, and also before an
    /// API failure is returned.
    #[instrument(skip(self, authors), fields(n_authors = authors.len()))]
    pub async fn score(&self, authors: &[String]) -> Result<HashMap<String, i64>> {
        let path = &self.config.cache_path;
        let mut cache = AuthorCache::load(path)?;

        let names: BTreeSet<&str> = authors.iter().map(|a| normalise_author_name(a)).collect();
        let mut scores = HashMap::with_capacity(names.len());
        let mut updates = AuthorCache::new();
        let mut queried = 0usize;

        for name in names {
            match cache.h_index(name) {
                Some(h) if h != 0 => {
                    scores.insert(name.to_string(), h);
                    continue;
                }
                _ => {}
            }

            if name.chars().count() <= self.config.min_name_len {
                debug!(author = name, "Name too short to search; marking unscored");
                updates.h_indices.insert(name.to_string(), UNSCORED);
                scores.insert(name.to_string(), UNSCORED);
                continue;
            }

            match self.query_author(name, &cache, &mut updates).await {
                Ok(h) => {
                    queried += 1;
                    scores.insert(name.to_string(), h);
                }
                Err(e) => {
                    warn!(author = name, error = %e, "Author search failed; saving author cache");
                    cache.merge(updates);
                    cache.save(path)?;
                    return Err(e);
                }
            }
        }

        cache.merge(updates);
        cache.save(path)?;
        info!(authors = scores.len(), queried, "Author h-indices ready");
        Ok(scores)
    }

    async fn query_author(&self, name: &str, cache: &AuthorCache, updates: &mut AuthorCache) -> Result<i64> {
        let query = AuthorQuery {
            name: name.to_string(),
            min_year: self.config.min_year,
            max_year: self.config.max_year,
            max_results: self.config.max_results,
        };
        let ids = self.api.search_author(&query).await?;

        let missing: Vec<String> = ids
            .iter()
            .filter(|id| !cache.citations.contains_key(*id) && !updates.citations.contains_key(*id))
            .cloned()
            .collect();
        // Batches are recorded as they arrive; `score` saves them on failure.
        for batch in missing.chunks(self.config.citation_batch_size.max(1)) {
            let fetched = self.api.fetch_citation_counts(batch).await?;
            updates.citations.extend(fetched);
        }

        let counts: Vec<usize> = ids
            .iter()
            .map(|id| {
                updates
                    .citation_count(id)
                    .or_else(|| cache.citation_count(id))
                    .unwrap_or(0)
            })
            .collect();
        let h = h_index(&counts);
        debug!(author = name, papers = ids.len(), h_index = h, "Computed h-index");

        updates.pmids.insert(name.to_string(), ids);
        updates.h_indices.insert(name.to_string(), h);
        Ok(h)
    }
}
