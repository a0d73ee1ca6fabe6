//! Metadata collection for a subgraph's citation identifiers.
//!
//! Each identifier is looked up in the per-subgraph record cache; only misses
//! reach the literature API. Progress is persisted even when the API gives up,
//! so a later run resumes from where this one stopped.

use std::path::PathBuf;

use litweight_common::Result;
use tracing::{debug, info, instrument, warn};

use crate::cache::RecordCache;
use crate::models::CitationRecord;
use crate::sources::LiteratureApi;

pub struct MetadataCollector<'a, A: LiteratureApi + ?Sized> {
    api: &'a A,
    cache_path: PathBuf,
}

impl<'a, A: LiteratureApi + ?Sized> MetadataCollector<'a, A> {
    pub fn new(api: &'a A, cache_path: impl Into<PathBuf>) -> Self {
        Self { api, cache_path: cache_path.into() }
    }

    /// Ensure every identifier has a cached [`CitationRecord`] and return the
    /// full merged cache.
    #[instrument(skip(self, identifiers), fields(n_ids = identifiers.len()))]
    pub async fn collect(&self, identifiers: &[String]) -> Result<RecordCache> {
        let mut cache = RecordCache::load(&self.cache_path)?;
        let misses: Vec<&String> = identifiers.iter().filter(|id| !cache.contains(id)).collect();

        info!(
            cached = identifiers.len() - misses.len(),
            to_fetch = misses.len(),
            "Collecting citation metadata"
        );
        if misses.is_empty() {
            return Ok(cache);
        }

        let mut fetched = RecordCache::new();
        let mut failure = None;
        for id in &misses {
            match self.fetch_one(id).await {
                Ok(record) => fetched.insert(id.as_str(), record),
                Err(e) => {
                    warn!(id = %id, fetched = fetched.len(), error = %e, "Metadata fetch failed; saving progress");
                    failure = Some(e);
                    break;
                }
            }
        }

        cache.merge(fetched);
        cache.save(&self.cache_path)?;
        if let Some(e) = failure {
            return Err(e);
        }
        info!(records = cache.len(), path = %self.cache_path.display(), "Citation metadata collected");
        Ok(cache)
    }

    async fn fetch_one(&self, id: &str) -> Result<CitationRecord> {
        let Some(raw) = self.api.fetch_record(id).await? else {
            warn!(id, "No record returned for identifier; caching an empty record");
            return Ok(CitationRecord::default());
        };

        // Forward citations are keyed by the identifier the edge cites, even
        // when the canonical record supplied the rest.
        let citations = self.api.fetch_forward_citations(id).await?;
        let record = CitationRecord::resolve(&raw, citations);
        debug!(
            id,
            canonical = record.canonical,
            authors = record.authors.len(),
            citations = record.citation_count(),
            "Resolved citation record"
        );
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ArticleRecord, RawRecord};
    use crate::sources::MockLiteratureApi;
    use litweight_common::LitweightError;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn ids(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_collects_misses_and_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run/run_records.json");
        let api = MockLiteratureApi::new()
            .with_record("100", &["Doe, Jane"], Some(2018))
            .with_citation_count("100", 5)
            .with_record("200", &["Roe, Rick"], Some(2015))
            .with_citations("200", &["7", "8"]);

        let cache = MetadataCollector::new(&api, &path)
            .collect(&ids(&["100", "200"]))
            .await
            .unwrap();

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("100").unwrap().citation_count(), 5);
        assert_eq!(cache.get("200").unwrap().pub_year, Some(2015));
        assert_eq!(RecordCache::load(&path).unwrap(), cache);
        // One record fetch and one citation lookup per identifier.
        assert_eq!(api.calls(), 4);
    }

    #[tokio::test]
    async fn test_fully_cached_run_makes_no_calls() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("records.json");
        let mut seeded = RecordCache::new();
        seeded.insert("100", CitationRecord::default());
        seeded.save(&path).unwrap();

        let api = MockLiteratureApi::new();
        let cache = MetadataCollector::new(&api, &path)
            .collect(&ids(&["100"]))
            .await
            .unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(api.calls(), 0);
    }

    #[tokio::test]
    async fn test_partially_cached_fetches_only_misses() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("records.json");
        let mut seeded = RecordCache::new();
        seeded.insert("100", CitationRecord::default());
        seeded.save(&path).unwrap();

        let api = MockLiteratureApi::new().with_record("200", &["Roe, Rick"], None);
        let cache = MetadataCollector::new(&api, &path)
            .collect(&ids(&["100", "200"]))
            .await
            .unwrap();
        assert!(cache.contains("200"));
        assert_eq!(api.calls(), 2);
    }

    #[tokio::test]
    async fn test_unknown_identifier_cached_as_empty_record() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("records.json");
        let api = MockLiteratureApi::new();

        let cache = MetadataCollector::new(&api, &path)
            .collect(&ids(&["999"]))
            .await
            .unwrap();
        assert_eq!(cache.get("999"), Some(&CitationRecord::default()));
        // No citation lookup for a record that does not exist.
        assert_eq!(api.calls(), 1);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_not_cached_and_retried_next_run() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("records.json");

        let outage = MockLiteratureApi::new().unavailable_for("100");
        let err = MetadataCollector::new(&outage, &path)
            .collect(&ids(&["100"]))
            .await
            .unwrap_err();
        assert!(matches!(err, LitweightError::Unavailable { .. }));
        assert!(!RecordCache::load(&path).unwrap().contains("100"));

        let healthy = MockLiteratureApi::new()
            .with_record("100", &["Doe, Jane"], Some(2018))
            .with_citation_count("100", 2);
        let cache = MetadataCollector::new(&healthy, &path)
            .collect(&ids(&["100"]))
            .await
            .unwrap();
        assert_eq!(healthy.calls(), 2);
        assert_eq!(cache.get("100").unwrap().authors, vec!["Doe, Jane"]);
    }

    #[tokio::test]
    async fn test_canonical_record_supplies_authors() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("records.json");
        let raw = RawRecord {
            primary: ArticleRecord {
                pmid: Some("32142651".into()),
                pmc: Some("PMC7102627".into()),
                authors: vec!["Hoffmann, M".into()],
                published_year: Some(2020),
                ..Default::default()
            },
            canonical: Some(ArticleRecord {
                authors: vec!["Hoffmann, Markus".into()],
                ..Default::default()
            }),
        };
        let api = MockLiteratureApi::new()
            .with_raw_record("32142651", raw)
            .with_citations("32142651", &["1"]);

        let cache = MetadataCollector::new(&api, &path)
            .collect(&ids(&["32142651"]))
            .await
            .unwrap();
        let rec = cache.get("32142651").unwrap();
        assert!(rec.canonical);
        assert_eq!(rec.canonical_id.as_deref(), Some("7102627"));
        assert_eq!(rec.authors, vec!["Hoffmann, Markus"]);
        assert_eq!(rec.pub_year, Some(2020));
        assert_eq!(rec.citation_count(), 1);
    }

    #[tokio::test]
    async fn test_unavailable_saves_progress_before_failing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("records.json");
        let api = MockLiteratureApi::new()
            .with_record("100", &["Doe, Jane"], Some(2018))
            .unavailable_for("200");

        let err = MetadataCollector::new(&api, &path)
            .collect(&ids(&["100", "200", "300"]))
            .await
            .unwrap_err();
        assert!(matches!(err, LitweightError::Unavailable { .. }));

        let saved = RecordCache::load(&path).unwrap();
        assert!(saved.contains("100"));
        assert!(!saved.contains("200"));
    }
}
