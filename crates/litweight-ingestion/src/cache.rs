//! JSON-backed metadata caches.
//!
//! Both caches are loaded once at the start of their phase and written once at
//! the end. Entries are only ever added or overwritten, never removed.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use litweight_common::{LitweightError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::models::CitationRecord;

/// Citation identifier → harvested record, one file per subgraph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordCache {
    records: BTreeMap<String, CitationRecord>,
}

impl RecordCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from `path`; a missing file is an empty cache.
    pub fn load(path: &Path) -> Result<Self> {
        let cache: Self = load_json(path)?.unwrap_or_default();
        debug!(path = %path.display(), records = cache.len(), "Loaded record cache");
        Ok(cache)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        save_json(path, self)?;
        debug!(path = %path.display(), records = self.len(), "Saved record cache");
        Ok(())
    }

    /// Insert every entry of `other`, overwriting on key collision.
    pub fn merge(&mut self, other: RecordCache) {
        self.records.extend(other.records);
    }

    pub fn insert(&mut self, id: impl Into<String>, record: CitationRecord) {
        self.records.insert(id.into(), record);
    }

    pub fn get(&self, id: &str) -> Option<&CitationRecord> {
        self.records.get(id)
    }

    /// Like [`get`](Self::get), but a missing entry is a `MissingRecord` error.
    pub fn require(&self, id: &str) -> Result<&CitationRecord> {
        self.get(id)
            .ok_or_else(|| LitweightError::MissingRecord(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Author bibliometrics shared across runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthorCache {
    /// Author → h-index; `-1` marks a name too short to query.
    #[serde(default)]
    pub h_indices: BTreeMap<String, i64>,
    /// Author → identifiers returned by the author search.
    #[serde(default)]
    pub pmids: BTreeMap<String, Vec<String>>,
    /// Identifier → identifiers of citing papers.
    #[serde(default)]
    pub citations: BTreeMap<String, Vec<String>>,
}

impl AuthorCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from `path`; a missing file is an empty cache.
    pub fn load(path: &Path) -> Result<Self> {
        let cache: Self = load_json(path)?.unwrap_or_default();
        debug!(
            path = %path.display(),
            authors = cache.h_indices.len(),
            papers = cache.citations.len(),
            "Loaded author cache"
        );
        Ok(cache)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        save_json(path, self)?;
        debug!(path = %path.display(), authors = self.h_indices.len(), "Saved author cache");
        Ok(())
    }

    pub fn merge(&mut self, other: AuthorCache) {
        self.h_indices.extend(other.h_indices);
        self.pmids.extend(other.pmids);
        self.citations.extend(other.citations);
    }

    pub fn h_index(&self, author: &str) -> Option<i64> {
        self.h_indices.get(author).copied()
    }

    /// Forward-citation count of `id`, if its citation list is cached.
    pub fn citation_count(&self, id: &str) -> Option<usize> {
        self.citations.get(id).map(Vec::len)
    }
}

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let text = fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&text)?))
}

/// Pretty-print `value` to a temp file beside `path`, then rename over it.
fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut tmp, value)?;
    tmp.write_all(b"\n")?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| LitweightError::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn record(year: i32, citing: &[&str]) -> CitationRecord {
        CitationRecord {
            authors: vec!["Doe, Jane".into()],
            pub_year: Some(year),
            citations: citing.iter().map(|c| c.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.json");
        assert!(RecordCache::load(&path).unwrap().is_empty());
        assert_eq!(AuthorCache::load(&path).unwrap(), AuthorCache::default());
    }

    #[test]
    fn test_record_cache_round_trip_after_empty_merge() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/run/run_records.json");

        let mut cache = RecordCache::new();
        cache.insert("100", record(2018, &["1", "2"]));
        cache.insert("200", record(2015, &[]));
        cache.save(&path).unwrap();

        let mut reloaded = RecordCache::load(&path).unwrap();
        reloaded.merge(RecordCache::new());
        reloaded.save(&path).unwrap();

        assert_eq!(RecordCache::load(&path).unwrap(), cache);
    }

    #[test]
    fn test_record_cache_is_a_flat_map_on_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("records.json");
        let mut cache = RecordCache::new();
        cache.insert("100", record(2018, &[]));
        cache.save(&path).unwrap();

        let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["100"]["pub_year"], 2018);
    }

    #[test]
    fn test_require_reports_missing_identifier() {
        let cache = RecordCache::new();
        assert!(matches!(cache.require("42"), Err(LitweightError::MissingRecord(id)) if id == "42"));
    }

    #[test]
    fn test_author_cache_merge_overwrites_and_keeps() {
        let mut base = AuthorCache::new();
        base.h_indices.insert("Doe, Jane".into(), 0);
        base.h_indices.insert("Roe, Rick".into(), 7);
        base.citations.insert("1".into(), vec!["9".into()]);

        let mut update = AuthorCache::new();
        update.h_indices.insert("Doe, Jane".into(), 12);
        update.pmids.insert("Doe, Jane".into(), vec!["1".into()]);

        base.merge(update);
        assert_eq!(base.h_index("Doe, Jane"), Some(12));
        assert_eq!(base.h_index("Roe, Rick"), Some(7));
        assert_eq!(base.citation_count("1"), Some(1));
        assert_eq!(base.pmids["Doe, Jane"], vec!["1"]);
    }

    #[test]
    fn test_author_cache_file_layout() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("author_h_indexes.json");
        fs::write(&path, r#"{"h_indices": {"Li, W": -1}}"#).unwrap();

        let cache = AuthorCache::load(&path).unwrap();
        assert_eq!(cache.h_index("Li, W"), Some(-1));
        assert!(cache.pmids.is_empty());

        cache.save(&path).unwrap();
        let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        for key in ["h_indices", "pmids", "citations"] {
            assert!(raw.get(key).is_some(), "missing top-level key {}", key);
        }
    }
}
