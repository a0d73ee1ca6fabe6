//! Data models for literature metadata.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// One article as returned by efetch XML, from `db=pubmed` or `db=pmc`.
/// Only the fields the weighting needs are kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArticleRecord {
    pub pmid: Option<String>,
    /// PMC cross-reference, e.g. `"PMC7152845"`.
    pub pmc: Option<String>,
    /// `"LastName, ForeName"`, or the collective name of a group author.
    pub authors: Vec<String>,
    pub affiliations: Vec<String>,
    /// `DateCompleted` of the MEDLINE citation.
    pub date_completed: Option<NaiveDate>,
    /// Year of the journal issue (`PubDate`) or of the JATS `pub-date`.
    pub published_year: Option<i32>,
    /// `"GrantID/Agency/Country"`, empty parts omitted.
    pub grants: Vec<String>,
}

impl ArticleRecord {
    /// Numeric PMC id (without the `PMC` prefix) of the richer canonical record.
    pub fn canonical_id(&self) -> Option<String> {
        let pmc = self.pmc.as_deref()?.trim();
        let id = pmc.strip_prefix("PMC").unwrap_or(pmc);
        if id.is_empty() {
            None
        } else {
            Some(id.to_string())
        }
    }

    /// Completion year, falling back to the publication year.
    pub fn year(&self) -> Option<i32> {
        self.date_completed
            .map(|date| date.year())
            .or(self.published_year)
    }
}

/// What the literature client returns for one identifier: the primary record
/// and, when it cross-references one, the canonical record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    pub primary: ArticleRecord,
    pub canonical: Option<ArticleRecord>,
}

impl RawRecord {
    pub fn primary(primary: ArticleRecord) -> Self {
        Self { primary, canonical: None }
    }
}

/// Bibliographic metadata cached per citation identifier.
/// Immutable once written to the record cache.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CitationRecord {
    /// Whether a canonical (PMC) record was found and supplied the authors.
    #[serde(default)]
    pub canonical: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical_id: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub affiliations: Vec<String>,
    /// `None` sorts below every known year.
    #[serde(default)]
    pub pub_year: Option<i32>,
    #[serde(default)]
    pub grants: Vec<String>,
    /// Identifiers of papers citing this one.
    #[serde(default)]
    pub citations: Vec<String>,
}

impl CitationRecord {
    /// Build a record from a fetched primary/canonical pair.
    ///
    /// Authors come from the canonical record when it lists any. Every other
    /// field is taken from the canonical record when present there, then from
    /// the primary record, and is empty otherwise.
    pub fn resolve(raw: &RawRecord, citations: Vec<String>) -> Self {
        let primary = &raw.primary;
        let canonical = raw
            .canonical
            .as_ref()
            .filter(|c| !c.authors.is_empty());

        let Some(canon) = canonical else {
            return Self {
                canonical: false,
                canonical_id: None,
                authors: primary.authors.clone(),
                affiliations: primary.affiliations.clone(),
                pub_year: primary.year(),
                grants: primary.grants.clone(),
                citations,
            };
        };

        Self {
            canonical: true,
            canonical_id: primary.canonical_id(),
            authors: canon.authors.clone(),
            affiliations: prefer(&canon.affiliations, &primary.affiliations),
            pub_year: canon.year().or_else(|| primary.year()),
            grants: prefer(&canon.grants, &primary.grants),
            citations,
        }
    }

    pub fn citation_count(&self) -> usize {
        self.citations.len()
    }
}

fn prefer(first: &[String], fallback: &[String]) -> Vec<String> {
    if first.is_empty() {
        fallback.to_vec()
    } else {
        first.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn primary() -> ArticleRecord {
        ArticleRecord {
            pmid: Some("32142651".into()),
            pmc: Some("PMC7102627".into()),
            authors: vec!["Hoffmann, M".into()],
            affiliations: vec!["German Primate Center".into()],
            date_completed: NaiveDate::from_ymd_opt(2020, 4, 21),
            published_year: Some(2020),
            grants: vec!["P01 AI-1".into()],
        }
    }

    #[test]
    fn test_canonical_id_strips_prefix() {
        assert_eq!(primary().canonical_id(), Some("7102627".to_string()));
        let none = ArticleRecord { pmc: Some("PMC".into()), ..Default::default() };
        assert_eq!(none.canonical_id(), None);
    }

    #[test]
    fn test_year_prefers_completion_date() {
        assert_eq!(primary().year(), Some(2020));
        let issue_only = ArticleRecord { published_year: Some(2015), ..Default::default() };
        assert_eq!(issue_only.year(), Some(2015));
        assert_eq!(ArticleRecord::default().year(), None);
    }

    #[test]
    fn test_resolve_uses_canonical_fields_with_fallback() {
        let canonical = ArticleRecord {
            authors: vec!["Hoffmann, Markus".into(), "Pohlmann, Stefan".into()],
            date_completed: NaiveDate::from_ymd_opt(2020, 5, 1),
            ..Default::default()
        };
        let raw = RawRecord { primary: primary(), canonical: Some(canonical) };
        let rec = CitationRecord::resolve(&raw, vec!["1".into(), "2".into()]);

        assert!(rec.canonical);
        assert_eq!(rec.canonical_id.as_deref(), Some("7102627"));
        assert_eq!(rec.authors, vec!["Hoffmann, Markus", "Pohlmann, Stefan"]);
        // Missing on the canonical record, so taken from the primary one.
        assert_eq!(rec.affiliations, vec!["German Primate Center"]);
        assert_eq!(rec.grants, vec!["P01 AI-1"]);
        assert_eq!(rec.pub_year, Some(2020));
        assert_eq!(rec.citation_count(), 2);
    }

    #[test]
    fn test_resolve_ignores_canonical_without_authors() {
        let raw = RawRecord { primary: primary(), canonical: Some(ArticleRecord::default()) };
        let rec = CitationRecord::resolve(&raw, vec![]);
        assert!(!rec.canonical);
        assert_eq!(rec.canonical_id, None);
        assert_eq!(rec.authors, vec!["Hoffmann, M"]);
    }

    #[test]
    fn test_resolve_defaults_missing_optional_fields() {
        let bare = ArticleRecord { authors: vec!["Doe, Jane".into()], ..Default::default() };
        let rec = CitationRecord::resolve(&RawRecord::primary(bare), vec![]);
        assert!(rec.affiliations.is_empty());
        assert!(rec.grants.is_empty());
        assert_eq!(rec.pub_year, None);
    }

    #[test]
    fn test_record_deserializes_with_missing_fields() {
        let rec: CitationRecord = serde_json::from_str(r#"{"authors": ["Doe, Jane"]}"#).unwrap();
        assert_eq!(rec.authors, vec!["Doe, Jane"]);
        assert!(rec.citations.is_empty());
        assert!(!rec.canonical);
    }
}
