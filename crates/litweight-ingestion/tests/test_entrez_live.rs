//! Smoke tests against the live Entrez E-utilities.
//!
//! Run with: NCBI_EMAIL=you@example.org cargo test --package litweight-ingestion --test test_entrez_live -- --ignored --nocapture

use litweight_ingestion::sources::pubmed::{EntrezClient, EntrezConfig};
use litweight_ingestion::sources::{AuthorQuery, LiteratureApi};
use litweight_ingestion::CitationRecord;

fn client() -> EntrezClient {
    let config = EntrezConfig {
        email: std::env::var("NCBI_EMAIL").unwrap_or_else(|_| "litweight-tests@example.org".to_string()),
        api_key: std::env::var("NCBI_API_KEY").ok(),
        ..Default::default()
    };
    EntrezClient::new(config).expect("client config")
}

#[tokio::test]
#[ignore] // Requires network access
async fn test_fetch_record_with_pmc_cross_reference() {
    let client = client();

    let raw = client
        .fetch_record("32142651")
        .await
        .expect("efetch failed")
        .expect("record exists");
    let citations = client
        .fetch_forward_citations("32142651")
        .await
        .expect("elink failed");
    let record = CitationRecord::resolve(&raw, citations);

    println!("{:#?}", record);
    assert!(!record.authors.is_empty());
    assert_eq!(record.pub_year, Some(2020));
    assert!(record.citation_count() > 0);
}

#[tokio::test]
#[ignore] // Requires network access
async fn test_batched_citation_counts_cover_every_id() {
    let client = client();
    let ids = vec!["32142651".to_string(), "32015507".to_string()];

    let counts = client.fetch_citation_counts(&ids).await.expect("elink failed");
    for id in &ids {
        println!("{}: {} citing papers", id, counts[id].len());
        assert!(counts.contains_key(id));
    }
}

#[tokio::test]
#[ignore] // Requires network access
async fn test_author_search_window() {
    let client = client();
    let query = AuthorQuery {
        name: "Pohlmann, Stefan".to_string(),
        min_year: 1990,
        max_year: 2020,
        max_results: 50,
    };

    let ids = client.search_author(&query).await.expect("esearch failed");
    println!("Found {} papers", ids.len());
    assert!(!ids.is_empty());
    assert!(ids.len() <= 50);
}
