//! litweight-ingestion — Literature metadata harvesting.
//! - Entrez E-utilities client (rate-limited, bounded retries)
//! - PubMed / PMC efetch XML parsing and canonical/fallback resolution
//! - Persistent record and author caches
//! - Metadata collection for a subgraph's citation identifiers

pub mod sources;
pub mod models;
pub mod cache;
pub mod collector;

pub use cache::{AuthorCache, RecordCache};
pub use collector::MetadataCollector;
pub use models::{ArticleRecord, CitationRecord, RawRecord};
