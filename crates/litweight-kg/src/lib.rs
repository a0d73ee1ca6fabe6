//! litweight-kg — Knowledge-graph subgraph documents and the per-run context
//! every scoring phase works against.

pub mod subgraph;
pub mod context;

pub use context::{EdgeEvidence, RunContext};
pub use subgraph::{citation_ids, Category, Link, Node, Subgraph};
