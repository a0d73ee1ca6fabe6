//! litweight-ranker — Literature-support edge weighting.
//! Author authority (h-index), the five edge-weight scorers, the weight
//! table, and the `calculate_edge_weights` entry point tying them together.

pub mod normalise;
pub mod weights;
pub mod hindex;
pub mod scorer;
pub mod aggregate;
pub mod pipeline;

pub use aggregate::EdgeWeightRow;
pub use pipeline::{calculate_edge_weights, PipelineConfig, PipelineOutput};
pub use scorer::EdgeWeights;
pub use weights::WeightConfig;
