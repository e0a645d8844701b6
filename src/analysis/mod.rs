//! Analysis modules.
//!
//! Aggregation of the six agents' results into the report's risk level,
//! key findings and recommendations.

pub mod aggregator;

pub use aggregator::*;
