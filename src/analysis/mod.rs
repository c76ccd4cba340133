//! Cost analysis: hierarchical rollup and summary statistics.

pub mod aggregator;
pub mod rollup;

pub use aggregator::*;
pub use rollup::{rollup, CostSource, Rollup};
