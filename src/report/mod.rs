//! Report rendering for answered queries.

pub mod generator;

pub use generator::*;
