//! Query workflows and the engine that routes between them.

pub mod aggregation;
pub mod engine;
pub mod extraction;
pub mod router;
pub mod stages;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use engine::QueryEngine;
pub use state::EngineSettings;
