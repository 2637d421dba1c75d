//! Query orchestration module
//!
//! Runs the primary model call, then the research call, and merges both
//! replies into one display text.

mod error;
mod executor;
mod models;

pub use error::OrchestrationError;
pub use executor::Orchestrator;
pub use models::*;

#[cfg(test)]
pub(crate) use executor::tests::ScriptedTransport;
