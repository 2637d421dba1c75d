//! PetPal: dual-source AI assistant backend for PetPal.co
//!
//! Every feature (chat, pet photo analysis, breed tips) runs the same flow:
//! a primary request to a general chat/vision model, followed by a
//! best-effort research request to a search-augmented model. The results are
//! merged into one user-facing text.

pub mod config;
pub mod modes;
pub mod network;
pub mod orchestrator;
pub mod proxy;
pub mod query;
pub mod session;
pub mod web;

pub use config::Settings;
pub use modes::{Mode, TipCategory};
pub use orchestrator::{OrchestrationError, OrchestrationResult, Orchestrator};
pub use query::{ImageAttachment, Query, Role, Turn};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default timeout for proxy requests in seconds
pub const DEFAULT_TIMEOUT: u64 = 30;

/// Maximum timeout that can be set
pub const MAX_TIMEOUT: u64 = 120;
