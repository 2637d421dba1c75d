//! Mode profile trait

use crate::config::{PrimaryModelSettings, SecondaryModelSettings};
use crate::proxy::{ChatMessage, Endpoint, ProxyRequest};
use crate::query::{Query, QueryError};

/// System instruction for every research call
pub const RESEARCH_INSTRUCTION: &str = "Search the internet for recent veterinary research and guidelines related to the query. Focus on scientific sources and evidence-based information.";

/// Per-feature request shaping.
///
/// A profile decides what the two proxy requests look like for its feature.
/// It never decides the order or number of calls; that belongs to the
/// orchestrator.
pub trait ModeProfile: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Reject input that must not reach the proxy
    fn validate(&self, query: &Query) -> Result<(), QueryError> {
        query.validate_text()
    }

    /// Request for the chat/vision model
    fn primary_request(&self, query: &Query, model: &PrimaryModelSettings) -> ProxyRequest;

    /// User turn for the research model, derived from the user's own input
    fn research_prompt(&self, query: &Query) -> String;

    /// Request for the search-augmented model
    fn research_request(&self, query: &Query, model: &SecondaryModelSettings) -> ProxyRequest {
        ProxyRequest::new(Endpoint::Secondary, model.model.clone(), model.max_tokens)
            .system(RESEARCH_INSTRUCTION)
            .message(ChatMessage::user(self.research_prompt(query)))
            .temperature(model.temperature)
    }

    /// Fixed text shown when the primary call fails
    fn fallback_message(&self) -> &'static str;
}
