//! Breed and category tips

use super::traits::ModeProfile;
use super::TipCategory;
use crate::config::PrimaryModelSettings;
use crate::proxy::{ChatMessage, Endpoint, ProxyRequest};
use crate::query::{Query, QueryError};

pub const TIP_FALLBACK: &str =
    "Sorry, I encountered an issue generating a tip. Please try again later.";

/// Minimum breed length accepted by the tip form
const MIN_BREED_CHARS: usize = 2;

/// Tip profile. The query text is the dog breed.
pub struct TipProfile {
    category: TipCategory,
}

impl TipProfile {
    pub fn new(category: TipCategory) -> Self {
        Self { category }
    }

    fn system_prompt(&self) -> String {
        format!(
            "You are a knowledgeable pet care assistant. Use reliable sources to provide accurate advice based on scientific research and veterinary medicine publications. Focus on the requested category: {}. Use emoji occasionally to be friendly. Keep responses concise (100-150 words).",
            self.category
        )
    }
}

impl ModeProfile for TipProfile {
    fn name(&self) -> &'static str {
        "tip"
    }

    fn validate(&self, query: &Query) -> Result<(), QueryError> {
        query.validate_text()?;
        if query.text().chars().count() < MIN_BREED_CHARS {
            return Err(QueryError::BreedTooShort);
        }
        Ok(())
    }

    fn primary_request(&self, query: &Query, model: &PrimaryModelSettings) -> ProxyRequest {
        let prompt = format!(
            "Please give me a well-researched, factual tip about {} for my {}. Base this on reputable veterinary sources and scientific studies when possible.",
            self.category,
            query.text()
        );

        ProxyRequest::new(Endpoint::Primary, model.model.clone(), model.tip_max_tokens)
            .system(self.system_prompt())
            .message(ChatMessage::user(prompt))
    }

    fn research_prompt(&self, query: &Query) -> String {
        format!(
            "Find recent research or veterinary guidelines about {} for {} dogs. Focus on evidence-based information.",
            self.category,
            query.text()
        )
    }

    fn fallback_message(&self) -> &'static str {
        TIP_FALLBACK
    }
}
