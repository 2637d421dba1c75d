//! Conversational vet assistant

use super::traits::ModeProfile;
use crate::config::PrimaryModelSettings;
use crate::proxy::{ChatMessage, Endpoint, ProxyRequest};
use crate::query::{Query, Role};

pub const CHAT_SYSTEM_PROMPT: &str = "You are a helpful, research-oriented veterinary assistant for PetPal.co. Provide evidence-based advice about pet health, behavior, and care. Use emoji occasionally to be friendly. Always include references to scientific research or veterinary guidelines when possible. Clarify you are an AI and serious health concerns should be addressed by a real veterinarian.";

pub const CHAT_FALLBACK: &str = "Sorry, I encountered an issue. Please try again later. Remember for real emergencies, please contact a veterinarian. 🐾";

/// Chat profile: replays the conversation so far, then the new turn
pub struct ChatProfile;

impl ModeProfile for ChatProfile {
    fn name(&self) -> &'static str {
        "chat"
    }

    fn primary_request(&self, query: &Query, model: &PrimaryModelSettings) -> ProxyRequest {
        let context = query.context().iter().map(|turn| match turn.role {
            Role::User => ChatMessage::user(turn.content.clone()),
            Role::Assistant => ChatMessage::assistant(turn.content.clone()),
        });

        ProxyRequest::new(Endpoint::Primary, model.model.clone(), model.chat_max_tokens)
            .system(CHAT_SYSTEM_PROMPT)
            .messages(context)
            .message(ChatMessage::user(query.text()))
    }

    fn research_prompt(&self, query: &Query) -> String {
        query.text().to_string()
    }

    fn fallback_message(&self) -> &'static str {
        CHAT_FALLBACK
    }
}
