//! Pet photo analysis

use super::traits::ModeProfile;
use crate::config::PrimaryModelSettings;
use crate::proxy::{ChatMessage, Endpoint, ProxyRequest};
use crate::query::{Query, QueryError};

pub const IMAGE_SYSTEM_PROMPT: &str = "You are a veterinary assistant that analyzes pet images. Look for signs of health issues, skin problems, or concerning symptoms. Be informative but remind users that this is not a substitute for professional veterinary care. Use emoji occasionally to be friendly.";

pub const IMAGE_FALLBACK: &str = "Sorry, I encountered an issue analyzing this image. Please try again later. Remember to consult a veterinarian for any health concerns.";

/// Vision profile: one user turn with a text block and the image
pub struct ImageAnalysisProfile;

impl ModeProfile for ImageAnalysisProfile {
    fn name(&self) -> &'static str {
        "image_analysis"
    }

    fn validate(&self, query: &Query) -> Result<(), QueryError> {
        query.validate_text()?;
        match query.attachment() {
            Some(_) => Ok(()),
            None => Err(QueryError::MissingImage),
        }
    }

    fn primary_request(&self, query: &Query, model: &PrimaryModelSettings) -> ProxyRequest {
        let request =
            ProxyRequest::new(Endpoint::Primary, model.model.clone(), model.image_max_tokens)
                .system(IMAGE_SYSTEM_PROMPT);

        match query.attachment() {
            Some(image) => request.message(ChatMessage::user_with_image(
                query.text(),
                image.data_uri(),
            )),
            None => request.message(ChatMessage::user(query.text())),
        }
    }

    fn research_prompt(&self, query: &Query) -> String {
        format!(
            "Please provide additional recent research or veterinary guidelines related to this pet image analysis request: {}",
            query.text()
        )
    }

    fn fallback_message(&self) -> &'static str {
        IMAGE_FALLBACK
    }
}
