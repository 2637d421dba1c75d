//! User query input
//!
//! A [`Query`] carries the user's text, an optional image attachment and the
//! prior conversation turns. It is immutable once built; validation against a
//! particular mode happens in the orchestrator before any request is sent.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Prompt used for photo analysis when the user typed nothing
pub const DEFAULT_IMAGE_PROMPT: &str =
    "Please analyze this pet image and tell me if you notice any potential health concerns or issues";

/// Author of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One prior turn of a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Input rejected before any request was made
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("query text is empty")]
    EmptyText,

    #[error("an image attachment is required")]
    MissingImage,

    #[error("attachment is not a valid image: {0}")]
    InvalidImage(String),

    #[error("breed must be at least 2 characters")]
    BreedTooShort,
}

impl QueryError {
    /// Message safe to show to the user
    pub fn user_message(&self) -> &'static str {
        match self {
            QueryError::EmptyText => "Please enter a message.",
            QueryError::MissingImage | QueryError::InvalidImage(_) => "Please upload an image file",
            QueryError::BreedTooShort => "Please enter a dog breed",
        }
    }
}

/// An image encoded as a base64 `data:` URI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ImageAttachment {
    mime: String,
    data_uri: String,
}

impl ImageAttachment {
    /// Validate an existing `data:image/...;base64,...` URI
    pub fn from_data_uri(uri: impl Into<String>) -> Result<Self, QueryError> {
        let uri = uri.into();
        let rest = uri
            .strip_prefix("data:")
            .ok_or_else(|| QueryError::InvalidImage("not a data URI".to_string()))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| QueryError::InvalidImage("missing payload".to_string()))?;
        let mime = header
            .strip_suffix(";base64")
            .ok_or_else(|| QueryError::InvalidImage("payload is not base64".to_string()))?;

        if !mime.starts_with("image/") || mime.len() == "image/".len() {
            return Err(QueryError::InvalidImage(format!("unsupported type {mime}")));
        }
        if payload.is_empty() {
            return Err(QueryError::InvalidImage("empty payload".to_string()));
        }
        STANDARD
            .decode(payload)
            .map_err(|e| QueryError::InvalidImage(e.to_string()))?;

        Ok(Self {
            mime: mime.to_string(),
            data_uri: uri,
        })
    }

    /// Encode raw image bytes
    pub fn from_bytes(mime: &str, bytes: &[u8]) -> Result<Self, QueryError> {
        if !mime.starts_with("image/") {
            return Err(QueryError::InvalidImage(format!("unsupported type {mime}")));
        }
        if bytes.is_empty() {
            return Err(QueryError::InvalidImage("empty payload".to_string()));
        }
        Ok(Self {
            mime: mime.to_string(),
            data_uri: format!("data:{};base64,{}", mime, STANDARD.encode(bytes)),
        })
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn data_uri(&self) -> &str {
        &self.data_uri
    }
}

impl TryFrom<String> for ImageAttachment {
    type Error = QueryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_data_uri(value)
    }
}

impl From<ImageAttachment> for String {
    fn from(value: ImageAttachment) -> Self {
        value.data_uri
    }
}

/// User query submitted to the orchestrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    text: String,
    attachment: Option<ImageAttachment>,
    context: Vec<Turn>,
}

impl Query {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            attachment: None,
            context: Vec::new(),
        }
    }

    /// Photo analysis query with the default prompt
    pub fn image(attachment: ImageAttachment) -> Self {
        Self::new(DEFAULT_IMAGE_PROMPT).with_attachment(attachment)
    }

    pub fn with_attachment(mut self, attachment: ImageAttachment) -> Self {
        self.attachment = Some(attachment);
        self
    }

    pub fn with_context(mut self, context: impl IntoIterator<Item = Turn>) -> Self {
        self.context = context.into_iter().collect();
        self
    }

    /// Text with surrounding whitespace removed
    pub fn text(&self) -> &str {
        self.text.trim()
    }

    pub fn attachment(&self) -> Option<&ImageAttachment> {
        self.attachment.as_ref()
    }

    pub fn context(&self) -> &[Turn] {
        &self.context
    }

    /// Check the text is non-empty after trimming
    pub fn validate_text(&self) -> Result<(), QueryError> {
        if self.text().is_empty() {
            Err(QueryError::EmptyText)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PIXEL: &str = "data:image/png;base64,iVBORw0KGgo=";

    #[test]
    fn test_text_is_trimmed() {
        let query = Query::new("  Is chocolate toxic to dogs?\n");
        assert_eq!(query.text(), "Is chocolate toxic to dogs?");
        assert!(query.validate_text().is_ok());
    }

    #[test]
    fn test_whitespace_text_rejected() {
        assert_eq!(Query::new(" \t\n ").validate_text(), Err(QueryError::EmptyText));
        assert_eq!(Query::new("").validate_text(), Err(QueryError::EmptyText));
    }

    #[test]
    fn test_valid_data_uri() {
        let image = ImageAttachment::from_data_uri(PIXEL).unwrap();
        assert_eq!(image.mime(), "image/png");
        assert_eq!(image.data_uri(), PIXEL);
    }

    #[test]
    fn test_invalid_data_uris() {
        for uri in [
            "https://example.com/cat.png",
            "data:text/plain;base64,aGVsbG8=",
            "data:image/png,rawbytes",
            "data:image/png;base64,",
            "data:image/png;base64,@@not-base64@@",
            "data:image/;base64,aGVsbG8=",
        ] {
            assert!(
                matches!(ImageAttachment::from_data_uri(uri), Err(QueryError::InvalidImage(_))),
                "accepted {uri}"
            );
        }
    }

    #[test]
    fn test_from_bytes_round_trips_through_validation() {
        let image = ImageAttachment::from_bytes("image/jpeg", &[0xff, 0xd8, 0xff]).unwrap();
        assert!(image.data_uri().starts_with("data:image/jpeg;base64,"));
        assert!(ImageAttachment::from_data_uri(image.data_uri()).is_ok());
        assert!(ImageAttachment::from_bytes("application/pdf", b"%PDF").is_err());
    }

    #[test]
    fn test_image_query_uses_default_prompt() {
        let query = Query::image(ImageAttachment::from_data_uri(PIXEL).unwrap());
        assert_eq!(query.text(), DEFAULT_IMAGE_PROMPT);
        assert!(query.attachment().is_some());
    }

    #[test]
    fn test_attachment_deserializes_from_string() {
        let image: ImageAttachment = serde_json::from_str(&format!("\"{PIXEL}\"")).unwrap();
        assert_eq!(image.mime(), "image/png");
        assert!(serde_json::from_str::<ImageAttachment>("\"nope\"").is_err());
    }
}
