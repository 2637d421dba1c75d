//! Proxy request and response types

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which proxy route a request goes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    /// General chat/vision model (`/api/openai`)
    Primary,
    /// Search-augmented research model (`/api/perplexity`)
    Secondary,
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Endpoint::Primary => write!(f, "primary"),
            Endpoint::Secondary => write!(f, "secondary"),
        }
    }
}

/// Role of a message on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// Message content: plain text, or multimodal blocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// One block of a multimodal message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

/// Image reference inside a content block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

/// A single chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: MessageContent::Text(text.into()),
        }
    }

    /// User message carrying a text block followed by an image block
    pub fn user_with_image(text: impl Into<String>, image_url: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: MessageContent::Parts(vec![
                ContentPart::Text { text: text.into() },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: image_url.into(),
                    },
                },
            ]),
        }
    }
}

/// A request to one of the proxy routes. Built fresh for every call.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyRequest {
    /// Target route
    pub endpoint: Endpoint,
    /// Model identifier
    pub model: String,
    /// System instruction, sent as the leading `system` message
    pub system_instruction: String,
    /// Conversation messages after the system instruction
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature (omitted from the body when unset)
    pub temperature: Option<f64>,
    /// Output token limit
    pub max_tokens: u32,
}

/// Request body as posted to the proxy, borrowed from a [`ProxyRequest`]
#[derive(Debug, Serialize)]
pub struct WireRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    pub max_tokens: u32,
}

impl ProxyRequest {
    pub fn new(endpoint: Endpoint, model: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            endpoint,
            model: model.into(),
            system_instruction: String::new(),
            messages: Vec::new(),
            temperature: None,
            max_tokens,
        }
    }

    pub fn system(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = instruction.into();
        self
    }

    pub fn message(mut self, message: ChatMessage) -> Self {
        self.messages.push(message);
        self
    }

    pub fn messages(mut self, messages: impl IntoIterator<Item = ChatMessage>) -> Self {
        self.messages.extend(messages);
        self
    }

    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Body as posted to the proxy, with the system instruction leading
    pub fn wire(&self) -> WireRequest<'_> {
        let mut messages = Vec::with_capacity(self.messages.len() + 1);
        if !self.system_instruction.is_empty() {
            messages.push(ChatMessage::system(self.system_instruction.clone()));
        }
        messages.extend(self.messages.iter().cloned());

        WireRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

/// Successful proxy reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyResponse {
    pub content: String,
}

#[derive(Deserialize)]
struct CompletionEnvelope {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ProxyResponse {
    /// Interpret a raw HTTP reply.
    ///
    /// Non-2xx statuses, bodies that are not JSON and bodies without a
    /// non-blank `choices[0].message.content` are all failures.
    pub fn from_http(status: u16, body: &str) -> Result<Self, ProxyError> {
        if !(200..300).contains(&status) {
            return Err(ProxyError::Status {
                status,
                body: truncate(body, 512),
            });
        }

        let envelope: CompletionEnvelope =
            serde_json::from_str(body).map_err(|e| ProxyError::Malformed(e.to_string()))?;

        envelope
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .filter(|c| !c.trim().is_empty())
            .map(|content| Self { content })
            .ok_or(ProxyError::MissingContent)
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}

/// Failure of a single proxy call
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProxyError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("request timed out")]
    Timeout,

    #[error("proxy returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response body: {0}")]
    Malformed(String),

    #[error("response has no choices[0].message.content")]
    MissingContent,
}

impl ProxyError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ProxyError::Timeout)
    }
}
