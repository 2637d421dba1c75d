//! Settings structures for PetPal configuration

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use url::Url;

/// Main settings structure, mirrors `settings.yml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub server: ServerSettings,
    pub outgoing: OutgoingSettings,
    pub primary: PrimaryModelSettings,
    pub secondary: SecondaryModelSettings,
}

impl Settings {
    /// Load settings from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_yaml(&content)
    }

    /// Parse settings from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        let settings: Settings = serde_yaml::from_str(content)?;
        Ok(settings)
    }

    /// Merge with environment variables (PETPAL_* prefix)
    pub fn merge_env(&mut self) {
        self.merge_vars(|key| std::env::var(key).ok());
    }

    fn merge_vars(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("PETPAL_DEBUG") {
            self.general.debug = val.parse().unwrap_or(false);
        }
        if let Some(val) = var("PETPAL_PORT") {
            if let Ok(port) = val.parse() {
                self.server.port = port;
            }
        }
        if let Some(val) = var("PETPAL_BIND_ADDRESS") {
            self.server.bind_address = val;
        }
        if let Some(val) = var("PETPAL_MAX_BODY_SIZE") {
            if let Ok(size) = val.parse() {
                self.server.max_body_size = size;
            }
        }
        if let Some(val) = var("PETPAL_PRIMARY_URL") {
            self.outgoing.primary_url = val;
        }
        if let Some(val) = var("PETPAL_SECONDARY_URL") {
            self.outgoing.secondary_url = val;
        }
        if let Some(val) = var("PETPAL_REQUEST_TIMEOUT") {
            if let Ok(timeout) = val.parse() {
                self.outgoing.request_timeout = timeout;
            }
        }
        if let Some(val) = var("PETPAL_PRIMARY_MODEL") {
            self.primary.model = val;
        }
        if let Some(val) = var("PETPAL_SECONDARY_MODEL") {
            self.secondary.model = val;
        }
    }

    /// Check values that would otherwise only fail at request time
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.outgoing.primary_url)
            .with_context(|| format!("invalid primary_url: {}", self.outgoing.primary_url))?;
        Url::parse(&self.outgoing.secondary_url)
            .with_context(|| format!("invalid secondary_url: {}", self.outgoing.secondary_url))?;

        let timeout = self.outgoing.request_timeout;
        if !(timeout.is_finite() && timeout > 0.0) {
            bail!("request_timeout must be a positive number of seconds, got {timeout}");
        }
        if let Some(max) = self.outgoing.max_request_timeout {
            if !max.is_finite() {
                bail!("max_request_timeout must be finite, got {max}");
            }
            if max < timeout {
                bail!("max_request_timeout must not be below request_timeout");
            }
        }
        if self.server.max_body_size == 0 {
            bail!("max_body_size must be positive");
        }
        if !(0.0..=2.0).contains(&self.secondary.temperature) {
            bail!("secondary temperature must be within 0.0..=2.0");
        }
        Ok(())
    }

    /// Default log filter when `RUST_LOG` is unset
    pub fn log_level(&self) -> &'static str {
        if self.general.debug {
            "debug"
        } else {
            "info"
        }
    }

    /// Effective per-request timeout in seconds
    pub fn effective_timeout(&self) -> f64 {
        self.outgoing.effective_timeout()
    }
}

/// General settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Enable debug mode
    pub debug: bool,
    /// Instance name reported by the API
    pub instance_name: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            debug: false,
            instance_name: "PetPal.co".to_string(),
        }
    }
}

/// Server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Server port
    pub port: u16,
    /// Bind address
    pub bind_address: String,
    /// Largest accepted request body in bytes. Photos arrive as base64 data URIs.
    pub max_body_size: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: 8080,
            bind_address: "127.0.0.1".to_string(),
            max_body_size: 20 * 1024 * 1024,
        }
    }
}

/// Outgoing request settings for the backend proxy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutgoingSettings {
    /// Proxy route fronting the chat/vision model
    pub primary_url: String,
    /// Proxy route fronting the search-augmented research model
    pub secondary_url: String,
    /// Default request timeout in seconds
    pub request_timeout: f64,
    /// Maximum request timeout
    pub max_request_timeout: Option<f64>,
    /// Pool max size
    pub pool_maxsize: usize,
    /// Verify SSL certificates
    pub verify_ssl: bool,
    /// Extra headers to send with every proxy request
    pub extra_headers: HashMap<String, String>,
}

impl OutgoingSettings {
    /// Request timeout capped by `max_request_timeout`
    pub fn effective_timeout(&self) -> f64 {
        let max = self.max_request_timeout.unwrap_or(crate::MAX_TIMEOUT as f64);
        // NaN stays NaN so it is rejected downstream
        if self.request_timeout > max {
            max
        } else {
            self.request_timeout
        }
    }
}

impl Default for OutgoingSettings {
    fn default() -> Self {
        Self {
            primary_url: "http://localhost:5001/api/openai".to_string(),
            secondary_url: "http://localhost:5001/api/perplexity".to_string(),
            request_timeout: crate::DEFAULT_TIMEOUT as f64,
            max_request_timeout: Some(crate::MAX_TIMEOUT as f64),
            pool_maxsize: 20,
            verify_ssl: true,
            extra_headers: HashMap::new(),
        }
    }
}

/// Chat/vision model used for the primary call
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrimaryModelSettings {
    /// Model identifier forwarded to the proxy
    pub model: String,
    /// Output token limit for chat replies
    pub chat_max_tokens: u32,
    /// Output token limit for photo analysis
    pub image_max_tokens: u32,
    /// Output token limit for tips
    pub tip_max_tokens: u32,
}

impl Default for PrimaryModelSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            chat_max_tokens: 500,
            image_max_tokens: 500,
            tip_max_tokens: 300,
        }
    }
}

/// Search-augmented model used for the research call
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecondaryModelSettings {
    /// Model identifier forwarded to the proxy
    pub model: String,
    /// Sampling temperature
    pub temperature: f64,
    /// Output token limit
    pub max_tokens: u32,
}

impl Default for SecondaryModelSettings {
    fn default() -> Self {
        Self {
            model: "llama-3.1-sonar-small-128k-online".to_string(),
            temperature: 0.2,
            max_tokens: 300,
        }
    }
}
