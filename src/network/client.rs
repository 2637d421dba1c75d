//! HTTP client for the backend proxy routes

use crate::config::OutgoingSettings;
use crate::proxy::{Endpoint, ProxyError, ProxyRequest, ProxyResponse, ProxyTransport};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, trace};

/// HTTP client wrapper that knows where both proxy routes live
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    default_timeout: Duration,
    primary_url: String,
    secondary_url: String,
    extra_headers: HashMap<String, String>,
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> Result<Self> {
        Self::with_settings(&OutgoingSettings::default())
    }

    /// Create a new HTTP client with custom settings
    pub fn with_settings(settings: &OutgoingSettings) -> Result<Self> {
        let timeout = Duration::try_from_secs_f64(settings.effective_timeout())
            .with_context(|| format!("invalid request_timeout: {}", settings.request_timeout))?;
        let mut builder = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(settings.pool_maxsize)
            .user_agent(concat!("petpal/", env!("CARGO_PKG_VERSION")))
            .gzip(true)
            .brotli(true);

        // SSL verification
        if !settings.verify_ssl {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder.build()?;

        Ok(Self {
            client,
            default_timeout: timeout,
            primary_url: settings.primary_url.clone(),
            secondary_url: settings.secondary_url.clone(),
            extra_headers: settings.extra_headers.clone(),
        })
    }

    /// Override the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// URL serving the given route
    pub fn url_for(&self, endpoint: Endpoint) -> &str {
        match endpoint {
            Endpoint::Primary => &self.primary_url,
            Endpoint::Secondary => &self.secondary_url,
        }
    }

    /// Execute a proxy request with custom timeout
    pub async fn execute_with_timeout(
        &self,
        request: &ProxyRequest,
        timeout: Duration,
    ) -> Result<ProxyResponse, ProxyError> {
        let url = self.url_for(request.endpoint);
        let body = request.wire();

        debug!(
            endpoint = %request.endpoint,
            model = %request.model,
            messages = request.messages.len(),
            "sending proxy request"
        );
        trace!(%url, ?body, "proxy request body");

        let mut req_builder = self
            .client
            .post(url)
            .timeout(timeout)
            .header("Accept", "application/json")
            .json(&body);

        for (key, value) in &self.extra_headers {
            req_builder = req_builder.header(key, value);
        }

        let response = req_builder.send().await.map_err(classify)?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(classify)?;

        debug!(endpoint = %request.endpoint, status, bytes = text.len(), "proxy replied");

        ProxyResponse::from_http(status, &text)
    }
}

#[async_trait]
impl ProxyTransport for HttpClient {
    async fn send(&self, request: &ProxyRequest) -> Result<ProxyResponse, ProxyError> {
        self.execute_with_timeout(request, self.default_timeout).await
    }
}

fn classify(err: reqwest::Error) -> ProxyError {
    if err.is_timeout() {
        ProxyError::Timeout
    } else {
        ProxyError::Transport(err.to_string())
    }
}
