//! Transport trait

use super::types::{ProxyError, ProxyRequest, ProxyResponse};
use async_trait::async_trait;

/// Anything that can deliver a [`ProxyRequest`] to its route.
///
/// Implementations make exactly one attempt per call.
#[async_trait]
pub trait ProxyTransport: Send + Sync {
    /// Send the request and extract the reply content
    async fn send(&self, request: &ProxyRequest) -> Result<ProxyResponse, ProxyError>;
}
