//! Application state shared across handlers

use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Global settings
    pub settings: Arc<Settings>,
    /// Query orchestrator
    pub orchestrator: Arc<Orchestrator>,
    /// Cancelled when the server shuts down
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Create application state talking to the configured proxy
    pub fn new(settings: Settings) -> anyhow::Result<Self> {
        let orchestrator = Orchestrator::from_settings(&settings)?;
        Ok(Self::with_orchestrator(settings, orchestrator))
    }

    /// Create application state around an existing orchestrator
    pub fn with_orchestrator(settings: Settings, orchestrator: Orchestrator) -> Self {
        Self {
            settings: Arc::new(settings),
            orchestrator: Arc::new(orchestrator),
            shutdown: CancellationToken::new(),
        }
    }

    /// Get instance name
    pub fn instance_name(&self) -> &str {
        &self.settings.general.instance_name
    }

    /// Token for one request, cancelled on shutdown
    pub fn request_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }
}
