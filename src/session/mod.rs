//! Per-screen state
//!
//! Each feature screen owns its own state (input, loading flag, current
//! result). Screens return [`Outcome`]s carrying an optional [`Notice`]; how a
//! notice is shown is up to the presentation layer.

mod chat;
mod photo;
mod tips;

pub use chat::{ChatSession, GREETING};
pub use photo::PhotoAnalysis;
pub use tips::TipScreen;

use crate::modes::Mode;
use crate::orchestrator::{OrchestrationError, OrchestrationEvent, OrchestrationResult, Orchestrator};
use crate::query::Query;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// How prominent a notice should be
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Error,
}

/// Short user-facing notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub title: String,
    pub description: String,
    pub severity: Severity,
}

impl Notice {
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity: Severity::Info,
        }
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity: Severity::Error,
        }
    }
}

/// What a screen action produced
#[derive(Debug, Clone)]
pub struct Outcome {
    pub mode: Mode,
    /// Text the screen displays: combined reply, fallback or validation hint
    pub text: String,
    pub result: Option<OrchestrationResult>,
    pub error: Option<OrchestrationError>,
    pub notice: Option<Notice>,
}

impl Outcome {
    /// Input rejected before any request
    pub(crate) fn rejected(mode: Mode, error: OrchestrationError) -> Self {
        Self {
            mode,
            text: error.user_message().to_string(),
            result: None,
            error: Some(error),
            notice: None,
        }
    }

    pub(crate) fn completed(
        mode: Mode,
        result: Result<OrchestrationResult, OrchestrationError>,
        on_success: Option<Notice>,
        on_failure: Notice,
    ) -> Self {
        match result {
            Ok(result) => Self {
                mode,
                text: result.combined_text.clone(),
                result: Some(result),
                error: None,
                notice: on_success,
            },
            Err(error) if error.is_invalid_input() => Self::rejected(mode, error),
            Err(error) => Self {
                mode,
                text: error.user_message().to_string(),
                result: None,
                error: Some(error),
                notice: Some(on_failure),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_some()
    }
}

/// Run one orchestration, handing every progress event to `on_event` as soon
/// as it is emitted, so screens can show the primary reply while the research
/// call is still in flight.
pub(crate) async fn drive(
    orchestrator: &Orchestrator,
    query: &Query,
    mode: Mode,
    cancel: &CancellationToken,
    mut on_event: impl FnMut(&OrchestrationEvent),
) -> Result<OrchestrationResult, OrchestrationError> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let run = orchestrator.run_cancellable(query, mode, cancel, Some(&tx));
    tokio::pin!(run);

    let result = loop {
        tokio::select! {
            result = &mut run => break result,
            Some(event) = rx.recv() => on_event(&event),
        }
    };
    while let Ok(event) = rx.try_recv() {
        on_event(&event);
    }
    result
}
