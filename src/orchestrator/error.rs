//! Orchestration failures

use crate::modes::Mode;
use crate::proxy::ProxyError;
use crate::query::QueryError;
use thiserror::Error;

/// Why an orchestration produced no result
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OrchestrationError {
    /// Rejected before any request was sent
    #[error("invalid input: {0}")]
    InvalidInput(#[from] QueryError),

    /// The chat/vision call failed; nothing is shown but the fallback
    #[error("{mode} primary query failed: {source}")]
    PrimaryQueryFailed { mode: Mode, source: ProxyError },

    /// The research call failed. Absorbed by the orchestrator, never returned
    /// from `run`; exists so the failure is logged with the same taxonomy.
    #[error("{mode} secondary query failed: {source}")]
    SecondaryQueryFailed { mode: Mode, source: ProxyError },

    /// The caller cancelled before the primary reply arrived
    #[error("{mode} query cancelled")]
    Cancelled { mode: Mode },
}

impl OrchestrationError {
    /// Fixed text safe to display. Never contains raw error details.
    pub fn user_message(&self) -> &'static str {
        match self {
            OrchestrationError::InvalidInput(err) => err.user_message(),
            OrchestrationError::PrimaryQueryFailed { mode, .. }
            | OrchestrationError::SecondaryQueryFailed { mode, .. } => mode.fallback_message(),
            OrchestrationError::Cancelled { .. } => "Request cancelled.",
        }
    }

    pub fn is_invalid_input(&self) -> bool {
        matches!(self, OrchestrationError::InvalidInput(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modes::{CHAT_FALLBACK, TIP_FALLBACK};
    use crate::modes::TipCategory;

    #[test]
    fn test_user_message_hides_details() {
        let err = OrchestrationError::PrimaryQueryFailed {
            mode: Mode::Chat,
            source: ProxyError::Status {
                status: 500,
                body: "stack trace with secrets".to_string(),
            },
        };
        assert_eq!(err.user_message(), CHAT_FALLBACK);
        assert!(!err.user_message().contains("secrets"));
        assert!(err.to_string().contains("500"));
    }

    #[test]
    fn test_invalid_input_message() {
        let err: OrchestrationError = QueryError::BreedTooShort.into();
        assert!(err.is_invalid_input());
        assert_eq!(err.user_message(), "Please enter a dog breed");

        let err = OrchestrationError::PrimaryQueryFailed {
            mode: Mode::Tip(TipCategory::General),
            source: ProxyError::Timeout,
        };
        assert_eq!(err.user_message(), TIP_FALLBACK);
    }
}
