//! Orchestration results, progress events and states

use serde::{Deserialize, Serialize};

/// Heading placed above research text
pub const RESEARCH_HEADING: &str = "Additional Research:";

/// Disclaimer appended after research text
pub const RESEARCH_DISCLAIMER: &str = "Remember: This information is from internet sources and should not replace professional veterinary advice.";

/// Research text as displayed: heading, text, disclaimer
pub fn research_block(research: &str) -> String {
    format!("{RESEARCH_HEADING}\n{research}\n\n{RESEARCH_DISCLAIMER}")
}

/// Outcome of a successful orchestration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestrationResult {
    /// Reply of the chat/vision model
    pub primary_text: String,
    /// Reply of the research model, absent when that call failed
    pub secondary_text: Option<String>,
    /// Text to display
    pub combined_text: String,
}

impl OrchestrationResult {
    pub fn new(primary_text: String, secondary_text: Option<String>) -> Self {
        let combined_text = match &secondary_text {
            Some(research) => format!("{}\n\n{}", primary_text, research_block(research)),
            None => primary_text.clone(),
        };

        Self {
            primary_text,
            secondary_text,
            combined_text,
        }
    }

    pub fn has_research(&self) -> bool {
        self.secondary_text.is_some()
    }
}

/// States of one orchestration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    PrimaryInFlight,
    PrimaryFailed,
    PrimarySucceeded,
    SecondaryInFlight,
    SecondarySucceeded,
    SecondaryFailed,
    Done,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::PrimaryInFlight => "primary_in_flight",
            Phase::PrimaryFailed => "primary_failed",
            Phase::PrimarySucceeded => "primary_succeeded",
            Phase::SecondaryInFlight => "secondary_in_flight",
            Phase::SecondarySucceeded => "secondary_succeeded",
            Phase::SecondaryFailed => "secondary_failed",
            Phase::Done => "done",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::PrimaryFailed | Phase::Done)
    }
}

/// Progress notification, emitted in state order.
///
/// `PrimaryReady` always precedes `SecondaryReady`, so a caller can show the
/// primary text first and append the research later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrchestrationEvent {
    PrimaryStarted,
    PrimaryReady(String),
    PrimaryFailed,
    SecondaryStarted,
    SecondaryReady(String),
    SecondaryFailed,
    Done,
}

impl OrchestrationEvent {
    /// State entered when this event fires
    pub fn phase(&self) -> Phase {
        match self {
            OrchestrationEvent::PrimaryStarted => Phase::PrimaryInFlight,
            OrchestrationEvent::PrimaryReady(_) => Phase::PrimarySucceeded,
            OrchestrationEvent::PrimaryFailed => Phase::PrimaryFailed,
            OrchestrationEvent::SecondaryStarted => Phase::SecondaryInFlight,
            OrchestrationEvent::SecondaryReady(_) => Phase::SecondarySucceeded,
            OrchestrationEvent::SecondaryFailed => Phase::SecondaryFailed,
            OrchestrationEvent::Done => Phase::Done,
        }
    }
}
