//! Chat screen state

use super::{drive, Notice, Outcome};
use crate::modes::Mode;
use crate::orchestrator::{
    research_block, OrchestrationError, OrchestrationEvent, OrchestrationResult, Orchestrator,
};
use crate::query::{Query, Turn};
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub const GREETING: &str = "Hi there! I'm your PetPal.co virtual vet assistant. How can I help you with your pet today? 🐾";

/// Running conversation with the vet assistant.
///
/// `send` is `begin` + orchestration + `finish`; callers that render while the
/// request is in flight can drive the steps themselves, feeding progress
/// events to [`ChatSession::apply`] and reading [`ChatSession::is_loading`].
#[derive(Debug, Clone)]
pub struct ChatSession {
    history: Vec<Turn>,
    loading: bool,
    /// History length right after the pending user turn
    exchange_start: usize,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::with_turns(vec![Turn::assistant(GREETING)])
    }

    /// Resume a conversation. An empty history starts with the greeting.
    pub fn from_history(history: Vec<Turn>) -> Self {
        if history.is_empty() {
            return Self::new();
        }
        Self::with_turns(history)
    }

    fn with_turns(history: Vec<Turn>) -> Self {
        Self {
            exchange_start: history.len(),
            history,
            loading: false,
        }
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Record the user's turn and build the query for it
    pub fn begin(&mut self, message: &str) -> Result<Query, OrchestrationError> {
        let query = Query::new(message.trim()).with_context(self.history.iter().cloned());
        query.validate_text()?;

        self.history.push(Turn::user(query.text()));
        self.exchange_start = self.history.len();
        self.loading = true;
        Ok(query)
    }

    /// Show a reply as soon as it arrives
    pub fn apply(&mut self, event: &OrchestrationEvent) {
        match event {
            OrchestrationEvent::PrimaryReady(text) => {
                self.history.push(Turn::assistant(text.clone()));
            }
            OrchestrationEvent::SecondaryReady(research) => {
                self.history.push(Turn::assistant(research_block(research)));
            }
            _ => {}
        }
    }

    /// Settle the exchange started by `begin`. Turns shown by `apply` are
    /// replaced by the final result.
    pub fn finish(&mut self, result: Result<OrchestrationResult, OrchestrationError>) -> Outcome {
        self.loading = false;
        self.history.truncate(self.exchange_start);

        if let Ok(result) = &result {
            self.history.push(Turn::assistant(result.primary_text.clone()));
            if let Some(research) = &result.secondary_text {
                self.history.push(Turn::assistant(research_block(research)));
            }
        }

        let outcome = Outcome::completed(
            Mode::Chat,
            result,
            None,
            Notice::error("Error", "Failed to get a response. Please try again later."),
        );
        if !outcome.is_success() {
            self.history.push(Turn::assistant(outcome.text.clone()));
        }
        outcome
    }

    /// Send a message and wait for the full reply
    pub async fn send(&mut self, orchestrator: &Orchestrator, message: &str) -> Outcome {
        self.send_observed(orchestrator, message, &CancellationToken::new(), |_| {})
            .await
    }

    /// Send a message, updating the history as each reply arrives and
    /// passing every progress event on to `observer`
    pub async fn send_observed(
        &mut self,
        orchestrator: &Orchestrator,
        message: &str,
        cancel: &CancellationToken,
        mut observer: impl FnMut(&OrchestrationEvent),
    ) -> Outcome {
        let query = match self.begin(message) {
            Ok(query) => query,
            Err(err) => {
                debug!("ignoring empty chat message");
                return Outcome::rejected(Mode::Chat, err);
            }
        };
        let result = drive(orchestrator, &query, Mode::Chat, cancel, |event| {
            self.apply(event);
            observer(event);
        })
        .await;
        self.finish(result)
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}
