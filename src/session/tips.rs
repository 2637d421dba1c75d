//! Tip screen state

use super::{drive, Notice, Outcome};
use crate::modes::{Mode, TipCategory};
use crate::orchestrator::{research_block, OrchestrationEvent, Orchestrator};
use crate::query::Query;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default)]
pub struct TipScreen {
    breed: String,
    category: TipCategory,
    tip: Option<String>,
    loading: bool,
}

impl TipScreen {
    pub fn new(breed: impl Into<String>, category: TipCategory) -> Self {
        Self {
            breed: breed.into(),
            category,
            ..Default::default()
        }
    }

    pub fn set_breed(&mut self, breed: impl Into<String>) {
        self.breed = breed.into();
    }

    pub fn set_category(&mut self, category: TipCategory) {
        self.category = category;
    }

    pub fn tip(&self) -> Option<&str> {
        self.tip.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Show the tip as soon as the primary reply arrives
    pub fn apply(&mut self, event: &OrchestrationEvent) {
        match event {
            OrchestrationEvent::PrimaryReady(text) => self.tip = Some(text.clone()),
            OrchestrationEvent::SecondaryReady(research) => {
                if let Some(tip) = self.tip.as_mut() {
                    tip.push_str("\n\n");
                    tip.push_str(&research_block(research));
                }
            }
            _ => {}
        }
    }

    /// Ask for a tip for the current breed and category
    pub async fn request(&mut self, orchestrator: &Orchestrator) -> Outcome {
        self.request_observed(orchestrator, &CancellationToken::new(), |_| {})
            .await
    }

    /// Ask for a tip, updating it as each reply arrives and passing every
    /// progress event on to `observer`
    pub async fn request_observed(
        &mut self,
        orchestrator: &Orchestrator,
        cancel: &CancellationToken,
        mut observer: impl FnMut(&OrchestrationEvent),
    ) -> Outcome {
        let mode = Mode::Tip(self.category);
        let query = Query::new(self.breed.as_str());

        self.tip = None;
        self.loading = true;
        let result = drive(orchestrator, &query, mode, cancel, |event| {
            self.apply(event);
            observer(event);
        })
        .await;
        self.loading = false;

        let outcome = Outcome::completed(
            mode,
            result,
            None,
            Notice::error("Error", "Failed to get a tip. Please try again later."),
        );
        self.tip = match &outcome.error {
            Some(err) if err.is_invalid_input() => None,
            _ => Some(outcome.text.clone()),
        };
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::modes::TIP_FALLBACK;
    use crate::orchestrator::ScriptedTransport;
    use crate::proxy::ProxyError;

    #[tokio::test]
    async fn test_tip_with_research() {
        let transport = ScriptedTransport::new(vec![Ok("Feed twice daily 🦴"), Ok("WSAVA 2023")]);
        let orchestrator = Orchestrator::new(transport, &Settings::default());
        let mut screen = TipScreen::new("Labrador", TipCategory::Nutrition);

        let outcome = screen.request(&orchestrator).await;

        assert!(outcome.is_success());
        assert_eq!(outcome.mode, Mode::Tip(TipCategory::Nutrition));
        assert!(screen
            .tip()
            .unwrap()
            .starts_with("Feed twice daily 🦴\n\nAdditional Research:\nWSAVA 2023"));
    }

    #[tokio::test]
    async fn test_short_breed_is_rejected() {
        let transport = ScriptedTransport::new(vec![]);
        let orchestrator = Orchestrator::new(transport.clone(), &Settings::default());
        let mut screen = TipScreen::default();
        screen.set_breed("x");

        let outcome = screen.request(&orchestrator).await;

        assert_eq!(outcome.text, "Please enter a dog breed");
        assert!(screen.tip().is_none());
        assert!(transport.endpoints().is_empty());
    }

    #[tokio::test]
    async fn test_failure_shows_fallback() {
        let transport = ScriptedTransport::new(vec![Err(ProxyError::Status {
            status: 500,
            body: String::new(),
        })]);
        let orchestrator = Orchestrator::new(transport, &Settings::default());
        let mut screen = TipScreen::new("Beagle", TipCategory::General);
        screen.set_category(TipCategory::Exercise);

        let outcome = screen.request(&orchestrator).await;

        assert_eq!(screen.tip(), Some(TIP_FALLBACK));
        assert_eq!(outcome.notice.unwrap().title, "Error");
        assert!(!screen.is_loading());
    }

    #[tokio::test]
    async fn test_cancelled_before_reply() {
        let transport = ScriptedTransport::new(vec![Ok("unused")]);
        let orchestrator = Orchestrator::new(transport.clone(), &Settings::default());
        let mut screen = TipScreen::new("Beagle", TipCategory::Health);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = screen.request_observed(&orchestrator, &cancel, |_| {}).await;

        assert!(matches!(
            outcome.error,
            Some(crate::orchestrator::OrchestrationError::Cancelled { .. })
        ));
        assert_eq!(screen.tip(), Some("Request cancelled."));
        assert!(transport.endpoints().is_empty());
    }
}
