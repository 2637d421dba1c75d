//! Photo analysis screen state

use super::{drive, Notice, Outcome};
use crate::modes::Mode;
use crate::orchestrator::{
    research_block, OrchestrationError, OrchestrationEvent, OrchestrationResult, Orchestrator,
};
use crate::query::{ImageAttachment, Query, QueryError};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default)]
pub struct PhotoAnalysis {
    image: Option<ImageAttachment>,
    analysis: Option<String>,
    loading: bool,
}

impl PhotoAnalysis {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick a new photo. Clears any previous analysis.
    pub fn select_image(&mut self, data_uri: &str) -> Result<(), Notice> {
        let image = ImageAttachment::from_data_uri(data_uri)
            .map_err(|_| Notice::error("Invalid file type", "Please upload an image file"))?;
        self.image = Some(image);
        self.analysis = None;
        Ok(())
    }

    pub fn reset(&mut self) {
        self.image = None;
        self.analysis = None;
        self.loading = false;
    }

    pub fn image(&self) -> Option<&ImageAttachment> {
        self.image.as_ref()
    }

    pub fn analysis(&self) -> Option<&str> {
        self.analysis.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Build the query for the selected photo. A blank prompt uses the default.
    pub fn begin(&mut self, prompt: Option<&str>) -> Result<Query, OrchestrationError> {
        let image = self.image.clone().ok_or(QueryError::MissingImage)?;
        let query = match prompt.map(str::trim).filter(|p| !p.is_empty()) {
            Some(prompt) => Query::new(prompt).with_attachment(image),
            None => Query::image(image),
        };
        self.loading = true;
        Ok(query)
    }

    /// Show the analysis as soon as the primary reply arrives
    pub fn apply(&mut self, event: &OrchestrationEvent) {
        match event {
            OrchestrationEvent::PrimaryReady(text) => self.analysis = Some(text.clone()),
            OrchestrationEvent::SecondaryReady(research) => {
                if let Some(analysis) = self.analysis.as_mut() {
                    analysis.push_str("\n\n");
                    analysis.push_str(&research_block(research));
                }
            }
            _ => {}
        }
    }

    pub fn finish(&mut self, result: Result<OrchestrationResult, OrchestrationError>) -> Outcome {
        self.loading = false;
        let outcome = Outcome::completed(
            Mode::ImageAnalysis,
            result,
            Some(Notice::info("Analysis complete", "Review the details below")),
            Notice::error("Analysis failed", "Unable to analyze the image. Please try again."),
        );
        self.analysis = Some(outcome.text.clone());
        outcome
    }

    /// Analyze the selected photo
    pub async fn analyze(&mut self, orchestrator: &Orchestrator, prompt: Option<&str>) -> Outcome {
        self.analyze_observed(orchestrator, prompt, &CancellationToken::new(), |_| {})
            .await
    }

    /// Analyze the selected photo, updating the analysis as each reply
    /// arrives and passing every progress event on to `observer`
    pub async fn analyze_observed(
        &mut self,
        orchestrator: &Orchestrator,
        prompt: Option<&str>,
        cancel: &CancellationToken,
        mut observer: impl FnMut(&OrchestrationEvent),
    ) -> Outcome {
        let query = match self.begin(prompt) {
            Ok(query) => query,
            Err(err) => return Outcome::rejected(Mode::ImageAnalysis, err),
        };
        self.analysis = None;
        let result = drive(orchestrator, &query, Mode::ImageAnalysis, cancel, |event| {
            self.apply(event);
            observer(event);
        })
        .await;
        self.finish(result)
    }
}
