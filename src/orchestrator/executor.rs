//! Sequential primary-then-research execution

use super::error::OrchestrationError;
use super::models::{OrchestrationEvent, OrchestrationResult};
use crate::config::{PrimaryModelSettings, SecondaryModelSettings, Settings};
use crate::modes::Mode;
use crate::network::HttpClient;
use crate::proxy::{ProxyError, ProxyRequest, ProxyResponse, ProxyTransport};
use crate::query::Query;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Runs the two-call flow for any [`Mode`].
///
/// The primary call must succeed for the invocation to succeed. The research
/// call starts only after the primary reply is in hand, and its failure only
/// drops the research text.
#[derive(Clone)]
pub struct Orchestrator {
    transport: Arc<dyn ProxyTransport>,
    primary: PrimaryModelSettings,
    secondary: SecondaryModelSettings,
}

impl Orchestrator {
    /// Create an orchestrator over any transport
    pub fn new(transport: Arc<dyn ProxyTransport>, settings: &Settings) -> Self {
        Self {
            transport,
            primary: settings.primary.clone(),
            secondary: settings.secondary.clone(),
        }
    }

    /// Create an orchestrator talking HTTP to the configured proxy
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let client = HttpClient::with_settings(&settings.outgoing)?;
        Ok(Self::new(Arc::new(client), settings))
    }

    /// Run a query to completion
    pub async fn run(
        &self,
        query: &Query,
        mode: Mode,
    ) -> Result<OrchestrationResult, OrchestrationError> {
        self.execute(query, mode, None, None).await
    }

    /// Run a query, reporting progress on `events`
    pub async fn run_with_events(
        &self,
        query: &Query,
        mode: Mode,
        events: &UnboundedSender<OrchestrationEvent>,
    ) -> Result<OrchestrationResult, OrchestrationError> {
        self.execute(query, mode, Some(events), None).await
    }

    /// Run a query that the caller may abandon.
    ///
    /// Cancelling before the primary reply fails the invocation and the
    /// research call is never started. Cancelling during the research call
    /// keeps the primary reply and drops the research.
    pub async fn run_cancellable(
        &self,
        query: &Query,
        mode: Mode,
        cancel: &CancellationToken,
        events: Option<&UnboundedSender<OrchestrationEvent>>,
    ) -> Result<OrchestrationResult, OrchestrationError> {
        self.execute(query, mode, events, Some(cancel)).await
    }

    async fn execute(
        &self,
        query: &Query,
        mode: Mode,
        events: Option<&UnboundedSender<OrchestrationEvent>>,
        cancel: Option<&CancellationToken>,
    ) -> Result<OrchestrationResult, OrchestrationError> {
        let span = info_span!("orchestrate", %mode, id = %Uuid::new_v4());

        async move {
            let profile = mode.profile();

            if let Err(err) = profile.validate(query) {
                debug!(error = %err, "rejected input");
                return Err(OrchestrationError::InvalidInput(err));
            }

            let start = Instant::now();

            emit(events, OrchestrationEvent::PrimaryStarted);
            let request = profile.primary_request(query, &self.primary);
            let primary_text = match self.call(request, cancel).await {
                Some(Ok(response)) => response.content,
                Some(Err(source)) => {
                    let err = OrchestrationError::PrimaryQueryFailed { mode, source };
                    error!(error = %err, elapsed = ?start.elapsed(), "primary query failed");
                    emit(events, OrchestrationEvent::PrimaryFailed);
                    return Err(err);
                }
                None => {
                    info!("cancelled before primary reply");
                    emit(events, OrchestrationEvent::PrimaryFailed);
                    return Err(OrchestrationError::Cancelled { mode });
                }
            };
            debug!(elapsed = ?start.elapsed(), chars = primary_text.len(), "primary reply received");
            emit(events, OrchestrationEvent::PrimaryReady(primary_text.clone()));

            emit(events, OrchestrationEvent::SecondaryStarted);
            let request = profile.research_request(query, &self.secondary);
            let secondary_text = match self.call(request, cancel).await {
                Some(Ok(response)) => {
                    emit(events, OrchestrationEvent::SecondaryReady(response.content.clone()));
                    Some(response.content)
                }
                Some(Err(source)) => {
                    let err = OrchestrationError::SecondaryQueryFailed { mode, source };
                    warn!(error = %err, "research unavailable, showing primary reply only");
                    emit(events, OrchestrationEvent::SecondaryFailed);
                    None
                }
                None => {
                    info!("cancelled during research call");
                    emit(events, OrchestrationEvent::SecondaryFailed);
                    None
                }
            };

            emit(events, OrchestrationEvent::Done);
            info!(
                elapsed = ?start.elapsed(),
                research = secondary_text.is_some(),
                "orchestration finished"
            );

            Ok(OrchestrationResult::new(primary_text, secondary_text))
        }
        .instrument(span)
        .await
    }

    /// One attempt at a proxy call. `None` means the caller cancelled.
    async fn call(
        &self,
        request: ProxyRequest,
        cancel: Option<&CancellationToken>,
    ) -> Option<Result<ProxyResponse, ProxyError>> {
        match cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => None,
                result = self.transport.send(&request) => Some(result),
            },
            None => Some(self.transport.send(&request).await),
        }
    }
}

fn emit(events: Option<&UnboundedSender<OrchestrationEvent>>, event: OrchestrationEvent) {
    if let Some(tx) = events {
        // A dropped receiver only means nobody is watching
        let _ = tx.send(event);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::modes::{TipCategory, CHAT_FALLBACK, IMAGE_FALLBACK};
    use crate::proxy::{ContentPart, Endpoint, MessageContent};
    use crate::query::{ImageAttachment, QueryError, Turn};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Transport replaying scripted replies and recording every request
    #[derive(Default)]
    pub(crate) struct ScriptedTransport {
        replies: Mutex<VecDeque<Result<String, ProxyError>>>,
        pub(crate) requests: Mutex<Vec<ProxyRequest>>,
        hang_on: Option<Endpoint>,
    }

    impl ScriptedTransport {
        pub(crate) fn new(replies: Vec<Result<&str, ProxyError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(
                    replies
                        .into_iter()
                        .map(|r| r.map(str::to_string))
                        .collect(),
                ),
                ..Default::default()
            })
        }

        pub(crate) fn hanging_on(endpoint: Endpoint, replies: Vec<Result<&str, ProxyError>>) -> Arc<Self> {
            let mut transport = Self::new(replies);
            if let Some(inner) = Arc::get_mut(&mut transport) {
                inner.hang_on = Some(endpoint);
            }
            transport
        }

        pub(crate) fn endpoints(&self) -> Vec<Endpoint> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .map(|r| r.endpoint)
                .collect()
        }
    }

    #[async_trait]
    impl ProxyTransport for ScriptedTransport {
        async fn send(&self, request: &ProxyRequest) -> Result<ProxyResponse, ProxyError> {
            self.requests.lock().unwrap().push(request.clone());
            if self.hang_on == Some(request.endpoint) {
                std::future::pending::<()>().await;
            }
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(ProxyError::Transport("no scripted reply".to_string())));
            reply.map(|content| ProxyResponse { content })
        }
    }

    fn orchestrator(transport: Arc<ScriptedTransport>) -> Orchestrator {
        Orchestrator::new(transport, &Settings::default())
    }

    const PIXEL: &str = "data:image/png;base64,iVBORw0KGgo=";

    #[tokio::test]
    async fn test_chocolate_scenario() {
        let transport = ScriptedTransport::new(vec![
            Ok("Yes, chocolate contains theobromine..."),
            Ok("Recent AVMA guidance confirms..."),
        ]);
        let orchestrator = orchestrator(transport.clone());

        let result = orchestrator
            .run(&Query::new("Is chocolate toxic to dogs?"), Mode::Chat)
            .await
            .unwrap();

        assert_eq!(result.primary_text, "Yes, chocolate contains theobromine...");
        assert_eq!(
            result.secondary_text.as_deref(),
            Some("Recent AVMA guidance confirms...")
        );
        assert_eq!(
            result.combined_text,
            "Yes, chocolate contains theobromine...\n\nAdditional Research:\nRecent AVMA guidance confirms...\n\nRemember: This information is from internet sources and should not replace professional veterinary advice."
        );
        assert_eq!(
            transport.endpoints(),
            vec![Endpoint::Primary, Endpoint::Secondary]
        );
    }

    #[tokio::test]
    async fn test_primary_failure_skips_research() {
        let transport = ScriptedTransport::new(vec![
            Err(ProxyError::Timeout),
            Ok("should never be requested"),
        ]);
        let orchestrator = orchestrator(transport.clone());

        let err = orchestrator
            .run(&Query::new("Is chocolate toxic to dogs?"), Mode::Chat)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            OrchestrationError::PrimaryQueryFailed {
                mode: Mode::Chat,
                source: ProxyError::Timeout
            }
        ));
        assert_eq!(err.user_message(), CHAT_FALLBACK);
        assert!(err.user_message().starts_with("Sorry, I encountered an issue"));
        assert!(err.user_message().ends_with("🐾"));
        assert_eq!(transport.endpoints(), vec![Endpoint::Primary]);
    }

    #[tokio::test]
    async fn test_primary_malformed_is_fatal() {
        for failure in [
            ProxyError::Status {
                status: 503,
                body: String::new(),
            },
            ProxyError::Malformed("expected value".to_string()),
            ProxyError::MissingContent,
        ] {
            let transport = ScriptedTransport::new(vec![Err(failure.clone()), Ok("unused")]);
            let err = orchestrator(transport.clone())
                .run(&Query::new("Beagle"), Mode::Tip(TipCategory::Exercise))
                .await
                .unwrap_err();
            assert_eq!(
                err,
                OrchestrationError::PrimaryQueryFailed {
                    mode: Mode::Tip(TipCategory::Exercise),
                    source: failure
                }
            );
            assert_eq!(transport.endpoints(), vec![Endpoint::Primary]);
        }
    }

    #[tokio::test]
    async fn test_image_mode_without_attachment_sends_nothing() {
        let transport = ScriptedTransport::new(vec![Ok("unused")]);
        let err = orchestrator(transport.clone())
            .run(&Query::new("check this rash"), Mode::ImageAnalysis)
            .await
            .unwrap_err();
        assert_eq!(err, OrchestrationError::InvalidInput(QueryError::MissingImage));
        assert!(transport.endpoints().is_empty());
    }

    #[tokio::test]
    async fn test_secondary_failure_is_absorbed() {
        for failure in [
            ProxyError::Status {
                status: 500,
                body: "boom".to_string(),
            },
            ProxyError::MissingContent,
            ProxyError::Transport("connection reset".to_string()),
        ] {
            let transport = ScriptedTransport::new(vec![Ok("Primary answer"), Err(failure)]);
            let result = tokio_test::assert_ok!(
                orchestrator(transport.clone())
                    .run(&Query::new("Is chocolate toxic to dogs?"), Mode::Chat)
                    .await
            );

            assert_eq!(result.combined_text, "Primary answer");
            assert_eq!(result.combined_text, result.primary_text);
            assert_eq!(result.secondary_text, None);
            assert_eq!(
                transport.endpoints(),
                vec![Endpoint::Primary, Endpoint::Secondary]
            );
        }
    }

    #[tokio::test]
    async fn test_blank_input_sends_nothing() {
        for text in ["", "   ", "\n\t"] {
            let transport = ScriptedTransport::new(vec![Ok("unused")]);
            let err = tokio_test::assert_err!(
                orchestrator(transport.clone())
                    .run(&Query::new(text), Mode::Chat)
                    .await
            );
            assert_eq!(err, OrchestrationError::InvalidInput(QueryError::EmptyText));
            assert!(transport.endpoints().is_empty());
        }
    }

    #[tokio::test]
    async fn test_image_mode_shapes_primary_request() {
        let transport = ScriptedTransport::new(vec![Ok("Looks like mild dermatitis"), Ok("Study X")]);
        let image = ImageAttachment::from_data_uri(PIXEL).unwrap();
        let query = Query::new("check this rash").with_attachment(image);

        let result = orchestrator(transport.clone())
            .run(&query, Mode::ImageAnalysis)
            .await
            .unwrap();
        assert!(result.combined_text.starts_with("Looks like mild dermatitis\n\nAdditional Research:\nStudy X"));

        let requests = transport.requests.lock().unwrap();
        let MessageContent::Parts(parts) = &requests[0].messages[0].content else {
            panic!("expected multimodal content");
        };
        assert!(matches!(&parts[0], ContentPart::Text { text } if text == "check this rash"));
        assert!(matches!(&parts[1], ContentPart::ImageUrl { image_url } if image_url.url == PIXEL));
        assert_eq!(parts.len(), 2);

        // research prompt never carries the image
        assert!(!serde_json::to_string(&requests[1].wire()).unwrap().contains("base64"));
    }

    #[tokio::test]
    async fn test_chat_context_is_forwarded() {
        let transport = ScriptedTransport::new(vec![Ok("a"), Ok("b")]);
        let query = Query::new("And grapes?")
            .with_context(vec![Turn::user("Chocolate?"), Turn::assistant("Toxic.")]);

        orchestrator(transport.clone())
            .run(&query, Mode::Chat)
            .await
            .unwrap();

        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests[0].messages.len(), 3);
        // research only sees the new question
        assert_eq!(requests[1].messages.len(), 1);
    }

    #[tokio::test]
    async fn test_events_follow_state_order() {
        let transport = ScriptedTransport::new(vec![Ok("first"), Ok("second")]);
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        orchestrator(transport)
            .run_with_events(&Query::new("hi"), Mode::Chat, &tx)
            .await
            .unwrap();
        drop(tx);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert_eq!(
            events,
            vec![
                OrchestrationEvent::PrimaryStarted,
                OrchestrationEvent::PrimaryReady("first".to_string()),
                OrchestrationEvent::SecondaryStarted,
                OrchestrationEvent::SecondaryReady("second".to_string()),
                OrchestrationEvent::Done,
            ]
        );
        assert!(events.last().unwrap().phase().is_terminal());
    }

    #[tokio::test]
    async fn test_events_on_primary_failure() {
        let transport = ScriptedTransport::new(vec![Err(ProxyError::Timeout)]);
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        let _ = orchestrator(transport)
            .run_with_events(&Query::new("hi"), Mode::Chat, &tx)
            .await;
        drop(tx);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert_eq!(
            events,
            vec![OrchestrationEvent::PrimaryStarted, OrchestrationEvent::PrimaryFailed]
        );
    }

    #[tokio::test]
    async fn test_cancel_before_primary() {
        let transport = ScriptedTransport::new(vec![Ok("unused"), Ok("unused")]);
        let token = CancellationToken::new();
        token.cancel();

        let err = orchestrator(transport.clone())
            .run_cancellable(&Query::new("hi"), Mode::Chat, &token, None)
            .await
            .unwrap_err();

        assert_eq!(err, OrchestrationError::Cancelled { mode: Mode::Chat });
        assert!(transport.endpoints().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_during_research_keeps_primary() {
        let transport = ScriptedTransport::hanging_on(Endpoint::Secondary, vec![Ok("primary")]);
        let token = CancellationToken::new();

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });

        let result = orchestrator(transport.clone())
            .run_cancellable(&Query::new("hi"), Mode::Chat, &token, None)
            .await
            .unwrap();

        assert_eq!(result.combined_text, "primary");
        assert_eq!(
            transport.endpoints(),
            vec![Endpoint::Primary, Endpoint::Secondary]
        );
    }

    #[tokio::test]
    async fn test_over_http_proxy() {
        use serde_json::json;
        use wiremock::matchers::{body_partial_json, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/openai"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "Yes, chocolate contains theobromine..."}}]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/perplexity"))
            .and(body_partial_json(json!({
                "model": "llama-3.1-sonar-small-128k-online",
                "temperature": 0.2,
                "max_tokens": 300
            })))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let mut settings = Settings::default();
        settings.outgoing.primary_url = format!("{}/api/openai", server.uri());
        settings.outgoing.secondary_url = format!("{}/api/perplexity", server.uri());

        let result = Orchestrator::from_settings(&settings)
            .unwrap()
            .run(&Query::new("Is chocolate toxic to dogs?"), Mode::Chat)
            .await
            .unwrap();

        assert_eq!(result.combined_text, "Yes, chocolate contains theobromine...");
    }

    #[tokio::test]
    async fn test_image_fallback_message() {
        let transport = ScriptedTransport::new(vec![Err(ProxyError::Timeout)]);
        let query = Query::image(ImageAttachment::from_data_uri(PIXEL).unwrap());
        let err = orchestrator(transport)
            .run(&query, Mode::ImageAnalysis)
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), IMAGE_FALLBACK);
    }
}
