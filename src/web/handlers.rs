//! HTTP request handlers

use super::state::AppState;
use crate::modes::TipCategory;
use crate::orchestrator::{OrchestrationError, OrchestrationEvent};
use crate::query::Turn;
use crate::session::{ChatSession, Notice, Outcome, PhotoAnalysis, TipScreen};
use axum::{
    extract::State,
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_stream::{wrappers::UnboundedReceiverStream, Stream, StreamExt};
use tokio_util::sync::DropGuard;
use tracing::warn;

/// Body for `POST /api/chat`
#[derive(Debug, Deserialize)]
pub struct ChatParams {
    pub message: String,
    /// Conversation so far, as returned by the previous call
    #[serde(default)]
    pub history: Vec<Turn>,
}

/// Body for `POST /api/analyze`
#[derive(Debug, Deserialize)]
pub struct AnalyzeParams {
    /// `data:image/...;base64,...` URI
    pub image: String,
    pub prompt: Option<String>,
}

/// Body for `POST /api/tips`
#[derive(Debug, Deserialize)]
pub struct TipParams {
    pub breed: String,
    #[serde(default)]
    pub category: TipCategory,
}

/// Response shared by all feature routes
#[derive(Debug, Serialize)]
pub struct FeatureResponse {
    /// Text to display
    pub text: String,
    /// Reply of the chat/vision model
    pub primary: Option<String>,
    /// Reply of the research model
    pub research: Option<String>,
    pub notice: Option<Notice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<Turn>>,
}

/// Last frame of a stream: the response the plain route would have sent
#[derive(Debug, Serialize)]
struct StreamOutcome {
    status: u16,
    #[serde(flatten)]
    response: FeatureResponse,
}

impl FeatureResponse {
    fn from_outcome(outcome: &Outcome) -> Self {
        Self {
            text: outcome.text.clone(),
            primary: outcome.result.as_ref().map(|r| r.primary_text.clone()),
            research: outcome
                .result
                .as_ref()
                .and_then(|r| r.secondary_text.clone()),
            notice: outcome.notice.clone(),
            history: None,
        }
    }

    fn from_notice(notice: Notice) -> Self {
        Self {
            text: notice.description.clone(),
            primary: None,
            research: None,
            notice: Some(notice),
            history: None,
        }
    }

    fn with_history(mut self, history: &[Turn]) -> Self {
        self.history = Some(history.to_vec());
        self
    }
}

fn status_for(outcome: &Outcome) -> StatusCode {
    match &outcome.error {
        None => StatusCode::OK,
        Some(OrchestrationError::InvalidInput(_)) => StatusCode::BAD_REQUEST,
        Some(OrchestrationError::Cancelled { .. }) => StatusCode::SERVICE_UNAVAILABLE,
        Some(_) => StatusCode::BAD_GATEWAY,
    }
}

/// Frame named after the phase the event enters, carrying any reply text
fn progress_frame(event: &OrchestrationEvent) -> Event {
    let data = match event {
        OrchestrationEvent::PrimaryReady(text) | OrchestrationEvent::SecondaryReady(text) => {
            text.as_str()
        }
        _ => "",
    };
    Event::default().event(event.phase().as_str()).data(data)
}

fn send_outcome(tx: &UnboundedSender<Event>, status: StatusCode, response: FeatureResponse) {
    let frame = StreamOutcome {
        status: status.as_u16(),
        response,
    };
    match Event::default().event("outcome").json_data(&frame) {
        Ok(event) => {
            let _ = tx.send(event);
        }
        Err(err) => warn!(error = %err, "failed to encode outcome frame"),
    }
}

/// SSE response over `rx`. Dropping the response (client gone) drops `guard`,
/// which cancels the orchestration feeding it.
fn event_stream(
    rx: UnboundedReceiver<Event>,
    guard: DropGuard,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = UnboundedReceiverStream::new(rx).map(move |event| {
        let _ = &guard;
        Ok::<_, Infallible>(event)
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Chat handler
pub async fn chat(State(state): State<AppState>, Json(params): Json<ChatParams>) -> Response {
    let mut session = ChatSession::from_history(params.history);
    let outcome = session
        .send_observed(&state.orchestrator, &params.message, &state.request_token(), |_| {})
        .await;

    let body = FeatureResponse::from_outcome(&outcome).with_history(session.history());
    (status_for(&outcome), Json(body)).into_response()
}

/// Chat handler streaming progress as server-sent events
pub async fn chat_stream(
    State(state): State<AppState>,
    Json(params): Json<ChatParams>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::unbounded_channel();
    let cancel = state.request_token();
    let guard = cancel.clone().drop_guard();

    tokio::spawn(async move {
        let mut session = ChatSession::from_history(params.history);
        let outcome = session
            .send_observed(&state.orchestrator, &params.message, &cancel, |event| {
                let _ = tx.send(progress_frame(event));
            })
            .await;

        let body = FeatureResponse::from_outcome(&outcome).with_history(session.history());
        send_outcome(&tx, status_for(&outcome), body);
    });

    event_stream(rx, guard)
}

/// Photo analysis handler
pub async fn analyze(State(state): State<AppState>, Json(params): Json<AnalyzeParams>) -> Response {
    let mut screen = PhotoAnalysis::new();
    if let Err(notice) = screen.select_image(&params.image) {
        let body = FeatureResponse::from_notice(notice);
        return (StatusCode::BAD_REQUEST, Json(body)).into_response();
    }

    let outcome = screen
        .analyze_observed(
            &state.orchestrator,
            params.prompt.as_deref(),
            &state.request_token(),
            |_| {},
        )
        .await;
    (status_for(&outcome), Json(FeatureResponse::from_outcome(&outcome))).into_response()
}

/// Photo analysis handler streaming progress as server-sent events
pub async fn analyze_stream(
    State(state): State<AppState>,
    Json(params): Json<AnalyzeParams>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::unbounded_channel();
    let cancel = state.request_token();
    let guard = cancel.clone().drop_guard();

    tokio::spawn(async move {
        let mut screen = PhotoAnalysis::new();
        if let Err(notice) = screen.select_image(&params.image) {
            send_outcome(&tx, StatusCode::BAD_REQUEST, FeatureResponse::from_notice(notice));
            return;
        }

        let outcome = screen
            .analyze_observed(
                &state.orchestrator,
                params.prompt.as_deref(),
                &cancel,
                |event| {
                    let _ = tx.send(progress_frame(event));
                },
            )
            .await;
        send_outcome(&tx, status_for(&outcome), FeatureResponse::from_outcome(&outcome));
    });

    event_stream(rx, guard)
}

/// Tip handler
pub async fn tips(State(state): State<AppState>, Json(params): Json<TipParams>) -> Response {
    let mut screen = TipScreen::new(params.breed, params.category);
    let outcome = screen
        .request_observed(&state.orchestrator, &state.request_token(), |_| {})
        .await;
    (status_for(&outcome), Json(FeatureResponse::from_outcome(&outcome))).into_response()
}

/// Available tip categories
pub async fn tip_categories() -> impl IntoResponse {
    Json(TipCategory::all())
}

/// Health check handler
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "instance": state.instance_name(),
        "version": crate::VERSION
    }))
}
