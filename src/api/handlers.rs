//! HTTP request handlers

use super::sse::sse_stream;
use super::types::{
    CompleteQuizRequest, CreateSessionResponse, ErrorResponse, QueuedResponse,
    SelectTopicRequest, SessionResponse, SubmitAnswerRequest, SuccessResponse, TopicsResponse,
};
use super::AppState;
use crate::runtime::RuntimeError;
use crate::state_machine::Event;
use crate::tutor::{OptionLabel, GRAMMAR_TOPICS};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Welcome screen
        .route("/api/topics", get(list_topics))
        // Session lifecycle
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id", get(get_session))
        .route("/api/sessions/:id/end", post(end_session))
        // SSE streaming
        .route("/api/sessions/:id/stream", get(stream_session))
        // Learner intents
        .route("/api/sessions/:id/topic", post(select_topic))
        .route("/api/sessions/:id/quiz", post(complete_quiz))
        .route("/api/sessions/:id/answer", post(submit_answer))
        .route("/api/sessions/:id/retry", post(retry))
        .route("/api/sessions/:id/dismiss", post(dismiss_error))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Topics and sessions
// ============================================================

async fn list_topics() -> Json<TopicsResponse> {
    Json(TopicsResponse {
        topics: GRAMMAR_TOPICS.to_vec(),
    })
}

async fn create_session(State(state): State<AppState>) -> Json<CreateSessionResponse> {
    let (id, session) = state.runtime.create().await;
    Json(CreateSessionResponse { id, session })
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, AppError> {
    let session = state.runtime.snapshot(&id).await?;
    Ok(Json(SessionResponse { session }))
}

async fn end_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.runtime.end(&id).await?;
    Ok(Json(SuccessResponse { success: true }))
}

async fn stream_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let (session, broadcast_rx) = state.runtime.subscribe(&id).await?;
    Ok(sse_stream(session, broadcast_rx))
}

// ============================================================
// Learner intents
// ============================================================

async fn select_topic(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SelectTopicRequest>,
) -> Result<Json<QueuedResponse>, AppError> {
    queue(&state, &id, Event::SelectTopic { topic: req.topic }).await
}

async fn complete_quiz(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<CompleteQuizRequest>,
) -> Result<Json<QueuedResponse>, AppError> {
    let answers = req
        .answers
        .iter()
        .map(|raw| {
            OptionLabel::parse(raw)
                .ok_or_else(|| AppError::BadRequest(format!("Invalid quiz answer: {raw:?}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    queue(&state, &id, Event::CompleteQuiz { answers }).await
}

async fn submit_answer(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SubmitAnswerRequest>,
) -> Result<Json<QueuedResponse>, AppError> {
    let event = Event::SubmitAnswer {
        answer: req.answer,
        elapsed_secs: req.elapsed_secs,
    };
    queue(&state, &id, event).await
}

async fn retry(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<QueuedResponse>, AppError> {
    queue(&state, &id, Event::Retry).await
}

async fn dismiss_error(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<QueuedResponse>, AppError> {
    queue(&state, &id, Event::DismissError).await
}

/// Hand an intent to the session; its outcome arrives as a snapshot
async fn queue(state: &AppState, id: &str, event: Event) -> Result<Json<QueuedResponse>, AppError> {
    state.runtime.send_event(id, event).await?;
    Ok(Json(QueuedResponse { queued: true }))
}

async fn get_version() -> &'static str {
    concat!("lingo-tutor ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl From<RuntimeError> for AppError {
    fn from(e: RuntimeError) -> Self {
        match e {
            RuntimeError::NotFound(_) => AppError::NotFound(e.to_string()),
            RuntimeError::Closed(_) => AppError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
