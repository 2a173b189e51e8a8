//! HTTP API v1 — the engine's REST surface.
//!
//! Endpoints:
//!
//! - `POST   /v1/chat`                 — Run a turn, stream the reply as SSE
//! - `GET    /v1/state/{session_id}`   — Inspect a session's committed state
//! - `DELETE /v1/sessions/{session_id}`— Evict a session

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event as SseEvent, Sse},
    response::Json,
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::info;

use engram_core::error::EngineError;
use engram_core::session::{SessionId, TurnPhase};
use engram_core::state::CognitiveState;

use crate::SharedState;

/// Build the v1 API router. Nest this under "/v1" in the main router.
pub fn v1_router(state: SharedState) -> Router {
    Router::new()
        .route("/chat", post(chat_handler))
        .route("/state/{session_id}", get(state_handler))
        .route("/sessions/{session_id}", delete(evict_handler))
        .with_state(state)
}

// ── Requests / responses ──────────────────────────────────────────────────

#[derive(Deserialize)]
struct ChatRequest {
    message: String,

    #[serde(default = "default_session")]
    session_id: String,
}

fn default_session() -> String {
    "default".into()
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Serialize)]
struct SessionView {
    session_id: String,
    turn: u64,
    phase: TurnPhase,
    state: CognitiveState,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn error_body(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(ErrorBody { error: message.into() }))
}

// ── Handlers ──────────────────────────────────────────────────────────────

/// `POST /v1/chat` — run one turn and stream the reply.
///
/// The response is SSE: `chunk` events with content deltas, then exactly
/// one `done` or `error`. A turn already in progress for the session maps
/// to 409; the caller retries, nothing is queued.
async fn chat_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Sse<impl futures::Stream<Item = Result<SseEvent, Infallible>>>, ApiError> {
    if payload.message.trim().is_empty() {
        return Err(error_body(StatusCode::BAD_REQUEST, "message must not be empty"));
    }

    let session_id = SessionId::new(payload.session_id);
    info!(session = %session_id, "v1/chat request");

    let handle = state
        .controller
        .submit(session_id, payload.message)
        .await
        .map_err(|err| match err {
            EngineError::TurnInProgress(_) => {
                error_body(StatusCode::CONFLICT, err.to_string())
            }
        })?;

    let stream = ReceiverStream::new(handle.events).map(|event| {
        let data = serde_json::to_string(&event).unwrap_or_default();
        Ok(SseEvent::default().event(event.event_type()).data(data))
    });
    Ok(Sse::new(stream))
}

/// `GET /v1/state/{session_id}` — the committed state, or 404.
async fn state_handler(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionView>, ApiError> {
    let id = SessionId::new(session_id);
    let session = state
        .controller
        .read_session(&id)
        .await
        .ok_or_else(|| error_body(StatusCode::NOT_FOUND, format!("unknown session {id}")))?;

    Ok(Json(SessionView {
        session_id: session.id.to_string(),
        turn: session.turn,
        phase: session.phase,
        state: session.state,
        created_at: session.created_at,
        updated_at: session.updated_at,
    }))
}

/// `DELETE /v1/sessions/{session_id}` — evict. 404 for an unknown id,
/// 409 while the session is mid-turn.
async fn evict_handler(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = SessionId::new(session_id);
    match state.controller.evict_session(&id).await {
        Ok(true) => {
            info!(session = %id, "Session evicted");
            Ok(StatusCode::NO_CONTENT)
        }
        Ok(false) => Err(error_body(StatusCode::NOT_FOUND, format!("unknown session {id}"))),
        Err(err @ EngineError::TurnInProgress(_)) => {
            Err(error_body(StatusCode::CONFLICT, err.to_string()))
        }
    }
}
