//! HTTP request handlers

use super::sse::sse_stream;
use super::types::{
    CapabilityRequest, CapabilityResponse, ChatRequest, ChatResponse, ErrorResponse,
    LeadResponse, LeadsResponse, NewSessionResponse,
};
use super::AppState;
use crate::capabilities::CapabilityKind;
use crate::db::DbError;
use crate::stage_machine::ConversationState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::Engine as _;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/sessions/new", post(new_session))
        .route("/api/sessions/:id/chat", post(chat_turn))
        .route("/api/sessions/:id/capability", post(capability_demo))
        .route("/api/sessions/:id/stream", get(stream_session))
        .route("/api/leads", get(list_leads))
        .route("/api/leads/:id", get(get_lead))
        .route("/version", get(get_version))
        .with_state(state)
}

async fn new_session() -> Json<NewSessionResponse> {
    let session_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(session_id = %session_id, "session created");
    Json(NewSessionResponse {
        state: ConversationState::new(session_id),
    })
}

async fn chat_turn(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    check_session(&id, &req.state)?;

    let outcome = state.orchestrator.run_turn(&req.state, &req.message).await;

    let audio_b64 = outcome
        .audio
        .map(|bytes| base64::engine::general_purpose::STANDARD.encode(bytes));

    Ok(Json(ChatResponse {
        state: outcome.state,
        reply: outcome.reply,
        citations: outcome.citations,
        audio_b64,
    }))
}

async fn capability_demo(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<CapabilityRequest>,
) -> Result<Json<CapabilityResponse>, AppError> {
    check_session(&id, &req.state)?;

    if req.state.stage.is_terminal() {
        return Err(AppError::BadRequest(
            "session has ended, no more demos".to_string(),
        ));
    }

    let kind = req
        .capability
        .or_else(|| req.message.as_deref().and_then(CapabilityKind::detect))
        .ok_or_else(|| {
            AppError::BadRequest("no capability named or detected".to_string())
        })?;

    let (next, result) = state.orchestrator.run_capability(&req.state, kind).await;

    Ok(Json(CapabilityResponse {
        state: next,
        capability: result.capability,
        output: result.output,
    }))
}

async fn stream_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let rx = state.orchestrator.hub().subscribe(&id);
    sse_stream(id, rx)
}

async fn list_leads(State(state): State<AppState>) -> Result<Json<LeadsResponse>, AppError> {
    let leads = state
        .orchestrator
        .store()
        .list_lead_summaries()
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(LeadsResponse { leads }))
}

async fn get_lead(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<LeadResponse>, AppError> {
    let lead = state
        .orchestrator
        .store()
        .get_lead_summary(&id)
        .map_err(|e| match e {
            DbError::LeadNotFound(_) => AppError::NotFound(e.to_string()),
            other => AppError::Internal(other.to_string()),
        })?;

    Ok(Json(LeadResponse { lead }))
}

async fn get_version() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// The path id and the echoed state must agree; a mismatch means the client
/// mixed up its sessions.
fn check_session(path_id: &str, state: &ConversationState) -> Result<(), AppError> {
    if path_id != state.session_id {
        return Err(AppError::BadRequest(format!(
            "session id mismatch: path {path_id}, state {}",
            state.session_id
        )));
    }
    Ok(())
}

/// Application error type for handlers
#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_mismatch_is_rejected() {
        let state = ConversationState::new("s-1");
        assert!(check_session("s-1", &state).is_ok());
        assert!(check_session("s-2", &state).is_err());
    }
}
