//! HTTP request handlers

use super::sse::sse_stream;
use super::types::{
    CancelResponse, ChatRequest, ChatResponse, ConversationResponse, ErrorResponse, MessageView,
    VersionResponse,
};
use super::AppState;
use crate::pipeline::{RejectReason, SubmitOutcome, ToggleUpdate, Toggles};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Conversation snapshot
        .route("/api/conversation", get(get_conversation))
        // Live updates
        .route("/api/stream", get(stream_conversation))
        // User actions
        .route("/api/chat", post(send_chat))
        .route("/api/cancel", post(cancel_turn))
        // Switches
        .route("/api/toggles", get(get_toggles).put(update_toggles))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

fn snapshot(state: &AppState) -> ConversationResponse {
    ConversationResponse {
        messages: state
            .pipeline
            .messages()
            .iter()
            .map(MessageView::from)
            .collect(),
        status: state.pipeline.status(),
        toggles: state.pipeline.toggles(),
    }
}

// ============================================================
// Conversation
// ============================================================

async fn get_conversation(State(state): State<AppState>) -> Json<ConversationResponse> {
    Json(snapshot(&state))
}

async fn stream_conversation(State(state): State<AppState>) -> impl IntoResponse {
    // Subscribe before the snapshot so no event falls between the two
    let broadcast_rx = state.pipeline.subscribe();
    sse_stream(snapshot(&state), broadcast_rx)
}

// ============================================================
// User actions
// ============================================================

async fn send_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    // Run the turn on its own task so a dropped connection does not
    // abandon it halfway
    let pipeline = state.pipeline.clone();
    let outcome = tokio::spawn(async move { pipeline.submit(&req.text).await })
        .await
        .map_err(|e| AppError::Internal(format!("Turn aborted: {e}")))?;

    match outcome {
        SubmitOutcome::Replied(message) | SubmitOutcome::Failed(message) => {
            Ok(Json(ChatResponse {
                message: Some(MessageView::from(&message)),
                cancelled: false,
            }))
        }
        SubmitOutcome::Cancelled => Ok(Json(ChatResponse {
            message: None,
            cancelled: true,
        })),
        SubmitOutcome::Rejected(reason @ RejectReason::EmptyInput) => {
            Err(AppError::BadRequest(reason.to_string()))
        }
        SubmitOutcome::Rejected(reason @ RejectReason::Busy) => {
            Err(AppError::Conflict(reason.to_string()))
        }
    }
}

async fn cancel_turn(State(state): State<AppState>) -> Json<CancelResponse> {
    Json(CancelResponse {
        cancelled: state.pipeline.cancel(),
    })
}

// ============================================================
// Toggles
// ============================================================

async fn get_toggles(State(state): State<AppState>) -> Json<Toggles> {
    Json(state.pipeline.toggles())
}

async fn update_toggles(
    State(state): State<AppState>,
    Json(update): Json<ToggleUpdate>,
) -> Json<Toggles> {
    Json(state.pipeline.update_toggles(update))
}

// ============================================================
// Version
// ============================================================

async fn get_version() -> Json<VersionResponse> {
    Json(VersionResponse {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    Conflict(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
