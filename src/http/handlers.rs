use super::state::AppState;
use crate::error::SessionError;
use crate::session::{ChunkReceipt, SessionStats};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    response::{IntoResponse, Json, Response},
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    /// Optional session ID (if not provided, generate UUID)
    pub session_id: Option<String>,

    /// Sample rate of the incoming PCM stream (default from service config)
    pub sample_rate: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct StartSessionResponse {
    pub session_id: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct SubmitChunkResponse {
    pub session_id: String,
    #[serde(flatten)]
    pub receipt: ChunkReceipt,
}

#[derive(Debug, Serialize)]
pub struct StopSessionResponse {
    pub session_id: String,
    pub status: String,
    pub stats: SessionStats,
}

#[derive(Debug, Serialize)]
pub struct TranscriptResponse {
    pub session_id: String,
    pub transcript: String,
}

#[derive(Debug, Deserialize)]
pub struct ChunkQuery {
    /// Client-side sequence hint, for request-log correlation only; real
    /// unit sequence numbers are assigned by the assembler
    pub seq: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(err: SessionError) -> Response {
    let status = match &err {
        SessionError::DuplicateSession(_) => StatusCode::CONFLICT,
        SessionError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        SessionError::InvalidSessionState { .. } => StatusCode::CONFLICT,
        SessionError::MalformedChunk(_) => StatusCode::BAD_REQUEST,
        SessionError::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
    };

    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
        .into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /sessions/start
/// Create a new transcription session
pub async fn start_session(
    State(state): State<AppState>,
    Json(req): Json<StartSessionRequest>,
) -> Response {
    match state
        .manager
        .create_session(req.session_id, req.sample_rate)
        .await
    {
        Ok(session_id) => {
            info!("Session started: {}", session_id);
            (
                StatusCode::OK,
                Json(StartSessionResponse {
                    session_id,
                    status: "created".to_string(),
                }),
            )
                .into_response()
        }
        Err(err) => error_response(err),
    }
}

/// POST /sessions/:session_id/chunks
/// Submit one raw PCM chunk for the session
pub async fn submit_chunk(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(query): Query<ChunkQuery>,
    body: Bytes,
) -> Response {
    if let Some(seq) = query.seq {
        debug!(session_id = %session_id, client_seq = seq, bytes = body.len(), "chunk received");
    }

    match state.manager.submit_chunk(&session_id, &body).await {
        Ok(receipt) => (
            StatusCode::OK,
            Json(SubmitChunkResponse {
                session_id,
                receipt,
            }),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

/// GET /sessions/:session_id/events
/// Long-lived SSE stream of transcript updates for the session
pub async fn event_stream(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    let Some(session) = state.manager.session(&session_id).await else {
        return error_response(SessionError::SessionNotFound(session_id));
    };

    info!("Subscriber attached to session {}", session.id());

    let stream = session.event_stream().await.map(|event| {
        Event::default()
            .event(event.name())
            .json_data(&event)
    });

    Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(state.keep_alive)
                .text("keep-alive"),
        )
        .into_response()
}

/// POST /sessions/:session_id/stop
/// Flush and finalize the session; safe to retry
pub async fn stop_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    match state.manager.end_session(&session_id).await {
        Ok(stats) => (
            StatusCode::OK,
            Json(StopSessionResponse {
                session_id,
                status: "ended".to_string(),
                stats,
            }),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

/// GET /sessions/:session_id/status
/// Current session statistics
pub async fn session_status(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    match state.manager.stats(&session_id).await {
        Ok(stats) => (StatusCode::OK, Json(stats)).into_response(),
        Err(err) => error_response(err),
    }
}

/// GET /sessions/:session_id/transcript
/// Accumulated transcript (readable until the ended session is reaped)
pub async fn session_transcript(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    match state.manager.transcript(&session_id).await {
        Ok(transcript) => (
            StatusCode::OK,
            Json(TranscriptResponse {
                session_id,
                transcript,
            }),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
