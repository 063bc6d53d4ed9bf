//! HTTP API for clients streaming live audio
//!
//! This module provides the transport adapter over the session engine:
//! - POST /sessions/start - Create a transcription session
//! - POST /sessions/:id/chunks - Upload one raw PCM chunk
//! - GET /sessions/:id/events - SSE stream of transcript updates
//! - POST /sessions/:id/stop - Flush and finalize (idempotent)
//! - GET /sessions/:id/status - Query session statistics
//! - GET /sessions/:id/transcript - Read the accumulated transcript
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
