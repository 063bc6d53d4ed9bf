use thiserror::Error;

/// Session lifecycle and ingestion errors surfaced to HTTP callers.
///
/// Per-unit recognition failures are absorbed inside the session worker and
/// never appear here; see [`crate::engine::EngineError`] for those.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A live session with this id already exists.
    #[error("session {0} already exists")]
    DuplicateSession(String),

    /// No session with this id is known (never created, or already reaped).
    #[error("session {0} not found")]
    SessionNotFound(String),

    /// The operation is not valid in the session's current state.
    #[error("session {id} is {state}, operation not valid")]
    InvalidSessionState { id: String, state: &'static str },

    /// The submitted audio bytes are not valid PCM framing.
    #[error("malformed audio chunk: {0}")]
    MalformedChunk(String),

    /// The service is draining and no longer accepts new sessions.
    #[error("service is shutting down")]
    ShuttingDown,
}
