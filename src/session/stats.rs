use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::session::SessionState;

/// Point-in-time statistics for a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    pub session_id: String,

    pub state: SessionState,

    /// When the session was created
    pub created_at: DateTime<Utc>,

    /// Last chunk submission or lifecycle change
    pub last_activity_at: DateTime<Utc>,

    pub sample_rate: u32,

    /// Chunk uploads accepted
    pub chunks_received: u64,

    /// Audio buffered in the assembler, not yet cut into a unit
    pub buffered_ms: u64,

    /// Recognition units cut (including gated and the final flush)
    pub units_cut: u64,

    /// Units skipped by the silence gate
    pub units_gated: u64,

    /// Units successfully recognized and merged
    pub units_recognized: u64,

    /// Units absorbed as recognition failures
    pub units_failed: u64,

    /// Length of the accumulated transcript in characters
    pub transcript_chars: usize,

    /// Highest unit sequence applied to the transcript
    pub last_merged_sequence: u64,

    /// Live event-stream subscribers
    pub subscribers: usize,
}
