use std::path::PathBuf;
use std::time::Duration;

use crate::audio::GateConfig;

/// Runtime configuration for a single session, derived from the service
/// config at creation time.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Unique session identifier (client-supplied or generated)
    pub session_id: String,

    /// Sample rate of the incoming PCM stream
    pub sample_rate: u32,

    /// Duration of each recognition unit
    /// Default: 2000 ms
    pub chunk_duration: Duration,

    /// Trailing audio prefixed onto the next unit for context continuity
    /// Default: 200 ms
    pub overlap_duration: Duration,

    /// Upper bound on a single uploaded chunk body
    pub max_chunk_bytes: usize,

    /// Silence gate settings
    pub gate: GateConfig,

    /// Bounded work queue depth between ingestion and recognition
    pub queue_depth: usize,

    /// Event fan-out buffer capacity
    pub event_buffer: usize,

    /// Consecutive hard recognition failures before the session is
    /// force-ended
    pub failure_ceiling: u32,

    /// When set, ingested audio is archived to a WAV file in this directory
    pub archive_dir: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("session-{}", uuid::Uuid::new_v4()),
            sample_rate: 16000, // Whisper-class recognizers expect 16kHz
            chunk_duration: Duration::from_millis(2000),
            overlap_duration: Duration::from_millis(200),
            max_chunk_bytes: 1024 * 1024,
            gate: GateConfig::default(),
            queue_depth: 32,
            event_buffer: 64,
            failure_ceiling: 8,
            archive_dir: None,
        }
    }
}
