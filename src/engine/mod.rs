//! Speech-recognition engine boundary.
//!
//! The engine sits behind the [`SpeechEngine`] trait so local and remote
//! recognizers are interchangeable and tests can script results. Calls are
//! wrapped with a bounded timeout and retry policy by
//! [`recognize_with_retry`]; the engine client itself is stateless and shared
//! read-only across all sessions.

pub mod nats;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::time::{sleep, timeout};
use tracing::warn;

use crate::audio::AudioUnit;

pub use nats::NatsEngine;

/// Recognized text for one audio unit. Ephemeral; merged into the transcript
/// and dropped.
#[derive(Debug, Clone)]
pub struct RecognitionResult {
    pub text: String,
    pub confidence: f32,
    /// Sequence number of the source unit
    pub sequence: u64,
}

#[derive(Debug, Error)]
pub enum EngineError {
    /// Transient failure; the caller may retry with backoff.
    #[error("engine unavailable: {0}")]
    Unavailable(String),

    /// Permanent failure for this unit; skip it and move on, never retry.
    #[error("engine rejected unit: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait SpeechEngine: Send + Sync {
    /// Submit one PCM unit and wait for recognized text.
    async fn recognize(&self, unit: &AudioUnit) -> Result<RecognitionResult, EngineError>;

    /// Engine name for logging.
    fn name(&self) -> &str;
}

/// Bounded timeout and retry settings for recognition calls.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Per-call ceiling; expiry counts as [`EngineError::Unavailable`]
    pub request_timeout: Duration,
    pub attempts: u32,
    /// Base delay; attempt N waits N * backoff
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(15),
            attempts: 3,
            backoff: Duration::from_millis(500),
        }
    }
}

/// Call the engine with the policy's timeout, retrying transient failures
/// with linear backoff. Rejections are returned immediately.
pub async fn recognize_with_retry(
    engine: &dyn SpeechEngine,
    unit: &AudioUnit,
    policy: &RetryPolicy,
) -> Result<RecognitionResult, EngineError> {
    let attempts = policy.attempts.max(1);
    let mut last = EngineError::Unavailable("no attempts made".to_string());

    for attempt in 1..=attempts {
        match timeout(policy.request_timeout, engine.recognize(unit)).await {
            Ok(Ok(result)) => return Ok(result),
            Ok(Err(EngineError::Rejected(reason))) => {
                return Err(EngineError::Rejected(reason));
            }
            Ok(Err(EngineError::Unavailable(reason))) => {
                warn!(
                    engine = engine.name(),
                    sequence = unit.sequence,
                    attempt,
                    "recognition unavailable: {}",
                    reason
                );
                last = EngineError::Unavailable(reason);
            }
            Err(_) => {
                warn!(
                    engine = engine.name(),
                    sequence = unit.sequence,
                    attempt,
                    "recognition timed out after {:?}",
                    policy.request_timeout
                );
                last = EngineError::Unavailable(format!(
                    "timed out after {:?}",
                    policy.request_timeout
                ));
            }
        }

        if attempt < attempts {
            sleep(policy.backoff * attempt).await;
        }
    }

    Err(last)
}
