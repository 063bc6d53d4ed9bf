use anyhow::{Context, Result};
use async_nats::Client;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{EngineError, RecognitionResult, SpeechEngine};
use crate::audio::{pcm, AudioUnit};

/// Recognition request sent over NATS request/reply.
#[derive(Debug, Serialize, Deserialize)]
pub struct RecognizeRequest {
    pub session_id: String,
    pub sequence: u64,
    /// Base64-encoded little-endian i16 PCM
    pub pcm: String,
    pub sample_rate: u32,
    #[serde(rename = "final")]
    pub final_unit: bool,
}

/// Reply from the recognizer. A populated `error` marks the unit as
/// permanently rejected.
#[derive(Debug, Serialize, Deserialize)]
pub struct RecognizeReply {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub confidence: f32,
    #[serde(default)]
    pub error: Option<String>,
}

/// Remote speech recognizer reached over NATS request/reply.
///
/// The client is stateless per request and shared across all sessions; the
/// per-call timeout lives in the retry policy, not here.
pub struct NatsEngine {
    client: Client,
    subject: String,
}

impl NatsEngine {
    pub async fn connect(url: &str, subject: String) -> Result<Self> {
        info!("Connecting to NATS at {}", url);

        let client = async_nats::connect(url)
            .await
            .context("Failed to connect to NATS")?;

        info!("Connected to NATS, recognizer subject: {}", subject);

        Ok(Self { client, subject })
    }
}

#[async_trait::async_trait]
impl SpeechEngine for NatsEngine {
    async fn recognize(&self, unit: &AudioUnit) -> Result<RecognitionResult, EngineError> {
        let request = RecognizeRequest {
            session_id: unit.session_id.clone(),
            sequence: unit.sequence,
            pcm: base64::engine::general_purpose::STANDARD.encode(pcm::encode_samples(&unit.samples)),
            sample_rate: unit.sample_rate,
            final_unit: unit.is_final,
        };

        let payload = serde_json::to_vec(&request)
            .map_err(|e| EngineError::Rejected(format!("unencodable request: {}", e)))?;

        debug!(
            session_id = %unit.session_id,
            sequence = unit.sequence,
            bytes = payload.len(),
            "requesting recognition on {}",
            self.subject
        );

        let message = self
            .client
            .request(self.subject.clone(), payload.into())
            .await
            .map_err(|e| EngineError::Unavailable(e.to_string()))?;

        let reply: RecognizeReply = serde_json::from_slice(&message.payload)
            .map_err(|e| EngineError::Rejected(format!("unparseable reply: {}", e)))?;

        if let Some(error) = reply.error {
            return Err(EngineError::Rejected(error));
        }

        Ok(RecognitionResult {
            text: reply.text,
            confidence: reply.confidence,
            sequence: unit.sequence,
        })
    }

    fn name(&self) -> &str {
        "nats"
    }
}
