use anyhow::Result;
use serde::Deserialize;

use crate::audio::GateConfig;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub audio: AudioConfig,
    pub engine: EngineConfig,
    pub sessions: SessionsConfig,
    pub archive: ArchiveConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
    /// Interval between SSE keep-alive comments on idle event streams
    pub keep_alive_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Default sample rate for new sessions (clients may override per session)
    pub sample_rate: u32,
    /// Duration of each recognition unit
    pub chunk_ms: u64,
    /// Trailing audio carried into the next unit for recognition context
    pub overlap_ms: u64,
    /// Upper bound on a single uploaded chunk body
    pub max_chunk_bytes: usize,
    pub gate: GateConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// NATS server URL for the remote recognizer
    pub nats_url: String,
    /// Request/reply subject the recognizer listens on
    pub subject: String,
    /// Per-call recognition timeout; expiry is treated as a transient failure
    pub request_timeout_ms: u64,
    /// Bounded retry attempts for transient failures
    pub retry_attempts: u32,
    /// Base backoff between retries (grows linearly per attempt)
    pub retry_backoff_ms: u64,
    /// Consecutive hard failures before the session is force-ended
    pub failure_ceiling: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionsConfig {
    /// Sessions with no chunk activity for this long are force-ended
    pub idle_timeout_secs: u64,
    /// How often the background sweep runs
    pub sweep_interval_secs: u64,
    /// How long ended sessions stay readable before being reaped
    pub ended_retention_secs: u64,
    /// Bounded per-session work queue depth (FIFO, backpressure on overflow)
    pub queue_depth: usize,
    /// Per-session event fan-out buffer; lagging subscribers skip ahead
    pub event_buffer: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// When enabled, every session's ingested audio is written to a WAV file
    pub enabled: bool,
    pub output_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            audio: AudioConfig::default(),
            engine: EngineConfig::default(),
            sessions: SessionsConfig::default(),
            archive: ArchiveConfig::default(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "live-scribe".to_string(),
            http: HttpConfig::default(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8787,
            keep_alive_secs: 15,
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000, // Whisper-class recognizers expect 16kHz
            chunk_ms: 2000,
            overlap_ms: 200,
            max_chunk_bytes: 1024 * 1024,
            gate: GateConfig::default(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            nats_url: "nats://localhost:4222".to_string(),
            subject: "stt.recognize".to_string(),
            request_timeout_ms: 15_000,
            retry_attempts: 3,
            retry_backoff_ms: 500,
            failure_ceiling: 8,
        }
    }
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 300,
            sweep_interval_secs: 30,
            ended_retention_secs: 600,
            queue_depth: 32,
            event_buffer: 64,
        }
    }
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            output_dir: "recordings".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("LIVE_SCRIBE").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
