// Shared test support: a scriptable mock recognition engine and PCM
// generators for driving the session pipeline without a real recognizer.
#![allow(dead_code)]

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use live_scribe::audio::pcm;
use live_scribe::{AudioUnit, Config, EngineError, RecognitionResult, SpeechEngine};

/// Scripted behavior for one unit sequence number.
pub enum FailurePlan {
    /// Fail with `Unavailable` this many times, then succeed
    Unavailable(u32),
    /// Permanently reject every call for this sequence
    Rejected,
}

/// Mock engine that recognizes `unit-<sequence>` for every unit, with
/// scriptable per-sequence failures and a concurrency high-water mark.
pub struct MockEngine {
    delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    failures: Mutex<HashMap<u64, FailurePlan>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::with_delay(Duration::from_millis(5))
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            failures: Mutex::new(HashMap::new()),
        }
    }

    pub fn fail_unavailable(&self, sequence: u64, times: u32) {
        self.failures
            .lock()
            .unwrap()
            .insert(sequence, FailurePlan::Unavailable(times));
    }

    pub fn fail_rejected(&self, sequence: u64) {
        self.failures
            .lock()
            .unwrap()
            .insert(sequence, FailurePlan::Rejected);
    }

    /// Total recognize() invocations, including retried attempts.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of recognize() calls ever in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechEngine for MockEngine {
    async fn recognize(&self, unit: &AudioUnit) -> Result<RecognitionResult, EngineError> {
        let concurrent = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(concurrent, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;

        let result = {
            let mut failures = self.failures.lock().unwrap();
            match failures.get_mut(&unit.sequence) {
                Some(FailurePlan::Unavailable(remaining)) if *remaining > 0 => {
                    *remaining -= 1;
                    Err(EngineError::Unavailable("scripted outage".to_string()))
                }
                Some(FailurePlan::Rejected) => {
                    Err(EngineError::Rejected("scripted rejection".to_string()))
                }
                _ => Ok(RecognitionResult {
                    text: format!("unit-{}", unit.sequence),
                    confidence: 0.9,
                    sequence: unit.sequence,
                }),
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Service config tuned for fast tests: short timeouts, no silence gate.
pub fn test_config() -> Config {
    let mut cfg = Config::default();
    cfg.audio.gate.enabled = false;
    cfg.engine.request_timeout_ms = 1_000;
    cfg.engine.retry_attempts = 2;
    cfg.engine.retry_backoff_ms = 5;
    cfg.engine.failure_ceiling = 3;
    cfg
}

/// `ms` of 440Hz sine PCM at `rate`, encoded as chunk-upload bytes.
pub fn sine_bytes(ms: u64, rate: u32) -> Vec<u8> {
    let n = (ms as usize * rate as usize) / 1000;
    let samples: Vec<i16> = (0..n)
        .map(|i| {
            let t = i as f32 / rate as f32;
            ((t * 440.0 * std::f32::consts::TAU).sin() * 8000.0) as i16
        })
        .collect();
    pcm::encode_samples(&samples)
}

/// `ms` of digital silence at `rate`, encoded as chunk-upload bytes.
pub fn silence_bytes(ms: u64, rate: u32) -> Vec<u8> {
    let n = (ms as usize * rate as usize) / 1000;
    vec![0u8; n * 2]
}

/// Poll `f` every 10ms until it returns true or `timeout` elapses.
pub async fn poll_until<F, Fut>(timeout: Duration, mut f: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if f().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
