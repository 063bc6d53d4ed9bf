use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::config::SessionConfig;
use super::session::{ChunkReceipt, Session, SessionState};
use super::stats::SessionStats;
use crate::config::Config;
use crate::engine::{RetryPolicy, SpeechEngine};
use crate::error::SessionError;

/// Owns every live session: creation, chunk routing, ending, and the
/// background idle sweep.
///
/// Constructed once at startup with an explicit lifecycle; on shutdown it
/// rejects new sessions and drains the live ones. Ended sessions stay in the
/// map as tombstones for a retention window so repeated stop calls remain
/// no-op successes and the final transcript stays readable for downstream
/// consumers, then the sweep reaps them.
pub struct SessionManager {
    config: Config,
    engine: Arc<dyn SpeechEngine>,
    retry: RetryPolicy,
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    accepting: AtomicBool,
    sweep: Mutex<Option<JoinHandle<()>>>,
}

impl SessionManager {
    pub fn new(config: Config, engine: Arc<dyn SpeechEngine>) -> Arc<Self> {
        let retry = RetryPolicy {
            request_timeout: Duration::from_millis(config.engine.request_timeout_ms),
            attempts: config.engine.retry_attempts,
            backoff: Duration::from_millis(config.engine.retry_backoff_ms),
        };

        Arc::new(Self {
            config,
            engine,
            retry,
            sessions: RwLock::new(HashMap::new()),
            accepting: AtomicBool::new(true),
            sweep: Mutex::new(None),
        })
    }

    /// Spawn the background sweep that force-ends idle sessions and reaps
    /// expired tombstones.
    pub fn start_sweep(self: &Arc<Self>) {
        let manager = Arc::clone(self);
        let interval = Duration::from_secs(self.config.sessions.sweep_interval_secs.max(1));

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                manager.sweep_once().await;
            }
        });

        if let Ok(mut sweep) = self.sweep.lock() {
            if let Some(previous) = sweep.replace(handle) {
                previous.abort();
            }
        }
    }

    pub async fn create_session(
        &self,
        session_id: Option<String>,
        sample_rate: Option<u32>,
    ) -> Result<String, SessionError> {
        if !self.accepting.load(Ordering::SeqCst) {
            return Err(SessionError::ShuttingDown);
        }

        let session_id =
            session_id.unwrap_or_else(|| format!("session-{}", uuid::Uuid::new_v4()));

        let mut sessions = self.sessions.write().await;

        if let Some(existing) = sessions.get(&session_id) {
            if existing.state().await != SessionState::Ended {
                return Err(SessionError::DuplicateSession(session_id));
            }
            // An ended tombstone frees the id for reuse
        }

        let session = Session::spawn(
            self.session_config(session_id.clone(), sample_rate),
            Arc::clone(&self.engine),
            self.retry.clone(),
        );
        sessions.insert(session_id.clone(), session);

        info!(
            "Session registered: {} ({} sessions in registry)",
            session_id,
            sessions.len()
        );

        Ok(session_id)
    }

    pub async fn session(&self, session_id: &str) -> Option<Arc<Session>> {
        self.sessions.read().await.get(session_id).cloned()
    }

    pub async fn submit_chunk(
        &self,
        session_id: &str,
        bytes: &[u8],
    ) -> Result<ChunkReceipt, SessionError> {
        let session = self.require(session_id).await?;
        session.submit(bytes).await
    }

    pub async fn end_session(&self, session_id: &str) -> Result<SessionStats, SessionError> {
        let session = self.require(session_id).await?;
        session.end().await
    }

    pub async fn stats(&self, session_id: &str) -> Result<SessionStats, SessionError> {
        let session = self.require(session_id).await?;
        Ok(session.stats().await)
    }

    pub async fn transcript(&self, session_id: &str) -> Result<String, SessionError> {
        let session = self.require(session_id).await?;
        Ok(session.transcript().await)
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::SeqCst)
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Stop accepting new sessions and end every live one. Called once on
    /// process shutdown.
    pub async fn shutdown(&self) {
        info!("Session manager shutting down, draining sessions");
        self.accepting.store(false, Ordering::SeqCst);

        if let Ok(mut sweep) = self.sweep.lock() {
            if let Some(handle) = sweep.take() {
                handle.abort();
            }
        }

        let snapshot: Vec<Arc<Session>> =
            self.sessions.read().await.values().cloned().collect();

        for session in snapshot {
            if session.state().await != SessionState::Ended {
                if let Err(e) = session.end().await {
                    warn!("Failed to end session {} on shutdown: {}", session.id(), e);
                }
            }
        }

        info!("Session manager drained");
    }

    async fn require(&self, session_id: &str) -> Result<Arc<Session>, SessionError> {
        self.session(session_id)
            .await
            .ok_or_else(|| SessionError::SessionNotFound(session_id.to_string()))
    }

    async fn sweep_once(&self) {
        let idle_timeout =
            chrono::Duration::seconds(self.config.sessions.idle_timeout_secs as i64);
        let retention =
            chrono::Duration::seconds(self.config.sessions.ended_retention_secs as i64);
        let now = Utc::now();

        let snapshot: Vec<(String, Arc<Session>)> = {
            self.sessions
                .read()
                .await
                .iter()
                .map(|(id, session)| (id.clone(), Arc::clone(session)))
                .collect()
        };

        let mut reap = Vec::new();
        for (session_id, session) in snapshot {
            let idle_for = now.signed_duration_since(session.last_activity());

            match session.state().await {
                SessionState::Ended => {
                    if idle_for > retention {
                        reap.push(session_id);
                    }
                }
                _ => {
                    if idle_for > idle_timeout {
                        info!(
                            "Session {} idle for {}s, force-ending",
                            session_id,
                            idle_for.num_seconds()
                        );
                        if let Err(e) = session.end().await {
                            warn!("Idle cleanup failed for {}: {}", session_id, e);
                        }
                    }
                }
            }
        }

        if !reap.is_empty() {
            let mut sessions = self.sessions.write().await;
            for session_id in &reap {
                // Re-check under the write lock; the id may have been reused
                if let Some(session) = sessions.get(session_id) {
                    if session.state().await == SessionState::Ended {
                        sessions.remove(session_id);
                        debug!("Reaped ended session {}", session_id);
                    }
                }
            }
        }
    }

    fn session_config(&self, session_id: String, sample_rate: Option<u32>) -> SessionConfig {
        SessionConfig {
            session_id,
            sample_rate: sample_rate.unwrap_or(self.config.audio.sample_rate),
            chunk_duration: Duration::from_millis(self.config.audio.chunk_ms),
            overlap_duration: Duration::from_millis(self.config.audio.overlap_ms),
            max_chunk_bytes: self.config.audio.max_chunk_bytes,
            gate: self.config.audio.gate.clone(),
            queue_depth: self.config.sessions.queue_depth,
            event_buffer: self.config.sessions.event_buffer,
            failure_ceiling: self.config.engine.failure_ceiling,
            archive_dir: self
                .config
                .archive
                .enabled
                .then(|| PathBuf::from(&self.config.archive.output_dir)),
        }
    }
}
