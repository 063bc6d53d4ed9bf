use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use futures::{future, stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, error, info, warn};

use super::config::SessionConfig;
use super::stats::SessionStats;
use crate::audio::{pcm, AudioUnit, ChunkAssembler, SessionArchive, SilenceGate};
use crate::engine::{recognize_with_retry, EngineError, RetryPolicy, SpeechEngine};
use crate::error::SessionError;
use crate::events::{EventBroadcaster, SessionEvent};
use crate::transcript::TranscriptAccumulator;

/// Session lifecycle. Transitions only move forward:
/// `Created -> Active -> Ending -> Ended`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Session exists, no audio accepted yet
    Created,
    /// Normal ingest/recognize/merge operation
    Active,
    /// Stop requested; the final flush unit is being processed
    Ending,
    /// Terminal
    Ended,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Created => "created",
            SessionState::Active => "active",
            SessionState::Ending => "ending",
            SessionState::Ended => "ended",
        }
    }
}

/// Outcome of a single chunk submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkReceipt {
    /// Audio still buffered below the chunk-duration threshold
    pub buffered_ms: u64,
    /// Units cut by this submission
    pub units_cut: u32,
    /// Units this submission cut that the silence gate skipped
    pub units_gated: u32,
}

/// State guarded by the session's single lock: the state machine, the
/// assembler, the archive sink, and the sender half of the work queue.
/// Keeping these together makes state-check-then-ingest atomic.
struct Inner {
    state: SessionState,
    assembler: ChunkAssembler,
    archive: Option<SessionArchive>,
    unit_tx: Option<mpsc::Sender<AudioUnit>>,
}

#[derive(Default)]
struct Counters {
    chunks_received: AtomicU64,
    units_cut: AtomicU64,
    units_gated: AtomicU64,
    units_recognized: AtomicU64,
    units_failed: AtomicU64,
}

/// One client's continuous recording interaction: assembler, transcript,
/// event fan-out, and a single worker task that serializes recognition.
///
/// The bounded mpsc queue between submission and the worker is what enforces
/// at-most-one-concurrent recognition per session: the worker pulls units
/// one at a time, so a burst of submissions queues FIFO behind the in-flight
/// call instead of fanning out.
pub struct Session {
    config: SessionConfig,
    created_at: DateTime<Utc>,
    inner: Arc<Mutex<Inner>>,
    accumulator: Arc<Mutex<TranscriptAccumulator>>,
    broadcaster: EventBroadcaster,
    gate: SilenceGate,
    /// Set when ending: queued-but-unstarted units are discarded by the
    /// worker; the final flush unit is still processed
    discard_queued: Arc<AtomicBool>,
    last_activity_ms: Arc<AtomicU64>,
    counters: Arc<Counters>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Session {
    /// Create the session and spawn its worker task.
    pub fn spawn(
        config: SessionConfig,
        engine: Arc<dyn SpeechEngine>,
        retry: RetryPolicy,
    ) -> Arc<Self> {
        let (unit_tx, unit_rx) = mpsc::channel(config.queue_depth.max(1));

        let archive = config.archive_dir.as_ref().and_then(|dir| {
            match SessionArchive::create(dir, &config.session_id, config.sample_rate) {
                Ok(archive) => Some(archive),
                Err(e) => {
                    warn!(
                        "Failed to open archive for session {}: {:#}",
                        config.session_id, e
                    );
                    None
                }
            }
        });

        let inner = Arc::new(Mutex::new(Inner {
            state: SessionState::Created,
            assembler: ChunkAssembler::new(
                config.session_id.clone(),
                config.sample_rate,
                config.chunk_duration,
                config.overlap_duration,
            ),
            archive,
            unit_tx: Some(unit_tx),
        }));

        let accumulator = Arc::new(Mutex::new(TranscriptAccumulator::new()));
        let broadcaster = EventBroadcaster::new(config.event_buffer);
        let discard_queued = Arc::new(AtomicBool::new(false));
        let counters = Arc::new(Counters::default());
        let created_at = Utc::now();

        let worker = tokio::spawn(worker_loop(
            WorkerContext {
                session_id: config.session_id.clone(),
                engine,
                retry,
                failure_ceiling: config.failure_ceiling.max(1),
                inner: Arc::clone(&inner),
                accumulator: Arc::clone(&accumulator),
                broadcaster: broadcaster.clone(),
                discard_queued: Arc::clone(&discard_queued),
                counters: Arc::clone(&counters),
            },
            unit_rx,
        ));

        info!(
            "Session created: {} ({}Hz, {}ms chunks, {}ms overlap)",
            config.session_id,
            config.sample_rate,
            config.chunk_duration.as_millis(),
            config.overlap_duration.as_millis()
        );

        let gate = SilenceGate::new(config.gate.clone());

        Arc::new(Self {
            config,
            created_at,
            inner,
            accumulator,
            broadcaster,
            gate,
            discard_queued,
            last_activity_ms: Arc::new(AtomicU64::new(created_at.timestamp_millis() as u64)),
            counters,
            worker: Mutex::new(Some(worker)),
        })
    }

    pub fn id(&self) -> &str {
        &self.config.session_id
    }

    /// Accept one uploaded chunk: decode, archive, buffer, and cut/enqueue
    /// any recognition units that became ready.
    pub async fn submit(&self, bytes: &[u8]) -> Result<ChunkReceipt, SessionError> {
        let samples = pcm::decode_chunk(bytes, self.config.max_chunk_bytes)?;

        let mut inner = self.inner.lock().await;
        match inner.state {
            SessionState::Created => {
                inner.state = SessionState::Active;
                info!("Session active: {}", self.config.session_id);
            }
            SessionState::Active => {}
            SessionState::Ending | SessionState::Ended => {
                return Err(SessionError::InvalidSessionState {
                    id: self.config.session_id.clone(),
                    state: inner.state.as_str(),
                });
            }
        }

        self.touch();
        self.counters.chunks_received.fetch_add(1, Ordering::SeqCst);

        let mut archive_failed = false;
        if let Some(archive) = inner.archive.as_mut() {
            if let Err(e) = archive.append(&samples) {
                warn!(
                    "Archive write failed for session {}, disabling archive: {:#}",
                    self.config.session_id, e
                );
                archive_failed = true;
            }
        }
        if archive_failed {
            inner.archive = None;
        }

        inner.assembler.ingest(&samples);

        let mut units_cut = 0u32;
        let mut units_gated = 0u32;

        // One large write can cover several units; keep the lock so the
        // queue stays strictly FIFO across concurrent submitters.
        while let Some(unit) = inner.assembler.drain() {
            units_cut += 1;
            self.counters.units_cut.fetch_add(1, Ordering::SeqCst);

            if self.gate.should_skip(&unit) {
                units_gated += 1;
                self.counters.units_gated.fetch_add(1, Ordering::SeqCst);
                continue;
            }

            let Some(unit_tx) = inner.unit_tx.as_ref() else {
                break;
            };
            if unit_tx.send(unit).await.is_err() {
                // Worker already stopped (force-ended by the failure ceiling)
                return Err(SessionError::InvalidSessionState {
                    id: self.config.session_id.clone(),
                    state: "ended",
                });
            }
        }

        Ok(ChunkReceipt {
            buffered_ms: inner.assembler.buffered_ms(),
            units_cut,
            units_gated,
        })
    }

    /// Stop the session: flush the final unit, let the in-flight call
    /// finish, discard anything queued but unstarted, then finalize.
    ///
    /// Idempotent: ending an `Ending` or `Ended` session is a no-op success,
    /// so network retries of the stop call are safe.
    pub async fn end(&self) -> Result<SessionStats, SessionError> {
        let pending = {
            let mut inner = self.inner.lock().await;
            match inner.state {
                SessionState::Ending | SessionState::Ended => None,
                SessionState::Created | SessionState::Active => {
                    info!("Ending session: {}", self.config.session_id);
                    inner.state = SessionState::Ending;
                    self.discard_queued.store(true, Ordering::SeqCst);
                    Some((inner.assembler.flush(), inner.unit_tx.take()))
                }
            }
        };

        let Some((final_unit, unit_tx)) = pending else {
            debug!("Session {} already ending/ended, stop is a no-op", self.config.session_id);
            return Ok(self.stats().await);
        };

        if let Some(unit_tx) = unit_tx {
            if let Some(unit) = final_unit {
                self.counters.units_cut.fetch_add(1, Ordering::SeqCst);
                if self.gate.should_skip(&unit) {
                    self.counters.units_gated.fetch_add(1, Ordering::SeqCst);
                    debug!(
                        "Final flush unit for session {} gated as silence",
                        self.config.session_id
                    );
                } else if unit_tx.send(unit).await.is_err() {
                    debug!(
                        "Worker for session {} stopped before the final unit",
                        self.config.session_id
                    );
                }
            }
            // Dropping the sender closes the queue; the worker drains
            // (discarding unstarted units) and exits.
            drop(unit_tx);
        }

        if let Some(worker) = self.worker.lock().await.take() {
            if let Err(e) = worker.await {
                error!("Session worker panicked: {}", e);
            }
        }

        let archive = {
            let mut inner = self.inner.lock().await;
            inner.state = SessionState::Ended;
            inner.archive.take()
        };
        if let Some(archive) = archive {
            match archive.finish() {
                Ok(path) => info!("Session audio archived to {:?}", path),
                Err(e) => warn!("Failed to finalize session archive: {:#}", e),
            }
        }

        self.touch();
        info!("Session ended: {}", self.config.session_id);

        Ok(self.stats().await)
    }

    pub async fn state(&self) -> SessionState {
        self.inner.lock().await.state
    }

    pub async fn transcript(&self) -> String {
        self.accumulator.lock().await.transcript().to_string()
    }

    /// Ordered event stream for one subscriber: connection confirmation, a
    /// snapshot of the current transcript (reconnect catch-up), then live
    /// events until a terminal event closes the stream.
    pub async fn event_stream(&self) -> BoxStream<'static, SessionEvent> {
        // Subscribe before reading state/snapshot so no update can fall
        // between the snapshot and the live tail.
        let rx = self.broadcaster.subscribe();
        let state = self.state().await;
        let (transcript, sequence) = {
            let accumulator = self.accumulator.lock().await;
            (
                accumulator.transcript().to_string(),
                accumulator.last_sequence(),
            )
        };

        let mut prelude = vec![
            SessionEvent::Connected {
                session_id: self.config.session_id.clone(),
            },
            SessionEvent::Snapshot {
                transcript,
                sequence,
            },
        ];
        if state == SessionState::Ended {
            prelude.push(SessionEvent::Ended);
        }

        let live = BroadcastStream::new(rx).filter_map(|item| future::ready(item.ok()));

        // Deliver the terminal event, then close; lagged subscribers skip
        // ahead silently (no replay).
        stream::iter(prelude)
            .chain(live)
            .scan(false, |done, event| {
                if *done {
                    return future::ready(None);
                }
                *done = event.is_terminal();
                future::ready(Some(event))
            })
            .boxed()
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.last_activity_ms.load(Ordering::SeqCst) as i64)
            .unwrap_or(self.created_at)
    }

    pub async fn stats(&self) -> SessionStats {
        let (state, buffered_ms) = {
            let inner = self.inner.lock().await;
            (inner.state, inner.assembler.buffered_ms())
        };
        let (transcript_chars, last_merged_sequence) = {
            let accumulator = self.accumulator.lock().await;
            (accumulator.len(), accumulator.last_sequence())
        };

        SessionStats {
            session_id: self.config.session_id.clone(),
            state,
            created_at: self.created_at,
            last_activity_at: self.last_activity(),
            sample_rate: self.config.sample_rate,
            chunks_received: self.counters.chunks_received.load(Ordering::SeqCst),
            buffered_ms,
            units_cut: self.counters.units_cut.load(Ordering::SeqCst),
            units_gated: self.counters.units_gated.load(Ordering::SeqCst),
            units_recognized: self.counters.units_recognized.load(Ordering::SeqCst),
            units_failed: self.counters.units_failed.load(Ordering::SeqCst),
            transcript_chars,
            last_merged_sequence,
            subscribers: self.broadcaster.subscriber_count(),
        }
    }

    fn touch(&self) {
        self.last_activity_ms
            .store(Utc::now().timestamp_millis() as u64, Ordering::SeqCst);
    }
}

struct WorkerContext {
    session_id: String,
    engine: Arc<dyn SpeechEngine>,
    retry: RetryPolicy,
    failure_ceiling: u32,
    inner: Arc<Mutex<Inner>>,
    accumulator: Arc<Mutex<TranscriptAccumulator>>,
    broadcaster: EventBroadcaster,
    discard_queued: Arc<AtomicBool>,
    counters: Arc<Counters>,
}

/// Single worker per session: pulls units off the queue one at a time,
/// recognizes, and merges strictly in sequence order. Per-unit failures are
/// absorbed here; only a sustained engine outage ends the session.
async fn worker_loop(ctx: WorkerContext, mut unit_rx: mpsc::Receiver<AudioUnit>) {
    debug!(session_id = %ctx.session_id, "session worker started");

    let mut consecutive_failures: u32 = 0;
    let mut force_failed = false;

    while let Some(unit) = unit_rx.recv().await {
        if ctx.discard_queued.load(Ordering::SeqCst) && !unit.is_final {
            debug!(
                session_id = %ctx.session_id,
                sequence = unit.sequence,
                "discarding queued unit after end request"
            );
            continue;
        }

        match recognize_with_retry(ctx.engine.as_ref(), &unit, &ctx.retry).await {
            Ok(result) => {
                consecutive_failures = 0;

                {
                    let mut accumulator = ctx.accumulator.lock().await;
                    if let Some(transcript) = accumulator.merge(&result.text, result.sequence) {
                        ctx.broadcaster.publish(SessionEvent::Transcript {
                            transcript: transcript.to_string(),
                            sequence: result.sequence,
                        });
                    }
                }

                // Incremented after the merge so a stats reader never sees
                // the count ahead of the transcript
                ctx.counters.units_recognized.fetch_add(1, Ordering::SeqCst);
            }
            Err(EngineError::Rejected(reason)) => {
                ctx.counters.units_failed.fetch_add(1, Ordering::SeqCst);
                warn!(
                    session_id = %ctx.session_id,
                    sequence = unit.sequence,
                    "engine rejected unit, skipping: {}",
                    reason
                );
            }
            Err(EngineError::Unavailable(reason)) => {
                ctx.counters.units_failed.fetch_add(1, Ordering::SeqCst);
                consecutive_failures += 1;
                warn!(
                    session_id = %ctx.session_id,
                    sequence = unit.sequence,
                    consecutive_failures,
                    "recognition failed, transcript continues without this unit: {}",
                    reason
                );
                ctx.broadcaster.publish(SessionEvent::Degraded {
                    reason: "transcription temporarily degraded".to_string(),
                });

                if consecutive_failures >= ctx.failure_ceiling {
                    error!(
                        session_id = %ctx.session_id,
                        "engine outage exceeded failure ceiling, force-ending session"
                    );
                    force_failed = true;
                    break;
                }
            }
        }
    }

    // Close the queue before touching session state: a submitter blocked on
    // a full queue holds the inner lock and is only released by this drop.
    drop(unit_rx);

    if force_failed {
        ctx.discard_queued.store(true, Ordering::SeqCst);
        let archive = {
            let mut inner = ctx.inner.lock().await;
            inner.state = SessionState::Ended;
            inner.unit_tx = None;
            inner.archive.take()
        };
        if let Some(archive) = archive {
            if let Err(e) = archive.finish() {
                warn!("Failed to finalize session archive: {:#}", e);
            }
        }
        ctx.broadcaster.publish(SessionEvent::Error {
            message: "transcription engine unavailable, session ended".to_string(),
        });
    } else {
        ctx.broadcaster.publish(SessionEvent::Ended);
    }

    debug!(session_id = %ctx.session_id, "session worker stopped");
}
