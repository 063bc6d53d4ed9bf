use std::time::Duration;

use tracing::debug;

/// One contiguous span of mono i16 PCM submitted to the recognizer as a
/// single call. Produced by [`ChunkAssembler`], consumed once, then dropped.
#[derive(Debug, Clone)]
pub struct AudioUnit {
    pub session_id: String,
    /// Assembler-assigned, strictly increasing from 1, gap-free
    pub sequence: u64,
    pub samples: Vec<i16>,
    pub sample_rate: u32,
    /// Set on the unit produced by the end-of-session flush
    pub is_final: bool,
}

impl AudioUnit {
    pub fn duration_ms(&self) -> u64 {
        samples_to_ms(self.samples.len(), self.sample_rate)
    }
}

/// Turns arbitrarily-sized PCM writes into fixed-duration recognition units,
/// each prefixed with the trailing overlap of the previous unit so words are
/// not cut mid-utterance at chunk boundaries.
///
/// Single-owner per session; the owning session serializes all access.
pub struct ChunkAssembler {
    session_id: String,
    sample_rate: u32,
    /// Samples per unit body (excluding the overlap prefix)
    chunk_samples: usize,
    /// Samples retained as context for the next unit
    overlap_samples: usize,
    buffer: Vec<i16>,
    overlap: Vec<i16>,
    next_sequence: u64,
}

impl ChunkAssembler {
    pub fn new(
        session_id: String,
        sample_rate: u32,
        chunk_duration: Duration,
        overlap_duration: Duration,
    ) -> Self {
        Self {
            session_id,
            sample_rate,
            chunk_samples: ms_to_samples(chunk_duration.as_millis() as u64, sample_rate),
            overlap_samples: ms_to_samples(overlap_duration.as_millis() as u64, sample_rate),
            buffer: Vec::new(),
            overlap: Vec::new(),
            next_sequence: 0,
        }
    }

    /// Append raw samples to the internal buffer.
    pub fn ingest(&mut self, samples: &[i16]) {
        self.buffer.extend_from_slice(samples);
    }

    /// Cut the next unit if a full chunk duration has accumulated.
    ///
    /// Returns `None` when there is not enough audio yet; that is the normal
    /// "keep buffering" outcome, not an error. Call in a loop after `ingest`
    /// since one large write can cover several units.
    pub fn drain(&mut self) -> Option<AudioUnit> {
        if self.buffer.len() < self.chunk_samples {
            return None;
        }

        let mut samples = Vec::with_capacity(self.overlap.len() + self.chunk_samples);
        samples.extend_from_slice(&self.overlap);
        samples.extend_from_slice(&self.buffer[..self.chunk_samples]);
        self.buffer.drain(..self.chunk_samples);

        self.overlap = samples[samples.len() - self.overlap_samples.min(samples.len())..].to_vec();

        Some(self.cut(samples, false))
    }

    /// Force a final cut of the overlap plus everything still buffered,
    /// regardless of the duration threshold. The last unit ever produced.
    pub fn flush(&mut self) -> Option<AudioUnit> {
        if self.buffer.is_empty() && self.overlap.is_empty() {
            return None;
        }

        let mut samples = std::mem::take(&mut self.overlap);
        samples.append(&mut self.buffer);

        Some(self.cut(samples, true))
    }

    fn cut(&mut self, samples: Vec<i16>, is_final: bool) -> AudioUnit {
        self.next_sequence += 1;

        let unit = AudioUnit {
            session_id: self.session_id.clone(),
            sequence: self.next_sequence,
            samples,
            sample_rate: self.sample_rate,
            is_final,
        };

        debug!(
            session_id = %self.session_id,
            sequence = unit.sequence,
            duration_ms = unit.duration_ms(),
            is_final,
            "cut audio unit"
        );

        unit
    }

    /// Duration of audio currently buffered and not yet cut.
    pub fn buffered_ms(&self) -> u64 {
        samples_to_ms(self.buffer.len(), self.sample_rate)
    }

    pub fn overlap_len(&self) -> usize {
        self.overlap.len()
    }

    pub fn last_sequence(&self) -> u64 {
        self.next_sequence
    }
}

fn ms_to_samples(ms: u64, sample_rate: u32) -> usize {
    (ms as usize * sample_rate as usize) / 1000
}

fn samples_to_ms(samples: usize, sample_rate: u32) -> u64 {
    if sample_rate == 0 {
        return 0;
    }
    (samples as u64 * 1000) / sample_rate as u64
}
