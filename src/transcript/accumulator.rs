use tracing::debug;

/// Folds successive recognition results into one monotonically growing
/// transcript string.
///
/// Each unit after the first carries the previous unit's overlap tail, so the
/// engine re-hears a little context at every boundary; duplicate suppression
/// across that region is left to the engine's behavior on repeated context.
/// The accumulator's own guarantee is ordering: results must be applied in
/// non-decreasing sequence order, and anything at or below the last applied
/// sequence is dropped as a stale duplicate.
pub struct TranscriptAccumulator {
    transcript: String,
    last_sequence: u64,
}

impl TranscriptAccumulator {
    pub fn new() -> Self {
        Self {
            transcript: String::new(),
            last_sequence: 0,
        }
    }

    /// Merge one recognition result. Returns the updated full transcript, or
    /// `None` when nothing changed (stale sequence, or empty text).
    pub fn merge(&mut self, text: &str, sequence: u64) -> Option<&str> {
        if sequence <= self.last_sequence {
            debug!(
                sequence,
                last_applied = self.last_sequence,
                "stale recognition result dropped"
            );
            return None;
        }

        self.last_sequence = sequence;

        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        if !self.transcript.is_empty() && !self.transcript.ends_with(char::is_whitespace) {
            self.transcript.push(' ');
        }
        self.transcript.push_str(text);

        Some(&self.transcript)
    }

    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    pub fn len(&self) -> usize {
        self.transcript.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transcript.is_empty()
    }
}

impl Default for TranscriptAccumulator {
    fn default() -> Self {
        Self::new()
    }
}
