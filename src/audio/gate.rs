use serde::Deserialize;
use tracing::debug;

use super::assembler::AudioUnit;

/// Silence gate configuration. All thresholds operate on normalized
/// amplitude (sample / i16::MAX).
///
/// The gate can be switched off entirely; over-aggressive gating drops
/// legitimate low-volume speech, so both positions are supported and tested.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    pub enabled: bool,
    /// A unit whose peak amplitude stays below this is a silence candidate
    pub peak_threshold: f32,
    /// RMS energy floor
    pub rms_threshold: f32,
    /// Minimum fraction of samples above the peak threshold for a unit to
    /// count as speech
    pub min_active_fraction: f32,
    /// When false, the end-of-session flush unit bypasses the gate so the
    /// tail of a quiet recording still gets a final recognition pass
    pub gate_final_flush: bool,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            peak_threshold: 0.01,
            rms_threshold: 0.005,
            min_active_fraction: 0.05,
            gate_final_flush: false,
        }
    }
}

/// Classifies recognition units as silence so they can be skipped instead of
/// wasting an engine call.
pub struct SilenceGate {
    config: GateConfig,
}

impl SilenceGate {
    pub fn new(config: GateConfig) -> Self {
        Self { config }
    }

    /// Whether `unit` should be skipped rather than sent to the engine.
    pub fn should_skip(&self, unit: &AudioUnit) -> bool {
        if !self.config.enabled {
            return false;
        }
        if unit.is_final && !self.config.gate_final_flush {
            return false;
        }
        if unit.samples.is_empty() {
            return true;
        }

        let mut peak = 0.0f32;
        let mut energy = 0.0f64;
        let mut active = 0usize;

        for &sample in &unit.samples {
            let amplitude = (sample as f32 / i16::MAX as f32).abs();
            peak = peak.max(amplitude);
            energy += (amplitude as f64) * (amplitude as f64);
            if amplitude > self.config.peak_threshold {
                active += 1;
            }
        }

        let rms = (energy / unit.samples.len() as f64).sqrt() as f32;
        let active_fraction = active as f32 / unit.samples.len() as f32;

        let silent = peak < self.config.peak_threshold
            && rms < self.config.rms_threshold
            && active_fraction < self.config.min_active_fraction;

        if silent {
            debug!(
                session_id = %unit.session_id,
                sequence = unit.sequence,
                peak,
                rms,
                active_fraction,
                "unit classified as silence"
            );
        }

        silent
    }
}
