use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Writes a session's ingested audio to a WAV file on disk.
///
/// Config-gated diagnostic sink; archive failures are logged by the caller
/// and never fail the recognition pipeline.
pub struct SessionArchive {
    writer: Option<hound::WavWriter<BufWriter<File>>>,
    path: PathBuf,
    sample_count: usize,
}

impl SessionArchive {
    pub fn create(output_dir: &Path, session_id: &str, sample_rate: u32) -> Result<Self> {
        fs::create_dir_all(output_dir).context("Failed to create archive directory")?;

        let path = output_dir.join(format!("{}.wav", session_id));

        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let writer = hound::WavWriter::create(&path, spec)
            .with_context(|| format!("Failed to create WAV file: {:?}", path))?;

        info!("Session archive opened: {:?}", path);

        Ok(Self {
            writer: Some(writer),
            path,
            sample_count: 0,
        })
    }

    pub fn append(&mut self, samples: &[i16]) -> Result<()> {
        if let Some(writer) = &mut self.writer {
            for &sample in samples {
                writer
                    .write_sample(sample)
                    .context("Failed to write sample to WAV")?;
            }
            self.sample_count += samples.len();
        }

        Ok(())
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    pub fn finish(mut self) -> Result<PathBuf> {
        if let Some(writer) = self.writer.take() {
            writer.finalize().context("Failed to finalize WAV file")?;
        }

        info!(
            "Session archive finalized: {:?} ({} samples)",
            self.path, self.sample_count
        );

        Ok(self.path.clone())
    }
}

impl Drop for SessionArchive {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.take() {
            if let Err(e) = writer.finalize() {
                warn!("Failed to finalize WAV archive on drop: {}", e);
            }
        }
    }
}
