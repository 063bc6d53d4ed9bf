//! Audio ingestion: PCM decoding, unit assembly, silence gating, and the
//! optional per-session WAV archive.
//!
//! The assembler turns arbitrarily-sized chunk uploads into fixed-duration
//! recognition units with a trailing-overlap prefix for context continuity;
//! the gate skips units that carry no speech energy.

pub mod archive;
pub mod assembler;
pub mod gate;
pub mod pcm;

pub use archive::SessionArchive;
pub use assembler::{AudioUnit, ChunkAssembler};
pub use gate::{GateConfig, SilenceGate};
