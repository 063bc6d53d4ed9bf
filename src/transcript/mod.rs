//! Transcript accumulation: one growing string per session, merged strictly
//! in unit-sequence order.

pub mod accumulator;

pub use accumulator::TranscriptAccumulator;
