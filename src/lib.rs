pub mod audio;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod http;
pub mod session;
pub mod transcript;

pub use audio::{AudioUnit, ChunkAssembler, GateConfig, SessionArchive, SilenceGate};
pub use config::Config;
pub use engine::{
    recognize_with_retry, EngineError, NatsEngine, RecognitionResult, RetryPolicy, SpeechEngine,
};
pub use error::SessionError;
pub use events::{EventBroadcaster, SessionEvent};
pub use http::{create_router, AppState};
pub use session::{ChunkReceipt, Session, SessionConfig, SessionManager, SessionState, SessionStats};
pub use transcript::TranscriptAccumulator;
