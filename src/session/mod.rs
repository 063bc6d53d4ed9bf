//! Session lifecycle management
//!
//! This module provides the session engine:
//! - `Session`: per-client state machine (`Created -> Active -> Ending ->
//!   Ended`), audio assembly, and the single worker task that serializes
//!   recognition and transcript merging
//! - `SessionManager`: explicit registry with create/lookup/end, background
//!   idle sweep, and shutdown draining

mod config;
mod manager;
mod session;
mod stats;

pub use config::SessionConfig;
pub use manager::SessionManager;
pub use session::{ChunkReceipt, Session, SessionState};
pub use stats::SessionStats;
