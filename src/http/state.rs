use std::sync::Arc;
use std::time::Duration;

use crate::session::SessionManager;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// The one session registry for this process
    pub manager: Arc<SessionManager>,
    /// SSE keep-alive interval for idle event streams
    pub keep_alive: Duration,
}

impl AppState {
    pub fn new(manager: Arc<SessionManager>, keep_alive: Duration) -> Self {
        Self {
            manager,
            keep_alive,
        }
    }
}
