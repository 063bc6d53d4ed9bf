use serde::{Deserialize, Serialize};

/// Events pushed to a session's subscribers, in publish order.
///
/// Transcript-bearing events carry the full accumulated text rather than a
/// delta, so any single update (or the snapshot on connect) is enough to
/// re-derive client state after a reconnect.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Connection confirmation, first event on every stream
    Connected { session_id: String },
    /// Current transcript at subscribe time (reconnect catch-up)
    Snapshot { transcript: String, sequence: u64 },
    /// The transcript grew
    Transcript { transcript: String, sequence: u64 },
    /// Transcription is temporarily degraded; the session continues
    Degraded { reason: String },
    /// Terminal failure; the session was force-ended
    Error { message: String },
    /// Terminal: the session ended normally
    Ended,
}

impl SessionEvent {
    /// SSE event name for client-side listeners.
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::Connected { .. } => "connected",
            SessionEvent::Snapshot { .. } => "snapshot",
            SessionEvent::Transcript { .. } => "transcript",
            SessionEvent::Degraded { .. } => "degraded",
            SessionEvent::Error { .. } => "error",
            SessionEvent::Ended => "ended",
        }
    }

    /// Terminal events close the stream after delivery.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionEvent::Ended | SessionEvent::Error { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_tag_by_type() {
        let event = SessionEvent::Transcript {
            transcript: "hello world".to_string(),
            sequence: 2,
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"transcript\""));
        assert!(json.contains("hello world"));
        assert!(json.contains("\"sequence\":2"));

        let back: SessionEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn ended_serializes_without_payload() {
        let json = serde_json::to_string(&SessionEvent::Ended).unwrap();
        assert_eq!(json, r#"{"type":"ended"}"#);
    }

    #[test]
    fn terminal_classification() {
        assert!(SessionEvent::Ended.is_terminal());
        assert!(SessionEvent::Error {
            message: "engine outage".to_string()
        }
        .is_terminal());
        assert!(!SessionEvent::Degraded {
            reason: "retrying".to_string()
        }
        .is_terminal());
        assert!(!SessionEvent::Connected {
            session_id: "s".to_string()
        }
        .is_terminal());
    }
}
