use tokio::sync::broadcast;
use tracing::debug;

use super::messages::SessionEvent;

/// Per-session fan-out of transcript events to live subscribers.
///
/// No buffering or replay: publishing with zero subscribers drops the event,
/// and a subscriber that lags past the channel capacity skips ahead. A
/// (re)connecting client catches up via the snapshot the stream layer sends
/// on subscribe, not via history.
#[derive(Clone)]
pub struct EventBroadcaster {
    tx: broadcast::Sender<SessionEvent>,
}

impl EventBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Fan the event out to all current subscribers. Dropped silently when
    /// nobody is listening.
    pub fn publish(&self, event: SessionEvent) {
        match self.tx.send(event) {
            Ok(receivers) => {
                debug!(receivers, "event published");
            }
            Err(broadcast::error::SendError(event)) => {
                debug!(event = event.name(), "no subscribers, event dropped");
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_without_subscribers_is_dropped() {
        let broadcaster = EventBroadcaster::new(8);
        // Must not panic or error out
        broadcaster.publish(SessionEvent::Ended);
        assert_eq!(broadcaster.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn subscribers_receive_in_publish_order() {
        let broadcaster = EventBroadcaster::new(8);
        let mut rx = broadcaster.subscribe();

        broadcaster.publish(SessionEvent::Transcript {
            transcript: "a".to_string(),
            sequence: 1,
        });
        broadcaster.publish(SessionEvent::Transcript {
            transcript: "a b".to_string(),
            sequence: 2,
        });
        broadcaster.publish(SessionEvent::Ended);

        assert!(matches!(
            rx.recv().await.unwrap(),
            SessionEvent::Transcript { sequence: 1, .. }
        ));
        assert!(matches!(
            rx.recv().await.unwrap(),
            SessionEvent::Transcript { sequence: 2, .. }
        ));
        assert!(matches!(rx.recv().await.unwrap(), SessionEvent::Ended));
    }

    #[tokio::test]
    async fn late_subscriber_sees_no_history() {
        let broadcaster = EventBroadcaster::new(8);

        broadcaster.publish(SessionEvent::Transcript {
            transcript: "before".to_string(),
            sequence: 1,
        });

        let mut rx = broadcaster.subscribe();
        broadcaster.publish(SessionEvent::Transcript {
            transcript: "before after".to_string(),
            sequence: 2,
        });

        // Only the post-subscribe event is delivered
        assert!(matches!(
            rx.recv().await.unwrap(),
            SessionEvent::Transcript { sequence: 2, .. }
        ));
    }

    #[tokio::test]
    async fn multiple_subscribers_all_receive() {
        let broadcaster = EventBroadcaster::new(8);
        let mut rx1 = broadcaster.subscribe();
        let mut rx2 = broadcaster.subscribe();
        assert_eq!(broadcaster.subscriber_count(), 2);

        broadcaster.publish(SessionEvent::Ended);

        assert!(matches!(rx1.recv().await.unwrap(), SessionEvent::Ended));
        assert!(matches!(rx2.recv().await.unwrap(), SessionEvent::Ended));
    }
}
