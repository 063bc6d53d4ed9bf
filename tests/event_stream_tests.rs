// Integration tests for event delivery: snapshot catch-up on subscribe,
// ordered live updates, and terminal events closing the stream.

mod common;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use common::{poll_until, sine_bytes, test_config, MockEngine};
use futures::StreamExt;
use live_scribe::{SessionEvent, SessionManager, SpeechEngine};

const RATE: u32 = 16_000;

fn manager_with(engine: &Arc<MockEngine>) -> Arc<SessionManager> {
    SessionManager::new(test_config(), Arc::clone(engine) as Arc<dyn SpeechEngine>)
}

#[tokio::test]
async fn late_subscriber_catches_up_via_snapshot() -> Result<()> {
    let engine = Arc::new(MockEngine::new());
    let manager = manager_with(&engine);

    let id = manager.create_session(None, None).await?;
    for _ in 0..3 {
        manager.submit_chunk(&id, &sine_bytes(2000, RATE)).await?;
    }

    // Let all three updates happen before anyone subscribes
    let ok = poll_until(Duration::from_secs(10), || {
        let manager = Arc::clone(&manager);
        let id = id.clone();
        async move { manager.stats(&id).await.unwrap().units_recognized == 3 }
    })
    .await;
    assert!(ok);

    let session = manager.session(&id).await.unwrap();
    let mut events = session.event_stream().await;

    let first = events.next().await.unwrap();
    assert!(
        matches!(first, SessionEvent::Connected { ref session_id } if *session_id == id),
        "stream opens with a connection confirmation, got {:?}",
        first
    );

    let second = events.next().await.unwrap();
    match second {
        SessionEvent::Snapshot {
            transcript,
            sequence,
        } => {
            // Full current transcript, not just future deltas
            assert_eq!(transcript, "unit-1 unit-2 unit-3");
            assert_eq!(sequence, 3);
        }
        other => panic!("expected snapshot, got {:?}", other),
    }

    Ok(())
}

#[tokio::test]
async fn live_updates_carry_the_growing_transcript() -> Result<()> {
    let engine = Arc::new(MockEngine::new());
    let manager = manager_with(&engine);

    let id = manager.create_session(None, None).await?;
    let session = manager.session(&id).await.unwrap();
    let mut events = session.event_stream().await;

    // Skip the connect/snapshot prelude
    events.next().await.unwrap();
    events.next().await.unwrap();

    manager.submit_chunk(&id, &sine_bytes(2000, RATE)).await?;
    manager.submit_chunk(&id, &sine_bytes(2000, RATE)).await?;

    let update = tokio::time::timeout(Duration::from_secs(5), events.next())
        .await?
        .unwrap();
    assert_eq!(
        update,
        SessionEvent::Transcript {
            transcript: "unit-1".to_string(),
            sequence: 1
        }
    );

    let update = tokio::time::timeout(Duration::from_secs(5), events.next())
        .await?
        .unwrap();
    assert_eq!(
        update,
        SessionEvent::Transcript {
            transcript: "unit-1 unit-2".to_string(),
            sequence: 2
        }
    );

    Ok(())
}

#[tokio::test]
async fn stream_closes_after_the_terminal_event() -> Result<()> {
    let engine = Arc::new(MockEngine::new());
    let manager = manager_with(&engine);

    let id = manager.create_session(None, None).await?;
    let session = manager.session(&id).await.unwrap();
    let mut events = session.event_stream().await;

    manager.submit_chunk(&id, &sine_bytes(2000, RATE)).await?;
    manager.end_session(&id).await?;

    let mut collected = Vec::new();
    while let Ok(Some(event)) =
        tokio::time::timeout(Duration::from_secs(5), events.next()).await
    {
        collected.push(event);
    }

    assert_eq!(
        collected.last(),
        Some(&SessionEvent::Ended),
        "stream must end with the terminal event: {:?}",
        collected
    );
    // Stream completed rather than hanging: the while-let above exited on
    // Ok(None), not on timeout
    assert_eq!(
        collected
            .iter()
            .filter(|e| matches!(e, SessionEvent::Ended))
            .count(),
        1
    );

    Ok(())
}

#[tokio::test]
async fn subscriber_to_an_ended_session_gets_snapshot_then_ended() -> Result<()> {
    let engine = Arc::new(MockEngine::new());
    let manager = manager_with(&engine);

    let id = manager.create_session(None, None).await?;
    manager.submit_chunk(&id, &sine_bytes(2000, RATE)).await?;
    manager.end_session(&id).await?;

    let session = manager.session(&id).await.unwrap();
    let events: Vec<SessionEvent> = session.event_stream().await.collect().await;

    assert_eq!(events.len(), 3, "{:?}", events);
    assert!(matches!(events[0], SessionEvent::Connected { .. }));
    match &events[1] {
        SessionEvent::Snapshot { transcript, .. } => {
            assert_eq!(transcript, "unit-1 unit-2");
        }
        other => panic!("expected snapshot, got {:?}", other),
    }
    assert_eq!(events[2], SessionEvent::Ended);

    Ok(())
}
