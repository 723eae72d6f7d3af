//! Helpers for reading session events in tests.

use std::time::Duration;

use tchat_core::{SessionEvent, SessionEvents};

/// How long event helpers wait before panicking.
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Next event, panicking on timeout or a closed channel.
pub async fn next_event(events: &mut SessionEvents) -> SessionEvent {
    match tokio::time::timeout(EVENT_TIMEOUT, events.recv()).await {
        Ok(Some(event)) => event,
        Ok(None) => panic!("event channel closed"),
        Err(_) => panic!("timed out waiting for a session event"),
    }
}

/// Skip events until one matches `pred`.
pub async fn wait_for_event<F>(events: &mut SessionEvents, pred: F) -> SessionEvent
where
    F: Fn(&SessionEvent) -> bool,
{
    loop {
        let event = next_event(events).await;
        if pred(&event) {
            return event;
        }
    }
}

/// Everything already queued, without waiting.
pub fn drain_events(events: &mut SessionEvents) -> Vec<SessionEvent> {
    std::iter::from_fn(|| events.try_recv().ok()).collect()
}
