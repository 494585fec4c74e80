//! Event sink seam
//!
//! The engine hands every committed event batch to an [`EventSink`]. The
//! notification/broadcast collaborators implement this trait; the engine
//! itself stays transport-free.

use crate::core::Event;
use async_trait::async_trait;

/// Consumer of outbound domain events.
///
/// `publish` receives the full batch for one committed mutation, in emission
/// order. Implementations must not assume batches are deduplicated: conflict
/// reports are re-emitted while both steps keep running.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, events: &[Event]);
}

/// Sink that discards all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

#[async_trait]
impl EventSink for NullSink {
    async fn publish(&self, _events: &[Event]) {}
}

/// Sink that buffers events in memory until drained.
///
/// Intended for tests and for collaborators that poll instead of push.
#[derive(Debug, Default)]
pub struct BufferSink {
    events: tokio::sync::Mutex<Vec<Event>>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns all buffered events.
    pub async fn drain(&self) -> Vec<Event> {
        std::mem::take(&mut *self.events.lock().await)
    }

    pub async fn len(&self) -> usize {
        self.events.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.events.lock().await.is_empty()
    }
}

#[async_trait]
impl EventSink for BufferSink {
    async fn publish(&self, events: &[Event]) {
        self.events.lock().await.extend_from_slice(events);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::EventKind;
    use crate::graph::StepId;
    use chrono::Utc;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_buffer_sink_collects_and_drains() {
        let sink = BufferSink::new();
        let event = Event::new(
            Uuid::new_v4(),
            Utc::now(),
            EventKind::StepReady {
                step_id: StepId::new("a"),
            },
        );

        sink.publish(std::slice::from_ref(&event)).await;
        assert_eq!(sink.len().await, 1);

        let drained = sink.drain().await;
        assert_eq!(drained, vec![event]);
        assert!(sink.is_empty().await);
    }
}
