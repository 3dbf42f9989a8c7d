//! Event types for the Cadence event system
//!
//! Components publish user-visible outcomes (generation progress, celebrations,
//! warnings) on the EventBus. The editor-integration layer subscribes and
//! renders them; nothing in the core waits on a subscriber.

use crate::music::CelebrationType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Cadence event types
///
/// Serialized with a `type` tag so they can be forwarded as JSON lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CadenceEvent {
    /// Analysis of a document finished (possibly via fallback)
    AnalysisCompleted {
        document: String,
        language: String,
        complexity: String,
        /// Telemetry score in [1, 10]
        complexity_score: f64,
        /// True when the remote analysis failed and the language default was used
        fallback: bool,
        timestamp: DateTime<Utc>,
    },

    /// A music request is about to be submitted
    MusicRequested {
        prompt: String,
        bpm: u32,
        genre: String,
        context: String,
        timestamp: DateTime<Utc>,
    },

    /// The generation service accepted a job
    GenerationSubmitted {
        job_id: String,
        timestamp: DateTime<Utc>,
    },

    /// Submission failed; no job is being polled
    GenerationSubmitFailed {
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// Remote job status transition observed by the poll loop
    GenerationStatusChanged {
        job_id: String,
        old_status: String,
        new_status: String,
        timestamp: DateTime<Utc>,
    },

    /// Playback of the live stream began before generation finished
    StreamingStarted {
        job_id: String,
        audio_url: String,
        timestamp: DateTime<Utc>,
    },

    /// Job finished; final asset handed to the player
    GenerationCompleted {
        job_id: String,
        audio_url: Option<String>,
        title: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// Remote job reached the error state
    GenerationFailed {
        job_id: String,
        error_type: Option<String>,
        error_message: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// Poll budget exhausted without a terminal state
    GenerationTimedOut {
        job_id: String,
        last_status: String,
        attempts: u32,
        timestamp: DateTime<Utc>,
    },

    /// Success classifier accepted a celebration
    CelebrationTriggered {
        celebration_type: CelebrationType,
        confidence: f64,
        description: String,
        timestamp: DateTime<Utc>,
    },
}

/// Central event distribution bus
///
/// Thin wrapper over `tokio::sync::broadcast`. Slow subscribers lose the
/// oldest events once `capacity` is exceeded.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<CadenceEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<CadenceEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: CadenceEvent,
    ) -> Result<usize, broadcast::error::SendError<CadenceEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: CadenceEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscriber_receives_emitted_event() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();

        bus.emit(CadenceEvent::GenerationSubmitted {
            job_id: "job-1".to_string(),
            timestamp: Utc::now(),
        })
        .unwrap();

        match rx.recv().await.unwrap() {
            CadenceEvent::GenerationSubmitted { job_id, .. } => assert_eq!(job_id, "job-1"),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_emit_without_subscribers_fails_but_lossy_does_not_panic() {
        let bus = EventBus::new(10);
        let event = CadenceEvent::GenerationSubmitFailed {
            message: "offline".to_string(),
            timestamp: Utc::now(),
        };
        assert!(bus.emit(event.clone()).is_err());
        bus.emit_lossy(event);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = CadenceEvent::GenerationTimedOut {
            job_id: "abc".to_string(),
            last_status: "queued".to_string(),
            attempts: 60,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "GenerationTimedOut");
        assert_eq!(json["attempts"], 60);
    }
}
