//! # Event Bus System
//!
//! Provides an event-driven architecture for the jukebox core using `tokio::sync::broadcast`.
//! The queue core publishes every state transition it applies; the service
//! façade turns those into chat notices, and hosts may subscribe for their own
//! dashboards or logs.
//!
//! ## Overview
//!
//! The event bus system consists of:
//! - **Event Types**: Strongly-typed enums for queue and session transitions
//! - **EventBus**: Central broadcast channel for publishing events
//! - **EventStream**: Wrapper for consuming events with filtering
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     emit      ┌───────────┐     subscribe    ┌──────────────────┐
//! │ Command Gate ├──────────────>│           ├─────────────────>│NotificationRelay │
//! └──────────────┘               │ EventBus  │                  └──────────────────┘
//!                                │ (broadcast│
//! ┌──────────────┐     emit      │  channel) │     subscribe    ┌──────────────────┐
//! │ Signal pump  ├──────────────>│           ├─────────────────>│   Host listener  │
//! └──────────────┘               └───────────┘                  └──────────────────┘
//! ```
//!
//! Events are emitted while the channel's exclusive section is held, so the
//! order a subscriber observes for one channel is the order the transitions
//! were applied in. `emit` never blocks.
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, QueueEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut stream = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Queue(QueueEvent::TrackStarted {
//!         channel_id: 7,
//!         title: "Intro".to_string(),
//!     }))
//!     .ok();
//!
//! let event = stream.recv().await.unwrap();
//! assert_eq!(event.channel_id(), 7);
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: Subscriber was too slow and missed `n` events.
//!   This is non-fatal; the subscriber can continue receiving new events.
//! - **`RecvError::Closed`**: All senders have been dropped. This indicates shutdown.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// Subscribers that can't keep up will receive `RecvError::Lagged`.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum published through the event bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Queue and playback transitions
    Queue(QueueEvent),
    /// Session lifecycle
    Session(SessionEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Queue(e) => e.description(),
            CoreEvent::Session(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Queue(QueueEvent::PlaybackFailed { .. }) => EventSeverity::Warning,
            CoreEvent::Session(SessionEvent::Stalled { .. }) => EventSeverity::Warning,
            CoreEvent::Queue(QueueEvent::TrackStarted { .. }) => EventSeverity::Info,
            CoreEvent::Session(SessionEvent::Created { .. }) => EventSeverity::Info,
            CoreEvent::Session(SessionEvent::TornDown { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }

    /// Chat channel the event belongs to.
    pub fn channel_id(&self) -> u64 {
        match self {
            CoreEvent::Queue(e) => e.channel_id(),
            CoreEvent::Session(e) => e.channel_id(),
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Debug-level events (verbose)
    Debug,
    /// Informational events
    Info,
    /// Warning events
    Warning,
    /// Error events
    Error,
}

// ============================================================================
// Queue Events
// ============================================================================

/// Transitions of a channel's queue and playback slot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum QueueEvent {
    /// A track was accepted by `enqueue`.
    TrackQueued {
        channel_id: u64,
        title: String,
        /// 1-based queue position, `None` when the track went straight to playing.
        position: Option<usize>,
    },
    /// A track became the current one and was handed to the engine.
    TrackStarted { channel_id: u64, title: String },
    /// A stop request was issued for the current track.
    SkipRequested { channel_id: u64, title: String },
    /// The current track was paused.
    Paused { channel_id: u64, title: String },
    /// The current track was resumed.
    Resumed { channel_id: u64, title: String },
    /// A queued track was removed.
    TrackRemoved {
        channel_id: u64,
        title: String,
        /// 1-based position the track had before removal.
        position: usize,
    },
    /// The engine reported the current track as stopped.
    TrackEnded {
        channel_id: u64,
        title: String,
        /// Why the track ended (`finished`, `stopped`, `failed`, `abandoned`).
        reason: String,
    },
    /// The engine could not play a track; the queue moved on.
    PlaybackFailed {
        channel_id: u64,
        title: String,
        reason: String,
    },
}

impl QueueEvent {
    fn description(&self) -> &str {
        match self {
            QueueEvent::TrackQueued { .. } => "Track added to queue",
            QueueEvent::TrackStarted { .. } => "Track started playing",
            QueueEvent::SkipRequested { .. } => "Skip requested",
            QueueEvent::Paused { .. } => "Playback paused",
            QueueEvent::Resumed { .. } => "Playback resumed",
            QueueEvent::TrackRemoved { .. } => "Track removed from queue",
            QueueEvent::TrackEnded { .. } => "Track ended",
            QueueEvent::PlaybackFailed { .. } => "Playback failed",
        }
    }

    fn channel_id(&self) -> u64 {
        match self {
            QueueEvent::TrackQueued { channel_id, .. }
            | QueueEvent::TrackStarted { channel_id, .. }
            | QueueEvent::SkipRequested { channel_id, .. }
            | QueueEvent::Paused { channel_id, .. }
            | QueueEvent::Resumed { channel_id, .. }
            | QueueEvent::TrackRemoved { channel_id, .. }
            | QueueEvent::TrackEnded { channel_id, .. }
            | QueueEvent::PlaybackFailed { channel_id, .. } => *channel_id,
        }
    }
}

// ============================================================================
// Session Events
// ============================================================================

/// Lifecycle of a channel's playback session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SessionEvent {
    /// A voice endpoint was joined and a session now owns the channel.
    Created {
        channel_id: u64,
        session_id: String,
        voice_channel_id: u64,
    },
    /// The engine did not confirm a stop in time; `action` says what the
    /// core did about it (`advance` or `teardown`).
    Stalled {
        channel_id: u64,
        session_id: String,
        title: String,
        action: String,
    },
    /// The session ended and its endpoint was released.
    TornDown {
        channel_id: u64,
        session_id: String,
        /// `drained`, `stalled` or `shutdown`.
        reason: String,
    },
}

impl SessionEvent {
    fn description(&self) -> &str {
        match self {
            SessionEvent::Created { .. } => "Playback session created",
            SessionEvent::Stalled { .. } => "Playback engine did not confirm stop",
            SessionEvent::TornDown { .. } => "Playback session torn down",
        }
    }

    fn channel_id(&self) -> u64 {
        match self {
            SessionEvent::Created { channel_id, .. }
            | SessionEvent::Stalled { channel_id, .. }
            | SessionEvent::TornDown { channel_id, .. } => *channel_id,
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to core events.
///
/// Cloning is cheap; all clones publish into the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum number of events to buffer per subscriber.
    ///   When a subscriber falls behind by more than this amount, it will
    ///   receive a `RecvError::Lagged` error.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event.
    /// Returns an error if there are no active subscribers.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber to receive events.
    ///
    /// Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    ///
    /// ```rust
    /// use core_runtime::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// assert_eq!(event_bus.subscriber_count(), 0);
    ///
    /// let _subscriber = event_bus.subscribe();
    /// assert_eq!(event_bus.subscriber_count(), 1);
    /// ```
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with additional filtering capabilities.
///
/// ```rust
/// use core_runtime::events::{EventBus, EventStream, CoreEvent};
///
/// let event_bus = EventBus::new(100);
/// let sessions_only = EventStream::new(event_bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Session(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    /// Creates a new event stream from a receiver.
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Adds a filter function to this stream.
    ///
    /// Only events that match the filter will be returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Receives the next event that passes the filter (if any).
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;

            let Some(filter) = &self.filter else {
                return Ok(event);
            };

            if filter(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without blocking.
    ///
    /// Returns `None` if no events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    let Some(filter) = &self.filter else {
                        return Some(Ok(event));
                    };

                    if filter(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(channel_id: u64, title: &str) -> CoreEvent {
        CoreEvent::Queue(QueueEvent::TrackStarted {
            channel_id,
            title: title.to_string(),
        })
    }

    #[tokio::test]
    async fn test_event_bus_subscription() {
        let bus = EventBus::new(10);
        assert_eq!(bus.subscriber_count(), 0);
        let _sub1 = bus.subscribe();
        let _sub2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[tokio::test]
    async fn test_event_emission_no_subscribers() {
        let bus = EventBus::new(10);
        assert!(bus.emit(started(1, "A")).is_err());
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(10);
        let mut sub1 = bus.subscribe();
        let mut sub2 = bus.subscribe();

        let event = CoreEvent::Session(SessionEvent::Created {
            channel_id: 3,
            session_id: "s-1".to_string(),
            voice_channel_id: 30,
        });

        assert_eq!(bus.emit(event.clone()).unwrap(), 2);
        assert_eq!(sub1.recv().await.unwrap(), event);
        assert_eq!(sub2.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_emission_order_is_preserved() {
        let bus = EventBus::new(10);
        let mut sub = bus.subscribe();

        for title in ["A", "B", "C"] {
            bus.emit(started(1, title)).ok();
        }

        for title in ["A", "B", "C"] {
            assert_eq!(sub.recv().await.unwrap(), started(1, title));
        }
    }

    #[tokio::test]
    async fn test_event_stream_with_filter() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe())
            .filter(|event| matches!(event, CoreEvent::Session(_)));

        bus.emit(started(1, "A")).ok();
        let torn_down = CoreEvent::Session(SessionEvent::TornDown {
            channel_id: 1,
            session_id: "s-1".to_string(),
            reason: "drained".to_string(),
        });
        bus.emit(torn_down.clone()).ok();

        assert_eq!(stream.recv().await.unwrap(), torn_down);
    }

    #[tokio::test]
    async fn test_lagged_subscriber() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe();

        for i in 0..5 {
            bus.emit(started(i, "A")).ok();
        }

        let result = sub.recv().await;
        assert!(matches!(result, Err(RecvError::Lagged(_))));
    }

    #[test]
    fn test_event_severity() {
        let failed = CoreEvent::Queue(QueueEvent::PlaybackFailed {
            channel_id: 1,
            title: "A".to_string(),
            reason: "decoder error".to_string(),
        });
        assert_eq!(failed.severity(), EventSeverity::Warning);
        assert_eq!(started(1, "A").severity(), EventSeverity::Info);

        let paused = CoreEvent::Queue(QueueEvent::Paused {
            channel_id: 1,
            title: "A".to_string(),
        });
        assert_eq!(paused.severity(), EventSeverity::Debug);
    }

    #[test]
    fn test_event_description_and_channel() {
        let stalled = CoreEvent::Session(SessionEvent::Stalled {
            channel_id: 9,
            session_id: "s-9".to_string(),
            title: "A".to_string(),
            action: "advance".to_string(),
        });
        assert_eq!(stalled.description(), "Playback engine did not confirm stop");
        assert_eq!(stalled.channel_id(), 9);
    }

    #[test]
    fn test_event_serialization() {
        let event = CoreEvent::Queue(QueueEvent::TrackQueued {
            channel_id: 5,
            title: "Song".to_string(),
            position: Some(2),
        });

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"Queue""#));
        assert!(json.contains(r#""event":"TrackQueued""#));

        let deserialized: CoreEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, event);
    }

    #[tokio::test]
    async fn test_try_recv() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe());
        assert!(stream.try_recv().is_none());

        bus.emit(started(1, "A")).ok();
        let received = stream.try_recv().unwrap().unwrap();
        assert_eq!(received, started(1, "A"));
    }
}
