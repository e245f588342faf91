//! Notification relay.
//!
//! Queue transitions are published on the [`EventBus`] from inside a
//! channel's exclusive section. The relay subscribes to the bus and turns
//! them into chat [`Notice`]s on its own task, so a slow chat platform never
//! holds up the queue.

use bridge_traits::{ChannelId, ChatNotifier, Notice};
use core_runtime::events::{CoreEvent, EventBus, EventStream, QueueEvent, RecvError};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Map a core event to the notice announcing it, if any.
pub fn notice_for(event: &CoreEvent) -> Option<(ChannelId, Notice)> {
    let CoreEvent::Queue(event) = event else {
        return None;
    };

    let notice = match event {
        QueueEvent::TrackQueued {
            title, position, ..
        } => Notice::TrackAdded {
            title: title.clone(),
            position: *position,
        },
        QueueEvent::TrackStarted { title, .. } => Notice::NowPlaying {
            title: title.clone(),
        },
        QueueEvent::SkipRequested { title, .. } => Notice::Skipped {
            title: title.clone(),
        },
        QueueEvent::Paused { .. } => Notice::Paused,
        QueueEvent::Resumed { .. } => Notice::Resumed,
        QueueEvent::TrackRemoved { title, .. } => Notice::Removed {
            title: title.clone(),
        },
        QueueEvent::PlaybackFailed { title, reason, .. } => Notice::PlaybackFailed {
            title: title.clone(),
            reason: reason.clone(),
        },
        QueueEvent::TrackEnded { .. } => return None,
    };

    Some((ChannelId(event_channel(event)), notice))
}

fn event_channel(event: &QueueEvent) -> u64 {
    match event {
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

/// Background task forwarding queue events to a [`ChatNotifier`].
pub struct NotificationRelay {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl NotificationRelay {
    /// Subscribe to `events` and start relaying.
    ///
    /// The subscription is taken before this returns, so every event emitted
    /// afterwards is announced. Must be called from within a Tokio runtime.
    pub fn spawn(events: &EventBus, notifier: Arc<dyn ChatNotifier>) -> Self {
        let stream = EventStream::new(events.subscribe())
            .filter(|event| matches!(event, CoreEvent::Queue(_)));
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run(stream, notifier, cancel.clone()));
        Self { cancel, handle }
    }

    /// Stop the relay after it has delivered what is already buffered.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(err) = self.handle.await {
            warn!(error = %err, "notification relay task failed");
        }
    }
}

async fn run(mut stream: EventStream, notifier: Arc<dyn ChatNotifier>, cancel: CancellationToken) {
    loop {
        let event = tokio::select! {
            biased;
            received = stream.recv() => received,
            _ = cancel.cancelled() => break,
        };

        match event {
            Ok(event) => {
                let Some((channel, notice)) = notice_for(&event) else {
                    continue;
                };
                if let Err(err) = notifier.notify(channel, notice).await {
                    warn!(%channel, error = %err, "failed to deliver notice");
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "notification relay fell behind; notices dropped");
            }
            Err(RecvError::Closed) => break,
        }
    }
    debug!("notification relay stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_runtime::events::SessionEvent;

    #[test]
    fn queue_events_map_to_notices() {
        let (channel, notice) = notice_for(&CoreEvent::Queue(QueueEvent::TrackQueued {
            channel_id: 7,
            title: "Song".to_string(),
            position: Some(2),
        }))
        .unwrap();
        assert_eq!(channel, ChannelId(7));
        assert_eq!(
            notice,
            Notice::TrackAdded {
                title: "Song".to_string(),
                position: Some(2)
            }
        );

        let (_, notice) = notice_for(&CoreEvent::Queue(QueueEvent::Paused {
            channel_id: 7,
            title: "Song".to_string(),
        }))
        .unwrap();
        assert_eq!(notice, Notice::Paused);

        let (_, notice) = notice_for(&CoreEvent::Queue(QueueEvent::TrackRemoved {
            channel_id: 7,
            title: "Other".to_string(),
            position: 1,
        }))
        .unwrap();
        assert_eq!(
            notice,
            Notice::Removed {
                title: "Other".to_string()
            }
        );
    }

    #[test]
    fn silent_events() {
        assert!(notice_for(&CoreEvent::Queue(QueueEvent::TrackEnded {
            channel_id: 7,
            title: "Song".to_string(),
            reason: "finished".to_string(),
        }))
        .is_none());
        assert!(notice_for(&CoreEvent::Session(SessionEvent::TornDown {
            channel_id: 7,
            session_id: "s".to_string(),
            reason: "drained".to_string(),
        }))
        .is_none());
    }
}
