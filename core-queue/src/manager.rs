//! # Playback Queue Manager
//!
//! Pure state machine over a channel's queue and playback slot.
//!
//! The manager never talks to the playback engine. Each operation mutates
//! state and returns the [`EngineCommand`] the caller must issue, so every
//! transition can be exercised without a runtime:
//!
//! ```text
//! Idle ──enqueue on empty queue──> Playing
//! Playing ──skip──> Playing (stop issued, waits for the completion signal)
//! Playing ──pause──> Paused ──resume──> Playing
//! Playing ──advance, queue non-empty──> Playing (next track)
//! Playing ──advance, queue empty──> Idle
//! ```
//!
//! `advance` is the only way a queued track becomes current after the first
//! promotion. It is driven by the completion signal, never by a command.

use crate::slot::{PlaybackSlot, PlaybackStatus};
use bridge_traits::Track;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Side effect the caller must apply to the playback engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCommand {
    Start(Track),
    Stop,
    Pause,
    Resume,
}

/// Where an enqueued track ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Placement {
    /// The track was promoted straight into the playback slot.
    NowPlaying,
    /// The track waits in the queue at this 1-based position.
    Queued { position: usize },
}

impl Placement {
    /// 1-based queue position, `None` when the track is playing.
    pub fn position(&self) -> Option<usize> {
        match self {
            Placement::NowPlaying => None,
            Placement::Queued { position } => Some(*position),
        }
    }
}

/// Outcome of [`QueueManager::advance`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// `next` was popped from the head of the queue and must be started.
    Next {
        previous: Option<Track>,
        next: Track,
    },
    /// The queue is empty; the slot is idle and the session should end.
    Drained { previous: Option<Track> },
}

/// Read-only copy of a channel's queue state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub current: Option<Track>,
    pub playing: bool,
    pub queue: Vec<Track>,
}

/// Queue plus playback slot of one channel.
#[derive(Debug, Default)]
pub struct QueueManager {
    queue: VecDeque<Track>,
    slot: PlaybackSlot,
}

impl QueueManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slot(&self) -> &PlaybackSlot {
        &self.slot
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// True when nothing is playing and nothing is waiting.
    pub fn is_drained(&self) -> bool {
        self.queue.is_empty() && self.slot.is_idle()
    }

    /// Append `track`. On an empty queue with an idle slot the track is
    /// promoted immediately and a start command is returned.
    pub fn enqueue(&mut self, track: Track) -> (Placement, Option<EngineCommand>) {
        if self.is_drained() {
            self.slot.load(track.clone());
            return (Placement::NowPlaying, Some(EngineCommand::Start(track)));
        }

        self.queue.push_back(track);
        (
            Placement::Queued {
                position: self.queue.len(),
            },
            None,
        )
    }

    /// Move the head of the queue into the slot, or idle the slot when the
    /// queue is empty.
    pub fn advance(&mut self) -> Advance {
        let previous = self.slot.clear();
        match self.queue.pop_front() {
            Some(next) => {
                self.slot.load(next.clone());
                Advance::Next { previous, next }
            }
            None => Advance::Drained { previous },
        }
    }

    /// Request a stop of the current track. The slot is left untouched; the
    /// completion signal drives the actual transition.
    pub fn skip(&mut self) -> Option<EngineCommand> {
        if self.slot.is_idle() {
            return None;
        }
        self.slot.stop_requested = true;
        Some(EngineCommand::Stop)
    }

    pub fn pause(&mut self) -> Option<EngineCommand> {
        if self.slot.status != PlaybackStatus::Playing {
            return None;
        }
        self.slot.status = PlaybackStatus::Paused;
        Some(EngineCommand::Pause)
    }

    pub fn resume(&mut self) -> Option<EngineCommand> {
        if self.slot.status != PlaybackStatus::Paused {
            return None;
        }
        self.slot.status = PlaybackStatus::Playing;
        Some(EngineCommand::Resume)
    }

    /// Remove the queued track at 0-based `index`. The current track is not
    /// part of the queue and cannot be removed this way.
    pub fn remove(&mut self, index: usize) -> Option<Track> {
        self.queue.remove(index)
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            current: self.slot.current.clone(),
            playing: self.slot.status == PlaybackStatus::Playing,
            queue: self.queue.iter().cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(title: &str) -> Track {
        Track::new(title, format!("ref://{title}"))
    }

    fn titles(snapshot: &QueueSnapshot) -> Vec<&str> {
        snapshot.queue.iter().map(Track::title).collect()
    }

    #[test]
    fn first_enqueue_is_promoted_and_never_queued() {
        let mut manager = QueueManager::new();

        let (placement, command) = manager.enqueue(track("A"));
        assert_eq!(placement, Placement::NowPlaying);
        assert_eq!(command, Some(EngineCommand::Start(track("A"))));

        let (placement, command) = manager.enqueue(track("B"));
        assert_eq!(placement, Placement::Queued { position: 1 });
        assert!(command.is_none());

        let snapshot = manager.snapshot();
        assert_eq!(snapshot.current, Some(track("A")));
        assert!(snapshot.playing);
        assert_eq!(titles(&snapshot), vec!["B"]);
    }

    #[test]
    fn duplicate_titles_are_accepted() {
        let mut manager = QueueManager::new();
        manager.enqueue(track("A"));
        manager.enqueue(track("A"));
        let (placement, _) = manager.enqueue(track("A"));
        assert_eq!(placement.position(), Some(2));
    }

    #[test]
    fn scenario_remove_then_drain() {
        let mut manager = QueueManager::new();
        for title in ["A", "B", "C"] {
            manager.enqueue(track(title));
        }

        assert_eq!(manager.remove(0), Some(track("B")));
        let snapshot = manager.snapshot();
        assert_eq!(snapshot.current, Some(track("A")));
        assert_eq!(titles(&snapshot), vec!["C"]);

        assert_eq!(
            manager.advance(),
            Advance::Next {
                previous: Some(track("A")),
                next: track("C"),
            }
        );
        assert_eq!(manager.queue_len(), 0);

        assert_eq!(
            manager.advance(),
            Advance::Drained {
                previous: Some(track("C"))
            }
        );
        assert!(manager.is_drained());
        assert_eq!(manager.slot().status(), PlaybackStatus::Idle);
        assert!(manager.slot().current().is_none());
    }

    #[test]
    fn remove_shifts_later_items_and_ignores_out_of_range() {
        let mut manager = QueueManager::new();
        for title in ["now", "q0", "q1", "q2", "q3"] {
            manager.enqueue(track(title));
        }

        assert_eq!(manager.remove(1), Some(track("q1")));
        assert_eq!(titles(&manager.snapshot()), vec!["q0", "q2", "q3"]);

        assert_eq!(manager.remove(3), None);
        assert_eq!(manager.remove(usize::MAX), None);
        assert_eq!(titles(&manager.snapshot()), vec!["q0", "q2", "q3"]);
        assert_eq!(manager.snapshot().current, Some(track("now")));
    }

    #[test]
    fn skip_requests_stop_without_advancing() {
        let mut manager = QueueManager::new();
        assert_eq!(manager.skip(), None);

        manager.enqueue(track("A"));
        manager.enqueue(track("B"));
        assert_eq!(manager.skip(), Some(EngineCommand::Stop));
        assert!(manager.slot().stop_requested());

        let snapshot = manager.snapshot();
        assert_eq!(snapshot.current, Some(track("A")));
        assert_eq!(titles(&snapshot), vec!["B"]);

        manager.advance();
        assert!(!manager.slot().stop_requested());
    }

    #[test]
    fn pause_and_resume_only_apply_from_the_right_status() {
        let mut manager = QueueManager::new();
        assert_eq!(manager.pause(), None);
        assert_eq!(manager.resume(), None);

        manager.enqueue(track("A"));
        assert_eq!(manager.resume(), None);
        assert_eq!(manager.pause(), Some(EngineCommand::Pause));
        assert_eq!(manager.pause(), None);
        assert_eq!(manager.slot().status(), PlaybackStatus::Paused);
        assert_eq!(manager.slot().status().as_str(), "paused");
        assert!(!manager.snapshot().playing);

        assert_eq!(manager.resume(), Some(EngineCommand::Resume));
        assert_eq!(manager.resume(), None);
        assert_eq!(manager.slot().status(), PlaybackStatus::Playing);
        assert_eq!(manager.slot().status().as_str(), "playing");
    }

    #[test]
    fn skip_applies_while_paused() {
        let mut manager = QueueManager::new();
        manager.enqueue(track("A"));
        manager.pause();
        assert_eq!(manager.skip(), Some(EngineCommand::Stop));
    }

    #[test]
    fn enqueue_after_drain_promotes_again() {
        let mut manager = QueueManager::new();
        manager.enqueue(track("A"));
        manager.advance();

        let (placement, command) = manager.enqueue(track("B"));
        assert_eq!(placement, Placement::NowPlaying);
        assert_eq!(command, Some(EngineCommand::Start(track("B"))));
    }
}
