//! The single "now playing" slot of a channel.

use bridge_traits::Track;
use serde::{Deserialize, Serialize};

/// Playback status of the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlaybackStatus {
    #[default]
    Idle,
    Playing,
    Paused,
}

impl PlaybackStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackStatus::Idle => "idle",
            PlaybackStatus::Playing => "playing",
            PlaybackStatus::Paused => "paused",
        }
    }
}

/// Current track plus its status.
///
/// `current` is `None` exactly when `status` is [`PlaybackStatus::Idle`];
/// only [`QueueManager`](crate::QueueManager) mutates the slot, and it keeps
/// both fields in step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackSlot {
    pub(crate) current: Option<Track>,
    pub(crate) status: PlaybackStatus,
    /// A stop was issued for `current` and the engine has not confirmed it.
    pub(crate) stop_requested: bool,
}

impl PlaybackSlot {
    pub fn current(&self) -> Option<&Track> {
        self.current.as_ref()
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    pub fn is_idle(&self) -> bool {
        self.status == PlaybackStatus::Idle
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_requested
    }

    pub(crate) fn load(&mut self, track: Track) {
        self.current = Some(track);
        self.status = PlaybackStatus::Playing;
        self.stop_requested = false;
    }

    pub(crate) fn clear(&mut self) -> Option<Track> {
        self.status = PlaybackStatus::Idle;
        self.stop_requested = false;
        self.current.take()
    }
}
