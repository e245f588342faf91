//! Outbound chat notifications.
//!
//! The core reports what happened to the queue as typed [`Notice`]s. Hosts
//! decide how to style them (embeds, colors, markdown); [`Notice::title`]
//! and [`Notice::description`] give a plain-text rendering that hosts can use
//! as-is.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::Write as _;

/// Identifier of the text channel a command came from. Sessions are keyed by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelId(pub u64);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A message the core wants delivered to a chat channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "notice", rename_all = "snake_case")]
pub enum Notice {
    /// A track was appended. `position` is the 1-based queue position, or
    /// `None` when the track started playing right away.
    TrackAdded { title: String, position: Option<usize> },
    /// A track became the current one.
    NowPlaying { title: String },
    /// The current track was asked to stop.
    Skipped { title: String },
    /// Playback paused.
    Paused,
    /// Playback resumed.
    Resumed,
    /// A queued track was removed.
    Removed { title: String },
    /// Rendering of the current track and the pending queue.
    Playlist {
        current: Option<String>,
        playing: bool,
        queue: Vec<String>,
    },
    /// The engine could not play a track; the queue moves on.
    PlaybackFailed { title: String, reason: String },
    /// A command argument could not be parsed.
    InvalidArgument { command: String, argument: String },
    /// The resolver found nothing playable behind a reference.
    SourceNotFound { reference: String },
    /// The requester must be in a voice channel to start a session.
    NotInVoiceChannel,
    /// The voice endpoint could not be joined.
    JoinFailed { reason: String },
}

impl Notice {
    /// Heading line of the notice.
    pub fn title(&self) -> &'static str {
        match self {
            Notice::TrackAdded { .. } => "Added song:",
            Notice::NowPlaying { .. } => "Now playing:",
            Notice::Skipped { .. } => "Skipped song:",
            Notice::Paused => "Paused Player",
            Notice::Resumed => "Resumed Player",
            Notice::Removed { .. } => "Removed Song",
            Notice::Playlist { .. } => "Playlist",
            Notice::PlaybackFailed { .. } => "Playback failed:",
            Notice::InvalidArgument { .. } => "Invalid argument",
            Notice::SourceNotFound { .. } => "Song not found",
            Notice::NotInVoiceChannel => "Join a voice channel first",
            Notice::JoinFailed { .. } => "Could not join voice channel",
        }
    }

    /// Body of the notice, if it has one.
    pub fn description(&self) -> Option<String> {
        match self {
            Notice::TrackAdded { title, .. }
            | Notice::NowPlaying { title }
            | Notice::Skipped { title }
            | Notice::Removed { title } => Some(title.clone()),
            Notice::Paused | Notice::Resumed | Notice::NotInVoiceChannel => None,
            Notice::Playlist {
                current,
                playing,
                queue,
            } => Some(render_playlist(current.as_deref(), *playing, queue)),
            Notice::PlaybackFailed { title, reason } => Some(format!("{title} ({reason})")),
            Notice::InvalidArgument { command, argument } => {
                Some(format!("`{argument}` is not a valid argument for {command}"))
            }
            Notice::SourceNotFound { reference } => Some(reference.clone()),
            Notice::JoinFailed { reason } => Some(reason.clone()),
        }
    }

    /// Whether this notice reports a problem with the user's request.
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Notice::PlaybackFailed { .. }
                | Notice::InvalidArgument { .. }
                | Notice::SourceNotFound { .. }
                | Notice::NotInVoiceChannel
                | Notice::JoinFailed { .. }
        )
    }
}

fn render_playlist(current: Option<&str>, playing: bool, queue: &[String]) -> String {
    let mut out = String::new();
    match current {
        Some(title) if playing => {
            let _ = writeln!(out, "Playing: {title}");
        }
        _ => out.push_str("Player in pause\n"),
    }
    out.push_str("Songs in queue:\n");
    for (index, title) in queue.iter().enumerate() {
        let _ = writeln!(out, "{} - {}", index + 1, title);
    }
    out
}

/// Delivers notices to the chat platform.
#[async_trait::async_trait]
pub trait ChatNotifier: Send + Sync {
    /// Send `notice` to `channel`.
    async fn notify(&self, channel: ChannelId, notice: Notice) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn playlist_rendering_while_playing() {
        let notice = Notice::Playlist {
            current: Some("A".to_string()),
            playing: true,
            queue: vec!["B".to_string(), "C".to_string()],
        };
        assert_eq!(notice.title(), "Playlist");
        assert_eq!(
            notice.description().unwrap(),
            "Playing: A\nSongs in queue:\n1 - B\n2 - C\n"
        );
    }

    #[test]
    fn playlist_rendering_while_paused() {
        let notice = Notice::Playlist {
            current: Some("A".to_string()),
            playing: false,
            queue: Vec::new(),
        };
        assert_eq!(
            notice.description().unwrap(),
            "Player in pause\nSongs in queue:\n"
        );
    }

    #[test]
    fn simple_notices() {
        assert_eq!(Notice::Paused.title(), "Paused Player");
        assert!(Notice::Paused.description().is_none());
        let added = Notice::TrackAdded {
            title: "Song".to_string(),
            position: Some(2),
        };
        assert_eq!(added.title(), "Added song:");
        assert_eq!(added.description().as_deref(), Some("Song"));
        assert!(!added.is_error());
        assert!(Notice::NotInVoiceChannel.is_error());
    }

    #[test]
    fn notice_serialization_is_tagged() {
        let json = serde_json::to_string(&Notice::Resumed).unwrap();
        assert_eq!(json, r#"{"notice":"resumed"}"#);
    }
}
