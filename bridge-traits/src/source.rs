//! Audio source resolution.
//!
//! Users enqueue music by pasting a reference (usually a video URL). The
//! host resolves it against its media API and either returns a validated
//! [`Track`] or reports that nothing playable was found.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An immutable playable item.
///
/// Fields are private so a track cannot change after it has been queued;
/// the queue and the playback slot share clones of the same value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Track {
    title: String,
    playable_ref: String,
}

impl Track {
    /// Create a track from its display title and the reference the playback
    /// engine understands (stream URL, media id, file path...).
    pub fn new(title: impl Into<String>, playable_ref: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            playable_ref: playable_ref.into(),
        }
    }

    /// Display title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Reference handed to the playback engine.
    pub fn playable_ref(&self) -> &str {
        &self.playable_ref
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

/// Resolves user-supplied references into playable tracks.
///
/// # Contract
///
/// - `Ok(Some(track))`: the reference points at something playable.
/// - `Ok(None)`: the reference is malformed, unknown or not playable. The
///   core treats this as an input error and never creates a session for it.
/// - `Err(_)`: the resolver itself failed (network, quota...).
///
/// Resolution may be slow; the core always calls it before entering a
/// channel's exclusive section.
#[async_trait::async_trait]
pub trait AudioSourceResolver: Send + Sync {
    /// Resolve `reference` into a track.
    async fn resolve(&self, reference: &str) -> Result<Option<Track>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_accessors() {
        let track = Track::new("Song", "https://media.example/watch?v=abc");
        assert_eq!(track.title(), "Song");
        assert_eq!(track.playable_ref(), "https://media.example/watch?v=abc");
        assert_eq!(track.to_string(), "Song");
    }

    #[test]
    fn duplicate_titles_are_distinct_values_only_by_reference() {
        let a = Track::new("Same", "ref-a");
        let b = Track::new("Same", "ref-b");
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn track_serializes_with_both_fields() {
        let json = serde_json::to_string(&Track::new("T", "r")).unwrap();
        assert!(json.contains("\"title\":\"T\""));
        assert!(json.contains("\"playable_ref\":\"r\""));
    }
}
