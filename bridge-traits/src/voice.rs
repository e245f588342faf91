//! Voice endpoint and playback engine traits.
//!
//! A [`VoiceGateway`] joins voice-capable channels and hands back a
//! [`VoiceConnection`]. The connection is both the audio output endpoint and
//! the control surface of the host's playback engine: it starts, stops,
//! pauses and resumes tracks, and reports when a track has stopped through a
//! [`CompletionHandle`].

use crate::{error::Result, source::Track};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a voice-capable channel on the chat platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VoiceChannelId(pub u64);

impl fmt::Display for VoiceChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why the engine stopped playing a track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackEnd {
    /// Reached the end of the stream.
    Finished,
    /// Stopped because the core asked for it (skip).
    Stopped,
    /// Playback failed part-way or could not start.
    Failed(String),
    /// The engine dropped its completion handle without reporting.
    Abandoned,
}

impl TrackEnd {
    /// Short label used in logs and events.
    pub fn as_str(&self) -> &str {
        match self {
            TrackEnd::Finished => "finished",
            TrackEnd::Stopped => "stopped",
            TrackEnd::Failed(_) => "failed",
            TrackEnd::Abandoned => "abandoned",
        }
    }
}

type Reporter = Box<dyn FnOnce(TrackEnd) + Send + 'static>;

/// One-shot channel from the playback engine back into the core.
///
/// The engine receives one handle per started track and calls
/// [`notify`](CompletionHandle::notify) from whatever thread it runs on.
/// Reporting only enqueues a signal; the core applies it later inside the
/// channel's exclusive section.
///
/// A handle that is dropped without being notified reports
/// [`TrackEnd::Abandoned`], so an engine that loses a playback cannot leave
/// the queue waiting forever.
pub struct CompletionHandle {
    reporter: Option<Reporter>,
}

impl CompletionHandle {
    /// Wrap the function the core uses to enqueue the signal.
    pub fn new<F>(reporter: F) -> Self
    where
        F: FnOnce(TrackEnd) + Send + 'static,
    {
        Self {
            reporter: Some(Box::new(reporter)),
        }
    }

    /// Report that the track has stopped.
    pub fn notify(mut self, end: TrackEnd) {
        if let Some(reporter) = self.reporter.take() {
            reporter(end);
        }
    }
}

impl Drop for CompletionHandle {
    fn drop(&mut self) {
        if let Some(reporter) = self.reporter.take() {
            reporter(TrackEnd::Abandoned);
        }
    }
}

impl fmt::Debug for CompletionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionHandle")
            .field("pending", &self.reporter.is_some())
            .finish()
    }
}

/// A joined audio output endpoint.
///
/// # Contract
///
/// - `play` starts `track` and keeps `completion` until the track stops.
///   Exactly one report per started track is expected; extra reports are
///   ignored by the core.
/// - `stop` is a request. The engine confirms through the completion handle
///   of the track it stopped.
/// - `leave` releases the endpoint. The core calls it at most once.
#[async_trait::async_trait]
pub trait VoiceConnection: Send + Sync {
    /// Channel this connection is joined to.
    fn channel(&self) -> VoiceChannelId;

    /// Start playing `track`, replacing whatever was playing.
    async fn play(&self, track: &Track, completion: CompletionHandle) -> Result<()>;

    /// Ask the engine to stop the current track.
    async fn stop(&self) -> Result<()>;

    /// Pause the current track.
    async fn pause(&self) -> Result<()>;

    /// Resume the paused track.
    async fn resume(&self) -> Result<()>;

    /// Disconnect from the voice channel.
    async fn leave(&self) -> Result<()>;
}

/// Joins voice channels.
#[async_trait::async_trait]
pub trait VoiceGateway: Send + Sync {
    /// Join `channel` and return a connection bound to it.
    async fn join(&self, channel: VoiceChannelId) -> Result<Box<dyn VoiceConnection>>;
}
