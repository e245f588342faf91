//! # Host Bridge Traits
//!
//! Contracts between the playback queue core and the collaborators the host
//! chat platform provides.
//!
//! ## Overview
//!
//! The core never talks to a chat platform, a media API or an audio engine
//! directly. Each of those capabilities is described here as a trait; the host
//! ships concrete adapters and hands them to the core at startup.
//!
//! ## Traits
//!
//! ### Media
//! - [`AudioSourceResolver`](source::AudioSourceResolver) - Turn a user-supplied
//!   reference into a validated [`Track`](source::Track)
//!
//! ### Voice
//! - [`VoiceGateway`](voice::VoiceGateway) - Join a voice-capable channel
//! - [`VoiceConnection`](voice::VoiceConnection) - Start/stop/pause/resume
//!   playback on a joined endpoint and leave it again
//!
//! ### Chat
//! - [`ChatNotifier`](chat::ChatNotifier) - Deliver outbound [`Notice`](chat::Notice)s
//!
//! ### Utilities
//! - [`LoggerSink`](log::LoggerSink) - Forward structured logs to host logging
//!
//! ## Completion Signal
//!
//! Playback engines run on their own execution context. When a track stops,
//! naturally or on request, the engine reports it through the
//! [`CompletionHandle`](voice::CompletionHandle) it received with the track.
//! The handle only enqueues a signal; it never touches queue state itself.
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Adapters should
//! convert platform errors into it and keep messages short enough to be shown
//! in a chat notice.
//!
//! ## Thread Safety
//!
//! Every trait requires `Send + Sync` so adapters can be shared across the
//! tasks serving concurrent commands.
//!
//! ## Example
//!
//! ```ignore
//! use bridge_traits::source::{AudioSourceResolver, Track};
//! use bridge_traits::error::Result;
//! use async_trait::async_trait;
//!
//! pub struct StaticResolver;
//!
//! #[async_trait]
//! impl AudioSourceResolver for StaticResolver {
//!     async fn resolve(&self, reference: &str) -> Result<Option<Track>> {
//!         Ok(Some(Track::new(reference, reference)))
//!     }
//! }
//! ```

pub mod chat;
pub mod error;
pub mod log;
pub mod source;
pub mod voice;

pub use error::BridgeError;

// Re-export commonly used types
pub use chat::{ChannelId, ChatNotifier, Notice};
pub use log::{LogEntry, LogLevel, LoggerSink, StderrLogger};
pub use source::{AudioSourceResolver, Track};
pub use voice::{CompletionHandle, TrackEnd, VoiceChannelId, VoiceConnection, VoiceGateway};
