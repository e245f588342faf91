//! # Playback Queue Module
//!
//! Per-channel playback queues for a chat bot.
//!
//! ## Overview
//!
//! This module handles:
//! - The queue and "now playing" slot of a channel ([`QueueManager`])
//! - Serialization of concurrent commands per channel ([`CommandGate`])
//! - Session lifecycle: join on first enqueue, leave once the queue drains
//! - Completion signals from the host playback engine, applied in the same
//!   exclusive section as commands
//! - A per-session engine worker, so no command waits on the engine
//! - A bounded wait on stop confirmations with a configurable stall policy
//!
//! Audio decoding and streaming are left to the host engine behind
//! [`bridge_traits::VoiceConnection`].

pub mod config;
mod engine;
pub mod error;
pub mod gate;
pub mod manager;
mod session;
pub mod slot;

pub use config::{QueueConfig, StallAction};
pub use error::{QueueError, Result};
pub use gate::CommandGate;
pub use manager::{Advance, EngineCommand, Placement, QueueManager, QueueSnapshot};
pub use slot::{PlaybackSlot, PlaybackStatus};
