//! # Queue Error Types
//!
//! Errors surfaced by the command gate. Queue operations themselves never
//! fail: out-of-range removals and commands without a session are no-ops.
//! Only creating a session can go wrong.

use bridge_traits::BridgeError;
use thiserror::Error;

/// Errors that can occur while handling a queue command.
#[derive(Error, Debug)]
pub enum QueueError {
    // ========================================================================
    // Input Errors
    // ========================================================================
    /// The first enqueue of a channel needs the requester's voice channel.
    #[error("Requester is not in a voice channel")]
    NotInVoiceChannel,

    // ========================================================================
    // Resource Errors
    // ========================================================================
    /// Joining the voice endpoint failed.
    #[error("Failed to join voice channel: {0}")]
    JoinFailed(#[source] BridgeError),

    /// Joining the voice endpoint did not finish in time.
    #[error("Timed out joining voice channel after {0:?}")]
    JoinTimedOut(std::time::Duration),

    /// The gate was shut down and accepts no new sessions.
    #[error("Command gate is shut down")]
    ShutDown,

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// A `QueueConfig` value is out of range.
    #[error("Invalid queue configuration: {0}")]
    InvalidConfig(String),
}

impl QueueError {
    /// Returns `true` if the user can fix this by changing the request.
    pub fn is_input_error(&self) -> bool {
        matches!(self, QueueError::NotInVoiceChannel)
    }

    /// Returns `true` if an external resource (endpoint, engine) failed.
    pub fn is_resource_error(&self) -> bool {
        matches!(
            self,
            QueueError::JoinFailed(_) | QueueError::JoinTimedOut(_) | QueueError::ShutDown
        )
    }
}

/// Result type for queue operations.
pub type Result<T> = std::result::Result<T, QueueError>;
