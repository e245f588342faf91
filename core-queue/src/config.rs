//! # Queue Configuration
//!
//! Timeouts and the stalled-engine policy used by the command gate.

use crate::error::{QueueError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What the gate does when the engine never confirms a requested stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StallAction {
    /// Treat the stop as confirmed and move on to the next track.
    #[default]
    Advance,
    /// Give up on the session: stop, leave the endpoint, discard the queue.
    Teardown,
}

impl StallAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            StallAction::Advance => "advance",
            StallAction::Teardown => "teardown",
        }
    }
}

/// Command gate configuration.
///
/// Every field has a serde default, so a partial TOML/JSON document is enough.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// How long a skip waits for the engine's completion signal before
    /// [`stall_action`](Self::stall_action) applies.
    ///
    /// `None` waits forever.
    ///
    /// Default: 10 seconds.
    #[serde(default = "default_stop_confirm_timeout")]
    pub stop_confirm_timeout: Option<Duration>,

    /// Policy applied when `stop_confirm_timeout` expires.
    ///
    /// Default: [`StallAction::Advance`].
    #[serde(default)]
    pub stall_action: StallAction,

    /// Bound on each engine call (`play`, `stop`, `pause`, `resume`, `leave`)
    /// made while a channel's exclusive section is held.
    ///
    /// Default: 5 seconds.
    #[serde(default = "default_engine_call_timeout")]
    pub engine_call_timeout: Duration,

    /// Bound on joining a voice endpoint.
    ///
    /// Default: 15 seconds.
    #[serde(default = "default_join_timeout")]
    pub join_timeout: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            stop_confirm_timeout: default_stop_confirm_timeout(),
            stall_action: StallAction::default(),
            engine_call_timeout: default_engine_call_timeout(),
            join_timeout: default_join_timeout(),
        }
    }
}

impl QueueConfig {
    /// Wait for stop confirmations indefinitely.
    pub fn without_stop_timeout(mut self) -> Self {
        self.stop_confirm_timeout = None;
        self
    }

    pub fn with_stop_timeout(mut self, timeout: Duration, action: StallAction) -> Self {
        self.stop_confirm_timeout = Some(timeout);
        self.stall_action = action;
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.stop_confirm_timeout == Some(Duration::ZERO) {
            return Err(QueueError::InvalidConfig(
                "stop_confirm_timeout must be > 0 (use None to wait forever)".to_string(),
            ));
        }

        if self.engine_call_timeout.is_zero() {
            return Err(QueueError::InvalidConfig(
                "engine_call_timeout must be > 0".to_string(),
            ));
        }

        if self.join_timeout.is_zero() {
            return Err(QueueError::InvalidConfig(
                "join_timeout must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

// ============================================================================
// Default Functions (for serde)
// ============================================================================

fn default_stop_confirm_timeout() -> Option<Duration> {
    Some(Duration::from_secs(10))
}

fn default_engine_call_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_join_timeout() -> Duration {
    Duration::from_secs(15)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = QueueConfig::default();
        assert_eq!(config.stop_confirm_timeout, Some(Duration::from_secs(10)));
        assert_eq!(config.stall_action, StallAction::Advance);
        assert_eq!(config.engine_call_timeout, Duration::from_secs(5));
        assert_eq!(config.join_timeout, Duration::from_secs(15));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let zero_stop = QueueConfig::default().with_stop_timeout(Duration::ZERO, StallAction::Advance);
        assert!(zero_stop.validate().is_err());

        let zero_engine = QueueConfig {
            engine_call_timeout: Duration::ZERO,
            ..Default::default()
        };
        assert!(zero_engine.validate().is_err());

        assert!(QueueConfig::default().without_stop_timeout().validate().is_ok());
    }

    #[test]
    fn test_partial_document_uses_defaults() {
        let config: QueueConfig = serde_json::from_str(r#"{"stall_action":"teardown"}"#).unwrap();
        assert_eq!(config.stall_action, StallAction::Teardown);
        assert_eq!(config.stop_confirm_timeout, Some(Duration::from_secs(10)));
        assert_eq!(config.join_timeout, Duration::from_secs(15));
    }
}
