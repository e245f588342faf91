//! # Core Configuration Module
//!
//! Provides configuration management for the jukebox core.
//!
//! ## Overview
//!
//! A `CoreConfig` bundles the host bridges the core cannot run without and
//! the runtime settings shared by every crate. It is built through
//! [`CoreConfig::builder`], which fails fast with an actionable message when
//! a required bridge is missing.
//!
//! ## Required Dependencies
//!
//! - `AudioSourceResolver` - turns user references into tracks
//! - `VoiceGateway` - joins voice channels and drives the playback engine
//! - `ChatNotifier` - delivers outbound notices
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .source_resolver(Arc::new(MyResolver))
//!     .voice_gateway(Arc::new(MyGateway))
//!     .chat_notifier(Arc::new(MyNotifier))
//!     .event_buffer_size(256)
//!     .build()?;
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::CoreConfig;
//!
//! // No bridges were injected
//! let config = CoreConfig::builder()
//!     .build()
//!     .expect("Should fail - missing required bridges");
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{AudioSourceResolver, ChatNotifier, VoiceGateway};
use std::sync::Arc;

/// Upper bound for the event buffer; larger values only hide a stuck subscriber.
const MAX_EVENT_BUFFER_SIZE: usize = 65_536;

/// Core configuration for the jukebox.
#[derive(Clone)]
pub struct CoreConfig {
    /// Resolves user-supplied references into tracks (required)
    pub source_resolver: Arc<dyn AudioSourceResolver>,

    /// Joins voice channels and controls playback (required)
    pub voice_gateway: Arc<dyn VoiceGateway>,

    /// Delivers notices to chat channels (required)
    pub chat_notifier: Arc<dyn ChatNotifier>,

    /// Capacity of the event bus per subscriber
    pub event_buffer_size: usize,

    /// Features flags
    pub features: FeatureFlags,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("source_resolver", &"AudioSourceResolver { ... }")
            .field("voice_gateway", &"VoiceGateway { ... }")
            .field("chat_notifier", &"ChatNotifier { ... }")
            .field("event_buffer_size", &self.event_buffer_size)
            .field("features", &self.features)
            .finish()
    }
}

/// Feature flags control optional chat behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureFlags {
    /// Announce queue transitions (added, now playing, skipped...) in chat
    pub announce_transitions: bool,

    /// Reply with a notice when a command argument cannot be parsed
    pub reply_on_invalid_input: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            announce_transitions: true,
            reply_on_invalid_input: true,
        }
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if self.event_buffer_size > MAX_EVENT_BUFFER_SIZE {
            return Err(Error::Config(format!(
                "Event buffer size exceeds maximum of {}",
                MAX_EVENT_BUFFER_SIZE
            )));
        }

        Ok(())
    }
}

fn capability_missing(capability: &str, message: &str) -> Error {
    Error::CapabilityMissing {
        capability: capability.to_string(),
        message: message.to_string(),
    }
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    source_resolver: Option<Arc<dyn AudioSourceResolver>>,
    voice_gateway: Option<Arc<dyn VoiceGateway>>,
    chat_notifier: Option<Arc<dyn ChatNotifier>>,
    event_buffer_size: Option<usize>,
    features: FeatureFlags,
}

impl CoreConfigBuilder {
    pub fn source_resolver(mut self, resolver: Arc<dyn AudioSourceResolver>) -> Self {
        self.source_resolver = Some(resolver);
        self
    }

    pub fn voice_gateway(mut self, gateway: Arc<dyn VoiceGateway>) -> Self {
        self.voice_gateway = Some(gateway);
        self
    }

    pub fn chat_notifier(mut self, notifier: Arc<dyn ChatNotifier>) -> Self {
        self.chat_notifier = Some(notifier);
        self
    }

    /// Sets the event bus capacity.
    ///
    /// Default: [`DEFAULT_EVENT_BUFFER_SIZE`]
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Enables or disables transition announcements.
    ///
    /// Default: true
    pub fn announce_transitions(mut self, enabled: bool) -> Self {
        self.features.announce_transitions = enabled;
        self
    }

    /// Enables or disables replies to malformed arguments.
    ///
    /// Default: true
    pub fn reply_on_invalid_input(mut self, enabled: bool) -> Self {
        self.features.reply_on_invalid_input = enabled;
        self
    }

    pub fn features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// # Errors
    ///
    /// - `Error::CapabilityMissing` if a required bridge was not injected
    /// - `Error::Config` if a setting is out of range
    pub fn build(self) -> Result<CoreConfig> {
        let source_resolver = self.source_resolver.ok_or_else(|| {
            capability_missing(
                "AudioSourceResolver",
                "An AudioSourceResolver is required to turn play requests into tracks. \
                 Inject the adapter for your media API with .source_resolver().",
            )
        })?;

        let voice_gateway = self.voice_gateway.ok_or_else(|| {
            capability_missing(
                "VoiceGateway",
                "A VoiceGateway is required to join voice channels and drive playback. \
                 Inject the chat platform's voice adapter with .voice_gateway().",
            )
        })?;

        let chat_notifier = self.chat_notifier.ok_or_else(|| {
            capability_missing(
                "ChatNotifier",
                "A ChatNotifier is required to answer commands. \
                 Inject the chat platform's message adapter with .chat_notifier().",
            )
        })?;

        let config = CoreConfig {
            source_resolver,
            voice_gateway,
            chat_notifier,
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            features: self.features,
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::{ChannelId, Notice, Track, VoiceChannelId, VoiceConnection};
    use mockall::mock;

    mock! {
        Resolver {}
        #[async_trait]
        impl AudioSourceResolver for Resolver {
            async fn resolve(&self, reference: &str) -> BridgeResult<Option<Track>>;
        }
    }

    mock! {
        Gateway {}
        #[async_trait]
        impl VoiceGateway for Gateway {
            async fn join(&self, channel: VoiceChannelId) -> BridgeResult<Box<dyn VoiceConnection>>;
        }
    }

    mock! {
        Notifier {}
        #[async_trait]
        impl ChatNotifier for Notifier {
            async fn notify(&self, channel: ChannelId, notice: Notice) -> BridgeResult<()>;
        }
    }

    fn full_builder() -> CoreConfigBuilder {
        CoreConfig::builder()
            .source_resolver(Arc::new(MockResolver::new()))
            .voice_gateway(Arc::new(MockGateway::new()))
            .chat_notifier(Arc::new(MockNotifier::new()))
    }

    #[test]
    fn test_builder_with_all_bridges() {
        let config = full_builder().build().unwrap();
        assert_eq!(config.event_buffer_size, DEFAULT_EVENT_BUFFER_SIZE);
        assert_eq!(config.features, FeatureFlags::default());
        assert!(config.features.announce_transitions);
    }

    #[test]
    fn test_missing_resolver_is_reported() {
        let err = CoreConfig::builder()
            .voice_gateway(Arc::new(MockGateway::new()))
            .chat_notifier(Arc::new(MockNotifier::new()))
            .build()
            .unwrap_err();

        match err {
            Error::CapabilityMissing { capability, .. } => {
                assert_eq!(capability, "AudioSourceResolver")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_gateway_is_reported() {
        let err = CoreConfig::builder()
            .source_resolver(Arc::new(MockResolver::new()))
            .chat_notifier(Arc::new(MockNotifier::new()))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("VoiceGateway"));
    }

    #[test]
    fn test_missing_notifier_is_reported() {
        let err = CoreConfig::builder()
            .source_resolver(Arc::new(MockResolver::new()))
            .voice_gateway(Arc::new(MockGateway::new()))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("ChatNotifier"));
    }

    #[test]
    fn test_event_buffer_bounds() {
        assert!(matches!(
            full_builder().event_buffer_size(0).build(),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            full_builder()
                .event_buffer_size(MAX_EVENT_BUFFER_SIZE + 1)
                .build(),
            Err(Error::Config(_))
        ));
        assert_eq!(
            full_builder()
                .event_buffer_size(16)
                .build()
                .unwrap()
                .event_buffer_size,
            16
        );
    }

    #[test]
    fn test_feature_toggles() {
        let config = full_builder()
            .announce_transitions(false)
            .reply_on_invalid_input(false)
            .build()
            .unwrap();
        assert!(!config.features.announce_transitions);
        assert!(!config.features.reply_on_invalid_input);
    }

    #[test]
    fn test_debug_hides_bridges() {
        let config = full_builder().build().unwrap();
        let rendered = format!("{:?}", config);
        assert!(rendered.contains("VoiceGateway { ... }"));
        assert!(rendered.contains("event_buffer_size"));
    }
}
