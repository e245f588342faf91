//! Jukebox service façade.
//!
//! This crate wires the host-provided bridges (source resolver, voice
//! gateway, chat notifier) into the playback queue core and exposes the chat
//! command surface. Hosts parse nothing themselves: they forward the command
//! name and arguments to [`JukeboxService::handle`] together with the
//! [`CommandContext`] of the message.
//!
//! Errors never leave the service. Input problems become user-facing
//! [`Notice`]s (or are dropped silently, matching the command's contract);
//! everything else is logged.

pub mod command;
pub mod error;
pub mod relay;

pub use command::ChatCommand;
pub use error::{CoreError, Result};
pub use relay::NotificationRelay;

use bridge_traits::{ChannelId, Notice, VoiceChannelId};
use core_queue::{CommandGate, QueueConfig, QueueError};
use core_runtime::config::CoreConfig;
use core_runtime::events::EventBus;
use core_runtime::logging::redact_reference;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where a command came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandContext {
    /// Text channel the command was typed in. Sessions are keyed by it.
    pub channel: ChannelId,
    /// Voice channel the requester is connected to, if any.
    pub voice_channel: Option<VoiceChannelId>,
}

impl CommandContext {
    pub fn new(channel: ChannelId) -> Self {
        Self {
            channel,
            voice_channel: None,
        }
    }

    pub fn with_voice_channel(mut self, voice_channel: VoiceChannelId) -> Self {
        self.voice_channel = Some(voice_channel);
        self
    }
}

/// Primary façade exposed to host applications.
pub struct JukeboxService {
    config: CoreConfig,
    gate: Arc<CommandGate>,
    events: EventBus,
    relay: Mutex<Option<NotificationRelay>>,
}

impl JukeboxService {
    /// Create the service and start the notification relay.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: CoreConfig, queue_config: QueueConfig) -> Result<Self> {
        config.validate()?;

        let events = EventBus::new(config.event_buffer_size);
        let gate = CommandGate::new(config.voice_gateway.clone(), events.clone(), queue_config)
            .map_err(|err| CoreError::InitializationFailed(err.to_string()))?;

        let relay = config
            .features
            .announce_transitions
            .then(|| NotificationRelay::spawn(&events, config.chat_notifier.clone()));

        info!(
            announce_transitions = config.features.announce_transitions,
            reply_on_invalid_input = config.features.reply_on_invalid_input,
            "jukebox service started"
        );

        Ok(Self {
            config,
            gate: Arc::new(gate),
            events,
            relay: Mutex::new(relay),
        })
    }

    pub fn gate(&self) -> &Arc<CommandGate> {
        &self.gate
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Parse and run a chat command, delivering any direct reply to the
    /// channel it came from.
    pub async fn handle(&self, ctx: CommandContext, name: &str, args: &[&str]) {
        let command = match ChatCommand::parse(name, args) {
            Ok(command) => command,
            Err(err) => {
                debug!(channel = %ctx.channel, command = name, error = %err, "ignoring command");
                return;
            }
        };

        if let Some(reply) = self.dispatch(ctx, command).await {
            if let Err(err) = self.config.chat_notifier.notify(ctx.channel, reply).await {
                warn!(channel = %ctx.channel, error = %err, "failed to deliver reply");
            }
        }
    }

    /// Run a parsed command and return the direct reply, if any.
    ///
    /// Queue transitions (added, now playing, skipped...) are not replies;
    /// the notification relay announces them.
    pub async fn dispatch(&self, ctx: CommandContext, command: ChatCommand) -> Option<Notice> {
        match command {
            ChatCommand::Play { reference } => self.play(ctx, reference).await,
            ChatCommand::List => {
                let snapshot = self.gate.snapshot(ctx.channel).await?;
                Some(Notice::Playlist {
                    current: snapshot.current.map(|track| track.title().to_string()),
                    playing: snapshot.playing,
                    queue: snapshot
                        .queue
                        .iter()
                        .map(|track| track.title().to_string())
                        .collect(),
                })
            }
            ChatCommand::Skip => {
                self.gate.skip(ctx.channel).await;
                None
            }
            ChatCommand::Pause => {
                self.gate.pause(ctx.channel).await;
                None
            }
            ChatCommand::Resume => {
                self.gate.resume(ctx.channel).await;
                None
            }
            ChatCommand::Remove { argument } => self.remove(ctx, argument).await,
        }
    }

    /// Tear down every session and stop the relay.
    pub async fn shutdown(&self) {
        self.gate.shutdown().await;

        let relay = self.relay.lock().take();
        if let Some(relay) = relay {
            relay.stop().await;
        }
        info!("jukebox service stopped");
    }

    async fn play(&self, ctx: CommandContext, reference: String) -> Option<Notice> {
        let redacted = redact_reference(&reference);

        // Resolution can be slow; it happens before the channel is locked.
        let track = match self.config.source_resolver.resolve(&reference).await {
            Ok(Some(track)) => track,
            Ok(None) => {
                debug!(channel = %ctx.channel, reference = %redacted, "nothing playable found");
                return Some(Notice::SourceNotFound { reference });
            }
            Err(err) => {
                warn!(channel = %ctx.channel, reference = %redacted, error = %err, "source resolution failed");
                return Some(Notice::SourceNotFound { reference });
            }
        };

        match self.gate.enqueue(ctx.channel, ctx.voice_channel, track).await {
            Ok(_) => None,
            Err(err) => self.enqueue_failure(ctx, err),
        }
    }

    fn enqueue_failure(&self, ctx: CommandContext, err: QueueError) -> Option<Notice> {
        if err.is_input_error() {
            return Some(Notice::NotInVoiceChannel);
        }

        warn!(channel = %ctx.channel, error = %err, "could not enqueue track");
        match &err {
            QueueError::JoinFailed(source) => Some(Notice::JoinFailed {
                reason: source.to_string(),
            }),
            QueueError::JoinTimedOut(_) => Some(Notice::JoinFailed {
                reason: err.to_string(),
            }),
            _ => None,
        }
    }

    async fn remove(&self, ctx: CommandContext, argument: String) -> Option<Notice> {
        match command::queue_index(&argument) {
            Ok(Some(index)) => {
                self.gate.remove(ctx.channel, index).await;
                None
            }
            Ok(None) => None,
            Err(_) if self.config.features.reply_on_invalid_input => {
                Some(Notice::InvalidArgument {
                    command: "remove".to_string(),
                    argument,
                })
            }
            Err(_) => None,
        }
    }
}

impl std::fmt::Debug for JukeboxService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JukeboxService")
            .field("gate", &self.gate)
            .field("relay_running", &self.relay.lock().is_some())
            .finish()
    }
}
