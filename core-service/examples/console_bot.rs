//! Drive the jukebox from a terminal.
//!
//! Each stdin line is one chat command (`play https://media.example/watch?v=abc`,
//! `list`, `skip`, `pause`, `resume`, `remove 2`). Notices are printed to
//! stdout. Tracks "play" for a few seconds and then finish on their own.
//!
//! ```text
//! JUKEBOX_LOG=debug cargo run -p core-service --example console_bot
//! ```

use anyhow::Context;
use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{
    AudioSourceResolver, ChannelId, ChatNotifier, CompletionHandle, Notice, Track, TrackEnd,
    VoiceChannelId, VoiceConnection, VoiceGateway,
};
use core_queue::QueueConfig;
use core_runtime::config::CoreConfig;
use core_runtime::logging::{init_logging, LoggingConfig};
use core_service::{CommandContext, JukeboxService};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::oneshot;

const TRACK_LENGTH: Duration = Duration::from_secs(8);

struct UrlResolver;

#[async_trait]
impl AudioSourceResolver for UrlResolver {
    async fn resolve(&self, reference: &str) -> BridgeResult<Option<Track>> {
        let id = reference
            .split_once("v=")
            .map(|(_, rest)| rest.split('&').next().unwrap_or_default())
            .filter(|id| !id.is_empty());
        Ok(id.map(|id| Track::new(format!("Video {id}"), reference.to_string())))
    }
}

struct StdoutNotifier;

#[async_trait]
impl ChatNotifier for StdoutNotifier {
    async fn notify(&self, channel: ChannelId, notice: Notice) -> BridgeResult<()> {
        match notice.description() {
            Some(body) => println!("[#{channel}] {} {}", notice.title(), body.trim_end()),
            None => println!("[#{channel}] {}", notice.title()),
        }
        Ok(())
    }
}

struct TimerGateway;

#[async_trait]
impl VoiceGateway for TimerGateway {
    async fn join(&self, channel: VoiceChannelId) -> BridgeResult<Box<dyn VoiceConnection>> {
        Ok(Box::new(TimerConnection {
            channel,
            stop: Mutex::new(None),
        }))
    }
}

/// Finishes every track after `TRACK_LENGTH`; `stop` ends it early.
struct TimerConnection {
    channel: VoiceChannelId,
    stop: Mutex<Option<oneshot::Sender<()>>>,
}

#[async_trait]
impl VoiceConnection for TimerConnection {
    fn channel(&self) -> VoiceChannelId {
        self.channel
    }

    async fn play(&self, _track: &Track, completion: CompletionHandle) -> BridgeResult<()> {
        let (stop_tx, stop_rx) = oneshot::channel();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(TRACK_LENGTH) => completion.notify(TrackEnd::Finished),
                _ = stop_rx => completion.notify(TrackEnd::Stopped),
            }
        });
        *self.stop.lock() = Some(stop_tx);
        Ok(())
    }

    async fn stop(&self) -> BridgeResult<()> {
        if let Some(stop) = self.stop.lock().take() {
            let _ = stop.send(());
        }
        Ok(())
    }

    async fn pause(&self) -> BridgeResult<()> {
        Ok(())
    }

    async fn resume(&self) -> BridgeResult<()> {
        Ok(())
    }

    async fn leave(&self) -> BridgeResult<()> {
        self.stop().await
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::from_env()?).context("failed to initialize logging")?;

    let config = CoreConfig::builder()
        .source_resolver(Arc::new(UrlResolver))
        .voice_gateway(Arc::new(TimerGateway))
        .chat_notifier(Arc::new(StdoutNotifier))
        .build()?;
    let service = JukeboxService::new(config, QueueConfig::default())?;
    let ctx = CommandContext::new(ChannelId(1)).with_voice_channel(VoiceChannelId(2));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            continue;
        };
        let args: Vec<&str> = words.collect();
        service.handle(ctx, name, &args).await;
    }

    service.shutdown().await;
    Ok(())
}
