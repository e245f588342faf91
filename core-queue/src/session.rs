//! Per-channel playback session.
//!
//! A [`Session`] owns the queue manager, the call queue of its engine worker
//! and the sending half of the channel's signal queue. Every method runs while
//! the channel's exclusive section is held and none of them waits on the
//! engine; the session itself has no locking.
//!
//! Completion reports from the engine and stop-watchdog expiries arrive as
//! [`SessionSignal`]s tagged with the playback generation they belong to.
//! Only a signal for the generation the session is awaiting is applied, so a
//! late or repeated report can never advance the queue twice.

use crate::config::{QueueConfig, StallAction};
use crate::engine::{run_engine, EngineCall};
use crate::manager::{Advance, EngineCommand, Placement, QueueManager, QueueSnapshot};
use bridge_traits::{ChannelId, Track, TrackEnd, VoiceChannelId, VoiceConnection};
use core_runtime::events::{CoreEvent, EventBus, QueueEvent, SessionEvent};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Message delivered to a session's signal pump.
#[derive(Debug)]
pub(crate) enum SessionSignal {
    /// The engine accepted the track started as `generation`.
    Started { generation: u64 },
    /// The engine stopped the track started as `generation`.
    TrackEnded { generation: u64, end: TrackEnd },
    /// A stop requested for `generation` was not confirmed in time.
    StopTimedOut { generation: u64 },
    PauseFailed { generation: u64 },
    ResumeFailed { generation: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TeardownReason {
    Drained,
    Stalled,
    Shutdown,
}

impl TeardownReason {
    fn as_str(&self) -> &'static str {
        match self {
            TeardownReason::Drained => "drained",
            TeardownReason::Stalled => "stalled",
            TeardownReason::Shutdown => "shutdown",
        }
    }
}

pub(crate) struct Session {
    id: Uuid,
    channel: ChannelId,
    voice_channel: VoiceChannelId,
    manager: QueueManager,
    engine: mpsc::UnboundedSender<EngineCall>,
    engine_worker: JoinHandle<()>,
    signals: mpsc::UnboundedSender<SessionSignal>,
    /// Incremented for every track handed to the engine.
    generation: u64,
    /// Generation whose completion signal is still outstanding.
    awaiting: Option<u64>,
    watchdog: Option<JoinHandle<()>>,
    config: QueueConfig,
    events: EventBus,
    cancel: CancellationToken,
}

impl Session {
    /// Create a session and start its engine worker.
    pub(crate) fn new(
        channel: ChannelId,
        connection: Box<dyn VoiceConnection>,
        signals: mpsc::UnboundedSender<SessionSignal>,
        config: QueueConfig,
        events: EventBus,
        cancel: CancellationToken,
    ) -> Self {
        let voice_channel = connection.channel();
        let (engine, calls) = mpsc::unbounded_channel();
        let engine_worker = tokio::spawn(run_engine(
            channel,
            connection,
            calls,
            signals.clone(),
            config.engine_call_timeout,
            cancel.clone(),
        ));

        Self {
            id: Uuid::new_v4(),
            channel,
            voice_channel,
            manager: QueueManager::new(),
            engine,
            engine_worker,
            signals,
            generation: 0,
            awaiting: None,
            watchdog: None,
            config,
            events,
            cancel,
        }
    }

    pub(crate) fn id(&self) -> Uuid {
        self.id
    }

    pub(crate) fn snapshot(&self) -> QueueSnapshot {
        self.manager.snapshot()
    }

    pub(crate) fn announce_created(&self) {
        info!(
            channel = %self.channel,
            session_id = %self.id,
            voice_channel = %self.voice_channel,
            "session created"
        );
        self.emit(CoreEvent::Session(SessionEvent::Created {
            channel_id: self.channel.0,
            session_id: self.id.to_string(),
            voice_channel_id: self.voice_channel.0,
        }));
    }

    pub(crate) fn enqueue(&mut self, track: Track) -> Placement {
        let title = track.title().to_string();
        let (placement, command) = self.manager.enqueue(track);
        debug!(channel = %self.channel, %title, ?placement, "track enqueued");

        self.emit(CoreEvent::Queue(QueueEvent::TrackQueued {
            channel_id: self.channel.0,
            title,
            position: placement.position(),
        }));

        if let Some(EngineCommand::Start(track)) = command {
            self.start(track);
        }
        placement
    }

    pub(crate) fn skip(&mut self) -> bool {
        let already_requested = self.manager.slot().stop_requested();
        if self.manager.skip().is_none() {
            return false;
        }

        self.emit(CoreEvent::Queue(QueueEvent::SkipRequested {
            channel_id: self.channel.0,
            title: self.current_title(),
        }));

        let Some(generation) = self.awaiting else {
            return true;
        };
        if !already_requested {
            self.arm_watchdog(generation);
        }
        self.call(EngineCall::Stop {
            generation: Some(generation),
        });
        true
    }

    pub(crate) fn pause(&mut self) -> bool {
        if self.manager.pause().is_none() {
            return false;
        }
        debug!(channel = %self.channel, status = self.manager.slot().status().as_str(), "playback paused");

        self.call(EngineCall::Pause {
            generation: self.generation,
        });
        self.emit(CoreEvent::Queue(QueueEvent::Paused {
            channel_id: self.channel.0,
            title: self.current_title(),
        }));
        true
    }

    pub(crate) fn resume(&mut self) -> bool {
        if self.manager.resume().is_none() {
            return false;
        }
        debug!(channel = %self.channel, status = self.manager.slot().status().as_str(), "playback resumed");

        self.call(EngineCall::Resume {
            generation: self.generation,
        });
        self.emit(CoreEvent::Queue(QueueEvent::Resumed {
            channel_id: self.channel.0,
            title: self.current_title(),
        }));
        true
    }

    pub(crate) fn remove(&mut self, index: usize) -> Option<Track> {
        let removed = self.manager.remove(index)?;
        debug!(channel = %self.channel, index, title = %removed.title(), "track removed");
        self.emit(CoreEvent::Queue(QueueEvent::TrackRemoved {
            channel_id: self.channel.0,
            title: removed.title().to_string(),
            position: index + 1,
        }));
        Some(removed)
    }

    /// Apply a signal. Returns a reason when the session must be torn down.
    pub(crate) fn apply(&mut self, signal: SessionSignal) -> Option<TeardownReason> {
        match signal {
            SessionSignal::Started { generation } => {
                if self.awaiting == Some(generation) {
                    let title = self.current_title();
                    info!(channel = %self.channel, %title, generation, "track started");
                    self.emit(CoreEvent::Queue(QueueEvent::TrackStarted {
                        channel_id: self.channel.0,
                        title,
                    }));
                }
                None
            }
            SessionSignal::TrackEnded { generation, end } => {
                if self.awaiting != Some(generation) {
                    debug!(
                        channel = %self.channel,
                        generation,
                        end = end.as_str(),
                        "ignoring stale completion signal"
                    );
                    return None;
                }
                self.finish_current(&end);
                self.advance()
            }
            SessionSignal::StopTimedOut { generation } => {
                if self.awaiting != Some(generation) {
                    return None;
                }

                let action = self.config.stall_action;
                let title = self.current_title();
                warn!(
                    channel = %self.channel,
                    %title,
                    action = action.as_str(),
                    "engine did not confirm stop in time"
                );
                self.emit(CoreEvent::Session(SessionEvent::Stalled {
                    channel_id: self.channel.0,
                    session_id: self.id.to_string(),
                    title,
                    action: action.as_str().to_string(),
                }));

                match action {
                    StallAction::Advance => {
                        self.settle();
                        self.advance()
                    }
                    StallAction::Teardown => Some(TeardownReason::Stalled),
                }
            }
            SessionSignal::PauseFailed { generation } => {
                if generation == self.generation && self.manager.resume().is_some() {
                    warn!(channel = %self.channel, status = self.manager.slot().status().as_str(), "pause reverted");
                }
                None
            }
            SessionSignal::ResumeFailed { generation } => {
                if generation == self.generation && self.manager.pause().is_some() {
                    warn!(channel = %self.channel, status = self.manager.slot().status().as_str(), "resume reverted");
                }
                None
            }
        }
    }

    /// Stop playback if needed and release the voice endpoint.
    ///
    /// Consumes the session, so the endpoint is left exactly once. Returns
    /// after the engine worker has drained its queue.
    pub(crate) async fn teardown(mut self, reason: TeardownReason) {
        self.settle();
        self.cancel.cancel();

        if !self.manager.slot().is_idle() {
            self.call(EngineCall::Stop { generation: None });
        }
        self.call(EngineCall::Leave);

        let Session {
            id,
            channel,
            engine,
            engine_worker,
            events,
            ..
        } = self;
        drop(engine);
        if let Err(err) = engine_worker.await {
            warn!(%channel, error = %err, "engine worker failed");
        }

        info!(
            %channel,
            session_id = %id,
            reason = reason.as_str(),
            "session torn down"
        );
        events
            .emit(CoreEvent::Session(SessionEvent::TornDown {
                channel_id: channel.0,
                session_id: id.to_string(),
                reason: reason.as_str().to_string(),
            }))
            .ok();
    }

    fn start(&mut self, track: Track) {
        self.generation += 1;
        let generation = self.generation;
        self.awaiting = Some(generation);

        debug!(channel = %self.channel, title = %track.title(), generation, "starting track");
        self.call(EngineCall::Play { generation, track });
    }

    fn advance(&mut self) -> Option<TeardownReason> {
        match self.manager.advance() {
            Advance::Next { next, .. } => {
                self.start(next);
                None
            }
            Advance::Drained { .. } => Some(TeardownReason::Drained),
        }
    }

    fn finish_current(&mut self, end: &TrackEnd) {
        self.settle();
        let title = self.current_title();
        debug!(channel = %self.channel, %title, end = end.as_str(), "track ended");

        self.emit(CoreEvent::Queue(QueueEvent::TrackEnded {
            channel_id: self.channel.0,
            title: title.clone(),
            reason: end.as_str().to_string(),
        }));

        let failure = match end {
            TrackEnd::Failed(reason) => Some(reason.clone()),
            TrackEnd::Abandoned => Some("playback engine dropped the track".to_string()),
            TrackEnd::Finished | TrackEnd::Stopped => None,
        };
        if let Some(reason) = failure {
            self.emit(CoreEvent::Queue(QueueEvent::PlaybackFailed {
                channel_id: self.channel.0,
                title,
                reason,
            }));
        }
    }

    /// Stop waiting on the current generation.
    fn settle(&mut self) {
        self.awaiting = None;
        if let Some(watchdog) = self.watchdog.take() {
            watchdog.abort();
        }
    }

    fn arm_watchdog(&mut self, generation: u64) {
        let Some(limit) = self.config.stop_confirm_timeout else {
            return;
        };
        if let Some(previous) = self.watchdog.take() {
            previous.abort();
        }

        let signals = self.signals.clone();
        let cancel = self.cancel.clone();
        self.watchdog = Some(tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(limit) => {
                    let _ = signals.send(SessionSignal::StopTimedOut { generation });
                }
            }
        }));
    }

    /// Queue a call for the engine worker.
    fn call(&self, call: EngineCall) {
        if let Err(err) = self.engine.send(call) {
            warn!(channel = %self.channel, call = ?err.0, "engine worker is gone");
        }
    }

    fn current_title(&self) -> String {
        self.manager
            .slot()
            .current()
            .map(|track| track.title().to_string())
            .unwrap_or_default()
    }

    fn emit(&self, event: CoreEvent) {
        self.events.emit(event).ok();
    }
}
