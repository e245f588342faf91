//! Shared fakes for the command gate integration tests.
//!
//! `FakeVoice` plays the role of both the voice gateway and the playback
//! engine. It records every call, keeps the completion handle of each started
//! track so tests can report track ends by hand, and can be told to fail
//! joins or specific tracks.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::{
    ChannelId, CompletionHandle, Track, TrackEnd, VoiceChannelId, VoiceConnection, VoiceGateway,
};
use core_queue::{CommandGate, QueueConfig};
use core_runtime::events::{CoreEvent, EventBus, QueueEvent, Receiver, SessionEvent};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const TEXT: ChannelId = ChannelId(100);
pub const VOICE: VoiceChannelId = VoiceChannelId(900);

#[derive(Default)]
struct VoiceState {
    joins: Mutex<Vec<VoiceChannelId>>,
    calls: Mutex<Vec<String>>,
    handles: Mutex<Vec<(String, CompletionHandle)>>,
    failing_tracks: Mutex<HashSet<String>>,
    join_delay: Mutex<Option<Duration>>,
    play_delay: Mutex<Option<Duration>>,
    reject_joins: AtomicBool,
    fail_pauses: AtomicBool,
    confirm_stops: AtomicBool,
}

#[derive(Clone, Default)]
pub struct FakeVoice {
    state: Arc<VoiceState>,
}

impl FakeVoice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject_joins(&self, reject: bool) {
        self.state.reject_joins.store(reject, Ordering::SeqCst);
    }

    pub fn set_join_delay(&self, delay: Duration) {
        *self.state.join_delay.lock() = Some(delay);
    }

    /// Make every `play` call take `delay` before returning.
    pub fn set_play_delay(&self, delay: Duration) {
        *self.state.play_delay.lock() = Some(delay);
    }

    pub fn fail_pauses(&self, fail: bool) {
        self.state.fail_pauses.store(fail, Ordering::SeqCst);
    }

    /// Make `stop` report `TrackEnd::Stopped` for the latest track right away.
    pub fn confirm_stops(&self, confirm: bool) {
        self.state.confirm_stops.store(confirm, Ordering::SeqCst);
    }

    pub fn fail_track(&self, title: &str) {
        self.state.failing_tracks.lock().insert(title.to_string());
    }

    pub fn join_count(&self) -> usize {
        self.state.joins.lock().len()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.calls.lock().clone()
    }

    pub fn count_calls(&self, name: &str) -> usize {
        self.state.calls.lock().iter().filter(|c| *c == name).count()
    }

    /// Remove and return the completion handle of the track `title`,
    /// waiting up to five seconds for the engine worker to start it.
    pub async fn take_handle(&self, title: &str) -> CompletionHandle {
        let wait = async {
            loop {
                {
                    let mut handles = self.state.handles.lock();
                    if let Some(index) = handles.iter().position(|(t, _)| t == title) {
                        return handles.remove(index).1;
                    }
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        };
        tokio::time::timeout(Duration::from_secs(5), wait)
            .await
            .unwrap_or_else(|_| panic!("no pending handle for {title}"))
    }

    pub async fn finish(&self, title: &str) {
        self.take_handle(title).await.notify(TrackEnd::Finished);
    }

    /// Wait until `name` has been called `count` times.
    pub async fn wait_for_calls(&self, name: &str, count: usize) {
        let wait = async {
            while self.count_calls(name) < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        };
        tokio::time::timeout(Duration::from_secs(5), wait)
            .await
            .unwrap_or_else(|_| panic!("{name} was not called {count} times"));
    }

    pub fn gate(&self, events: &EventBus, config: QueueConfig) -> CommandGate {
        CommandGate::new(Arc::new(self.clone()), events.clone(), config).unwrap()
    }

    fn record(&self, call: impl Into<String>) {
        self.state.calls.lock().push(call.into());
    }
}

#[async_trait]
impl VoiceGateway for FakeVoice {
    async fn join(&self, channel: VoiceChannelId) -> BridgeResult<Box<dyn VoiceConnection>> {
        let delay = *self.state.join_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.state.joins.lock().push(channel);
        if self.state.reject_joins.load(Ordering::SeqCst) {
            return Err(BridgeError::JoinRejected("missing connect permission".into()));
        }

        Ok(Box::new(FakeConnection {
            voice: self.clone(),
            channel,
        }))
    }
}

struct FakeConnection {
    voice: FakeVoice,
    channel: VoiceChannelId,
}

#[async_trait]
impl VoiceConnection for FakeConnection {
    fn channel(&self) -> VoiceChannelId {
        self.channel
    }

    async fn play(&self, track: &Track, completion: CompletionHandle) -> BridgeResult<()> {
        let delay = *self.voice.state.play_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.voice.record(format!("play:{}", track.title()));
        if self.voice.state.failing_tracks.lock().contains(track.title()) {
            return Err(BridgeError::OperationFailed("unsupported stream".into()));
        }
        self.voice
            .state
            .handles
            .lock()
            .push((track.title().to_string(), completion));
        Ok(())
    }

    async fn stop(&self) -> BridgeResult<()> {
        self.voice.record("stop");
        if self.voice.state.confirm_stops.load(Ordering::SeqCst) {
            let latest = self.voice.state.handles.lock().pop();
            if let Some((_, handle)) = latest {
                handle.notify(TrackEnd::Stopped);
            }
        }
        Ok(())
    }

    async fn pause(&self) -> BridgeResult<()> {
        self.voice.record("pause");
        if self.voice.state.fail_pauses.load(Ordering::SeqCst) {
            return Err(BridgeError::OperationFailed("stream is not pausable".into()));
        }
        Ok(())
    }

    async fn resume(&self) -> BridgeResult<()> {
        self.voice.record("resume");
        Ok(())
    }

    async fn leave(&self) -> BridgeResult<()> {
        self.voice.record("leave");
        Ok(())
    }
}

pub fn track(title: &str) -> Track {
    Track::new(title, format!("https://media.example/{title}"))
}

pub fn titles(tracks: &[Track]) -> Vec<&str> {
    tracks.iter().map(Track::title).collect()
}

/// Receive events until one matches `predicate`, failing after five seconds.
pub async fn wait_for<F>(events: &mut Receiver<CoreEvent>, mut predicate: F) -> CoreEvent
where
    F: FnMut(&CoreEvent) -> bool,
{
    let deadline = Duration::from_secs(5);
    tokio::time::timeout(deadline, async {
        loop {
            match events.recv().await {
                Ok(event) if predicate(&event) => return event,
                Ok(_) => continue,
                Err(err) => panic!("event stream failed: {err}"),
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

pub async fn wait_for_start(events: &mut Receiver<CoreEvent>, title: &str) {
    wait_for(events, |event| {
        matches!(event, CoreEvent::Queue(QueueEvent::TrackStarted { title: t, .. }) if t == title)
    })
    .await;
}

pub async fn wait_for_teardown(events: &mut Receiver<CoreEvent>) -> String {
    match wait_for(events, |event| {
        matches!(event, CoreEvent::Session(SessionEvent::TornDown { .. }))
    })
    .await
    {
        CoreEvent::Session(SessionEvent::TornDown { reason, .. }) => reason,
        other => unreachable!("{other:?}"),
    }
}

/// Drain whatever is already buffered.
pub fn drain(events: &mut Receiver<CoreEvent>) -> Vec<CoreEvent> {
    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    seen
}
