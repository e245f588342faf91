//! # Command Gate
//!
//! Serializes every queue command and every completion signal of a chat
//! channel through one exclusive section.
//!
//! ## Overview
//!
//! Each channel gets a [`ChannelCell`] holding an async mutex over its
//! optional [`Session`]. The mutex is the exclusive section: it guards both
//! the session's existence and its state, so
//!
//! - two concurrent first enqueues cannot both join the voice endpoint,
//! - a skip and an engine completion report never interleave mid-transition,
//! - a snapshot never observes a half-applied command.
//!
//! Commands for a channel without a session are dropped, except `enqueue`,
//! which creates one. The engine never touches a session directly: its
//! reports are queued and applied by the session's signal pump, which takes
//! the same lock a command does.
//!
//! ## Usage
//!
//! ```ignore
//! use core_queue::{CommandGate, QueueConfig};
//!
//! let gate = CommandGate::new(gateway, event_bus, QueueConfig::default())?;
//! let placement = gate.enqueue(channel, Some(voice_channel), track).await?;
//! gate.skip(channel).await;
//! ```

use crate::config::QueueConfig;
use crate::error::{QueueError, Result};
use crate::manager::{Placement, QueueSnapshot};
use crate::session::{Session, SessionSignal, TeardownReason};
use bridge_traits::{ChannelId, Track, VoiceChannelId, VoiceGateway};
use core_runtime::events::EventBus;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Exclusive section of one chat channel.
///
/// Cells are created on the first enqueue and pruned once they hold no
/// session and nothing but the map references them. New references are only
/// handed out under the map lock, so a pruned cell can never be in use.
#[derive(Default)]
struct ChannelCell {
    session: AsyncMutex<Option<Session>>,
}

type CellMap = Arc<Mutex<HashMap<ChannelId, Arc<ChannelCell>>>>;

/// Per-channel command serialization and session lifecycle.
pub struct CommandGate {
    cells: CellMap,
    gateway: Arc<dyn VoiceGateway>,
    events: EventBus,
    config: QueueConfig,
    shutdown: CancellationToken,
}

impl CommandGate {
    /// Create a gate that joins voice channels through `gateway` and
    /// publishes transitions on `events`.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::InvalidConfig` if `config` fails validation.
    pub fn new(
        gateway: Arc<dyn VoiceGateway>,
        events: EventBus,
        config: QueueConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            cells: CellMap::default(),
            gateway,
            events,
            config,
            shutdown: CancellationToken::new(),
        })
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Append `track` to the channel's queue, creating the session first if
    /// the channel has none.
    ///
    /// Creating a session joins `voice_channel`. The join happens inside the
    /// exclusive section, so concurrent first enqueues produce one join and
    /// are then applied in lock order.
    ///
    /// # Errors
    ///
    /// - `QueueError::NotInVoiceChannel` if a session is needed and
    ///   `voice_channel` is `None`
    /// - `QueueError::JoinFailed` / `QueueError::JoinTimedOut` if the endpoint
    ///   could not be joined; no session is left behind
    /// - `QueueError::ShutDown` after [`shutdown`](Self::shutdown)
    #[instrument(skip(self, track), fields(channel = %channel, title = %track.title()))]
    pub async fn enqueue(
        &self,
        channel: ChannelId,
        voice_channel: Option<VoiceChannelId>,
        track: Track,
    ) -> Result<Placement> {
        let cell = self.cell(channel);
        let mut guard = cell.session.lock().await;

        if self.shutdown.is_cancelled() {
            return Err(QueueError::ShutDown);
        }

        let session = match guard.take() {
            Some(session) => session,
            None => match self.open_session(channel, voice_channel, &cell).await {
                Ok(session) => session,
                Err(err) => {
                    drop(guard);
                    drop(cell);
                    prune_cell(&self.cells, channel);
                    return Err(err);
                }
            },
        };

        Ok(guard.insert(session).enqueue(track))
    }

    /// Request a stop of the current track. Returns `false` when the channel
    /// has no session or nothing is playing.
    #[instrument(skip(self), fields(channel = %channel))]
    pub async fn skip(&self, channel: ChannelId) -> bool {
        let Some(cell) = self.existing_cell(channel) else {
            return false;
        };
        let mut guard = cell.session.lock().await;
        match guard.as_mut() {
            Some(session) => session.skip(),
            None => false,
        }
    }

    #[instrument(skip(self), fields(channel = %channel))]
    pub async fn pause(&self, channel: ChannelId) -> bool {
        let Some(cell) = self.existing_cell(channel) else {
            return false;
        };
        let mut guard = cell.session.lock().await;
        match guard.as_mut() {
            Some(session) => session.pause(),
            None => false,
        }
    }

    #[instrument(skip(self), fields(channel = %channel))]
    pub async fn resume(&self, channel: ChannelId) -> bool {
        let Some(cell) = self.existing_cell(channel) else {
            return false;
        };
        let mut guard = cell.session.lock().await;
        match guard.as_mut() {
            Some(session) => session.resume(),
            None => false,
        }
    }

    /// Remove the queued track at 0-based `index`.
    #[instrument(skip(self), fields(channel = %channel))]
    pub async fn remove(&self, channel: ChannelId, index: usize) -> Option<Track> {
        let cell = self.existing_cell(channel)?;
        let mut guard = cell.session.lock().await;
        guard.as_mut()?.remove(index)
    }

    /// Copy of the channel's queue state, or `None` without a session.
    pub async fn snapshot(&self, channel: ChannelId) -> Option<QueueSnapshot> {
        let cell = self.existing_cell(channel)?;
        let guard = cell.session.lock().await;
        guard.as_ref().map(Session::snapshot)
    }

    pub async fn has_session(&self, channel: ChannelId) -> bool {
        match self.existing_cell(channel) {
            Some(cell) => cell.session.lock().await.is_some(),
            None => false,
        }
    }

    /// Channels that currently have a live session, in ascending order.
    pub async fn active_sessions(&self) -> Vec<ChannelId> {
        let mut active = Vec::new();
        for (channel, cell) in self.all_cells() {
            if cell.session.lock().await.is_some() {
                active.push(channel);
            }
        }
        active
    }

    /// Tear down every session and refuse new ones.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();

        let mut closed = 0usize;
        for (channel, cell) in self.all_cells() {
            let mut guard = cell.session.lock().await;
            if let Some(session) = guard.take() {
                session.teardown(TeardownReason::Shutdown).await;
                closed += 1;
            }
            drop(guard);
            drop(cell);
            prune_cell(&self.cells, channel);
        }
        info!(sessions = closed, "command gate shut down");
    }

    /// Number of channels currently holding an exclusive section.
    pub fn tracked_channels(&self) -> usize {
        self.cells.lock().len()
    }

    async fn open_session(
        &self,
        channel: ChannelId,
        voice_channel: Option<VoiceChannelId>,
        cell: &Arc<ChannelCell>,
    ) -> Result<Session> {
        let voice_channel = voice_channel.ok_or(QueueError::NotInVoiceChannel)?;

        let limit = self.config.join_timeout;
        let connection = match tokio::time::timeout(limit, self.gateway.join(voice_channel)).await
        {
            Ok(Ok(connection)) => connection,
            Ok(Err(err)) => {
                warn!(%voice_channel, error = %err, "failed to join voice channel");
                return Err(QueueError::JoinFailed(err));
            }
            Err(_) => {
                warn!(%voice_channel, "timed out joining voice channel");
                return Err(QueueError::JoinTimedOut(limit));
            }
        };

        let (signals, receiver) = mpsc::unbounded_channel();
        let cancel = self.shutdown.child_token();
        let session = Session::new(
            channel,
            connection,
            signals,
            self.config.clone(),
            self.events.clone(),
            cancel.clone(),
        );
        session.announce_created();

        tokio::spawn(run_signal_pump(
            Arc::clone(&self.cells),
            Arc::clone(cell),
            channel,
            session.id(),
            receiver,
            cancel,
        ));

        Ok(session)
    }

    fn cell(&self, channel: ChannelId) -> Arc<ChannelCell> {
        let mut cells = self.cells.lock();
        Arc::clone(cells.entry(channel).or_default())
    }

    fn existing_cell(&self, channel: ChannelId) -> Option<Arc<ChannelCell>> {
        self.cells.lock().get(&channel).cloned()
    }

    fn all_cells(&self) -> Vec<(ChannelId, Arc<ChannelCell>)> {
        let mut cells: Vec<_> = self
            .cells
            .lock()
            .iter()
            .map(|(channel, cell)| (*channel, Arc::clone(cell)))
            .collect();
        cells.sort_by_key(|(channel, _)| *channel);
        cells
    }
}

impl std::fmt::Debug for CommandGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandGate")
            .field("channels", &self.cells.lock().len())
            .field("config", &self.config)
            .field("shut_down", &self.shutdown.is_cancelled())
            .finish()
    }
}

/// Drop the cell of `channel` if it is idle and unreferenced.
fn prune_cell(cells: &CellMap, channel: ChannelId) {
    let mut cells = cells.lock();
    let idle = cells.get(&channel).is_some_and(|cell| {
        Arc::strong_count(cell) == 1
            && cell
                .session
                .try_lock()
                .is_ok_and(|session| session.is_none())
    });
    if idle {
        cells.remove(&channel);
        debug!(%channel, "channel cell pruned");
    }
}

/// Applies one session's signals inside the channel's exclusive section
/// until the session ends.
async fn run_signal_pump(
    cells: CellMap,
    cell: Arc<ChannelCell>,
    channel: ChannelId,
    session_id: Uuid,
    mut receiver: mpsc::UnboundedReceiver<SessionSignal>,
    cancel: CancellationToken,
) {
    loop {
        let signal = tokio::select! {
            _ = cancel.cancelled() => break,
            signal = receiver.recv() => match signal {
                Some(signal) => signal,
                None => break,
            },
        };

        let mut guard = cell.session.lock().await;
        let Some(session) = guard.as_mut().filter(|session| session.id() == session_id) else {
            break;
        };

        if let Some(reason) = session.apply(signal) {
            if let Some(session) = guard.take() {
                session.teardown(reason).await;
            }
            drop(guard);
            drop(cell);
            prune_cell(&cells, channel);
            debug!(%channel, %session_id, "signal pump stopped");
            return;
        }
    }
    debug!(%channel, %session_id, "signal pump stopped");
}
