//! Per-session engine worker.
//!
//! Engine and endpoint calls can be slow, so a session never awaits them
//! inside the channel's exclusive section. It pushes [`EngineCall`]s onto an
//! ordered queue instead; one worker task per session drains the queue, owns
//! the [`VoiceConnection`] and reports outcomes back as [`SessionSignal`]s.

use crate::session::SessionSignal;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{BridgeError, ChannelId, CompletionHandle, Track, TrackEnd, VoiceConnection};
use std::future::Future;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// A call queued for the engine worker, applied in submission order.
#[derive(Debug)]
pub(crate) enum EngineCall {
    Play { generation: u64, track: Track },
    /// `generation` is `None` when stopping during teardown.
    Stop { generation: Option<u64> },
    Pause { generation: u64 },
    Resume { generation: u64 },
    Leave,
}

/// Drain `calls` until every sender is gone.
///
/// Completion reports are forwarded as signals until `cancel` fires; calls
/// already queued are still executed after that so teardown can stop and
/// leave.
pub(crate) async fn run_engine(
    channel: ChannelId,
    connection: Box<dyn VoiceConnection>,
    mut calls: mpsc::UnboundedReceiver<EngineCall>,
    signals: mpsc::UnboundedSender<SessionSignal>,
    limit: Duration,
    cancel: CancellationToken,
) {
    while let Some(call) = calls.recv().await {
        match call {
            EngineCall::Play { generation, track } => {
                let (report, reported) = oneshot::channel();
                let completion = CompletionHandle::new(move |end| {
                    let _ = report.send(end);
                });

                match bounded("play", limit, connection.play(&track, completion)).await {
                    Ok(()) => {
                        let _ = signals.send(SessionSignal::Started { generation });
                        tokio::spawn(forward_completion(
                            generation,
                            reported,
                            signals.clone(),
                            cancel.clone(),
                        ));
                    }
                    Err(err) => {
                        // Whatever the dropped handle reported is discarded
                        // with `reported`; the engine's error wins.
                        warn!(%channel, title = %track.title(), error = %err, "engine failed to start track");
                        let _ = signals.send(SessionSignal::TrackEnded {
                            generation,
                            end: TrackEnd::Failed(err.to_string()),
                        });
                    }
                }
            }
            EngineCall::Stop { generation } => {
                if let Err(err) = bounded("stop", limit, connection.stop()).await {
                    warn!(%channel, error = %err, "engine failed to stop track; treating it as stopped");
                    if let Some(generation) = generation {
                        let _ = signals.send(SessionSignal::TrackEnded {
                            generation,
                            end: TrackEnd::Stopped,
                        });
                    }
                }
            }
            EngineCall::Pause { generation } => {
                if let Err(err) = bounded("pause", limit, connection.pause()).await {
                    warn!(%channel, error = %err, "engine failed to pause");
                    let _ = signals.send(SessionSignal::PauseFailed { generation });
                }
            }
            EngineCall::Resume { generation } => {
                if let Err(err) = bounded("resume", limit, connection.resume()).await {
                    warn!(%channel, error = %err, "engine failed to resume");
                    let _ = signals.send(SessionSignal::ResumeFailed { generation });
                }
            }
            EngineCall::Leave => {
                if let Err(err) = bounded("leave", limit, connection.leave()).await {
                    warn!(%channel, error = %err, "failed to leave voice channel");
                }
            }
        }
    }
    debug!(%channel, "engine worker stopped");
}

async fn forward_completion(
    generation: u64,
    reported: oneshot::Receiver<TrackEnd>,
    signals: mpsc::UnboundedSender<SessionSignal>,
    cancel: CancellationToken,
) {
    tokio::select! {
        _ = cancel.cancelled() => {}
        end = reported => {
            if let Ok(end) = end {
                let _ = signals.send(SessionSignal::TrackEnded { generation, end });
            }
        }
    }
}

async fn bounded<F>(operation: &str, limit: Duration, call: F) -> BridgeResult<()>
where
    F: Future<Output = BridgeResult<()>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(BridgeError::TimedOut(format!(
            "{operation} did not return within {limit:?}"
        ))),
    }
}
