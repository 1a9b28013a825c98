//! Session driver - the polling loop
//!
//! One tokio task per session ticks the pipeline every `tick_interval` while
//! the session is calibrating or tracking, and exits as soon as it is not.
//! Late ticks are skipped, never bunched up.

use legday_core::{LegDayError, LegDayResult, SessionPhase, TickTime};
use legday_signal::PipelineConfig;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::{FrameSource, RepSession, SessionStats, SessionStatus, SharedSession};

/// Starts polling loops for rep sessions
#[derive(Clone, Debug)]
pub struct SessionDriver {
    config: PipelineConfig,
}

impl SessionDriver {
    pub fn new(config: PipelineConfig) -> LegDayResult<Self> {
        config.validate()?;
        Ok(SessionDriver { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Start calibrating and spawn the polling loop. Must be called from
    /// within a tokio runtime.
    ///
    /// The source is owned by the loop and dropped when it ends.
    pub fn start<S>(&self, source: S) -> LegDayResult<SessionHandle>
    where
        S: FrameSource + 'static,
    {
        let mut session = RepSession::new(self.config.clone())?;

        let (done_tx, done_rx) = oneshot::channel();
        session.on_complete(move || {
            let _ = done_tx.send(());
        });
        session.start_calibration(TickTime::ZERO)?;

        let shared = SharedSession::new(session);
        let (status_tx, status_rx) = watch::channel(shared.status());
        let (cancel_tx, cancel_rx) = oneshot::channel();

        let task = tokio::spawn(run_loop(
            shared.clone(),
            source,
            self.config.tick_interval,
            status_tx,
            cancel_rx,
        ));

        Ok(SessionHandle {
            shared,
            status_rx,
            cancel_tx: Some(cancel_tx),
            completion: Some(done_rx),
            task: Some(task),
        })
    }
}

async fn run_loop<S: FrameSource>(
    shared: SharedSession,
    mut source: S,
    period: std::time::Duration,
    status_tx: watch::Sender<SessionStatus>,
    mut cancel_rx: oneshot::Receiver<()>,
) -> SessionPhase {
    let epoch = Instant::now();
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;

            // Explicit cancel, or the handle was dropped
            _ = &mut cancel_rx => {
                shared.cancel();
                status_tx.send_replace(shared.status());
                break;
            }

            _ = interval.tick() => {
                let now = TickTime::from_elapsed(epoch.elapsed());
                match shared.try_tick(&mut source, now) {
                    None => continue,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(error = %e, "tick refused, stopping loop");
                        break;
                    }
                }

                let status = shared.status();
                let active = status.phase.is_active();
                status_tx.send_if_modified(|current| {
                    if *current == status {
                        false
                    } else {
                        *current = status;
                        true
                    }
                });
                if !active {
                    break;
                }
            }
        }
    }

    drop(source);
    let phase = shared.phase();
    info!(%phase, stats = ?shared.stats(), "session loop ended");
    phase
}

/// Control surface of a running session
///
/// Dropping the handle cancels the session.
pub struct SessionHandle {
    shared: SharedSession,
    status_rx: watch::Receiver<SessionStatus>,
    cancel_tx: Option<oneshot::Sender<()>>,
    completion: Option<oneshot::Receiver<()>>,
    task: Option<JoinHandle<SessionPhase>>,
}

impl SessionHandle {
    /// Latest published status
    pub fn status(&self) -> SessionStatus {
        self.status_rx.borrow().clone()
    }

    /// Receiver notified on every status change
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status_rx.clone()
    }

    pub fn stats(&self) -> SessionStats {
        self.shared.stats()
    }

    /// Stop the loop; no tick runs after the loop observes this
    pub fn cancel(&mut self) {
        if let Some(tx) = self.cancel_tx.take() {
            debug!("cancel requested");
            let _ = tx.send(());
        }
    }

    /// Resolves once, when the target is reached. Cancellation or a failed
    /// calibration resolve it with an error instead.
    pub async fn completion(&mut self) -> LegDayResult<()> {
        let Some(rx) = self.completion.take() else {
            return Err(LegDayError::SessionEnded(self.shared.phase()));
        };
        match rx.await {
            Ok(()) => Ok(()),
            Err(_) => match self.shared.phase() {
                SessionPhase::Cancelled => Err(LegDayError::SessionCancelled),
                SessionPhase::CalibrationFailed => Err(LegDayError::CalibrationFailed),
                phase => Err(LegDayError::SessionEnded(phase)),
            },
        }
    }

    /// Wait for the loop to exit and return the final phase
    pub async fn join(mut self) -> LegDayResult<SessionPhase> {
        let Some(task) = self.task.take() else {
            return Ok(self.shared.phase());
        };
        task.await
            .map_err(|e| LegDayError::TaskFailed(e.to_string()))
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, |t| t.is_finished())
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}
