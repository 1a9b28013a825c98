//! Rep session - one calibration-to-completion run owned by its driver
//!
//! The session owns the pipeline (baseline, gesture state, count) and is the
//! only thing that mutates it. Observers get `SessionStatus` snapshots.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use legday_core::{LegDayError, LegDayResult, SessionPhase, TickTime};
use legday_signal::{CompletionHook, PipelineConfig, PipelinePhase, RepPipeline, TickEvent};
use parking_lot::Mutex;
use tracing::{info, trace};

use crate::FrameSource;

/// Shown before the first calibration
pub const MSG_READY: &str = "Get ready to squat!";
pub const MSG_CALIBRATING: &str =
    "Stand back from the phone so we can measure the ambient light...";
pub const MSG_CALIBRATED: &str =
    "Calibration complete! Start your squats by positioning yourself over the phone.";
pub const MSG_DOWN: &str = "Going down! Keep it up!";
pub const MSG_CALIBRATION_FAILED: &str =
    "Couldn't see anything during calibration. Check the camera and calibrate again.";
pub const MSG_CANCELLED: &str = "Session cancelled.";

/// Rotated through on each counted repetition
pub const ENCOURAGEMENTS: [&str; 5] = [
    "Keep going! You can do it!",
    "Good job! Keep squatting!",
    "You're making progress!",
    "Great work! Don't stop now!",
    "Almost there! Keep it up!",
];

/// What the UI may read about a session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStatus {
    pub phase: SessionPhase,
    pub current_count: u32,
    pub target_count: u32,
    pub last_encouragement: String,
}

impl SessionStatus {
    /// Fraction of the target done, 0.0 ..= 1.0
    pub fn progress(&self) -> f64 {
        if self.target_count == 0 {
            return 0.0;
        }
        self.current_count as f64 / self.target_count as f64
    }
}

#[derive(Clone, Debug, Default)]
pub struct SessionStats {
    pub ticks: u64,
    pub frames_sampled: u64,
    pub frames_missing: u64,
    pub frames_rejected: u64,
    pub ticks_skipped: u64,
    pub transitions: u64,
    pub last_tick_duration: Duration,
}

/// A counting session
pub struct RepSession {
    config: PipelineConfig,
    pipeline: Option<RepPipeline>,
    phase: SessionPhase,
    encouragement: String,
    pending_hook: Option<CompletionHook>,
    stats: SessionStats,
}

impl RepSession {
    pub fn new(config: PipelineConfig) -> LegDayResult<Self> {
        config.validate()?;
        Ok(RepSession {
            config,
            pipeline: None,
            phase: SessionPhase::Idle,
            encouragement: MSG_READY.to_string(),
            pending_hook: None,
            stats: SessionStats::default(),
        })
    }

    /// Begin a session: baseline cleared, count zeroed, state UP, calibration
    /// window opened at `now`. Also the way out of `CalibrationFailed`.
    pub fn start_calibration(&mut self, now: TickTime) -> LegDayResult<()> {
        match self.pipeline.as_mut() {
            Some(pipeline) => pipeline.restart(now),
            None => self.pipeline = Some(RepPipeline::start(self.config.clone(), now)?),
        }
        if let (Some(pipeline), Some(hook)) = (self.pipeline.as_mut(), self.pending_hook.take()) {
            pipeline.on_complete(hook);
        }

        self.phase = SessionPhase::Calibrating;
        self.encouragement = MSG_CALIBRATING.to_string();
        self.stats = SessionStats::default();
        info!(at = ?now, "calibration started");
        Ok(())
    }

    /// Stop the session. The completion hook is dropped without firing.
    pub fn cancel(&mut self) {
        if self.phase.is_terminal() && self.phase != SessionPhase::CalibrationFailed {
            return;
        }
        self.phase = SessionPhase::Cancelled;
        self.encouragement = MSG_CANCELLED.to_string();
        self.pending_hook = None;
        if let Some(pipeline) = self.pipeline.as_mut() {
            pipeline.clear_completion_hook();
        }
        info!("session cancelled");
    }

    /// Register the completion callback for the current session, or for the
    /// next one if none is running
    pub fn on_complete<F>(&mut self, hook: F)
    where
        F: FnOnce() + Send + 'static,
    {
        match self.pipeline.as_mut() {
            Some(pipeline) if self.phase.is_active() => pipeline.on_complete(hook),
            _ => self.pending_hook = Some(Box::new(hook)),
        }
    }

    /// Run one tick: fetch a frame, push it through the pipeline, update
    /// phase and encouragement. The frame is dropped before returning.
    pub fn tick(&mut self, source: &mut dyn FrameSource, now: TickTime) -> LegDayResult<TickEvent> {
        if !self.phase.is_active() {
            return Err(LegDayError::SessionNotActive(self.phase));
        }
        let Some(pipeline) = self.pipeline.as_mut() else {
            return Err(LegDayError::SessionNotActive(self.phase));
        };

        let start = Instant::now();
        let event = {
            let frame = source.try_get_current_frame();
            pipeline.tick(frame.as_ref(), now)
        };
        if pipeline.phase() == PipelinePhase::CalibrationFailed {
            pipeline.clear_completion_hook();
        }

        self.stats.ticks += 1;
        self.apply(event);
        self.stats.last_tick_duration = start.elapsed();
        Ok(event)
    }

    fn apply(&mut self, event: TickEvent) {
        match event {
            TickEvent::Ignored => {}
            TickEvent::SourceNotReady => self.stats.frames_missing += 1,
            TickEvent::FrameRejected => self.stats.frames_rejected += 1,
            TickEvent::CalibrationSample { .. } | TickEvent::Tracked { .. } => {
                self.stats.frames_sampled += 1
            }
            TickEvent::CalibrationComplete { .. } => {
                self.phase = SessionPhase::Tracking;
                self.encouragement = MSG_CALIBRATED.to_string();
            }
            TickEvent::CalibrationFailed => {
                self.phase = SessionPhase::CalibrationFailed;
                self.encouragement = MSG_CALIBRATION_FAILED.to_string();
            }
            TickEvent::WentDown { .. } => {
                self.stats.frames_sampled += 1;
                self.stats.transitions += 1;
                self.encouragement = MSG_DOWN.to_string();
            }
            TickEvent::Repetition {
                count,
                target,
                completed,
            } => {
                self.stats.frames_sampled += 1;
                self.stats.transitions += 1;
                if completed {
                    self.phase = SessionPhase::Complete;
                    self.encouragement = format!("That's {}! Leg day survived.", target);
                    info!(count, "session complete");
                } else {
                    let message = ENCOURAGEMENTS[(count as usize - 1) % ENCOURAGEMENTS.len()];
                    self.encouragement = format!("{} ({}/{})", message, count, target);
                }
            }
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            phase: self.phase,
            current_count: self.pipeline.as_ref().map_or(0, |p| p.count()),
            target_count: self.config.target_reps,
            last_encouragement: self.encouragement.clone(),
        }
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn pipeline(&self) -> Option<&RepPipeline> {
        self.pipeline.as_ref()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }
}

impl std::fmt::Debug for RepSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepSession")
            .field("phase", &self.phase)
            .field("pipeline", &self.pipeline)
            .field("stats", &self.stats)
            .finish()
    }
}

/// A session shared between its driver and observers, with a tick guard
///
/// `try_tick` never waits: if another tick holds the session, this one is
/// dropped and counted as skipped.
#[derive(Clone)]
pub struct SharedSession {
    inner: Arc<Mutex<RepSession>>,
    skipped: Arc<AtomicU64>,
}

impl SharedSession {
    pub fn new(session: RepSession) -> Self {
        SharedSession {
            inner: Arc::new(Mutex::new(session)),
            skipped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Tick unless a tick is already running. `None` means skipped.
    pub fn try_tick(
        &self,
        source: &mut dyn FrameSource,
        now: TickTime,
    ) -> Option<LegDayResult<TickEvent>> {
        match self.inner.try_lock() {
            Some(mut session) => Some(session.tick(source, now)),
            None => {
                self.skipped.fetch_add(1, Ordering::Relaxed);
                trace!(at = ?now, "tick skipped, previous tick still running");
                None
            }
        }
    }

    pub fn start_calibration(&self, now: TickTime) -> LegDayResult<()> {
        self.inner.lock().start_calibration(now)
    }

    pub fn cancel(&self) {
        self.inner.lock().cancel();
    }

    pub fn on_complete<F>(&self, hook: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.inner.lock().on_complete(hook);
    }

    pub fn phase(&self) -> SessionPhase {
        self.inner.lock().phase()
    }

    pub fn status(&self) -> SessionStatus {
        self.inner.lock().status()
    }

    pub fn stats(&self) -> SessionStats {
        let mut stats = self.inner.lock().stats().clone();
        stats.ticks_skipped = self.skipped.load(Ordering::Relaxed);
        stats
    }

    /// Run a closure with exclusive access to the session
    pub fn with<R>(&self, f: impl FnOnce(&mut RepSession) -> R) -> R {
        f(&mut self.inner.lock())
    }
}
