//! Rep pipeline - one tick: sample → smooth → calibrate or detect → count

use std::time::Duration;

use legday_core::{Frame, GestureState, LegDayError, LegDayResult, TickTime};
use tracing::{debug, info, warn};

use crate::{
    Baseline, BaselineCalibrator, BrightnessSampler, CalibrationPolicy, CalibrationStatus,
    GestureConfig, GestureStateMachine, RepetitionCounter, RepetitionOutcome, SignalSmoother,
    Transition, DEFAULT_CALIBRATION_WINDOW, DEFAULT_MAX_SAMPLES, DEFAULT_MIN_BASELINE,
    DEFAULT_PIXEL_STRIDE, DEFAULT_SMOOTHING_WINDOW, DEFAULT_TARGET_REPS,
};

/// Rep pipeline configuration
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineConfig {
    /// Read one pixel in every N
    pub pixel_stride: usize,
    /// Cap on pixels read per frame
    pub max_samples: usize,
    /// Rolling-mean window length (ticks)
    pub smoothing_window: usize,
    /// How long the subject stays out of frame at start
    pub calibration_window: Duration,
    pub calibration_policy: CalibrationPolicy,
    /// Darkest brightness still accepted as a baseline
    pub min_baseline: f64,
    pub gesture: GestureConfig,
    /// Repetitions to complete a session
    pub target_reps: u32,
    /// Polling period
    pub tick_interval: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            pixel_stride: DEFAULT_PIXEL_STRIDE,
            max_samples: DEFAULT_MAX_SAMPLES,
            smoothing_window: DEFAULT_SMOOTHING_WINDOW,
            calibration_window: DEFAULT_CALIBRATION_WINDOW,
            calibration_policy: CalibrationPolicy::FirstSample,
            min_baseline: DEFAULT_MIN_BASELINE,
            gesture: GestureConfig::default(),
            target_reps: DEFAULT_TARGET_REPS,
            tick_interval: Duration::from_millis(200),
        }
    }
}

impl PipelineConfig {
    /// Configuration for dim rooms: noisier sensor, smaller contrast
    pub fn low_light() -> Self {
        PipelineConfig {
            smoothing_window: 5,
            calibration_window: Duration::from_secs(4),
            calibration_policy: CalibrationPolicy::Mean,
            min_baseline: 0.5,
            gesture: GestureConfig {
                down_threshold: 0.25,
                up_threshold: 0.12,
                debounce: Duration::from_millis(700),
            },
            ..Default::default()
        }
    }

    pub fn with_target(mut self, target_reps: u32) -> Self {
        self.target_reps = target_reps;
        self
    }

    pub fn validate(&self) -> LegDayResult<()> {
        if self.pixel_stride == 0 || self.max_samples == 0 {
            return Err(LegDayError::InvalidConfig(
                "pixel stride and max samples must be at least 1".into(),
            ));
        }
        if self.smoothing_window == 0 {
            return Err(LegDayError::InvalidConfig(
                "smoothing window must hold at least one sample".into(),
            ));
        }
        if self.calibration_window.is_zero() || self.tick_interval.is_zero() {
            return Err(LegDayError::InvalidConfig(
                "calibration window and tick interval must be non-zero".into(),
            ));
        }
        if !self.min_baseline.is_finite() || self.min_baseline < 0.0 {
            return Err(LegDayError::InvalidConfig(format!(
                "min baseline {} must be a non-negative number",
                self.min_baseline
            )));
        }
        if self.target_reps == 0 {
            return Err(LegDayError::InvalidConfig(
                "target must be at least one repetition".into(),
            ));
        }
        self.gesture.validate()
    }
}

/// Where the pipeline is in its session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelinePhase {
    Calibrating,
    Tracking,
    Complete,
    CalibrationFailed,
}

/// What one tick did
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickEvent {
    /// Pipeline finished (complete or failed); nothing processed
    Ignored,
    /// No frame available
    SourceNotReady,
    /// Frame could not be sampled
    FrameRejected,
    /// Calibration window still open
    CalibrationSample { smoothed: f64, accepted: bool },
    /// Calibration window closed with a baseline; tracking starts
    CalibrationComplete { baseline: Baseline },
    /// Calibration window closed without a baseline
    CalibrationFailed,
    /// Tracking, no transition
    Tracked { drop: f64 },
    /// DOWN transition accepted
    WentDown { drop: f64 },
    /// UP transition accepted and counted
    Repetition {
        count: u32,
        target: u32,
        completed: bool,
    },
}

/// One counting session worth of signal state
#[derive(Debug)]
pub struct RepPipeline {
    config: PipelineConfig,
    sampler: BrightnessSampler,
    smoother: SignalSmoother,
    calibrator: BaselineCalibrator,
    gesture: GestureStateMachine,
    counter: RepetitionCounter,
    baseline: Option<Baseline>,
    phase: PipelinePhase,
}

impl RepPipeline {
    /// Create a pipeline and open its calibration window at `now`
    pub fn start(config: PipelineConfig, now: TickTime) -> LegDayResult<Self> {
        config.validate()?;

        let mut pipeline = RepPipeline {
            sampler: BrightnessSampler::new(config.pixel_stride, config.max_samples),
            smoother: SignalSmoother::new(config.smoothing_window),
            calibrator: BaselineCalibrator::new(
                config.calibration_policy,
                config.calibration_window,
                config.min_baseline,
            ),
            gesture: GestureStateMachine::new(config.gesture.clone()),
            counter: RepetitionCounter::new(config.target_reps),
            baseline: None,
            phase: PipelinePhase::Calibrating,
            config,
        };
        pipeline.restart(now);
        Ok(pipeline)
    }

    /// Fresh session: no baseline, zero count, state UP, new calibration window
    pub fn restart(&mut self, now: TickTime) {
        self.smoother.clear();
        self.calibrator.start(now);
        self.gesture.reset();
        self.counter.reset();
        self.baseline = None;
        self.phase = PipelinePhase::Calibrating;
    }

    /// Register the completion hook for this session
    pub fn on_complete<F>(&mut self, hook: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.counter.on_complete(hook);
    }

    /// Drop the completion hook without running it
    pub fn clear_completion_hook(&mut self) {
        self.counter.clear_hook();
    }

    /// Run one tick
    pub fn tick(&mut self, frame: Option<&Frame>, now: TickTime) -> TickEvent {
        match self.phase {
            PipelinePhase::Complete | PipelinePhase::CalibrationFailed => {
                return TickEvent::Ignored
            }
            PipelinePhase::Calibrating => {
                if let Some(event) = self.finish_calibration(now) {
                    return event;
                }
            }
            PipelinePhase::Tracking => {}
        }

        let Some(frame) = frame else {
            return TickEvent::SourceNotReady;
        };

        let sample = match self.sampler.sample(frame, now) {
            Ok(sample) => sample,
            Err(e) => {
                warn!(error = %e, "frame rejected");
                return TickEvent::FrameRejected;
            }
        };

        let smoothed = self.smoother.push(sample.value);

        match self.phase {
            PipelinePhase::Calibrating => {
                let accepted = self.calibrator.observe(smoothed, now);
                TickEvent::CalibrationSample { smoothed, accepted }
            }
            _ => self.detect(smoothed, now),
        }
    }

    /// Close the calibration window if it has elapsed
    fn finish_calibration(&mut self, now: TickTime) -> Option<TickEvent> {
        match self.calibrator.poll(now) {
            CalibrationStatus::Collecting => None,
            CalibrationStatus::Ready(baseline) => {
                info!(
                    baseline = baseline.value(),
                    samples = self.calibrator.accepted(),
                    "calibration complete"
                );
                self.baseline = Some(baseline);
                self.gesture.start_tracking(now);
                self.phase = PipelinePhase::Tracking;
                Some(TickEvent::CalibrationComplete { baseline })
            }
            CalibrationStatus::Degenerate => {
                warn!("calibration window elapsed without a usable frame");
                self.phase = PipelinePhase::CalibrationFailed;
                Some(TickEvent::CalibrationFailed)
            }
        }
    }

    fn detect(&mut self, smoothed: f64, now: TickTime) -> TickEvent {
        let Some(baseline) = self.baseline else {
            return TickEvent::Ignored;
        };
        let drop = baseline.drop_for(smoothed);

        match self.gesture.update(smoothed, Some(baseline), now) {
            None => TickEvent::Tracked { drop },
            Some(Transition::Down) => {
                debug!(drop, "down");
                TickEvent::WentDown { drop }
            }
            Some(Transition::Up) => match self.counter.record_repetition() {
                RepetitionOutcome::Counted(count) => {
                    debug!(count, target = self.counter.target(), "repetition");
                    TickEvent::Repetition {
                        count,
                        target: self.counter.target(),
                        completed: false,
                    }
                }
                RepetitionOutcome::Completed(count) => {
                    self.phase = PipelinePhase::Complete;
                    TickEvent::Repetition {
                        count,
                        target: self.counter.target(),
                        completed: true,
                    }
                }
                RepetitionOutcome::Ignored => TickEvent::Ignored,
            },
        }
    }

    pub fn phase(&self) -> PipelinePhase {
        self.phase
    }

    pub fn baseline(&self) -> Option<Baseline> {
        self.baseline
    }

    pub fn gesture_state(&self) -> GestureState {
        self.gesture.state()
    }

    pub fn count(&self) -> u32 {
        self.counter.current()
    }

    pub fn target(&self) -> u32 {
        self.counter.target()
    }

    pub fn progress(&self) -> f64 {
        self.counter.progress()
    }

    pub fn transitions(&self) -> u64 {
        self.gesture.transitions()
    }

    pub fn calibration_deadline(&self) -> Option<TickTime> {
        self.calibrator.deadline()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }
}
