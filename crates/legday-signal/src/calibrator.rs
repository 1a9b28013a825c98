//! Baseline calibration - how bright is the room with nobody over the camera

use std::time::Duration;

use legday_core::TickTime;

/// Default calibration window
pub const DEFAULT_CALIBRATION_WINDOW: Duration = Duration::from_secs(3);

/// Smallest brightness accepted as a baseline (0-255 scale)
pub const DEFAULT_MIN_BASELINE: f64 = 1.0;

/// Reference brightness for "camera unobstructed"
///
/// Always finite and strictly positive, so the drop computation is defined.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Baseline(f64);

impl Baseline {
    /// Accepts only finite values above `min`
    pub fn new(value: f64, min: f64) -> Option<Self> {
        if value.is_finite() && value > min.max(0.0) {
            Some(Baseline(value))
        } else {
            None
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Normalized brightness drop: 0 at or above baseline, towards 1 as the
    /// camera goes dark
    #[inline]
    pub fn drop_for(self, smoothed: f64) -> f64 {
        (1.0 - smoothed / self.0).max(0.0)
    }
}

/// Which calibration samples make up the baseline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CalibrationPolicy {
    /// First usable sample wins, later ones are ignored
    #[default]
    FirstSample,
    /// Average of every usable sample in the window
    Mean,
}

/// Result of polling the calibrator
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalibrationStatus {
    /// Window still open
    Collecting,
    /// Window closed with a baseline
    Ready(Baseline),
    /// Window closed without a single usable sample
    Degenerate,
}

/// Collects smoothed brightness during a fixed window after start
#[derive(Debug, Clone)]
pub struct BaselineCalibrator {
    policy: CalibrationPolicy,
    window: Duration,
    min_baseline: f64,
    started_at: Option<TickTime>,
    first: Option<f64>,
    sum: f64,
    accepted: u32,
}

impl BaselineCalibrator {
    pub fn new(policy: CalibrationPolicy, window: Duration, min_baseline: f64) -> Self {
        BaselineCalibrator {
            policy,
            window,
            min_baseline,
            started_at: None,
            first: None,
            sum: 0.0,
            accepted: 0,
        }
    }

    /// Open a fresh window, discarding anything collected before
    pub fn start(&mut self, now: TickTime) {
        self.started_at = Some(now);
        self.first = None;
        self.sum = 0.0;
        self.accepted = 0;
    }

    pub fn is_started(&self) -> bool {
        self.started_at.is_some()
    }

    /// End of the window, if started
    pub fn deadline(&self) -> Option<TickTime> {
        self.started_at.map(|t| t + self.window)
    }

    pub fn is_expired(&self, now: TickTime) -> bool {
        self.deadline().is_some_and(|deadline| now >= deadline)
    }

    /// Feed a smoothed value. Returns whether it was taken into account.
    pub fn observe(&mut self, value: f64, now: TickTime) -> bool {
        if !self.is_started() || self.is_expired(now) {
            return false;
        }
        if Baseline::new(value, self.min_baseline).is_none() {
            return false;
        }

        match self.policy {
            CalibrationPolicy::FirstSample => {
                if self.first.is_some() {
                    return false;
                }
                self.first = Some(value);
            }
            CalibrationPolicy::Mean => {
                if self.first.is_none() {
                    self.first = Some(value);
                }
                self.sum += value;
            }
        }
        self.accepted += 1;
        true
    }

    /// Baseline as it would be if the window closed now
    pub fn candidate(&self) -> Option<Baseline> {
        let value = match self.policy {
            CalibrationPolicy::FirstSample => self.first?,
            CalibrationPolicy::Mean => {
                if self.accepted == 0 {
                    return None;
                }
                self.sum / self.accepted as f64
            }
        };
        Baseline::new(value, self.min_baseline)
    }

    /// Number of samples that went into the candidate
    pub fn accepted(&self) -> u32 {
        self.accepted
    }

    pub fn poll(&self, now: TickTime) -> CalibrationStatus {
        if !self.is_expired(now) {
            return CalibrationStatus::Collecting;
        }
        match self.candidate() {
            Some(baseline) => CalibrationStatus::Ready(baseline),
            None => CalibrationStatus::Degenerate,
        }
    }

    pub fn policy(&self) -> CalibrationPolicy {
        self.policy
    }
}

impl Default for BaselineCalibrator {
    fn default() -> Self {
        Self::new(
            CalibrationPolicy::default(),
            DEFAULT_CALIBRATION_WINDOW,
            DEFAULT_MIN_BASELINE,
        )
    }
}
