//! Gesture state machine - hysteresis + debounce over the brightness drop
//!
//! ```text
//!            drop > down_threshold
//!   ┌────┐   && debounce elapsed      ┌──────┐
//!   │ UP │ ─────────────────────────▶ │ DOWN │
//!   └────┘ ◀───────────────────────── └──────┘
//!            drop < up_threshold
//!            && debounce elapsed      (counts one repetition)
//! ```
//!
//! The band between the two thresholds never triggers anything, so a signal
//! hovering near a single cutoff cannot chatter.

use std::time::Duration;

use legday_core::{GestureState, LegDayError, LegDayResult, TickTime};

use crate::Baseline;

/// Gesture detection thresholds
#[derive(Clone, Debug, PartialEq)]
pub struct GestureConfig {
    /// Drop above which UP goes DOWN
    pub down_threshold: f64,
    /// Drop below which DOWN goes UP
    pub up_threshold: f64,
    /// Minimum time between two accepted transitions
    pub debounce: Duration,
}

impl Default for GestureConfig {
    fn default() -> Self {
        GestureConfig {
            down_threshold: 0.30,
            up_threshold: 0.15,
            debounce: Duration::from_millis(700),
        }
    }
}

impl GestureConfig {
    pub fn validate(&self) -> LegDayResult<()> {
        let in_range = |v: f64| v.is_finite() && (0.0..=1.0).contains(&v);
        if !in_range(self.down_threshold) || !in_range(self.up_threshold) {
            return Err(LegDayError::InvalidConfig(format!(
                "thresholds must lie in [0, 1] (down {}, up {})",
                self.down_threshold, self.up_threshold
            )));
        }
        if self.up_threshold >= self.down_threshold {
            return Err(LegDayError::InvalidConfig(format!(
                "up threshold {} must be below down threshold {}",
                self.up_threshold, self.down_threshold
            )));
        }
        Ok(())
    }
}

/// An accepted state change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    /// Subject moved over the camera
    Down,
    /// Subject came back up; one repetition completed
    Up,
}

impl Transition {
    /// State after the transition
    pub fn target(self) -> GestureState {
        match self {
            Transition::Down => GestureState::Down,
            Transition::Up => GestureState::Up,
        }
    }
}

/// Turns (smoothed brightness, baseline) into alternating DOWN/UP transitions
#[derive(Debug, Clone)]
pub struct GestureStateMachine {
    config: GestureConfig,
    state: GestureState,
    last_transition: Option<TickTime>,
    transitions: u64,
}

impl GestureStateMachine {
    pub fn new(config: GestureConfig) -> Self {
        GestureStateMachine {
            config,
            state: GestureState::Up,
            last_transition: None,
            transitions: 0,
        }
    }

    /// Feed one smoothed value. Without a baseline nothing is computed.
    pub fn update(
        &mut self,
        smoothed: f64,
        baseline: Option<Baseline>,
        now: TickTime,
    ) -> Option<Transition> {
        let baseline = baseline?;
        if !smoothed.is_finite() {
            return None;
        }
        self.step(baseline.drop_for(smoothed), now)
    }

    /// Apply one drop value directly
    pub fn step(&mut self, drop: f64, now: TickTime) -> Option<Transition> {
        if !self.debounce_elapsed(now) {
            return None;
        }

        let transition = match self.state {
            GestureState::Up if drop > self.config.down_threshold => Transition::Down,
            GestureState::Down if drop < self.config.up_threshold => Transition::Up,
            _ => return None,
        };

        self.state = transition.target();
        self.last_transition = Some(now);
        self.transitions += 1;
        Some(transition)
    }

    /// Start the debounce clock when tracking begins, so the first DOWN is
    /// held back like any other transition
    pub fn start_tracking(&mut self, now: TickTime) {
        self.last_transition = Some(now);
    }

    fn debounce_elapsed(&self, now: TickTime) -> bool {
        match self.last_transition {
            None => true,
            Some(last) => now.since(last) >= self.config.debounce,
        }
    }

    pub fn state(&self) -> GestureState {
        self.state
    }

    pub fn last_transition(&self) -> Option<TickTime> {
        self.last_transition
    }

    /// Total accepted transitions
    pub fn transitions(&self) -> u64 {
        self.transitions
    }

    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    /// Back to UP with no transition history
    pub fn reset(&mut self) {
        self.state = GestureState::Up;
        self.last_transition = None;
        self.transitions = 0;
    }
}

impl Default for GestureStateMachine {
    fn default() -> Self {
        Self::new(GestureConfig::default())
    }
}
