//! Gesture states and session phases

use std::fmt;

/// Position of the subject over the camera
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GestureState {
    /// Camera unobstructed (standing)
    #[default]
    Up,
    /// Camera occluded (squatting over it)
    Down,
}

/// Lifecycle phase of a counting session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionPhase {
    /// No session started yet
    #[default]
    Idle,
    /// Measuring the unobstructed baseline
    Calibrating,
    /// Counting repetitions
    Tracking,
    /// Target reached
    Complete,
    /// Calibration window elapsed without a baseline; needs a manual restart
    CalibrationFailed,
    /// Stopped by the host before completion
    Cancelled,
}

impl SessionPhase {
    /// Phases in which the polling loop runs
    pub fn is_active(self) -> bool {
        matches!(self, SessionPhase::Calibrating | SessionPhase::Tracking)
    }

    /// Phases that end a session
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionPhase::Complete | SessionPhase::CalibrationFailed | SessionPhase::Cancelled
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionPhase::Idle => "idle",
            SessionPhase::Calibrating => "calibrating",
            SessionPhase::Tracking => "tracking",
            SessionPhase::Complete => "complete",
            SessionPhase::CalibrationFailed => "calibration-failed",
            SessionPhase::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_classification() {
        assert!(SessionPhase::Calibrating.is_active());
        assert!(SessionPhase::Tracking.is_active());
        assert!(!SessionPhase::Idle.is_active());

        assert!(SessionPhase::Complete.is_terminal());
        assert!(SessionPhase::Cancelled.is_terminal());
        assert!(SessionPhase::CalibrationFailed.is_terminal());
        assert!(!SessionPhase::Tracking.is_terminal());
    }

    #[test]
    fn test_gesture_starts_up() {
        assert_eq!(GestureState::default(), GestureState::Up);
    }
}
