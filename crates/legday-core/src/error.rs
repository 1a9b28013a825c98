//! Error types for the rep counter

use thiserror::Error;

use crate::SessionPhase;

/// Core LegDay errors
#[derive(Error, Debug)]
pub enum LegDayError {
    // Frame errors
    #[error("Empty frame: {width}x{height}")]
    EmptyFrame { width: u32, height: u32 },

    #[error("Frame buffer size mismatch: expected {expected}, got {actual}")]
    FrameSizeMismatch { expected: usize, actual: usize },

    // Calibration errors
    #[error("Calibration window elapsed without a usable baseline")]
    CalibrationFailed,

    // Session errors
    #[error("Session not active (phase: {0})")]
    SessionNotActive(SessionPhase),

    #[error("Session cancelled")]
    SessionCancelled,

    #[error("Session ended before completion (phase: {0})")]
    SessionEnded(SessionPhase),

    #[error("Session task failed: {0}")]
    TaskFailed(String),

    // Flow errors
    #[error("Invalid flow transition: {event} while {from}")]
    InvalidFlowTransition { from: &'static str, event: &'static str },

    // Reminder errors
    #[error("Delivery via {channel} failed: {reason}")]
    DeliveryFailed { channel: String, reason: String },

    #[error("All {0} delivery channels failed")]
    AllChannelsFailed(usize),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Configuration parse error: {0}")]
    ConfigParse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Telemetry error: {0}")]
    Telemetry(String),
}

/// Result type for LegDay operations
pub type LegDayResult<T> = Result<T, LegDayError>;
