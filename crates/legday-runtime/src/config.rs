//! File configuration
//!
//! A JSON document with optional `pipeline`, `reminder` and `log_format`
//! sections. Missing keys take their defaults, unknown keys are rejected and
//! durations are written the human way ("700ms", "3s").

use std::path::Path;
use std::time::Duration;

use legday_core::{LegDayError, LegDayResult};
use legday_signal::{CalibrationPolicy, GestureConfig, PipelineConfig};
use serde::{Deserialize, Serialize};

use crate::{AlarmSchedule, LogFormat, ReminderConfig, DEFAULT_REMINDER_INTERVAL};

mod duration_str {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&humantime::format_duration(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}

/// `pipeline` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineSection {
    pub pixel_stride: usize,
    pub max_samples: usize,
    pub smoothing_window: usize,
    #[serde(with = "duration_str")]
    pub calibration_window: Duration,
    pub calibration_policy: CalibrationPolicy,
    pub min_baseline: f64,
    pub down_threshold: f64,
    pub up_threshold: f64,
    #[serde(with = "duration_str")]
    pub debounce: Duration,
    pub target_reps: u32,
    #[serde(with = "duration_str")]
    pub tick_interval: Duration,
}

impl Default for PipelineSection {
    fn default() -> Self {
        PipelineSection::from(&PipelineConfig::default())
    }
}

impl From<&PipelineConfig> for PipelineSection {
    fn from(config: &PipelineConfig) -> Self {
        PipelineSection {
            pixel_stride: config.pixel_stride,
            max_samples: config.max_samples,
            smoothing_window: config.smoothing_window,
            calibration_window: config.calibration_window,
            calibration_policy: config.calibration_policy,
            min_baseline: config.min_baseline,
            down_threshold: config.gesture.down_threshold,
            up_threshold: config.gesture.up_threshold,
            debounce: config.gesture.debounce,
            target_reps: config.target_reps,
            tick_interval: config.tick_interval,
        }
    }
}

/// `reminder` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReminderSection {
    pub alarm: AlarmSchedule,
    #[serde(with = "duration_str")]
    pub interval: Duration,
    pub user_name: Option<String>,
}

impl Default for ReminderSection {
    fn default() -> Self {
        ReminderSection {
            alarm: AlarmSchedule::default(),
            interval: DEFAULT_REMINDER_INTERVAL,
            user_name: None,
        }
    }
}

/// Whole configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct LegDayConfig {
    pub pipeline: PipelineSection,
    pub reminder: ReminderSection,
    pub log_format: LogFormat,
}

impl LegDayConfig {
    pub fn from_json_str(raw: &str) -> LegDayResult<Self> {
        let config: LegDayConfig =
            serde_json::from_str(raw).map_err(|e| LegDayError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> LegDayResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn to_json_string(&self) -> LegDayResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| LegDayError::ConfigParse(e.to_string()))
    }

    pub fn validate(&self) -> LegDayResult<()> {
        self.pipeline_config().validate()?;
        self.reminder_config().validate()
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        let p = &self.pipeline;
        PipelineConfig {
            pixel_stride: p.pixel_stride,
            max_samples: p.max_samples,
            smoothing_window: p.smoothing_window,
            calibration_window: p.calibration_window,
            calibration_policy: p.calibration_policy,
            min_baseline: p.min_baseline,
            gesture: GestureConfig {
                down_threshold: p.down_threshold,
                up_threshold: p.up_threshold,
                debounce: p.debounce,
            },
            target_reps: p.target_reps,
            tick_interval: p.tick_interval,
        }
    }

    pub fn reminder_config(&self) -> ReminderConfig {
        ReminderConfig {
            alarm: self.reminder.alarm,
            interval: self.reminder.interval,
            user_name: self.reminder.user_name.clone(),
        }
    }
}
