//! Habit flow - alarm → reminder → photo verification → squat punishment
//!
//! ```text
//! Armed ──alarm──▶ Reminding ──acknowledged──▶ Verifying ──passed──▶ Armed
//!                                                  │
//!                                               failed
//!                                                  ▼
//!                                 abandoned ⟲ Punishment ──squats done──▶ Armed
//! ```
//!
//! Verification is a verdict handed in by the host. Punishment is a rep
//! session: only a `Complete` session lets the flow re-arm.

use legday_core::{LegDayError, LegDayResult, SessionPhase};
use tracing::info;

/// Where the user is in the weekly cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlowState {
    #[default]
    Armed,
    Reminding,
    Verifying,
    Punishment,
}

impl FlowState {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowState::Armed => "armed",
            FlowState::Reminding => "reminding",
            FlowState::Verifying => "verifying",
            FlowState::Punishment => "punishment",
        }
    }
}

impl std::fmt::Display for FlowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowEvent {
    AlarmFired,
    Acknowledged,
    VerificationPassed,
    VerificationFailed,
    /// Punishment session reached its target
    PunishmentFinished,
    /// Punishment session ended without reaching its target
    PunishmentAbandoned,
}

impl FlowEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowEvent::AlarmFired => "alarm fired",
            FlowEvent::Acknowledged => "acknowledged",
            FlowEvent::VerificationPassed => "verification passed",
            FlowEvent::VerificationFailed => "verification failed",
            FlowEvent::PunishmentFinished => "punishment finished",
            FlowEvent::PunishmentAbandoned => "punishment abandoned",
        }
    }

    pub fn verdict(passed: bool) -> Self {
        if passed {
            FlowEvent::VerificationPassed
        } else {
            FlowEvent::VerificationFailed
        }
    }

    /// Punishment outcome from the phase a rep session ended in
    pub fn from_punishment(phase: SessionPhase) -> LegDayResult<Self> {
        match phase {
            SessionPhase::Complete => Ok(FlowEvent::PunishmentFinished),
            SessionPhase::Cancelled | SessionPhase::CalibrationFailed => {
                Ok(FlowEvent::PunishmentAbandoned)
            }
            other => Err(LegDayError::SessionNotActive(other)),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FlowStats {
    pub alarms: u64,
    pub passed: u64,
    pub punished: u64,
    /// Punishment sessions that ended short of the target
    pub abandoned: u64,
}

type RearmHook = Box<dyn FnMut() + Send>;

/// The weekly cycle as a state machine
#[derive(Default)]
pub struct HabitFlow {
    state: FlowState,
    stats: FlowStats,
    rearm: Option<RearmHook>,
}

impl HabitFlow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called every time the flow returns to `Armed`
    pub fn on_rearm<F>(&mut self, hook: F)
    where
        F: FnMut() + Send + 'static,
    {
        self.rearm = Some(Box::new(hook));
    }

    pub fn handle(&mut self, event: FlowEvent) -> LegDayResult<FlowState> {
        use FlowEvent::*;
        use FlowState::*;

        let next = match (self.state, event) {
            (Armed, AlarmFired) => {
                self.stats.alarms += 1;
                Reminding
            }
            (Reminding, Acknowledged) => Verifying,
            (Verifying, VerificationPassed) => {
                self.stats.passed += 1;
                Armed
            }
            (Verifying, VerificationFailed) => {
                self.stats.punished += 1;
                Punishment
            }
            (Punishment, PunishmentFinished) => Armed,
            (Punishment, PunishmentAbandoned) => {
                self.stats.abandoned += 1;
                Punishment
            }
            (from, event) => {
                return Err(LegDayError::InvalidFlowTransition {
                    from: from.as_str(),
                    event: event.as_str(),
                })
            }
        };

        info!(from = %self.state, to = %next, event = event.as_str(), "flow");
        self.state = next;
        if next == Armed {
            if let Some(rearm) = self.rearm.as_mut() {
                rearm();
            }
        }
        Ok(next)
    }

    /// Feed the photo check verdict
    pub fn finish_verification(&mut self, passed: bool) -> LegDayResult<FlowState> {
        self.handle(FlowEvent::verdict(passed))
    }

    /// Feed the end of a punishment rep session. Anything short of
    /// `Complete` keeps the flow in `Punishment` for another session.
    pub fn finish_punishment(&mut self, phase: SessionPhase) -> LegDayResult<FlowState> {
        self.handle(FlowEvent::from_punishment(phase)?)
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    pub fn stats(&self) -> &FlowStats {
        &self.stats
    }
}

impl std::fmt::Debug for HabitFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HabitFlow")
            .field("state", &self.state)
            .field("stats", &self.stats)
            .finish()
    }
}
