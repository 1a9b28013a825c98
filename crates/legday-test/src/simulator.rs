//! Squat simulator - a rep session run against a synthetic scene on a
//! simulated clock
//!
//! Ticks exactly every `tick_interval`, with no tokio involved, so a whole
//! session runs in microseconds and is reproducible from its seed.

use std::time::Duration;

use legday_core::{LegDayResult, SessionPhase, TickTime};
use legday_runtime::{RepSession, SessionStats};
use legday_signal::{PipelineConfig, TickEvent};

use crate::scene::{SceneConfig, ScriptedSource, SimClock, SquatScript, SyntheticScene};

/// Drives a `RepSession` through a scripted scene
pub struct SquatSimulator {
    session: RepSession,
    source: ScriptedSource<SimClock>,
    clock: SimClock,
    tick_interval: Duration,
}

impl SquatSimulator {
    pub fn new(config: PipelineConfig, scene: SyntheticScene) -> LegDayResult<Self> {
        let tick_interval = config.tick_interval;
        let clock = SimClock::new();
        Ok(SquatSimulator {
            session: RepSession::new(config)?,
            source: ScriptedSource::new(scene, clock.clone()),
            clock,
            tick_interval,
        })
    }

    /// Start a session at the current clock time and tick it until it ends
    /// or `limit` elapses
    pub fn run(&mut self, limit: Duration) -> LegDayResult<SimulationResult> {
        let mut result = SimulationResult::new(self.source.scene().script().squat_count());
        let start = self.clock.now();
        let end = start + limit;
        self.session.start_calibration(start)?;

        while self.session.phase().is_active() && self.clock.now() <= end {
            let now = self.clock.now();
            let event = self.session.tick(&mut self.source, now)?;
            result.record(now, event);
            self.clock.advance(self.tick_interval);
        }

        result.final_phase = self.session.phase();
        result.final_count = self.session.status().current_count;
        result.stats = self.session.stats().clone();
        result.finalize();
        Ok(result)
    }

    /// Run for the scripted duration plus a little slack
    pub fn run_script(&mut self) -> LegDayResult<SimulationResult> {
        let limit = self.source.scene().script().duration() + Duration::from_secs(2);
        self.run(limit)
    }

    pub fn session(&self) -> &RepSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut RepSession {
        &mut self.session
    }

    pub fn clock(&self) -> &SimClock {
        &self.clock
    }
}

/// Simulation result and statistics
#[derive(Debug, Default)]
pub struct SimulationResult {
    /// Squats in the script
    pub scripted_squats: u32,
    pub total_ticks: u64,
    /// Every tick with its event
    pub events: Vec<(TickTime, TickEvent)>,
    pub baseline: Option<f64>,
    pub calibrated_at: Option<TickTime>,
    pub completed_at: Option<TickTime>,
    pub final_phase: SessionPhase,
    pub final_count: u32,
    pub stats: SessionStats,
    /// Shortest gap between two accepted transitions
    pub min_transition_gap: Option<Duration>,
    /// Mean time between counted repetitions (milliseconds)
    pub avg_rep_interval_ms: f64,
    transition_times: Vec<TickTime>,
    rep_times: Vec<TickTime>,
}

impl SimulationResult {
    pub fn new(scripted_squats: u32) -> Self {
        SimulationResult {
            scripted_squats,
            ..Default::default()
        }
    }

    fn record(&mut self, at: TickTime, event: TickEvent) {
        self.total_ticks += 1;
        self.events.push((at, event));

        match event {
            TickEvent::CalibrationComplete { baseline } => {
                self.baseline = Some(baseline.value());
                self.calibrated_at = Some(at);
            }
            TickEvent::WentDown { .. } => self.transition_times.push(at),
            TickEvent::Repetition { completed, .. } => {
                self.transition_times.push(at);
                self.rep_times.push(at);
                if completed {
                    self.completed_at = Some(at);
                }
            }
            _ => {}
        }
    }

    /// Calculate final statistics
    pub fn finalize(&mut self) {
        self.min_transition_gap = self
            .transition_times
            .windows(2)
            .map(|w| w[1].since(w[0]))
            .min();

        if self.rep_times.len() >= 2 {
            let span = self.rep_times[self.rep_times.len() - 1].since(self.rep_times[0]);
            self.avg_rep_interval_ms =
                span.as_secs_f64() * 1000.0 / (self.rep_times.len() - 1) as f64;
        }
    }

    /// Repetitions counted
    pub fn reps(&self) -> u32 {
        self.rep_times.len() as u32
    }

    pub fn rep_times(&self) -> &[TickTime] {
        &self.rep_times
    }

    pub fn transition_times(&self) -> &[TickTime] {
        &self.transition_times
    }

    /// Counts taken from `Repetition` events, in order
    pub fn counts(&self) -> Vec<u32> {
        self.events
            .iter()
            .filter_map(|(_, e)| match e {
                TickEvent::Repetition { count, .. } => Some(*count),
                _ => None,
            })
            .collect()
    }

    pub fn completions(&self) -> usize {
        self.events
            .iter()
            .filter(|(_, e)| matches!(e, TickEvent::Repetition { completed: true, .. }))
            .count()
    }
}

/// Standard squat timing: 1.2s down, 1.6s up
pub const SQUAT_DOWN: Duration = Duration::from_millis(1200);
pub const SQUAT_UP: Duration = Duration::from_millis(1600);

/// Predefined test scenarios
pub mod scenarios {
    use super::*;

    fn calibrated(config: &PipelineConfig) -> SquatScript {
        SquatScript::new().stand(config.calibration_window + Duration::from_millis(400))
    }

    fn build(
        config: PipelineConfig,
        scene: SceneConfig,
        script: SquatScript,
        seed: u64,
    ) -> LegDayResult<SquatSimulator> {
        SquatSimulator::new(config, SyntheticScene::new(scene, script, seed))
    }

    /// `reps` steady squats in an ordinary room
    pub fn clean_squats(target: u32, reps: u32) -> LegDayResult<SquatSimulator> {
        let config = PipelineConfig::default().with_target(target);
        let script = calibrated(&config).squats(reps, SQUAT_DOWN, SQUAT_UP);
        build(config, SceneConfig::default(), script, 1)
    }

    /// Nobody squats; the light dips for one frame every second
    pub fn flickering_light() -> LegDayResult<SquatSimulator> {
        let config = PipelineConfig::default().with_target(5);
        let mut script = calibrated(&config);
        for _ in 0..10 {
            script = script
                .stand(Duration::from_millis(800))
                .flicker(Duration::from_millis(200));
        }
        build(config, SceneConfig::default(), script.stand(Duration::from_secs(1)), 2)
    }

    /// Squats with single-frame flickers while standing
    pub fn squats_with_flicker(reps: u32) -> LegDayResult<SquatSimulator> {
        let config = PipelineConfig::default().with_target(reps);
        let mut script = calibrated(&config);
        for _ in 0..reps {
            script = script
                .squat(SQUAT_DOWN)
                .stand(Duration::from_millis(800))
                .flicker(Duration::from_millis(200))
                .stand(Duration::from_millis(1000));
        }
        build(config, SceneConfig::default(), script, 3)
    }

    /// Bobbing far faster than a real squat, 300ms down / 300ms up
    pub fn too_fast(bobs: u32) -> LegDayResult<SquatSimulator> {
        let config = PipelineConfig::default().with_target(bobs.max(1));
        let step = Duration::from_millis(300);
        let script = calibrated(&config)
            .squats(bobs, step, step)
            .stand(Duration::from_secs(2));
        build(config, SceneConfig::default(), script, 4)
    }

    /// Dim room with the low-light preset
    pub fn dark_room(reps: u32) -> LegDayResult<SquatSimulator> {
        let config = PipelineConfig::low_light().with_target(reps);
        let script = calibrated(&config).squats(reps, SQUAT_DOWN, SQUAT_UP);
        build(config, SceneConfig::dim_room(), script, 5)
    }

    /// Camera never delivers a frame
    pub fn camera_unavailable() -> LegDayResult<SquatSimulator> {
        let config = PipelineConfig::default().with_target(3);
        let script = SquatScript::new().offline(Duration::from_secs(10));
        build(config, SceneConfig::default(), script, 6)
    }

    /// Camera misses a fifth of the polls
    pub fn flaky_camera(reps: u32) -> LegDayResult<SquatSimulator> {
        let config = PipelineConfig::default().with_target(reps);
        let script = calibrated(&config).squats(reps, SQUAT_DOWN, SQUAT_UP);
        build(config, SceneConfig::flaky_camera(0.2), script, 7)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_squats() {
        let mut sim = scenarios::clean_squats(10, 10).unwrap();
        let result = sim.run_script().unwrap();

        println!(
            "Clean squats - reps: {}, avg interval: {:.0}ms",
            result.reps(),
            result.avg_rep_interval_ms
        );
        assert_eq!(result.final_phase, SessionPhase::Complete);
        assert_eq!(result.final_count, 10);
        assert_eq!(result.counts(), (1..=10).collect::<Vec<_>>());
        assert_eq!(result.completions(), 1);
        assert!(result.calibrated_at.is_some());
    }

    #[test]
    fn test_fewer_squats_than_target() {
        let mut sim = scenarios::clean_squats(30, 4).unwrap();
        let result = sim.run_script().unwrap();

        assert_eq!(result.final_count, 4);
        assert_eq!(result.final_phase, SessionPhase::Tracking);
        assert!(result.completed_at.is_none());
    }

    #[test]
    fn test_flicker_not_counted() {
        let mut sim = scenarios::flickering_light().unwrap();
        let result = sim.run_script().unwrap();

        assert_eq!(result.reps(), 0);
        assert!(result.transition_times().is_empty());
    }

    #[test]
    fn test_squats_with_flicker() {
        let mut sim = scenarios::squats_with_flicker(5).unwrap();
        let result = sim.run_script().unwrap();
        assert_eq!(result.final_count, 5);
        assert_eq!(result.final_phase, SessionPhase::Complete);
    }

    #[test]
    fn test_too_fast_respects_debounce() {
        let mut sim = scenarios::too_fast(20).unwrap();
        let result = sim.run_script().unwrap();

        println!("Too fast - {} bobs, {} reps", 20, result.reps());
        assert!(result.reps() < 20);
        if let Some(gap) = result.min_transition_gap {
            assert!(gap >= Duration::from_millis(700));
        }
    }

    #[test]
    fn test_dark_room() {
        let mut sim = scenarios::dark_room(5).unwrap();
        let result = sim.run_script().unwrap();

        let baseline = result.baseline.unwrap();
        assert!((10.0..=14.0).contains(&baseline), "baseline {}", baseline);
        assert_eq!(result.final_count, 5);
    }

    #[test]
    fn test_camera_unavailable() {
        let mut sim = scenarios::camera_unavailable().unwrap();
        let result = sim.run_script().unwrap();

        assert_eq!(result.final_phase, SessionPhase::CalibrationFailed);
        assert_eq!(result.final_count, 0);
        assert!(result.baseline.is_none());
        // Ticks at 0, 200, ... 3000ms; the last one closes the window
        assert_eq!(result.total_ticks, 16);
        assert_eq!(result.stats.frames_missing, 15);
    }

    #[test]
    fn test_flaky_camera() {
        let mut sim = scenarios::flaky_camera(10).unwrap();
        let result = sim.run_script().unwrap();

        println!(
            "Flaky camera - reps: {}, missing frames: {}",
            result.final_count, result.stats.frames_missing
        );
        assert!(result.final_count <= 10);
        assert!(result.final_count >= 8);
        assert!(result.stats.frames_missing > 0);
    }

    #[test]
    fn test_same_seed_same_result() {
        let a = scenarios::flaky_camera(5).unwrap().run_script().unwrap();
        let b = scenarios::flaky_camera(5).unwrap().run_script().unwrap();
        assert_eq!(a.events, b.events);
    }
}
