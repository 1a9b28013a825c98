//! Synthetic camera scenes
//!
//! Models a phone lying face-up on the floor:
//! - a room of roughly constant brightness
//! - a body that darkens the view while squatting over the lens
//! - sensor noise, per pixel and per frame
//! - light flicker and camera dropouts

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use legday_core::{Frame, PixelFormat, TickTime};
use legday_runtime::FrameSource;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Lighting and sensor parameters
#[derive(Clone, Debug)]
pub struct SceneConfig {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    /// Brightness with nobody over the camera
    pub room_brightness: u8,
    /// Brightness with the body over the camera
    pub covered_brightness: u8,
    /// Uniform noise amplitude per pixel
    pub pixel_noise: u8,
    /// Uniform noise amplitude applied to the whole frame
    pub frame_noise: u8,
    /// Probability a frame is not ready on a given poll
    pub dropout: f64,
}

impl Default for SceneConfig {
    fn default() -> Self {
        SceneConfig {
            width: 64,
            height: 48,
            format: PixelFormat::Rgba8,
            room_brightness: 160,
            covered_brightness: 60,
            pixel_noise: 6,
            frame_noise: 4,
            dropout: 0.0,
        }
    }
}

impl SceneConfig {
    /// Clean lab conditions
    pub fn bright_room() -> Self {
        SceneConfig {
            pixel_noise: 0,
            frame_noise: 0,
            ..Default::default()
        }
    }

    /// Evening with the lamp off
    pub fn dim_room() -> Self {
        SceneConfig {
            format: PixelFormat::Gray8,
            room_brightness: 12,
            covered_brightness: 4,
            pixel_noise: 2,
            frame_noise: 1,
            ..Default::default()
        }
    }

    /// Camera that misses some polls
    pub fn flaky_camera(dropout: f64) -> Self {
        SceneConfig {
            dropout,
            ..Default::default()
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Cover {
    /// Subject squatting over the lens
    Body,
    /// Short dip in room light
    Flicker,
    /// Camera produced nothing
    Offline,
}

#[derive(Clone, Copy, Debug)]
struct Segment {
    start: TickTime,
    end: TickTime,
    cover: Cover,
}

/// What happens in front of the camera, over time
///
/// Built with a cursor: each call appends a segment starting where the
/// previous one ended.
#[derive(Clone, Debug, Default)]
pub struct SquatScript {
    segments: Vec<Segment>,
    cursor: TickTime,
    squats: u32,
}

impl SquatScript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Nobody over the camera
    pub fn stand(mut self, duration: Duration) -> Self {
        self.cursor = self.cursor + duration;
        self
    }

    /// Body over the camera for `duration`
    pub fn squat(mut self, duration: Duration) -> Self {
        self.squats += 1;
        self.push(duration, Cover::Body)
    }

    /// `count` squats, each `down` then `up`
    pub fn squats(mut self, count: u32, down: Duration, up: Duration) -> Self {
        for _ in 0..count {
            self = self.squat(down).stand(up);
        }
        self
    }

    /// Room light dips for `duration`
    pub fn flicker(self, duration: Duration) -> Self {
        self.push(duration, Cover::Flicker)
    }

    /// Camera produces no frames for `duration`
    pub fn offline(self, duration: Duration) -> Self {
        self.push(duration, Cover::Offline)
    }

    fn push(mut self, duration: Duration, cover: Cover) -> Self {
        let start = self.cursor;
        self.cursor = start + duration;
        self.segments.push(Segment {
            start,
            end: self.cursor,
            cover,
        });
        self
    }

    fn cover_at(&self, at: TickTime) -> Option<Cover> {
        self.segments
            .iter()
            .find(|s| s.start <= at && at < s.end)
            .map(|s| s.cover)
    }

    /// Squats scripted
    pub fn squat_count(&self) -> u32 {
        self.squats
    }

    /// End of the last segment
    pub fn duration(&self) -> Duration {
        self.cursor.since(TickTime::ZERO)
    }
}

/// Renders a script into frames
pub struct SyntheticScene {
    config: SceneConfig,
    script: SquatScript,
    rng: StdRng,
}

impl SyntheticScene {
    pub fn new(config: SceneConfig, script: SquatScript, seed: u64) -> Self {
        SyntheticScene {
            config,
            script,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn script(&self) -> &SquatScript {
        &self.script
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// The frame the camera would deliver at `at`, if any
    pub fn frame_at(&mut self, at: TickTime) -> Option<Frame> {
        let cover = self.script.cover_at(at);
        if cover == Some(Cover::Offline) {
            return None;
        }
        if self.config.dropout > 0.0 && self.rng.gen_bool(self.config.dropout.min(1.0)) {
            return None;
        }

        let level = match cover {
            Some(Cover::Body) | Some(Cover::Flicker) => self.config.covered_brightness,
            _ => self.config.room_brightness,
        };
        Some(self.render(level))
    }

    fn render(&mut self, level: u8) -> Frame {
        let frame_noise = jitter(&mut self.rng, self.config.frame_noise);
        let base = level as i32 + frame_noise;

        let pixels = (self.config.width * self.config.height) as usize;
        let channels = self.config.format.channels();
        let mut data = Vec::with_capacity(pixels * channels);

        for _ in 0..pixels {
            let value = (base + jitter(&mut self.rng, self.config.pixel_noise)).clamp(0, 255) as u8;
            match self.config.format {
                PixelFormat::Gray8 => data.push(value),
                PixelFormat::Rgb8 => data.extend_from_slice(&[value, value, value]),
                PixelFormat::Rgba8 => data.extend_from_slice(&[value, value, value, 255]),
            }
        }

        Frame::new(self.config.width, self.config.height, self.config.format, data)
    }
}

fn jitter(rng: &mut StdRng, amplitude: u8) -> i32 {
    if amplitude == 0 {
        return 0;
    }
    let a = amplitude as i32;
    rng.gen_range(-a..=a)
}

/// Manually advanced clock shared between a simulator and its source
#[derive(Clone, Debug, Default)]
pub struct SimClock {
    micros: Arc<AtomicU64>,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> TickTime {
        TickTime::from_micros(self.micros.load(Ordering::SeqCst))
    }

    pub fn advance(&self, by: Duration) {
        self.micros
            .fetch_add(by.as_micros() as u64, Ordering::SeqCst);
    }

    pub fn set(&self, at: TickTime) {
        self.micros.store(at.as_micros(), Ordering::SeqCst);
    }
}

/// Frame source replaying a scene against a clock
pub struct ScriptedSource<C = SimClock> {
    scene: SyntheticScene,
    clock: C,
    polls: u64,
}

/// Anything that can say what time it is in the scene
pub trait SceneClock: Send {
    fn scene_time(&self) -> TickTime;
}

impl SceneClock for SimClock {
    fn scene_time(&self) -> TickTime {
        self.now()
    }
}

/// Scene time from a tokio clock, relative to a start instant
#[derive(Clone, Copy, Debug)]
pub struct TokioClock {
    start: tokio::time::Instant,
}

impl TokioClock {
    pub fn starting_now() -> Self {
        TokioClock {
            start: tokio::time::Instant::now(),
        }
    }
}

impl SceneClock for TokioClock {
    fn scene_time(&self) -> TickTime {
        TickTime::from_elapsed(self.start.elapsed())
    }
}

impl<C: SceneClock> ScriptedSource<C> {
    pub fn new(scene: SyntheticScene, clock: C) -> Self {
        ScriptedSource {
            scene,
            clock,
            polls: 0,
        }
    }

    /// Times the pipeline asked for a frame
    pub fn polls(&self) -> u64 {
        self.polls
    }

    pub fn scene(&self) -> &SyntheticScene {
        &self.scene
    }
}

impl<C: SceneClock> FrameSource for ScriptedSource<C> {
    fn try_get_current_frame(&mut self) -> Option<Frame> {
        self.polls += 1;
        let at = self.clock.scene_time();
        self.scene.frame_at(at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use legday_signal::BrightnessSampler;

    fn brightness(frame: &Frame) -> f64 {
        BrightnessSampler::default()
            .sample(frame, TickTime::ZERO)
            .unwrap()
            .value
    }

    #[test]
    fn test_script_timeline() {
        let script = SquatScript::new()
            .stand(Duration::from_secs(3))
            .squats(2, Duration::from_millis(1200), Duration::from_millis(1600))
            .offline(Duration::from_secs(1));

        assert_eq!(script.squat_count(), 2);
        assert_eq!(script.duration(), Duration::from_millis(3000 + 2 * 2800 + 1000));
        assert_eq!(script.cover_at(TickTime::from_millis(1000)), None);
        assert_eq!(script.cover_at(TickTime::from_millis(3000)), Some(Cover::Body));
        assert_eq!(script.cover_at(TickTime::from_millis(4200)), None);
        assert_eq!(script.cover_at(TickTime::from_millis(8700)), Some(Cover::Offline));
    }

    #[test]
    fn test_clean_frames() {
        let script = SquatScript::new()
            .stand(Duration::from_secs(1))
            .squat(Duration::from_secs(1));
        let mut scene = SyntheticScene::new(SceneConfig::bright_room(), script, 1);

        let standing = scene.frame_at(TickTime::from_millis(500)).unwrap();
        let squatting = scene.frame_at(TickTime::from_millis(1500)).unwrap();
        assert_eq!(brightness(&standing), 160.0);
        assert_eq!(brightness(&squatting), 60.0);
        assert!(standing.validate().is_ok());
    }

    #[test]
    fn test_noise_stays_near_level() {
        let mut scene = SyntheticScene::new(SceneConfig::default(), SquatScript::new(), 7);
        for i in 0..50 {
            let frame = scene.frame_at(TickTime::from_millis(i * 200)).unwrap();
            let value = brightness(&frame);
            assert!((150.0..=170.0).contains(&value), "brightness {}", value);
        }
    }

    #[test]
    fn test_same_seed_same_frames() {
        let mut a = SyntheticScene::new(SceneConfig::default(), SquatScript::new(), 42);
        let mut b = SyntheticScene::new(SceneConfig::default(), SquatScript::new(), 42);
        let at = TickTime::from_millis(200);
        assert_eq!(a.frame_at(at).unwrap().data, b.frame_at(at).unwrap().data);
    }

    #[test]
    fn test_scripted_source_follows_clock() {
        let clock = SimClock::new();
        let script = SquatScript::new()
            .stand(Duration::from_secs(1))
            .offline(Duration::from_secs(1));
        let scene = SyntheticScene::new(SceneConfig::bright_room(), script, 3);
        let mut source = ScriptedSource::new(scene, clock.clone());

        assert!(source.try_get_current_frame().is_some());
        clock.advance(Duration::from_millis(1500));
        assert!(source.try_get_current_frame().is_none());
        clock.set(TickTime::from_secs_f64(2.5));
        assert!(source.try_get_current_frame().is_some());
        assert_eq!(source.polls(), 3);
    }
}
