//! LegDay Signal - Brightness-based repetition counting
//!
//! A camera lying face-up on the floor sees the room. When someone squats
//! over it the frame darkens; when they stand up it brightens again. This
//! crate turns that into a rep count:
//!
//! ```text
//! Frame → BrightnessSampler → SignalSmoother ─┬─ BaselineCalibrator   (calibrating)
//!                                              └─ GestureStateMachine  (tracking) → RepetitionCounter
//! ```
//!
//! Everything here is synchronous and clock-free: callers pass the tick time
//! in. Scheduling, cancellation and completion futures live in
//! `legday-runtime`.

pub mod calibrator;
pub mod counter;
pub mod gesture;
pub mod pipeline;
pub mod sampler;
pub mod smoother;

pub use calibrator::*;
pub use counter::*;
pub use gesture::*;
pub use pipeline::*;
pub use sampler::*;
pub use smoother::*;
