//! LegDay Core - Fundamental types and primitives
//!
//! This crate defines the core types used throughout the rep counter:
//! - Frames handed over by a frame source
//! - Session-relative time (TickTime)
//! - Gesture states and session phases
//! - Error taxonomy

pub mod error;
pub mod frame;
pub mod state;
pub mod time;

pub use error::*;
pub use frame::*;
pub use state::*;
pub use time::*;
