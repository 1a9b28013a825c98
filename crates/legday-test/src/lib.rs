//! LegDay Test Harness - Simulation and scenario testing
//!
//! This crate provides:
//! - Synthetic camera scenes with seeded sensor noise
//! - Scripted frame sources on simulated or tokio clocks
//! - A squat simulator that runs whole sessions deterministically
//! - Predefined scenarios (clean squats, flicker, too fast, dark room,
//!   missing camera)

pub mod scene;
pub mod simulator;

pub use scene::*;
pub use simulator::*;
