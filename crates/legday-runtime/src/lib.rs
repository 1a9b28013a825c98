//! LegDay Runtime - Session driving and the habit loop around it
//!
//! - `SessionDriver` runs a `RepSession` on a 200 ms tokio interval and hands
//!   back a `SessionHandle` (status, cancel, completion)
//! - `ReminderScheduler` nags until the user acknowledges
//! - `HabitFlow` ties alarm, verification and punishment together
//! - `LegDayConfig` loads all of it from JSON

pub mod config;
pub mod driver;
pub mod flow;
pub mod reminder;
pub mod session;
pub mod source;
pub mod telemetry;

pub use config::*;
pub use driver::*;
pub use flow::*;
pub use reminder::*;
pub use session::*;
pub use source::*;
pub use telemetry::*;
