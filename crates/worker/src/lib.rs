//! Task primitives shared by sync sessions.
//!
//! * [`spawn`]: spawn classified tasks on the current runtime
//! * [`GenerationToken`]: cancellation scoped to one session lifecycle
//! * [`TaskGate`]: single-occupancy flag that skips instead of queueing

mod class;
mod gate;
mod spawn;
mod token;

pub use class::TaskClass;
pub use gate::{GateGuard, TaskGate};
pub use spawn::spawn;
pub use token::{GenerationClock, GenerationToken};
