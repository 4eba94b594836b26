use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Single-occupancy re-entrancy flag.
///
/// Unlike a mutex, a busy gate is never waited on: [`TaskGate::try_enter`]
/// returns `None` and the caller skips its work. The flag is released when
/// the returned guard drops, including when the owning task is aborted.
#[derive(Debug, Clone, Default)]
pub struct TaskGate {
	busy: Arc<AtomicBool>,
}

impl TaskGate {
	/// Creates an open gate.
	pub fn new() -> Self {
		Self::default()
	}

	/// Claims the gate, or returns `None` if it is already held.
	pub fn try_enter(&self) -> Option<GateGuard> {
		self.busy
			.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
			.ok()
			.map(|_| GateGuard { busy: Arc::clone(&self.busy) })
	}

	/// Returns true while a guard is alive.
	pub fn is_busy(&self) -> bool {
		self.busy.load(Ordering::Acquire)
	}
}

/// Releases its [`TaskGate`] on drop.
#[derive(Debug)]
pub struct GateGuard {
	busy: Arc<AtomicBool>,
}

impl Drop for GateGuard {
	fn drop(&mut self) {
		self.busy.store(false, Ordering::Release);
	}
}
