use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Issues one [`GenerationToken`] per lifecycle of an owner.
///
/// Generations start at 1 and tell work left over from an earlier start
/// apart from the current one in logs.
#[derive(Debug, Default)]
pub struct GenerationClock {
	issued: AtomicU64,
}

impl GenerationClock {
	pub fn new() -> Self {
		Self::default()
	}

	/// Issues a fresh, uncancelled token for the next generation.
	pub fn issue(&self) -> GenerationToken {
		GenerationToken {
			generation: self.issued.fetch_add(1, Ordering::AcqRel).wrapping_add(1),
			cancel: CancellationToken::new(),
		}
	}

	/// Returns the number of generations issued so far.
	pub fn issued(&self) -> u64 {
		self.issued.load(Ordering::Acquire)
	}
}

/// Cancellation scoped to one generation. Clones share cancellation.
#[derive(Debug, Clone)]
pub struct GenerationToken {
	generation: u64,
	cancel: CancellationToken,
}

impl GenerationToken {
	/// Generation this token was issued for, starting at 1.
	pub const fn generation(&self) -> u64 {
		self.generation
	}

	/// Returns true once cancellation was requested.
	pub fn is_cancelled(&self) -> bool {
		self.cancel.is_cancelled()
	}

	/// Requests cancellation. Idempotent.
	pub fn cancel(&self) {
		self.cancel.cancel();
	}

	/// Resolves once cancellation is requested.
	pub async fn cancelled(&self) {
		self.cancel.cancelled().await;
	}

	/// Drives `fut` until it completes or the token is cancelled, whichever is first.
	///
	/// Returns `None` on cancellation; `fut` is dropped at its current await point.
	pub async fn run_until_cancelled<F: Future>(&self, fut: F) -> Option<F::Output> {
		tokio::select! {
			biased;
			_ = self.cancel.cancelled() => None,
			out = fut => Some(out),
		}
	}

	/// Sleeps for `delay`. Returns false when cancelled first.
	pub async fn sleep(&self, delay: Duration) -> bool {
		self.run_until_cancelled(tokio::time::sleep(delay)).await.is_some()
	}
}
