use std::future::Future;

use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::TaskClass;

/// Spawns an async task on the current runtime, tagged with its class and owner.
///
/// The task runs inside a `worker.task` span so every event it emits carries
/// the owning session's name.
///
/// # Panics
///
/// Panics when called outside a Tokio runtime.
pub fn spawn<F>(class: TaskClass, owner: &str, fut: F) -> JoinHandle<F::Output>
where
	F: Future + Send + 'static,
	F::Output: Send + 'static,
{
	tracing::trace!(worker_class = class.as_str(), owner, "worker.spawn");
	let span = tracing::debug_span!("worker.task", class = class.as_str(), owner = %owner);
	tokio::spawn(fut.instrument(span))
}
