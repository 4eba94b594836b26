//! The sync loop driver.
//!
//! `start()` spawns one lifecycle task per generation:
//!
//! 1. check out with the configured retry policy, sleeping between attempts;
//! 2. publish the snapshot and mark the session ready;
//! 3. tick every `sync_interval`. A tick claims the re-entrancy gate and spawns
//!    a reconciliation task, or is skipped when the previous one still holds it.
//!
//! A reconciliation releases the gate as soon as `sync()` returns, then
//! publishes content and reads the revision graph. The graph is published
//! only if the confirmed revision did not move during the read.
//!
//! `stop()` cancels the generation token. Sleeps and the ticker end at once;
//! an in-flight transport call runs to completion but its results are not
//! published.

mod chat;
mod editor;
#[cfg(test)]
mod tests;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

pub use chat::ChatSession;
pub use editor::EditorSession;
use otter_primitives::{Document, Operation};
use otter_sync::{Revision, StateManager, SyncError, Transport};
use otter_worker::{GateGuard, GenerationClock, GenerationToken, TaskClass, TaskGate};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::config::SessionConfig;
use crate::graph::GraphReader;
use crate::state::{SessionPhase, SessionState};

type StateOf<D, G> = SessionState<D, <G as GraphReader>::Graph>;

struct Shared<D: Document, T, G: GraphReader> {
	name: String,
	config: SessionConfig,
	manager: StateManager<D, T>,
	graph: G,
	state: watch::Sender<StateOf<D, G>>,
	syncing: TaskGate,
	reconciliations: AtomicU64,
	skipped_ticks: AtomicU64,
}

struct Lifecycle {
	token: GenerationToken,
	task: JoinHandle<()>,
}

/// Drives one [`StateManager`] for the lifetime of a document view.
pub struct SyncSession<D: Document, T, G: GraphReader> {
	shared: Arc<Shared<D, T, G>>,
	clock: GenerationClock,
	lifecycle: Mutex<Option<Lifecycle>>,
}

impl<D, T, G> SyncSession<D, T, G>
where
	D: Document,
	T: Transport<D> + 'static,
	G: GraphReader,
{
	/// Creates an idle session. Nothing runs until [`start`](Self::start).
	pub fn new(name: impl Into<String>, transport: T, graph: G, config: SessionConfig) -> Self {
		let (state, _) = watch::channel(SessionState::default());
		Self {
			shared: Arc::new(Shared {
				name: name.into(),
				config,
				manager: StateManager::new(transport),
				graph,
				state,
				syncing: TaskGate::new(),
				reconciliations: AtomicU64::new(0),
				skipped_ticks: AtomicU64::new(0),
			}),
			clock: GenerationClock::new(),
			lifecycle: Mutex::new(None),
		}
	}

	/// Spawns the lifecycle task. No-op while a previous start is still running.
	///
	/// # Panics
	///
	/// Panics when called outside a Tokio runtime.
	pub fn start(&self) {
		let mut lifecycle = self.lifecycle.lock();
		if lifecycle.as_ref().is_some_and(|running| !running.token.is_cancelled()) {
			return;
		}
		let token = self.clock.issue();
		tracing::debug!(session = %self.shared.name, generation = token.generation(), "session.start");
		let task = otter_worker::spawn(TaskClass::Lifecycle, &self.shared.name, run(Arc::clone(&self.shared), token.clone()));
		*lifecycle = Some(Lifecycle { token, task });
	}

	/// Cancels retry sleeps and the sync ticker. Idempotent; safe before `start`.
	pub fn stop(&self) {
		if let Some(running) = self.lifecycle.lock().as_ref()
			&& !running.token.is_cancelled()
		{
			running.token.cancel();
			tracing::debug!(session = %self.shared.name, generation = running.token.generation(), "session.stop");
		}
		self.shared.state.send_if_modified(|state| {
			if state.phase == SessionPhase::Stopped {
				return false;
			}
			state.phase = SessionPhase::Stopped;
			true
		});
	}

	/// Stops the session and waits for the lifecycle task to exit.
	pub async fn shutdown(&self) {
		self.stop();
		let running = self.lifecycle.lock().take();
		if let Some(Lifecycle { task, .. }) = running {
			let _ = task.await;
		}
	}

	/// Returns true between `start` and `stop`.
	pub fn is_running(&self) -> bool {
		self.lifecycle.lock().as_ref().is_some_and(|running| !running.token.is_cancelled())
	}

	/// Returns the latest published state.
	pub fn state(&self) -> StateOf<D, G> {
		self.shared.state.borrow().clone()
	}

	/// Subscribes to state republications.
	pub fn subscribe(&self) -> watch::Receiver<StateOf<D, G>> {
		self.shared.state.subscribe()
	}

	/// Returns the underlying manager.
	pub fn manager(&self) -> &StateManager<D, T> {
		&self.shared.manager
	}

	/// Name used in logs and task spans.
	pub fn name(&self) -> &str {
		&self.shared.name
	}

	/// Returns the timing configuration the session was built with.
	pub fn config(&self) -> &SessionConfig {
		&self.shared.config
	}

	/// Number of reconciliations started by the ticker.
	pub fn reconciliations(&self) -> u64 {
		self.shared.reconciliations.load(Ordering::Acquire)
	}

	/// Number of ticks dropped because a reconciliation was outstanding.
	pub fn skipped_ticks(&self) -> u64 {
		self.shared.skipped_ticks.load(Ordering::Acquire)
	}

	/// Hands `ops` to the manager and republishes content.
	pub fn apply_operations<I>(&self, ops: I) -> Result<(), SyncError>
	where
		I: IntoIterator<Item = Operation>,
	{
		self.shared.manager.add(ops)?;
		self.shared.publish_view();
		Ok(())
	}
}

impl<D: Document, T, G: GraphReader> Drop for SyncSession<D, T, G> {
	fn drop(&mut self) {
		if let Some(running) = self.lifecycle.get_mut().as_ref() {
			running.token.cancel();
		}
	}
}

async fn run<D, T, G>(shared: Arc<Shared<D, T, G>>, token: GenerationToken)
where
	D: Document,
	T: Transport<D> + 'static,
	G: GraphReader,
{
	if shared.checkout(&token).await {
		shared.tick_loop(&token).await;
	}
	tracing::debug!(session = %shared.name, generation = token.generation(), "session.lifecycle.exit");
}

impl<D, T, G> Shared<D, T, G>
where
	D: Document,
	T: Transport<D> + 'static,
	G: GraphReader,
{
	/// Returns true once checked out; false when cancelled or out of attempts.
	async fn checkout(&self, token: &GenerationToken) -> bool {
		if token.is_cancelled() {
			return false;
		}
		self.state.send_modify(|state| state.phase = SessionPhase::CheckingOut);
		let mut failures = 0u32;
		loop {
			let result = self.manager.checkout().await;
			if token.is_cancelled() {
				return false;
			}
			let error = match result {
				Ok(revision) => {
					let content = self.manager.get_state();
					self.state.send_modify(|state| {
						state.content = content;
						state.revision = revision;
						state.ready = true;
						state.phase = SessionPhase::Ready;
						state.fault = None;
					});
					tracing::info!(session = %self.name, %revision, attempts = failures + 1, "session.ready");
					return true;
				}
				Err(error) => error,
			};

			failures = failures.saturating_add(1);
			let Some(delay) = self.config.checkout_retry_delay(failures) else {
				tracing::error!(session = %self.name, %error, attempts = failures, "session.checkout.exhausted");
				// Ends the generation so a later `start` runs a fresh one.
				token.cancel();
				self.state.send_modify(|state| {
					state.phase = SessionPhase::Failed;
					state.fault = Some(error.to_string());
				});
				return false;
			};
			tracing::warn!(session = %self.name, %error, attempt = failures, delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX), "session.checkout.retry");
			if !token.sleep(delay).await {
				return false;
			}
		}
	}

	async fn tick_loop(self: &Arc<Self>, token: &GenerationToken) {
		let period = self.config.sync_interval();
		let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
		ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
		while token.run_until_cancelled(ticker.tick()).await.is_some() {
			self.tick(token);
		}
	}

	fn tick(self: &Arc<Self>, token: &GenerationToken) {
		let Some(guard) = self.syncing.try_enter() else {
			let skipped = self.skipped_ticks.fetch_add(1, Ordering::AcqRel) + 1;
			tracing::trace!(session = %self.name, skipped, "session.tick.skipped");
			return;
		};
		self.reconciliations.fetch_add(1, Ordering::AcqRel);
		let shared = Arc::clone(self);
		let token = token.clone();
		otter_worker::spawn(TaskClass::Reconcile, &self.name, async move { shared.reconcile(guard, token).await });
	}

	async fn reconcile(&self, guard: GateGuard, token: GenerationToken) {
		let result = self.manager.sync().await;
		drop(guard);
		if token.is_cancelled() {
			tracing::trace!(session = %self.name, "session.reconcile.discarded");
			return;
		}

		match result {
			Ok(_) => {
				self.state.send_if_modified(|state| state.fault.take().is_some());
			}
			Err(error) if error.is_transient() => {
				tracing::debug!(session = %self.name, %error, "session.sync.failed");
				return;
			}
			Err(error) => {
				tracing::error!(session = %self.name, %error, "session.sync.diverged");
				self.state.send_modify(|state| state.fault = Some(error.to_string()));
				self.publish_view();
				return;
			}
		}

		let revision = self.publish_view();
		let graph = self.graph.get_graph(revision).await;
		if token.is_cancelled() {
			return;
		}
		match graph {
			Ok(graph) if self.manager.get_revision() == revision => {
				self.state.send_modify(|state| state.commits_graph = Some(graph));
			}
			Ok(_) => tracing::trace!(session = %self.name, %revision, "session.graph.stale"),
			Err(error) => tracing::debug!(session = %self.name, %error, "session.graph.failed"),
		}
	}

	/// Publishes the manager's current content and revision; returns the revision.
	fn publish_view(&self) -> Revision {
		let (content, revision) = self.manager.view();
		self.state.send_if_modified(|state| {
			if state.revision == revision && state.content == content {
				return false;
			}
			state.content = content;
			state.revision = revision;
			true
		});
		revision
	}
}
