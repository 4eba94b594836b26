use std::sync::atomic::AtomicBool;
use std::time::Duration;

use async_trait::async_trait;
use otter_primitives::{ChatDocument, ChatMessage, TextDocument};
use otter_sync::{MemoryLog, RemoteOperation, Revision, Snapshot, TransportError};
use pretty_assertions::assert_eq;
use tokio::time::{Instant, sleep};

use super::*;
use crate::config::{Backoff, RetryPolicy};
use crate::graph::NoGraph;

type TextLog = MemoryLog<TextDocument>;

fn editor(log: &TextLog) -> EditorSession<TextLog, TextLog> {
	SyncSession::new("doc", log.clone(), log.clone(), SessionConfig::default())
}

/// Serves a log; when armed, the next pull returns a delete the confirmed
/// document cannot take.
struct Garbled {
	log: TextLog,
	armed: Arc<AtomicBool>,
}

#[async_trait]
impl Transport<TextDocument> for Garbled {
	async fn fetch_snapshot(&self) -> Result<Snapshot<TextDocument>, TransportError> {
		self.log.fetch_snapshot().await
	}

	async fn pull_operations(&self, since: Revision) -> Result<Vec<RemoteOperation>, TransportError> {
		if self.armed.swap(false, Ordering::AcqRel) {
			return Ok(vec![RemoteOperation {
				operation: Operation::delete(0, "zz"),
				revision: since.next(),
			}]);
		}
		self.log.pull_operations(since).await
	}

	async fn push_operations(&self, base: Revision, operations: Vec<Operation>) -> Result<Revision, TransportError> {
		self.log.push_operations(base, operations).await
	}
}

async fn wait_ready<D: Document, T: Transport<D> + 'static, G: GraphReader>(session: &SyncSession<D, T, G>) {
	let mut rx = session.subscribe();
	rx.wait_for(|state| state.ready).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn start_checks_out_and_publishes_ready() {
	let log = TextLog::default();
	log.commit([Operation::insert(0, "seed")]).unwrap();
	let session = editor(&log);
	assert_eq!(session.state().phase, SessionPhase::Idle);

	session.start();
	wait_ready(&session).await;

	let state = session.state();
	assert_eq!(state.content, "seed");
	assert_eq!(state.revision, Revision(1));
	assert_eq!(state.phase, SessionPhase::Ready);
	assert!(session.is_running());
}

#[tokio::test(start_paused = true)]
async fn checkout_retries_with_fixed_delay() {
	let log = TextLog::default();
	log.fail_next(3);
	let session = editor(&log);
	let started = Instant::now();

	session.start();
	wait_ready(&session).await;

	let elapsed = started.elapsed();
	assert!(elapsed >= Duration::from_millis(3000) && elapsed < Duration::from_millis(3100), "{elapsed:?}");
	assert_eq!(log.calls().snapshots, 4);
}

#[tokio::test(start_paused = true)]
async fn bounded_retry_fails_the_session() {
	let log = TextLog::default();
	log.close();
	let config = SessionConfig {
		retry: RetryPolicy {
			max_attempts: Some(2),
			backoff: Backoff::Fixed,
		},
		..SessionConfig::default()
	};
	let session: EditorSession<TextLog> = SyncSession::new("doc", log.clone(), NoGraph, config);

	session.start();
	let mut rx = session.subscribe();
	rx.wait_for(|state| state.phase == SessionPhase::Failed).await.unwrap();

	let state = session.state();
	assert!(!state.ready);
	assert_eq!(state.fault.as_deref(), Some("transport closed"));
	assert_eq!(log.calls().snapshots, 2);
}

#[tokio::test(start_paused = true)]
async fn failed_session_can_be_started_again() {
	let log = TextLog::default();
	log.fail_next(2);
	let config = SessionConfig {
		retry: RetryPolicy {
			max_attempts: Some(2),
			backoff: Backoff::Fixed,
		},
		..SessionConfig::default()
	};
	let session: EditorSession<TextLog> = SyncSession::new("doc", log.clone(), NoGraph, config);

	session.start();
	let mut rx = session.subscribe();
	rx.wait_for(|state| state.phase == SessionPhase::Failed).await.unwrap();
	assert!(!session.is_running());

	session.start();
	wait_ready(&session).await;
	assert!(session.is_running());
	assert_eq!(session.state().phase, SessionPhase::Ready);
	assert_eq!(session.state().fault, None);
	assert_eq!(log.calls().snapshots, 3);
}

#[tokio::test(start_paused = true)]
async fn fault_clears_after_a_clean_sync() {
	let log = TextLog::default();
	let armed = Arc::new(AtomicBool::new(false));
	let transport = Garbled {
		log: log.clone(),
		armed: Arc::clone(&armed),
	};
	let session: EditorSession<Garbled> = SyncSession::new("doc", transport, NoGraph, SessionConfig::default());
	session.start();
	wait_ready(&session).await;
	session.insert(0, "x").unwrap();
	armed.store(true, Ordering::Release);

	// Tick 500ms pulls the bad delete; tick 1000ms syncs cleanly.
	sleep(Duration::from_millis(600)).await;
	assert!(session.state().fault.is_some());
	assert_eq!(session.state().content, "x");

	sleep(Duration::from_millis(500)).await;
	let state = session.state();
	assert_eq!(state.fault, None);
	assert_eq!(state.revision, Revision(1));
	assert_eq!(log.head(), "x");
}

#[tokio::test(start_paused = true)]
async fn edits_publish_before_confirmation() {
	let log = TextLog::default();
	let session = editor(&log);
	session.start();
	wait_ready(&session).await;

	session.insert(0, "hello").unwrap();
	session.replace(0, "h", "j").unwrap();

	let state = session.state();
	assert_eq!(state.content, "jello");
	assert_eq!(state.revision, Revision::ZERO);
	assert_eq!(session.text(), "jello");
}

#[tokio::test(start_paused = true)]
async fn edits_before_checkout_are_refused() {
	let session = editor(&TextLog::default());
	assert!(matches!(session.insert(0, "x"), Err(SyncError::NotReady(_))));
}

#[tokio::test(start_paused = true)]
async fn tick_confirms_edits_and_publishes_graph() {
	let log = TextLog::default();
	let session = editor(&log);
	session.start();
	wait_ready(&session).await;
	session.insert(0, "hi").unwrap();

	sleep(Duration::from_millis(600)).await;

	let state = session.state();
	assert_eq!(state.revision, Revision(1));
	assert_eq!(log.head(), "hi");
	let graph = state.commits_graph.unwrap();
	assert_eq!(graph.head, Revision(1));
	assert_eq!(graph.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn remote_commits_are_pulled_on_tick() {
	let log = TextLog::default();
	let session = editor(&log);
	session.start();
	wait_ready(&session).await;

	log.commit([Operation::insert(0, "remote")]).unwrap();
	let mut rx = session.subscribe();
	rx.wait_for(|state| state.revision == Revision(1)).await.unwrap();
	assert_eq!(session.state().content, "remote");
}

#[tokio::test(start_paused = true)]
async fn ticks_during_slow_sync_are_skipped() {
	let log = TextLog::default();
	let session = editor(&log);
	session.start();
	wait_ready(&session).await;
	log.set_latency(Duration::from_millis(1200));
	session.insert(0, "x").unwrap();

	// First tick at 500ms starts a sync that pulls until 1700ms; ticks at
	// 1000ms and 1500ms find it outstanding.
	sleep(Duration::from_millis(1800)).await;

	assert_eq!(session.reconciliations(), 1);
	assert_eq!(session.skipped_ticks(), 2);
	assert_eq!(log.calls().pulls, 1);
	assert!(session.manager().is_reconciling());
}

#[tokio::test(start_paused = true)]
async fn stale_graph_reads_are_dropped() {
	let log = TextLog::default();
	let session = editor(&log);
	session.start();
	wait_ready(&session).await;
	log.set_graph_latency(Duration::from_millis(700));
	log.commit([Operation::insert(0, "a")]).unwrap();

	// Tick 500ms syncs to r1 and reads its graph until 1200ms. A commit at
	// 800ms is pulled by the 1000ms tick, so the r1 graph is stale on arrival.
	sleep(Duration::from_millis(800)).await;
	log.commit([Operation::insert(1, "b")]).unwrap();
	sleep(Duration::from_millis(500)).await;

	assert_eq!(session.state().revision, Revision(2));
	assert_eq!(session.state().commits_graph, None);

	// The r2 read started at 1000ms lands at 1700ms with r2 still current.
	sleep(Duration::from_millis(500)).await;
	assert_eq!(session.state().commits_graph.map(|graph| graph.head), Some(Revision(2)));
}

#[tokio::test(start_paused = true)]
async fn stop_before_start_is_safe() {
	let session = editor(&TextLog::default());
	session.stop();
	session.stop();
	assert_eq!(session.state().phase, SessionPhase::Stopped);
	assert!(!session.is_running());
	session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn stop_cancels_checkout_retries() {
	let log = TextLog::default();
	log.close();
	let session = editor(&log);
	session.start();

	sleep(Duration::from_millis(2500)).await;
	session.stop();
	let attempts = log.calls().snapshots;
	assert_eq!(attempts, 3);

	sleep(Duration::from_millis(10_000)).await;
	assert_eq!(log.calls().snapshots, attempts);
	assert_eq!(session.state().phase, SessionPhase::Stopped);
}

#[tokio::test(start_paused = true)]
async fn stop_discards_in_flight_sync() {
	let log = TextLog::default();
	let session = editor(&log);
	session.start();
	wait_ready(&session).await;
	log.set_latency(Duration::from_millis(1000));
	session.insert(0, "x").unwrap();

	sleep(Duration::from_millis(600)).await;
	assert!(session.manager().is_reconciling());
	session.stop();

	sleep(Duration::from_millis(5000)).await;
	assert_eq!(session.manager().get_revision(), Revision(1));
	assert_eq!(session.state().revision, Revision::ZERO);
	assert_eq!(session.state().commits_graph, None);
	assert_eq!(log.calls().pulls, 1);
}

#[tokio::test(start_paused = true)]
async fn session_restarts_after_stop() {
	let log = TextLog::default();
	let session = editor(&log);
	session.start();
	wait_ready(&session).await;
	session.shutdown().await;
	assert_eq!(session.state().phase, SessionPhase::Stopped);

	log.commit([Operation::insert(0, "later")]).unwrap();
	session.start();
	let mut rx = session.subscribe();
	rx.wait_for(|state| state.phase == SessionPhase::Ready).await.unwrap();
	assert_eq!(session.state().content, "later");
}

#[tokio::test(start_paused = true)]
async fn chat_sessions_share_messages() {
	let log = MemoryLog::<ChatDocument>::default();
	let alice: ChatSession<_> = SyncSession::new("alice", log.clone(), NoGraph, SessionConfig::default());
	let bob: ChatSession<_> = SyncSession::new("bob", log.clone(), NoGraph, SessionConfig::default());
	alice.start();
	bob.start();
	wait_ready(&alice).await;
	wait_ready(&bob).await;

	let hello = ChatMessage::new(1, "alice", "hello");
	let reply = ChatMessage::new(2, "bob", "hi alice");
	alice.send_message(hello.clone()).unwrap();
	bob.send_message(reply.clone()).unwrap();

	sleep(Duration::from_millis(1100)).await;
	assert_eq!(alice.messages(), vec![hello.clone(), reply.clone()]);
	assert_eq!(bob.messages(), alice.messages());

	alice.delete_message(hello).unwrap();
	sleep(Duration::from_millis(1100)).await;
	assert_eq!(bob.messages(), vec![reply]);
}
