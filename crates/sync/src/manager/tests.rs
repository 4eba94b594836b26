use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use otter_primitives::{ChatDocument, ChatMessage, OtError, TextDocument};
use pretty_assertions::assert_eq;

use super::*;
use crate::error::TransportError;
use crate::memory::MemoryLog;
use crate::transport::RemoteOperation;

async fn ready(log: &MemoryLog<TextDocument>) -> StateManager<TextDocument, MemoryLog<TextDocument>> {
	let manager = StateManager::new(log.clone());
	manager.checkout().await.unwrap();
	manager
}

/// Serves snapshots and pulls from a log but refuses every push.
struct PushRefused(MemoryLog<TextDocument>);

#[async_trait]
impl Transport<TextDocument> for PushRefused {
	async fn fetch_snapshot(&self) -> Result<Snapshot<TextDocument>, TransportError> {
		self.0.fetch_snapshot().await
	}

	async fn pull_operations(&self, since: Revision) -> Result<Vec<RemoteOperation>, TransportError> {
		self.0.pull_operations(since).await
	}

	async fn push_operations(&self, _base: Revision, _operations: Vec<Operation>) -> Result<Revision, TransportError> {
		Err(TransportError::Unavailable("push refused".to_string()))
	}
}

#[tokio::test]
async fn fresh_checkout_is_empty_at_revision_zero() {
	let text = StateManager::new(MemoryLog::<TextDocument>::default());
	assert_eq!(text.phase(), ManagerPhase::Uninitialized);
	assert_eq!(text.checkout().await, Ok(Revision::ZERO));
	assert_eq!(text.get_state(), "");
	assert_eq!(text.phase(), ManagerPhase::Ready);

	let chat = StateManager::new(MemoryLog::<ChatDocument>::default());
	assert_eq!(chat.checkout().await, Ok(Revision::ZERO));
	assert!(chat.get_state().is_empty());
}

#[tokio::test]
async fn local_edit_is_visible_before_confirmation() {
	let log = MemoryLog::default();
	let manager = ready(&log).await;

	manager.add([Operation::insert(0, "hi")]).unwrap();
	assert_eq!(manager.get_state(), "hi");
	assert_eq!(manager.get_revision(), Revision::ZERO);
	assert_eq!(manager.pending_len(), 1);
	assert_eq!(log.head(), "");
}

#[tokio::test]
async fn sync_confirms_local_edit() {
	let log = MemoryLog::default();
	let manager = ready(&log).await;
	manager.add([Operation::insert(0, "hi")]).unwrap();

	let outcome = manager.sync().await.unwrap();
	assert_eq!(
		outcome,
		SyncOutcome {
			revision: Revision(1),
			pulled: 0,
			pushed: 1,
		}
	);
	assert_eq!(manager.get_revision(), Revision(1));
	assert_eq!(manager.pending_len(), 0);
	assert_eq!(manager.get_state(), "hi");
	assert_eq!(log.head(), "hi");
}

#[tokio::test]
async fn concurrent_inserts_at_same_position_converge() {
	let log = MemoryLog::default();
	let a = ready(&log).await;
	let b = ready(&log).await;

	a.add([Operation::insert(0, "A")]).unwrap();
	b.add([Operation::insert(0, "B")]).unwrap();

	b.sync().await.unwrap();
	let outcome = a.sync().await.unwrap();
	assert_eq!(outcome.pulled, 1);
	assert_eq!(outcome.revision, Revision(2));
	b.sync().await.unwrap();

	assert_eq!(a.get_state(), "BA");
	assert_eq!(b.get_state(), "BA");
	assert_eq!(log.head(), "BA");
	assert_eq!(a.get_revision(), b.get_revision());
}

#[tokio::test]
async fn out_of_range_delete_is_rejected() {
	let manager = ready(&MemoryLog::new(TextDocument::from("abc"))).await;

	let err = manager.add([Operation::delete(5, "xyz")]).unwrap_err();
	assert_eq!(err, SyncError::Document(OtError::OutOfRange { position: 5, len: 3 }));
	assert!(!err.is_transient());
	assert_eq!(manager.pending_len(), 0);
	assert_eq!(manager.get_state(), "abc");
}

#[tokio::test]
async fn add_is_all_or_nothing() {
	let manager = ready(&MemoryLog::new(TextDocument::from("abc"))).await;

	let err = manager.add([Operation::insert(0, "x"), Operation::delete(1, "zz")]).unwrap_err();
	assert!(matches!(err, SyncError::Document(OtError::ContentMismatch { .. })));
	assert_eq!(manager.get_state(), "abc");
	assert_eq!(manager.pending_len(), 0);
}

#[tokio::test]
async fn empty_operations_are_not_queued() {
	let manager = ready(&MemoryLog::default()).await;
	manager.add([Operation::insert(40, ""), Operation::delete(7, "")]).unwrap();
	assert_eq!(manager.pending_len(), 0);
}

#[tokio::test]
async fn edits_require_checkout() {
	let manager = StateManager::new(MemoryLog::<TextDocument>::default());
	assert_eq!(manager.add([Operation::insert(0, "x")]), Err(SyncError::NotReady(ManagerPhase::Uninitialized)));
	assert_eq!(manager.sync().await, Err(SyncError::NotReady(ManagerPhase::Uninitialized)));
}

#[tokio::test]
async fn failed_checkout_can_be_retried() {
	let log = MemoryLog::<TextDocument>::default();
	log.commit([Operation::insert(0, "seed")]).unwrap();
	let manager = StateManager::new(log.clone());

	log.fail_next(1);
	let err = manager.checkout().await.unwrap_err();
	assert!(err.is_transient());
	assert_eq!(manager.phase(), ManagerPhase::CheckingOut);
	assert_eq!(manager.get_state(), "");

	assert_eq!(manager.checkout().await, Ok(Revision(1)));
	assert_eq!(manager.get_state(), "seed");
}

#[tokio::test]
async fn checkout_drops_pending_operations() {
	let log = MemoryLog::default();
	let manager = ready(&log).await;
	manager.add([Operation::insert(0, "lost")]).unwrap();
	log.commit([Operation::insert(0, "kept")]).unwrap();

	assert_eq!(manager.checkout().await, Ok(Revision(1)));
	assert_eq!(manager.get_state(), "kept");
	assert_eq!(manager.pending_len(), 0);
}

#[tokio::test]
async fn failed_pull_leaves_state_untouched() {
	let log = MemoryLog::default();
	let manager = ready(&log).await;
	manager.add([Operation::insert(0, "hi")]).unwrap();
	log.commit([Operation::insert(0, "remote ")]).unwrap();

	log.fail_next(1);
	let err = manager.sync().await.unwrap_err();
	assert!(err.is_transient());
	assert_eq!(manager.get_state(), "hi");
	assert_eq!(manager.get_revision(), Revision::ZERO);
	assert_eq!(manager.pending_len(), 1);

	manager.sync().await.unwrap();
	assert_eq!(manager.get_state(), "remote hi");
	assert_eq!(manager.get_revision(), Revision(2));
}

#[tokio::test]
async fn failed_push_leaves_state_untouched() {
	let log = MemoryLog::default();
	log.commit([Operation::insert(0, "abc")]).unwrap();
	let manager = StateManager::new(PushRefused(log.clone()));
	manager.checkout().await.unwrap();
	manager.add([Operation::insert(3, "d")]).unwrap();
	log.commit([Operation::delete(0, "a")]).unwrap();

	assert_eq!(
		manager.sync().await,
		Err(SyncError::Transport(TransportError::Unavailable("push refused".to_string())))
	);
	assert_eq!(manager.get_state(), "abcd");
	assert_eq!(manager.get_revision(), Revision(1));
	assert_eq!(manager.pending_len(), 1);
}

#[tokio::test(start_paused = true)]
async fn conflicting_push_is_retried_by_next_sync() {
	let log = MemoryLog::default();
	let manager = Arc::new(ready(&log).await);
	manager.add([Operation::insert(0, "mine")]).unwrap();
	log.set_latency(Duration::from_millis(50));

	let syncing = tokio::spawn({
		let manager = Arc::clone(&manager);
		async move { manager.sync().await }
	});
	// Lands between the pull and the push.
	tokio::time::sleep(Duration::from_millis(75)).await;
	log.commit([Operation::insert(0, "theirs ")]).unwrap();

	let err = syncing.await.unwrap().unwrap_err();
	assert_eq!(
		err,
		SyncError::Transport(TransportError::Conflict {
			base: Revision(0),
			head: Revision(1),
		})
	);
	assert_eq!(manager.get_state(), "mine");

	log.set_latency(Duration::ZERO);
	manager.sync().await.unwrap();
	assert_eq!(manager.get_state(), "theirs mine");
	assert_eq!(log.head(), "theirs mine");
	assert_eq!(manager.get_revision(), Revision(2));
}

#[tokio::test]
async fn empty_remote_push_does_not_stall_sync() {
	let log = MemoryLog::default();
	let manager = ready(&log).await;
	let other = log.clone();
	assert_eq!(other.push_operations(Revision::ZERO, Vec::new()).await, Ok(Revision::ZERO));

	manager.add([Operation::insert(0, "hi")]).unwrap();
	let outcome = manager.sync().await.unwrap();
	assert_eq!(outcome.revision, Revision(1));
	assert_eq!(manager.pending_len(), 0);
	assert_eq!(log.head(), "hi");
}

#[tokio::test(start_paused = true)]
async fn edits_during_sync_are_rebased_and_kept() {
	let log = MemoryLog::default();
	let manager = Arc::new(ready(&log).await);
	log.commit([Operation::insert(0, ">> ")]).unwrap();
	manager.add([Operation::insert(0, "hi")]).unwrap();
	log.set_latency(Duration::from_millis(100));

	let syncing = tokio::spawn({
		let manager = Arc::clone(&manager);
		async move { manager.sync().await }
	});
	tokio::task::yield_now().await;
	assert!(manager.is_reconciling());
	assert_eq!(manager.sync().await, Err(SyncError::SyncInFlight));

	manager.add([Operation::insert(2, "!")]).unwrap();
	assert_eq!(manager.get_state(), "hi!");

	let outcome = syncing.await.unwrap().unwrap();
	assert_eq!(outcome.revision, Revision(2));
	assert_eq!(log.head(), ">> hi");
	assert_eq!(manager.get_state(), ">> hi!");
	assert_eq!(manager.pending_len(), 1);

	manager.sync().await.unwrap();
	assert_eq!(log.head(), ">> hi!");
	assert_eq!(manager.pending_len(), 0);
}

#[tokio::test]
async fn revision_is_monotonic_and_idle_sync_pushes_nothing() {
	let log = MemoryLog::default();
	let manager = ready(&log).await;
	let mut last = manager.get_revision();

	for round in 0..4u64 {
		if round % 2 == 0 {
			manager.add([Operation::insert(0, "x")]).unwrap();
		}
		let outcome = manager.sync().await.unwrap();
		assert!(outcome.revision >= last);
		if outcome.pushed == 0 && outcome.pulled == 0 {
			assert_eq!(outcome.revision, last);
		}
		last = outcome.revision;
	}
	assert_eq!(last, Revision(2));
	assert_eq!(log.calls().pushes, 2);
}

#[tokio::test]
async fn typing_is_squashed_into_one_commit() {
	let log = MemoryLog::default();
	let manager = ready(&log).await;
	for (i, ch) in "hey".chars().enumerate() {
		manager.add([Operation::insert(i, ch.to_string())]).unwrap();
	}
	manager.sync().await.unwrap();
	assert_eq!(log.commits()[0].operations, vec![Operation::insert(0, "hey")]);
}

#[tokio::test]
async fn concurrent_chat_removal_wins() {
	let log = MemoryLog::<ChatDocument>::default();
	let hello = ChatMessage::new(1, "ana", "hello");
	log.commit([Operation::add_message(hello.clone())]).unwrap();

	let a = StateManager::new(log.clone());
	let b = StateManager::new(log.clone());
	a.checkout().await.unwrap();
	b.checkout().await.unwrap();

	a.add([Operation::remove_message(hello.clone())]).unwrap();
	b.add([Operation::add_message(hello.clone()), Operation::add_message(ChatMessage::new(2, "bo", "hi"))]).unwrap();

	a.sync().await.unwrap();
	b.sync().await.unwrap();
	a.sync().await.unwrap();

	assert_eq!(a.get_state(), b.get_state());
	assert!(!a.get_state().contains(&hello));
	assert_eq!(a.get_state().len(), 1);
}
