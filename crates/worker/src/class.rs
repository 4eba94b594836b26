/// Execution classes used to label spawned session work in traces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskClass {
	/// Long-lived session task: checkout retries and the sync ticker.
	Lifecycle,
	/// One reconciliation round: sync plus graph refresh.
	Reconcile,
}

impl TaskClass {
	pub(crate) const fn as_str(self) -> &'static str {
		match self {
			Self::Lifecycle => "lifecycle",
			Self::Reconcile => "reconcile",
		}
	}
}
