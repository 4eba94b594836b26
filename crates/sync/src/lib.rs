//! Reconciliation of a local optimistic document with a shared revision log.
//!
//! [`StateManager`] owns the confirmed snapshot, the optimistic snapshot and the
//! queue of unconfirmed local operations. It talks to the log through the
//! [`Transport`] contract; [`MemoryLog`] is the in-process implementation.

mod error;
/// State manager lifecycle and reconciliation.
pub mod manager;
/// In-process shared revision log.
pub mod memory;
mod revision;
mod transport;

pub use error::{SyncError, TransportError};
pub use manager::{ManagerPhase, StateManager, SyncOutcome};
pub use memory::{Commit, CommitGraph, GraphNode, LogCalls, MemoryLog};
pub use revision::Revision;
pub use transport::{RemoteOperation, Snapshot, Transport};
