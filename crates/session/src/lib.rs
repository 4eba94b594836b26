//! Session driver for OT-synchronized documents.
//!
//! A [`SyncSession`] owns one [`StateManager`](otter_sync::StateManager): it
//! checks the document out with a configurable retry policy, reconciles on a
//! fixed interval without ever overlapping two syncs, and republishes the
//! derived [`SessionState`] through a watch channel.

mod config;
mod graph;
mod session;
mod state;

pub use config::{Backoff, ConfigError, RetryPolicy, SessionConfig};
pub use graph::{GraphReader, NoGraph};
pub use session::{ChatSession, EditorSession, SyncSession};
pub use state::{SessionPhase, SessionState};
