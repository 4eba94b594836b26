//! Session tunables, loadable from TOML.
//!
//! ```toml
//! reconnect_delay_ms = 1000
//! sync_interval_ms = 500
//!
//! [retry]
//! max_attempts = 8
//! backoff = { kind = "exponential", max_delay_ms = 60000 }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors loading a [`SessionConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error reading a configuration file.
	#[error("I/O error reading {path}: {error}")]
	Io {
		/// Path to the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},
	/// The file is not a valid session config.
	#[error("invalid session config: {0}")]
	Parse(#[from] toml::de::Error),
}

/// Driver timing configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
	/// Base delay between checkout attempts, in milliseconds.
	pub reconnect_delay_ms: u64,
	/// Period of the sync ticker, in milliseconds.
	pub sync_interval_ms: u64,
	/// Checkout retry policy.
	pub retry: RetryPolicy,
}

impl Default for SessionConfig {
	fn default() -> Self {
		Self {
			reconnect_delay_ms: 1000,
			sync_interval_ms: 500,
			retry: RetryPolicy::default(),
		}
	}
}

impl SessionConfig {
	/// Parses a config from TOML text. Missing keys take their defaults.
	pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
		Ok(toml::from_str(text)?)
	}

	/// Reads and parses a TOML config file.
	pub fn load(path: &Path) -> Result<Self, ConfigError> {
		let text = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		Self::from_toml_str(&text)
	}

	/// Base checkout retry delay.
	pub fn reconnect_delay(&self) -> Duration {
		Duration::from_millis(self.reconnect_delay_ms)
	}

	/// Ticker period; never zero.
	pub fn sync_interval(&self) -> Duration {
		Duration::from_millis(self.sync_interval_ms.max(1))
	}

	/// Delay before the next checkout after `failures` failed attempts, or
	/// `None` once the policy gives up.
	pub fn checkout_retry_delay(&self, failures: u32) -> Option<Duration> {
		self.retry.delay(failures, self.reconnect_delay())
	}
}

/// How checkout failures are retried.
///
/// The default retries forever with a fixed delay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryPolicy {
	/// Total checkout attempts before the session fails; unbounded when unset.
	pub max_attempts: Option<u32>,
	/// Delay growth between attempts.
	pub backoff: Backoff,
}

/// Growth of the delay between attempts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Backoff {
	/// Always wait the base delay.
	#[default]
	Fixed,
	/// Double the delay after every failure, up to `max_delay_ms`.
	Exponential {
		/// Upper bound for a single delay, in milliseconds.
		max_delay_ms: u64,
	},
}

impl RetryPolicy {
	/// Returns the delay after `failures` consecutive failures, starting from `base`.
	pub fn delay(&self, failures: u32, base: Duration) -> Option<Duration> {
		if self.max_attempts.is_some_and(|max| failures >= max) {
			return None;
		}
		Some(match self.backoff {
			Backoff::Fixed => base,
			Backoff::Exponential { max_delay_ms } => {
				let factor = 1u32.checked_shl(failures.saturating_sub(1)).unwrap_or(u32::MAX);
				base.saturating_mul(factor).min(Duration::from_millis(max_delay_ms))
			}
		})
	}
}
