use std::fmt;

/// Confirmed checkpoint in a shared log. Zero is the initial snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Revision(pub u64);

impl Revision {
	/// The revision of a log nothing was committed to.
	pub const ZERO: Self = Self(0);

	/// Returns the raw counter.
	pub const fn get(self) -> u64 {
		self.0
	}

	/// Returns the revision a commit on top of `self` receives.
	pub const fn next(self) -> Self {
		Self(self.0 + 1)
	}
}

impl From<u64> for Revision {
	fn from(value: u64) -> Self {
		Self(value)
	}
}

impl fmt::Display for Revision {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "r{}", self.0)
	}
}
