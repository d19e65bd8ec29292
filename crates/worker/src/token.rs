use std::fmt;

use tokio_util::sync::CancellationToken;

/// Identity of one unit of work submitted to a [`crate::WorkerPool`].
///
/// Ids are dense and assigned in submission order, starting at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnitId(u64);

impl UnitId {
	pub(crate) const fn new(raw: u64) -> Self {
		Self(raw)
	}

	/// Returns the raw submission index.
	pub const fn get(self) -> u64 {
		self.0
	}
}

impl fmt::Display for UnitId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "unit#{}", self.0)
	}
}

/// Unit-scoped cancellation token handed to every submitted unit.
///
/// Cancelling the pool cancels every unit token; cancelling a unit token
/// only affects that unit.
#[derive(Debug, Clone)]
pub struct UnitToken {
	unit: UnitId,
	cancel: CancellationToken,
}

impl UnitToken {
	pub(crate) fn new(unit: UnitId, cancel: CancellationToken) -> Self {
		Self { unit, cancel }
	}

	/// Creates a free-standing token, for driving a unit outside a pool.
	pub fn detached(unit: u64) -> Self {
		Self::new(UnitId::new(unit), CancellationToken::new())
	}

	/// Returns the unit this token belongs to.
	pub const fn unit(&self) -> UnitId {
		self.unit
	}

	/// Returns true when cancellation is requested.
	pub fn is_cancelled(&self) -> bool {
		self.cancel.is_cancelled()
	}

	/// Requests cancellation of this unit.
	pub fn cancel(&self) {
		self.cancel.cancel();
	}

	/// Future resolving when cancellation is requested.
	pub async fn cancelled(&self) {
		self.cancel.cancelled().await;
	}

	/// Returns the underlying token, for APIs that take a [`CancellationToken`].
	pub fn as_cancellation(&self) -> &CancellationToken {
		&self.cancel
	}
}
