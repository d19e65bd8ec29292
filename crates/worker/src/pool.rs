use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use tokio::task::{JoinError, Id as TaskId};
use tokio_util::sync::CancellationToken;

use crate::join_set::WorkerJoinSet;
use crate::token::{UnitId, UnitToken};
use crate::{TaskClass, join_error_panic_message};

/// Terminal report for one submitted unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitExit<T> {
	/// The unit ran to completion and produced an output.
	Finished { unit: UnitId, output: T },
	/// The unit was force-aborted before it produced an output.
	Aborted { unit: UnitId },
	/// The unit panicked.
	Panicked { unit: UnitId, message: Option<String> },
}

impl<T> UnitExit<T> {
	/// Returns the unit this exit belongs to.
	pub fn unit(&self) -> UnitId {
		match self {
			Self::Finished { unit, .. } | Self::Aborted { unit } | Self::Panicked { unit, .. } => *unit,
		}
	}

	/// Returns the output of a finished unit.
	pub fn into_output(self) -> Option<T> {
		match self {
			Self::Finished { output, .. } => Some(output),
			_ => None,
		}
	}
}

/// Outcome of [`WorkerPool::shutdown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolShutdown {
	/// Every unit observed cancellation and returned within the grace period.
	pub cooperative: bool,
	/// Units still running after the grace period, which were aborted.
	pub aborted: usize,
}

/// Pool of independently scheduled units sharing one cancellation scope.
///
/// Units are submitted as closures receiving their [`UnitToken`]; exits are
/// collected in completion order and handed out by [`Self::take_exits`].
#[derive(Debug)]
pub struct WorkerPool<T> {
	class: TaskClass,
	tasks: WorkerJoinSet<T>,
	units: HashMap<TaskId, UnitId>,
	cancel: CancellationToken,
	next_unit: u64,
	exits: Vec<UnitExit<T>>,
}

impl<T> WorkerPool<T>
where
	T: Send + 'static,
{
	/// Creates an empty pool whose units run under `class`.
	pub fn new(class: TaskClass) -> Self {
		Self {
			class,
			tasks: WorkerJoinSet::new(class),
			units: HashMap::new(),
			cancel: CancellationToken::new(),
			next_unit: 0,
			exits: Vec::new(),
		}
	}

	/// Submits one unit of work and returns its id.
	pub fn submit<F, Fut>(&mut self, unit: F) -> UnitId
	where
		F: FnOnce(UnitToken) -> Fut,
		Fut: Future<Output = T> + Send + 'static,
	{
		let id = UnitId::new(self.next_unit);
		self.next_unit = self.next_unit.wrapping_add(1);
		let token = UnitToken::new(id, self.cancel.child_token());
		let handle = self.tasks.spawn(unit(token));
		self.units.insert(handle.id(), id);
		tracing::trace!(worker_class = self.class.as_str(), unit = id.get(), "worker.pool.submit");
		id
	}

	/// Number of units that have not exited yet.
	pub fn pending(&self) -> usize {
		self.tasks.len()
	}

	/// Waits until every submitted unit has exited or `timeout` elapses.
	///
	/// Returns `true` when all units exited in time. Units still running on
	/// timeout are left untouched.
	pub async fn await_all_with_timeout(&mut self, timeout: Duration) -> bool {
		let deadline = tokio::time::Instant::now() + timeout;
		while !self.tasks.is_empty() {
			match tokio::time::timeout_at(deadline, self.tasks.join_next_with_id()).await {
				Ok(Some(res)) => self.record(res),
				Ok(None) => break,
				Err(_) => {
					tracing::debug!(worker_class = self.class.as_str(), pending = self.tasks.len(), "worker.pool.await_timeout");
					return false;
				}
			}
		}
		true
	}

	/// Requests cooperative cancellation of every unit still running.
	pub fn cancel_remaining(&self) {
		tracing::debug!(worker_class = self.class.as_str(), pending = self.tasks.len(), "worker.pool.cancel");
		self.cancel.cancel();
	}

	/// Cancels remaining units, waits `grace` for them, then aborts stragglers.
	///
	/// Always returns with the pool drained.
	pub async fn shutdown(&mut self, grace: Duration) -> PoolShutdown {
		self.cancel_remaining();
		if self.await_all_with_timeout(grace).await {
			return PoolShutdown {
				cooperative: true,
				aborted: 0,
			};
		}

		let aborted = self.tasks.len();
		tracing::warn!(worker_class = self.class.as_str(), stragglers = aborted, "worker.pool.abort");
		self.tasks.abort_all();
		while let Some(res) = self.tasks.join_next_with_id().await {
			self.record(res);
		}
		PoolShutdown { cooperative: false, aborted }
	}

	/// Drains the exits collected so far, in completion order.
	pub fn take_exits(&mut self) -> Vec<UnitExit<T>> {
		std::mem::take(&mut self.exits)
	}

	fn record(&mut self, res: Result<(TaskId, T), JoinError>) {
		let exit = match res {
			Ok((task, output)) => {
				let Some(unit) = self.units.remove(&task) else {
					tracing::warn!(worker_class = self.class.as_str(), "worker.pool.unknown_task");
					return;
				};
				UnitExit::Finished { unit, output }
			}
			Err(err) => {
				let Some(unit) = self.units.remove(&err.id()) else {
					tracing::warn!(worker_class = self.class.as_str(), "worker.pool.unknown_task");
					return;
				};
				if err.is_panic() {
					let message = join_error_panic_message(err);
					tracing::warn!(worker_class = self.class.as_str(), unit = unit.get(), message = ?message, "worker.pool.panic");
					UnitExit::Panicked { unit, message }
				} else {
					UnitExit::Aborted { unit }
				}
			}
		};
		self.exits.push(exit);
	}
}
