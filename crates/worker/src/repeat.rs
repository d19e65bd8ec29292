use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

use crate::pool::{UnitExit, WorkerPool};
use crate::{TaskClass, spawn_blocking};

/// Upper bound on runs executing at the same time.
pub const DEFAULT_MAX_CONCURRENCY: usize = 100;

/// A synchronous task that declares how many times it is run per submission.
pub trait Repeat: Send + Sync + 'static {
	/// Number of runs scheduled by one [`RepeatExecutor::execute`] call.
	const TIMES: usize;

	/// Executes one run on the blocking pool.
	fn run(&self);
}

/// Error returned when submitting to an executor that was shut down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatError {
	/// [`RepeatExecutor::shutdown`] was already called.
	ShutDown,
}

impl std::fmt::Display for RepeatError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			RepeatError::ShutDown => write!(f, "repeat executor is shut down"),
		}
	}
}

impl std::error::Error for RepeatError {}

/// Summary returned by [`RepeatExecutor::shutdown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RepeatReport {
	pub completed: usize,
	pub failed: usize,
	pub timed_out: bool,
}

/// Executor that submits a [`Repeat`] task as many times as it declares.
#[derive(Debug)]
pub struct RepeatExecutor {
	runs: WorkerPool<bool>,
	permits: Arc<Semaphore>,
	accepting: bool,
}

impl Default for RepeatExecutor {
	fn default() -> Self {
		Self::new(DEFAULT_MAX_CONCURRENCY)
	}
}

impl RepeatExecutor {
	/// Creates an executor running at most `max_concurrency` runs at once.
	///
	/// # Panics
	///
	/// Panics if `max_concurrency` is zero.
	pub fn new(max_concurrency: usize) -> Self {
		assert!(max_concurrency > 0, "max concurrency must be > 0");
		Self {
			runs: WorkerPool::new(TaskClass::Blocking),
			permits: Arc::new(Semaphore::new(max_concurrency)),
			accepting: true,
		}
	}

	/// Submits `task` [`Repeat::TIMES`] times and returns the number of runs scheduled.
	pub fn execute<T: Repeat>(&mut self, task: Arc<T>) -> Result<usize, RepeatError> {
		if !self.accepting {
			return Err(RepeatError::ShutDown);
		}

		for _ in 0..T::TIMES {
			let task = Arc::clone(&task);
			let permits = Arc::clone(&self.permits);
			self.runs.submit(move |_token| async move {
				let Ok(_permit) = permits.acquire_owned().await else {
					return false;
				};
				spawn_blocking(TaskClass::Blocking, move || task.run()).await.is_ok()
			});
		}
		tracing::debug!(times = T::TIMES, pending = self.runs.pending(), "worker.repeat.execute");
		Ok(T::TIMES)
	}

	/// Stops accepting work and waits up to `timeout` for submitted runs.
	///
	/// Runs still queued after the timeout are dropped.
	pub async fn shutdown(&mut self, timeout: Duration) -> RepeatReport {
		self.accepting = false;
		let timed_out = !self.runs.await_all_with_timeout(timeout).await;
		if timed_out {
			self.runs.shutdown(Duration::ZERO).await;
		}

		let mut report = RepeatReport {
			timed_out,
			..RepeatReport::default()
		};
		for exit in self.runs.take_exits() {
			match exit {
				UnitExit::Finished { output: true, .. } => report.completed += 1,
				_ => report.failed += 1,
			}
		}
		tracing::debug!(completed = report.completed, failed = report.failed, timed_out, "worker.repeat.shutdown");
		report
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicUsize, Ordering};

	use super::*;

	#[derive(Default)]
	struct Tally {
		runs: AtomicUsize,
	}

	impl Repeat for Tally {
		const TIMES: usize = 7;

		fn run(&self) {
			self.runs.fetch_add(1, Ordering::SeqCst);
		}
	}

	struct Faulty;

	impl Repeat for Faulty {
		const TIMES: usize = 2;

		fn run(&self) {
			panic!("faulty run");
		}
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
	async fn runs_task_declared_number_of_times() {
		let task = Arc::new(Tally::default());
		let mut executor = RepeatExecutor::new(3);

		assert_eq!(executor.execute(Arc::clone(&task)), Ok(7));
		let report = executor.shutdown(Duration::from_secs(5)).await;

		assert_eq!(report.completed, 7);
		assert_eq!(report.failed, 0);
		assert!(!report.timed_out);
		assert_eq!(task.runs.load(Ordering::SeqCst), 7);
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
	async fn rejects_work_after_shutdown() {
		let mut executor = RepeatExecutor::default();
		executor.shutdown(Duration::from_millis(10)).await;
		assert_eq!(executor.execute(Arc::new(Tally::default())), Err(RepeatError::ShutDown));
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
	async fn panicking_runs_count_as_failed() {
		let mut executor = RepeatExecutor::new(1);
		executor.execute(Arc::new(Faulty)).ok();
		let report = executor.shutdown(Duration::from_secs(5)).await;
		assert_eq!(report.completed, 0);
		assert_eq!(report.failed, 2);
	}
}
