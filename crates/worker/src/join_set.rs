use std::future::Future;

use tokio::task::{AbortHandle, JoinError, JoinSet};

use crate::TaskClass;

/// Tokio [`JoinSet`] wrapper that spawns onto the worker runtime handle.
#[derive(Debug)]
pub struct WorkerJoinSet<T> {
	class: TaskClass,
	inner: JoinSet<T>,
}

impl<T> WorkerJoinSet<T>
where
	T: Send + 'static,
{
	/// Creates an empty worker join set for the given task class.
	pub fn new(class: TaskClass) -> Self {
		Self { class, inner: JoinSet::new() }
	}

	/// Returns the number of tasks currently in the set.
	pub fn len(&self) -> usize {
		self.inner.len()
	}

	/// Returns `true` if the set is empty.
	pub fn is_empty(&self) -> bool {
		self.inner.is_empty()
	}

	/// Spawns a future into the set on the current worker runtime handle.
	pub fn spawn<F>(&mut self, fut: F) -> AbortHandle
	where
		F: Future<Output = T> + Send + 'static,
	{
		tracing::trace!(worker_class = self.class.as_str(), pending = self.inner.len(), "worker.join_set.spawn");
		let handle = crate::spawn::current_handle();
		self.inner.spawn_on(fut, &handle)
	}

	/// Waits for the next completed task, tagged with its tokio task id.
	pub async fn join_next_with_id(&mut self) -> Option<Result<(tokio::task::Id, T), JoinError>> {
		self.inner.join_next_with_id().await
	}

	/// Aborts every task still in the set. Aborted tasks are still yielded by joins.
	pub fn abort_all(&mut self) {
		tracing::trace!(worker_class = self.class.as_str(), pending = self.inner.len(), "worker.join_set.abort_all");
		self.inner.abort_all();
	}
}
