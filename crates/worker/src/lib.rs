//! Worker pool primitives for independently scheduled units of work.
//!
//! Units are spawned onto the ambient tokio runtime, tagged with a
//! [`TaskClass`] for tracing, and observe cooperative cancellation through a
//! [`UnitToken`]. A [`WorkerPool`] owns a batch of units and offers bounded
//! joins and forced shutdown; [`RepeatExecutor`] submits a task as many times
//! as it declares.

mod class;
mod join_set;
mod pool;
mod repeat;
mod spawn;
mod token;

pub use class::TaskClass;
pub use join_set::WorkerJoinSet;
pub use pool::{PoolShutdown, UnitExit, WorkerPool};
pub use repeat::{DEFAULT_MAX_CONCURRENCY, Repeat, RepeatError, RepeatExecutor, RepeatReport};
pub use spawn::{spawn, spawn_blocking};
pub use token::{UnitId, UnitToken};
pub use tokio_util::sync::CancellationToken;

/// Extracts the panic message from a failed join, if the task panicked.
///
/// Returns `None` for cancelled tasks.
pub fn join_error_panic_message(err: tokio::task::JoinError) -> Option<String> {
	let payload = err.try_into_panic().ok()?;
	if let Some(msg) = payload.downcast_ref::<&'static str>() {
		return Some((*msg).to_string());
	}
	if let Some(msg) = payload.downcast_ref::<String>() {
		return Some(msg.clone());
	}
	Some("<non-string panic payload>".to_string())
}

#[cfg(test)]
mod panic_tests;
