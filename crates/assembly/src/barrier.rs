//! Reusable N-party rendezvous with a release action and bounded waits.
//!
//! A cycle ends exactly once, either released (the last party ran the
//! release action) or broken (a party timed out, the barrier was reset while
//! parties waited, or it was aborted). Each cycle owns its own slot, so a
//! party always learns how *its* cycle ended, even when later cycles have
//! already started.
//!
//! Lock order is cycle state, then the shared state the release action
//! mutates. Code that only touches the shared state must never take the
//! cycle lock while holding it.

use std::sync::Arc;
use std::time::Duration;

use aqua_worker::CancellationToken;
use parking_lot::Mutex;
use tokio::sync::Notify;

/// How one party's wait ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BarrierOutcome<R> {
	/// All parties arrived; carries the release action's result.
	Released(R),
	/// This party's own wait bound elapsed first; the cycle is now broken.
	TimedOut,
	/// The cycle was broken by another party, a reset, or an abort.
	Broken,
	/// This party's cancellation token fired; its arrival was withdrawn.
	Cancelled,
}

impl<R> BarrierOutcome<R> {
	pub fn is_released(&self) -> bool {
		matches!(self, Self::Released(_))
	}
}

/// Observable barrier state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarrierState {
	/// Accepting arrivals for the current cycle.
	Waiting { arrived: usize },
	/// The current cycle is broken; [`RendezvousBarrier::reset_cycle`] re-arms it.
	Broken,
	/// Permanently broken by [`RendezvousBarrier::abort`].
	Aborted,
}

#[derive(Debug, Clone)]
enum CycleEnd<R> {
	Released(R),
	Broken,
}

impl<R> From<CycleEnd<R>> for BarrierOutcome<R> {
	fn from(end: CycleEnd<R>) -> Self {
		match end {
			CycleEnd::Released(value) => Self::Released(value),
			CycleEnd::Broken => Self::Broken,
		}
	}
}

struct CycleSlot<R> {
	end: Mutex<Option<CycleEnd<R>>>,
	done: Notify,
}

impl<R: Clone> CycleSlot<R> {
	fn new() -> Arc<Self> {
		Arc::new(Self {
			end: Mutex::new(None),
			done: Notify::new(),
		})
	}

	fn ended(&self) -> Option<CycleEnd<R>> {
		self.end.lock().clone()
	}

	/// Records the first ending only.
	fn finish(&self, end: CycleEnd<R>) {
		{
			let mut slot = self.end.lock();
			if slot.is_some() {
				return;
			}
			*slot = Some(end);
		}
		self.done.notify_waiters();
	}
}

struct Cycle<R> {
	generation: u64,
	arrived: usize,
	slot: Arc<CycleSlot<R>>,
	broken: bool,
	aborted: bool,
}

type ReleaseAction<S, R> = dyn Fn(&mut S) -> R + Send + Sync;

/// Barrier for `parties` callers whose release action runs under the same
/// mutex as the state it finalizes.
pub struct RendezvousBarrier<S, R> {
	parties: usize,
	shared: Arc<Mutex<S>>,
	action: Box<ReleaseAction<S, R>>,
	cycle: Mutex<Cycle<R>>,
}

impl<S, R> std::fmt::Debug for RendezvousBarrier<S, R> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let cycle = self.cycle.lock();
		f.debug_struct("RendezvousBarrier")
			.field("parties", &self.parties)
			.field("generation", &cycle.generation)
			.field("arrived", &cycle.arrived)
			.field("broken", &cycle.broken)
			.field("aborted", &cycle.aborted)
			.finish_non_exhaustive()
	}
}

impl<S, R> RendezvousBarrier<S, R>
where
	R: Clone,
{
	/// Creates a barrier tripping when `parties` callers have arrived.
	///
	/// # Panics
	///
	/// Panics if `parties` is zero.
	pub fn new(parties: usize, shared: Arc<Mutex<S>>, action: impl Fn(&mut S) -> R + Send + Sync + 'static) -> Self {
		assert!(parties > 0, "barrier requires at least 1 party");
		Self {
			parties,
			shared,
			action: Box::new(action),
			cycle: Mutex::new(Cycle {
				generation: 0,
				arrived: 0,
				slot: CycleSlot::new(),
				broken: false,
				aborted: false,
			}),
		}
	}

	pub fn parties(&self) -> usize {
		self.parties
	}

	/// The state guarded together with the release action.
	pub fn shared(&self) -> &Arc<Mutex<S>> {
		&self.shared
	}

	/// Number of cycles started so far, counting the current one from zero.
	pub fn generation(&self) -> u64 {
		self.cycle.lock().generation
	}

	pub fn state(&self) -> BarrierState {
		let cycle = self.cycle.lock();
		if cycle.aborted {
			BarrierState::Aborted
		} else if cycle.broken {
			BarrierState::Broken
		} else {
			BarrierState::Waiting { arrived: cycle.arrived }
		}
	}

	/// Arrives at the barrier and waits for the cycle to end.
	///
	/// The last arriving party runs the release action before anyone is
	/// released. A party whose `timeout` elapses breaks the cycle for everyone
	/// waiting in it; a party whose `cancel` fires only withdraws itself.
	pub async fn arrive_and_wait(&self, timeout: Duration, cancel: &CancellationToken) -> BarrierOutcome<R> {
		let slot = {
			let mut cycle = self.cycle.lock();
			if cycle.broken || cycle.aborted {
				return BarrierOutcome::Broken;
			}
			cycle.arrived += 1;
			if cycle.arrived == self.parties {
				let released = {
					let mut shared = self.shared.lock();
					(self.action)(&mut shared)
				};
				cycle.slot.finish(CycleEnd::Released(released.clone()));
				cycle.slot = CycleSlot::new();
				cycle.arrived = 0;
				cycle.generation = cycle.generation.wrapping_add(1);
				tracing::trace!(generation = cycle.generation, "barrier.release");
				return BarrierOutcome::Released(released);
			}
			Arc::clone(&cycle.slot)
		};

		let deadline = tokio::time::Instant::now() + timeout;
		loop {
			// Register before checking so a finish between the two is not lost.
			let notified = slot.done.notified();
			if let Some(end) = slot.ended() {
				return end.into();
			}
			tokio::select! {
				biased;
				_ = notified => continue,
				_ = cancel.cancelled() => return self.leave(&slot),
				_ = tokio::time::sleep_until(deadline) => return self.expire(&slot),
			}
		}
	}

	fn leave(&self, slot: &CycleSlot<R>) -> BarrierOutcome<R> {
		let mut cycle = self.cycle.lock();
		if let Some(end) = slot.ended() {
			return end.into();
		}
		// An unfinished slot is always the current cycle's.
		cycle.arrived = cycle.arrived.saturating_sub(1);
		tracing::trace!(generation = cycle.generation, arrived = cycle.arrived, "barrier.leave");
		BarrierOutcome::Cancelled
	}

	fn expire(&self, slot: &CycleSlot<R>) -> BarrierOutcome<R> {
		let mut cycle = self.cycle.lock();
		if let Some(end) = slot.ended() {
			return end.into();
		}
		cycle.broken = true;
		slot.finish(CycleEnd::Broken);
		tracing::debug!(generation = cycle.generation, arrived = cycle.arrived, "barrier.timeout");
		BarrierOutcome::TimedOut
	}

	/// Re-arms the barrier for a fresh cycle.
	///
	/// Parties still waiting in the current cycle observe `Broken`. Returns
	/// `false` and does nothing once the barrier was aborted.
	pub fn reset_cycle(&self) -> bool {
		let mut cycle = self.cycle.lock();
		if cycle.aborted {
			return false;
		}
		cycle.slot.finish(CycleEnd::Broken);
		cycle.slot = CycleSlot::new();
		cycle.arrived = 0;
		cycle.broken = false;
		cycle.generation = cycle.generation.wrapping_add(1);
		true
	}

	/// Permanently breaks the barrier; every waiting and future party observes `Broken`.
	pub fn abort(&self) {
		let mut cycle = self.cycle.lock();
		cycle.aborted = true;
		cycle.broken = true;
		cycle.slot.finish(CycleEnd::Broken);
		tracing::debug!(generation = cycle.generation, arrived = cycle.arrived, "barrier.abort");
	}
}
