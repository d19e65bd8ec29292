use std::sync::Arc;
use std::time::Duration;

use aqua_worker::{CancellationToken, UnitToken};
use rand::Rng;
use rand::rngs::StdRng;

use crate::atom::{AtomKind, WorkerId};
use crate::barrier::BarrierOutcome;
use crate::config::Tuning;
use crate::result::{AtomOutcome, AtomReport, UnusedReason};
use crate::site::BondingSite;

/// One atom looking for a molecule to join.
///
/// The kind is fixed at construction. [`Self::run`] backs off, then retries
/// pledging with jitter until a pledge succeeds or the retry budget runs out.
/// A successful pledge is followed by exactly one rendezvous wait; whatever
/// ends that wait is terminal, and any outcome other than release first
/// withdraws the pledge.
#[derive(Debug)]
pub struct AtomWorker {
	id: WorkerId,
	kind: AtomKind,
	site: Arc<BondingSite>,
	tuning: Tuning,
	rng: StdRng,
}

impl AtomWorker {
	pub fn new(id: WorkerId, kind: AtomKind, site: Arc<BondingSite>, tuning: Tuning, rng: StdRng) -> Self {
		Self {
			id,
			kind,
			site,
			tuning,
			rng,
		}
	}

	pub fn id(&self) -> WorkerId {
		self.id
	}

	pub fn kind(&self) -> AtomKind {
		self.kind
	}

	/// Runs the worker to a terminal outcome.
	pub async fn run(mut self, token: UnitToken) -> AtomReport {
		let outcome = self.assemble(token.as_cancellation()).await;
		match &outcome {
			AtomOutcome::Bonded(record) => {
				tracing::debug!(worker = self.id.0, kind = %self.kind, molecule = record.ordinal, "assembly.atom.bonded");
			}
			other => tracing::debug!(worker = self.id.0, kind = %self.kind, outcome = ?other, "assembly.atom.unused"),
		}
		AtomReport {
			worker: self.id,
			kind: self.kind,
			outcome,
		}
	}

	async fn assemble(&mut self, cancel: &CancellationToken) -> AtomOutcome {
		if !pause(self.tuning.start_delay, cancel).await {
			return AtomOutcome::Cancelled;
		}

		for attempt in 0..self.tuning.retry_budget {
			let jitter = self.rng.gen_range(Duration::ZERO..=self.tuning.jitter);
			if !pause(jitter, cancel).await {
				return AtomOutcome::Cancelled;
			}
			if self.site.try_pledge(self.id, self.kind) {
				tracing::debug!(worker = self.id.0, kind = %self.kind, attempt, "assembly.pledge");
				return self.bond(cancel).await;
			}
		}
		AtomOutcome::Unused(UnusedReason::RetriesExhausted)
	}

	async fn bond(&self, cancel: &CancellationToken) -> AtomOutcome {
		match self.site.bond(self.tuning.barrier_timeout, cancel).await {
			BarrierOutcome::Released(record) => AtomOutcome::Bonded(record),
			BarrierOutcome::TimedOut => {
				self.unwind();
				// The party whose wait expired re-arms the barrier for the next molecule.
				self.site.reset_cycle();
				AtomOutcome::Unused(UnusedReason::TimedOut)
			}
			BarrierOutcome::Broken if !cancel.is_cancelled() => {
				self.unwind();
				AtomOutcome::Unused(UnusedReason::Broken)
			}
			BarrierOutcome::Broken | BarrierOutcome::Cancelled => {
				self.unwind();
				AtomOutcome::Cancelled
			}
		}
	}

	fn unwind(&self) {
		if let Some(kind) = self.site.withdraw(self.id) {
			tracing::debug!(worker = self.id.0, kind = %kind, "assembly.withdraw");
		}
	}
}

/// Sleeps for `duration` unless cancelled first. Returns `false` on cancellation.
async fn pause(duration: Duration, cancel: &CancellationToken) -> bool {
	if duration.is_zero() {
		tokio::task::yield_now().await;
		return !cancel.is_cancelled();
	}
	tokio::select! {
		biased;
		_ = cancel.cancelled() => false,
		_ = tokio::time::sleep(duration) => true,
	}
}

#[cfg(test)]
mod tests {
	use rand::SeedableRng;

	use super::*;
	use crate::barrier::BarrierState;
	use crate::sink::RecordingSink;

	fn tuning() -> Tuning {
		Tuning {
			workers: 3,
			start_delay: Duration::from_millis(5),
			jitter: Duration::from_millis(2),
			retry_budget: 8,
			barrier_timeout: Duration::from_millis(100),
			deadline: Duration::from_secs(5),
			grace: Duration::from_millis(50),
		}
	}

	fn worker(id: u64, kind: AtomKind, site: &Arc<BondingSite>, tuning: Tuning) -> AtomWorker {
		AtomWorker::new(WorkerId(id), kind, Arc::clone(site), tuning, StdRng::seed_from_u64(id))
	}

	#[tokio::test(start_paused = true)]
	async fn two_hydrogen_and_one_oxygen_bond() {
		let sink = Arc::new(RecordingSink::new());
		let site = Arc::new(BondingSite::new(sink.clone()));
		let handles: Vec<_> = [AtomKind::Hydrogen, AtomKind::Oxygen, AtomKind::Hydrogen]
			.into_iter()
			.enumerate()
			.map(|(i, kind)| tokio::spawn(worker(i as u64, kind, &site, tuning()).run(UnitToken::detached(i as u64))))
			.collect();

		for handle in handles {
			let report = handle.await.unwrap();
			match report.outcome {
				AtomOutcome::Bonded(record) => {
					assert_eq!(record.ordinal, 1);
					assert!(record.composition.is_water());
				}
				other => panic!("{} ended as {other:?}", report.worker),
			}
		}
		assert_eq!(sink.molecules().len(), 1);
		assert!(site.snapshot().pledgers.is_empty());
	}

	#[tokio::test(start_paused = true)]
	async fn lone_oxygen_times_out_and_withdraws() {
		let site = Arc::new(BondingSite::new(Arc::new(RecordingSink::new())));
		let report = worker(0, AtomKind::Oxygen, &site, tuning()).run(UnitToken::detached(0)).await;

		assert_eq!(report.outcome, AtomOutcome::Unused(UnusedReason::TimedOut));
		let snapshot = site.snapshot();
		assert_eq!((snapshot.hydrogen, snapshot.oxygen), (0, 0));
		assert_eq!(site.barrier_state(), BarrierState::Waiting { arrived: 0 }, "timed-out party re-arms the barrier");
	}

	#[tokio::test(start_paused = true)]
	async fn full_slot_exhausts_retry_budget() {
		let site = Arc::new(BondingSite::new(Arc::new(RecordingSink::new())));
		assert!(site.try_pledge(WorkerId(99), AtomKind::Oxygen));

		let report = worker(1, AtomKind::Oxygen, &site, tuning()).run(UnitToken::detached(1)).await;
		assert_eq!(report.outcome, AtomOutcome::Unused(UnusedReason::RetriesExhausted));
		assert_eq!(site.snapshot().pledgers, vec![WorkerId(99)], "foreign pledge is untouched");
	}

	#[tokio::test(start_paused = true)]
	async fn cancellation_during_backoff_leaves_no_pledge() {
		let site = Arc::new(BondingSite::new(Arc::new(RecordingSink::new())));
		let token = UnitToken::detached(0);
		token.cancel();

		let report = worker(0, AtomKind::Hydrogen, &site, tuning()).run(token).await;
		assert_eq!(report.outcome, AtomOutcome::Cancelled);
		assert!(site.snapshot().pledgers.is_empty());
	}

	#[tokio::test(start_paused = true)]
	async fn cancellation_at_the_barrier_unwinds_the_pledge() {
		let site = Arc::new(BondingSite::new(Arc::new(RecordingSink::new())));
		let token = UnitToken::detached(0);
		let slow = Tuning {
			barrier_timeout: Duration::from_secs(600),
			..tuning()
		};
		let handle = tokio::spawn(worker(0, AtomKind::Hydrogen, &site, slow).run(token.clone()));

		tokio::time::sleep(Duration::from_millis(50)).await;
		assert_eq!(site.snapshot().pledgers, vec![WorkerId(0)]);
		token.cancel();

		let report = handle.await.unwrap();
		assert_eq!(report.outcome, AtomOutcome::Cancelled);
		assert!(site.snapshot().pledgers.is_empty());
		assert_eq!(site.barrier_state(), BarrierState::Waiting { arrived: 0 });
	}
}
