use std::sync::Arc;
use std::time::Duration;

use aqua_worker::CancellationToken;
use parking_lot::Mutex;

use crate::accumulator::MoleculeAccumulator;
use crate::atom::{AtomKind, WorkerId};
use crate::barrier::{BarrierOutcome, BarrierState, RendezvousBarrier};
use crate::molecule::MoleculeRecord;
use crate::sink::ResultSink;

/// Point-in-time copy of the accumulator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteSnapshot {
	pub hydrogen: usize,
	pub oxygen: usize,
	pub pledgers: Vec<WorkerId>,
	pub completed: u64,
}

/// The accumulator and barrier shared by every worker of one run.
///
/// Workers only reach the accumulator through these operations; none of
/// them holds the lock across an await.
#[derive(Debug)]
pub struct BondingSite {
	accumulator: Arc<Mutex<MoleculeAccumulator>>,
	barrier: RendezvousBarrier<MoleculeAccumulator, MoleculeRecord>,
}

impl BondingSite {
	/// Parties per molecule: two Hydrogen and one Oxygen.
	pub const PARTIES: usize = AtomKind::Hydrogen.required_count() + AtomKind::Oxygen.required_count();

	pub fn new(sink: Arc<dyn ResultSink>) -> Self {
		let accumulator = Arc::new(Mutex::new(MoleculeAccumulator::new()));
		let barrier = RendezvousBarrier::new(Self::PARTIES, Arc::clone(&accumulator), move |acc: &mut MoleculeAccumulator| {
			let composition = acc.snapshot_composition();
			let ordinal = acc.finalize_and_reset();
			let record = MoleculeRecord { ordinal, composition };
			sink.molecule_completed(&record);
			record
		});
		Self { accumulator, barrier }
	}

	/// Pledges `worker` into the molecule under assembly.
	///
	/// Fails while the molecule is complete but not yet released, or when the
	/// slot for `kind` is full.
	pub fn try_pledge(&self, worker: WorkerId, kind: AtomKind) -> bool {
		let mut acc = self.accumulator.lock();
		if acc.is_complete() {
			return false;
		}
		acc.try_pledge(worker, kind)
	}

	/// Removes `worker`'s pledge, if it still holds one.
	pub fn withdraw(&self, worker: WorkerId) -> Option<AtomKind> {
		self.accumulator.lock().withdraw(worker)
	}

	/// Waits at the barrier with the other pledgers of this molecule.
	pub async fn bond(&self, timeout: Duration, cancel: &CancellationToken) -> BarrierOutcome<MoleculeRecord> {
		self.barrier.arrive_and_wait(timeout, cancel).await
	}

	pub fn reset_cycle(&self) -> bool {
		self.barrier.reset_cycle()
	}

	/// Breaks the barrier for good so no worker blocks past shutdown.
	pub fn abort(&self) {
		self.barrier.abort();
	}

	pub fn barrier_state(&self) -> BarrierState {
		self.barrier.state()
	}

	pub fn snapshot(&self) -> SiteSnapshot {
		let acc = self.accumulator.lock();
		SiteSnapshot {
			hydrogen: acc.current_count(AtomKind::Hydrogen),
			oxygen: acc.current_count(AtomKind::Oxygen),
			pledgers: acc.pledges().iter().map(|p| p.worker).collect(),
			completed: acc.completed_count(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::sink::RecordingSink;

	#[test]
	fn complete_molecule_blocks_further_pledges() {
		let site = BondingSite::new(Arc::new(RecordingSink::new()));
		assert!(site.try_pledge(WorkerId(0), AtomKind::Hydrogen));
		assert!(site.try_pledge(WorkerId(1), AtomKind::Hydrogen));
		assert!(site.try_pledge(WorkerId(2), AtomKind::Oxygen));

		assert!(!site.try_pledge(WorkerId(3), AtomKind::Hydrogen));
		assert!(!site.try_pledge(WorkerId(4), AtomKind::Oxygen));
		assert_eq!(site.snapshot().pledgers, vec![WorkerId(0), WorkerId(1), WorkerId(2)]);
	}

	#[tokio::test(start_paused = true)]
	async fn release_action_finalizes_and_reports() {
		let sink = Arc::new(RecordingSink::new());
		let site = Arc::new(BondingSite::new(sink.clone()));
		let mut waiters = Vec::new();
		for (id, kind) in [(0, AtomKind::Oxygen), (1, AtomKind::Hydrogen), (2, AtomKind::Hydrogen)] {
			assert!(site.try_pledge(WorkerId(id), kind));
			let site = Arc::clone(&site);
			waiters.push(tokio::spawn(async move { site.bond(Duration::from_secs(1), &CancellationToken::new()).await }));
		}

		for waiter in waiters {
			match waiter.await.unwrap() {
				BarrierOutcome::Released(record) => assert_eq!(record.to_string(), "Molecule 1: OHH"),
				other => panic!("unexpected outcome {other:?}"),
			}
		}
		let snapshot = site.snapshot();
		assert_eq!((snapshot.hydrogen, snapshot.oxygen, snapshot.completed), (0, 0, 1));
		assert!(snapshot.pledgers.is_empty());
		assert_eq!(sink.molecules().len(), 1);
	}
}
