use smallvec::SmallVec;

use crate::atom::{AtomKind, WorkerId};
use crate::molecule::Composition;

/// One worker's claim on a slot of the molecule under assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pledge {
	pub worker: WorkerId,
	pub kind: AtomKind,
}

/// Shared tally of the molecule under assembly.
///
/// Callers hold the run's mutex for every operation. Invariants:
/// `current_count(H) <= 2`, `current_count(O) <= 1`, and the number of
/// pledgers equals the sum of the counts.
#[derive(Debug, Clone, Default)]
pub struct MoleculeAccumulator {
	hydrogen: usize,
	oxygen: usize,
	pledgers: SmallVec<[Pledge; 3]>,
	completed: u64,
}

impl MoleculeAccumulator {
	pub fn new() -> Self {
		Self::default()
	}

	/// Currently pledged atoms of `kind`.
	pub fn current_count(&self, kind: AtomKind) -> usize {
		match kind {
			AtomKind::Hydrogen => self.hydrogen,
			AtomKind::Oxygen => self.oxygen,
		}
	}

	fn count_mut(&mut self, kind: AtomKind) -> &mut usize {
		match kind {
			AtomKind::Hydrogen => &mut self.hydrogen,
			AtomKind::Oxygen => &mut self.oxygen,
		}
	}

	/// Claims one slot of `kind` for `worker`.
	///
	/// Returns `false` without mutating when the slot is full or the worker
	/// already pledged.
	pub fn try_pledge(&mut self, worker: WorkerId, kind: AtomKind) -> bool {
		if self.current_count(kind) >= kind.required_count() || self.is_pledger(worker) {
			return false;
		}
		*self.count_mut(kind) += 1;
		self.pledgers.push(Pledge { worker, kind });
		true
	}

	/// Removes `worker`'s pledge, returning the kind it held.
	pub fn withdraw(&mut self, worker: WorkerId) -> Option<AtomKind> {
		let idx = self.pledgers.iter().position(|p| p.worker == worker)?;
		let Pledge { kind, .. } = self.pledgers.remove(idx);
		let count = self.count_mut(kind);
		*count = count.saturating_sub(1);
		Some(kind)
	}

	pub fn is_pledger(&self, worker: WorkerId) -> bool {
		self.pledgers.iter().any(|p| p.worker == worker)
	}

	/// True iff two Hydrogen and one Oxygen are pledged.
	pub fn is_complete(&self) -> bool {
		AtomKind::ALL.iter().all(|&kind| self.current_count(kind) == kind.required_count())
	}

	/// Kinds in pledge order.
	pub fn snapshot_composition(&self) -> Composition {
		debug_assert!(self.is_complete(), "snapshot of an incomplete molecule");
		self.pledgers.iter().map(|p| p.kind).collect()
	}

	/// Clears the molecule under assembly and returns the new molecule ordinal.
	pub fn finalize_and_reset(&mut self) -> u64 {
		self.hydrogen = 0;
		self.oxygen = 0;
		self.pledgers.clear();
		self.completed += 1;
		self.completed
	}

	/// Molecules finalized so far.
	pub fn completed_count(&self) -> u64 {
		self.completed
	}

	/// Pledges currently held, in pledge order.
	pub fn pledges(&self) -> &[Pledge] {
		&self.pledgers
	}
}
