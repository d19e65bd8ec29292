use std::fmt;

use crate::atom::{AtomKind, WorkerId};
use crate::molecule::MoleculeRecord;

/// Why an atom never bonded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnusedReason {
	/// Every pledge attempt found its slot taken.
	RetriesExhausted,
	/// The worker's own rendezvous wait elapsed.
	TimedOut,
	/// The rendezvous was broken by another party or by shutdown.
	Broken,
	/// The pool aborted the worker after the shutdown grace period.
	Aborted,
	/// The worker panicked.
	Panicked,
}

/// Terminal state of one atom worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AtomOutcome {
	Bonded(MoleculeRecord),
	Unused(UnusedReason),
	/// Observed run shutdown before bonding. Counted as unused.
	Cancelled,
}

impl AtomOutcome {
	pub fn is_bonded(&self) -> bool {
		matches!(self, Self::Bonded(_))
	}
}

/// What one atom worker returns to the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomReport {
	pub worker: WorkerId,
	pub kind: AtomKind,
	pub outcome: AtomOutcome,
}

/// Aggregate of one assembly run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunResult {
	/// Atom workers submitted.
	pub workers: usize,
	/// Completed molecules in ordinal order.
	pub molecules: Vec<MoleculeRecord>,
	/// Kinds of atoms that never bonded, in the order their workers finished.
	pub unused_atoms: Vec<AtomKind>,
	/// Unused atoms that ended through cancellation or abort.
	pub cancelled: usize,
	/// The run deadline fired and stragglers were cancelled.
	pub deadline_exceeded: bool,
	/// Pledges left in the accumulator once every worker exited.
	pub dangling_pledges: usize,
}

impl RunResult {
	pub fn molecules_completed(&self) -> usize {
		self.molecules.len()
	}

	/// Atoms of `kind` that ended up in a molecule.
	pub fn bonded(&self, kind: AtomKind) -> usize {
		self.molecules.iter().map(|m| m.composition.count(kind)).sum()
	}

	/// Atoms of `kind` that never bonded.
	pub fn unused(&self, kind: AtomKind) -> usize {
		self.unused_atoms.iter().filter(|&&k| k == kind).count()
	}

	/// Every submitted atom is either in exactly one molecule or unused.
	pub fn is_conserved(&self) -> bool {
		self.molecules_completed() * 3 + self.unused_atoms.len() == self.workers
	}
}

impl fmt::Display for RunResult {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Molecules total - {}; unused atoms total - {}: [", self.molecules_completed(), self.unused_atoms.len())?;
		for (i, kind) in self.unused_atoms.iter().enumerate() {
			if i > 0 {
				f.write_str(", ")?;
			}
			write!(f, "{kind}")?;
		}
		f.write_str("]")
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::molecule::Composition;

	#[test]
	fn summary_lists_unused_atoms() {
		let water: Composition = [AtomKind::Oxygen, AtomKind::Hydrogen, AtomKind::Hydrogen].into_iter().collect();
		let result = RunResult {
			workers: 5,
			molecules: vec![MoleculeRecord { ordinal: 1, composition: water }],
			unused_atoms: vec![AtomKind::Hydrogen, AtomKind::Oxygen],
			..RunResult::default()
		};
		assert!(result.is_conserved());
		assert_eq!(result.bonded(AtomKind::Hydrogen), 2);
		assert_eq!(result.unused(AtomKind::Oxygen), 1);
		assert_eq!(result.to_string(), "Molecules total - 1; unused atoms total - 2: [H, O]");
	}
}
