use parking_lot::Mutex;

use crate::molecule::MoleculeRecord;
use crate::result::RunResult;

/// Receives completed molecules and the final run summary.
///
/// `molecule_completed` is called from the barrier release action while the
/// accumulator lock is held, so implementations must not block.
pub trait ResultSink: Send + Sync {
	fn molecule_completed(&self, record: &MoleculeRecord);

	fn run_finished(&self, _result: &RunResult) {}
}

/// Sink that reports through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl ResultSink for LogSink {
	fn molecule_completed(&self, record: &MoleculeRecord) {
		tracing::info!(molecule = record.ordinal, composition = %record.composition, "assembly.molecule");
	}

	fn run_finished(&self, result: &RunResult) {
		tracing::info!(
			workers = result.workers,
			molecules = result.molecules_completed(),
			unused = result.unused_atoms.len(),
			cancelled = result.cancelled,
			deadline_exceeded = result.deadline_exceeded,
			"assembly.run.finished"
		);
	}
}

/// Sink that keeps everything it receives.
#[derive(Debug, Default)]
pub struct RecordingSink {
	molecules: Mutex<Vec<MoleculeRecord>>,
	results: Mutex<Vec<RunResult>>,
}

impl RecordingSink {
	pub fn new() -> Self {
		Self::default()
	}

	/// Molecules in the order the release action reported them.
	pub fn molecules(&self) -> Vec<MoleculeRecord> {
		self.molecules.lock().clone()
	}

	pub fn last_result(&self) -> Option<RunResult> {
		self.results.lock().last().cloned()
	}
}

impl ResultSink for RecordingSink {
	fn molecule_completed(&self, record: &MoleculeRecord) {
		self.molecules.lock().push(record.clone());
	}

	fn run_finished(&self, result: &RunResult) {
		self.results.lock().push(result.clone());
	}
}
