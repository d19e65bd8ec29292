use std::collections::BTreeMap;
use std::sync::Arc;

use aqua_worker::{TaskClass, UnitExit, WorkerPool};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::atom::{AtomDraw, WorkerId};
use crate::config::{RunConfig, Tuning};
use crate::error::Result;
use crate::result::{AtomOutcome, AtomReport, RunResult};
use crate::sink::{LogSink, ResultSink};
use crate::site::BondingSite;
use crate::worker::AtomWorker;

/// Runs batches of atom workers against one bonding site per run.
pub struct AssemblyCoordinator {
	tuning: Tuning,
	draw: AtomDraw,
	seed: Option<u64>,
	sink: Arc<dyn ResultSink>,
}

impl std::fmt::Debug for AssemblyCoordinator {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("AssemblyCoordinator")
			.field("tuning", &self.tuning)
			.field("draw", &self.draw)
			.field("seed", &self.seed)
			.finish_non_exhaustive()
	}
}

impl AssemblyCoordinator {
	/// Validates `config` and builds a coordinator reporting through [`LogSink`].
	pub fn new(config: &RunConfig) -> Result<Self> {
		let plan = config.plan()?;
		Ok(Self {
			tuning: plan.tuning,
			draw: plan.draw,
			seed: plan.seed,
			sink: Arc::new(LogSink),
		})
	}

	/// Replaces the result sink.
	#[must_use]
	pub fn with_sink(mut self, sink: Arc<dyn ResultSink>) -> Self {
		self.sink = sink;
		self
	}

	pub fn tuning(&self) -> &Tuning {
		&self.tuning
	}

	/// Executes one run and reports it.
	///
	/// Always returns: past the run deadline the barrier is aborted, workers
	/// are cancelled, and any still running after the grace period are
	/// aborted and counted as unused.
	pub async fn run_once(&self) -> RunResult {
		let workers = self.tuning.workers;
		let mut rng = match self.seed {
			Some(seed) => StdRng::seed_from_u64(seed),
			None => StdRng::from_entropy(),
		};
		let site = Arc::new(BondingSite::new(Arc::clone(&self.sink)));
		let mut pool = WorkerPool::new(TaskClass::Assembly);
		let mut kinds = Vec::with_capacity(workers);

		tracing::info!(workers, deadline_ms = self.tuning.deadline.as_millis() as u64, "assembly.run.start");
		for index in 0..workers {
			let kind = self.draw.draw(index, &mut rng);
			let worker_rng = StdRng::seed_from_u64(rng.r#gen());
			let site = Arc::clone(&site);
			let tuning = self.tuning;
			pool.submit(move |token| AtomWorker::new(WorkerId(token.unit().get()), kind, site, tuning, worker_rng).run(token));
			kinds.push(kind);
		}

		let finished = pool.await_all_with_timeout(self.tuning.deadline).await;
		if !finished {
			tracing::warn!(pending = pool.pending(), "assembly.run.deadline");
			// Cancel before aborting so parties broken by the abort know it was shutdown.
			pool.cancel_remaining();
			site.abort();
			let shutdown = pool.shutdown(self.tuning.grace).await;
			if !shutdown.cooperative {
				tracing::warn!(aborted = shutdown.aborted, "assembly.run.forced");
			}
		}

		let mut result = RunResult {
			workers,
			deadline_exceeded: !finished,
			..RunResult::default()
		};
		let mut molecules = BTreeMap::new();
		for exit in pool.take_exits() {
			match exit {
				UnitExit::Finished {
					output: AtomReport { kind, outcome, .. },
					..
				} => match outcome {
					AtomOutcome::Bonded(record) => {
						molecules.entry(record.ordinal).or_insert(record);
					}
					AtomOutcome::Unused(_) => result.unused_atoms.push(kind),
					AtomOutcome::Cancelled => {
						result.unused_atoms.push(kind);
						result.cancelled += 1;
					}
				},
				UnitExit::Aborted { unit } | UnitExit::Panicked { unit, .. } => {
					// The worker never unwound; withdraw whatever it pledged on its behalf.
					site.withdraw(WorkerId(unit.get()));
					// Unit ids are submission indices.
					result.unused_atoms.push(kinds[unit.get() as usize]);
					result.cancelled += 1;
				}
			}
		}
		result.molecules = molecules.into_values().collect();

		let snapshot = site.snapshot();
		result.dangling_pledges = snapshot.pledgers.len();
		if result.dangling_pledges > 0 {
			tracing::warn!(pledgers = ?snapshot.pledgers, "assembly.run.dangling_pledges");
		}
		if snapshot.completed as usize != result.molecules.len() {
			tracing::warn!(
				finalized = snapshot.completed,
				reported = result.molecules.len(),
				"assembly.run.molecule_mismatch"
			);
		}

		self.sink.run_finished(&result);
		result
	}
}
