//! End-to-end assembly runs.

use std::sync::Arc;
use std::time::Duration;

use aqua_assembly::{AssemblyCoordinator, AtomKind, RecordingSink, RunConfig, RunResult};
use pretty_assertions::assert_eq;

fn coordinator(config: RunConfig) -> (AssemblyCoordinator, Arc<RecordingSink>) {
	let sink = Arc::new(RecordingSink::new());
	let coordinator = AssemblyCoordinator::new(&config).expect("valid config").with_sink(sink.clone());
	(coordinator, sink)
}

fn assert_well_formed(result: &RunResult) {
	assert!(result.is_conserved(), "3*{} + {} != {}", result.molecules_completed(), result.unused_atoms.len(), result.workers);
	assert_eq!(result.dangling_pledges, 0, "accumulator leaked pledges");
	for molecule in &result.molecules {
		assert!(molecule.composition.is_water(), "bad composition {molecule}");
	}
	let ordinals: Vec<u64> = result.molecules.iter().map(|m| m.ordinal).collect();
	let expected: Vec<u64> = (1..=result.molecules.len() as u64).collect();
	assert_eq!(ordinals, expected);
}

#[tokio::test(start_paused = true)]
async fn forced_water_draw_makes_one_molecule() {
	let (coordinator, sink) = coordinator(RunConfig::default().with_sequence("HHO").with_seed(1));
	let result = coordinator.run_once().await;

	assert_well_formed(&result);
	assert_eq!(result.molecules_completed(), 1);
	assert!(result.unused_atoms.is_empty());
	assert!(!result.deadline_exceeded);
	assert_eq!(sink.molecules(), result.molecules);
	assert_eq!(sink.last_result(), Some(result));
}

#[tokio::test(start_paused = true)]
async fn missing_third_atom_leaves_both_unused() {
	let config = RunConfig {
		barrier_timeout_ms: 200,
		..RunConfig::default().with_sequence("HO").with_seed(2)
	};
	let (coordinator, sink) = coordinator(config);
	let result = coordinator.run_once().await;

	assert_well_formed(&result);
	assert_eq!(result.molecules_completed(), 0);
	assert_eq!(result.unused(AtomKind::Hydrogen), 1);
	assert_eq!(result.unused(AtomKind::Oxygen), 1);
	assert_eq!(result.cancelled, 0, "both atoms give up on their own");
	assert!(!result.deadline_exceeded);
	assert!(sink.molecules().is_empty());
}

#[tokio::test(start_paused = true)]
async fn random_pool_conserves_atoms() {
	let (coordinator, sink) = coordinator(RunConfig::default().with_workers(300).with_seed(300));
	let result = coordinator.run_once().await;

	assert_well_formed(&result);
	assert_eq!(result.workers, 300);
	assert_eq!(result.molecules_completed(), result.bonded(AtomKind::Hydrogen) / 2);
	assert_eq!(result.molecules_completed(), result.bonded(AtomKind::Oxygen));
	assert!(result.molecules_completed() > 0);
	assert!(!result.deadline_exceeded);
	assert_eq!(sink.molecules().len(), result.molecules_completed());
}

#[tokio::test(start_paused = true)]
async fn seeded_runs_draw_the_same_atoms() {
	let config = RunConfig::default().with_workers(30).with_seed(99);
	let (first, _) = coordinator(config.clone());
	let (second, _) = coordinator(config);

	let drawn = |result: &RunResult, kind| result.bonded(kind) + result.unused(kind);
	let a = first.run_once().await;
	let b = second.run_once().await;
	for kind in AtomKind::ALL {
		assert_eq!(drawn(&a, kind), drawn(&b, kind), "{kind} draws differ");
	}
}

#[tokio::test(start_paused = true)]
async fn deadline_cancels_pledged_workers() {
	let config = RunConfig {
		barrier_timeout_ms: 60_000,
		deadline_ms: Some(500),
		grace_ms: 100,
		..RunConfig::default().with_sequence("HHOH").with_seed(4)
	};
	let (coordinator, _) = coordinator(config);

	let started = tokio::time::Instant::now();
	let result = coordinator.run_once().await;
	let elapsed = started.elapsed();

	assert_well_formed(&result);
	assert!(result.deadline_exceeded);
	assert!(elapsed < Duration::from_millis(700), "run took {elapsed:?}");
	assert_eq!(result.molecules_completed(), 1);
	assert_eq!(result.unused_atoms, vec![AtomKind::Hydrogen]);
	assert_eq!(result.cancelled, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn deadline_mid_run_keeps_invariants_under_real_contention() {
	let config = RunConfig {
		start_delay_ms: Some(0),
		jitter_ms: 1,
		barrier_timeout_ms: 60_000,
		deadline_ms: Some(100),
		grace_ms: 200,
		..RunConfig::default().with_workers(300).with_seed(5)
	};
	let (coordinator, _) = coordinator(config);

	let result = tokio::time::timeout(Duration::from_secs(10), coordinator.run_once())
		.await
		.expect("run must terminate after its deadline");
	assert_well_formed(&result);
	assert_eq!(result.workers, 300);
}
