//! Water-molecule assembly from independently scheduled atom workers.
//!
//! Every worker embodies one Hydrogen or Oxygen atom. Workers pledge into a
//! shared [`MoleculeAccumulator`] and, once pledged, meet at a three-party
//! [`RendezvousBarrier`] whose release action finalizes the molecule under
//! the accumulator's lock. Atoms that never find a molecule end up unused;
//! an [`AssemblyCoordinator`] run always terminates with a [`RunResult`].

/// Mutually exclusive tally of the molecule under assembly.
pub mod accumulator;
/// Atom kinds, worker identities, and draw policies.
pub mod atom;
/// Reusable N-party rendezvous barrier.
pub mod barrier;
/// Run configuration and derived tuning.
pub mod config;
/// Run orchestration.
pub mod coordinator;
/// Error types.
pub mod error;
/// Completed molecule values.
pub mod molecule;
/// Per-atom and per-run outcomes.
pub mod result;
/// Result sinks.
pub mod sink;
/// Shared accumulator + barrier pair.
pub mod site;
/// The atom worker state machine.
pub mod worker;

pub use accumulator::{MoleculeAccumulator, Pledge};
pub use atom::{AtomDraw, AtomKind, WorkerId};
pub use barrier::{BarrierOutcome, BarrierState, RendezvousBarrier};
pub use config::{DEFAULT_WORKERS, RunConfig, RunPlan, Tuning};
pub use coordinator::AssemblyCoordinator;
pub use error::{ConfigError, ParseAtomError};
pub use molecule::{Composition, MoleculeRecord};
pub use result::{AtomOutcome, AtomReport, RunResult, UnusedReason};
pub use sink::{LogSink, RecordingSink, ResultSink};
pub use site::{BondingSite, SiteSnapshot};
pub use worker::AtomWorker;
