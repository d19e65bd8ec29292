//! Run configuration and the tuning derived from it.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::atom::{AtomDraw, AtomKind};
use crate::error::{ConfigError, Result};

/// Worker count used when neither `workers` nor `sequence` is given.
pub const DEFAULT_WORKERS: usize = 100;

/// Floor for the derived per-worker retry budget.
const MIN_RETRY_BUDGET: u32 = 32;

/// Configuration of one assembly run, as read from TOML or the command line.
///
/// Unset optional values are derived from the worker count by [`Self::plan`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
	pub workers: Option<usize>,
	pub hydrogen_bias: f64,
	/// Forced draw such as `"HHO"`.
	pub sequence: Option<String>,
	pub seed: Option<u64>,
	pub barrier_timeout_ms: u64,
	pub jitter_ms: u64,
	pub retry_budget: Option<u32>,
	pub start_delay_ms: Option<u64>,
	pub deadline_ms: Option<u64>,
	pub grace_ms: u64,
}

impl Default for RunConfig {
	fn default() -> Self {
		Self {
			workers: None,
			hydrogen_bias: AtomDraw::STOICHIOMETRIC_BIAS,
			sequence: None,
			seed: None,
			barrier_timeout_ms: 2000,
			jitter_ms: 10,
			retry_budget: None,
			start_delay_ms: None,
			deadline_ms: None,
			grace_ms: 250,
		}
	}
}

/// Timing and budget knobs resolved from a [`RunConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tuning {
	pub workers: usize,
	/// Initial backoff before a worker's first pledge attempt.
	pub start_delay: Duration,
	/// Upper bound of the random sleep before each pledge attempt.
	pub jitter: Duration,
	pub retry_budget: u32,
	pub barrier_timeout: Duration,
	/// Bound on the whole run before stragglers are cancelled.
	pub deadline: Duration,
	/// Time cancelled workers get to unwind before they are aborted.
	pub grace: Duration,
}

/// Everything a coordinator needs to execute runs.
#[derive(Debug, Clone, PartialEq)]
pub struct RunPlan {
	pub tuning: Tuning,
	pub draw: AtomDraw,
	pub seed: Option<u64>,
}

impl RunConfig {
	/// Parses a TOML document.
	pub fn from_toml(text: &str) -> Result<Self> {
		Ok(toml::from_str(text)?)
	}

	/// Reads and parses a TOML file.
	pub fn load(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		let text = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		Self::from_toml(&text)
	}

	#[must_use]
	pub fn with_workers(mut self, workers: usize) -> Self {
		self.workers = Some(workers);
		self
	}

	#[must_use]
	pub fn with_sequence(mut self, sequence: impl Into<String>) -> Self {
		self.sequence = Some(sequence.into());
		self
	}

	#[must_use]
	pub fn with_seed(mut self, seed: u64) -> Self {
		self.seed = Some(seed);
		self
	}

	/// Validates the configuration and resolves derived values.
	pub fn plan(&self) -> Result<RunPlan> {
		let script = self.sequence.as_deref().map(AtomKind::parse_sequence).transpose()?;

		let workers = match (self.workers, &script) {
			(Some(workers), Some(script)) if workers != script.len() => {
				return Err(ConfigError::Invalid {
					key: "workers",
					reason: format!("{workers} workers but the sequence has {} atoms", script.len()),
				});
			}
			(Some(workers), _) => workers,
			(None, Some(script)) => script.len(),
			(None, None) => DEFAULT_WORKERS,
		};
		if workers == 0 {
			return Err(ConfigError::Invalid {
				key: "workers",
				reason: "at least one worker is required".to_string(),
			});
		}
		if !(0.0..=1.0).contains(&self.hydrogen_bias) {
			return Err(ConfigError::Invalid {
				key: "hydrogen_bias",
				reason: format!("{} is not a probability", self.hydrogen_bias),
			});
		}
		if self.barrier_timeout_ms == 0 {
			return Err(ConfigError::Invalid {
				key: "barrier_timeout_ms",
				reason: "must be positive".to_string(),
			});
		}

		let retry_budget = match self.retry_budget {
			Some(0) => {
				return Err(ConfigError::Invalid {
					key: "retry_budget",
					reason: "must be positive".to_string(),
				});
			}
			Some(budget) => budget,
			None => u32::try_from(workers).unwrap_or(u32::MAX).max(MIN_RETRY_BUDGET),
		};

		let start_delay = match self.start_delay_ms {
			Some(ms) => Duration::from_millis(ms),
			// Larger pools wait less per worker so total wall-clock time stays bounded.
			None if workers < DEFAULT_WORKERS => Duration::from_millis(50).saturating_mul(workers as u32),
			None => Duration::from_millis(workers as u64),
		};
		let jitter = Duration::from_millis(self.jitter_ms);
		let barrier_timeout = Duration::from_millis(self.barrier_timeout_ms);
		let grace = Duration::from_millis(self.grace_ms);
		let deadline = match self.deadline_ms {
			Some(ms) => Duration::from_millis(ms),
			None => start_delay
				.saturating_add(jitter.saturating_mul(retry_budget))
				.saturating_add(barrier_timeout)
				.saturating_add(grace),
		};

		let draw = match script {
			Some(kinds) => AtomDraw::Scripted(kinds),
			None => AtomDraw::Random {
				hydrogen_bias: self.hydrogen_bias,
			},
		};

		Ok(RunPlan {
			tuning: Tuning {
				workers,
				start_delay,
				jitter,
				retry_budget,
				barrier_timeout,
				deadline,
				grace,
			},
			draw,
			seed: self.seed,
		})
	}
}
