//! Aqua command-line front end.
//!
//! - `aqua molecules` runs one water assembly and prints every molecule
//! - `aqua repeat` runs the repeat-task demo

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use aqua_assembly::{AssemblyCoordinator, MoleculeRecord, ResultSink, RunConfig, RunResult};
use aqua_worker::{Repeat, RepeatExecutor};
use clap::{Args, Parser, Subcommand};
use tracing::info;

/// Command line arguments.
#[derive(Parser, Debug)]
#[command(name = "aqua")]
#[command(about = "Assemble water molecules from concurrently scheduled atoms")]
struct Cli {
	/// Verbose logging
	#[arg(short, long, global = true)]
	verbose: bool,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Run one assembly and print the molecules it produced.
	Molecules(MoleculeArgs),
	/// Run the repeat-task demo.
	Repeat {
		/// Runs allowed to execute at once
		#[arg(short, long, default_value_t = 10)]
		concurrency: usize,
	},
}

#[derive(Args, Debug)]
struct MoleculeArgs {
	/// TOML run configuration
	#[arg(short, long, value_name = "PATH")]
	config: Option<PathBuf>,

	/// Number of atom workers
	#[arg(short, long)]
	workers: Option<usize>,

	/// Forced atom draw, e.g. HHO
	#[arg(short, long)]
	sequence: Option<String>,

	/// Seed for reproducible draws and backoff
	#[arg(long)]
	seed: Option<u64>,
}

impl MoleculeArgs {
	fn into_config(self) -> Result<RunConfig, aqua_assembly::ConfigError> {
		let mut config = match &self.config {
			Some(path) => RunConfig::load(path)?,
			None => RunConfig::default(),
		};
		if let Some(workers) = self.workers {
			config.workers = Some(workers);
		}
		if let Some(sequence) = self.sequence {
			config.sequence = Some(sequence);
		}
		if let Some(seed) = self.seed {
			config.seed = Some(seed);
		}
		Ok(config)
	}
}

/// Prints molecules as they complete.
struct PrintSink;

impl ResultSink for PrintSink {
	fn molecule_completed(&self, record: &MoleculeRecord) {
		println!("{record}");
	}

	fn run_finished(&self, result: &RunResult) {
		println!("{result}");
	}
}

/// Demo task announcing which thread ran it.
struct Announce;

impl Repeat for Announce {
	const TIMES: usize = 10;

	fn run(&self) {
		let thread = std::thread::current();
		println!("repeat run on {}", thread.name().unwrap_or("<unnamed>"));
	}
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let cli = Cli::parse();
	setup_tracing(cli.verbose);

	match cli.command {
		Command::Molecules(args) => {
			let config = args.into_config()?;
			let coordinator = AssemblyCoordinator::new(&config)?.with_sink(Arc::new(PrintSink));
			println!("Number atoms - {}:", coordinator.tuning().workers);
			let result = coordinator.run_once().await;
			info!(
				molecules = result.molecules_completed(),
				unused = result.unused_atoms.len(),
				deadline_exceeded = result.deadline_exceeded,
				"run complete"
			);
		}
		Command::Repeat { concurrency } => {
			let mut executor = RepeatExecutor::new(concurrency.max(1));
			let scheduled = executor.execute(Arc::new(Announce))?;
			let report = executor.shutdown(Duration::from_secs(1)).await;
			info!(scheduled, completed = report.completed, failed = report.failed, timed_out = report.timed_out, "repeat complete");
		}
	}

	Ok(())
}

fn setup_tracing(verbose: bool) {
	use std::fs::OpenOptions;

	use tracing_subscriber::EnvFilter;
	use tracing_subscriber::prelude::*;

	let filter = || {
		EnvFilter::try_from_default_env().unwrap_or_else(|_| {
			if verbose {
				EnvFilter::new("aqua=debug,aqua_assembly=debug,aqua_worker=debug,warn")
			} else {
				EnvFilter::new("aqua=info,aqua_assembly=info,aqua_worker=info,warn")
			}
		})
	};

	// AQUA_LOG_DIR sends logs to a per-process file instead of stderr
	if let Some(log_dir) = std::env::var("AQUA_LOG_DIR").ok().map(PathBuf::from)
		&& std::fs::create_dir_all(&log_dir).is_ok()
	{
		let log_path = log_dir.join(format!("aqua.{}.log", std::process::id()));
		if let Ok(file) = OpenOptions::new().create(true).append(true).open(&log_path) {
			let file_layer = tracing_subscriber::fmt::layer().with_writer(std::sync::Mutex::new(file)).with_ansi(false).with_target(true);
			tracing_subscriber::registry().with(filter()).with(file_layer).init();
			tracing::info!(path = ?log_path, "tracing initialized");
			return;
		}
	}

	tracing_subscriber::fmt().with_env_filter(filter()).with_writer(std::io::stderr).init();
}
