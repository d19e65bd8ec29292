//! Error types for atom parsing and run configuration.

use std::path::PathBuf;

use thiserror::Error;

/// Errors parsing atom symbols or names.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseAtomError {
	/// A character that is not `H` or `O`.
	#[error("unknown atom symbol '{0}' (expected 'H' or 'O')")]
	UnknownSymbol(char),

	/// A name that is neither a symbol nor `hydrogen`/`oxygen`.
	#[error("unknown atom '{0}'")]
	UnknownName(String),
}

/// Errors loading or validating a run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error reading a configuration file.
	#[error("I/O error reading {path}: {error}")]
	Io {
		/// Path to the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// The configuration is not valid TOML or has unknown keys.
	#[error("config parse error: {0}")]
	Parse(#[from] toml::de::Error),

	/// The forced atom sequence contains something other than atom symbols.
	#[error("invalid atom sequence: {0}")]
	Sequence(#[from] ParseAtomError),

	/// A value is outside its accepted range.
	#[error("invalid value for '{key}': {reason}")]
	Invalid {
		/// The offending configuration key.
		key: &'static str,
		/// What is wrong with it.
		reason: String,
	},
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
