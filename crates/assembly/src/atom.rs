use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::ParseAtomError;

/// Kind of atom a worker embodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AtomKind {
	Hydrogen,
	Oxygen,
}

impl AtomKind {
	/// Every kind, in symbol order.
	pub const ALL: [AtomKind; 2] = [AtomKind::Hydrogen, AtomKind::Oxygen];

	/// Atoms of this kind needed for one water molecule.
	pub const fn required_count(self) -> usize {
		match self {
			Self::Hydrogen => 2,
			Self::Oxygen => 1,
		}
	}

	/// Chemical symbol.
	pub const fn symbol(self) -> char {
		match self {
			Self::Hydrogen => 'H',
			Self::Oxygen => 'O',
		}
	}

	/// Parses one chemical symbol.
	pub fn from_symbol(symbol: char) -> Result<Self, ParseAtomError> {
		match symbol {
			'H' | 'h' => Ok(Self::Hydrogen),
			'O' | 'o' => Ok(Self::Oxygen),
			other => Err(ParseAtomError::UnknownSymbol(other)),
		}
	}

	/// Parses a sequence of symbols such as `"HHO"`, ignoring whitespace.
	pub fn parse_sequence(text: &str) -> Result<Vec<Self>, ParseAtomError> {
		text.chars().filter(|c| !c.is_whitespace()).map(Self::from_symbol).collect()
	}
}

impl fmt::Display for AtomKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.symbol())
	}
}

impl FromStr for AtomKind {
	type Err = ParseAtomError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let mut chars = s.trim().chars();
		match (chars.next(), chars.next()) {
			(Some(symbol), None) => Self::from_symbol(symbol),
			_ => match s.trim().to_ascii_lowercase().as_str() {
				"hydrogen" => Ok(Self::Hydrogen),
				"oxygen" => Ok(Self::Oxygen),
				_ => Err(ParseAtomError::UnknownName(s.to_string())),
			},
		}
	}
}

/// Identity of one atom worker within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(pub u64);

impl fmt::Display for WorkerId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "atom#{}", self.0)
	}
}

/// How atom kinds are chosen for the workers of a run.
#[derive(Debug, Clone, PartialEq)]
pub enum AtomDraw {
	/// Independent draws, Hydrogen with probability `hydrogen_bias`.
	Random { hydrogen_bias: f64 },
	/// Fixed kinds, one per worker, in submission order. Short scripts repeat.
	Scripted(Vec<AtomKind>),
}

impl AtomDraw {
	/// Draws follow the 2:1 stoichiometry of water.
	pub const STOICHIOMETRIC_BIAS: f64 = 2.0 / 3.0;

	/// Random draws biased 2:1 toward Hydrogen.
	pub fn stoichiometric() -> Self {
		Self::Random {
			hydrogen_bias: Self::STOICHIOMETRIC_BIAS,
		}
	}

	/// Returns the kind of the `index`-th worker.
	pub fn draw<R: Rng + ?Sized>(&self, index: usize, rng: &mut R) -> AtomKind {
		match self {
			Self::Random { hydrogen_bias } => {
				if rng.gen_bool(hydrogen_bias.clamp(0.0, 1.0)) {
					AtomKind::Hydrogen
				} else {
					AtomKind::Oxygen
				}
			}
			Self::Scripted(kinds) => match kinds.len() {
				0 => AtomKind::Hydrogen,
				len => kinds[index % len],
			},
		}
	}
}
