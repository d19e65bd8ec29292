use std::fmt;

use smallvec::SmallVec;

use crate::atom::AtomKind;

/// Kinds of the atoms bonded into one molecule, in pledge order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Composition(SmallVec<[AtomKind; 3]>);

impl Composition {
	/// Atoms in pledge order.
	pub fn atoms(&self) -> &[AtomKind] {
		&self.0
	}

	/// Number of atoms of `kind`.
	pub fn count(&self, kind: AtomKind) -> usize {
		self.0.iter().filter(|&&k| k == kind).count()
	}

	/// True when the composition is exactly two Hydrogen and one Oxygen.
	pub fn is_water(&self) -> bool {
		self.0.len() == 3 && AtomKind::ALL.iter().all(|&kind| self.count(kind) == kind.required_count())
	}
}

impl FromIterator<AtomKind> for Composition {
	fn from_iter<I: IntoIterator<Item = AtomKind>>(iter: I) -> Self {
		Self(iter.into_iter().collect())
	}
}

impl fmt::Display for Composition {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		self.0.iter().try_for_each(|kind| write!(f, "{kind}"))
	}
}

/// One completed molecule, as produced by the barrier release action.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MoleculeRecord {
	/// 1-based index of the molecule within its run.
	pub ordinal: u64,
	pub composition: Composition,
}

impl fmt::Display for MoleculeRecord {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Molecule {}: {}", self.ordinal, self.composition)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn renders_in_pledge_order() {
		let composition: Composition = [AtomKind::Hydrogen, AtomKind::Oxygen, AtomKind::Hydrogen].into_iter().collect();
		assert_eq!(composition.to_string(), "HOH");
		assert!(composition.is_water());

		let record = MoleculeRecord { ordinal: 4, composition };
		assert_eq!(record.to_string(), "Molecule 4: HOH");
	}

	#[test]
	fn rejects_wrong_stoichiometry() {
		let peroxide: Composition = [AtomKind::Hydrogen, AtomKind::Oxygen, AtomKind::Oxygen].into_iter().collect();
		assert!(!peroxide.is_water());
		assert!(!Composition::default().is_water());
	}
}
