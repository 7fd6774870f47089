//! Identifier and index types.
//!
//! Two families of numbers circulate through the reactive-step engine and must never be mixed:
//!
//! - **Runtime ids** ([`MoleculeId`], [`AtomId`]) are carried by molecules and atoms and are
//!   rewritten whenever a topology is renumbered.
//! - **Structural indices** ([`ReactantIndex`], [`ProductIndex`], [`AtomIndex`]) are 0-based
//!   positions into a reaction template's own reactant/product sequences. They never change
//!   after a template has been loaded.

use std::fmt;

/// Runtime identifier of a molecule inside a topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct MoleculeId(pub usize);

/// Runtime identifier of an atom inside a topology.
///
/// Inside a reaction template, atoms carry small sequential placeholder ids starting at 1;
/// the placeholder id `k` designates the atom at sequence position `k - 1` of a real molecule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct AtomId(pub usize);

impl AtomId {
    /// Interprets this id as a template placeholder and returns the sequence position it
    /// designates in a matching real molecule.
    ///
    /// Returns `None` for the unset id `0`.
    pub fn position_in_molecule(self) -> Option<AtomIndex> {
        self.0.checked_sub(1).map(AtomIndex)
    }
}

impl fmt::Display for MoleculeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for AtomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 0-based position of a molecule within a template's reactant sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReactantIndex(pub usize);

/// 0-based position of a molecule within a template's product sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProductIndex(pub usize);

/// 0-based position of an atom within a molecule's atom sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AtomIndex(pub usize);

macro_rules! structural_index {
    ($($name:ident),*) => {
        $(
            impl $name {
                /// Converts a 1-based number as written in reaction files into an index.
                ///
                /// Returns `None` for `0`, which has no 0-based counterpart.
                pub fn from_one_based(number: usize) -> Option<Self> {
                    number.checked_sub(1).map(Self)
                }

                /// The 1-based number under which this index appears in reaction files.
                pub fn one_based(self) -> usize {
                    self.0 + 1
                }
            }
        )*
    };
}

structural_index!(ReactantIndex, ProductIndex, AtomIndex);

/// Reference to one atom of a template's reactant molecules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReactantAtom {
    pub molecule: ReactantIndex,
    pub atom: AtomIndex,
}

/// Reference to one atom of a template's product molecules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProductAtom {
    pub molecule: ProductIndex,
    pub atom: AtomIndex,
}

impl ReactantAtom {
    pub fn new(molecule: ReactantIndex, atom: AtomIndex) -> Self {
        Self { molecule, atom }
    }
}

impl ProductAtom {
    pub fn new(molecule: ProductIndex, atom: AtomIndex) -> Self {
        Self { molecule, atom }
    }
}

impl fmt::Display for ReactantAtom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.molecule.one_based(), self.atom.one_based())
    }
}

impl fmt::Display for ProductAtom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.molecule.one_based(), self.atom.one_based())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_based_conversion_rejects_zero() {
        assert_eq!(ReactantIndex::from_one_based(0), None);
        assert_eq!(ProductIndex::from_one_based(1), Some(ProductIndex(0)));
        assert_eq!(AtomIndex::from_one_based(4), Some(AtomIndex(3)));
        assert_eq!(AtomIndex(3).one_based(), 4);
    }

    #[test]
    fn position_in_molecule_is_offset_by_one() {
        assert_eq!(AtomId(1).position_in_molecule(), Some(AtomIndex(0)));
        assert_eq!(AtomId(7).position_in_molecule(), Some(AtomIndex(6)));
        assert_eq!(AtomId(0).position_in_molecule(), None);
    }

    #[test]
    fn atom_references_display_in_file_numbering() {
        let reference = ReactantAtom::new(ReactantIndex(1), AtomIndex(0));
        assert_eq!(reference.to_string(), "(2, 1)");
        let reference = ProductAtom::new(ProductIndex(0), AtomIndex(5));
        assert_eq!(reference.to_string(), "(1, 6)");
    }
}
