use super::atom::Atom;
use super::ids::{AtomId, AtomIndex, MoleculeId};
use crate::core::utils::geometry::wrap_into_reference_image;
use nalgebra::Vector3;
use tracing::info;

/// An ordered sequence of atoms with a runtime id and a type name.
///
/// The atom order is significant: once established it is assumed to correspond one-to-one
/// to the atom order of the reaction-template molecules of the same name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Molecule {
    id: MoleculeId,
    name: String,
    atoms: Vec<Atom>,
}

impl Molecule {
    /// Creates an empty molecule.
    ///
    /// # Arguments
    ///
    /// * `id` - The runtime identifier of the molecule.
    /// * `name` - The type name shared by all molecules of the same kind (e.g., "SOL").
    pub fn new(id: MoleculeId, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            atoms: Vec::new(),
        }
    }

    /// Creates a molecule from an already assembled atom sequence.
    pub fn with_atoms(id: MoleculeId, name: &str, atoms: Vec<Atom>) -> Self {
        Self {
            id,
            name: name.to_string(),
            atoms,
        }
    }

    pub fn id(&self) -> MoleculeId {
        self.id
    }

    pub fn set_id(&mut self, id: MoleculeId) {
        self.id = id;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn atoms_mut(&mut self) -> &mut [Atom] {
        &mut self.atoms
    }

    pub fn push_atom(&mut self, atom: Atom) {
        self.atoms.push(atom);
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// Returns the atom at a 0-based sequence position.
    pub fn atom(&self, index: AtomIndex) -> Option<&Atom> {
        self.atoms.get(index.0)
    }

    pub fn atom_mut(&mut self, index: AtomIndex) -> Option<&mut Atom> {
        self.atoms.get_mut(index.0)
    }

    /// Finds an atom by its runtime id.
    pub fn atom_by_id(&self, id: AtomId) -> Option<&Atom> {
        self.atoms.iter().find(|atom| atom.id == id)
    }

    /// Finds the sequence position of the first atom with the given name.
    pub fn position_of(&self, name: &str) -> Option<AtomIndex> {
        self.atoms
            .iter()
            .position(|atom| atom.name == name)
            .map(AtomIndex)
    }

    /// Wraps every atom into the periodic image of the first atom.
    ///
    /// Newly produced molecules must be spatially contiguous before they are handed to the
    /// relaxation engine; this moves each atom by whole box edges until it lies within the
    /// half-box window around the reference atom.
    ///
    /// # Arguments
    ///
    /// * `dimensions` - The orthorhombic box edges. Must be non-zero.
    ///
    /// # Return
    ///
    /// Returns `true` if any atom was moved.
    pub fn make_whole(&mut self, dimensions: &Vector3<f64>) -> bool {
        let Some((reference, rest)) = self.atoms.split_first_mut() else {
            return false;
        };

        let mut moved = false;
        for atom in rest {
            let wrapped = wrap_into_reference_image(&reference.position, &atom.position, dimensions);
            if wrapped != atom.position {
                info!(
                    molecule = %self.id,
                    atom = %atom.id,
                    before = ?atom.position.coords.as_slice(),
                    after = ?wrapped.coords.as_slice(),
                    "Repaired periodic image of atom."
                );
                atom.position = wrapped;
                moved = true;
            }
        }
        moved
    }
}
