use super::atom::Atom;
use super::ids::{AtomId, AtomIndex, MoleculeId};
use super::molecule::Molecule;
use nalgebra::Vector3;
use std::fmt;
use thiserror::Error;
use tracing::trace;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TopologyError {
    #[error("Molecule with id {0} not found in topology")]
    MoleculeNotFound(MoleculeId),
    #[error("Atom at position {} not found in molecule {molecule}", .position.one_based())]
    AtomNotFound {
        molecule: MoleculeId,
        position: AtomIndex,
    },
    #[error("No reaction record for reacted molecule {0}")]
    RecordNotFound(MoleculeId),
    #[error("Box dimensions must be positive, got {0:?}")]
    InvalidDimensions([f64; 3]),
}

/// Transient mapping from pre-step to post-step ids of reacted molecules and their atoms.
///
/// Molecule entries are created as `(product id, 0)` when a reaction is committed and
/// receive their final id during [`Topology::sort`], which also fills the atom entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReactionRecord {
    molecules: Vec<(MoleculeId, MoleculeId)>,
    atoms: Vec<(AtomId, AtomId)>,
}

impl ReactionRecord {
    pub fn molecules(&self) -> &[(MoleculeId, MoleculeId)] {
        &self.molecules
    }

    pub fn atoms(&self) -> &[(AtomId, AtomId)] {
        &self.atoms
    }

    pub fn is_empty(&self) -> bool {
        self.molecules.is_empty() && self.atoms.is_empty()
    }

    fn clear(&mut self) {
        self.molecules.clear();
        self.atoms.clear();
    }
}

/// An ordered collection of molecules inside an orthorhombic periodic box.
///
/// After [`Topology::sort`], molecules are grouped by name and molecule ids and atom ids are
/// dense (`1..=M` and `1..=N`) in emission order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Topology {
    molecules: Vec<Molecule>,
    dimensions: Vector3<f64>,
    record: ReactionRecord,
}

impl Topology {
    /// Creates an empty topology with the given box edges.
    pub fn new(dimensions: Vector3<f64>) -> Self {
        Self {
            molecules: Vec::new(),
            dimensions,
            record: ReactionRecord::default(),
        }
    }

    pub fn dimensions(&self) -> &Vector3<f64> {
        &self.dimensions
    }

    pub fn set_dimensions(&mut self, dimensions: Vector3<f64>) {
        self.dimensions = dimensions;
    }

    /// Returns the box edges, refusing a box whose edges are not all positive.
    ///
    /// Every periodic-boundary computation must go through a non-degenerate box.
    pub fn checked_dimensions(&self) -> Result<Vector3<f64>, TopologyError> {
        if self.dimensions.iter().any(|&edge| !(edge > 0.0)) {
            return Err(TopologyError::InvalidDimensions(self.dimensions.into()));
        }
        Ok(self.dimensions)
    }

    pub fn volume(&self) -> f64 {
        self.dimensions.x * self.dimensions.y * self.dimensions.z
    }

    pub fn molecules(&self) -> &[Molecule] {
        &self.molecules
    }

    pub fn molecules_mut(&mut self) -> &mut [Molecule] {
        &mut self.molecules
    }

    pub fn len(&self) -> usize {
        self.molecules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.molecules.is_empty()
    }

    pub fn atom_count(&self) -> usize {
        self.molecules.iter().map(Molecule::len).sum()
    }

    pub fn atoms(&self) -> impl Iterator<Item = &Atom> {
        self.molecules.iter().flat_map(|molecule| molecule.atoms().iter())
    }

    pub fn push_molecule(&mut self, molecule: Molecule) {
        self.molecules.push(molecule);
    }

    /// Returns the first molecule carrying the given id.
    pub fn molecule(&self, id: MoleculeId) -> Result<&Molecule, TopologyError> {
        self.molecules
            .iter()
            .find(|molecule| molecule.id() == id)
            .ok_or(TopologyError::MoleculeNotFound(id))
    }

    /// Returns every molecule with the given type name, in topology order.
    pub fn molecules_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Molecule> + 'a {
        self.molecules
            .iter()
            .filter(move |molecule| molecule.name() == name)
    }

    /// Returns the distinct molecule type names in order of first appearance.
    pub fn molecule_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = Vec::new();
        for molecule in &self.molecules {
            if !types.contains(&molecule.name()) {
                types.push(molecule.name());
            }
        }
        types
    }

    pub fn max_molecule_id(&self) -> MoleculeId {
        self.molecules
            .iter()
            .map(Molecule::id)
            .max()
            .unwrap_or_default()
    }

    /// Checks whether a molecule with the same id and name is present.
    pub fn contains(&self, molecule: &Molecule) -> bool {
        self.molecules
            .iter()
            .any(|m| m.id() == molecule.id() && m.name() == molecule.name())
    }

    pub fn contains_id(&self, id: MoleculeId) -> bool {
        self.molecules.iter().any(|m| m.id() == id)
    }

    /// Removes every molecule with the given id and returns how many were removed.
    pub fn remove_molecule(&mut self, id: MoleculeId) -> usize {
        let before = self.molecules.len();
        self.molecules.retain(|molecule| molecule.id() != id);
        before - self.molecules.len()
    }

    pub fn record(&self) -> &ReactionRecord {
        &self.record
    }

    /// Registers a freshly inserted product molecule whose final id is not known yet.
    pub fn add_reaction_record(&mut self, id: MoleculeId) {
        self.record.molecules.push((id, MoleculeId(0)));
    }

    /// Looks up the post-sort id of a molecule registered with [`Topology::add_reaction_record`].
    pub fn reaction_record(&self, old: MoleculeId) -> Result<MoleculeId, TopologyError> {
        self.record
            .molecules
            .iter()
            .find(|(from, _)| *from == old)
            .map(|(_, to)| *to)
            .ok_or(TopologyError::RecordNotFound(old))
    }

    pub fn clear_reaction_records(&mut self) {
        self.record.clear();
    }

    /// Removes all molecules, resets the box and clears the reaction records.
    pub fn clear(&mut self) {
        self.molecules.clear();
        self.dimensions = Vector3::zeros();
        self.record.clear();
    }

    /// Groups molecules by name and renumbers molecules and atoms densely.
    ///
    /// Molecules are stably sorted by name, so molecules of equal name keep their relative
    /// order. Molecule ids become `1..=M` and atom ids `1..=N` in the new order. For every
    /// molecule registered in the reaction record, the record's new-id field is updated and
    /// the old→new id pairs of its atoms are appended to the atom record, which is cleared
    /// beforehand.
    pub fn sort(&mut self) {
        self.record.atoms.clear();
        self.molecules.sort_by(|a, b| a.name().cmp(b.name()));

        let mut atom_counter = 0;
        for (index, molecule) in self.molecules.iter_mut().enumerate() {
            let new_id = MoleculeId(index + 1);

            let entry = self
                .record
                .molecules
                .iter_mut()
                .find(|(from, _)| *from == molecule.id());
            let reacted = match entry {
                Some(entry) => {
                    entry.1 = new_id;
                    true
                }
                None => false,
            };

            if molecule.id() != new_id {
                trace!(molecule = molecule.name(), from = %molecule.id(), to = %new_id, "Renumbered molecule.");
            }
            molecule.set_id(new_id);

            for atom in molecule.atoms_mut() {
                atom_counter += 1;
                let new_atom_id = AtomId(atom_counter);
                if reacted {
                    self.record.atoms.push((atom.id, new_atom_id));
                }
                atom.id = new_atom_id;
            }
        }
    }

    /// Wraps the atoms of the molecule with the given id into the image of its first atom.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::MoleculeNotFound`] if no molecule carries the id, or
    /// [`TopologyError::InvalidDimensions`] if the box is degenerate.
    pub fn repair_molecule(&mut self, id: MoleculeId) -> Result<bool, TopologyError> {
        let dimensions = self.checked_dimensions()?;
        let molecule = self
            .molecules
            .iter_mut()
            .find(|molecule| molecule.id() == id)
            .ok_or(TopologyError::MoleculeNotFound(id))?;
        Ok(molecule.make_whole(&dimensions))
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Topology contains {} molecules within box dimensions [{}, {}, {}]>",
            self.molecules.len(),
            self.dimensions.x,
            self.dimensions.y,
            self.dimensions.z
        )
    }
}
