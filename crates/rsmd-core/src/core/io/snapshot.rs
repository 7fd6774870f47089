//! A plain TOML serialization of [`Topology`] and a file-based [`TopologyIo`] built on it.
//!
//! The format is engine-neutral and meant for inspecting candidate searches, for driving the
//! reactive-step engine from scripts, and for tests:
//!
//! ```toml
//! dimensions = [3.0, 3.0, 3.0]
//!
//! [[molecules]]
//! id = 1
//! name = "SOL"
//!
//! [[molecules.atoms]]
//! id = 1
//! name = "OW"
//! position = [0.1, 0.2, 0.3]
//! velocity = [0.0, 0.0, 0.0]
//! ```

use super::traits::{CollaboratorError, TopologyIo};
use crate::core::models::atom::Atom;
use crate::core::models::ids::{AtomId, MoleculeId};
use crate::core::models::molecule::Molecule;
use crate::core::models::topology::Topology;
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("Failed to serialize topology: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TopologySnapshot {
    pub dimensions: [f64; 3],
    #[serde(default)]
    pub molecules: Vec<MoleculeSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MoleculeSnapshot {
    pub id: usize,
    pub name: String,
    #[serde(default)]
    pub atoms: Vec<AtomSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AtomSnapshot {
    pub id: usize,
    pub name: String,
    pub position: [f64; 3],
    #[serde(default)]
    pub velocity: [f64; 3],
}

impl From<&Topology> for TopologySnapshot {
    fn from(topology: &Topology) -> Self {
        Self {
            dimensions: (*topology.dimensions()).into(),
            molecules: topology
                .molecules()
                .iter()
                .map(|molecule| MoleculeSnapshot {
                    id: molecule.id().0,
                    name: molecule.name().to_string(),
                    atoms: molecule
                        .atoms()
                        .iter()
                        .map(|atom| AtomSnapshot {
                            id: atom.id.0,
                            name: atom.name.clone(),
                            position: atom.position.coords.into(),
                            velocity: atom.velocity.into(),
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

impl From<TopologySnapshot> for Topology {
    fn from(snapshot: TopologySnapshot) -> Self {
        let mut topology = Topology::new(Vector3::from(snapshot.dimensions));
        for molecule in snapshot.molecules {
            let atoms = molecule
                .atoms
                .into_iter()
                .map(|atom| {
                    Atom::new(AtomId(atom.id), &atom.name, Point3::from(atom.position))
                        .with_velocity(Vector3::from(atom.velocity))
                })
                .collect();
            topology.push_molecule(Molecule::with_atoms(
                MoleculeId(molecule.id),
                &molecule.name,
                atoms,
            ));
        }
        topology
    }
}

pub fn to_toml_string(topology: &Topology) -> Result<String, SnapshotError> {
    Ok(toml::to_string(&TopologySnapshot::from(topology))?)
}

/// Reads a topology snapshot from a TOML file.
///
/// # Errors
///
/// Returns [`SnapshotError::Io`] if the file cannot be read and [`SnapshotError::Toml`] if
/// its content is not a valid snapshot.
pub fn read_snapshot(path: &Path) -> Result<Topology, SnapshotError> {
    let content = fs::read_to_string(path).map_err(|e| SnapshotError::Io {
        path: path.to_string_lossy().to_string(),
        source: e,
    })?;
    let snapshot: TopologySnapshot = toml::from_str(&content).map_err(|e| SnapshotError::Toml {
        path: path.to_string_lossy().to_string(),
        source: e,
    })?;
    Ok(snapshot.into())
}

/// Writes a topology snapshot to a TOML file, replacing any existing file.
pub fn write_snapshot(topology: &Topology, path: &Path) -> Result<(), SnapshotError> {
    let content = to_toml_string(topology)?;
    fs::write(path, content).map_err(|e| SnapshotError::Io {
        path: path.to_string_lossy().to_string(),
        source: e,
    })
}

/// A [`TopologyIo`] that keeps one snapshot file per cycle and stage in a directory.
///
/// - `<dir>/<cycle>.toml` is the structure at the start of a cycle,
/// - `<dir>/<cycle>-reacted.toml` is the reacted structure handed to the relaxation,
/// - `<dir>/<cycle>-relaxed.toml` is the relaxed structure.
#[derive(Debug, Clone)]
pub struct SnapshotIo {
    directory: PathBuf,
}

impl SnapshotIo {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn input_path(&self, cycle: usize) -> PathBuf {
        self.directory.join(format!("{cycle}.toml"))
    }

    pub fn reacted_path(&self, cycle: usize) -> PathBuf {
        self.directory.join(format!("{cycle}-reacted.toml"))
    }

    pub fn relaxed_path(&self, cycle: usize) -> PathBuf {
        self.directory.join(format!("{cycle}-relaxed.toml"))
    }

    fn load_into(topology: &mut Topology, path: &Path) -> Result<(), CollaboratorError> {
        debug!(path = %path.display(), "Reading topology snapshot.");
        *topology = read_snapshot(path)
            .map_err(|e| CollaboratorError::failed("reading topology snapshot", e))?;
        Ok(())
    }
}

impl TopologyIo for SnapshotIo {
    fn read(&mut self, topology: &mut Topology, cycle: usize) -> Result<(), CollaboratorError> {
        Self::load_into(topology, &self.input_path(cycle))
    }

    fn read_relaxed(
        &mut self,
        topology: &mut Topology,
        cycle: usize,
    ) -> Result<(), CollaboratorError> {
        Self::load_into(topology, &self.relaxed_path(cycle))
    }

    fn write(&mut self, topology: &Topology, cycle: usize) -> Result<(), CollaboratorError> {
        let path = self.reacted_path(cycle);
        debug!(path = %path.display(), "Writing topology snapshot.");
        write_snapshot(topology, &path)
            .map_err(|e| CollaboratorError::failed("writing topology snapshot", e))
    }
}
