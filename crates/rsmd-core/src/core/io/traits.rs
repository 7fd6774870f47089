use crate::core::models::topology::Topology;
use std::error::Error;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure reported by one of the external collaborators (topology I/O, energy reader,
/// MD engine).
///
/// Collaborator failures are fatal for the reactive-step engine; the only exception is a
/// relaxation that reports non-success, which is signalled through a return value instead.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("I/O error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{context}: {source}")]
    Failed {
        context: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    #[error("{0}")]
    Message(String),
}

impl CollaboratorError {
    /// Wraps an arbitrary error with a description of the operation that failed.
    pub fn failed(context: impl Into<String>, source: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        Self::Failed {
            context: context.into(),
            source: source.into(),
        }
    }
}

/// Reads and writes topologies in the native format of the external MD engine.
///
/// Implementors own the mapping between cycle numbers and files; the reactive-step engine
/// only ever refers to cycles.
pub trait TopologyIo {
    /// Reads the topology at the start of a cycle.
    ///
    /// # Arguments
    ///
    /// * `topology` - The topology to fill. It is cleared by the caller beforehand.
    /// * `cycle` - The cycle whose input structure should be read.
    ///
    /// # Errors
    ///
    /// Returns an error if the files cannot be opened or parsed.
    fn read(&mut self, topology: &mut Topology, cycle: usize) -> Result<(), CollaboratorError>;

    /// Reads the structure produced by the relaxation of a cycle.
    ///
    /// # Arguments
    ///
    /// * `topology` - The topology to fill. It is cleared by the caller beforehand.
    /// * `cycle` - The cycle whose relaxed structure should be read.
    ///
    /// # Errors
    ///
    /// Returns an error if the files cannot be opened or parsed.
    fn read_relaxed(&mut self, topology: &mut Topology, cycle: usize)
    -> Result<(), CollaboratorError>;

    /// Writes a (sorted) topology as the relaxation input of a cycle.
    ///
    /// # Arguments
    ///
    /// * `topology` - The topology to write. Molecules are grouped by name and densely
    ///   numbered.
    /// * `cycle` - The cycle the written files belong to.
    ///
    /// # Errors
    ///
    /// Returns an error if the files cannot be created or written.
    fn write(&mut self, topology: &Topology, cycle: usize) -> Result<(), CollaboratorError>;
}

/// Reads potential energies computed by the external MD engine.
pub trait EnergyReader {
    /// Returns the potential energy of the relaxed structure of `cycle` minus that of the
    /// structure committed at `baseline`.
    ///
    /// # Errors
    ///
    /// Returns an error if the energy output cannot be read or parsed.
    fn read_potential_energy_difference(
        &mut self,
        cycle: usize,
        baseline: usize,
    ) -> Result<f64, CollaboratorError>;
}
