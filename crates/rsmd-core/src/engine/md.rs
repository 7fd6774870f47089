use crate::core::io::traits::CollaboratorError;

/// The external molecular-dynamics engine that propagates and relaxes structures.
///
/// The reactive-step engine only sequences these calls; files, processes and their
/// lifecycle belong to the implementor.
pub trait MdEngine {
    /// Runs the MD sequence that precedes the first cycle of a fresh simulation.
    fn run_initial(&mut self) -> Result<(), CollaboratorError>;

    /// Runs the MD sequence of `cycle`, starting from the structure committed in that cycle.
    fn run(&mut self, cycle: usize) -> Result<(), CollaboratorError>;

    /// Runs the MD sequence of `cycle`, continuing the trajectory of `baseline`.
    fn run_appending(&mut self, cycle: usize, baseline: usize) -> Result<(), CollaboratorError>;

    /// Relaxes the reacted structure written for `cycle`.
    ///
    /// # Return
    ///
    /// Returns `Ok(false)` if the relaxation did not converge. This is an expected outcome
    /// handled by the acceptance policy, not an error.
    fn run_relaxation(&mut self, cycle: usize) -> Result<bool, CollaboratorError>;

    /// Computes the potential energies needed to compare `cycle` against `baseline`.
    fn run_energy_computation(&mut self, cycle: usize, baseline: usize)
    -> Result<(), CollaboratorError>;

    /// Removes the files of a rejected reactive step of `cycle`.
    fn cleanup(&mut self, cycle: usize) -> Result<(), CollaboratorError>;
}
