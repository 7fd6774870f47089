//! # Workflows Module
//!
//! The top-level entry points of the reactive-step engine.
//!
//! ## Overview
//!
//! A simulation alternates reactive steps with MD propagation performed by an external
//! engine. Each reactive step is decided by an acceptance policy:
//!
//! - **Metropolis** ([`metropolis`]) - Picks one candidate weighted by its activation energy,
//!   relaxes the reacted structure and accepts it according to the energy change.
//! - **Rate** ([`rate`]) - Accepts every available candidate with a probability given by its
//!   distance-dependent rate and relaxes all accepted reactions together.
//!
//! The cycle loop in [`simulation`] sequences the policies with the MD runs, writes the
//! statistics table, honours shutdown requests and produces the run summary.

pub mod metropolis;
pub mod rate;
pub mod simulation;

use crate::core::io::statistics::{
    MetropolisRecord, RateRecord, StatisticsError, StatisticsWriter,
};
use crate::core::io::traits::{EnergyReader, TopologyIo};
use crate::core::reaction::template::ReactionTemplate;
use crate::engine::config::Acceptance;
use crate::engine::error::EngineError;
use crate::engine::md::MdEngine;
use crate::engine::random::RandomContext;
use crate::engine::state::AcceptanceSummary;
use crate::engine::transaction::StepState;
use crate::engine::units::UnitSystem;
use crate::engine::universe::{MovementReport, Universe};

/// The external collaborators a simulation talks to.
pub struct Collaborators<'a> {
    pub md: &'a mut dyn MdEngine,
    pub topology_io: &'a mut dyn TopologyIo,
    pub energy: &'a mut dyn EnergyReader,
}

/// Policy-specific result of a reactive step.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Metropolis { chosen_reaction: Option<String> },
    Rate { accepted: usize, attempted: usize },
}

/// The result of one reactive step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    pub cycle: usize,
    pub candidates: usize,
    /// The final state of the step.
    pub state: StepState,
    /// The baseline after the step; equals `cycle` if the step was committed.
    pub baseline: usize,
    pub outcome: StepOutcome,
    pub movement: Option<MovementReport>,
}

impl StepReport {
    pub fn is_committed(&self) -> bool {
        self.state == StepState::Accepted
    }

    /// Appends the step's row to the statistics table.
    pub fn write_statistics(&self, writer: &mut StatisticsWriter) -> Result<(), StatisticsError> {
        match &self.outcome {
            StepOutcome::Metropolis { chosen_reaction } => {
                writer.write_metropolis(&MetropolisRecord {
                    cycle: self.cycle,
                    candidates: self.candidates,
                    chosen_reaction: chosen_reaction.as_deref().unwrap_or("none"),
                    outcome: self.state.label(),
                })
            }
            StepOutcome::Rate {
                accepted,
                attempted,
            } => writer.write_rate(&RateRecord {
                cycle: self.cycle,
                candidates: self.candidates,
                accepted: *accepted,
                attempted: *attempted,
            }),
        }
    }
}

/// Decides which candidates of a reactive step are committed.
pub trait AcceptancePolicy {
    /// The column names of the policy's statistics table.
    fn statistics_header(&self) -> &'static [&'static str];

    /// Performs the reactive step of `cycle`, starting from the structure committed at
    /// `baseline`.
    ///
    /// # Errors
    ///
    /// Returns an error if a collaborator fails, an internal lookup fails, or the policy
    /// treats a failed relaxation as fatal.
    fn reactive_step(
        &mut self,
        universe: &mut Universe,
        random: &mut RandomContext,
        collaborators: &mut Collaborators<'_>,
        cycle: usize,
        baseline: usize,
    ) -> Result<StepReport, EngineError>;

    fn summary(&self) -> AcceptanceSummary;
}

/// Creates the policy for a configured acceptance criterion.
pub fn policy_for(
    acceptance: &Acceptance,
    units: UnitSystem,
    templates: &[ReactionTemplate],
) -> Box<dyn AcceptancePolicy> {
    match *acceptance {
        Acceptance::Metropolis { temperature } => Box::new(metropolis::MetropolisPolicy::new(
            temperature,
            units,
            templates,
        )),
        Acceptance::Rate { frequency } => Box::new(rate::RatePolicy::new(frequency)),
    }
}
