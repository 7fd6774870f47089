use super::{AcceptancePolicy, Collaborators, StepOutcome, StepReport};
use crate::core::io::statistics::METROPOLIS_HEADER;
use crate::core::io::traits::EnergyReader;
use crate::core::reaction::candidate::ReactionCandidate;
use crate::core::reaction::template::ReactionTemplate;
use crate::engine::error::EngineError;
use crate::engine::random::RandomContext;
use crate::engine::state::{AcceptanceSummary, MetropolisSummary};
use crate::engine::transaction::{ReactiveStep, StepState};
use crate::engine::units::UnitSystem;
use crate::engine::universe::Universe;
use tracing::{info, instrument};

/// Energy-based acceptance: one candidate per cycle, chosen with probability proportional
/// to `exp(-Ea / RT)` and accepted with probability `exp(-ΔE / RT)` after relaxation.
#[derive(Debug, Clone)]
pub struct MetropolisPolicy {
    temperature: f64,
    units: UnitSystem,
    summary: MetropolisSummary,
}

impl MetropolisPolicy {
    pub fn new(temperature: f64, units: UnitSystem, templates: &[ReactionTemplate]) -> Self {
        let mut summary = MetropolisSummary::default();
        for template in templates {
            summary.failed_relaxations.insert(template.name.clone(), 0);
        }
        Self {
            temperature,
            units,
            summary,
        }
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// `exp(-ΔE / RT)` for a total energy change `ΔE`.
    pub fn acceptance_probability(&self, energy_change: f64) -> f64 {
        (-energy_change / self.units.thermal_energy(self.temperature)).exp()
    }

    fn choose(
        &self,
        candidates: &[ReactionCandidate],
        random: &mut RandomContext,
    ) -> Result<usize, EngineError> {
        let energies: Vec<f64> = candidates
            .iter()
            .map(ReactionCandidate::activation_energy)
            .collect();
        let beta = 1.0 / self.units.thermal_energy(self.temperature);
        Ok(random.boltzmann_choice(&energies, beta)?)
    }

    fn accept(
        &self,
        candidate: &ReactionCandidate,
        energy: &mut dyn EnergyReader,
        random: &mut RandomContext,
        cycle: usize,
        baseline: usize,
    ) -> Result<bool, EngineError> {
        let draw = random.uniform();
        let difference = energy.read_potential_energy_difference(cycle, baseline)?;
        let total = difference + candidate.reaction_energy();
        let unit = self.units.energy;
        info!(
            "Potential energy difference = {difference} + {} = {total} {unit}",
            candidate.reaction_energy()
        );

        let condition = self.acceptance_probability(total);
        if draw < condition {
            info!("Candidate accepted: {draw:.3} < {condition:.3}");
            Ok(true)
        } else {
            info!("Candidate rejected: {draw:.3} !< {condition:.3}");
            Ok(false)
        }
    }
}

impl AcceptancePolicy for MetropolisPolicy {
    fn statistics_header(&self) -> &'static [&'static str] {
        &METROPOLIS_HEADER
    }

    #[instrument(level = "info", skip_all, fields(cycle = cycle))]
    fn reactive_step(
        &mut self,
        universe: &mut Universe,
        random: &mut RandomContext,
        collaborators: &mut Collaborators<'_>,
        cycle: usize,
        baseline: usize,
    ) -> Result<StepReport, EngineError> {
        let mut step = ReactiveStep::begin(cycle);
        universe.update(&mut *collaborators.topology_io, baseline)?;
        let mut candidates = universe.search_candidates(random)?;
        let found = candidates.len();

        if candidates.is_empty() {
            info!("No reaction candidates available.");
            step.advance(StepState::MdOnly)?;
            self.summary.cycles_without_candidates += 1;
            return Ok(StepReport {
                cycle,
                candidates: 0,
                state: step.state(),
                baseline,
                outcome: StepOutcome::Metropolis {
                    chosen_reaction: None,
                },
                movement: None,
            });
        }

        let chosen = self.choose(&candidates, random)?;
        let mut candidate = candidates.swap_remove(chosen);
        info!(candidate = %candidate.short_info(), "Testing reaction candidate.");
        let chosen_reaction = Some(candidate.name().to_string());

        universe.react(&mut candidate)?;
        step.advance(StepState::Committed)?;
        universe.write(&mut *collaborators.topology_io, cycle)?;
        step.advance(StepState::Relaxing)?;

        if !collaborators.md.run_relaxation(cycle)? {
            info!("Reactive step rejected due to a failed relaxation.");
            collaborators.md.cleanup(cycle)?;
            step.advance(StepState::RejectedFailedRelaxation)?;
            self.summary.rejected_failed_relaxation += 1;
            *self
                .summary
                .failed_relaxations
                .entry(candidate.name().to_string())
                .or_default() += 1;
            return Ok(StepReport {
                cycle,
                candidates: found,
                state: step.state(),
                baseline,
                outcome: StepOutcome::Metropolis { chosen_reaction },
                movement: None,
            });
        }

        collaborators.md.run_energy_computation(cycle, baseline)?;
        let accepted = self.accept(
            &candidate,
            &mut *collaborators.energy,
            random,
            cycle,
            baseline,
        )?;

        universe.read_relaxed(&mut *collaborators.topology_io, cycle)?;
        let movement = universe.check_movement(&candidate)?;

        let new_baseline = if accepted {
            step.advance(StepState::Accepted)?;
            self.summary.accepted += 1;
            cycle
        } else {
            collaborators.md.cleanup(cycle)?;
            step.advance(StepState::Rejected)?;
            self.summary.rejected += 1;
            baseline
        };

        Ok(StepReport {
            cycle,
            candidates: found,
            state: step.state(),
            baseline: new_baseline,
            outcome: StepOutcome::Metropolis { chosen_reaction },
            movement: Some(movement),
        })
    }

    fn summary(&self) -> AcceptanceSummary {
        AcceptanceSummary::Metropolis(self.summary.clone())
    }
}
