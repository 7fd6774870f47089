use super::{AcceptancePolicy, Collaborators, StepOutcome, StepReport};
use crate::core::io::statistics::RATE_HEADER;
use crate::core::reaction::candidate::ReactionCandidate;
use crate::core::reaction::template::TemplateError;
use crate::engine::error::EngineError;
use crate::engine::random::RandomContext;
use crate::engine::state::{AcceptanceSummary, RateSummary};
use crate::engine::transaction::{ReactiveStep, StepState};
use crate::engine::universe::Universe;
use std::collections::BTreeMap;
use tracing::{debug, info, instrument, warn};

/// Kinetics-based acceptance: every available candidate is accepted with probability
/// `frequency · rate(distance)`, and all accepted reactions share a single relaxation.
///
/// A failed relaxation cannot be rolled back per candidate and ends the simulation.
#[derive(Debug, Clone)]
pub struct RatePolicy {
    frequency: f64,
    summary: RateSummary,
}

impl RatePolicy {
    pub fn new(frequency: f64) -> Self {
        Self {
            frequency,
            summary: RateSummary::default(),
        }
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    fn accept(
        &self,
        candidate: &ReactionCandidate,
        random: &mut RandomContext,
    ) -> Result<bool, EngineError> {
        let rate = candidate
            .current_rate()
            .ok_or_else(|| TemplateError::EmptyRateTable(candidate.name().to_string()))?;
        let draw = random.uniform();
        let condition = self.frequency * rate;
        debug!(
            candidate = %candidate.short_info(),
            "Acceptance condition = {} * {rate} = {condition}",
            self.frequency
        );
        if draw < condition {
            debug!("Candidate accepted: {draw} < {condition}");
            Ok(true)
        } else {
            debug!("Candidate rejected: {draw} !< {condition}");
            Ok(false)
        }
    }

    fn without_reaction(
        &mut self,
        step: &mut ReactiveStep,
        candidates: usize,
        attempted: usize,
        baseline: usize,
    ) -> Result<StepReport, EngineError> {
        step.advance(StepState::MdOnly)?;
        self.summary.cycles_without_reaction += 1;
        self.summary.reactions_attempted += attempted;
        Ok(StepReport {
            cycle: step.cycle(),
            candidates,
            state: step.state(),
            baseline,
            outcome: StepOutcome::Rate {
                accepted: 0,
                attempted,
            },
            movement: None,
        })
    }
}

impl AcceptancePolicy for RatePolicy {
    fn statistics_header(&self) -> &'static [&'static str] {
        &RATE_HEADER
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
        let candidates = universe.search_candidates(random)?;
        let found = candidates.len();

        if candidates.is_empty() {
            info!("Found no candidates.");
            return self.without_reaction(&mut step, 0, 0, baseline);
        }
        info!(count = found, "Found potential reaction candidates.");

        let mut attempted = 0;
        let mut accepted = Vec::new();
        let mut per_reaction: BTreeMap<String, usize> = BTreeMap::new();
        for mut candidate in candidates {
            *per_reaction.entry(candidate.name().to_string()).or_default() += 1;
            if !universe.is_available(&candidate) {
                debug!(candidate = %candidate.short_info(), "Candidate is no longer available for reaction.");
                continue;
            }
            attempted += 1;
            if self.accept(&candidate, random)? {
                universe.react(&mut candidate)?;
                step.advance(StepState::Committed)?;
                info!(candidate = %candidate.short_info(), "Reacted candidate.");
                accepted.push(candidate);
            }
        }

        if accepted.is_empty() {
            info!("No candidates were accepted.");
            return self.without_reaction(&mut step, found, attempted, baseline);
        }

        universe.write(&mut *collaborators.topology_io, cycle)?;
        info!(
            accepted = accepted.len(),
            attempted,
            candidates = found,
            "Reacted accepted candidates out of the available ones."
        );
        for (reaction, count) in &per_reaction {
            info!(reaction = %reaction, count, "Candidates per reaction.");
        }

        step.advance(StepState::Relaxing)?;
        if !collaborators.md.run_relaxation(cycle)? {
            warn!("Relaxation failed, stepping out.");
            step.advance(StepState::Fatal)?;
            return Err(EngineError::RelaxationFailed { cycle });
        }
        info!("Relaxation succeeded.");
        step.advance(StepState::Accepted)?;

        universe.read_relaxed(&mut *collaborators.topology_io, cycle)?;
        let movement = universe.check_movements(&accepted)?;

        self.summary.cycles_with_reaction += 1;
        self.summary.reactions_accepted += accepted.len();
        self.summary.reactions_attempted += attempted;

        Ok(StepReport {
            cycle,
            candidates: found,
            state: step.state(),
            baseline: cycle,
            outcome: StepOutcome::Rate {
                accepted: accepted.len(),
                attempted,
            },
            movement: Some(movement),
        })
    }

    fn summary(&self) -> AcceptanceSummary {
        AcceptanceSummary::Rate(self.summary.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_policy_starts_with_empty_summary() {
        let policy = RatePolicy::new(0.5);
        assert_eq!(policy.frequency(), 0.5);
        assert_eq!(
            policy.summary(),
            AcceptanceSummary::Rate(RateSummary::default())
        );
        assert_eq!(policy.statistics_header()[2], "accepted");
    }
}
