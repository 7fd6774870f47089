use super::{AcceptancePolicy, Collaborators, StepReport, policy_for};
use crate::core::io::statistics::StatisticsWriter;
use crate::core::reaction::template::ReactionTemplate;
use crate::engine::config::SimulationConfig;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::random::RandomContext;
use crate::engine::shutdown::ShutdownController;
use crate::engine::state::{Checkpoint, RunSummary};
use crate::engine::universe::Universe;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// A reactive-step simulation: the universe, the acceptance policy and the cycle loop.
pub struct Simulation {
    config: SimulationConfig,
    universe: Universe,
    random: RandomContext,
    policy: Box<dyn AcceptancePolicy>,
    statistics: Option<StatisticsWriter>,
    shutdown: Arc<ShutdownController>,
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("config", &self.config)
            .field("random", &self.random)
            .field("statistics", &self.statistics)
            .finish_non_exhaustive()
    }
}

impl Simulation {
    /// Prepares a simulation from its configuration.
    ///
    /// Reads the reaction templates, seeds the random context and, if configured, opens the
    /// statistics table (appending when the simulation is restarted).
    ///
    /// # Errors
    ///
    /// Returns an error if a template cannot be loaded or is unusable with the configured
    /// acceptance criterion, or if the statistics file cannot be opened.
    pub fn new(config: SimulationConfig) -> Result<Self, EngineError> {
        info!(
            acceptance = config.acceptance.name(),
            cycles = config.cycles,
            "Setting up reactive-step simulation."
        );
        let templates = Universe::load_templates(&config.reaction_files, &config.acceptance)?;
        let random = RandomContext::from_seed_option(config.seed);
        let mut simulation = Self::with_parts(config, templates, random)?;

        if let Some(path) = simulation.config.statistics_path.clone() {
            let append = simulation.config.restart.is_some();
            let writer =
                StatisticsWriter::open(&path, simulation.policy.statistics_header(), append)?;
            info!(path = %path.display(), append, "Opened statistics file.");
            simulation.statistics = Some(writer);
        }
        Ok(simulation)
    }

    /// Assembles a simulation from already loaded templates and a given random context.
    ///
    /// No statistics are written unless a writer is attached with
    /// [`Simulation::with_statistics`].
    pub fn with_parts(
        config: SimulationConfig,
        templates: Vec<ReactionTemplate>,
        random: RandomContext,
    ) -> Result<Self, EngineError> {
        let policy = policy_for(&config.acceptance, config.units, &templates);
        let universe = Universe::new(templates, config.units)?;
        Ok(Self {
            config,
            universe,
            random,
            policy,
            statistics: None,
            shutdown: Arc::new(ShutdownController::new()),
        })
    }

    /// Attaches a statistics writer; the header is expected to be written already.
    pub fn with_statistics(mut self, writer: StatisticsWriter) -> Self {
        self.statistics = Some(writer);
        self
    }

    /// Shares a shutdown controller with the signal handlers of the caller.
    pub fn with_shutdown(mut self, shutdown: Arc<ShutdownController>) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn universe(&self) -> &Universe {
        &self.universe
    }

    pub fn shutdown(&self) -> &Arc<ShutdownController> {
        &self.shutdown
    }

    /// Runs the cycle loop until the configured number of cycles is completed or a shutdown
    /// is requested.
    ///
    /// Every cycle performs a reactive step followed by the MD sequence. The MD sequence
    /// starts fresh from the cycle's structure if the step was committed and otherwise
    /// appends to the trajectory of the last committed cycle.
    ///
    /// # Errors
    ///
    /// Returns the first error of a reactive step, an MD run or the statistics and
    /// checkpoint files. A failed relaxation under the rate criterion is such an error.
    #[instrument(skip_all, name = "simulation_workflow")]
    pub fn run(
        &mut self,
        collaborators: &mut Collaborators<'_>,
        reporter: &ProgressReporter,
    ) -> Result<RunSummary, EngineError> {
        let mut cycle = self.config.first_cycle();
        let mut baseline = self.config.first_baseline();
        let last_cycle = self.config.cycles;
        let mut completed = 0;
        let mut checkpoint = None;

        reporter.report(Progress::RunStart {
            first_cycle: cycle,
            last_cycle,
        });

        if cycle == 1 {
            info!("Running initial MD sequence.");
            collaborators.md.run_initial()?;
        } else {
            info!(cycle, baseline, "Restarting simulation.");
        }

        while cycle <= last_cycle {
            if self.shutdown.is_requested() {
                info!(cycle, "Shutdown requested, stopping before the reactive step.");
                break;
            }
            reporter.report(Progress::CycleStart { cycle });
            info!(cycle, "Starting reactive step.");

            let report = self.policy.reactive_step(
                &mut self.universe,
                &mut self.random,
                collaborators,
                cycle,
                baseline,
            )?;
            self.record(&report)?;
            reporter.report(Progress::StepFinished {
                cycle,
                candidates: report.candidates,
                outcome: report.state.label(),
            });
            baseline = report.baseline;

            if self.shutdown.is_requested() && !self.shutdown.is_civilised() {
                info!(cycle, "Shutdown requested, skipping the MD sequence.");
                break;
            }

            if baseline == cycle {
                collaborators.md.run(cycle)?;
            } else {
                collaborators.md.run_appending(cycle, baseline)?;
            }
            reporter.report(Progress::CycleFinish { cycle });
            completed += 1;
            cycle += 1;

            if self.shutdown.is_civilised() {
                let state = Checkpoint {
                    restart_cycle: cycle,
                    restart_cycle_files: baseline,
                };
                match &self.config.checkpoint_path {
                    Some(path) => state.write(path)?,
                    None => warn!("No checkpoint path configured, restart information is only logged."),
                }
                info!(
                    restart_cycle = state.restart_cycle,
                    restart_cycle_files = state.restart_cycle_files,
                    "Civilised shutdown completed."
                );
                checkpoint = Some(state);
                break;
            }
        }

        reporter.report(Progress::RunFinish);
        let summary = RunSummary {
            cycles_completed: completed,
            next_cycle: cycle,
            baseline,
            interrupted: self.shutdown.is_requested(),
            checkpoint,
            acceptance: self.policy.summary(),
        };
        summary.log();
        Ok(summary)
    }

    fn record(&mut self, report: &StepReport) -> Result<(), EngineError> {
        if let Some(movement) = &report.movement {
            if movement.is_suspicious() {
                warn!(
                    cycle = report.cycle,
                    above_twice = movement.above_twice,
                    above_thrice = movement.above_thrice,
                    "Large atom movements during relaxation."
                );
            }
        }
        if let Some(writer) = self.statistics.as_mut() {
            report.write_statistics(writer)?;
        }
        Ok(())
    }
}
