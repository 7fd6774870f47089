use super::units::UnitSystem;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
    #[error("Unknown energy unit '{0}', expected 'kJ/mol' or 'kcal/mol'")]
    UnknownEnergyUnit(String),
}

/// The acceptance criterion deciding whether a reaction candidate is committed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Acceptance {
    /// Energy based: one weighted candidate per cycle, accepted with probability
    /// `exp(-ΔE / RT)` after relaxation.
    Metropolis { temperature: f64 },
    /// Kinetics based: every available candidate is accepted with probability
    /// `frequency · rate(distance)`, all accepted candidates share one relaxation.
    Rate { frequency: f64 },
}

impl Acceptance {
    pub fn name(&self) -> &'static str {
        match self {
            Acceptance::Metropolis { .. } => "metropolis",
            Acceptance::Rate { .. } => "rate",
        }
    }
}

/// Where a restarted simulation resumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartPoint {
    /// The first cycle to run.
    pub cycle: usize,
    /// The last cycle whose structure was committed; its files seed the next search.
    pub baseline: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub cycles: usize,
    /// Seed of the random context, `0` draws one from the operating system.
    pub seed: u64,
    pub acceptance: Acceptance,
    pub units: UnitSystem,
    pub reaction_files: Vec<PathBuf>,
    pub statistics_path: Option<PathBuf>,
    pub checkpoint_path: Option<PathBuf>,
    pub restart: Option<RestartPoint>,
}

impl SimulationConfig {
    /// The cycle the cycle loop starts at.
    pub fn first_cycle(&self) -> usize {
        self.restart.map_or(1, |restart| restart.cycle)
    }

    /// The baseline cycle the cycle loop starts from.
    pub fn first_baseline(&self) -> usize {
        self.restart.map_or(0, |restart| restart.baseline)
    }
}

#[derive(Default)]
pub struct SimulationConfigBuilder {
    cycles: Option<usize>,
    seed: Option<u64>,
    acceptance: Option<Acceptance>,
    units: Option<UnitSystem>,
    reaction_files: Vec<PathBuf>,
    statistics_path: Option<PathBuf>,
    checkpoint_path: Option<PathBuf>,
    restart: Option<RestartPoint>,
}

impl SimulationConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cycles(mut self, cycles: usize) -> Self {
        self.cycles = Some(cycles);
        self
    }
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
    pub fn acceptance(mut self, acceptance: Acceptance) -> Self {
        self.acceptance = Some(acceptance);
        self
    }
    pub fn units(mut self, units: UnitSystem) -> Self {
        self.units = Some(units);
        self
    }
    pub fn reaction_file(mut self, path: PathBuf) -> Self {
        self.reaction_files.push(path);
        self
    }
    pub fn reaction_files(mut self, paths: Vec<PathBuf>) -> Self {
        self.reaction_files = paths;
        self
    }
    pub fn statistics_path(mut self, path: PathBuf) -> Self {
        self.statistics_path = Some(path);
        self
    }
    pub fn checkpoint_path(mut self, path: PathBuf) -> Self {
        self.checkpoint_path = Some(path);
        self
    }
    pub fn restart(mut self, restart: RestartPoint) -> Self {
        self.restart = Some(restart);
        self
    }

    pub fn build(self) -> Result<SimulationConfig, ConfigError> {
        let cycles = self.cycles.ok_or(ConfigError::MissingParameter("cycles"))?;
        let acceptance = self
            .acceptance
            .ok_or(ConfigError::MissingParameter("acceptance"))?;
        if self.reaction_files.is_empty() {
            return Err(ConfigError::MissingParameter("reaction_files"));
        }

        match acceptance {
            Acceptance::Metropolis { temperature } if !(temperature > 0.0) => {
                return Err(ConfigError::InvalidParameter {
                    name: "temperature",
                    reason: format!("must be positive, got {temperature}"),
                });
            }
            Acceptance::Rate { frequency } if !(frequency >= 0.0) => {
                return Err(ConfigError::InvalidParameter {
                    name: "frequency",
                    reason: format!("must not be negative, got {frequency}"),
                });
            }
            _ => {}
        }

        if let Some(restart) = self.restart {
            if restart.cycle == 0 || restart.baseline >= restart.cycle {
                return Err(ConfigError::InvalidParameter {
                    name: "restart",
                    reason: format!(
                        "baseline {} must precede restart cycle {}",
                        restart.baseline, restart.cycle
                    ),
                });
            }
        }

        Ok(SimulationConfig {
            cycles,
            seed: self.seed.unwrap_or(0),
            acceptance,
            units: self.units.unwrap_or_default(),
            reaction_files: self.reaction_files,
            statistics_path: self.statistics_path,
            checkpoint_path: self.checkpoint_path,
            restart: self.restart,
        })
    }
}
