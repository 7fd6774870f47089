use crate::cli::SimulationArgs;
use crate::error::{CliError, Result};
use rsmd::engine::config::{self as core_config, Acceptance};
use rsmd::engine::state::Checkpoint;
use rsmd::engine::units::UnitSystem;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
enum PartialAcceptance {
    Metropolis,
    Rate,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialRunConfig {
    cycles: Option<usize>,
    seed: Option<u64>,
    #[serde(rename = "energy-unit")]
    energy_unit: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialReactionConfig {
    #[serde(default)]
    files: Vec<PathBuf>,
    acceptance: Option<PartialAcceptance>,
    temperature: Option<f64>,
    frequency: Option<f64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialOutputConfig {
    statistics: Option<PathBuf>,
    checkpoint: Option<PathBuf>,
    #[serde(rename = "restart-from")]
    restart_from: Option<PathBuf>,
}

/// The simulation configuration as written in the TOML file; every value is optional until
/// merged with the command-line arguments.
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialSimulationConfig {
    simulation: Option<PartialRunConfig>,
    reaction: Option<PartialReactionConfig>,
    output: Option<PartialOutputConfig>,
}

impl PartialSimulationConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    pub fn merge_with_cli(mut self, args: &SimulationArgs) -> Result<core_config::SimulationConfig> {
        self.apply_set_values(&args.set_values)?;

        let run_config = self.simulation.take().unwrap_or_default();
        let reaction_config = self.reaction.take().unwrap_or_default();
        let output_config = self.output.take().unwrap_or_default();

        let cycles = args.cycles.or(run_config.cycles).ok_or_else(|| {
            CliError::Config("`simulation.cycles` is required.".to_string())
        })?;

        let units = match run_config.energy_unit.as_deref() {
            Some(unit) => {
                UnitSystem::from_energy_unit(unit).map_err(|e| CliError::Config(e.to_string()))?
            }
            None => UnitSystem::default(),
        };

        let acceptance = Self::merge_acceptance(&reaction_config)?;

        let mut reaction_files = reaction_config.files;
        reaction_files.extend(args.reactions.iter().cloned());

        let mut builder = core_config::SimulationConfigBuilder::new()
            .cycles(cycles)
            .seed(args.seed.or(run_config.seed).unwrap_or(0))
            .acceptance(acceptance)
            .units(units)
            .reaction_files(reaction_files);

        if let Some(path) = output_config.statistics {
            builder = builder.statistics_path(path);
        }
        if let Some(path) = output_config.checkpoint {
            builder = builder.checkpoint_path(path);
        }
        if let Some(path) = output_config.restart_from {
            let checkpoint = Checkpoint::read(&path).map_err(|e| CliError::FileParsing {
                path: path.clone(),
                source: e.into(),
            })?;
            builder = builder.restart(checkpoint.restart_point());
        }

        builder.build().map_err(|e| CliError::Config(e.to_string()))
    }

    fn merge_acceptance(reaction: &PartialReactionConfig) -> Result<Acceptance> {
        match reaction.acceptance {
            Some(PartialAcceptance::Metropolis) => {
                let temperature = reaction.temperature.ok_or_else(|| {
                    CliError::Config(
                        "`reaction.temperature` is required for Metropolis acceptance.".to_string(),
                    )
                })?;
                Ok(Acceptance::Metropolis { temperature })
            }
            Some(PartialAcceptance::Rate) => {
                let frequency = reaction.frequency.ok_or_else(|| {
                    CliError::Config(
                        "`reaction.frequency` is required for rate acceptance.".to_string(),
                    )
                })?;
                Ok(Acceptance::Rate { frequency })
            }
            None => Err(CliError::Config(
                "`reaction.acceptance` is required ('metropolis' or 'rate').".to_string(),
            )),
        }
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let Some((key, value_str)) = kv_pair.split_once('=') else {
                return Err(CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                )));
            };

            match key {
                "simulation.cycles" => {
                    self.simulation.get_or_insert_with(Default::default).cycles =
                        Some(parse_value(key, value_str, "integer")?);
                }
                "simulation.seed" => {
                    self.simulation.get_or_insert_with(Default::default).seed =
                        Some(parse_value(key, value_str, "integer")?);
                }
                "simulation.energy-unit" => {
                    self.simulation.get_or_insert_with(Default::default).energy_unit =
                        Some(value_str.to_string());
                }
                "reaction.acceptance" => {
                    let acceptance = match value_str.to_ascii_lowercase().as_str() {
                        "metropolis" => PartialAcceptance::Metropolis,
                        "rate" => PartialAcceptance::Rate,
                        _ => {
                            return Err(CliError::Config(format!(
                                "Invalid value for {}: {}. Expected 'metropolis' or 'rate'.",
                                key, value_str
                            )));
                        }
                    };
                    self.reaction.get_or_insert_with(Default::default).acceptance =
                        Some(acceptance);
                }
                "reaction.temperature" => {
                    self.reaction.get_or_insert_with(Default::default).temperature =
                        Some(parse_value(key, value_str, "float")?);
                }
                "reaction.frequency" => {
                    self.reaction.get_or_insert_with(Default::default).frequency =
                        Some(parse_value(key, value_str, "float")?);
                }
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
        Ok(())
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str, kind: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid {} value for {}: {}", kind, key, value)))
}

/// Reads the configuration file named in the arguments and merges it with the overrides.
pub fn load(args: &SimulationArgs) -> Result<core_config::SimulationConfig> {
    PartialSimulationConfig::from_file(&args.config)?.merge_with_cli(args)
}
