use super::config::RestartPoint;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum CheckpointError {
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
    #[error("Failed to serialize checkpoint: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// The resumable state of an interrupted simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct Checkpoint {
    /// The first cycle the restarted simulation runs.
    pub restart_cycle: usize,
    /// The last committed cycle, whose files seed the restarted simulation.
    pub restart_cycle_files: usize,
}

impl Checkpoint {
    pub fn restart_point(&self) -> RestartPoint {
        RestartPoint {
            cycle: self.restart_cycle,
            baseline: self.restart_cycle_files,
        }
    }

    pub fn read(path: &Path) -> Result<Self, CheckpointError> {
        let content = fs::read_to_string(path).map_err(|e| CheckpointError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| CheckpointError::Toml {
            path: path.to_string_lossy().to_string(),
            source: e,
        })
    }

    pub fn write(&self, path: &Path) -> Result<(), CheckpointError> {
        let content = toml::to_string(self)?;
        fs::write(path, content).map_err(|e| CheckpointError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        info!(path = %path.display(), "Wrote restart checkpoint.");
        Ok(())
    }
}

/// Counters kept by the Metropolis policy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetropolisSummary {
    pub accepted: usize,
    pub rejected: usize,
    pub rejected_failed_relaxation: usize,
    pub cycles_without_candidates: usize,
    /// Failed relaxations per reaction name.
    pub failed_relaxations: BTreeMap<String, usize>,
}

/// Counters kept by the rate policy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateSummary {
    pub cycles_with_reaction: usize,
    pub cycles_without_reaction: usize,
    pub reactions_accepted: usize,
    pub reactions_attempted: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcceptanceSummary {
    Metropolis(MetropolisSummary),
    Rate(RateSummary),
}

/// The result of a simulation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub cycles_completed: usize,
    /// The cycle the simulation would run next.
    pub next_cycle: usize,
    /// The last committed cycle.
    pub baseline: usize,
    pub interrupted: bool,
    /// Set if the run stopped on a civilised shutdown request.
    pub checkpoint: Option<Checkpoint>,
    pub acceptance: AcceptanceSummary,
}

impl RunSummary {
    /// Logs the final counters of the run.
    pub fn log(&self) {
        info!("Finished reactive-step simulation.");
        match &self.acceptance {
            AcceptanceSummary::Metropolis(summary) => {
                info!(
                    total = summary.accepted + summary.rejected + summary.rejected_failed_relaxation,
                    accepted = summary.accepted,
                    rejected = summary.rejected,
                    rejected_failed_relaxation = summary.rejected_failed_relaxation,
                    "Reactive steps performed."
                );
                for (reaction, count) in &summary.failed_relaxations {
                    info!(reaction = %reaction, count, "Failed relaxations.");
                }
            }
            AcceptanceSummary::Rate(summary) => {
                info!(
                    total = summary.cycles_with_reaction + summary.cycles_without_reaction,
                    with_reaction = summary.cycles_with_reaction,
                    without_reaction = summary.cycles_without_reaction,
                    "Reactive steps performed."
                );
            }
        }
        if self.interrupted {
            info!(
                next_cycle = self.next_cycle,
                baseline = self.baseline,
                "Simulation was interrupted."
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn checkpoint_file_round_trips_and_yields_restart_point() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("restart.toml");
        let checkpoint = Checkpoint {
            restart_cycle: 12,
            restart_cycle_files: 9,
        };

        checkpoint.write(&path).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("restart-cycle = 12"));
        assert!(content.contains("restart-cycle-files = 9"));

        let restored = Checkpoint::read(&path).unwrap();
        assert_eq!(restored, checkpoint);
        assert_eq!(
            restored.restart_point(),
            RestartPoint {
                cycle: 12,
                baseline: 9
            }
        );
    }

    #[test]
    fn reading_checkpoint_reports_missing_and_malformed_files() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            Checkpoint::read(&dir.path().join("absent.toml")),
            Err(CheckpointError::Io { .. })
        ));

        let malformed = dir.path().join("malformed.toml");
        fs::write(&malformed, "restart-cycle = 3\nlast = 1\n").unwrap();
        assert!(matches!(
            Checkpoint::read(&malformed),
            Err(CheckpointError::Toml { .. })
        ));
    }
}
