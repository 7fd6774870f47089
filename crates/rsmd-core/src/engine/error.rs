use thiserror::Error;

use super::config::ConfigError;
use super::random::ChoiceError;
use super::state::CheckpointError;
use super::transaction::StepState;
use crate::core::io::reaction::ReactionFileError;
use crate::core::io::statistics::StatisticsError;
use crate::core::io::traits::CollaboratorError;
use crate::core::models::topology::TopologyError;
use crate::core::reaction::candidate::CandidateError;
use crate::core::reaction::template::TemplateError;
use std::path::PathBuf;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Initialization failed: {0}")]
    Initialization(String),

    #[error("Invalid configuration: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Failed to load reaction template from '{path}': {source}")]
    TemplateFile {
        path: PathBuf,
        #[source]
        source: ReactionFileError,
    },

    #[error("Reaction template rejected: {source}")]
    Template {
        #[from]
        source: TemplateError,
    },

    #[error("Lookup failed: {source}")]
    Lookup {
        #[from]
        source: TopologyError,
    },

    #[error("Reaction '{name}' combines {count} reactants, at most 3 are supported")]
    TooManyReactants { name: String, count: usize },

    #[error("Candidate could not be processed: {source}")]
    Candidate {
        #[from]
        source: CandidateError,
    },

    #[error("Relaxation of the reacted structure failed in cycle {cycle}")]
    RelaxationFailed { cycle: usize },

    #[error("External collaborator failed: {source}")]
    Collaborator {
        #[from]
        source: CollaboratorError,
    },

    #[error("Failed to write statistics: {source}")]
    Statistics {
        #[from]
        source: StatisticsError,
    },

    #[error("Checkpoint handling failed: {source}")]
    Checkpoint {
        #[from]
        source: CheckpointError,
    },

    #[error("Candidate selection failed: {source}")]
    Choice {
        #[from]
        source: ChoiceError,
    },

    #[error("Illegal reactive-step transition from {from:?} to {to:?}")]
    IllegalTransition { from: StepState, to: StepState },

    #[error("Internal logic error: {0}")]
    Internal(String),
}
