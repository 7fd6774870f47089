use super::error::EngineError;
use tracing::trace;

/// The stages of one reactive step.
///
/// ```text
/// Searching ─┬─> MdOnly
///            └─> Committed ──> Relaxing ─┬─> Accepted
///                 ^     │                ├─> Rejected
///                 └─────┘                ├─> RejectedFailedRelaxation
///                                        └─> Fatal
/// ```
///
/// `Committed` may repeat when several candidates join one relaxation batch. `Rejected` and
/// `RejectedFailedRelaxation` roll the step back: the baseline stays where it was and the
/// external engine cleans up. `Fatal` ends the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    Searching,
    MdOnly,
    Committed,
    Relaxing,
    Accepted,
    Rejected,
    RejectedFailedRelaxation,
    Fatal,
}

impl StepState {
    pub fn can_transition_to(self, next: StepState) -> bool {
        use StepState::*;
        matches!(
            (self, next),
            (Searching, MdOnly)
                | (Searching, Committed)
                | (Committed, Committed)
                | (Committed, Relaxing)
                | (Relaxing, Accepted)
                | (Relaxing, Rejected)
                | (Relaxing, RejectedFailedRelaxation)
                | (Relaxing, Fatal)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            StepState::MdOnly
                | StepState::Accepted
                | StepState::Rejected
                | StepState::RejectedFailedRelaxation
                | StepState::Fatal
        )
    }

    pub fn is_rolled_back(self) -> bool {
        matches!(
            self,
            StepState::Rejected | StepState::RejectedFailedRelaxation
        )
    }

    /// The outcome label written to the statistics table.
    pub fn label(self) -> &'static str {
        match self {
            StepState::Accepted => "acc",
            StepState::Rejected => "rej",
            StepState::RejectedFailedRelaxation => "rej_relax",
            StepState::Fatal => "fatal",
            StepState::Searching | StepState::MdOnly | StepState::Committed | StepState::Relaxing => {
                "none"
            }
        }
    }
}

/// One reactive step of a cycle, advancing through [`StepState`] with checked transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactiveStep {
    cycle: usize,
    state: StepState,
}

impl ReactiveStep {
    pub fn begin(cycle: usize) -> Self {
        Self {
            cycle,
            state: StepState::Searching,
        }
    }

    pub fn cycle(&self) -> usize {
        self.cycle
    }

    pub fn state(&self) -> StepState {
        self.state
    }

    /// Moves the step to `next`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::IllegalTransition`] if `next` cannot follow the current state.
    pub fn advance(&mut self, next: StepState) -> Result<(), EngineError> {
        if !self.state.can_transition_to(next) {
            return Err(EngineError::IllegalTransition {
                from: self.state,
                to: next,
            });
        }
        trace!(cycle = self.cycle, from = ?self.state, to = ?next, "Reactive step advanced.");
        self.state = next;
        Ok(())
    }
}
