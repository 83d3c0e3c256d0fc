//! Import job lifecycle

use crate::ImportError;
use serde::Serialize;
use tracing::debug;

/// Where an import job is in its lifecycle
///
/// ```text
/// Idle -> Streaming <-> Committing
///            |
///            +-> Completed | Failed
/// ```
///
/// `Idle -> Failed` covers jobs that could not start at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Created, not started
    Idle,

    /// Pulling records from the source into the current batch
    Streaming,

    /// Writing the current batch to the destination
    Committing,

    /// Source exhausted, every batch resolved
    Completed,

    /// Stopped early by a source failure or cancellation
    Failed,
}

impl JobState {
    /// Whether the lifecycle allows moving from `self` to `next`
    pub fn can_transition_to(self, next: JobState) -> bool {
        use JobState::*;
        matches!(
            (self, next),
            (Idle, Streaming)
                | (Idle, Failed)
                | (Streaming, Committing)
                | (Streaming, Completed)
                | (Streaming, Failed)
                | (Committing, Streaming)
        )
    }

    /// Whether no further transition is possible
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

/// Current state of one job, enforcing legal transitions
#[derive(Debug)]
pub struct StateMachine {
    state: JobState,
}

impl StateMachine {
    /// Start in `Idle`
    pub fn new() -> Self {
        Self {
            state: JobState::Idle,
        }
    }

    /// Current state
    pub fn state(&self) -> JobState {
        self.state
    }

    /// Move to `next`
    pub fn transition(&mut self, next: JobState) -> Result<(), ImportError> {
        if !self.state.can_transition_to(next) {
            return Err(ImportError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        debug!(from = ?self.state, to = ?next, "Job state change");
        self.state = next;
        Ok(())
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}
