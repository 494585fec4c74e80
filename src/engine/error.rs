//! Command-layer error types
//!
//! Command errors are local and recoverable: they are returned to the caller
//! as typed values and never corrupt the experiment. A rejected command
//! leaves the experiment exactly as it was.

use super::state_machine::Command;
use crate::core::StepStatus;
use crate::graph::{GraphError, StepId};
use thiserror::Error;
use uuid::Uuid;

/// Result type for command application
pub type CommandResult<T> = Result<T, CommandError>;

/// Errors returned from `apply_command`
#[derive(Debug, Error, Clone)]
#[non_exhaustive]
pub enum CommandError {
    /// The experiment is not registered with the engine
    #[error("experiment not found: {experiment_id}")]
    ExperimentNotFound { experiment_id: Uuid },

    /// The step does not exist in the experiment
    #[error("step not found: '{step_id}' in experiment {experiment_id}")]
    StepNotFound {
        experiment_id: Uuid,
        step_id: StepId,
    },

    /// The command is not legal from the step's current status
    #[error("invalid transition: cannot {command} step '{step_id}' in status {status}{}", fmt_restriction(.restriction))]
    InvalidTransition {
        step_id: StepId,
        status: StepStatus,
        command: Command,
        /// Type-specific restriction that caused the rejection, if any
        restriction: Option<String>,
    },

    /// The step already reached a terminal status.
    ///
    /// For duplicate completion signals this is an idempotent no-op report,
    /// not a hard failure; the tick driver swallows it.
    #[error("step '{step_id}' is already terminal ({status})")]
    AlreadyTerminal { step_id: StepId, status: StepStatus },
}

fn fmt_restriction(restriction: &Option<String>) -> String {
    match restriction {
        Some(r) => format!(" ({r})"),
        None => String::new(),
    }
}

impl CommandError {
    pub fn experiment_not_found(experiment_id: Uuid) -> Self {
        Self::ExperimentNotFound { experiment_id }
    }

    pub fn step_not_found(experiment_id: Uuid, step_id: StepId) -> Self {
        Self::StepNotFound {
            experiment_id,
            step_id,
        }
    }

    pub fn invalid_transition(step_id: StepId, status: StepStatus, command: Command) -> Self {
        Self::InvalidTransition {
            step_id,
            status,
            command,
            restriction: None,
        }
    }

    /// Invalid transition caused by a type-specific restriction.
    pub fn restricted(
        step_id: StepId,
        status: StepStatus,
        command: Command,
        restriction: impl Into<String>,
    ) -> Self {
        Self::InvalidTransition {
            step_id,
            status,
            command,
            restriction: Some(restriction.into()),
        }
    }

    pub fn already_terminal(step_id: StepId, status: StepStatus) -> Self {
        Self::AlreadyTerminal { step_id, status }
    }
}

/// Top-level engine error covering registration and command application.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineError {
    /// Structural validation of the dependency graph failed
    #[error("graph error: {0}")]
    Graph(#[from] GraphError),

    /// A command was rejected
    #[error("command error: {0}")]
    Command(#[from] CommandError),

    /// A step was declared with a zero duration
    #[error("step '{step_id}' has zero duration")]
    ZeroDuration { step_id: StepId },

    /// The experiment ID is already registered
    #[error("experiment already registered: {experiment_id}")]
    AlreadyRegistered { experiment_id: Uuid },
}
