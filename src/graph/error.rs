//! Error types for dependency graph validation
//!
//! These are the structural errors of the engine: they are raised when an
//! experiment's step graph is edited or registered, and never reach the
//! command layer.

use super::StepId;
use thiserror::Error;

/// Result type for graph operations
pub type GraphResult<T> = Result<T, GraphError>;

/// Errors that can occur while validating a dependency graph
#[derive(Debug, Error, Clone)]
#[non_exhaustive]
pub enum GraphError {
    /// A cycle was detected in the dependency relation
    #[error("cycle detected in dependency graph: {path}")]
    CycleDetected {
        /// Human-readable description of the cycle path
        path: String,
    },

    /// A dependency references a step that does not exist in the experiment
    #[error("dependency '{dependency}' of step '{step}' does not exist")]
    UnknownDependency {
        /// The step that declared the dependency
        step: StepId,
        /// The dependency that was not found
        dependency: StepId,
    },

    /// A step declares a dependency on itself
    #[error("step '{step}' cannot depend on itself")]
    SelfDependency {
        /// The step with the self-dependency
        step: StepId,
    },

    /// Two steps share the same identifier
    #[error("duplicate step ID: {step}")]
    DuplicateStep {
        /// The duplicate step ID
        step: StepId,
    },
}

impl GraphError {
    /// Creates a cycle error from the detected cycle path.
    pub fn cycle(path: impl IntoIterator<Item = StepId>) -> Self {
        let path = path
            .into_iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(" -> ");
        Self::CycleDetected { path }
    }

    /// Creates an unknown dependency error.
    pub fn unknown_dependency(step: StepId, dependency: StepId) -> Self {
        Self::UnknownDependency { step, dependency }
    }

    /// Creates a self-dependency error.
    pub fn self_dependency(step: StepId) -> Self {
        Self::SelfDependency { step }
    }

    /// Creates a duplicate step error.
    pub fn duplicate_step(step: StepId) -> Self {
        Self::DuplicateStep { step }
    }
}
