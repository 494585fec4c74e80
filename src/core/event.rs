//! Domain events
//!
//! Every committed transition produces a typed event batch for the
//! notification/broadcast collaborators. The engine never delivers events
//! itself; any transport (polling, push, long-poll) can be layered on top.

use crate::graph::StepId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single domain event, stamped with its experiment and emission time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub experiment_id: Uuid,
    pub at: DateTime<Utc>,
    pub kind: EventKind,
}

impl Event {
    pub fn new(experiment_id: Uuid, at: DateTime<Utc>, kind: EventKind) -> Self {
        Self {
            experiment_id,
            at,
            kind,
        }
    }

    /// Returns the step this event is primarily about.
    ///
    /// For `ResourceConflict` that is the first of the two steps named.
    pub fn step_id(&self) -> &StepId {
        match &self.kind {
            EventKind::StepReady { step_id }
            | EventKind::StepRunning { step_id }
            | EventKind::StepPaused { step_id }
            | EventKind::StepCompleted { step_id }
            | EventKind::StepSkipped { step_id }
            | EventKind::StepError { step_id }
            | EventKind::UserAttentionRequired { step_id } => step_id,
            EventKind::ResourceConflict { step_a, .. } => step_a,
        }
    }
}

/// What happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// All dependencies of the step completed or were skipped
    StepReady { step_id: StepId },
    /// The step started or resumed
    StepRunning { step_id: StepId },
    StepPaused { step_id: StepId },
    StepCompleted { step_id: StepId },
    StepSkipped { step_id: StepId },
    /// The step's real-world execution failed; only a Skip unblocks dependents
    StepError { step_id: StepId },
    /// Two concurrently running steps claim the same resource key.
    /// Advisory only: the engine reports contention, it never blocks on it.
    ResourceConflict {
        step_a: StepId,
        step_b: StepId,
        resource: String,
    },
    /// A Task or FixedStart step just became Ready or Running and needs the
    /// user's attention
    UserAttentionRequired { step_id: StepId },
}
