//! Experiment domain model and snapshots
//!
//! An experiment is one instance of a multi-step protocol. It owns an
//! ordered sequence of steps (the author's declared order, used only as a
//! tie-break and display default) and a projection anchor time. Once
//! registered with the engine, an experiment is mutated only through
//! serialized commands.

use super::step::{Step, StepStatus, StepType};
use crate::graph::{DepGraph, GraphResult, StepId};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// One instance of a multi-step protocol.
///
/// # Example
///
/// ```
/// use praxis::{Experiment, Step, StepType};
///
/// let exp = Experiment::new("PCR prep")
///     .with_description("Standard 3-step amplification prep")
///     .with_step(Step::new("mix", "Mix reagents", StepType::Task, 10))
///     .with_step(
///         Step::new("spin", "Spin down", StepType::FixedDuration, 2)
///             .with_dependencies(["mix"])
///             .with_resource("centrifuge"),
///     );
///
/// assert_eq!(exp.steps().len(), 2);
/// assert!(exp.graph().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Experiment {
    id: Uuid,
    name: String,
    description: Option<String>,
    /// Baseline time for projecting root steps that have not started
    anchor: DateTime<Utc>,
    steps: Vec<Step>,
    #[serde(skip)]
    index: HashMap<StepId, usize>,
}

impl Experiment {
    /// Creates an empty experiment anchored at the current time.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            anchor: Utc::now(),
            steps: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the projection baseline for root steps that have not started.
    /// Defaults to the creation time.
    pub fn with_anchor(mut self, anchor: DateTime<Utc>) -> Self {
        self.anchor = anchor;
        self
    }

    /// Adds a step, builder-style.
    pub fn with_step(mut self, step: Step) -> Self {
        self.add_step(step);
        self
    }

    /// Appends a step to the declared sequence.
    ///
    /// Structural validity (unique IDs, acyclic sibling-only dependencies) is
    /// checked by [`Experiment::graph`] when the experiment is registered or
    /// its graph is edited.
    pub fn add_step(&mut self, step: Step) {
        self.index.insert(step.id().clone(), self.steps.len());
        self.steps.push(step);
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn anchor(&self) -> DateTime<Utc> {
        self.anchor
    }

    /// Steps in declared order.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Looks up a step by ID.
    pub fn step(&self, id: &StepId) -> Option<&Step> {
        self.index.get(id).map(|&i| &self.steps[i])
    }

    pub(crate) fn step_mut(&mut self, id: &StepId) -> Option<&mut Step> {
        self.index.get(id).map(|&i| &mut self.steps[i])
    }

    /// Returns true if any step is currently Running.
    pub fn has_running_step(&self) -> bool {
        self.steps.iter().any(|s| s.status() == StepStatus::Running)
    }

    /// Validates the dependency relation and returns the dependency graph.
    pub fn graph(&self) -> GraphResult<DepGraph> {
        DepGraph::build(
            self.steps
                .iter()
                .map(|s| (s.id().clone(), s.dependencies().to_vec())),
        )
    }

    /// Rebuilds the ID index after deserialization.
    pub fn reindex(&mut self) {
        self.index = self
            .steps
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id().clone(), i))
            .collect();
    }

    /// Assembles a full snapshot at `now`, sufficient for a client to render
    /// without further queries.
    pub fn snapshot(&self, now: DateTime<Utc>) -> ExperimentSnapshot {
        ExperimentSnapshot {
            experiment_id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            taken_at: now,
            steps: self.steps.iter().map(|s| StepSnapshot::of(s, now)).collect(),
        }
    }
}

/// Point-in-time view of an experiment, handed to the broadcast collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentSnapshot {
    pub experiment_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub taken_at: DateTime<Utc>,
    pub steps: Vec<StepSnapshot>,
}

impl ExperimentSnapshot {
    /// Looks up a step snapshot by ID.
    pub fn step(&self, id: &StepId) -> Option<&StepSnapshot> {
        self.steps.iter().find(|s| &s.id == id)
    }

    /// Steps expected to need action within `window` of the snapshot time:
    /// Pending/Ready steps projected to start, and Running steps projected to
    /// finish, sorted by that projected time.
    pub fn upcoming(&self, window: Duration) -> Vec<&StepSnapshot> {
        let horizon = self.taken_at + window;
        let mut hits: Vec<(DateTime<Utc>, &StepSnapshot)> = self
            .steps
            .iter()
            .filter_map(|s| {
                let at = match s.status {
                    StepStatus::Pending | StepStatus::Ready => s.scheduled_start?,
                    StepStatus::Running => s.scheduled_end?,
                    _ => return None,
                };
                (at >= self.taken_at && at < horizon).then_some((at, s))
            })
            .collect();
        hits.sort_by_key(|(at, _)| *at);
        hits.into_iter().map(|(_, s)| s).collect()
    }
}

/// Point-in-time view of one step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepSnapshot {
    pub id: StepId,
    pub name: String,
    pub step_type: StepType,
    pub status: StepStatus,
    pub duration_mins: u32,
    pub dependencies: Vec<StepId>,
    pub resource_needed: Option<String>,
    pub scheduled_start: Option<DateTime<Utc>>,
    pub scheduled_end: Option<DateTime<Utc>>,
    pub actual_start: Option<DateTime<Utc>>,
    pub actual_end: Option<DateTime<Utc>>,
    /// Active elapsed time at snapshot time, excluding paused intervals
    pub active_elapsed_ms: Option<i64>,
    /// True for a Running step whose active elapsed time exceeds its duration
    pub overdue: bool,
}

impl StepSnapshot {
    fn of(step: &Step, now: DateTime<Utc>) -> Self {
        Self {
            id: step.id().clone(),
            name: step.name().to_string(),
            step_type: step.step_type(),
            status: step.status(),
            duration_mins: step.duration_mins(),
            dependencies: step.dependencies().to_vec(),
            resource_needed: step.resource_needed().map(String::from),
            scheduled_start: step.scheduled_start(),
            scheduled_end: step.scheduled_end(),
            actual_start: step.actual_start(),
            actual_end: step.actual_end(),
            active_elapsed_ms: step.elapsed_active(now).map(|d| d.num_milliseconds()),
            overdue: step.is_overdue(now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn sample() -> Experiment {
        Experiment::new("assay")
            .with_anchor(t(0))
            .with_step(Step::new("prep", "Prep", StepType::Task, 5))
            .with_step(
                Step::new("run", "Run", StepType::FixedDuration, 10).with_dependencies(["prep"]),
            )
    }

    #[test]
    fn test_step_lookup() {
        let exp = sample();
        assert!(exp.step(&StepId::new("prep")).is_some());
        assert!(exp.step(&StepId::new("missing")).is_none());
    }

    #[test]
    fn test_graph_validates_declared_dependencies() {
        let exp = sample();
        let graph = exp.graph().unwrap();
        assert_eq!(graph.order(), &[StepId::new("prep"), StepId::new("run")]);
    }

    #[test]
    fn test_snapshot_carries_all_steps() {
        let exp = sample();
        let snap = exp.snapshot(t(100));
        assert_eq!(snap.steps.len(), 2);
        assert_eq!(snap.step(&StepId::new("run")).unwrap().duration_mins, 10);
        assert_eq!(snap.steps[0].status, StepStatus::Pending);
    }

    #[test]
    fn test_upcoming_window() {
        let mut exp = sample();
        exp.step_mut(&StepId::new("prep"))
            .unwrap()
            .set_projection(t(60), t(360));
        exp.step_mut(&StepId::new("run"))
            .unwrap()
            .set_projection(t(7200), t(7800));

        let snap = exp.snapshot(t(0));
        let soon = snap.upcoming(Duration::hours(1));
        assert_eq!(soon.len(), 1);
        assert_eq!(soon[0].id, StepId::new("prep"));
    }

    #[test]
    fn test_reindex_rebuilds_lookup() {
        let mut exp = sample();
        exp.index.clear(); // simulate the post-deserialization state
        assert!(exp.step(&StepId::new("prep")).is_none());

        exp.reindex();
        assert!(exp.step(&StepId::new("prep")).is_some());
        assert!(exp.step(&StepId::new("run")).is_some());
    }
}
