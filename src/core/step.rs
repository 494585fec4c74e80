//! Step domain model
//!
//! A step is one unit of work within an experiment, with a type-specific
//! timing policy. This module owns the step's timing bookkeeping; the legal
//! status transitions are enforced by the engine's state machine.
//!
//! # Pause accounting
//!
//! Active elapsed time deliberately excludes paused intervals:
//! `elapsed = (now | pause time | end time) - actual_start - paused_total`.
//! A naive `now - actual_start` silently counts time spent paused, which
//! would auto-complete timed steps early after a pause/resume cycle.

use crate::graph::StepId;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Execution status of a step.
///
/// Initial status is `Pending`; `Completed`, `Skipped` and `Error` are
/// terminal. Transitions between statuses are validated by the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Waiting for dependencies to be satisfied
    Pending,
    /// All dependencies completed or skipped; may be started
    Ready,
    Running,
    Paused,
    Completed,
    Skipped,
    /// Real-world execution failed; unblocked only by a manual Skip
    Error,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::Ready => "ready",
            StepStatus::Running => "running",
            StepStatus::Paused => "paused",
            StepStatus::Completed => "completed",
            StepStatus::Skipped => "skipped",
            StepStatus::Error => "error",
        }
    }

    /// Returns true for statuses that end a step's run.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StepStatus::Completed | StepStatus::Skipped | StepStatus::Error
        )
    }

    /// Returns true if this status counts as satisfying a dependent.
    pub fn satisfies_dependents(&self) -> bool {
        matches!(self, StepStatus::Completed | StepStatus::Skipped)
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Timing policy of a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    /// Countdown timer; not pausable; auto-completes when elapsed time
    /// reaches the duration.
    FixedDuration,
    /// User-driven work; count-up; pausable; completes only on an explicit
    /// command.
    Task,
    /// Count-up; not pausable; never auto-completes. The duration defines the
    /// earliest permissible start offset for dependents instead.
    FixedStart,
    /// Runs unattended for a set time; not pausable; auto-completes like
    /// FixedDuration but occupies a resource rather than the user.
    AutomatedTask,
}

impl StepType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepType::FixedDuration => "fixed_duration",
            StepType::Task => "task",
            StepType::FixedStart => "fixed_start",
            StepType::AutomatedTask => "automated_task",
        }
    }

    /// Only Task steps may be paused.
    pub fn is_pausable(&self) -> bool {
        matches!(self, StepType::Task)
    }

    /// Returns true for types the tick driver completes automatically.
    pub fn auto_completes(&self) -> bool {
        matches!(self, StepType::FixedDuration | StepType::AutomatedTask)
    }

    /// Returns true for types that demand sustained user attention while
    /// ready or running.
    pub fn requires_attention(&self) -> bool {
        matches!(self, StepType::Task | StepType::FixedStart)
    }
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of work within an experiment.
///
/// Carries the declared shape (type, duration, dependencies, resource) and
/// the execution state (status, actual timestamps, pause accounting) plus the
/// projector's current start/end estimate.
///
/// # Example
///
/// ```
/// use praxis::{Step, StepType};
///
/// let step = Step::new("incubate", "Incubate at 37C", StepType::FixedDuration, 30)
///     .with_dependencies(["mix"])
///     .with_resource("incubator");
///
/// assert_eq!(step.duration(), chrono::Duration::minutes(30));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    id: StepId,
    name: String,
    step_type: StepType,
    /// Expected duration in minutes (must be positive)
    duration_mins: u32,
    dependencies: Vec<StepId>,
    /// Advisory key naming an exclusive-use resource
    resource_needed: Option<String>,
    /// Free-form notes, opaque to the engine
    notes: Option<String>,
    status: StepStatus,
    scheduled_start: Option<DateTime<Utc>>,
    scheduled_end: Option<DateTime<Utc>>,
    actual_start: Option<DateTime<Utc>>,
    actual_end: Option<DateTime<Utc>>,
    /// Sum of all completed pause intervals, in milliseconds
    paused_total_ms: i64,
    /// When the current pause began, if paused
    paused_at: Option<DateTime<Utc>>,
}

impl Step {
    /// Creates a new pending step.
    ///
    /// `duration_mins` must be positive; zero-duration steps are rejected
    /// when the experiment is registered.
    pub fn new(
        id: impl Into<StepId>,
        name: impl Into<String>,
        step_type: StepType,
        duration_mins: u32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            step_type,
            duration_mins,
            dependencies: Vec::new(),
            resource_needed: None,
            notes: None,
            status: StepStatus::Pending,
            scheduled_start: None,
            scheduled_end: None,
            actual_start: None,
            actual_end: None,
            paused_total_ms: 0,
            paused_at: None,
        }
    }

    /// Declares the sibling steps this step depends on.
    pub fn with_dependencies<I, T>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<StepId>,
    {
        self.dependencies = deps.into_iter().map(Into::into).collect();
        self
    }

    /// Tags the step with an exclusive-use resource key.
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource_needed = Some(resource.into());
        self
    }

    /// Attaches free-form notes.
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn id(&self) -> &StepId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn step_type(&self) -> StepType {
        self.step_type
    }

    pub fn status(&self) -> StepStatus {
        self.status
    }

    pub fn duration_mins(&self) -> u32 {
        self.duration_mins
    }

    /// Expected duration as a chrono Duration.
    pub fn duration(&self) -> Duration {
        Duration::minutes(i64::from(self.duration_mins))
    }

    pub fn dependencies(&self) -> &[StepId] {
        &self.dependencies
    }

    pub fn resource_needed(&self) -> Option<&str> {
        self.resource_needed.as_deref()
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn scheduled_start(&self) -> Option<DateTime<Utc>> {
        self.scheduled_start
    }

    pub fn scheduled_end(&self) -> Option<DateTime<Utc>> {
        self.scheduled_end
    }

    pub fn actual_start(&self) -> Option<DateTime<Utc>> {
        self.actual_start
    }

    pub fn actual_end(&self) -> Option<DateTime<Utc>> {
        self.actual_end
    }

    /// Total time spent paused so far, excluding any pause still in progress.
    pub fn paused_total(&self) -> Duration {
        Duration::milliseconds(self.paused_total_ms)
    }

    /// Active elapsed time at `now`, excluding paused intervals.
    ///
    /// Returns `None` for steps that have not started. For a paused step the
    /// clock is frozen at the moment the pause began; for a terminal step it
    /// is frozen at the actual end.
    pub fn elapsed_active(&self, now: DateTime<Utc>) -> Option<Duration> {
        let start = self.actual_start?;
        let frozen_at = match self.status {
            StepStatus::Paused => self.paused_at.unwrap_or(now),
            _ if self.status.is_terminal() => self.actual_end.unwrap_or(now),
            _ => now,
        };
        Some(frozen_at - start - self.paused_total())
    }

    /// Returns true if the step is running past its expected duration.
    ///
    /// Task and FixedStart steps never auto-complete, so overrun is a normal,
    /// reportable condition for them.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == StepStatus::Running
            && self
                .elapsed_active(now)
                .is_some_and(|elapsed| elapsed >= self.duration())
    }

    // --- mutators used by the state machine and projector ---

    /// Marks the step Ready once its dependencies are satisfied.
    pub(crate) fn mark_ready(&mut self) {
        self.status = StepStatus::Ready;
    }

    /// Enters Running. Sets the actual start exactly once per run: resuming
    /// after a pause keeps the original start.
    pub(crate) fn begin(&mut self, now: DateTime<Utc>) {
        if let Some(paused_at) = self.paused_at.take() {
            self.paused_total_ms += (now - paused_at).num_milliseconds();
        }
        self.actual_start.get_or_insert(now);
        self.status = StepStatus::Running;
    }

    /// Enters Paused, freezing the active-time clock.
    pub(crate) fn hold(&mut self, now: DateTime<Utc>) {
        self.paused_at = Some(now);
        self.status = StepStatus::Paused;
    }

    /// Enters a terminal status. Sets the actual end exactly once and folds
    /// in any pause still in progress.
    pub(crate) fn finish(&mut self, status: StepStatus, now: DateTime<Utc>) {
        debug_assert!(status.is_terminal());
        if let Some(paused_at) = self.paused_at.take() {
            self.paused_total_ms += (now - paused_at).num_milliseconds();
        }
        self.actual_end.get_or_insert(now);
        self.status = status;
    }

    /// Overwrites the projected start/end. Never touches actual timestamps.
    pub(crate) fn set_projection(&mut self, start: DateTime<Utc>, end: DateTime<Utc>) {
        self.scheduled_start = Some(start);
        self.scheduled_end = Some(end);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_elapsed_none_before_start() {
        let step = Step::new("a", "A", StepType::Task, 10);
        assert_eq!(step.elapsed_active(t(100)), None);
    }

    #[test]
    fn test_elapsed_excludes_paused_interval() {
        let mut step = Step::new("a", "A", StepType::Task, 10);
        step.mark_ready();
        step.begin(t(0));
        step.hold(t(60));
        // 5 minutes pass while paused; the clock stays frozen.
        assert_eq!(step.elapsed_active(t(360)), Some(Duration::seconds(60)));

        step.begin(t(360)); // resume
        assert_eq!(step.paused_total(), Duration::seconds(300));
        assert_eq!(step.elapsed_active(t(400)), Some(Duration::seconds(100)));
    }

    #[test]
    fn test_actual_start_set_once() {
        let mut step = Step::new("a", "A", StepType::Task, 10);
        step.mark_ready();
        step.begin(t(0));
        step.hold(t(30));
        step.begin(t(90));
        assert_eq!(step.actual_start(), Some(t(0)));
    }

    #[test]
    fn test_finish_folds_open_pause() {
        let mut step = Step::new("a", "A", StepType::Task, 10);
        step.mark_ready();
        step.begin(t(0));
        step.hold(t(60));
        step.finish(StepStatus::Completed, t(120));

        assert_eq!(step.actual_end(), Some(t(120)));
        assert_eq!(step.paused_total(), Duration::seconds(60));
        // Active time frozen at the pause: 60s running, 60s paused.
        assert_eq!(step.elapsed_active(t(500)), Some(Duration::seconds(60)));
    }

    #[test]
    fn test_overdue_only_while_running() {
        let mut step = Step::new("a", "A", StepType::Task, 1);
        step.mark_ready();
        step.begin(t(0));
        assert!(!step.is_overdue(t(30)));
        assert!(step.is_overdue(t(61)));

        step.hold(t(61));
        assert!(!step.is_overdue(t(600)));
    }
}
