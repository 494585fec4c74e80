//! Per-step transition rules and type policy
//!
//! The state machine validates a command against a step's current status and
//! type, then applies it. All guards run before any mutation, so a rejected
//! command leaves the step untouched.
//!
//! Transition table (initial: Pending; terminal: Completed, Skipped, Error):
//!
//! | From            | Command          | To        | Guard                                   |
//! |-----------------|------------------|-----------|-----------------------------------------|
//! | Ready           | Start            | Running   | —                                       |
//! | Paused          | Start (resume)   | Running   | —                                       |
//! | Running         | Pause            | Paused    | type is Task                            |
//! | Running         | Complete         | Completed | timed types: active elapsed ≥ duration  |
//! | Paused          | Complete         | Completed | type is Task                            |
//! | non-Completed   | Skip             | Skipped   | idempotent on already-Skipped           |
//! | Running/Paused  | Fault            | Error     | external fault report                   |
//!
//! Pending → Ready is not a command: the actor promotes Pending steps once
//! every dependency is Completed or Skipped.

use super::error::{CommandError, CommandResult};
use crate::core::{Step, StepStatus, StepType};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A command against one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    /// Start a Ready step, or resume a Paused one
    Start,
    Pause,
    Complete,
    /// Terminate a non-completed step; always permitted, idempotent
    Skip,
    /// External fault report: the step's real-world execution failed
    Fault,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Start => "start",
            Command::Pause => "pause",
            Command::Complete => "complete",
            Command::Skip => "skip",
            Command::Fault => "fault",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The committed effect of a command, used by the actor to pick events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Transition {
    Started { resumed: bool },
    Paused,
    Completed,
    Skipped,
    Faulted,
    /// Skip retried on an already-Skipped step: nothing changed
    Noop,
}

impl Transition {
    /// Returns true if the step entered a dependency-satisfying terminal
    /// status (Completed or Skipped), which may promote dependents to Ready.
    pub(crate) fn satisfies_dependents(&self) -> bool {
        matches!(self, Transition::Completed | Transition::Skipped)
    }
}

/// Validates and applies one command to one step.
///
/// On error the step is guaranteed unmodified.
pub(crate) fn apply(
    step: &mut Step,
    command: Command,
    now: DateTime<Utc>,
) -> CommandResult<Transition> {
    let status = step.status();
    match command {
        Command::Start => match status {
            StepStatus::Ready => {
                step.begin(now);
                Ok(Transition::Started { resumed: false })
            }
            StepStatus::Paused => {
                step.begin(now);
                Ok(Transition::Started { resumed: true })
            }
            _ => Err(CommandError::invalid_transition(
                step.id().clone(),
                status,
                command,
            )),
        },

        Command::Pause => {
            if !step.step_type().is_pausable() {
                return Err(CommandError::restricted(
                    step.id().clone(),
                    status,
                    command,
                    format!("{} steps cannot be paused", step.step_type()),
                ));
            }
            match status {
                StepStatus::Running => {
                    step.hold(now);
                    Ok(Transition::Paused)
                }
                _ => Err(CommandError::invalid_transition(
                    step.id().clone(),
                    status,
                    command,
                )),
            }
        }

        Command::Complete => {
            if status.is_terminal() {
                return Err(CommandError::already_terminal(step.id().clone(), status));
            }
            match (step.step_type(), status) {
                (StepType::Task, StepStatus::Running | StepStatus::Paused)
                | (StepType::FixedStart, StepStatus::Running) => {
                    step.finish(StepStatus::Completed, now);
                    Ok(Transition::Completed)
                }
                (StepType::FixedDuration | StepType::AutomatedTask, StepStatus::Running) => {
                    let elapsed = step.elapsed_active(now).unwrap_or_else(Duration::zero);
                    if elapsed >= step.duration() {
                        step.finish(StepStatus::Completed, now);
                        Ok(Transition::Completed)
                    } else {
                        Err(CommandError::restricted(
                            step.id().clone(),
                            status,
                            command,
                            format!(
                                "{} steps complete automatically when their timer elapses",
                                step.step_type()
                            ),
                        ))
                    }
                }
                _ => Err(CommandError::invalid_transition(
                    step.id().clone(),
                    status,
                    command,
                )),
            }
        }

        Command::Skip => match status {
            StepStatus::Skipped => Ok(Transition::Noop),
            StepStatus::Completed => {
                Err(CommandError::already_terminal(step.id().clone(), status))
            }
            // Error is skippable: that is the only way to unblock dependents
            // of a faulted step.
            _ => {
                step.finish(StepStatus::Skipped, now);
                Ok(Transition::Skipped)
            }
        },

        Command::Fault => match status {
            StepStatus::Running | StepStatus::Paused => {
                step.finish(StepStatus::Error, now);
                Ok(Transition::Faulted)
            }
            _ if status.is_terminal() => {
                Err(CommandError::already_terminal(step.id().clone(), status))
            }
            _ => Err(CommandError::invalid_transition(
                step.id().clone(),
                status,
                command,
            )),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn ready(step_type: StepType, mins: u32) -> Step {
        let mut step = Step::new("s", "S", step_type, mins);
        step.mark_ready();
        step
    }

    #[test]
    fn test_start_requires_ready() {
        let mut step = Step::new("s", "S", StepType::Task, 5);
        let err = apply(&mut step, Command::Start, t(0)).unwrap_err();
        assert!(matches!(err, CommandError::InvalidTransition { .. }));
        assert_eq!(step.status(), StepStatus::Pending);
    }

    #[test]
    fn test_start_then_resume_keeps_original_start() {
        let mut step = ready(StepType::Task, 5);
        assert_eq!(
            apply(&mut step, Command::Start, t(0)).unwrap(),
            Transition::Started { resumed: false }
        );
        apply(&mut step, Command::Pause, t(60)).unwrap();
        assert_eq!(
            apply(&mut step, Command::Start, t(120)).unwrap(),
            Transition::Started { resumed: true }
        );
        assert_eq!(step.actual_start(), Some(t(0)));
        assert_eq!(step.paused_total(), Duration::seconds(60));
    }

    #[test]
    fn test_pause_rejected_for_non_task_types() {
        for step_type in [
            StepType::FixedDuration,
            StepType::FixedStart,
            StepType::AutomatedTask,
        ] {
            let mut step = ready(step_type, 5);
            apply(&mut step, Command::Start, t(0)).unwrap();
            let err = apply(&mut step, Command::Pause, t(10)).unwrap_err();
            match err {
                CommandError::InvalidTransition { restriction, .. } => {
                    assert!(restriction.is_some(), "expected a type restriction")
                }
                other => panic!("expected InvalidTransition, got {other:?}"),
            }
            assert_eq!(step.status(), StepStatus::Running);
        }
    }

    #[test]
    fn test_task_completes_while_paused() {
        let mut step = ready(StepType::Task, 5);
        apply(&mut step, Command::Start, t(0)).unwrap();
        apply(&mut step, Command::Pause, t(30)).unwrap();
        assert_eq!(
            apply(&mut step, Command::Complete, t(90)).unwrap(),
            Transition::Completed
        );
        assert_eq!(step.status(), StepStatus::Completed);
        assert_eq!(step.actual_end(), Some(t(90)));
    }

    #[test]
    fn test_timed_complete_rejected_before_elapsed() {
        let mut step = ready(StepType::FixedDuration, 5);
        apply(&mut step, Command::Start, t(0)).unwrap();

        let err = apply(&mut step, Command::Complete, t(60)).unwrap_err();
        assert!(matches!(
            err,
            CommandError::InvalidTransition {
                restriction: Some(_),
                ..
            }
        ));

        // At 5 minutes the same command is the auto-completion path.
        assert_eq!(
            apply(&mut step, Command::Complete, t(300)).unwrap(),
            Transition::Completed
        );
    }

    #[test]
    fn test_complete_on_terminal_reports_already_terminal() {
        let mut step = ready(StepType::Task, 5);
        apply(&mut step, Command::Start, t(0)).unwrap();
        apply(&mut step, Command::Complete, t(10)).unwrap();

        let err = apply(&mut step, Command::Complete, t(20)).unwrap_err();
        assert!(matches!(err, CommandError::AlreadyTerminal { .. }));
    }

    #[test]
    fn test_skip_idempotent() {
        let mut step = Step::new("s", "S", StepType::Task, 5);
        assert_eq!(apply(&mut step, Command::Skip, t(0)).unwrap(), Transition::Skipped);
        assert_eq!(apply(&mut step, Command::Skip, t(1)).unwrap(), Transition::Noop);
        // actual_end stays at the first skip
        assert_eq!(step.actual_end(), Some(t(0)));
    }

    #[test]
    fn test_skip_unblocks_faulted_step() {
        let mut step = ready(StepType::Task, 5);
        apply(&mut step, Command::Start, t(0)).unwrap();
        apply(&mut step, Command::Fault, t(30)).unwrap();
        assert_eq!(step.status(), StepStatus::Error);

        assert_eq!(apply(&mut step, Command::Skip, t(60)).unwrap(), Transition::Skipped);
        assert_eq!(step.status(), StepStatus::Skipped);
        // end timestamp was set when the fault landed
        assert_eq!(step.actual_end(), Some(t(30)));
    }

    #[test]
    fn test_fault_requires_active_step() {
        let mut step = ready(StepType::Task, 5);
        let err = apply(&mut step, Command::Fault, t(0)).unwrap_err();
        assert!(matches!(err, CommandError::InvalidTransition { .. }));
    }
}
