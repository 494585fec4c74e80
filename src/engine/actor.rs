//! Experiment command actor
//!
//! The [`Engine`] serializes commands per experiment and runs the full
//! pipeline for each one: state machine, readiness promotion, schedule
//! projection, conflict scan, event batch. Every `apply_command` is
//! all-or-nothing — a rejected command changes nothing — and returns
//! immediately with the updated snapshot or a typed failure; it never
//! suspends waiting for another transition.
//!
//! # Concurrency model
//!
//! One `tokio::sync::Mutex` per experiment is the serialization unit:
//! at most one command (user-issued or tick-synthesized) mutates a given
//! experiment at a time, applied in arrival order, while distinct
//! experiments proceed fully in parallel. The registry itself is a DashMap,
//! so lookups never contend with command application.

use super::conflict;
use super::error::{CommandError, CommandResult, EngineError};
use super::projector;
use super::sink::{EventSink, NullSink};
use super::state_machine::{self, Command, Transition};
use crate::core::{Event, EventKind, Experiment, ExperimentSnapshot, StepStatus, StepType};
use crate::graph::StepId;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Result of one committed mutation: the updated snapshot plus the domain
/// events it produced, in emission order.
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    pub snapshot: ExperimentSnapshot,
    pub events: Vec<Event>,
}

/// One registered experiment plus its cached topological order.
///
/// The order is recomputed only on structural mutation (registration), never
/// per command.
struct Slot {
    experiment: Experiment,
    order: Vec<StepId>,
}

/// The experiment command actor.
///
/// Holds the in-memory representation of every registered experiment and is
/// the only component that mutates them. Persistence is a collaborator's
/// concern: experiments are supplied via [`Engine::register`] and handed back
/// via [`Engine::remove`].
///
/// # Example
///
/// ```
/// use praxis::{Command, Engine, Experiment, Step, StepType};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let engine = Engine::new();
/// let exp = Experiment::new("stain")
///     .with_step(Step::new("fix", "Fix sample", StepType::Task, 10));
/// let id = exp.id();
///
/// engine.register(exp).await?;
/// let outcome = engine.apply_command(id, "fix", Command::Start).await?;
/// assert_eq!(outcome.snapshot.steps[0].status.as_str(), "running");
/// # Ok(())
/// # }
/// ```
pub struct Engine<S: EventSink = NullSink> {
    slots: DashMap<Uuid, Arc<Mutex<Slot>>>,
    sink: Arc<S>,
}

impl Engine<NullSink> {
    /// Creates an engine that discards events (callers still receive each
    /// batch in the returned [`CommandOutcome`]).
    pub fn new() -> Self {
        Self::with_sink(Arc::new(NullSink))
    }
}

impl Default for Engine<NullSink> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: EventSink> Engine<S> {
    /// Creates an engine that publishes every committed batch to `sink`.
    pub fn with_sink(sink: Arc<S>) -> Self {
        Self {
            slots: DashMap::new(),
            sink,
        }
    }

    /// Registers an experiment, validating its dependency graph.
    ///
    /// Steps without dependencies are promoted to Ready immediately and the
    /// initial projection is computed, so the returned outcome carries the
    /// `StepReady` batch and a renderable snapshot.
    ///
    /// # Errors
    ///
    /// - [`EngineError::Graph`] if the dependency relation is invalid
    /// - [`EngineError::ZeroDuration`] if a step has no duration
    /// - [`EngineError::AlreadyRegistered`] if the ID is already registered
    pub async fn register(&self, mut experiment: Experiment) -> Result<CommandOutcome, EngineError> {
        for step in experiment.steps() {
            if step.duration_mins() == 0 {
                return Err(EngineError::ZeroDuration {
                    step_id: step.id().clone(),
                });
            }
        }
        let order = experiment.graph()?.order().to_vec();

        let experiment_id = experiment.id();
        let now = Utc::now();
        let mut events = Vec::new();
        push_ready_events(&mut events, promote_ready(&mut experiment), experiment_id, now);
        projector::project(&mut experiment, &order);
        let snapshot = experiment.snapshot(now);

        let name = experiment.name().to_owned();
        let step_count = experiment.steps().len();
        match self.slots.entry(experiment_id) {
            Entry::Occupied(_) => return Err(EngineError::AlreadyRegistered { experiment_id }),
            Entry::Vacant(vacant) => {
                vacant.insert(Arc::new(Mutex::new(Slot { experiment, order })));
            }
        }
        info!(
            experiment = %experiment_id,
            name = %name,
            steps = step_count,
            "experiment registered"
        );

        self.sink.publish(&events).await;
        Ok(CommandOutcome { snapshot, events })
    }

    /// Removes an experiment and returns its in-memory representation, for
    /// the storage collaborator to persist or discard.
    pub async fn remove(&self, experiment_id: Uuid) -> Option<Experiment> {
        let (_, slot) = self.slots.remove(&experiment_id)?;
        let experiment = slot.lock().await.experiment.clone();
        info!(experiment = %experiment_id, "experiment removed");
        Some(experiment)
    }

    /// Returns true if the experiment is registered.
    pub fn contains(&self, experiment_id: Uuid) -> bool {
        self.slots.contains_key(&experiment_id)
    }

    /// Number of registered experiments.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Takes a snapshot at the current time.
    pub async fn snapshot(&self, experiment_id: Uuid) -> CommandResult<ExperimentSnapshot> {
        self.snapshot_at(experiment_id, Utc::now()).await
    }

    /// Takes a snapshot at an explicit time (testable clock).
    pub async fn snapshot_at(
        &self,
        experiment_id: Uuid,
        now: DateTime<Utc>,
    ) -> CommandResult<ExperimentSnapshot> {
        let slot = self.slot(experiment_id)?;
        let guard = slot.lock().await;
        Ok(guard.experiment.snapshot(now))
    }

    /// Applies a command at the current time.
    pub async fn apply_command(
        &self,
        experiment_id: Uuid,
        step_id: impl Into<StepId> + Send,
        command: Command,
    ) -> CommandResult<CommandOutcome> {
        self.apply_command_at(experiment_id, step_id, command, Utc::now())
            .await
    }

    /// Applies a command at an explicit time (testable clock).
    ///
    /// Pipeline: serialize against the experiment → state machine → readiness
    /// promotion → schedule projection → conflict scan → event batch. The
    /// batch is also published to the sink before returning.
    pub async fn apply_command_at(
        &self,
        experiment_id: Uuid,
        step_id: impl Into<StepId> + Send,
        command: Command,
        now: DateTime<Utc>,
    ) -> CommandResult<CommandOutcome> {
        let step_id = step_id.into();
        let slot = self.slot(experiment_id)?;
        let mut guard = slot.lock().await;
        let Slot { experiment, order } = &mut *guard;

        let step = experiment
            .step_mut(&step_id)
            .ok_or_else(|| CommandError::step_not_found(experiment_id, step_id.clone()))?;
        let step_type = step.step_type();

        let transition = state_machine::apply(step, command, now)?;

        if transition == Transition::Noop {
            debug!(experiment = %experiment_id, step = %step_id, "skip retried on skipped step");
            return Ok(CommandOutcome {
                snapshot: experiment.snapshot(now),
                events: Vec::new(),
            });
        }

        let mut events = Vec::new();
        let kind = match transition {
            Transition::Started { .. } => EventKind::StepRunning {
                step_id: step_id.clone(),
            },
            Transition::Paused => EventKind::StepPaused {
                step_id: step_id.clone(),
            },
            Transition::Completed => EventKind::StepCompleted {
                step_id: step_id.clone(),
            },
            Transition::Skipped => EventKind::StepSkipped {
                step_id: step_id.clone(),
            },
            Transition::Faulted => EventKind::StepError {
                step_id: step_id.clone(),
            },
            Transition::Noop => unreachable!("handled above"),
        };
        events.push(Event::new(experiment_id, now, kind));

        if matches!(transition, Transition::Started { .. }) && step_type.requires_attention() {
            events.push(Event::new(
                experiment_id,
                now,
                EventKind::UserAttentionRequired {
                    step_id: step_id.clone(),
                },
            ));
        }

        if transition.satisfies_dependents() {
            push_ready_events(&mut events, promote_ready(experiment), experiment_id, now);
        }

        projector::project(experiment, order);

        for kind in conflict::detect(experiment.steps()) {
            events.push(Event::new(experiment_id, now, kind));
        }

        let snapshot = experiment.snapshot(now);
        drop(guard);

        info!(
            experiment = %experiment_id,
            step = %step_id,
            command = %command,
            events = events.len(),
            "command applied"
        );
        self.sink.publish(&events).await;

        Ok(CommandOutcome { snapshot, events })
    }

    /// Synthesizes auto-completions for every Running FixedDuration or
    /// AutomatedTask step whose active elapsed time has reached its duration,
    /// and returns the aggregate of their event batches.
    ///
    /// Driven once per period by the tick driver (or any external scheduling
    /// primitive); `now` is explicit so tests control the clock. Duplicate or
    /// late completion signals are idempotent no-ops.
    pub async fn tick(&self, now: DateTime<Utc>) -> Vec<Event> {
        let ids: Vec<Uuid> = self.slots.iter().map(|entry| *entry.key()).collect();
        let mut all_events = Vec::new();

        for experiment_id in ids {
            let Ok(slot) = self.slot(experiment_id) else {
                continue; // removed since enumeration
            };

            let due: Vec<StepId> = {
                let guard = slot.lock().await;
                if !guard.experiment.has_running_step() {
                    continue;
                }
                guard
                    .experiment
                    .steps()
                    .iter()
                    .filter(|s| {
                        s.status() == StepStatus::Running
                            && s.step_type().auto_completes()
                            && s.elapsed_active(now).is_some_and(|e| e >= s.duration())
                    })
                    .map(|s| s.id().clone())
                    .collect()
            };

            for step_id in due {
                match self
                    .apply_command_at(experiment_id, &step_id, Command::Complete, now)
                    .await
                {
                    Ok(outcome) => all_events.extend(outcome.events),
                    Err(CommandError::AlreadyTerminal { .. }) => {
                        debug!(
                            experiment = %experiment_id,
                            step = %step_id,
                            "duplicate completion signal ignored"
                        );
                    }
                    Err(e) => {
                        warn!(
                            experiment = %experiment_id,
                            step = %step_id,
                            error = %e,
                            "tick completion rejected"
                        );
                    }
                }
            }
        }

        all_events
    }

    fn slot(&self, experiment_id: Uuid) -> CommandResult<Arc<Mutex<Slot>>> {
        self.slots
            .get(&experiment_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| CommandError::experiment_not_found(experiment_id))
    }
}

/// Promotes every Pending step whose dependencies are all Completed or
/// Skipped, returning the promoted steps and their types.
fn promote_ready(experiment: &mut Experiment) -> Vec<(StepId, StepType)> {
    let promoted: Vec<(StepId, StepType)> = experiment
        .steps()
        .iter()
        .filter(|s| s.status() == StepStatus::Pending)
        .filter(|s| {
            s.dependencies().iter().all(|dep| {
                experiment
                    .step(dep)
                    .is_some_and(|d| d.status().satisfies_dependents())
            })
        })
        .map(|s| (s.id().clone(), s.step_type()))
        .collect();

    for (id, _) in &promoted {
        if let Some(step) = experiment.step_mut(id) {
            step.mark_ready();
        }
    }
    promoted
}

fn push_ready_events(
    events: &mut Vec<Event>,
    promoted: Vec<(StepId, StepType)>,
    experiment_id: Uuid,
    now: DateTime<Utc>,
) {
    for (step_id, step_type) in promoted {
        events.push(Event::new(
            experiment_id,
            now,
            EventKind::StepReady {
                step_id: step_id.clone(),
            },
        ));
        if step_type.requires_attention() {
            events.push(Event::new(
                experiment_id,
                now,
                EventKind::UserAttentionRequired { step_id },
            ));
        }
    }
}
