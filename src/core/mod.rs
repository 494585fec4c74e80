//! Core domain model for the praxis engine.
//!
//! This module provides the types the rest of the engine operates on:
//!
//! # Domain Model
//! - [`Experiment`]: one instance of a multi-step protocol, with snapshots
//! - [`Step`], [`StepStatus`], [`StepType`]: per-step state and timing policy
//! - [`Event`], [`EventKind`]: typed domain events emitted by every mutation
//!
//! The legal transitions between statuses are enforced by the engine's state
//! machine, not here; this module only owns the data and its timing
//! bookkeeping (pause accounting, active elapsed time).

mod event;
mod experiment;
mod step;

pub use event::{Event, EventKind};
pub use experiment::{Experiment, ExperimentSnapshot, StepSnapshot};
pub use step::{Step, StepStatus, StepType};
