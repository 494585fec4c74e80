//! Praxis: scheduling and conflict-resolution engine for multi-step protocols
//!
//! `praxis` (πρᾶξις, Greek for "doing") coordinates multi-step, time-bounded
//! processes — lab protocols being the motivating case — where steps have
//! dependencies, resource requirements, and distinct timing behaviors. It
//! owns step state, timeline projection, and conflict semantics; persistence,
//! auth, and transport are collaborators' concerns.
//!
//! # Features
//!
//! - **Dependency gating**: steps become Ready only when every dependency is
//!   Completed or Skipped; the dependency relation is validated as a DAG
//! - **Typed timing policies**: countdown timers, user-driven tasks,
//!   fixed-start offsets, and unattended automated steps
//! - **Live projection**: projected start/end times re-adjust as actual
//!   execution diverges from plan; actual timestamps are never overwritten
//! - **Advisory conflict detection**: concurrently running steps sharing a
//!   resource key are reported, never blocked
//! - **Serialized commands**: concurrent viewers of one experiment submit
//!   commands safely; each command is atomic and applied in arrival order
//! - **Typed event batches**: every mutation yields domain events any
//!   transport can deliver
//!
//! # Quick Start
//!
//! ```
//! use praxis::prelude::*;
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let sink = Arc::new(BufferSink::new());
//! let engine = Engine::with_sink(Arc::clone(&sink));
//!
//! let experiment = Experiment::new("DNA extraction")
//!     .with_step(Step::new("lyse", "Lyse cells", StepType::Task, 15))
//!     .with_step(
//!         Step::new("spin", "Centrifuge", StepType::FixedDuration, 5)
//!             .with_dependencies(["lyse"])
//!             .with_resource("centrifuge"),
//!     );
//! let id = experiment.id();
//!
//! engine.register(experiment).await?;
//! let outcome = engine.apply_command(id, "lyse", Command::Start).await?;
//!
//! for event in &outcome.events {
//!     println!("{:?}", event.kind);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Module Organization
//!
//! Each module hides a design decision likely to change:
//!
//! - [`core`]: domain model — experiments, steps, snapshots, events
//! - [`graph`]: dependency validation and topological ordering
//! - [`engine`]: state machine, projector, conflict detector, command actor,
//!   tick driver
//!
//! # Concurrency
//!
//! Command processing is single-threaded per experiment: a per-experiment
//! mutex serializes user commands and tick-synthesized completions, while
//! distinct experiments proceed in parallel. `apply_command` never blocks on
//! another transition; stale commands fail fast with a typed error and the
//! caller re-fetches the snapshot.

pub mod core;
pub mod engine;
pub mod graph;

// Re-export commonly used types for convenience
pub use crate::core::{
    Event, EventKind, Experiment, ExperimentSnapshot, Step, StepSnapshot, StepStatus, StepType,
};
pub use engine::{
    BufferSink, Command, CommandError, CommandOutcome, CommandResult, Engine, EngineError,
    EventSink, NullSink, TickDriver, TickDriverHandle,
};
pub use graph::{validate_and_order, DepGraph, GraphError, GraphResult, StepId};

// Re-export dependencies that appear in the public API so downstream crates
// cannot hit version mismatches.
pub use chrono;
pub use uuid;

/// Prelude module for convenient glob imports
///
/// # Example
///
/// ```
/// use praxis::prelude::*;
/// ```
pub mod prelude {
    pub use crate::core::{
        Event, EventKind, Experiment, ExperimentSnapshot, Step, StepSnapshot, StepStatus, StepType,
    };
    pub use crate::engine::{
        BufferSink, Command, CommandError, CommandOutcome, CommandResult, Engine, EngineError,
        EventSink, NullSink, TickDriver, TickDriverHandle,
    };
    pub use crate::graph::{validate_and_order, DepGraph, GraphError, GraphResult, StepId};

    // Commonly used external types
    pub use chrono::{DateTime, Utc};
    pub use uuid::Uuid;
}
