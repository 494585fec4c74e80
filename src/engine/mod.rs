//! Scheduling and conflict-resolution engine
//!
//! Module organization, each hiding one design decision:
//! - `state_machine`: per-step transition rules and type policy
//! - `projector`: how projections are recomputed from actuals
//! - `conflict`: how resource contention is detected (grouping, advisory)
//! - `actor`: serialization of commands against one experiment
//! - `sink`: how event batches leave the engine
//! - `tick`: how auto-completion is driven
//!
//! The command pipeline, in order: state machine validates and applies the
//! transition → Pending steps whose dependencies are now satisfied become
//! Ready → the projector recomputes downstream timestamps → the conflict
//! detector re-scans running steps → the actor assembles the snapshot and
//! event batch.

mod actor;
mod conflict;
mod error;
mod projector;
mod sink;
mod state_machine;
mod tick;

pub use actor::{CommandOutcome, Engine};
pub use error::{CommandError, CommandResult, EngineError};
pub use sink::{BufferSink, EventSink, NullSink};
pub use state_machine::Command;
pub use tick::{TickDriver, TickDriverHandle};
