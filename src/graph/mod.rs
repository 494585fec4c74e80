//! Dependency graph validation for experiment steps
//!
//! This module owns the structural half of the engine's error taxonomy:
//! it verifies that a step dependency relation is an acyclic graph over
//! sibling steps and computes the topological order the projector walks.
//!
//! - Explicit dependency declaration between steps
//! - Cycle detection naming the offending path
//! - Deterministic topological ordering
//!
//! Structural validation runs when an experiment's graph is edited or
//! registered, never on the per-command hot path.

mod dep_graph;
mod error;
mod step_id;

pub use dep_graph::{validate_and_order, DepGraph};
pub use error::{GraphError, GraphResult};
pub use step_id::StepId;
