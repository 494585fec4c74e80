//! Schedule projection
//!
//! Maintains a best-effort (scheduled_start, scheduled_end) estimate for
//! every step, consistent with the dependency order and the most recent
//! actual timestamps. Recomputed after every committed transition.
//!
//! Actual timestamps always pin the projection: a step that has started keeps
//! its actual start, a step that has ended keeps its actual end. Only
//! not-yet-occurred estimates move, so a late start pushes every unstarted
//! descendant later and an early finish pulls them earlier.

use crate::core::{Experiment, StepType};
use crate::graph::StepId;

/// Recomputes projections for all steps, walking the topological order.
///
/// For a step S that has not started:
/// `scheduled_start(S) = max(anchor, dependency end bounds, FixedStart bounds)`
/// where a dependency contributes its actual end if known, else its scheduled
/// end, and a FixedStart dependency that has started additionally contributes
/// `actual_start + duration` — its duration is the earliest permissible start
/// offset for dependents, enforced even while it is still Running.
pub(crate) fn project(experiment: &mut Experiment, order: &[StepId]) {
    for id in order {
        let Some(step) = experiment.step(id) else {
            continue;
        };

        let start = match step.actual_start() {
            Some(actual) => actual,
            None => {
                let mut start = experiment.anchor();
                for dep_id in step.dependencies() {
                    let Some(dep) = experiment.step(dep_id) else {
                        continue;
                    };
                    if let Some(end) = dep.actual_end().or(dep.scheduled_end()) {
                        start = start.max(end);
                    }
                    if dep.step_type() == StepType::FixedStart {
                        if let Some(dep_start) = dep.actual_start() {
                            start = start.max(dep_start + dep.duration());
                        }
                    }
                }
                start
            }
        };

        let end = step.actual_end().unwrap_or(start + step.duration());

        if let Some(step) = experiment.step_mut(id) {
            step.set_projection(start, end);
        }
    }
}
