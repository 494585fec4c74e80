//! Resource conflict detection
//!
//! Groups currently Running steps by resource key and reports every pair
//! sharing one. Paused steps do not hold their resource. Detection is
//! advisory: the engine never blocks a Start because of contention, it only
//! reports it. Ownership is recomputed fresh on every scan, never cached.

use crate::core::{EventKind, Step, StepStatus};
use crate::graph::StepId;
use std::collections::HashMap;

/// Scans Running steps and returns one `ResourceConflict` per contending
/// pair, in declaration order. O(n) grouping over n Running steps.
pub(crate) fn detect(steps: &[Step]) -> Vec<EventKind> {
    let mut holders: HashMap<&str, Vec<&StepId>> = HashMap::new();
    let mut key_order: Vec<&str> = Vec::new();

    for step in steps {
        if step.status() != StepStatus::Running {
            continue;
        }
        let Some(resource) = step.resource_needed() else {
            continue;
        };
        let group = holders.entry(resource).or_default();
        if group.is_empty() {
            key_order.push(resource);
        }
        group.push(step.id());
    }

    let mut conflicts = Vec::new();
    for resource in key_order {
        let group = &holders[resource];
        for i in 0..group.len() {
            for j in (i + 1)..group.len() {
                conflicts.push(EventKind::ResourceConflict {
                    step_a: group[i].clone(),
                    step_b: group[j].clone(),
                    resource: resource.to_string(),
                });
            }
        }
    }
    conflicts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StepType;
    use chrono::{TimeZone, Utc};

    fn running(id: &str, resource: Option<&str>) -> Step {
        let mut step = Step::new(id, id, StepType::AutomatedTask, 10);
        if let Some(r) = resource {
            step = step.with_resource(r);
        }
        step.mark_ready();
        step.begin(Utc.timestamp_opt(1_700_000_000, 0).unwrap());
        step
    }

    #[test]
    fn test_two_holders_one_conflict() {
        let steps = vec![
            running("a", Some("centrifuge")),
            running("b", Some("centrifuge")),
            running("c", Some("incubator")),
        ];

        let conflicts = detect(&steps);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(
            conflicts[0],
            EventKind::ResourceConflict {
                step_a: StepId::new("a"),
                step_b: StepId::new("b"),
                resource: "centrifuge".to_string(),
            }
        );
    }

    #[test]
    fn test_three_holders_three_pairs() {
        let steps = vec![
            running("a", Some("oven")),
            running("b", Some("oven")),
            running("c", Some("oven")),
        ];
        assert_eq!(detect(&steps).len(), 3);
    }

    #[test]
    fn test_paused_step_releases_resource() {
        let mut paused = running("a", Some("centrifuge"));
        paused.hold(Utc.timestamp_opt(1_700_000_100, 0).unwrap());
        let steps = vec![paused, running("b", Some("centrifuge"))];

        assert!(detect(&steps).is_empty());
    }

    #[test]
    fn test_keyless_steps_never_conflict() {
        let steps = vec![running("a", None), running("b", None)];
        assert!(detect(&steps).is_empty());
    }
}
