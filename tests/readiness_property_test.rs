//! Readiness property over random DAGs
//!
//! A step is Ready (or beyond) if and only if every one of its dependencies
//! is Completed or Skipped. This drives random acyclic graphs through random
//! completion orders and checks the property after every committed command.

use chrono::{DateTime, TimeZone, Utc};
use praxis::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn t(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

/// Steps s0..sN where each step depends on a random subset of earlier steps;
/// construction order guarantees acyclicity.
fn random_dag(rng: &mut StdRng, n: usize) -> Experiment {
    let mut exp = Experiment::new("random").with_anchor(t(0));
    for i in 0..n {
        let deps: Vec<String> = (0..i)
            .filter(|_| rng.gen_bool(0.3))
            .map(|j| format!("s{j}"))
            .collect();
        exp = exp.with_step(
            Step::new(format!("s{i}"), format!("Step {i}"), StepType::Task, 5)
                .with_dependencies(deps),
        );
    }
    exp
}

fn satisfied(snapshot: &ExperimentSnapshot, step: &StepSnapshot) -> bool {
    step.dependencies.iter().all(|dep| {
        matches!(
            snapshot.step(dep).unwrap().status,
            StepStatus::Completed | StepStatus::Skipped
        )
    })
}

fn assert_readiness_invariant(snapshot: &ExperimentSnapshot) {
    for step in &snapshot.steps {
        match step.status {
            StepStatus::Pending => assert!(
                !satisfied(snapshot, step),
                "step {} is Pending with all dependencies satisfied",
                step.id
            ),
            _ => assert!(
                satisfied(snapshot, step),
                "step {} advanced past Pending without its dependencies being satisfied",
                step.id
            ),
        }
    }
}

#[tokio::test]
async fn test_ready_iff_dependencies_satisfied() {
    for seed in 0..10u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let engine = Engine::new();
        let exp = random_dag(&mut rng, 12);
        let exp_id = exp.id();

        let outcome = engine.register(exp).await.unwrap();
        assert_readiness_invariant(&outcome.snapshot);

        let mut clock = 0i64;
        loop {
            let snap = engine.snapshot_at(exp_id, t(clock)).await.unwrap();
            let ready: Vec<StepId> = snap
                .steps
                .iter()
                .filter(|s| s.status == StepStatus::Ready)
                .map(|s| s.id.clone())
                .collect();

            if ready.is_empty() {
                // Nothing left to drive: the whole DAG must be terminal.
                assert!(snap.steps.iter().all(|s| matches!(
                    s.status,
                    StepStatus::Completed | StepStatus::Skipped
                )));
                break;
            }

            let pick = ready[rng.gen_range(0..ready.len())].clone();
            clock += 10;
            let outcome = if rng.gen_bool(0.5) {
                engine
                    .apply_command_at(exp_id, &pick, Command::Start, t(clock))
                    .await
                    .unwrap();
                clock += 10;
                engine
                    .apply_command_at(exp_id, &pick, Command::Complete, t(clock))
                    .await
                    .unwrap()
            } else {
                engine
                    .apply_command_at(exp_id, &pick, Command::Skip, t(clock))
                    .await
                    .unwrap()
            };

            assert_readiness_invariant(&outcome.snapshot);
        }
    }
}
