//! Dependency graph validation and ordering
//!
//! An experiment's steps declare dependencies as sets of sibling step IDs.
//! This module checks that the declared relation is a DAG over exactly the
//! sibling steps (no self-reference, no dangling reference, no cycle) and
//! produces a topological order for the projector to walk.
//!
//! # Design
//!
//! The graph is rebuilt from the declared dependency sets on every structural
//! mutation, not on every command. Validation and ordering happen in a single
//! depth-first traversal with a recursion-stack marker: a back edge is a
//! cycle, and the reversed DFS postorder is a valid topological order.
//! Declaration order drives traversal order so the result is deterministic.

use super::error::{GraphError, GraphResult};
use super::StepId;
use std::collections::HashMap;

/// Validated dependency graph over one experiment's steps.
///
/// Construction fails if the declared relation is not a DAG referencing only
/// sibling steps. A successfully built graph carries the topological order.
///
/// # Example
///
/// ```
/// use praxis::graph::{DepGraph, StepId};
///
/// let graph = DepGraph::build(vec![
///     (StepId::new("prep"), vec![]),
///     (StepId::new("mix"), vec![StepId::new("prep")]),
///     (StepId::new("incubate"), vec![StepId::new("mix")]),
/// ])
/// .unwrap();
///
/// let order: Vec<_> = graph.order().iter().map(|id| id.as_str()).collect();
/// assert_eq!(order, ["prep", "mix", "incubate"]);
/// ```
#[derive(Debug, Clone)]
pub struct DepGraph {
    /// Declaration order of the steps
    declared: Vec<StepId>,
    /// Predecessors (dependencies) per step
    dependencies: HashMap<StepId, Vec<StepId>>,
    /// Successors (dependents) per step
    dependents: HashMap<StepId, Vec<StepId>>,
    /// Topological order computed at build time
    order: Vec<StepId>,
}

/// DFS visit state for cycle detection.
#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Unvisited,
    /// Currently on the recursion stack
    Visiting,
    Visited,
}

impl DepGraph {
    /// Builds and validates a graph from `(step, dependencies)` pairs.
    ///
    /// The pairs must cover every step of the experiment, in declaration
    /// order. Dependencies must reference sibling steps only.
    ///
    /// # Errors
    ///
    /// - [`GraphError::DuplicateStep`] if two pairs share a step ID
    /// - [`GraphError::SelfDependency`] if a step depends on itself
    /// - [`GraphError::UnknownDependency`] if a dependency is not a sibling
    /// - [`GraphError::CycleDetected`] if the relation contains a cycle,
    ///   naming the cycle path
    pub fn build(steps: impl IntoIterator<Item = (StepId, Vec<StepId>)>) -> GraphResult<Self> {
        let mut declared = Vec::new();
        let mut dependencies: HashMap<StepId, Vec<StepId>> = HashMap::new();
        let mut dependents: HashMap<StepId, Vec<StepId>> = HashMap::new();

        for (id, deps) in steps {
            if dependencies.contains_key(&id) {
                return Err(GraphError::duplicate_step(id));
            }
            declared.push(id.clone());
            dependents.entry(id.clone()).or_default();
            dependencies.insert(id, deps);
        }

        for (id, deps) in &dependencies {
            for dep in deps {
                if dep == id {
                    return Err(GraphError::self_dependency(id.clone()));
                }
                if !dependencies.contains_key(dep) {
                    return Err(GraphError::unknown_dependency(id.clone(), dep.clone()));
                }
            }
        }

        // Edges point dependency -> dependent, in declaration order for
        // deterministic traversal.
        for id in &declared {
            for dep in &dependencies[id] {
                dependents
                    .get_mut(dep)
                    .unwrap_or_else(|| unreachable!("dependency existence checked above"))
                    .push(id.clone());
            }
        }

        let order = topological_order(&declared, &dependents)?;

        Ok(Self {
            declared,
            dependencies,
            dependents,
            order,
        })
    }

    /// Returns the number of steps in the graph.
    pub fn len(&self) -> usize {
        self.declared.len()
    }

    /// Returns true if the graph has no steps.
    pub fn is_empty(&self) -> bool {
        self.declared.is_empty()
    }

    /// Returns the topological order computed at build time.
    ///
    /// Every step appears after all of its dependencies.
    pub fn order(&self) -> &[StepId] {
        &self.order
    }

    /// Returns the declared dependencies of a step.
    pub fn dependencies(&self, id: &StepId) -> &[StepId] {
        self.dependencies.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns the steps that depend on `id`.
    pub fn dependents(&self, id: &StepId) -> &[StepId] {
        self.dependents.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns true if the step exists in the graph.
    pub fn contains(&self, id: &StepId) -> bool {
        self.dependencies.contains_key(id)
    }

    /// Returns steps with no dependencies, in declaration order.
    pub fn roots(&self) -> Vec<StepId> {
        self.declared
            .iter()
            .filter(|id| self.dependencies[*id].is_empty())
            .cloned()
            .collect()
    }
}

/// Validates a dependency relation and returns its topological order.
///
/// Convenience entry point for the authoring collaborator: called whenever an
/// experiment's step graph is edited, before the edit is accepted.
pub fn validate_and_order(
    steps: impl IntoIterator<Item = (StepId, Vec<StepId>)>,
) -> GraphResult<Vec<StepId>> {
    DepGraph::build(steps).map(|g| g.order)
}

/// Reversed DFS postorder over `dependency -> dependent` edges.
///
/// A node still on the recursion stack when revisited marks a back edge; the
/// stack slice from that node onward names the cycle.
fn topological_order(
    declared: &[StepId],
    dependents: &HashMap<StepId, Vec<StepId>>,
) -> GraphResult<Vec<StepId>> {
    let mut marks: HashMap<&StepId, Mark> =
        declared.iter().map(|id| (id, Mark::Unvisited)).collect();
    let mut stack: Vec<StepId> = Vec::new();
    let mut postorder: Vec<StepId> = Vec::with_capacity(declared.len());

    for id in declared {
        if marks[id] == Mark::Unvisited {
            visit(id, dependents, &mut marks, &mut stack, &mut postorder)?;
        }
    }

    postorder.reverse();
    Ok(postorder)
}

fn visit<'a>(
    node: &'a StepId,
    dependents: &'a HashMap<StepId, Vec<StepId>>,
    marks: &mut HashMap<&'a StepId, Mark>,
    stack: &mut Vec<StepId>,
    postorder: &mut Vec<StepId>,
) -> GraphResult<()> {
    marks.insert(node, Mark::Visiting);
    stack.push(node.clone());

    for next in &dependents[node] {
        match marks[next] {
            Mark::Unvisited => visit(next, dependents, marks, stack, postorder)?,
            Mark::Visiting => {
                // Back edge: the cycle is the stack from `next` onward,
                // closed by `next` itself.
                let from = stack.iter().position(|id| id == next).unwrap_or(0);
                let mut path: Vec<StepId> = stack[from..].to_vec();
                path.push(next.clone());
                return Err(GraphError::cycle(path));
            }
            Mark::Visited => {}
        }
    }

    stack.pop();
    marks.insert(node, Mark::Visited);
    postorder.push(node.clone());
    Ok(())
}
