//! Step identifier type
//!
//! This module defines the StepId type which uniquely identifies a step
//! within an experiment. Step IDs are opaque strings chosen by the
//! authoring collaborator; the engine only requires uniqueness among
//! siblings, which is enforced when the dependency graph is validated.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a step within an experiment.
///
/// # Examples
///
/// ```
/// use praxis::StepId;
///
/// let step = StepId::new("spin_down");
/// assert_eq!(step.as_str(), "spin_down");
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepId(String);

impl StepId {
    /// Creates a new StepId.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StepId({})", self.0)
    }
}

impl From<&str> for StepId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for StepId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&StepId> for StepId {
    fn from(id: &StepId) -> Self {
        id.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_id_equality() {
        let a = StepId::new("mix");
        let b: StepId = "mix".into();
        let c = StepId::new("incubate");

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_step_id_display() {
        let id = StepId::new("elute");
        assert_eq!(format!("{}", id), "elute");
        assert_eq!(format!("{:?}", id), "StepId(elute)");
    }

    #[test]
    fn test_step_id_hash() {
        use std::collections::HashSet;

        let mut set = HashSet::new();
        set.insert(StepId::new("a"));
        set.insert(StepId::new("b"));
        set.insert(StepId::new("a"));

        assert_eq!(set.len(), 2);
    }
}
