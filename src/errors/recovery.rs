// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipegraph contributors

//! Error recovery suggestions
//!
//! Provides actionable suggestions for fixing a rejected graph.

use super::GraphError;

/// A recovery suggestion with concrete steps
#[derive(Debug, Clone)]
pub struct RecoverySuggestion {
    /// Brief description of what to do
    pub action: String,
    /// Detailed steps
    pub steps: Vec<String>,
    /// Commands to run
    pub commands: Vec<String>,
}

impl RecoverySuggestion {
    /// Pick a suggestion for an error, if one applies
    pub fn for_error(error: &GraphError) -> Option<Self> {
        match error {
            GraphError::CircularDependency { tasks } => Some(Self::fix_circular_dependency(tasks)),
            GraphError::NonExclusiveBranches { group, tasks } => {
                Some(Self::split_condition(group, tasks))
            }
            GraphError::MissingConditionAncestor { task } => Some(Self::gate_branch(task)),
            GraphError::LoopNotAllowed { task, group } => Some(Self::hoist_out_of_loop(task, group)),
            GraphError::IllegalDependency { task, group, .. } => {
                Some(Self::fix_cross_group_dependency(task, group))
            }
            GraphError::UnclosedGroup { group } => Some(Self {
                action: format!("Close group '{}'", group),
                steps: vec![
                    "Every enter_group must be paired with exit_group".into(),
                    "Prefer AuthoringContext::scoped, which exits automatically".into(),
                ],
                commands: vec![],
            }),
            _ => None,
        }
    }

    /// Suggest fixing a circular dependency
    pub fn fix_circular_dependency(tasks: &[String]) -> Self {
        Self {
            action: "Remove circular dependency".into(),
            steps: vec![
                format!("Detected cycle: {}", tasks.join(" → ")),
                "Review task inputs and 'after' lists".into(),
                "Ensure tasks form a directed acyclic graph (DAG)".into(),
            ],
            commands: vec![
                "# Visualize your pipeline:".into(),
                "pipegraph graph --format mermaid <FILE>".into(),
            ],
        }
    }

    /// Suggest splitting branches that share a condition
    pub fn split_condition(group: &str, tasks: &[String]) -> Self {
        Self {
            action: format!("Split the branches inside Condition '{}'", group),
            steps: vec![
                format!("Tasks {} all run when '{}' holds", tasks.join(", "), group),
                "Give each OneOf branch its own, mutually exclusive Condition".into(),
            ],
            commands: vec![],
        }
    }

    /// Suggest wrapping a branch in a condition
    pub fn gate_branch(task: &str) -> Self {
        Self {
            action: format!("Wrap task '{}' in a Condition group", task),
            steps: vec![
                "An ungated task always runs, so its output is never one of several".into(),
            ],
            commands: vec![],
        }
    }

    /// Suggest moving a branch out of a loop
    pub fn hoist_out_of_loop(task: &str, group: &str) -> Self {
        Self {
            action: format!("Move task '{}' out of ParallelFor '{}'", task, group),
            steps: vec![
                "A looped task produces one output per iteration".into(),
                "OneOf needs exactly one producer at runtime".into(),
            ],
            commands: vec![],
        }
    }

    /// Suggest fixing a dependency into a foreign group
    pub fn fix_cross_group_dependency(task: &str, group: &str) -> Self {
        Self {
            action: format!("Move task '{}' inside group '{}'", task, group),
            steps: vec![
                format!("Outputs produced inside '{}' may not exist at runtime", group),
                "Consume them from within the same group, or aggregate with OneOf".into(),
            ],
            commands: vec![],
        }
    }
}

impl std::fmt::Display for RecoverySuggestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "→ {}", self.action)?;

        for step in &self.steps {
            writeln!(f, "  {}", step)?;
        }

        if !self.commands.is_empty() {
            writeln!(f)?;
            for cmd in &self.commands {
                writeln!(f, "  {}", cmd)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suggestion_for_shared_condition() {
        let err = GraphError::NonExclusiveBranches {
            group: "c1".into(),
            tasks: vec!["t1".into(), "t2".into()],
        };
        let suggestion = RecoverySuggestion::for_error(&err).unwrap();
        assert!(suggestion.action.contains("c1"));
        assert!(suggestion.to_string().contains("t1, t2"));
    }

    #[test]
    fn test_no_suggestion_for_io() {
        let err = GraphError::Io {
            message: "denied".into(),
        };
        assert!(RecoverySuggestion::for_error(&err).is_none());
    }
}
