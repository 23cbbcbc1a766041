// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipegraph contributors

//! OneOf: aggregation of mutually exclusive branch outputs
//!
//! A OneOf says "exactly one of these branches runs; treat the result as a
//! single value". Operand checks happen at construction. Structural checks
//! need the finished tree and run in [`OneOf::validate_topology`], in a
//! fixed order so the first violated rule is always the one reported:
//!
//! 1. no literals or pipeline inputs among the outputs
//! 2. identical channel types
//! 3. at least two outputs
//! 4. every producing task exists and declares the output with that type
//! 5. every producing task sits under some Condition group
//! 6. no Condition group is shared by two outputs
//! 7. no producing task sits under a ParallelFor group

use serde::Serialize;

use tracing::debug;

use super::group::GroupKind;
use super::topology::Topology;
use super::Pipeline;
use crate::channel::{Channel, ChannelType};
use crate::errors::{GraphError, GraphResult};

/// Index of a OneOf registered in a pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct OneOfId(pub(crate) usize);

/// Mutually exclusive, collectively exhaustive branch outputs
#[derive(Debug, Clone, PartialEq)]
pub struct OneOf {
    outputs: Vec<Channel>,
}

impl OneOf {
    /// Create a OneOf, checking its operands
    pub fn new(outputs: Vec<Channel>) -> GraphResult<Self> {
        let constants: Vec<String> = outputs
            .iter()
            .filter(|c| c.literal_value().is_some())
            .map(|c| c.full_name())
            .collect();
        if !constants.is_empty() {
            return Err(GraphError::InvalidOperand {
                reason: format!("constants are not permitted, got {}", constants.join(", ")),
            });
        }

        let pipeline_inputs: Vec<&str> = outputs
            .iter()
            .filter(|c| c.is_pipeline_input())
            .map(Channel::name)
            .collect();
        if !pipeline_inputs.is_empty() {
            return Err(GraphError::InvalidOperand {
                reason: format!(
                    "pipeline inputs are not permitted, got {}",
                    pipeline_inputs.join(", ")
                ),
            });
        }

        if let Some(first) = outputs.first() {
            if outputs.iter().any(|c| c.channel_type() != first.channel_type()) {
                let types: Vec<String> = outputs.iter().map(|c| c.channel_type().to_string()).collect();
                return Err(GraphError::type_mismatch(format!(
                    "OneOf outputs must all be the same type, got ({})",
                    types.join(", ")
                )));
            }
        }

        if outputs.len() < 2 {
            return Err(GraphError::ArityViolation {
                count: outputs.len(),
            });
        }

        Ok(Self { outputs })
    }

    pub fn outputs(&self) -> &[Channel] {
        &self.outputs
    }

    /// Shared type of all branches
    pub fn channel_type(&self) -> &ChannelType {
        self.outputs[0].channel_type()
    }

    /// Producing task of each output, in declaration order
    pub fn branch_tasks(&self) -> Vec<&str> {
        self.outputs
            .iter()
            .filter_map(Channel::producing_task)
            .collect()
    }

    /// Check the structural rules against a resolved topology
    pub fn validate_topology(&self, pipeline: &Pipeline, topology: &Topology) -> GraphResult<()> {
        let mut branches: Vec<(&str, &[String])> = Vec::with_capacity(self.outputs.len());
        for channel in &self.outputs {
            let Some(task_name) = channel.producing_task() else {
                return Err(GraphError::InvalidOperand {
                    reason: format!("'{}' is not a task output", channel.name()),
                });
            };
            let task = pipeline
                .task_by_name(task_name)
                .ok_or_else(|| GraphError::unknown_task_in(task_name, "a OneOf"))?;
            task.resolve_output(channel, "OneOf")?;
            let parents = topology
                .parent_groups_of(task_name)
                .ok_or_else(|| GraphError::unknown_task_in(task_name, "a OneOf"))?;
            branches.push((task_name, parents));
        }

        let is_kind = |group: &String, kind: GroupKind| topology.group_kind(group) == Some(kind);

        for (task, parents) in &branches {
            if !parents.iter().any(|g| is_kind(g, GroupKind::Condition)) {
                return Err(GraphError::MissingConditionAncestor {
                    task: task.to_string(),
                });
            }
        }

        // condition group -> tasks under it, in first-seen order
        let mut by_condition: Vec<(&str, Vec<&str>)> = Vec::new();
        for (task, parents) in &branches {
            for group in parents.iter().filter(|g| is_kind(*g, GroupKind::Condition)) {
                match by_condition.iter_mut().find(|(name, _)| *name == group.as_str()) {
                    Some((_, tasks)) => tasks.push(*task),
                    None => by_condition.push((group.as_str(), vec![*task])),
                }
            }
        }
        if let Some((group, tasks)) = by_condition.iter().find(|(_, tasks)| tasks.len() > 1) {
            return Err(GraphError::NonExclusiveBranches {
                group: group.to_string(),
                tasks: tasks.iter().map(|t| t.to_string()).collect(),
            });
        }

        for (task, parents) in &branches {
            if let Some(group) = parents.iter().find(|g| is_kind(*g, GroupKind::ParallelFor)) {
                return Err(GraphError::LoopNotAllowed {
                    task: task.to_string(),
                    group: group.clone(),
                });
            }
        }

        debug!(branches = ?self.branch_tasks(), "validated OneOf");
        Ok(())
    }
}

impl<'a> IntoIterator for &'a OneOf {
    type Item = &'a Channel;
    type IntoIter = std::slice::Iter<'a, Channel>;

    fn into_iter(self) -> Self::IntoIter {
        self.outputs.iter()
    }
}
