// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipegraph contributors

//! Task nodes
//!
//! A task is a unit of work with declared output channels and inputs that
//! may reference other tasks' outputs. How a task's body executes belongs to
//! the component producer and is opaque here.

use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

use super::group::GroupId;
use crate::channel::{extract_recursive, validate_name, Channel, ChannelType};
use crate::errors::{GraphError, GraphResult};

/// Description of a task before it is added to a pipeline
#[derive(Debug, Clone)]
pub struct TaskSpec {
    name: String,
    component: String,
    inputs: BTreeMap<String, Value>,
    outputs: Vec<(String, ChannelType)>,
    after: Vec<String>,
}

impl TaskSpec {
    pub fn new(name: impl Into<String>, component: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            component: component.into(),
            inputs: BTreeMap::new(),
            outputs: Vec::new(),
            after: Vec::new(),
        }
    }

    /// Declare an output channel
    pub fn output(mut self, name: impl Into<String>, channel_type: impl Into<ChannelType>) -> Self {
        self.outputs.push((name.into(), channel_type.into()));
        self
    }

    /// Set an input argument; strings may embed channel placeholders
    pub fn input(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.inputs.insert(name.into(), value.into());
        self
    }

    /// Bind an input directly to a channel
    pub fn channel_input(self, name: impl Into<String>, channel: &Channel) -> Self {
        self.input(name, channel.encode())
    }

    /// Run after another task even without data flow between them
    pub fn after(mut self, task: impl Into<String>) -> Self {
        self.after.push(task.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A task registered in a pipeline
#[derive(Debug, Clone)]
pub struct Task {
    name: String,
    component: String,
    inputs: BTreeMap<String, Value>,
    input_channels: Vec<Channel>,
    outputs: Vec<Channel>,
    after: Vec<String>,
    enclosing_group: GroupId,
}

impl Task {
    pub(crate) fn from_spec(spec: TaskSpec, enclosing_group: GroupId) -> GraphResult<Self> {
        validate_name(&spec.name)?;

        let mut seen = HashSet::new();
        let mut outputs = Vec::with_capacity(spec.outputs.len());
        for (output_name, channel_type) in spec.outputs {
            if !seen.insert(output_name.clone()) {
                return Err(GraphError::invalid_name(
                    &output_name,
                    format!("output declared twice on task '{}'", spec.name),
                ));
            }
            outputs.push(Channel::create(
                &output_name,
                channel_type,
                Some(&spec.name),
                None,
            )?);
        }

        let input_channels = extract_recursive(&spec.inputs)?;

        Ok(Self {
            name: spec.name,
            component: spec.component,
            inputs: spec.inputs,
            input_channels,
            outputs,
            after: spec.after,
            enclosing_group,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    pub fn inputs(&self) -> &BTreeMap<String, Value> {
        &self.inputs
    }

    /// Channels referenced anywhere in the inputs
    pub fn input_channels(&self) -> &[Channel] {
        &self.input_channels
    }

    pub fn outputs(&self) -> &[Channel] {
        &self.outputs
    }

    /// Look up a declared output
    pub fn output(&self, name: &str) -> Option<&Channel> {
        self.outputs.iter().find(|c| c.name() == name)
    }

    /// Resolve a reference to one of this task's outputs.
    ///
    /// The reference must match the declared output exactly; a known name
    /// with a different type is a `TypeMismatch`.
    pub fn resolve_output(&self, channel: &Channel, consumer: &str) -> GraphResult<&Channel> {
        let declared = self.output(channel.name()).ok_or_else(|| GraphError::UnknownOutput {
            task: consumer.to_string(),
            producer: self.name.clone(),
            output: channel.name().to_string(),
        })?;
        if declared != channel {
            return Err(GraphError::type_mismatch(format!(
                "{} references '{}' of task '{}' as {}, but it is declared as {}",
                consumer,
                channel.name(),
                self.name,
                channel.channel_type(),
                declared.channel_type()
            )));
        }
        Ok(declared)
    }

    /// The single declared output, if there is exactly one
    pub fn single_output(&self) -> Option<&Channel> {
        match self.outputs.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }

    pub fn after(&self) -> &[String] {
        &self.after
    }

    pub fn enclosing_group(&self) -> GroupId {
        self.enclosing_group
    }

    /// Tasks that must finish before this one, in first-reference order
    pub fn upstream_tasks(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.input_channels
            .iter()
            .filter_map(Channel::producing_task)
            .chain(self.after.iter().map(String::as_str))
            .filter(|task| seen.insert(*task))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    #[test]
    fn test_outputs_are_produced_by_task() {
        let task = Task::from_spec(
            TaskSpec::new("train", "trainer")
                .output("model", "Model")
                .output("accuracy", "Float"),
            GroupId::ROOT,
        )
        .unwrap();

        let model = task.output("model").unwrap();
        assert_eq!(model.producing_task(), Some("train"));
        assert!(!model.is_parameter());
        assert!(task.output("accuracy").unwrap().is_parameter());
        assert!(task.single_output().is_none());
    }

    #[test]
    fn test_resolve_output_requires_declared_type() {
        let task = Task::from_spec(TaskSpec::new("count", "counter").output("n", "Integer"), GroupId::ROOT)
            .unwrap();

        let exact = Channel::create("n", "Integer", Some("count"), None).unwrap();
        assert_eq!(task.resolve_output(&exact, "sum").unwrap(), &exact);

        let retyped = Channel::create("n", "String", Some("count"), None).unwrap();
        let err = task.resolve_output(&retyped, "sum").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
        assert!(err.to_string().contains("declared as Integer"));

        let unknown = Channel::create("m", "Integer", Some("count"), None).unwrap();
        let err = task.resolve_output(&unknown, "sum").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownOutput);
    }

    #[test]
    fn test_upstream_from_inputs_and_after() {
        let data = Channel::create("data", "Dataset", Some("load"), None).unwrap();
        let lr = Channel::create("lr", "Float", None, None).unwrap();
        let task = Task::from_spec(
            TaskSpec::new("train", "trainer")
                .channel_input("data", &data)
                .input("cmd", format!("train --lr {} --data {}", lr, data))
                .after("setup")
                .after("load"),
            GroupId::ROOT,
        )
        .unwrap();

        assert_eq!(task.input_channels().len(), 2);
        assert_eq!(task.upstream_tasks(), vec!["load", "setup"]);
    }

    #[test]
    fn test_duplicate_output_rejected() {
        let err = Task::from_spec(
            TaskSpec::new("t", "c").output("out", "String").output("out", "Integer"),
            GroupId::ROOT,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidName);
    }

    #[test]
    fn test_invalid_task_name() {
        let err = Task::from_spec(TaskSpec::new("2fast", "c"), GroupId::ROOT).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidName);
    }
}
