// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipegraph contributors

//! Group hierarchy
//!
//! Groups are the nesting scopes of the authoring tree. The pipeline owns
//! every group and task in flat arenas; a group owns its children through
//! ids, and the `parent` back-reference is a plain id that never owns.

use serde::Serialize;
use serde_json::Value;

use crate::channel::{Channel, ChannelType, ConditionOperator};
use crate::errors::{GraphError, GraphResult};

/// Index of a group within its pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct GroupId(pub(crate) usize);

impl GroupId {
    /// The root group of every pipeline
    pub const ROOT: GroupId = GroupId(0);

    pub fn index(&self) -> usize {
        self.0
    }
}

/// Index of a task within its pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TaskId(pub(crate) usize);

impl TaskId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// A child entry of a group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node {
    Group(GroupId),
    Task(TaskId),
}

/// Kind of authoring scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum GroupKind {
    Root,
    Condition,
    ParallelFor,
    ExitHandler,
}

impl GroupKind {
    /// Prefix used when a group is named automatically
    pub fn name_prefix(&self) -> &'static str {
        match self {
            Self::Root => "pipeline",
            Self::Condition => "condition",
            Self::ParallelFor => "for-loop",
            Self::ExitHandler => "exit-handler",
        }
    }
}

impl std::fmt::Display for GroupKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Root => write!(f, "Root"),
            Self::Condition => write!(f, "Condition"),
            Self::ParallelFor => write!(f, "ParallelFor"),
            Self::ExitHandler => write!(f, "ExitHandler"),
        }
    }
}

/// What a ParallelFor iterates over
#[derive(Debug, Clone, PartialEq)]
pub enum LoopItems {
    /// Items known at authoring time
    Static(Vec<Value>),
    /// A list-valued parameter channel resolved at runtime
    Channel(Channel),
}

/// Iteration settings of a ParallelFor group
#[derive(Debug, Clone, PartialEq)]
pub struct LoopSpec {
    pub items: LoopItems,
    /// Maximum concurrent iterations, unbounded when `None`
    pub parallelism: Option<u32>,
}

impl LoopSpec {
    pub fn over_values(items: Vec<Value>) -> Self {
        Self {
            items: LoopItems::Static(items),
            parallelism: None,
        }
    }

    /// Iterate over a parameter channel
    pub fn over_channel(channel: Channel) -> GraphResult<Self> {
        if !channel.is_parameter() {
            return Err(GraphError::type_mismatch(format!(
                "ParallelFor cannot iterate over artifact channel '{}'",
                channel.full_name()
            )));
        }
        Ok(Self {
            items: LoopItems::Channel(channel),
            parallelism: None,
        })
    }

    pub fn with_parallelism(mut self, parallelism: u32) -> Self {
        self.parallelism = Some(parallelism);
        self
    }

    /// Type of a single iteration item
    pub fn item_type(&self) -> ChannelType {
        let name = match &self.items {
            LoopItems::Static(items) => match items.first() {
                Some(Value::Bool(_)) => "Boolean",
                Some(Value::Number(n)) if n.is_f64() => "Float",
                Some(Value::Number(_)) => "Integer",
                Some(Value::Array(_)) => "List",
                Some(Value::Object(_)) => "Dict",
                _ => "String",
            },
            LoopItems::Channel(_) => "String",
        };
        ChannelType::from(name)
    }

    /// Channel standing for the current item inside the loop body
    pub fn loop_item(&self, group_name: &str) -> GraphResult<Channel> {
        Channel::create(
            &format!("{}-loop-item", group_name),
            self.item_type(),
            None,
            None,
        )
    }
}

/// Kind-specific payload of a group
#[derive(Debug, Clone, PartialEq)]
pub enum GroupSpec {
    Root,
    Condition(ConditionOperator),
    ParallelFor(LoopSpec),
    ExitHandler { exit_task: String },
}

impl GroupSpec {
    pub fn kind(&self) -> GroupKind {
        match self {
            Self::Root => GroupKind::Root,
            Self::Condition(_) => GroupKind::Condition,
            Self::ParallelFor(_) => GroupKind::ParallelFor,
            Self::ExitHandler { .. } => GroupKind::ExitHandler,
        }
    }

    /// Channels the scope itself consumes (condition operands, loop items)
    pub fn channels(&self) -> Vec<&Channel> {
        match self {
            Self::Condition(condition) => condition.channels(),
            Self::ParallelFor(LoopSpec {
                items: LoopItems::Channel(channel),
                ..
            }) => vec![channel],
            _ => Vec::new(),
        }
    }
}

/// A named node of the authoring tree
#[derive(Debug, Clone)]
pub struct Group {
    pub(crate) name: String,
    pub(crate) spec: GroupSpec,
    pub(crate) parent: Option<GroupId>,
    pub(crate) children: Vec<Node>,
}

impl Group {
    pub(crate) fn new(name: String, spec: GroupSpec, parent: Option<GroupId>) -> Self {
        Self {
            name,
            spec,
            parent,
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> GroupKind {
        self.spec.kind()
    }

    pub fn spec(&self) -> &GroupSpec {
        &self.spec
    }

    pub fn parent(&self) -> Option<GroupId> {
        self.parent
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::condition;
    use crate::errors::ErrorKind;
    use serde_json::json;

    #[test]
    fn test_loop_item_type_inference() {
        assert_eq!(
            LoopSpec::over_values(vec![json!(1), json!(2)]).item_type(),
            ChannelType::from("Integer")
        );
        assert_eq!(
            LoopSpec::over_values(vec![json!({"a": 1})]).item_type(),
            ChannelType::from("Dict")
        );
        assert_eq!(
            LoopSpec::over_values(vec![]).item_type(),
            ChannelType::from("String")
        );
    }

    #[test]
    fn test_loop_item_channel() {
        let spec = LoopSpec::over_values(vec![json!(0.5)]).with_parallelism(2);
        let item = spec.loop_item("for-loop-1").unwrap();
        assert_eq!(item.name(), "for-loop-1-loop-item");
        assert!(item.is_pipeline_input());
        assert_eq!(spec.parallelism, Some(2));
    }

    #[test]
    fn test_loop_over_artifact_rejected() {
        let data = Channel::create("data", "Dataset", Some("load"), None).unwrap();
        let err = LoopSpec::over_channel(data).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_spec_channels() {
        let flip = Channel::create("out", "String", Some("flip"), None).unwrap();
        let spec = GroupSpec::Condition(condition::eq(&flip, "heads").unwrap());
        assert_eq!(spec.kind(), GroupKind::Condition);
        assert_eq!(spec.channels(), vec![&flip]);
        assert!(GroupSpec::Root.channels().is_empty());
    }
}
