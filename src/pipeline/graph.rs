// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipegraph contributors

//! The finished pipeline graph
//!
//! A [`Pipeline`] is produced by [`AuthoringContext::finish`](super::AuthoringContext::finish)
//! and is read-only afterwards.

use std::collections::{BTreeMap, HashMap};

use super::group::{Group, GroupId, Node, TaskId};
use super::oneof::{OneOf, OneOfId};
use super::task::Task;
use crate::channel::Channel;

/// A value the pipeline exposes to its caller
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutput {
    Channel(Channel),
    OneOf(OneOfId),
}

/// Authoring tree plus lookup indices
#[derive(Debug, Clone)]
pub struct Pipeline {
    pub(crate) name: String,
    pub(crate) groups: Vec<Group>,
    pub(crate) tasks: Vec<Task>,
    pub(crate) group_index: HashMap<String, GroupId>,
    pub(crate) task_index: HashMap<String, TaskId>,
    pub(crate) inputs: Vec<Channel>,
    pub(crate) one_ofs: Vec<OneOf>,
    pub(crate) outputs: BTreeMap<String, PipelineOutput>,
}

impl Pipeline {
    pub(crate) fn new(name: &str) -> Self {
        let root = Group::new(name.to_string(), super::GroupSpec::Root, None);
        let mut group_index = HashMap::new();
        group_index.insert(name.to_string(), GroupId::ROOT);

        Self {
            name: name.to_string(),
            groups: vec![root],
            tasks: Vec::new(),
            group_index,
            task_index: HashMap::new(),
            inputs: Vec::new(),
            one_ofs: Vec::new(),
            outputs: BTreeMap::new(),
        }
    }

    pub(crate) fn push_group(&mut self, group: Group) -> GroupId {
        let id = GroupId(self.groups.len());
        if let Some(parent) = group.parent {
            self.groups[parent.0].children.push(Node::Group(id));
        }
        self.group_index.insert(group.name.clone(), id);
        self.groups.push(group);
        id
    }

    pub(crate) fn push_task(&mut self, task: Task) -> TaskId {
        let id = TaskId(self.tasks.len());
        self.groups[task.enclosing_group().0]
            .children
            .push(Node::Task(id));
        self.task_index.insert(task.name().to_string(), id);
        self.tasks.push(task);
        id
    }

    /// True when a task or group already uses `name`
    pub(crate) fn is_name_taken(&self, name: &str) -> bool {
        self.group_index.contains_key(name) || self.task_index.contains_key(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &Group {
        &self.groups[GroupId::ROOT.0]
    }

    pub fn group(&self, id: GroupId) -> &Group {
        &self.groups[id.0]
    }

    pub fn task(&self, id: TaskId) -> &Task {
        &self.tasks[id.0]
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn group_by_name(&self, name: &str) -> Option<&Group> {
        self.group_index.get(name).map(|id| self.group(*id))
    }

    pub fn task_by_name(&self, name: &str) -> Option<&Task> {
        self.task_index.get(name).map(|id| self.task(*id))
    }

    /// Pipeline-level input channels
    pub fn inputs(&self) -> &[Channel] {
        &self.inputs
    }

    pub fn one_ofs(&self) -> &[OneOf] {
        &self.one_ofs
    }

    pub fn one_of(&self, id: OneOfId) -> &OneOf {
        &self.one_ofs[id.0]
    }

    pub fn outputs(&self) -> &BTreeMap<String, PipelineOutput> {
        &self.outputs
    }

    /// Enclosing groups of a group, innermost first, excluding itself
    pub fn ancestors(&self, id: GroupId) -> impl Iterator<Item = &Group> + '_ {
        std::iter::successors(self.group(id).parent, move |gid| self.group(*gid).parent)
            .map(move |gid| self.group(gid))
    }
}
