// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipegraph contributors

//! Topology resolver
//!
//! Walks a finished pipeline once and indexes, for every task and group,
//! the chain of enclosing groups. Both indices are pure functions of the
//! tree; compile passes resolve once and share the result.

use std::collections::HashMap;

use tracing::debug;

use super::group::{GroupId, GroupKind, Node};
use super::Pipeline;

/// Ancestor chains and flat group index of a pipeline
#[derive(Debug, Clone)]
pub struct Topology {
    task_parents: HashMap<String, Vec<String>>,
    group_parents: HashMap<String, Vec<String>>,
    groups: Vec<(String, GroupId)>,
    group_index: HashMap<String, (GroupId, GroupKind)>,
}

impl Topology {
    /// Resolve the topology with a single pre-order walk from the root
    pub fn resolve(pipeline: &Pipeline) -> Self {
        let mut topology = Self {
            task_parents: HashMap::with_capacity(pipeline.tasks().len()),
            group_parents: HashMap::with_capacity(pipeline.groups().len()),
            groups: Vec::with_capacity(pipeline.groups().len()),
            group_index: HashMap::with_capacity(pipeline.groups().len()),
        };

        let mut path = Vec::new();
        topology.visit(pipeline, GroupId::ROOT, &mut path);

        debug!(
            pipeline = pipeline.name(),
            groups = topology.groups.len(),
            tasks = topology.task_parents.len(),
            "resolved topology"
        );
        topology
    }

    fn visit(&mut self, pipeline: &Pipeline, id: GroupId, path: &mut Vec<String>) {
        let group = pipeline.group(id);
        self.groups.push((group.name().to_string(), id));
        self.group_index
            .insert(group.name().to_string(), (id, group.kind()));
        self.group_parents
            .insert(group.name().to_string(), path.iter().rev().cloned().collect());

        path.push(group.name().to_string());
        for child in group.children() {
            match child {
                Node::Task(task_id) => {
                    let task = pipeline.task(*task_id);
                    self.task_parents
                        .insert(task.name().to_string(), path.iter().rev().cloned().collect());
                }
                Node::Group(child_id) => self.visit(pipeline, *child_id, path),
            }
        }
        path.pop();
    }

    /// Enclosing groups of a task, innermost first, root last
    pub fn parent_groups_of(&self, task: &str) -> Option<&[String]> {
        self.task_parents.get(task).map(Vec::as_slice)
    }

    /// Enclosing groups of a group, innermost first; empty for the root
    pub fn group_ancestors(&self, group: &str) -> Option<&[String]> {
        self.group_parents.get(group).map(Vec::as_slice)
    }

    /// All groups in pre-order
    pub fn all_groups(&self) -> impl Iterator<Item = (&str, GroupId)> + '_ {
        self.groups.iter().map(|(name, id)| (name.as_str(), *id))
    }

    pub fn group_id(&self, name: &str) -> Option<GroupId> {
        self.group_index.get(name).map(|(id, _)| *id)
    }

    pub fn group_kind(&self, name: &str) -> Option<GroupKind> {
        self.group_index.get(name).map(|(_, kind)| *kind)
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Root-first path to a task or group, ending with the node itself
    fn root_path(&self, node: &str) -> Option<Vec<String>> {
        let parents = self
            .task_parents
            .get(node)
            .or_else(|| self.group_parents.get(node))?;
        let mut path: Vec<String> = parents.iter().rev().cloned().collect();
        path.push(node.to_string());
        Some(path)
    }

    /// Root-first paths of two nodes with their shared prefix removed
    ///
    /// The first element of each side is the outermost scope that the
    /// other node is not part of (or the node itself when they are
    /// siblings).
    pub fn uncommon_ancestors(&self, a: &str, b: &str) -> Option<(Vec<String>, Vec<String>)> {
        let path_a = self.root_path(a)?;
        let path_b = self.root_path(b)?;
        let common = path_a
            .iter()
            .zip(&path_b)
            .take_while(|(x, y)| x == y)
            .count();
        Some((path_a[common..].to_vec(), path_b[common..].to_vec()))
    }
}
