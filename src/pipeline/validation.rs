// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipegraph contributors

//! Pipeline compilation
//!
//! Validates a finished pipeline before it is handed to a backend. The
//! topology is resolved once and shared by every check.

use std::collections::HashSet;

use tracing::{debug, info};

use super::dag::TaskDag;
use super::group::{Group, GroupId, GroupKind, GroupSpec, Node};
use super::oneof::OneOf;
use super::topology::Topology;
use super::{Pipeline, PipelineOutput};
use crate::channel::Channel;
use crate::errors::{GraphError, GraphResult};

/// Compile a pipeline; shorthand for [`PipelineValidator::compile`]
pub fn compile(pipeline: &Pipeline) -> GraphResult<CompiledGraph<'_>> {
    PipelineValidator::compile(pipeline)
}

/// Pipeline validator
pub struct PipelineValidator;

impl PipelineValidator {
    /// Run every structural check, stopping at the first error
    pub fn compile(pipeline: &Pipeline) -> GraphResult<CompiledGraph<'_>> {
        let topology = Topology::resolve(pipeline);
        let dag = TaskDag::build(pipeline)?;

        Self::validate_dependencies(&dag, &topology)?;
        Self::validate_outputs(pipeline)?;

        for one_of in pipeline.one_ofs() {
            one_of.validate_topology(pipeline, &topology)?;
        }

        let mut warnings = Vec::new();
        Self::collect_warnings(pipeline, &topology, &mut warnings);

        info!(
            pipeline = pipeline.name(),
            tasks = pipeline.tasks().len(),
            groups = topology.group_count(),
            one_ofs = pipeline.one_ofs().len(),
            warnings = warnings.len(),
            "compiled pipeline"
        );

        Ok(CompiledGraph {
            pipeline,
            topology,
            dag,
            warnings,
        })
    }

    /// A task may not reach into a Condition or ParallelFor scope it is not part of
    fn validate_dependencies(dag: &TaskDag, topology: &Topology) -> GraphResult<()> {
        for (upstream, task) in dag.edges() {
            let Some((upstream_path, _)) = topology.uncommon_ancestors(upstream, task) else {
                continue;
            };
            // the last entry is the upstream task itself
            let scopes = &upstream_path[..upstream_path.len().saturating_sub(1)];
            let blocking = scopes.iter().find_map(|group| match topology.group_kind(group) {
                Some(kind @ (GroupKind::Condition | GroupKind::ParallelFor)) => Some((group, kind)),
                _ => None,
            });

            if let Some((group, kind)) = blocking {
                return Err(GraphError::IllegalDependency {
                    task: task.to_string(),
                    upstream: upstream.to_string(),
                    group: group.clone(),
                    kind: kind.to_string(),
                });
            }
        }
        debug!("validated cross-group dependencies");
        Ok(())
    }

    fn validate_outputs(pipeline: &Pipeline) -> GraphResult<()> {
        for (name, output) in pipeline.outputs() {
            let PipelineOutput::Channel(channel) = output else {
                continue;
            };
            let Some(producer) = channel.producing_task() else {
                continue;
            };
            let task = pipeline
                .task_by_name(producer)
                .ok_or_else(|| GraphError::unknown_task_in(producer, &format!("pipeline output '{}'", name)))?;
            task.resolve_output(channel, &format!("pipeline output '{}'", name))?;
        }
        Ok(())
    }

    fn collect_warnings(pipeline: &Pipeline, topology: &Topology, warnings: &mut Vec<String>) {
        for group in pipeline.groups().iter().filter(|g| !g.is_root()) {
            if group.children().is_empty() {
                warnings.push(format!(
                    "{} group '{}' is empty",
                    group.kind(),
                    group.name()
                ));
            }
        }

        let declared: HashSet<&str> = pipeline.inputs().iter().map(Channel::name).collect();
        for task in pipeline.tasks() {
            let loop_items: Vec<String> = topology
                .parent_groups_of(task.name())
                .unwrap_or_default()
                .iter()
                .filter(|g| topology.group_kind(g) == Some(GroupKind::ParallelFor))
                .map(|g| format!("{}-loop-item", g))
                .collect();

            for channel in task.input_channels() {
                let undeclared = channel.is_pipeline_input()
                    && channel.literal_value().is_none()
                    && !declared.contains(channel.name())
                    && !loop_items.iter().any(|item| item == channel.name());
                if undeclared {
                    warnings.push(format!(
                        "Task '{}' consumes undeclared pipeline input '{}'",
                        task.name(),
                        channel.name()
                    ));
                }
            }
        }
    }
}

/// A validated pipeline together with its resolved views
#[derive(Debug)]
pub struct CompiledGraph<'a> {
    pipeline: &'a Pipeline,
    topology: Topology,
    dag: TaskDag,
    warnings: Vec<String>,
}

impl<'a> CompiledGraph<'a> {
    pub fn pipeline(&self) -> &'a Pipeline {
        self.pipeline
    }

    pub fn root(&self) -> &'a Group {
        self.pipeline.root()
    }

    /// All groups in pre-order
    pub fn all_groups(&self) -> impl Iterator<Item = (&str, GroupId)> + '_ {
        self.topology.all_groups()
    }

    /// Enclosing groups of a task, innermost first
    pub fn parent_groups_of(&self, task: &str) -> Option<&[String]> {
        self.topology.parent_groups_of(task)
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn dag(&self) -> &TaskDag {
        &self.dag
    }

    pub fn one_ofs(&self) -> &'a [OneOf] {
        self.pipeline.one_ofs()
    }

    /// Task names in a valid execution order
    pub fn execution_order(&self) -> Vec<String> {
        self.dag.topological_order_names()
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Indented outline of the group tree
    pub fn outline(&self) -> String {
        let mut out = String::new();
        self.outline_group(GroupId::ROOT, 0, &mut out);
        out
    }

    fn outline_group(&self, id: GroupId, depth: usize, out: &mut String) {
        let group = self.pipeline.group(id);
        let detail = match group.spec() {
            GroupSpec::Condition(condition) => format!(" if {}", condition),
            GroupSpec::ParallelFor(spec) => match spec.parallelism {
                Some(n) => format!(" parallelism={}", n),
                None => String::new(),
            },
            GroupSpec::ExitHandler { exit_task } => format!(" exit_task={}", exit_task),
            GroupSpec::Root => String::new(),
        };
        out.push_str(&format!(
            "{}{} [{}]{}\n",
            "  ".repeat(depth),
            group.name(),
            group.kind(),
            detail
        ));

        for child in group.children() {
            match child {
                Node::Group(child_id) => self.outline_group(*child_id, depth + 1, out),
                Node::Task(task_id) => {
                    let task = self.pipeline.task(*task_id);
                    out.push_str(&format!(
                        "{}{} ({})\n",
                        "  ".repeat(depth + 1),
                        task.name(),
                        task.component()
                    ));
                }
            }
        }
    }
}
