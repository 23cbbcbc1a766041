// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipegraph contributors

//! Task dependency DAG
//!
//! Builds the task-level dependency graph of a finished pipeline and
//! validates it, ensuring a proper execution order and detecting cycles.
//! A task depends on:
//!
//! - the producing task of every channel referenced by its inputs
//! - the producing task of every channel consumed by an enclosing group
//!   (condition operands, loop items)
//! - every task named in its `after` list

use petgraph::algo::{has_path_connecting, tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::HashMap;

use super::group::{GroupId, Node, TaskId};
use super::task::Task;
use super::Pipeline;
use crate::channel::Channel;
use crate::errors::{GraphError, GraphResult};

/// Dependency graph over the tasks of a pipeline
#[derive(Debug, Clone)]
pub struct TaskDag {
    graph: DiGraph<TaskId, ()>,
    name_to_index: HashMap<String, NodeIndex>,
    index_to_name: HashMap<NodeIndex, String>,
    order: Vec<NodeIndex>,
}

impl TaskDag {
    /// Build and validate the DAG of a pipeline
    pub fn build(pipeline: &Pipeline) -> GraphResult<Self> {
        let mut graph = DiGraph::with_capacity(pipeline.tasks().len(), 0);
        let mut name_to_index = HashMap::with_capacity(pipeline.tasks().len());
        let mut index_to_name = HashMap::with_capacity(pipeline.tasks().len());

        // Add all tasks as nodes
        for (idx, task) in pipeline.tasks().iter().enumerate() {
            let node = graph.add_node(TaskId(idx));
            name_to_index.insert(task.name().to_string(), node);
            index_to_name.insert(node, task.name().to_string());
        }

        let mut dag = Self {
            graph,
            name_to_index,
            index_to_name,
            order: Vec::new(),
        };

        for task in pipeline.tasks() {
            let node = dag.name_to_index[task.name()];

            let scope_channels = std::iter::once(pipeline.group(task.enclosing_group()))
                .chain(pipeline.ancestors(task.enclosing_group()))
                .flat_map(|group| group.spec().channels());
            for channel in task.input_channels().iter().chain(scope_channels) {
                if let Some(upstream) = dag.producer_of(pipeline, task, channel)? {
                    dag.add_edge(upstream, node);
                }
            }

            for dep_name in task.after() {
                let upstream = dag.name_to_index.get(dep_name).copied().ok_or_else(|| {
                    GraphError::UnknownDependency {
                        task: task.name().to_string(),
                        dependency: dep_name.clone(),
                    }
                })?;
                dag.add_edge(upstream, node);
            }
        }

        dag.order = toposort(&dag.graph, None).map_err(|cycle| GraphError::CircularDependency {
            tasks: dag.find_cycle_members(cycle.node_id()),
        })?;

        Ok(dag)
    }

    /// Node of the task producing `channel`; `None` for pipeline-level channels
    fn producer_of(
        &self,
        pipeline: &Pipeline,
        consumer: &Task,
        channel: &Channel,
    ) -> GraphResult<Option<NodeIndex>> {
        let Some(producer) = channel.producing_task() else {
            return Ok(None);
        };
        let node = self.name_to_index.get(producer).copied().ok_or_else(|| {
            GraphError::UnknownDependency {
                task: consumer.name().to_string(),
                dependency: producer.to_string(),
            }
        })?;
        pipeline
            .task(self.graph[node])
            .resolve_output(channel, consumer.name())?;
        Ok(Some(node))
    }

    fn add_edge(&mut self, from: NodeIndex, to: NodeIndex) {
        if !self.graph.contains_edge(from, to) {
            self.graph.add_edge(from, to, ());
        }
    }

    /// Tasks of the strongly connected component containing `start`
    fn find_cycle_members(&self, start: NodeIndex) -> Vec<String> {
        let mut members: Vec<String> = tarjan_scc(&self.graph)
            .into_iter()
            .find(|component| component.contains(&start))
            .unwrap_or_else(|| vec![start])
            .into_iter()
            .map(|n| self.index_to_name[&n].clone())
            .collect();
        members.sort();
        members
    }

    /// Task ids in execution order
    pub fn topological_order(&self) -> Vec<TaskId> {
        self.order.iter().map(|n| self.graph[*n]).collect()
    }

    /// Task names in execution order
    pub fn topological_order_names(&self) -> Vec<String> {
        self.order
            .iter()
            .map(|n| self.index_to_name[n].clone())
            .collect()
    }

    /// Every dependency edge as (upstream, downstream)
    pub fn edges(&self) -> Vec<(&str, &str)> {
        self.graph
            .raw_edges()
            .iter()
            .map(|edge| {
                (
                    self.index_to_name[&edge.source()].as_str(),
                    self.index_to_name[&edge.target()].as_str(),
                )
            })
            .collect()
    }

    fn neighbors(&self, task_name: &str, direction: Direction) -> Option<Vec<String>> {
        let node = self.name_to_index.get(task_name)?;
        let mut names: Vec<String> = self
            .graph
            .neighbors_directed(*node, direction)
            .map(|n| self.index_to_name[&n].clone())
            .collect();
        names.sort();
        Some(names)
    }

    /// Get dependencies for a task (tasks that must run before it)
    pub fn dependencies(&self, task_name: &str) -> Option<Vec<String>> {
        self.neighbors(task_name, Direction::Incoming)
    }

    /// Get dependents for a task (tasks that depend on it)
    pub fn dependents(&self, task_name: &str) -> Option<Vec<String>> {
        self.neighbors(task_name, Direction::Outgoing)
    }

    /// Check if task A depends (directly or transitively) on task B
    pub fn depends_on(&self, task_a: &str, task_b: &str) -> bool {
        let Some(node_a) = self.name_to_index.get(task_a) else {
            return false;
        };
        let Some(node_b) = self.name_to_index.get(task_b) else {
            return false;
        };

        node_a != node_b && has_path_connecting(&self.graph, *node_b, *node_a, None)
    }

    /// Generate Mermaid diagram of the DAG, groups drawn as subgraphs
    pub fn to_mermaid(&self, pipeline: &Pipeline) -> String {
        let mut out = String::from("graph TD\n");
        self.mermaid_group(pipeline, GroupId::ROOT, 1, &mut out);

        for edge in self.graph.raw_edges() {
            out.push_str(&format!(
                "    t{} --> t{}\n",
                self.graph[edge.source()].index(),
                self.graph[edge.target()].index()
            ));
        }

        out
    }

    fn mermaid_group(&self, pipeline: &Pipeline, id: GroupId, depth: usize, out: &mut String) {
        let indent = "    ".repeat(depth);
        for child in pipeline.group(id).children() {
            match child {
                Node::Task(task_id) => {
                    let name = pipeline.task(*task_id).name();
                    out.push_str(&format!("{}t{}[\"{}\"]\n", indent, task_id.index(), name));
                }
                Node::Group(group_id) => {
                    let group = pipeline.group(*group_id);
                    out.push_str(&format!(
                        "{}subgraph g{} [\"{} ({})\"]\n",
                        indent,
                        group_id.index(),
                        group.name(),
                        group.kind()
                    ));
                    self.mermaid_group(pipeline, *group_id, depth + 1, out);
                    out.push_str(&format!("{}end\n", indent));
                }
            }
        }
    }

    /// Generate DOT diagram of the DAG, groups drawn as clusters
    pub fn to_dot(&self, pipeline: &Pipeline) -> String {
        let mut out = format!("digraph \"{}\" {{\n", pipeline.name());
        out.push_str("    rankdir=TB;\n");
        out.push_str("    node [shape=box, style=rounded];\n\n");

        self.dot_group(pipeline, GroupId::ROOT, 1, &mut out);
        out.push('\n');

        for (from, to) in self.edges() {
            out.push_str(&format!("    \"{}\" -> \"{}\";\n", from, to));
        }

        out.push_str("}\n");
        out
    }

    fn dot_group(&self, pipeline: &Pipeline, id: GroupId, depth: usize, out: &mut String) {
        let indent = "    ".repeat(depth);
        for child in pipeline.group(id).children() {
            match child {
                Node::Task(task_id) => {
                    out.push_str(&format!("{}\"{}\";\n", indent, pipeline.task(*task_id).name()));
                }
                Node::Group(group_id) => {
                    let group = pipeline.group(*group_id);
                    out.push_str(&format!("{}subgraph \"cluster_{}\" {{\n", indent, group_id.index()));
                    out.push_str(&format!(
                        "{}    label=\"{} ({})\";\n",
                        indent,
                        group.name(),
                        group.kind()
                    ));
                    self.dot_group(pipeline, *group_id, depth + 1, out);
                    out.push_str(&format!("{}}}\n", indent));
                }
            }
        }
    }

    /// Generate text representation of execution order
    pub fn to_text(&self, pipeline: &Pipeline) -> String {
        let mut out = String::new();

        for (i, task_id) in self.topological_order().into_iter().enumerate() {
            let task = pipeline.task(task_id);
            let deps = self.dependencies(task.name()).unwrap_or_default();

            out.push_str(&format!("{}. {} ({})", i + 1, task.name(), task.component()));

            let group = pipeline.group(task.enclosing_group());
            if !group.is_root() {
                out.push_str(&format!(" in {}", group.name()));
            }

            if !deps.is_empty() {
                out.push_str(&format!(" [depends: {}]", deps.join(", ")));
            }

            out.push('\n');
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::condition;
    use crate::errors::ErrorKind;
    use crate::pipeline::{AuthoringContext, GroupSpec, TaskSpec};

    fn make_test_pipeline(tasks: Vec<(&str, Vec<&str>)>) -> Pipeline {
        let mut ctx = AuthoringContext::new();
        ctx.begin_pipeline("test").unwrap();
        for (name, deps) in tasks {
            let spec = deps
                .into_iter()
                .fold(TaskSpec::new(name, "noop"), |spec, dep| spec.after(dep));
            ctx.add_task(spec).unwrap();
        }
        ctx.finish().unwrap()
    }

    #[test]
    fn test_linear_dag() {
        let pipeline = make_test_pipeline(vec![("a", vec![]), ("b", vec!["a"]), ("c", vec!["b"])]);

        let dag = TaskDag::build(&pipeline).unwrap();
        assert_eq!(dag.topological_order_names(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_diamond_dag() {
        let pipeline = make_test_pipeline(vec![
            ("a", vec![]),
            ("b", vec!["a"]),
            ("c", vec!["a"]),
            ("d", vec!["b", "c"]),
        ]);

        let dag = TaskDag::build(&pipeline).unwrap();
        let order = dag.topological_order_names();

        // a must come first, d must come last
        assert_eq!(order[0], "a");
        assert_eq!(order[3], "d");
        assert_eq!(dag.dependencies("d").unwrap(), vec!["b", "c"]);
        assert_eq!(dag.dependents("a").unwrap(), vec!["b", "c"]);
    }

    #[test]
    fn test_circular_dependency_detection() {
        let pipeline = make_test_pipeline(vec![("a", vec!["b"]), ("b", vec!["a"]), ("c", vec![])]);

        let err = TaskDag::build(&pipeline).unwrap_err();
        assert!(matches!(
            err,
            GraphError::CircularDependency { ref tasks } if tasks == &["a", "b"]
        ));
    }

    #[test]
    fn test_unknown_dependency() {
        let pipeline = make_test_pipeline(vec![("a", vec!["nonexistent"])]);

        let err = TaskDag::build(&pipeline).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownDependency);
    }

    #[test]
    fn test_data_edges_and_unknown_output() {
        let mut ctx = AuthoringContext::new();
        ctx.begin_pipeline("test").unwrap();
        ctx.add_task(TaskSpec::new("load", "loader").output("data", "Dataset"))
            .unwrap();
        let data = Channel::create("data", "Dataset", Some("load"), None).unwrap();
        let ghost = Channel::create("missing", "Dataset", Some("load"), None).unwrap();
        ctx.add_task(TaskSpec::new("train", "trainer").channel_input("data", &data))
            .unwrap();
        ctx.add_task(TaskSpec::new("eval", "evaluator").channel_input("data", &ghost))
            .unwrap();
        let pipeline = ctx.finish().unwrap();

        let err = TaskDag::build(&pipeline).unwrap_err();
        assert!(matches!(
            err,
            GraphError::UnknownOutput { ref task, ref output, .. } if task == "eval" && output == "missing"
        ));
    }

    #[test]
    fn test_consumed_output_must_match_declared_type() {
        let mut ctx = AuthoringContext::new();
        ctx.begin_pipeline("test").unwrap();
        ctx.add_task(TaskSpec::new("count", "counter").output("n", "Integer"))
            .unwrap();
        let as_text = Channel::create("n", "String", Some("count"), None).unwrap();
        ctx.add_task(TaskSpec::new("report", "printer").input("msg", format!("got {}", as_text)))
            .unwrap();
        let pipeline = ctx.finish().unwrap();

        let err = TaskDag::build(&pipeline).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_condition_operand_is_a_dependency() {
        let mut ctx = AuthoringContext::new();
        ctx.begin_pipeline("test").unwrap();
        ctx.add_task(TaskSpec::new("flip", "flip-coin").output("out", "String"))
            .unwrap();
        let flip = Channel::create("out", "String", Some("flip"), None).unwrap();
        ctx.scoped(
            Some("heads"),
            GroupSpec::Condition(condition::eq(&flip, "heads").unwrap()),
            |ctx| ctx.add_task(TaskSpec::new("print", "printer")),
        )
        .unwrap();
        let pipeline = ctx.finish().unwrap();

        let dag = TaskDag::build(&pipeline).unwrap();
        assert!(dag.depends_on("print", "flip"));
        assert_eq!(dag.edges(), vec![("flip", "print")]);
    }

    #[test]
    fn test_depends_on_check() {
        let pipeline = make_test_pipeline(vec![("a", vec![]), ("b", vec!["a"]), ("c", vec!["b"])]);

        let dag = TaskDag::build(&pipeline).unwrap();

        assert!(dag.depends_on("c", "a")); // transitive
        assert!(dag.depends_on("c", "b")); // direct
        assert!(dag.depends_on("b", "a")); // direct
        assert!(!dag.depends_on("a", "c")); // reverse
        assert!(!dag.depends_on("a", "a"));
        assert!(!dag.depends_on("a", "missing"));
    }

    #[test]
    fn test_renderings() {
        let pipeline = make_test_pipeline(vec![("a", vec![]), ("b", vec!["a"])]);
        let dag = TaskDag::build(&pipeline).unwrap();

        let mermaid = dag.to_mermaid(&pipeline);
        assert!(mermaid.contains("graph TD"));
        assert!(mermaid.contains("t0[\"a\"]"));
        assert!(mermaid.contains("t0 --> t1"));

        let dot = dag.to_dot(&pipeline);
        assert!(dot.contains("\"a\" -> \"b\";"));

        let text = dag.to_text(&pipeline);
        assert_eq!(text, "1. a (noop)\n2. b (noop) [depends: a]\n");
    }

    #[test]
    fn test_groups_render_as_subgraphs() {
        let mut ctx = AuthoringContext::new();
        ctx.begin_pipeline("test").unwrap();
        let x = ctx.pipeline_input("x", "Integer", None).unwrap();
        ctx.scoped(
            Some("big"),
            GroupSpec::Condition(condition::gt(&x, 10).unwrap()),
            |ctx| ctx.add_task(TaskSpec::new("shout", "printer")),
        )
        .unwrap();
        let pipeline = ctx.finish().unwrap();
        let dag = TaskDag::build(&pipeline).unwrap();

        let mermaid = dag.to_mermaid(&pipeline);
        assert!(mermaid.contains("subgraph g1 [\"big (Condition)\"]"));
        assert!(mermaid.contains("        t0[\"shout\"]"));

        let dot = dag.to_dot(&pipeline);
        assert!(dot.contains("subgraph \"cluster_1\""));
        assert!(dot.contains("label=\"big (Condition)\";"));
    }
}
