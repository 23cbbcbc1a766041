// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipegraph contributors

//! Authoring context
//!
//! Tracks the pipeline under construction and the stack of open groups.
//! Every authoring call goes through an explicit [`AuthoringContext`]; there
//! is no process-wide "current pipeline".

use serde_json::Value;
use std::collections::HashMap;

use tracing::debug;

use super::graph::{Pipeline, PipelineOutput};
use super::group::{Group, GroupId, GroupKind, GroupSpec, TaskId};
use super::oneof::{OneOf, OneOfId};
use super::task::{Task, TaskSpec};
use crate::channel::{validate_name, Channel, ChannelType};
use crate::errors::{GraphError, GraphResult};

#[derive(Debug)]
struct Builder {
    pipeline: Pipeline,
    /// Open groups, Root at the bottom
    stack: Vec<GroupId>,
    counters: HashMap<GroupKind, usize>,
}

impl Builder {
    fn current(&self) -> GroupId {
        self.stack.last().copied().unwrap_or(GroupId::ROOT)
    }

    /// Next free `<prefix>-N` name for a group kind
    fn next_name(&mut self, kind: GroupKind) -> String {
        let counter = self.counters.entry(kind).or_insert(0);
        loop {
            *counter += 1;
            let name = format!("{}-{}", kind.name_prefix(), counter);
            if !self.pipeline.is_name_taken(&name) {
                return name;
            }
        }
    }

    fn claim_name(&self, name: &str) -> GraphResult<()> {
        validate_name(name)?;
        if self.pipeline.is_name_taken(name) {
            return Err(GraphError::invalid_name(
                name,
                "already used by a task or group in this pipeline",
            ));
        }
        Ok(())
    }
}

/// Builder state for one pipeline at a time
#[derive(Debug, Default)]
pub struct AuthoringContext {
    active: Option<Builder>,
}

impl AuthoringContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while a pipeline is being built
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// The pipeline under construction
    pub fn pipeline(&self) -> Option<&Pipeline> {
        self.active.as_ref().map(|b| &b.pipeline)
    }

    fn builder(&mut self, operation: &str) -> GraphResult<&mut Builder> {
        self.active.as_mut().ok_or_else(|| GraphError::NoActiveScope {
            operation: operation.to_string(),
        })
    }

    /// Start a pipeline; its Root group becomes the current group
    pub fn begin_pipeline(&mut self, name: &str) -> GraphResult<GroupId> {
        if let Some(builder) = &self.active {
            return Err(GraphError::NestedPipelineNotSupported {
                active: builder.pipeline.name().to_string(),
                requested: name.to_string(),
            });
        }
        validate_name(name)?;

        debug!(pipeline = name, "begin pipeline");
        self.active = Some(Builder {
            pipeline: Pipeline::new(name),
            stack: vec![GroupId::ROOT],
            counters: HashMap::new(),
        });
        Ok(GroupId::ROOT)
    }

    /// Innermost open group
    pub fn current_group(&self) -> GraphResult<GroupId> {
        self.active
            .as_ref()
            .map(Builder::current)
            .ok_or_else(|| GraphError::NoActiveScope {
                operation: "current_group".to_string(),
            })
    }

    /// Open a child group of the current group
    ///
    /// Without a name the group is called `condition-N`, `for-loop-N` or
    /// `exit-handler-N`, skipping names already in use.
    pub fn enter_group(&mut self, name: Option<&str>, spec: GroupSpec) -> GraphResult<GroupId> {
        let builder = self.builder("enter_group")?;

        if spec.kind() == GroupKind::Root {
            return Err(GraphError::NestedPipelineNotSupported {
                active: builder.pipeline.name().to_string(),
                requested: name.unwrap_or("<unnamed>").to_string(),
            });
        }

        if let GroupSpec::ExitHandler { exit_task } = &spec {
            if builder.pipeline.task_by_name(exit_task).is_none() {
                return Err(GraphError::unknown_task_in(exit_task, "an ExitHandler"));
            }
        }

        let name = match name {
            Some(name) => {
                builder.claim_name(name)?;
                name.to_string()
            }
            None => builder.next_name(spec.kind()),
        };

        let parent = builder.current();
        debug!(group = %name, kind = %spec.kind(), "enter group");
        let id = builder
            .pipeline
            .push_group(Group::new(name, spec, Some(parent)));
        builder.stack.push(id);
        Ok(id)
    }

    /// Close the current group and return it
    pub fn exit_group(&mut self) -> GraphResult<GroupId> {
        let builder = self.builder("exit_group")?;
        let [_, .., top] = builder.stack.as_slice() else {
            return Err(GraphError::NoActiveScope {
                operation: "exit_group".to_string(),
            });
        };
        let id = *top;
        builder.stack.pop();
        debug!(group = builder.pipeline.group(id).name(), "exit group");
        Ok(id)
    }

    /// Enter a group, run `f` inside it, and exit again
    ///
    /// The group is closed even when `f` fails. Groups that `f` opened and
    /// left open are closed too, and reported as [`GraphError::UnclosedGroup`]
    /// when `f` itself succeeded.
    pub fn scoped<T, F>(&mut self, name: Option<&str>, spec: GroupSpec, f: F) -> GraphResult<T>
    where
        F: FnOnce(&mut Self) -> GraphResult<T>,
    {
        let id = self.enter_group(name, spec)?;
        let result = f(self);
        let closed = self.unwind_to(id);
        let value = result?;
        closed?;
        Ok(value)
    }

    fn unwind_to(&mut self, id: GroupId) -> GraphResult<()> {
        let builder = self.builder("scoped")?;
        let Some(pos) = builder.stack.iter().rposition(|g| *g == id) else {
            return Err(GraphError::NoActiveScope {
                operation: "scoped".to_string(),
            });
        };
        let closed = builder.stack.split_off(pos);
        debug!(group = builder.pipeline.group(id).name(), "exit group");

        match closed.as_slice() {
            [_, .., leaked] => Err(GraphError::UnclosedGroup {
                group: builder.pipeline.group(*leaked).name().to_string(),
            }),
            _ => Ok(()),
        }
    }

    /// Register a task in the current group
    pub fn add_task(&mut self, spec: TaskSpec) -> GraphResult<TaskId> {
        let builder = self.builder("add_task")?;
        builder.claim_name(spec.name())?;

        let group = builder.current();
        let task = Task::from_spec(spec, group)?;
        debug!(
            task = task.name(),
            group = builder.pipeline.group(group).name(),
            inputs = task.input_channels().len(),
            "add task"
        );
        Ok(builder.pipeline.push_task(task))
    }

    /// Declare a pipeline-level input
    pub fn pipeline_input(
        &mut self,
        name: &str,
        channel_type: impl Into<ChannelType>,
        default: Option<Value>,
    ) -> GraphResult<Channel> {
        let builder = self.builder("pipeline_input")?;
        if builder.pipeline.inputs.iter().any(|c| c.name() == name) {
            return Err(GraphError::invalid_name(name, "pipeline input declared twice"));
        }

        let channel = Channel::create(name, channel_type, None, default)?;
        builder.pipeline.inputs.push(channel.clone());
        Ok(channel)
    }

    /// Construct a OneOf and register it with the pipeline
    pub fn one_of(&mut self, outputs: Vec<Channel>) -> GraphResult<OneOfId> {
        let builder = self.builder("one_of")?;
        let one_of = OneOf::new(outputs)?;
        let id = OneOfId(builder.pipeline.one_ofs.len());
        builder.pipeline.one_ofs.push(one_of);
        Ok(id)
    }

    /// Expose a channel or OneOf as a named pipeline output
    pub fn set_output(&mut self, name: &str, output: PipelineOutput) -> GraphResult<()> {
        let builder = self.builder("set_output")?;
        validate_name(name)?;
        if builder.pipeline.outputs.contains_key(name) {
            return Err(GraphError::invalid_name(name, "pipeline output declared twice"));
        }
        if let PipelineOutput::OneOf(id) = &output {
            if id.0 >= builder.pipeline.one_ofs.len() {
                return Err(GraphError::InvalidOperand {
                    reason: format!("output '{}' refers to an unregistered OneOf", name),
                });
            }
        }

        builder.pipeline.outputs.insert(name.to_string(), output);
        Ok(())
    }

    /// Finish the active pipeline
    ///
    /// Fails while any group other than Root is still open; the pipeline
    /// stays active in that case.
    pub fn finish(&mut self) -> GraphResult<Pipeline> {
        let builder = self.builder("finish")?;
        if let [_, .., top] = builder.stack.as_slice() {
            return Err(GraphError::UnclosedGroup {
                group: builder.pipeline.group(*top).name().to_string(),
            });
        }

        let builder = self.active.take().ok_or_else(|| GraphError::NoActiveScope {
            operation: "finish".to_string(),
        })?;
        debug!(
            pipeline = builder.pipeline.name(),
            groups = builder.pipeline.groups().len(),
            tasks = builder.pipeline.tasks().len(),
            "finish pipeline"
        );
        Ok(builder.pipeline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::condition;
    use crate::errors::ErrorKind;
    use crate::pipeline::{LoopSpec, Node};
    use serde_json::json;

    fn flip_condition() -> GroupSpec {
        let flip = Channel::create("out", "String", Some("flip"), None).unwrap();
        GroupSpec::Condition(condition::eq(&flip, "heads").unwrap())
    }

    #[test]
    fn test_tasks_land_in_current_group() {
        let mut ctx = AuthoringContext::new();
        ctx.begin_pipeline("Root").unwrap();
        ctx.add_task(TaskSpec::new("flip", "flip-coin").output("out", "String"))
            .unwrap();
        let c1 = ctx.enter_group(Some("c1"), flip_condition()).unwrap();
        assert_eq!(ctx.current_group().unwrap(), c1);
        let t1 = ctx.add_task(TaskSpec::new("t1", "print")).unwrap();
        assert_eq!(ctx.exit_group().unwrap(), c1);
        assert_eq!(ctx.current_group().unwrap(), GroupId::ROOT);

        let pipeline = ctx.finish().unwrap();
        assert!(!ctx.is_active());
        assert_eq!(pipeline.task(t1).enclosing_group(), c1);
        assert_eq!(pipeline.group(c1).children(), &[Node::Task(t1)]);
        assert_eq!(pipeline.root().children().len(), 2);
        assert_eq!(pipeline.group(c1).parent(), Some(GroupId::ROOT));
    }

    #[test]
    fn test_auto_naming_skips_taken_names() {
        let mut ctx = AuthoringContext::new();
        ctx.begin_pipeline("Root").unwrap();
        ctx.add_task(TaskSpec::new("condition-1", "noop")).unwrap();

        let first = ctx.enter_group(None, flip_condition()).unwrap();
        ctx.exit_group().unwrap();
        let second = ctx.enter_group(None, flip_condition()).unwrap();
        ctx.exit_group().unwrap();
        let looped = ctx
            .enter_group(None, GroupSpec::ParallelFor(LoopSpec::over_values(vec![json!(1)])))
            .unwrap();
        ctx.exit_group().unwrap();

        let pipeline = ctx.finish().unwrap();
        assert_eq!(pipeline.group(first).name(), "condition-2");
        assert_eq!(pipeline.group(second).name(), "condition-3");
        assert_eq!(pipeline.group(looped).name(), "for-loop-1");
    }

    #[test]
    fn test_shared_namespace_collisions() {
        let mut ctx = AuthoringContext::new();
        ctx.begin_pipeline("Root").unwrap();
        ctx.add_task(TaskSpec::new("a", "noop")).unwrap();

        let err = ctx.add_task(TaskSpec::new("a", "noop")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidName);
        let err = ctx.enter_group(Some("a"), flip_condition()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidName);

        ctx.enter_group(Some("g"), flip_condition()).unwrap();
        let err = ctx.add_task(TaskSpec::new("g", "noop")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidName);
        let err = ctx.add_task(TaskSpec::new("Root", "noop")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidName);
    }

    #[test]
    fn test_scope_misuse() {
        let mut ctx = AuthoringContext::new();
        assert_eq!(
            ctx.add_task(TaskSpec::new("t", "noop")).unwrap_err().kind(),
            ErrorKind::NoActiveScope
        );
        assert_eq!(ctx.current_group().unwrap_err().kind(), ErrorKind::NoActiveScope);
        assert_eq!(ctx.finish().unwrap_err().kind(), ErrorKind::NoActiveScope);

        ctx.begin_pipeline("Root").unwrap();
        assert_eq!(ctx.exit_group().unwrap_err().kind(), ErrorKind::NoActiveScope);
        assert_eq!(
            ctx.begin_pipeline("Other").unwrap_err().kind(),
            ErrorKind::NestedPipelineNotSupported
        );
        assert_eq!(
            ctx.enter_group(Some("inner"), GroupSpec::Root).unwrap_err().kind(),
            ErrorKind::NestedPipelineNotSupported
        );

        ctx.enter_group(Some("open"), flip_condition()).unwrap();
        let err = ctx.finish().unwrap_err();
        assert!(matches!(err, GraphError::UnclosedGroup { ref group } if group == "open"));
        assert!(ctx.is_active());
        ctx.exit_group().unwrap();
        assert!(ctx.finish().is_ok());
    }

    #[test]
    fn test_scoped_closes_on_error() {
        let mut ctx = AuthoringContext::new();
        ctx.begin_pipeline("Root").unwrap();

        let err = ctx
            .scoped(Some("c1"), flip_condition(), |ctx| {
                ctx.add_task(TaskSpec::new("ok", "noop"))?;
                ctx.add_task(TaskSpec::new("bad name!", "noop"))
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidName);
        assert_eq!(ctx.current_group().unwrap(), GroupId::ROOT);

        let err = ctx
            .scoped(Some("c2"), flip_condition(), |ctx| {
                ctx.enter_group(Some("leaked"), flip_condition())
            })
            .unwrap_err();
        assert!(matches!(err, GraphError::UnclosedGroup { ref group } if group == "leaked"));
        assert_eq!(ctx.current_group().unwrap(), GroupId::ROOT);
    }

    #[test]
    fn test_exit_handler_needs_existing_task() {
        let mut ctx = AuthoringContext::new();
        ctx.begin_pipeline("Root").unwrap();
        let err = ctx
            .enter_group(
                None,
                GroupSpec::ExitHandler {
                    exit_task: "cleanup".to_string(),
                },
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownTask);

        ctx.add_task(TaskSpec::new("cleanup", "notify")).unwrap();
        let id = ctx
            .enter_group(
                None,
                GroupSpec::ExitHandler {
                    exit_task: "cleanup".to_string(),
                },
            )
            .unwrap();
        assert_eq!(ctx.pipeline().unwrap().group(id).name(), "exit-handler-1");
    }

    #[test]
    fn test_inputs_and_outputs() {
        let mut ctx = AuthoringContext::new();
        ctx.begin_pipeline("Root").unwrap();
        let x = ctx.pipeline_input("x", "Integer", Some(json!(3))).unwrap();
        assert!(x.is_pipeline_input());
        assert_eq!(
            ctx.pipeline_input("x", "Integer", None).unwrap_err().kind(),
            ErrorKind::InvalidName
        );

        ctx.set_output("echo", PipelineOutput::Channel(x.clone())).unwrap();
        assert_eq!(
            ctx.set_output("bogus", PipelineOutput::OneOf(OneOfId(7)))
                .unwrap_err()
                .kind(),
            ErrorKind::InvalidOperand
        );

        let pipeline = ctx.finish().unwrap();
        assert_eq!(pipeline.inputs(), &[x]);
        assert_eq!(pipeline.outputs().len(), 1);
    }

    #[test]
    fn test_one_of_construction_checks_run_early() {
        let mut ctx = AuthoringContext::new();
        ctx.begin_pipeline("Root").unwrap();
        let a = Channel::create("out", "String", Some("t1"), None).unwrap();
        assert_eq!(
            ctx.one_of(vec![a]).unwrap_err().kind(),
            ErrorKind::ArityViolation
        );
        assert!(ctx.pipeline().unwrap().one_ofs().is_empty());
    }
}
