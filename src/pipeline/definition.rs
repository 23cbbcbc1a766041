// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipegraph contributors

//! Pipeline definition files
//!
//! A declarative form of the authoring API, loaded from YAML, JSON or TOML.
//! [`PipelineDefinition::build`] replays the file through an
//! [`AuthoringContext`], so files obey exactly the same rules as code.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use super::context::AuthoringContext;
use super::graph::{Pipeline, PipelineOutput};
use super::group::{GroupSpec, LoopSpec};
use super::task::TaskSpec;
use crate::channel::{compare, Channel, ChannelType, ComparisonOp, Operand};
use crate::errors::{GraphError, GraphResult};

/// Pipeline definition file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDefinition {
    /// Pipeline name, also the name of the Root group
    pub name: String,

    /// Pipeline description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Pipeline-level inputs
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub inputs: BTreeMap<String, InputDef>,

    /// Tasks and groups of the Root group, in declaration order
    #[serde(default)]
    pub body: Vec<NodeDef>,

    /// OneOf aggregations, referenced by name from `outputs`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub one_of: Vec<OneOfDef>,

    /// Pipeline outputs
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, OutputDef>,
}

/// A pipeline-level input declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputDef {
    #[serde(rename = "type")]
    pub channel_type: ChannelType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// One entry of a `body` list
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeDef {
    Task(TaskDef),
    Condition(ConditionDef),
    ParallelFor(LoopDef),
    ExitHandler(ExitHandlerDef),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskDef {
    pub task: String,

    /// Component reference, opaque to the graph
    pub component: String,

    /// Input arguments; strings may embed channel placeholders
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub inputs: BTreeMap<String, Value>,

    /// Declared outputs and their types
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, ChannelType>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub after: Vec<String>,
}

impl TaskDef {
    fn to_spec(&self) -> TaskSpec {
        let spec = TaskSpec::new(&self.task, &self.component);
        let spec = self
            .outputs
            .iter()
            .fold(spec, |spec, (name, ty)| spec.output(name, ty.clone()));
        let spec = self
            .inputs
            .iter()
            .fold(spec, |spec, (name, value)| spec.input(name, value.clone()));
        self.after.iter().fold(spec, |spec, task| spec.after(task))
    }
}

/// `when:` clause of a condition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WhenDef {
    pub left: Value,
    pub op: ComparisonOp,
    pub right: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConditionDef {
    /// Group name, generated when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,

    pub when: WhenDef,

    #[serde(default)]
    pub body: Vec<NodeDef>,
}

/// Loop items: a literal list or a list-valued channel placeholder
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemsDef {
    Channel(Channel),
    Values(Vec<Value>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoopDef {
    /// Group name, generated when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallel_for: Option<String>,

    pub items: ItemsDef,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallelism: Option<u32>,

    #[serde(default)]
    pub body: Vec<NodeDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExitHandlerDef {
    /// Group name, generated when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_handler: Option<String>,

    /// Task that runs when the body finishes, declared before the handler
    pub exit_task: String,

    #[serde(default)]
    pub body: Vec<NodeDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OneOfDef {
    pub name: String,
    pub outputs: Vec<Channel>,
}

/// A pipeline output: a channel placeholder or a named OneOf
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutputDef {
    OneOf { one_of: String },
    Channel(Channel),
}

impl PipelineDefinition {
    /// Load a definition, picking the format from the file extension
    pub fn from_file(path: &Path) -> GraphResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| GraphError::FileReadError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json(&content),
            Some("toml") => Self::from_toml(&content),
            Some("yaml") | Some("yml") | None => Self::from_yaml(&content),
            Some(other) => Err(GraphError::definition(
                format!("unsupported definition format '.{}'", other),
                Some("Use a .yaml, .yml, .json or .toml file".to_string()),
            )),
        }
    }

    /// Parse definition from YAML string
    pub fn from_yaml(yaml: &str) -> GraphResult<Self> {
        serde_yaml::from_str(yaml).map_err(Into::into)
    }

    pub fn from_json(json: &str) -> GraphResult<Self> {
        serde_json::from_str(json).map_err(Into::into)
    }

    pub fn from_toml(toml: &str) -> GraphResult<Self> {
        toml::from_str(toml).map_err(Into::into)
    }

    /// Serialize definition to YAML
    pub fn to_yaml(&self) -> GraphResult<String> {
        serde_yaml::to_string(self).map_err(Into::into)
    }

    /// Author the pipeline this definition describes
    pub fn build(&self) -> GraphResult<Pipeline> {
        let mut ctx = AuthoringContext::new();
        ctx.begin_pipeline(&self.name)?;

        for (name, input) in &self.inputs {
            ctx.pipeline_input(name, input.channel_type.clone(), input.default.clone())?;
        }

        build_nodes(&mut ctx, &self.body)?;

        let mut one_ofs = HashMap::with_capacity(self.one_of.len());
        for def in &self.one_of {
            if one_ofs.contains_key(def.name.as_str()) {
                return Err(GraphError::definition(
                    format!("one_of '{}' is declared twice", def.name),
                    None,
                ));
            }
            let id = ctx.one_of(def.outputs.clone())?;
            one_ofs.insert(def.name.as_str(), id);
        }

        for (name, output) in &self.outputs {
            let output = match output {
                OutputDef::OneOf { one_of } => {
                    let id = one_ofs.get(one_of.as_str()).copied().ok_or_else(|| {
                        GraphError::definition(
                            format!("output '{}' refers to unknown one_of '{}'", name, one_of),
                            Some("Declare it in the top-level 'one_of' list".to_string()),
                        )
                    })?;
                    PipelineOutput::OneOf(id)
                }
                OutputDef::Channel(channel) => PipelineOutput::Channel(channel.clone()),
            };
            ctx.set_output(name, output)?;
        }

        ctx.finish()
    }
}

fn build_nodes(ctx: &mut AuthoringContext, nodes: &[NodeDef]) -> GraphResult<()> {
    for node in nodes {
        match node {
            NodeDef::Task(def) => {
                ctx.add_task(def.to_spec())?;
            }
            NodeDef::Condition(def) => {
                let when = &def.when;
                let left = Operand::from_value(when.left.clone())?;
                let right = Operand::from_value(when.right.clone())?;
                let condition = compare(when.op, left, right)?;
                ctx.scoped(
                    def.condition.as_deref(),
                    GroupSpec::Condition(condition),
                    |ctx| build_nodes(ctx, &def.body),
                )?;
            }
            NodeDef::ParallelFor(def) => {
                let spec = match &def.items {
                    ItemsDef::Channel(channel) => LoopSpec::over_channel(channel.clone())?,
                    ItemsDef::Values(values) => LoopSpec::over_values(values.clone()),
                };
                let spec = match def.parallelism {
                    Some(n) => spec.with_parallelism(n),
                    None => spec,
                };
                ctx.scoped(
                    def.parallel_for.as_deref(),
                    GroupSpec::ParallelFor(spec),
                    |ctx| build_nodes(ctx, &def.body),
                )?;
            }
            NodeDef::ExitHandler(def) => {
                ctx.scoped(
                    def.exit_handler.as_deref(),
                    GroupSpec::ExitHandler {
                        exit_task: def.exit_task.clone(),
                    },
                    |ctx| build_nodes(ctx, &def.body),
                )?;
            }
        }
    }
    Ok(())
}
