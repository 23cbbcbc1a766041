// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipegraph contributors

//! Channels: references to values flowing between tasks
//!
//! A channel is a typed reference to a value that a task produces now or in
//! the future, or that the pipeline receives as an input. Channels are
//! immutable once created and are identified by their placeholder encoding,
//! which can also be embedded inside arbitrary strings such as command-line
//! templates.

pub mod condition;
mod extract;
pub mod placeholder;

pub use condition::{compare, ComparisonOp, ConditionOperator, Operand};
pub use extract::{extract_recursive, ChannelSet, ExtractChannels};
pub use placeholder::{decode, decode_all};

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::hash::{Hash, Hasher};
use std::sync::LazyLock;

use crate::errors::{GraphError, GraphResult};

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9 _-]*$").expect("valid name regex"));

/// Primitive type names, compared case-insensitively
const PARAMETER_TYPES: &[&str] = &[
    "string",
    "str",
    "text",
    "integer",
    "int",
    "float",
    "double",
    "number",
    "boolean",
    "bool",
    "list",
    "jsonarray",
    "dict",
    "jsonobject",
];

/// Check a channel or task name against the naming grammar
pub fn validate_name(name: &str) -> GraphResult<()> {
    if NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(GraphError::invalid_name(
            name,
            "only letters, numbers, spaces, '_' and '-' are allowed, and it must begin with a letter",
        ))
    }
}

/// The type carried by a channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChannelType {
    /// A plain type name such as `String` or `Model`
    Named(String),
    /// A compound artifact-type descriptor
    Schema(Map<String, Value>),
}

impl ChannelType {
    /// Whether this type is a parameter (primitive) type rather than an artifact type
    pub fn is_parameter_type(&self) -> bool {
        let name = match self {
            Self::Named(name) => name.as_str(),
            Self::Schema(map) => match map.keys().next() {
                Some(key) => key.as_str(),
                None => return false,
            },
        };
        let lowered = name.to_ascii_lowercase();
        PARAMETER_TYPES.contains(&lowered.as_str())
    }

    /// Text used in the `type=` field of a placeholder
    pub fn encoded(&self) -> String {
        match self {
            Self::Named(name) => name.clone(),
            Self::Schema(map) => Value::Object(map.clone()).to_string(),
        }
    }

    /// Parse the `type=` field of a placeholder
    ///
    /// JSON objects become [`ChannelType::Schema`]; anything else is a name.
    pub fn parse(raw: &str) -> Self {
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => Self::Schema(map),
            _ => Self::Named(raw.to_string()),
        }
    }
}

impl std::fmt::Display for ChannelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.encoded())
    }
}

impl From<&str> for ChannelType {
    fn from(name: &str) -> Self {
        Self::Named(name.to_string())
    }
}

impl From<String> for ChannelType {
    fn from(name: String) -> Self {
        Self::Named(name)
    }
}

impl From<Map<String, Value>> for ChannelType {
    fn from(map: Map<String, Value>) -> Self {
        Self::Schema(map)
    }
}

/// Fields shared by both channel variants
#[derive(Debug, Clone)]
struct ChannelCore {
    name: String,
    channel_type: ChannelType,
    task_name: Option<String>,
    placeholder: String,
}

impl ChannelCore {
    fn new(
        name: &str,
        channel_type: ChannelType,
        task_name: Option<String>,
    ) -> GraphResult<Self> {
        let placeholder = placeholder::encode_fields(task_name.as_deref(), name, &channel_type)?;
        Ok(Self {
            name: name.to_string(),
            channel_type,
            task_name,
            placeholder,
        })
    }
}

/// A channel carrying a primitive value
#[derive(Debug, Clone)]
pub struct ParameterChannel {
    core: ChannelCore,
    value: Option<Value>,
}

impl ParameterChannel {
    /// The literal value, if the channel was resolved at authoring time
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }
}

/// A channel carrying an artifact
#[derive(Debug, Clone)]
pub struct ArtifactChannel {
    core: ChannelCore,
}

/// A typed reference to a value produced now or in the future
#[derive(Debug, Clone)]
pub enum Channel {
    Parameter(ParameterChannel),
    Artifact(ArtifactChannel),
}

impl Channel {
    /// Create a channel, choosing the variant from the type classification
    pub fn create(
        name: &str,
        channel_type: impl Into<ChannelType>,
        producing_task: Option<&str>,
        literal_value: Option<Value>,
    ) -> GraphResult<Self> {
        let channel_type = channel_type.into();
        let (task_name, literal_value) = Self::check_sources(name, producing_task, literal_value)?;

        if channel_type.is_parameter_type() {
            Ok(Self::Parameter(ParameterChannel {
                core: ChannelCore::new(name, channel_type, task_name)?,
                value: literal_value,
            }))
        } else if literal_value.is_some() {
            Err(GraphError::type_mismatch(format!(
                "'{}' is an artifact type and cannot carry a literal value",
                channel_type
            )))
        } else {
            Ok(Self::Artifact(ArtifactChannel {
                core: ChannelCore::new(name, channel_type, task_name)?,
            }))
        }
    }

    /// Create a parameter channel, failing if the type is an artifact type
    pub fn parameter(
        name: &str,
        channel_type: impl Into<ChannelType>,
        producing_task: Option<&str>,
        literal_value: Option<Value>,
    ) -> GraphResult<Self> {
        let channel_type = channel_type.into();
        let (task_name, literal_value) = Self::check_sources(name, producing_task, literal_value)?;
        if !channel_type.is_parameter_type() {
            return Err(GraphError::type_mismatch(format!(
                "'{}' is not a parameter type",
                channel_type
            )));
        }
        Ok(Self::Parameter(ParameterChannel {
            core: ChannelCore::new(name, channel_type, task_name)?,
            value: literal_value,
        }))
    }

    /// Create an artifact channel, failing if the type is a parameter type
    pub fn artifact(
        name: &str,
        channel_type: impl Into<ChannelType>,
        producing_task: Option<&str>,
    ) -> GraphResult<Self> {
        let channel_type = channel_type.into();
        let (task_name, _) = Self::check_sources(name, producing_task, None)?;
        if channel_type.is_parameter_type() {
            return Err(GraphError::type_mismatch(format!(
                "'{}' is not an artifact type",
                channel_type
            )));
        }
        Ok(Self::Artifact(ArtifactChannel {
            core: ChannelCore::new(name, channel_type, task_name)?,
        }))
    }

    /// Validate names and the task/literal exclusivity.
    ///
    /// Empty task names and null literals normalise to `None` so that
    /// `None => "" => None` holds through the placeholder.
    fn check_sources(
        name: &str,
        producing_task: Option<&str>,
        literal_value: Option<Value>,
    ) -> GraphResult<(Option<String>, Option<Value>)> {
        validate_name(name)?;

        let task_name = producing_task.filter(|t| !t.is_empty());
        if let Some(task) = task_name {
            validate_name(task)?;
        }

        let literal_value = literal_value.filter(|v| !v.is_null());
        if let (Some(task), Some(_)) = (task_name, &literal_value) {
            return Err(GraphError::ConflictingChannelSource {
                name: name.to_string(),
                task: task.to_string(),
            });
        }

        Ok((task_name.map(str::to_string), literal_value))
    }

    fn core(&self) -> &ChannelCore {
        match self {
            Self::Parameter(p) => &p.core,
            Self::Artifact(a) => &a.core,
        }
    }

    pub fn name(&self) -> &str {
        &self.core().name
    }

    pub fn channel_type(&self) -> &ChannelType {
        &self.core().channel_type
    }

    /// Task producing this channel; `None` for pipeline inputs and literals
    pub fn producing_task(&self) -> Option<&str> {
        self.core().task_name.as_deref()
    }

    pub fn literal_value(&self) -> Option<&Value> {
        match self {
            Self::Parameter(p) => p.value(),
            Self::Artifact(_) => None,
        }
    }

    pub fn is_parameter(&self) -> bool {
        matches!(self, Self::Parameter(_))
    }

    /// True when no task produces this channel
    pub fn is_pipeline_input(&self) -> bool {
        self.producing_task().is_none()
    }

    /// Unique human-readable name: `<task>-<name>` or `<name>`
    pub fn full_name(&self) -> String {
        match self.producing_task() {
            Some(task) => format!("{}-{}", task, self.name()),
            None => self.name().to_string(),
        }
    }

    /// Canonical placeholder string; also the identity key of the channel
    pub fn encode(&self) -> &str {
        &self.core().placeholder
    }
}

impl PartialEq for Channel {
    fn eq(&self, other: &Self) -> bool {
        self.encode() == other.encode()
    }
}

impl Eq for Channel {}

impl Hash for Channel {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.encode().hash(state);
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.encode())
    }
}

impl Serialize for Channel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.encode())
    }
}

impl<'de> Deserialize<'de> for Channel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        decode(&raw).map_err(serde::de::Error::custom)
    }
}
